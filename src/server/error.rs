// 该文件是 Tianma （天马） 项目的一部分。
// src/server/error.rs - 服务错误到 HTTP 响应的映射
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use axum::{
  Json,
  extract::multipart::MultipartError,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinError;

use crate::{
  error::{
    AppError, ErrorKind, IMAGE_LOAD_FAILED, INVALID_IMAGE_TYPE, MODEL_NOT_FOUND, PARAMETER_ERROR,
  },
  task::PredictError,
};

#[derive(Error, Debug)]
pub enum ServiceError {
  #[error("模型未加载")]
  ModelNotLoaded,
  #[error("缺少上传文件字段 `file`")]
  MissingFile,
  #[error("表单解析失败: {0}")]
  Multipart(#[from] MultipartError),
  #[error(transparent)]
  Predict(#[from] PredictError),
  #[error("推理任务异常退出: {0}")]
  Worker(#[from] JoinError),
}

#[derive(Serialize)]
struct ErrorBody {
  kind: ErrorKind,
  code: u16,
  detail: String,
}

impl ServiceError {
  pub fn status(&self) -> StatusCode {
    match self {
      ServiceError::ModelNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
      ServiceError::MissingFile => StatusCode::UNPROCESSABLE_ENTITY,
      ServiceError::Multipart(e) => e.status(),
      ServiceError::Predict(PredictError::InvalidContentType(_))
      | ServiceError::Predict(PredictError::ImageLoad(_)) => StatusCode::BAD_REQUEST,
      ServiceError::Predict(PredictError::Inference(_))
      | ServiceError::Predict(PredictError::Encode(_))
      | ServiceError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  /// 对应的错误码值
  pub fn app_error(&self) -> AppError {
    let msg = self.to_string();
    match self {
      ServiceError::ModelNotLoaded => AppError::valid(MODEL_NOT_FOUND, msg),
      ServiceError::MissingFile => AppError::valid(PARAMETER_ERROR, msg),
      ServiceError::Multipart(_) => AppError::new(ErrorKind::Http, self.status().as_u16(), msg),
      ServiceError::Predict(PredictError::InvalidContentType(_)) => {
        AppError::valid(INVALID_IMAGE_TYPE, msg)
      }
      ServiceError::Predict(PredictError::ImageLoad(_)) => AppError::valid(IMAGE_LOAD_FAILED, msg),
      ServiceError::Predict(_) | ServiceError::Worker(_) => AppError::system(msg),
    }
  }
}

impl IntoResponse for ServiceError {
  fn into_response(self) -> Response {
    let err = self.app_error();
    let body = ErrorBody {
      kind: err.kind,
      code: err.code,
      // 客户端错误带上具体原因，服务端错误只给表中描述
      detail: match err.kind {
        ErrorKind::System => err.describe().to_string(),
        _ => format!("{}: {}", err.describe(), self),
      },
    };
    (self.status(), Json(body)).into_response()
  }
}
