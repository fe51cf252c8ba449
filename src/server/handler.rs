// 该文件是 Tianma （天马） 项目的一部分。
// src/server/handler.rs - 路由处理函数
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
  extract::{Multipart, State},
  http::{HeaderValue, header},
  response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use tracing::debug;

use crate::{
  model::Detector,
  server::{AppState, ServiceError},
  task::{Upload, run_predict},
};

const UPLOAD_FIELD: &str = "file";
const UPLOAD_FORM: &str = include_str!("../../assets/form.html");

#[derive(Debug, Serialize)]
pub struct HealthStatus {
  pub status: &'static str,
  pub model_loaded: bool,
}

pub async fn health<M: Detector>(State(state): State<AppState<M>>) -> Json<HealthStatus> {
  Json(HealthStatus {
    status: "ok",
    model_loaded: state.model_loaded(),
  })
}

pub async fn home() -> Html<&'static str> {
  Html(UPLOAD_FORM)
}

pub async fn predict<M: Detector>(
  State(state): State<AppState<M>>,
  mut multipart: Multipart,
) -> Result<Response, ServiceError> {
  let model = state.model().ok_or(ServiceError::ModelNotLoaded)?;
  let upload = read_upload(&mut multipart).await?;
  debug!(
    "收到上传文件 {} ({} 字节)",
    upload.filename,
    upload.bytes.len()
  );

  let draw = state.draw();
  let recorder = state.recorder();
  let filename = upload.filename.clone();
  let prediction =
    tokio::task::spawn_blocking(move || run_predict(model.as_ref(), &draw, &recorder, &upload))
      .await??;

  Ok(
    (
      [
        (header::CONTENT_TYPE, HeaderValue::from_static("image/png")),
        (header::CONTENT_DISPOSITION, content_disposition(&filename)),
      ],
      prediction.png,
    )
      .into_response(),
  )
}

/// 取出名为 `file` 的字段，其余字段丢弃
async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ServiceError> {
  while let Some(field) = multipart.next_field().await? {
    if field.name() != Some(UPLOAD_FIELD) {
      continue;
    }
    let filename = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);
    let bytes = field.bytes().await?.to_vec();
    return Ok(Upload {
      filename,
      content_type,
      bytes,
    });
  }
  Err(ServiceError::MissingFile)
}

/// `inline; filename=result_<名称>`，非可见 ASCII 名称改用 RFC 5987 编码
pub fn content_disposition(filename: &str) -> HeaderValue {
  let plain = !filename.is_empty()
    && filename
      .bytes()
      .all(|b| b.is_ascii_graphic() && !matches!(b, b'"' | b'\\' | b';' | b','));

  let value = if plain {
    format!("inline; filename=result_{filename}")
  } else {
    format!(
      "inline; filename*=UTF-8''result_{}",
      urlencoding::encode(filename)
    )
  };
  HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("inline"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ascii_names_are_sent_verbatim() {
    assert_eq!(
      content_disposition("horse.jpg"),
      "inline; filename=result_horse.jpg"
    );
  }

  #[test]
  fn other_names_are_percent_encoded() {
    assert_eq!(
      content_disposition("马 1.png"),
      "inline; filename*=UTF-8''result_%E9%A9%AC%201.png"
    );
    assert_eq!(
      content_disposition("a;b.png"),
      "inline; filename*=UTF-8''result_a%3Bb.png"
    );
  }
}
