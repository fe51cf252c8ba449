// 该文件是 Tianma （天马） 项目的一部分。
// src/model/yolo_onnx.rs - ONNX Runtime 上的 YOLO 检测模型
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

use std::path::PathBuf;
use std::sync::Mutex;

use image::RgbImage;
use ort::{
  session::{Session, builder::GraphOptimizationLevel},
  value::TensorRef,
};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{DetectResult, Labels, Model, YoloError, decode_output, letterbox},
};

const YOLO_INPUT_NAME: &str = "images";
const YOLO_OUTPUT_NAME: &str = "output0";
const YOLO_INPUT_SIZE: u32 = 640;
const YOLO_CONFIDENCE: f32 = 0.25;
const YOLO_NMS_THRESHOLD: f32 = 0.45;
const YOLO_INTRA_THREADS: usize = 4;

#[derive(Error, Debug)]
pub enum YoloOnnxError {
  #[error("模型文件不存在: {0}")]
  ModelNotFound(PathBuf),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(String),
  #[error("后处理错误: {0}")]
  DecodeError(#[from] YoloError),
  #[error("推理会话已损坏")]
  SessionPoisoned,
}

fn ort_error(err: impl std::fmt::Display) -> YoloOnnxError {
  YoloOnnxError::OrtError(err.to_string())
}

pub struct YoloOnnx {
  // ONNX Runtime 的 run 需要独占会话
  session: Mutex<Session>,
  input_size: u32,
  confidence: f32,
  nms_threshold: f32,
  labels: Labels,
}

pub struct YoloOnnxBuilder {
  model_path: PathBuf,
  input_size: u32,
  confidence: f32,
  nms_threshold: f32,
  labels: Labels,
  intra_threads: usize,
}

impl FromUrlWithScheme for YoloOnnxBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for YoloOnnxBuilder {
  type Error = YoloOnnxError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(YoloOnnxError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let path = url
      .to_file_path()
      .unwrap_or_else(|_| PathBuf::from(url.path()));
    Ok(Self::from_path(path))
  }
}

impl YoloOnnxBuilder {
  pub fn from_path(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      input_size: YOLO_INPUT_SIZE,
      confidence: YOLO_CONFIDENCE,
      nms_threshold: YOLO_NMS_THRESHOLD,
      labels: Labels::default(),
      intra_threads: YOLO_INTRA_THREADS,
    }
  }

  pub fn model_path(&self) -> &std::path::Path {
    &self.model_path
  }

  pub fn input_size(mut self, input_size: u32) -> Self {
    self.input_size = input_size;
    self
  }

  pub fn confidence(mut self, confidence: f32) -> Self {
    self.confidence = confidence;
    self
  }

  pub fn nms_threshold(mut self, nms_threshold: f32) -> Self {
    self.nms_threshold = nms_threshold;
    self
  }

  pub fn labels(mut self, labels: Labels) -> Self {
    self.labels = labels;
    self
  }

  pub fn intra_threads(mut self, intra_threads: usize) -> Self {
    self.intra_threads = intra_threads;
    self
  }

  pub fn build(self) -> Result<YoloOnnx, YoloOnnxError> {
    if !self.model_path.is_file() {
      return Err(YoloOnnxError::ModelNotFound(self.model_path));
    }

    info!("加载模型文件: {}", self.model_path.display());
    let _ = ort::init().commit();

    let session = Session::builder()
      .map_err(ort_error)?
      .with_optimization_level(GraphOptimizationLevel::Level3)
      .map_err(ort_error)?
      .with_intra_threads(self.intra_threads)
      .map_err(ort_error)?
      .commit_from_file(&self.model_path)
      .map_err(ort_error)?;
    info!("模型加载完成");
    debug!(
      "输入尺寸: {}, 置信度阈值: {}, NMS 阈值: {}, 类别: {:?}",
      self.input_size, self.confidence, self.nms_threshold, self.labels
    );

    Ok(YoloOnnx {
      session: Mutex::new(session),
      input_size: self.input_size,
      confidence: self.confidence,
      nms_threshold: self.nms_threshold,
      labels: self.labels,
    })
  }
}

impl Model for YoloOnnx {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = YoloOnnxError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("预处理输入图像 {}x{}", input.width(), input.height());
    let (tensor, info) = letterbox(input, self.input_size);

    let items = {
      let mut session = self
        .session
        .lock()
        .map_err(|_| YoloOnnxError::SessionPoisoned)?;

      debug!("执行模型推理");
      let outputs = session
        .run(ort::inputs![
          YOLO_INPUT_NAME => TensorRef::from_array_view(tensor.view()).map_err(ort_error)?
        ])
        .map_err(ort_error)?;

      let output = outputs[YOLO_OUTPUT_NAME]
        .try_extract_array::<f32>()
        .map_err(ort_error)?;
      decode_output(
        output,
        &info,
        self.confidence,
        self.nms_threshold,
        &self.labels,
      )?
    };

    debug!("检测到 {} 个物体", items.len());
    Ok(DetectResult::from(items))
  }
}
