// 该文件是 Tianma （天马） 项目的一部分。
// src/task.rs - 单张图像的推理流程
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

use std::io::Cursor;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use image::ImageFormat;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
  model::Detector,
  output::{AuditRecorder, Outcome, draw::Draw},
};

/// 客户端上传的一个文件
#[derive(Debug, Clone)]
pub struct Upload {
  pub filename: String,
  pub content_type: Option<String>,
  pub bytes: Vec<u8>,
}

/// 推理成功后返回给调用方的内容
#[derive(Debug)]
pub struct Prediction {
  pub png: Vec<u8>,
  pub boxes: usize,
  pub elapsed: Duration,
  pub outcome: Outcome,
  /// 存档失败时为 `None`
  pub audit_path: Option<PathBuf>,
}

#[derive(Error, Debug)]
pub enum PredictError {
  #[error("只能上传图像文件，收到的类型: {}", .0.as_deref().unwrap_or("<无>"))]
  InvalidContentType(Option<String>),
  #[error("图像加载失败: {0}")]
  ImageLoad(#[source] image::ImageError),
  #[error("模型推理失败: {0}")]
  Inference(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("图像编码失败: {0}")]
  Encode(#[source] image::ImageError),
}

/// 声明的类型必须以 `image/` 开头
pub fn validate_content_type(content_type: Option<&str>) -> bool {
  content_type
    .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
    .unwrap_or(false)
}

/// 校验、解码、推理、标注、存档、编码。
///
/// 每次调用恰好输出一条以 `event` 字段区分的汇总日志。
pub fn run_predict<M: Detector>(
  model: &M,
  draw: &Draw<'_>,
  recorder: &AuditRecorder,
  upload: &Upload,
) -> Result<Prediction, PredictError> {
  let filename = upload.filename.as_str();
  let declared = upload.content_type.as_deref();
  let content_type = declared.unwrap_or("");

  if !validate_content_type(declared) {
    warn!(event = "INVALID_FILE", filename, content_type, "拒绝非图像文件");
    return Err(PredictError::InvalidContentType(upload.content_type.clone()));
  }

  let mut image = match image::load_from_memory(&upload.bytes) {
    Ok(image) => image.to_rgb8(),
    Err(e) => {
      warn!(
        event = "IMAGE_LOAD_FAIL",
        filename,
        content_type,
        error = %e,
        "图像解码失败"
      );
      return Err(PredictError::ImageLoad(e));
    }
  };

  let now = Instant::now();
  let result = match model.infer(&image) {
    Ok(result) => result,
    Err(e) => {
      error!(
        event = "RESULT",
        filename,
        content_type,
        status = "ERROR",
        error = %e,
        "模型推理失败"
      );
      return Err(PredictError::Inference(Box::new(e)));
    }
  };
  let elapsed = now.elapsed();

  let outcome = if result.is_empty() {
    draw.draw_no_detection(&mut image);
    Outcome::Failed
  } else {
    draw.draw_detections(&mut image, &result);
    Outcome::Success
  };

  let audit = recorder.record(outcome, filename, &image);

  let mut png = Vec::new();
  image
    .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
    .map_err(|e| {
      error!(
        event = "RESULT",
        filename,
        content_type,
        status = "ERROR",
        error = %e,
        "结果图像编码失败"
      );
      PredictError::Encode(e)
    })?;

  // 存档失败不影响响应，只提升这一行的级别
  let audit_path = match audit {
    Ok(path) => {
      info!(
        event = "RESULT",
        filename,
        content_type,
        status = outcome.as_status(),
        boxes = result.len(),
        inference_time = ?elapsed,
        audit_path = %path.display(),
        "推理完成"
      );
      Some(path)
    }
    Err(e) => {
      error!(
        event = "RESULT",
        filename,
        content_type,
        status = outcome.as_status(),
        boxes = result.len(),
        inference_time = ?elapsed,
        audit_error = %e,
        "推理完成，结果图像存档失败"
      );
      None
    }
  };

  Ok(Prediction {
    png,
    boxes: result.len(),
    elapsed,
    outcome,
    audit_path,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{DetectItem, DetectResult, Model};
  use image::{Rgb, RgbImage};
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[derive(Error, Debug)]
  #[error("mock failure")]
  struct MockError;

  /// 返回固定结果并记录调用次数
  struct MockModel {
    items: Vec<DetectItem>,
    calls: AtomicUsize,
    fail: bool,
  }

  impl MockModel {
    fn returning(items: Vec<DetectItem>) -> Self {
      Self {
        items,
        calls: AtomicUsize::new(0),
        fail: false,
      }
    }
  }

  impl Model for MockModel {
    type Input = RgbImage;
    type Output = DetectResult;
    type Error = MockError;

    fn infer(&self, _input: &RgbImage) -> Result<DetectResult, MockError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      if self.fail {
        return Err(MockError);
      }
      Ok(DetectResult::from(self.items.clone()))
    }
  }

  fn horse(score: f32, bbox: [f32; 4]) -> DetectItem {
    DetectItem {
      class_id: 0,
      label: "horse".to_string(),
      score,
      bbox,
    }
  }

  fn png_upload(width: u32, height: u32) -> Upload {
    let image = RgbImage::from_pixel(width, height, Rgb([40, 120, 40]));
    let mut bytes = Vec::new();
    image
      .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
      .unwrap();
    Upload {
      filename: "field.png".to_string(),
      content_type: Some("image/png".to_string()),
      bytes,
    }
  }

  fn files_in(dir: &std::path::Path) -> Vec<String> {
    std::fs::read_dir(dir)
      .map(|entries| {
        entries
          .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
          .collect()
      })
      .unwrap_or_default()
  }

  #[test]
  fn content_type_check() {
    assert!(validate_content_type(Some("image/png")));
    assert!(validate_content_type(Some("IMAGE/JPEG")));
    assert!(!validate_content_type(Some("text/plain")));
    assert!(!validate_content_type(Some("application/octet-stream")));
    assert!(!validate_content_type(None));
  }

  #[test]
  fn non_image_is_rejected_without_inference() {
    let dir = tempfile::tempdir().unwrap();
    let model = MockModel::returning(vec![]);
    let mut upload = png_upload(16, 16);
    upload.content_type = Some("text/plain".to_string());

    let err = run_predict(&model, &Draw::default(), &AuditRecorder::new(dir.path()), &upload)
      .unwrap_err();
    assert!(matches!(err, PredictError::InvalidContentType(Some(_))));
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    assert!(files_in(dir.path()).is_empty());
  }

  #[test]
  fn corrupt_bytes_fail_to_load_and_write_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let model = MockModel::returning(vec![]);
    let upload = Upload {
      filename: "broken.png".to_string(),
      content_type: Some("image/png".to_string()),
      bytes: b"definitely not a png".to_vec(),
    };

    let err = run_predict(&model, &Draw::default(), &AuditRecorder::new(dir.path()), &upload)
      .unwrap_err();
    assert!(matches!(err, PredictError::ImageLoad(_)));
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    assert!(files_in(dir.path()).is_empty());
  }

  #[test]
  fn zero_detections_write_one_failed_file_with_marker() {
    let dir = tempfile::tempdir().unwrap();
    let model = MockModel::returning(vec![]);
    let upload = png_upload(320, 120);

    let prediction =
      run_predict(&model, &Draw::default(), &AuditRecorder::new(dir.path()), &upload).unwrap();
    assert_eq!(prediction.outcome, Outcome::Failed);
    assert_eq!(prediction.boxes, 0);

    let files = files_in(dir.path());
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("failed_"));

    // 提示文字为红色
    let annotated = image::load_from_memory(&prediction.png).unwrap().to_rgb8();
    assert!(annotated.pixels().any(|p| p.0[0] > 200 && p.0[1] < 60));
  }

  #[test]
  fn detections_are_drawn_and_recorded_as_success() {
    let dir = tempfile::tempdir().unwrap();
    let model = MockModel::returning(vec![
      horse(0.93, [30.0, 50.0, 90.0, 110.0]),
      horse(0.41, [150.0, 60.0, 230.0, 140.0]),
    ]);
    let upload = png_upload(256, 160);

    let prediction =
      run_predict(&model, &Draw::default(), &AuditRecorder::new(dir.path()), &upload).unwrap();
    assert_eq!(prediction.outcome, Outcome::Success);
    assert_eq!(prediction.boxes, 2);
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);

    let files = files_in(dir.path());
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("success_") && files[0].ends_with("_field.png"));
    assert_eq!(prediction.audit_path.as_deref(), Some(dir.path().join(&files[0]).as_path()));

    let annotated = image::load_from_memory(&prediction.png).unwrap().to_rgb8();
    assert_eq!(annotated.get_pixel(30, 80).0, [255, 0, 0]);
    assert_eq!(annotated.get_pixel(150, 100).0, [255, 0, 0]);
  }

  #[test]
  fn encoded_result_keeps_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let model = MockModel::returning(vec![horse(0.8, [1.0, 30.0, 20.0, 40.0])]);
    let mut upload = png_upload(97, 61);
    // 灰度 JPEG 输入同样转为 RGB
    let gray = image::GrayImage::from_pixel(97, 61, image::Luma([90]));
    upload.bytes.clear();
    gray
      .write_to(&mut Cursor::new(&mut upload.bytes), ImageFormat::Jpeg)
      .unwrap();
    upload.content_type = Some("image/jpeg".to_string());

    let prediction =
      run_predict(&model, &Draw::default(), &AuditRecorder::new(dir.path()), &upload).unwrap();
    let decoded = image::load_from_memory_with_format(&prediction.png, ImageFormat::Png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (97, 61));
  }

  #[test]
  fn backend_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = MockModel::returning(vec![]);
    model.fail = true;

    let err = run_predict(
      &model,
      &Draw::default(),
      &AuditRecorder::new(dir.path()),
      &png_upload(8, 8),
    )
    .unwrap_err();
    assert!(matches!(err, PredictError::Inference(_)));
    assert!(files_in(dir.path()).is_empty());
  }

  /// 收集日志输出的内存写入器
  #[derive(Clone, Default)]
  struct CapturedLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

  impl std::io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
      self.0.lock().unwrap().extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
    }
  }

  impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLog {
    type Writer = CapturedLog;

    fn make_writer(&'a self) -> Self::Writer {
      self.clone()
    }
  }

  impl CapturedLog {
    fn lines(&self) -> Vec<String> {
      String::from_utf8_lossy(&self.0.lock().unwrap())
        .lines()
        .map(str::to_string)
        .collect()
    }
  }

  fn predict_with_log(
    model: &MockModel,
    upload: &Upload,
  ) -> (Result<Prediction, PredictError>, Vec<String>) {
    let dir = tempfile::tempdir().unwrap();
    predict_into_with_log(model, &AuditRecorder::new(dir.path()), upload)
  }

  fn predict_into_with_log(
    model: &MockModel,
    recorder: &AuditRecorder,
    upload: &Upload,
  ) -> (Result<Prediction, PredictError>, Vec<String>) {
    let log = CapturedLog::default();
    let subscriber = tracing_subscriber::fmt()
      .with_writer(log.clone())
      .with_max_level(tracing::Level::INFO)
      .with_ansi(false)
      .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
      run_predict(model, &Draw::default(), recorder, upload)
    });
    (result, log.lines())
  }

  #[test]
  fn successful_request_logs_one_summary_line() {
    let model = MockModel::returning(vec![horse(0.9, [2.0, 20.0, 30.0, 40.0])]);
    let (result, lines) = predict_with_log(&model, &png_upload(64, 64));
    assert!(result.is_ok());

    assert_eq!(lines.len(), 1, "{lines:?}");
    let line = &lines[0];
    assert!(line.contains("INFO"));
    assert!(line.contains("event=\"RESULT\""));
    assert!(line.contains("filename=\"field.png\""));
    assert!(line.contains("content_type=\"image/png\""));
    assert!(line.contains("status=\"SUCCESS\""));
    assert!(line.contains("boxes=1"));
    assert!(line.contains("audit_path="));
  }

  #[test]
  fn rejected_requests_log_content_type() {
    let model = MockModel::returning(vec![]);

    let mut upload = png_upload(8, 8);
    upload.content_type = Some("text/plain".to_string());
    let (_, lines) = predict_with_log(&model, &upload);
    assert_eq!(lines.len(), 1, "{lines:?}");
    assert!(lines[0].contains("event=\"INVALID_FILE\""));
    assert!(lines[0].contains("content_type=\"text/plain\""));

    let mut upload = png_upload(8, 8);
    upload.bytes.truncate(10);
    let (_, lines) = predict_with_log(&model, &upload);
    assert_eq!(lines.len(), 1, "{lines:?}");
    assert!(lines[0].contains("event=\"IMAGE_LOAD_FAIL\""));
    assert!(lines[0].contains("content_type=\"image/png\""));
  }

  #[test]
  fn audit_failure_still_returns_the_image() {
    let dir = tempfile::tempdir().unwrap();
    // 存档目录被同名文件占用
    let blocked = dir.path().join("outputs");
    std::fs::write(&blocked, b"not a directory").unwrap();
    let model = MockModel::returning(vec![]);

    let prediction = run_predict(
      &model,
      &Draw::default(),
      &AuditRecorder::new(&blocked),
      &png_upload(8, 8),
    )
    .unwrap();
    assert!(prediction.audit_path.is_none());
    assert!(!prediction.png.is_empty());

    let (_, lines) = predict_into_with_log(&model, &AuditRecorder::new(&blocked), &png_upload(8, 8));
    assert_eq!(lines.len(), 1, "{lines:?}");
    assert!(lines[0].contains("ERROR"));
    assert!(lines[0].contains("event=\"RESULT\""));
    assert!(lines[0].contains("status=\"FAIL\""));
    assert!(lines[0].contains("content_type=\"image/png\""));
    assert!(lines[0].contains("audit_error="));
  }
}
