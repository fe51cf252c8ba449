// 该文件是 Tianma （天马） 项目的一部分。
// src/model/yolo.rs - YOLO 前后处理
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

use image::{Rgb, RgbImage, imageops::FilterType};
use ndarray::{Array, ArrayViewD, IxDyn};
use thiserror::Error;
use tracing::debug;

use crate::model::{DetectItem, Labels};

const LETTERBOX_FILL: u8 = 114;

#[derive(Error, Debug)]
pub enum YoloError {
  #[error("输出形状不符合预期: {0:?}")]
  UnexpectedShape(Vec<usize>),
}

/// 记录等比缩放与填充参数，用于把模型坐标映射回原图
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
  pub scale: f32,
  pub pad_x: f32,
  pub pad_y: f32,
  pub width: u32,
  pub height: u32,
}

impl Letterbox {
  pub fn new(width: u32, height: u32, target: u32) -> Self {
    let scale = target as f32 / width.max(height) as f32;
    let new_w = (width as f32 * scale).round() as u32;
    let new_h = (height as f32 * scale).round() as u32;
    Self {
      scale,
      pad_x: ((target - new_w.min(target)) / 2) as f32,
      pad_y: ((target - new_h.min(target)) / 2) as f32,
      width,
      height,
    }
  }

  /// 模型输入坐标系下的 xyxy 映射回原图，并裁剪到图像范围
  pub fn restore(&self, bbox: [f32; 4]) -> [f32; 4] {
    let (w, h) = (self.width as f32, self.height as f32);
    [
      ((bbox[0] - self.pad_x) / self.scale).clamp(0.0, w),
      ((bbox[1] - self.pad_y) / self.scale).clamp(0.0, h),
      ((bbox[2] - self.pad_x) / self.scale).clamp(0.0, w),
      ((bbox[3] - self.pad_y) / self.scale).clamp(0.0, h),
    ]
  }
}

/// 等比缩放到 `target`×`target`，灰色填充，转为 NCHW 且归一化到 [0, 1]
pub fn letterbox(image: &RgbImage, target: u32) -> (Array<f32, IxDyn>, Letterbox) {
  let (width, height) = image.dimensions();
  let info = Letterbox::new(width, height, target);
  let new_w = ((width as f32 * info.scale).round() as u32).clamp(1, target);
  let new_h = ((height as f32 * info.scale).round() as u32).clamp(1, target);

  let resized = image::imageops::resize(image, new_w, new_h, FilterType::Triangle);
  let mut canvas = RgbImage::from_pixel(target, target, Rgb([LETTERBOX_FILL; 3]));
  image::imageops::replace(
    &mut canvas,
    &resized,
    info.pad_x as i64,
    info.pad_y as i64,
  );

  let size = target as usize;
  let input = Array::from_shape_fn(IxDyn(&[1, 3, size, size]), |idx| {
    canvas.get_pixel(idx[3] as u32, idx[2] as u32)[idx[1]] as f32 / 255.0
  });
  (input, info)
}

/// 解析 `[1, 4 + 类别数, 候选数]` 形状的检测头输出
pub fn decode_output(
  output: ArrayViewD<'_, f32>,
  letterbox: &Letterbox,
  confidence: f32,
  nms_threshold: f32,
  labels: &Labels,
) -> Result<Vec<DetectItem>, YoloError> {
  let shape = output.shape().to_vec();
  if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 {
    return Err(YoloError::UnexpectedShape(shape));
  }
  let num_classes = shape[1] - 4;
  let num_boxes = shape[2];

  let mut items = Vec::new();
  for i in 0..num_boxes {
    let mut best_score = f32::MIN;
    let mut best_class = 0usize;
    for c in 0..num_classes {
      let score = output[[0, 4 + c, i]];
      if score > best_score {
        best_score = score;
        best_class = c;
      }
    }

    if best_score < confidence {
      continue;
    }

    let cx = output[[0, 0, i]];
    let cy = output[[0, 1, i]];
    let w = output[[0, 2, i]];
    let h = output[[0, 3, i]];
    let bbox = letterbox.restore([cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0]);

    if bbox[0] >= bbox[2] || bbox[1] >= bbox[3] {
      continue;
    }

    items.push(DetectItem {
      class_id: best_class as u32,
      label: labels.name(best_class as u32),
      score: best_score,
      bbox,
    });
  }

  debug!("候选框 {} 个，阈值过滤后 {} 个", num_boxes, items.len());
  Ok(nms(items, nms_threshold))
}

/// 按类别做非极大值抑制，结果按置信度降序
pub fn nms(mut items: Vec<DetectItem>, iou_threshold: f32) -> Vec<DetectItem> {
  items.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut result: Vec<DetectItem> = Vec::with_capacity(items.len());
  for item in items {
    let suppressed = result
      .iter()
      .any(|kept| kept.class_id == item.class_id && iou(&kept.bbox, &item.bbox) >= iou_threshold);
    if !suppressed {
      result.push(item);
    }
  }

  result
}

/// 计算两个 xyxy 边界框的 IoU
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]) * (a[3] - a[1]);
  let area_b = (b[2] - b[0]) * (b[3] - b[1]);
  let union = area_a + area_b - intersection;

  if union > 0.0 {
    intersection / union
  } else {
    0.0
  }
}
