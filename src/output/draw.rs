// 该文件是 Tianma （天马） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::model::{DetectItem, DetectResult};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_PADDING: i32 = 3;
const BOX_STROKE_WIDTH: i32 = 3;
const BOX_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const TEXT_COLOR: [u8; 3] = [255, 255, 255]; // 白色

pub const NO_DETECTION_TEXT: &str = "Prediction Failed: No object detected";
const NO_DETECTION_POSITION: (i32, i32) = (20, 20);

/// 标签文本：类别名与两位小数的置信度
pub fn label_text(item: &DetectItem) -> String {
  format!("{} {:.2}", item.label, item.score)
}

pub struct Draw<'a> {
  font: FontRef<'a>,
  font_size: f32,
  stroke_width: i32,
  box_color: [u8; 3],
  text_color: [u8; 3],
}

impl Default for Draw<'static> {
  fn default() -> Self {
    let font_data = include_bytes!("../../assets/DejaVuSans.ttf");
    let font = FontRef::try_from_slice(font_data).expect("无法加载嵌入的字体文件");

    Self {
      font,
      font_size: LABEL_FONT_SIZE,
      stroke_width: BOX_STROKE_WIDTH,
      box_color: BOX_COLOR,
      text_color: TEXT_COLOR,
    }
  }
}

impl<'a> Draw<'a> {
  fn scale(&self) -> PxScale {
    PxScale::from(self.font_size)
  }

  /// 按模型返回的顺序逐个绘制边框与标签
  pub fn draw_detections(&self, image: &mut RgbImage, result: &DetectResult) {
    for item in result.iter() {
      self.draw_bbox_with_label(image, item);
    }
  }

  /// 没有检测到目标时在固定位置写提示文字
  pub fn draw_no_detection(&self, image: &mut RgbImage) {
    let (x, y) = NO_DETECTION_POSITION;
    draw_text_mut(
      image,
      Rgb(self.box_color),
      x,
      y,
      self.scale(),
      &self.font,
      NO_DETECTION_TEXT,
    );
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, item: &DetectItem) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let x_min = (item.bbox[0].floor() as i32).clamp(0, w - 1);
    let y_min = (item.bbox[1].floor() as i32).clamp(0, h - 1);
    let x_max = (item.bbox[2].ceil() as i32).clamp(0, w - 1);
    let y_max = (item.bbox[3].ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    // 向内逐像素收缩绘制，得到固定宽度的边框
    for inset in 0..self.stroke_width {
      let width = x_max - x_min + 1 - 2 * inset;
      let height = y_max - y_min + 1 - 2 * inset;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + inset, y_min + inset).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, Rgb(self.box_color));
    }

    let label = label_text(item);
    let (text_w, text_h) = text_size(self.scale(), &self.font, &label);

    // 标签背景紧贴边框左上角上方，超出图像的部分由绘制函数裁掉
    let background = Rect::at(x_min, y_min - text_h as i32 - 2 * LABEL_PADDING)
      .of_size(text_w + 2 * LABEL_PADDING as u32, text_h + 2 * LABEL_PADDING as u32);
    draw_filled_rect_mut(image, background, Rgb(self.box_color));

    draw_text_mut(
      image,
      Rgb(self.text_color),
      x_min + LABEL_PADDING,
      y_min - text_h as i32 - LABEL_PADDING,
      self.scale(),
      &self.font,
      &label,
    );
  }
}
