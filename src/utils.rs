// 该文件是 Tianma （天马） 项目的一部分。
// src/utils.rs - 数据集整理工具
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

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use image::RgbImage;
use rust_xlsxwriter::{Workbook, XlsxError};
use thiserror::Error;
use tracing::{info, warn};

use crate::error::{AppError, IMAGE_NOT_FOUND};

/// 参与损坏检查的扩展名
const CHECKED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];
/// 约 100KB
pub const SMALL_FILE_THRESHOLD: u64 = 100_000;
const REPORT_SHEET: &str = "file_size_check";
const REPORT_COLUMNS: [&str; 3] = ["file_name", "file_path", "file_size"];

#[derive(Error, Debug)]
pub enum UtilsError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("表格错误: {0}")]
  XlsxError(#[from] XlsxError),
}

fn has_checked_extension(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| {
      CHECKED_EXTENSIONS
        .iter()
        .any(|known| ext.eq_ignore_ascii_case(known))
    })
    .unwrap_or(false)
}

/// 列出目录（不递归）中无法解码的图像文件名
pub fn find_broken_images(dir: &Path) -> Result<Vec<String>, UtilsError> {
  let mut broken = Vec::new();
  for entry in fs::read_dir(dir)? {
    let path = entry?.path();
    if !path.is_file() || !has_checked_extension(&path) {
      continue;
    }
    if image::open(&path).is_err() {
      let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
      info!("{} 已损坏", name);
      broken.push(name);
    }
  }
  broken.sort();
  Ok(broken)
}

/// 裁剪 `[x0, x1) × [y0, y1)` 区域，越界部分截断
pub fn crop_image(path: &Path, x0: u32, y0: u32, x1: u32, y1: u32) -> Result<RgbImage, AppError> {
  let image = image::open(path)
    .map_err(|e| AppError::valid(IMAGE_NOT_FOUND, format!("{}: {}", path.display(), e)))?
    .to_rgb8();
  info!("加载图像文件: {}", path.display());

  let (w, h) = image.dimensions();
  let (x0, x1) = (x0.min(w), x1.min(w));
  let (y0, y1) = (y0.min(h), y1.min(h));
  let cropped = image::imageops::crop_imm(
    &image,
    x0,
    y0,
    x1.saturating_sub(x0),
    y1.saturating_sub(y0),
  );
  Ok(cropped.to_image())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmallFile {
  pub file_name: String,
  pub file_path: PathBuf,
  pub file_size: u64,
}

fn walk_files(dir: &Path, visit: &mut dyn FnMut(&Path, &fs::Metadata)) -> Result<(), UtilsError> {
  for entry in fs::read_dir(dir)? {
    let entry = entry?;
    let path = entry.path();
    // 遍历过程中被删除的文件直接跳过
    let metadata = match entry.metadata() {
      Ok(metadata) => metadata,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
      Err(e) => return Err(e.into()),
    };
    if metadata.is_dir() {
      walk_files(&path, visit)?;
    } else if metadata.is_file() {
      visit(&path, &metadata);
    }
  }
  Ok(())
}

/// 递归查找不超过 `threshold` 字节的文件
pub fn scan_small_files(dir: &Path, threshold: u64) -> Result<Vec<SmallFile>, UtilsError> {
  let mut found = Vec::new();
  walk_files(dir, &mut |path, metadata| {
    if metadata.len() <= threshold {
      found.push(SmallFile {
        file_name: path
          .file_name()
          .map(|n| n.to_string_lossy().into_owned())
          .unwrap_or_default(),
        file_path: path.to_path_buf(),
        file_size: metadata.len(),
      });
    }
  })?;
  found.sort_by(|a, b| a.file_path.cmp(&b.file_path));

  info!("文件大小检查完成: {}", dir.display());
  warn!("不超过 {} 字节的文件数: {}", threshold, found.len());
  Ok(found)
}

/// 写出 `file_size_check_{YYYYMMDD}.xlsx` 到 `dir`，首行为列名
pub fn write_small_file_report(dir: &Path, files: &[SmallFile]) -> Result<PathBuf, UtilsError> {
  let path = dir.join(format!(
    "file_size_check_{}.xlsx",
    Local::now().format("%Y%m%d")
  ));

  let mut workbook = Workbook::new();
  let sheet = workbook.add_worksheet();
  sheet.set_name(REPORT_SHEET)?;
  for (col, title) in (0u16..).zip(REPORT_COLUMNS) {
    sheet.write_string(0, col, title)?;
  }
  for (row, file) in (1u32..).zip(files) {
    sheet.write_string(row, 0, &file.file_name)?;
    sheet.write_string(row, 1, file.file_path.to_string_lossy())?;
    sheet.write_number(row, 2, file.file_size as f64)?;
  }
  workbook.save(&path)?;

  info!("报告已保存: {}", path.display());
  Ok(path)
}

/// 在 `origin` 下递归查找名称在 `names` 中的文件并复制到 `dest`，返回复制后的路径
pub fn copy_named_files(
  origin: &Path,
  dest: &Path,
  names: &[String],
) -> Result<Vec<PathBuf>, UtilsError> {
  fs::create_dir_all(dest)?;

  let mut matched = Vec::new();
  walk_files(origin, &mut |path, _| {
    let is_wanted = path
      .file_name()
      .and_then(|n| n.to_str())
      .map(|n| names.iter().any(|wanted| wanted == n))
      .unwrap_or(false);
    if is_wanted {
      matched.push(path.to_path_buf());
    }
  })?;

  let mut copied = Vec::with_capacity(matched.len());
  for source in matched {
    if let Some(name) = source.file_name() {
      let target = dest.join(name);
      fs::copy(&source, &target)?;
      info!("已复制 {}", source.display());
      copied.push(target);
    }
  }
  info!("文件复制完成，共 {} 个", copied.len());
  Ok(copied)
}

/// 表格中复制出的多行文本转为列表：去空白、去单引号、跳过空行
pub fn parse_pasted_list(text: &str) -> Vec<String> {
  text
    .trim()
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty())
    .map(|line| line.replace('\'', ""))
    .collect()
}
