// 该文件是 Tianma （天马） 项目的一部分。
// src/output/audit.rs - 推理结果图像存档
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

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::{debug, warn};

use crate::FromUrl;
use crate::FromUrlWithScheme;

/// 可直接按原扩展名写出的格式
const WRITABLE_FORMATS: [ImageFormat; 4] = [
  ImageFormat::Png,
  ImageFormat::Jpeg,
  ImageFormat::Gif,
  ImageFormat::Bmp,
];
const FALLBACK_NAME: &str = "upload";

#[derive(Error, Debug)]
pub enum AuditError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
}

/// 一次请求的处理结果，决定存档文件名前缀
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  Success,
  Failed,
}

impl Outcome {
  pub fn prefix(&self) -> &'static str {
    match self {
      Outcome::Success => "success",
      Outcome::Failed => "failed",
    }
  }

  /// 日志中使用的结果名
  pub fn as_status(&self) -> &'static str {
    match self {
      Outcome::Success => "SUCCESS",
      Outcome::Failed => "FAIL",
    }
  }
}

/// 将标注后的图像写入输出目录
#[derive(Debug, Clone)]
pub struct AuditRecorder {
  directory: PathBuf,
}

impl FromUrlWithScheme for AuditRecorder {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for AuditRecorder {
  type Error = AuditError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(AuditError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let directory = uri
      .to_file_path()
      .unwrap_or_else(|_| PathBuf::from(uri.path()));
    Ok(Self::new(directory))
  }
}

impl AuditRecorder {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
    }
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  /// 写出 `{前缀}_{YYYYMMDD_HHMMSS}_{文件名}`，返回实际写入的路径
  pub fn record(
    &self,
    outcome: Outcome,
    filename: &str,
    image: &RgbImage,
  ) -> Result<PathBuf, AuditError> {
    std::fs::create_dir_all(&self.directory)?;

    let (name, format) = audit_name(filename);
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let (path, file) = self.reserve(&format!("{}_{}_{}", outcome.prefix(), timestamp, name))?;

    let written = {
      let mut writer = BufWriter::new(file);
      image
        .write_to(&mut writer, format)
        .map_err(AuditError::from)
        .and_then(|_| writer.flush().map_err(AuditError::from))
    };
    if let Err(e) = written {
      // 不留下写了一半的文件
      let _ = std::fs::remove_file(&path);
      return Err(e);
    }

    debug!("保存结果图像: {}", path.display());
    Ok(path)
  }

  /// 以 `create_new` 占用文件名；同名文件已存在时在扩展名前追加序号
  fn reserve(&self, name: &str) -> Result<(PathBuf, File), AuditError> {
    let (stem, ext) = match name.rsplit_once('.') {
      Some((stem, ext)) => (stem, format!(".{ext}")),
      None => (name, String::new()),
    };

    let mut index = 0u32;
    loop {
      let path = match index {
        0 => self.directory.join(name),
        _ => self.directory.join(format!("{stem}_{index}{ext}")),
      };
      match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => {
          if index > 0 {
            warn!("存档文件 {} 已存在，改为写入 {}", name, path.display());
          }
          return Ok((path, file));
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => index += 1,
        Err(e) => return Err(e.into()),
      }
    }
  }
}

/// 只保留上传文件名的最后一段；扩展名不可写时补 `.png`
fn audit_name(filename: &str) -> (String, ImageFormat) {
  let base = filename
    .rsplit(['/', '\\'])
    .next()
    .map(str::trim)
    .filter(|s| !s.is_empty() && *s != "." && *s != "..")
    .unwrap_or(FALLBACK_NAME);

  match ImageFormat::from_path(base) {
    Ok(format) if WRITABLE_FORMATS.contains(&format) => (base.to_string(), format),
    _ => (format!("{base}.png"), ImageFormat::Png),
  }
}
