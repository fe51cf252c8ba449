// 该文件是 Tianma （天马） 项目的一部分。
// src/paths.rs - 项目路径解析
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// 用于识别项目根目录的标记文件
const ROOT_MARKERS: [&str; 2] = [".git", "Cargo.toml"];

const MODEL_PATH: &str = "src/model/saved/best.onnx";
const OUTPUT_PATH: &str = "outputs";
const LOG_PATH: &str = "logs";
const DATA_PATH: &str = "data";
const RESULT_PATH: &str = "result";

#[derive(Error, Debug)]
pub enum PathError {
  #[error("从 {0} 向上未找到项目根目录")]
  RootNotFound(PathBuf),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 项目内各目录的位置
#[derive(Debug, Clone)]
pub struct ProjectPaths {
  root: PathBuf,
}

impl ProjectPaths {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// 从 `start` 开始逐级向上查找含有 `.git` 或 `Cargo.toml` 的目录
  pub fn discover(start: impl AsRef<Path>) -> Result<Self, PathError> {
    let start = std::path::absolute(start.as_ref())?;
    for dir in start.ancestors() {
      if ROOT_MARKERS.iter().any(|marker| dir.join(marker).exists()) {
        debug!("项目根目录: {}", dir.display());
        return Ok(Self::new(dir));
      }
    }
    Err(PathError::RootNotFound(start))
  }

  /// 以当前工作目录为起点查找
  pub fn from_current_dir() -> Result<Self, PathError> {
    Self::discover(std::env::current_dir()?)
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn model_path(&self) -> PathBuf {
    self.root.join(MODEL_PATH)
  }

  pub fn output_dir(&self) -> Result<PathBuf, PathError> {
    make_path(self.root.join(OUTPUT_PATH))
  }

  pub fn log_dir(&self) -> Result<PathBuf, PathError> {
    make_path(self.root.join(LOG_PATH))
  }

  /// 单次推理结果的保存位置
  pub fn result_dir(&self) -> Result<PathBuf, PathError> {
    make_path(self.root.join(DATA_PATH).join(RESULT_PATH))
  }
}

/// 目录不存在时创建，返回原路径
pub fn make_path(path: impl Into<PathBuf>) -> Result<PathBuf, PathError> {
  let path = path.into();
  if !path.exists() {
    std::fs::create_dir_all(&path)?;
  }
  Ok(path)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn discover_walks_up_to_marker() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join(".git")).unwrap();
    let nested = dir.path().join("src").join("api");
    std::fs::create_dir_all(&nested).unwrap();

    let paths = ProjectPaths::discover(&nested).unwrap();
    assert_eq!(
      paths.root().canonicalize().unwrap(),
      dir.path().canonicalize().unwrap()
    );
    assert!(paths.model_path().ends_with("src/model/saved/best.onnx"));
  }

  #[test]
  fn directory_getters_create_on_demand() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ProjectPaths::new(dir.path());

    let result = paths.result_dir().unwrap();
    assert!(result.is_dir());
    assert!(result.ends_with("data/result"));
    assert!(paths.output_dir().unwrap().is_dir());
    assert!(paths.log_dir().unwrap().ends_with("logs"));
  }
}
