// 该文件是 Tianma （天马） 项目的一部分。
// src/logging.rs - 日志初始化
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
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::ValueEnum;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_NAME: &str = "app.log";

/// 运行环境：开发环境输出易读格式，生产环境输出 JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Environment {
  Development,
  Production,
}

impl Environment {
  pub fn as_str(&self) -> &'static str {
    match self {
      Environment::Development => "development",
      Environment::Production => "production",
    }
  }
}

#[derive(Error, Debug)]
pub enum LoggingError {
  #[error("无法打开日志文件 {0}: {1}")]
  OpenLogFile(PathBuf, std::io::Error),
  #[error("日志系统初始化失败: {0}")]
  Init(#[from] tracing_subscriber::util::TryInitError),
}

fn open_log_file(log_dir: &Path) -> Result<File, LoggingError> {
  let path = log_dir.join(LOG_FILE_NAME);
  OpenOptions::new()
    .create(true)
    .append(true)
    .open(&path)
    .map_err(|e| LoggingError::OpenLogFile(path, e))
}

/// 初始化全局日志：控制台一路，`<log_dir>/app.log` 追加一路。
///
/// 过滤规则读取 `RUST_LOG`，未设置时为 `info`。
pub fn setup_logging(environment: Environment, log_dir: &Path) -> Result<(), LoggingError> {
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

  let file = open_log_file(log_dir)?;
  let file_layer = tracing_subscriber::fmt::layer()
    .with_ansi(false)
    .with_target(true)
    .with_writer(Mutex::new(file));

  let console_layer = match environment {
    Environment::Production => tracing_subscriber::fmt::layer()
      .json()
      .with_level(true)
      .boxed(),
    Environment::Development => tracing_subscriber::fmt::layer()
      .pretty()
      .with_ansi(true)
      .boxed(),
  };

  tracing_subscriber::registry()
    .with(env_filter)
    .with(console_layer)
    .with(file_layer)
    .try_init()?;

  Ok(())
}
