// 该文件是 Tianma （天马） 项目的一部分。
// src/main.rs - 推理服务主程序
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use tianma::{
  FromUrl,
  logging::setup_logging,
  model::{Labels, YoloOnnxBuilder},
  output::AuditRecorder,
  paths::{ProjectPaths, make_path},
  server::{self, AppState},
};

#[tokio::main]
async fn main() -> Result<()> {
  let args = args::Args::parse();

  let paths = match &args.root {
    Some(root) => ProjectPaths::new(root),
    None => ProjectPaths::from_current_dir()?,
  };
  let log_dir = match &args.log_dir {
    Some(dir) => make_path(dir)?,
    None => paths.log_dir()?,
  };
  setup_logging(args.environment, &log_dir)?;

  info!("Tianma 推理服务启动，运行环境: {}", args.environment.as_str());
  info!("项目根目录: {}", paths.root().display());

  let builder = match &args.model {
    Some(url) => YoloOnnxBuilder::from_url(url)?,
    None => YoloOnnxBuilder::from_path(paths.model_path()),
  };
  let model = builder
    .confidence(args.confidence)
    .nms_threshold(args.nms_threshold)
    .input_size(args.input_size)
    .intra_threads(args.intra_threads)
    .labels(Labels::new(args.labels.iter().map(|l| l.trim())))
    .build()
    .inspect_err(|e| error!("模型加载失败: {}", e))?;

  let recorder = match &args.output_dir {
    Some(url) => AuditRecorder::from_url(url)?,
    None => AuditRecorder::new(paths.output_dir()?),
  };
  make_path(recorder.directory())?;
  info!("结果图像存档目录: {}", recorder.directory().display());

  let state = AppState::new(model, recorder);
  server::serve(args.listen, state).await
}
