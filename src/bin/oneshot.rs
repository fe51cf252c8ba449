// 该文件是 Tianma （天马） 项目的一部分。
// src/bin/oneshot.rs - 对单张本地图像执行一次推理
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

use anyhow::{Context, Result};
use clap::Parser;
use image::ImageFormat;
use tracing::info;
use url::Url;

use tianma::{
  FromUrl,
  model::YoloOnnxBuilder,
  output::{AuditRecorder, draw::Draw},
  paths::{ProjectPaths, make_path},
  task::{Upload, run_predict},
};

/// 对单张图像执行与 `/predict` 相同的流程
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型地址，例如 onnx:///opt/tianma/best.onnx；默认使用项目内的模型
  #[arg(long, value_name = "MODEL")]
  pub model: Option<Url>,
  /// 输入图像文件
  #[arg(long, value_name = "IMAGE")]
  pub input: PathBuf,
  /// 存档地址，例如 folder:///tmp/tianma；默认为项目的 outputs 目录
  #[arg(long, value_name = "FOLDER")]
  pub output_dir: Option<Url>,
  /// 置信度阈值
  #[arg(long, default_value = "0.25", value_name = "THRESHOLD")]
  pub confidence: f32,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  info!("输入图像: {}", args.input.display());

  let paths = ProjectPaths::from_current_dir()?;
  let builder = match &args.model {
    Some(url) => YoloOnnxBuilder::from_url(url)?,
    None => YoloOnnxBuilder::from_path(paths.model_path()),
  };
  let model = builder.confidence(args.confidence).build()?;
  let recorder = match &args.output_dir {
    Some(url) => AuditRecorder::from_url(url)?,
    None => AuditRecorder::new(paths.output_dir()?),
  };
  make_path(recorder.directory())?;

  let filename = args
    .input
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();
  // 按扩展名推断类型，与浏览器上传时的行为一致
  let content_type = ImageFormat::from_path(&args.input)
    .ok()
    .map(|format| format.to_mime_type().to_string());
  let bytes = std::fs::read(&args.input)
    .with_context(|| format!("无法读取 {}", args.input.display()))?;

  let upload = Upload {
    filename: filename.clone(),
    content_type,
    bytes,
  };
  let prediction = run_predict(
    &model,
    &Draw::default(),
    &recorder,
    &upload,
  )?;

  let result_path = paths.result_dir()?.join(format!("result_{filename}.png"));
  std::fs::write(&result_path, &prediction.png)?;
  info!(
    "检测到 {} 个目标，耗时 {:.2?}，结果保存到 {}",
    prediction.boxes,
    prediction.elapsed,
    result_path.display()
  );

  Ok(())
}
