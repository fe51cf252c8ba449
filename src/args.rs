// 该文件是 Tianma （天马） 项目的一部分。
// src/args.rs - 服务参数配置
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

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tianma::logging::Environment;
use url::Url;

/// Tianma 马匹检测推理服务
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 项目根目录，未指定时从当前目录向上查找
  #[arg(long, env = "TIANMA_ROOT", value_name = "DIR")]
  pub root: Option<PathBuf>,

  /// 模型地址，例如 onnx:///opt/tianma/best.onnx；默认使用项目内的模型
  #[arg(long, env = "TIANMA_MODEL", value_name = "MODEL")]
  pub model: Option<Url>,

  /// 结果图像存档地址，例如 folder:///var/tianma/outputs；默认使用项目的 outputs 目录
  #[arg(long, env = "TIANMA_OUTPUT_DIR", value_name = "FOLDER")]
  pub output_dir: Option<Url>,

  /// 日志目录
  #[arg(long, env = "TIANMA_LOG_DIR", value_name = "DIR")]
  pub log_dir: Option<PathBuf>,

  /// 监听地址
  #[arg(long, env = "TIANMA_LISTEN", default_value = "127.0.0.1:8000")]
  pub listen: SocketAddr,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, env = "TIANMA_CONFIDENCE", default_value = "0.25", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, env = "TIANMA_NMS_THRESHOLD", default_value = "0.45", value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 模型输入边长
  #[arg(long, env = "TIANMA_INPUT_SIZE", default_value = "640", value_name = "PIXELS")]
  pub input_size: u32,

  /// ONNX Runtime 算子内线程数
  #[arg(long, env = "TIANMA_INTRA_THREADS", default_value = "4", value_name = "N")]
  pub intra_threads: usize,

  /// 类别名称，按类别编号顺序以逗号分隔
  #[arg(
    long,
    env = "TIANMA_LABELS",
    value_delimiter = ',',
    default_value = "horse"
  )]
  pub labels: Vec<String>,

  /// 运行环境
  #[arg(long, env = "TIANMA_ENVIRONMENT", value_enum, default_value = "development")]
  pub environment: Environment,
}
