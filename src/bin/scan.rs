// 该文件是 Tianma （天马） 项目的一部分。
// src/bin/scan.rs - 数据集整理命令行
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

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use tianma::utils::{
  SMALL_FILE_THRESHOLD, copy_named_files, crop_image, find_broken_images, parse_pasted_list,
  scan_small_files, write_small_file_report,
};

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 列出目录中无法解码的图像
  Broken {
    dir: PathBuf,
  },
  /// 递归列出小文件
  Small {
    dir: PathBuf,
    /// 字节数上限
    #[arg(long, default_value_t = SMALL_FILE_THRESHOLD)]
    threshold: u64,
    /// 同时在目录下写出 xlsx 报告
    #[arg(long)]
    report: bool,
  },
  /// 按名称列表复制文件，名称列表文件每行一个
  Copy {
    origin: PathBuf,
    dest: PathBuf,
    /// 名称列表文件
    #[arg(long, value_name = "FILE")]
    names: PathBuf,
  },
  /// 裁剪图像区域
  Crop {
    input: PathBuf,
    output: PathBuf,
    #[arg(long)]
    x0: u32,
    #[arg(long)]
    y0: u32,
    #[arg(long)]
    x1: u32,
    #[arg(long)]
    y1: u32,
  },
}

/// Tianma 数据集整理工具
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(subcommand)]
  pub command: Command,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  match args.command {
    Command::Broken { dir } => {
      for name in find_broken_images(&dir)? {
        println!("{name}");
      }
    }
    Command::Small {
      dir,
      threshold,
      report,
    } => {
      let files = scan_small_files(&dir, threshold)?;
      for file in &files {
        println!("{}\t{}", file.file_size, file.file_path.display());
      }
      if report {
        write_small_file_report(&dir, &files)?;
      }
    }
    Command::Copy {
      origin,
      dest,
      names,
    } => {
      let names = parse_pasted_list(&std::fs::read_to_string(&names)?);
      let copied = copy_named_files(&origin, &dest, &names)?;
      info!("请求 {} 个文件，复制 {} 个", names.len(), copied.len());
    }
    Command::Crop {
      input,
      output,
      x0,
      y0,
      x1,
      y1,
    } => {
      let cropped = crop_image(&input, x0, y0, x1, y1)?;
      cropped.save(&output)?;
      info!("裁剪结果保存到 {}", output.display());
    }
  }

  Ok(())
}
