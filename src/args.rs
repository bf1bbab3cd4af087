// 该文件是 Shanan （山南西风） 项目的一部分。
// src/args.rs - 命令行参数
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

use clap::Parser;
use url::Url;

use shanan_defect::preprocess::DenoiseMode;

/// 零件表面缺陷检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源
  /// - 单张图像: image:///path/to/part.png
  /// - 图像目录: folder:///path/to/dir
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径
  /// - 标注图像: image:///path/to/out.png
  /// - 记录目录: folder:///path/to/dir[?only_defects]
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 模型位置，例如 onnx:///models/net.onnx?classes=/models/coco.names；
  /// 缺省时使用 models/ 下的默认文件，文件不存在则只做经典检测
  #[arg(long, value_name = "MODEL")]
  pub model: Option<Url>,

  /// 批量处理的工作线程数
  #[arg(long, default_value_t = 1, value_name = "COUNT")]
  pub workers: usize,

  /// 预处理后的正方形边长
  #[arg(long, default_value_t = 640, value_name = "PIXELS")]
  pub target_size: u32,

  /// 去噪方式: gaussian, median, bilateral, none
  #[arg(long, default_value = "gaussian", value_name = "MODE")]
  pub denoise: DenoiseMode,

  /// 亮度调整的增益
  #[arg(long, default_value_t = 1.0)]
  pub alpha: f32,

  /// 亮度调整的偏移
  #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
  pub beta: f32,

  /// 启用局部对比度增强
  #[arg(long)]
  pub enhance_contrast: bool,

  /// 标签字体文件
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,
}
