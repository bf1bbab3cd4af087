// 该文件是 Shanan （山南西风） 项目的一部分。
// src/main.rs - 缺陷检测主程序
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
use tracing::info;

use shanan_defect::{
  DefectPipeline, FromUrl,
  input::InputWrapper,
  model::{ModelConfig, ModelDetector, ModelDetectorConfig},
  output::{Annotator, OutputWrapper},
  preprocess::PreprocessConfig,
  task::{BatchTask, OneShotTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let model_config = match &args.model {
    Some(url) => ModelConfig::from_url(url)?,
    None => ModelConfig::default(),
  };
  info!("模型文件路径: {}", model_config.topology.display());
  let model = ModelDetector::load_or_disable(&model_config, ModelDetectorConfig::default());

  let preprocess = PreprocessConfig::default()
    .with_target_size(args.target_size, args.target_size)
    .with_denoise(args.denoise)
    .with_brightness(args.alpha, args.beta)
    .with_enhance_contrast(args.enhance_contrast);

  let annotator = match &args.font {
    Some(path) => Annotator::with_font_file(path)?,
    None => Annotator::default(),
  };

  let pipeline = DefectPipeline::builder()
    .with_preprocess(preprocess)
    .with_model(model)
    .with_annotator(annotator)
    .build();
  info!("检测路径: {:?}", pipeline.detector_names());

  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let summary = match input {
    InputWrapper::ReadImageFile(_) => OneShotTask.run_task(input, &pipeline, &output)?,
    InputWrapper::ReadImageFolder(_) => BatchTask::default()
      .with_workers(args.workers)
      .run_task(input, &pipeline, &output)?,
  };
  info!(
    "共处理 {} 张图像，失败 {} 张，检出 {} 个缺陷",
    summary.processed, summary.failed, summary.defects
  );

  Ok(())
}
