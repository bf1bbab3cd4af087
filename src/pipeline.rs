// 该文件是 Shanan （山南西风） 项目的一部分。
// src/pipeline.rs - 缺陷检测流水线
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

//! 预处理 → 各检测路径 → 汇总 → 标注。
//!
//! 检测路径按固定顺序（模型、裂纹、表面不规则）依次执行，每条路径的错误
//! 与 panic 都在路径边界处被截获，只影响该路径自身的贡献。只有图像解码失败
//! 会作为错误返回给调用方。

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, RgbImage};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::classical::{CrackConfig, CrackDetector, IrregularityConfig, IrregularityDetector};
use crate::detection::{DetectError, Detection, DetectionSet, Detector};
use crate::frame::NormalizedFrame;
use crate::input::{InputError, decode_bytes, decode_path};
use crate::model::ModelDetector;
use crate::output::draw::Annotator;
use crate::preprocess::{LetterboxInfo, PreprocessConfig, Preprocessor};

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("输入错误: {0}")]
  Input(#[from] InputError),
}

/// 单条检测路径的执行结果
#[derive(Debug)]
pub struct PathReport {
  pub path: &'static str,
  pub result: Result<Vec<Detection>, DetectError>,
}

/// 某条路径在本次调用中失败的原因，仅用于诊断
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathFailure {
  pub path: &'static str,
  pub reason: String,
}

/// 按路径顺序拼接结果；失败路径不贡献检测，只记入失败列表
pub fn aggregate(reports: Vec<PathReport>) -> (DetectionSet, Vec<PathFailure>) {
  let mut items = Vec::new();
  let mut failures = Vec::new();
  for report in reports {
    match report.result {
      Ok(detections) => items.extend(detections),
      Err(e) => failures.push(PathFailure {
        path: report.path,
        reason: e.to_string(),
      }),
    }
  }
  (DetectionSet::from(items), failures)
}

/// 在路径边界处运行检测器，把 panic 转换为路径错误
pub fn run_isolated(detector: &dyn Detector, frame: &NormalizedFrame) -> PathReport {
  let path = detector.name();
  let result = match catch_unwind(AssertUnwindSafe(|| detector.detect(frame))) {
    Ok(result) => result,
    Err(payload) => {
      let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "未知原因".to_string());
      Err(DetectError::Panicked(message))
    }
  };
  if let Err(e) = &result {
    warn!("检测路径 {} 失败: {}", path, e);
  }
  PathReport { path, result }
}

#[derive(Debug)]
pub struct PipelineOutput {
  pub letterbox: LetterboxInfo,
  pub detections: DetectionSet,
  pub annotated: RgbImage,
  pub failures: Vec<PathFailure>,
}

pub struct DefectPipeline {
  preprocessor: Preprocessor,
  detectors: Vec<Arc<dyn Detector>>,
  annotator: Annotator,
}

impl DefectPipeline {
  pub fn builder() -> DefectPipelineBuilder {
    DefectPipelineBuilder::default()
  }

  pub fn preprocessor(&self) -> &Preprocessor {
    &self.preprocessor
  }

  pub fn detector_names(&self) -> Vec<&'static str> {
    self.detectors.iter().map(|d| d.name()).collect()
  }

  pub fn run_path(&self, path: &Path) -> Result<PipelineOutput, PipelineError> {
    let image = decode_path(path)?;
    Ok(self.run_image(&image))
  }

  pub fn run_bytes(&self, bytes: &[u8]) -> Result<PipelineOutput, PipelineError> {
    let image = decode_bytes(bytes)?;
    Ok(self.run_image(&image))
  }

  /// 对已解码图像执行完整流水线
  pub fn run_image(&self, image: &DynamicImage) -> PipelineOutput {
    let (frame, letterbox) = self.preprocessor.preprocess(image);
    let (detections, failures) = self.detect(&frame);
    let annotated = self.annotator.annotate(frame.as_rgb(), &detections);
    PipelineOutput {
      letterbox,
      detections,
      annotated,
      failures,
    }
  }

  /// 只执行检测与汇总，不做预处理和标注
  pub fn detect(&self, frame: &NormalizedFrame) -> (DetectionSet, Vec<PathFailure>) {
    let reports = self
      .detectors
      .iter()
      .map(|d| run_isolated(d.as_ref(), frame))
      .collect::<Vec<_>>();
    for report in &reports {
      if let Ok(found) = &report.result {
        debug!("路径 {}: {} 个检测结果", report.path, found.len());
      }
    }
    aggregate(reports)
  }
}

/// 流水线构建器；未显式设置时模型路径关闭，经典路径使用默认参数
pub struct DefectPipelineBuilder {
  preprocess: PreprocessConfig,
  model: Option<ModelDetector>,
  crack: CrackConfig,
  irregularity: IrregularityConfig,
  annotator: Option<Annotator>,
}

impl Default for DefectPipelineBuilder {
  fn default() -> Self {
    Self {
      preprocess: PreprocessConfig::default(),
      model: None,
      crack: CrackConfig::default(),
      irregularity: IrregularityConfig::default(),
      annotator: None,
    }
  }
}

impl DefectPipelineBuilder {
  pub fn with_preprocess(mut self, config: PreprocessConfig) -> Self {
    self.preprocess = config;
    self
  }

  pub fn with_model(mut self, model: ModelDetector) -> Self {
    self.model = Some(model);
    self
  }

  pub fn with_crack(mut self, config: CrackConfig) -> Self {
    self.crack = config;
    self
  }

  pub fn with_irregularity(mut self, config: IrregularityConfig) -> Self {
    self.irregularity = config;
    self
  }

  pub fn with_annotator(mut self, annotator: Annotator) -> Self {
    self.annotator = Some(annotator);
    self
  }

  pub fn build(self) -> DefectPipeline {
    let mut detectors: Vec<Arc<dyn Detector>> = Vec::with_capacity(3);
    match self.model {
      Some(model) if model.is_enabled() => detectors.push(Arc::new(model)),
      _ => info!("模型检测路径未启用"),
    }
    detectors.push(Arc::new(CrackDetector::new(self.crack)));
    detectors.push(Arc::new(IrregularityDetector::new(self.irregularity)));

    DefectPipeline {
      preprocessor: Preprocessor::new(self.preprocess),
      detectors,
      annotator: self.annotator.unwrap_or_default(),
    }
  }
}
