// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 单阶段检测网络路径
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
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::detection::{DetectError, Detection, Detector};
use crate::frame::NormalizedFrame;
use crate::{FromUrl, FromUrlWithScheme, url_file_path};

pub mod postprocess;

#[cfg(feature = "model_onnx")]
mod onnx;
#[cfg(feature = "model_onnx")]
pub use self::onnx::OnnxModel;

use self::postprocess::{RawOutput, decode_outputs, into_detections, non_max_suppression};

pub const DEFAULT_TOPOLOGY: &str = "models/yolov4-tiny.onnx";
pub const DEFAULT_WEIGHTS: &str = "models/yolov4-tiny.onnx";
pub const DEFAULT_CLASSES: &str = "models/coco.names";

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("模型文件不存在: {}", .0.display())]
  Missing(PathBuf),
  #[error("权重文件 {} 必须与拓扑文件位于同一目录 {}", .weights.display(), .dir.display())]
  WeightsLocation { weights: PathBuf, dir: PathBuf },
  #[error("模型加载错误: {0}")]
  Load(String),
  #[error("读取类别文件失败: {0}")]
  Classes(#[from] std::io::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("未启用模型推理后端")]
  BackendDisabled,
}

/// 推理后端：输入为 NCHW 浮点张量，输出为原始行数据
pub trait Model: Send + Sync {
  fn input_size(&self) -> (u32, u32);
  fn infer(&self, input: &[f32]) -> Result<Vec<RawOutput>, DetectError>;
}

/// 模型文件位置：拓扑、权重与可选的类别名列表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
  pub topology: PathBuf,
  pub weights: PathBuf,
  pub classes: Option<PathBuf>,
}

impl Default for ModelConfig {
  fn default() -> Self {
    Self {
      topology: PathBuf::from(DEFAULT_TOPOLOGY),
      weights: PathBuf::from(DEFAULT_WEIGHTS),
      classes: Some(PathBuf::from(DEFAULT_CLASSES)),
    }
  }
}

impl FromUrlWithScheme for ModelConfig {
  const SCHEME: &'static str = "onnx";
}

/// `onnx:///models/net.onnx?weights=/models/net.data&classes=/models/coco.names`
impl FromUrl for ModelConfig {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ModelError::SchemeMismatch(url.scheme().to_string()));
    }

    let topology = url_file_path(url);
    let mut weights = topology.clone();
    let mut classes = None;
    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "weights" => weights = PathBuf::from(value.as_ref()),
        "classes" => classes = Some(PathBuf::from(value.as_ref())),
        other => warn!("忽略未知的模型参数: {}", other),
      }
    }

    Ok(Self {
      topology,
      weights,
      classes,
    })
  }
}

impl ModelConfig {
  /// 权重内嵌在拓扑文件中的单文件模型
  pub fn single_file(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    Self {
      weights: path.clone(),
      topology: path,
      classes: None,
    }
  }

  pub fn with_classes(mut self, classes: impl Into<PathBuf>) -> Self {
    self.classes = Some(classes.into());
    self
  }

  /// 拓扑与权重文件都存在，且外部权重位于拓扑文件目录中
  pub fn check_files(&self) -> Result<(), ModelError> {
    for path in [&self.topology, &self.weights] {
      if !path.is_file() {
        return Err(ModelError::Missing(path.clone()));
      }
    }
    if self.weights != self.topology {
      let dir = parent_dir(&self.topology);
      if parent_dir(&self.weights) != dir {
        return Err(ModelError::WeightsLocation {
          weights: self.weights.clone(),
          dir,
        });
      }
    }
    Ok(())
  }

  /// 类别文件不存在时返回空列表，所有类别都解析为 "Unknown"
  pub fn load_class_names(&self) -> Result<Vec<String>, ModelError> {
    match &self.classes {
      Some(path) if path.is_file() => {
        let text = std::fs::read_to_string(path)?;
        Ok(parse_class_names(&text))
      }
      Some(path) => {
        warn!("类别文件不存在: {}", path.display());
        Ok(Vec::new())
      }
      None => Ok(Vec::new()),
    }
  }
}

fn parent_dir(path: &Path) -> PathBuf {
  path
    .parent()
    .map(Path::to_path_buf)
    .unwrap_or_default()
}

/// 每行一个类别名，首尾空白去除
pub fn parse_class_names(text: &str) -> Vec<String> {
  text.lines().map(|l| l.trim().to_string()).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelDetectorConfig {
  pub input_size: (u32, u32),
  pub score_threshold: f32,
  pub nms_threshold: f32,
}

impl Default for ModelDetectorConfig {
  fn default() -> Self {
    Self {
      input_size: (416, 416),
      score_threshold: 0.5,
      nms_threshold: 0.4,
    }
  }
}

impl ModelDetectorConfig {
  pub fn with_input_size(mut self, width: u32, height: u32) -> Self {
    self.input_size = (width, height);
    self
  }

  pub fn with_thresholds(mut self, score: f32, nms: f32) -> Self {
    self.score_threshold = score;
    self.nms_threshold = nms;
    self
  }
}

/// 模型检测路径；未加载模型时恒返回空结果
#[derive(Clone, Default)]
pub struct ModelDetector {
  model: Option<Arc<dyn Model>>,
  class_names: Vec<String>,
  config: ModelDetectorConfig,
}

impl std::fmt::Debug for ModelDetector {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ModelDetector")
      .field("enabled", &self.is_enabled())
      .field("classes", &self.class_names.len())
      .field("config", &self.config)
      .finish()
  }
}

impl ModelDetector {
  pub fn disabled() -> Self {
    Self::default()
  }

  pub fn with_model(model: Arc<dyn Model>, class_names: Vec<String>) -> Self {
    Self {
      model: Some(model),
      class_names,
      config: ModelDetectorConfig::default(),
    }
  }

  pub fn with_config(mut self, config: ModelDetectorConfig) -> Self {
    self.config = config;
    self
  }

  pub fn is_enabled(&self) -> bool {
    self.model.is_some()
  }

  #[cfg(feature = "model_onnx")]
  pub fn load(config: &ModelConfig, detector: ModelDetectorConfig) -> Result<Self, ModelError> {
    config.check_files()?;
    let class_names = config.load_class_names()?;
    debug!("类别数量: {}", class_names.len());
    let model = OnnxModel::load(config, detector.input_size)?;
    Ok(Self::with_model(Arc::new(model), class_names).with_config(detector))
  }

  #[cfg(not(feature = "model_onnx"))]
  pub fn load(_config: &ModelConfig, _detector: ModelDetectorConfig) -> Result<Self, ModelError> {
    Err(ModelError::BackendDisabled)
  }

  /// 加载失败时记录一次日志并退化为仅经典路径
  pub fn load_or_disable(config: &ModelConfig, detector: ModelDetectorConfig) -> Self {
    match Self::load(config, detector) {
      Ok(model) => {
        info!("模型检测路径已启用");
        model
      }
      Err(ModelError::Missing(path)) => {
        info!("未找到模型文件 {}，仅使用经典检测", path.display());
        Self::disabled()
      }
      Err(e) => {
        warn!("模型加载失败: {}，仅使用经典检测", e);
        Self::disabled()
      }
    }
  }
}

impl Detector for ModelDetector {
  fn name(&self) -> &'static str {
    "model"
  }

  fn detect(&self, frame: &NormalizedFrame) -> Result<Vec<Detection>, DetectError> {
    let Some(model) = &self.model else {
      return Ok(Vec::new());
    };
    let (width, height) = (frame.width(), frame.height());
    if width == 0 || height == 0 {
      return Err(DetectError::InvalidFrame { width, height });
    }

    let (in_w, in_h) = model.input_size();
    let outputs = model.infer(&frame.to_nchw_f32(in_w, in_h))?;
    let candidates = decode_outputs(&outputs, width, height, self.config.score_threshold)?;
    let kept = non_max_suppression(candidates, self.config.nms_threshold);
    let detections = into_detections(kept, &self.class_names, width, height);
    debug!("模型检测: {} 个结果", detections.len());
    Ok(detections)
  }
}
