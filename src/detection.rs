// 该文件是 Shanan （山南西风） 项目的一部分。
// src/detection.rs - 检测结果定义
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

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frame::NormalizedFrame;

pub const CRACK: &str = "Crack";
pub const SURFACE_IRREGULARITY: &str = "Surface Irregularity";
pub const UNKNOWN: &str = "Unknown";

/// 像素坐标边界框 [x1, y1, x2, y2]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BBox {
  pub x1: i32,
  pub y1: i32,
  pub x2: i32,
  pub y2: i32,
}

impl From<[i32; 4]> for BBox {
  fn from([x1, y1, x2, y2]: [i32; 4]) -> Self {
    Self { x1, y1, x2, y2 }
  }
}

impl From<BBox> for [i32; 4] {
  fn from(b: BBox) -> Self {
    [b.x1, b.y1, b.x2, b.y2]
  }
}

impl BBox {
  pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
    Self { x1, y1, x2, y2 }
  }

  pub fn width(&self) -> i32 {
    self.x2 - self.x1
  }

  pub fn height(&self) -> i32 {
    self.y2 - self.y1
  }

  pub fn area(&self) -> i64 {
    (self.width().max(0) as i64) * (self.height().max(0) as i64)
  }

  /// 将边界框限制在 [0, width) × [0, height) 内；退化为空框时返回 None
  pub fn clamp_to(&self, width: u32, height: u32) -> Option<BBox> {
    if width < 2 || height < 2 {
      return None;
    }
    let max_x = width as i32 - 1;
    let max_y = height as i32 - 1;
    let (x1, x2) = (self.x1.min(self.x2), self.x1.max(self.x2));
    let (y1, y2) = (self.y1.min(self.y2), self.y1.max(self.y2));
    let clamped = BBox {
      x1: x1.clamp(0, max_x),
      y1: y1.clamp(0, max_y),
      x2: x2.clamp(0, max_x),
      y2: y2.clamp(0, max_y),
    };
    (clamped.x1 < clamped.x2 && clamped.y1 < clamped.y2).then_some(clamped)
  }

  /// 计算两个边界框的 IoU
  pub fn iou(&self, other: &BBox) -> f32 {
    let x1 = self.x1.max(other.x1);
    let y1 = self.y1.max(other.y1);
    let x2 = self.x2.min(other.x2);
    let y2 = self.y2.min(other.y2);

    let intersection = ((x2 - x1).max(0) as i64 * (y2 - y1).max(0) as i64) as f32;
    let union = (self.area() + other.area()) as f32 - intersection;

    if union > 0.0 {
      intersection / union
    } else {
      0.0
    }
  }
}

/// 单个缺陷检测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  #[serde(rename = "type")]
  pub kind: String,
  pub confidence: f32,
  pub bbox: BBox,
}

impl Detection {
  /// 构造检测结果，置信度限制到 [0, 1]，边界框限制到图像内部。
  pub fn new(
    kind: impl Into<String>,
    confidence: f32,
    bbox: BBox,
    width: u32,
    height: u32,
  ) -> Option<Self> {
    let bbox = bbox.clamp_to(width, height)?;
    let confidence = if confidence.is_finite() {
      confidence.clamp(0.0, 1.0)
    } else {
      0.0
    };
    Some(Self {
      kind: kind.into(),
      confidence,
      bbox,
    })
  }
}

/// 有序检测集合：模型路径在前，其后为裂纹、表面不规则
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionSet {
  pub items: Vec<Detection>,
}

impl DetectionSet {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
    self.items.iter()
  }

  pub fn count_of(&self, kind: &str) -> usize {
    self.items.iter().filter(|d| d.kind == kind).count()
  }
}

impl From<Vec<Detection>> for DetectionSet {
  fn from(items: Vec<Detection>) -> Self {
    Self { items }
  }
}

impl<'a> IntoIterator for &'a DetectionSet {
  type Item = &'a Detection;
  type IntoIter = std::slice::Iter<'a, Detection>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("模型推理错误: {0}")]
  Inference(String),
  #[error("模型输出格式错误: {0}")]
  OutputShape(String),
  #[error("检测路径异常终止: {0}")]
  Panicked(String),
  #[error("图像尺寸无效: {width}x{height}")]
  InvalidFrame { width: u32, height: u32 },
}

/// 检测器：模型路径与经典路径共用的能力接口
pub trait Detector: Send + Sync {
  fn name(&self) -> &'static str;
  fn detect(&self, frame: &NormalizedFrame) -> Result<Vec<Detection>, DetectError>;
}
