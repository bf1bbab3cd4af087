// 该文件是 Shanan （山南西风） 项目的一部分。
// src/preprocess.rs - 图像预处理
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

//! 预处理器：把任意解码后的图像规范化为固定尺寸、去噪、亮度调整后的 RGB8 帧。
//!
//! 处理顺序固定：转换为 RGB8 → letterbox 缩放 → 去噪 → 亮度/对比度 →（可选）CLAHE。

use image::{DynamicImage, RgbImage};
use tracing::debug;

use crate::frame::NormalizedFrame;

mod contrast;
mod denoise;
mod letterbox;

pub use self::contrast::enhance_contrast;
pub use self::denoise::{DenoiseMode, remove_noise, smooth5, smooth5_gray};
pub use self::letterbox::{LetterboxInfo, letterbox};

pub const DEFAULT_TARGET_SIZE: (u32, u32) = (640, 640);

#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessConfig {
  pub target_size: (u32, u32),
  pub denoise: DenoiseMode,
  /// 对比度系数
  pub alpha: f32,
  /// 亮度偏移
  pub beta: f32,
  pub enhance_contrast: bool,
}

impl Default for PreprocessConfig {
  fn default() -> Self {
    Self {
      target_size: DEFAULT_TARGET_SIZE,
      denoise: DenoiseMode::Gaussian,
      alpha: 1.0,
      beta: 0.0,
      enhance_contrast: false,
    }
  }
}

impl PreprocessConfig {
  pub fn with_target_size(mut self, width: u32, height: u32) -> Self {
    self.target_size = (width.max(1), height.max(1));
    self
  }

  pub fn with_denoise(mut self, denoise: DenoiseMode) -> Self {
    self.denoise = denoise;
    self
  }

  pub fn with_brightness(mut self, alpha: f32, beta: f32) -> Self {
    self.alpha = alpha;
    self.beta = beta;
    self
  }

  pub fn with_enhance_contrast(mut self, enhance: bool) -> Self {
    self.enhance_contrast = enhance;
    self
  }
}

#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
  config: PreprocessConfig,
}

impl Preprocessor {
  pub fn new(config: PreprocessConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &PreprocessConfig {
    &self.config
  }

  pub fn preprocess(&self, image: &DynamicImage) -> (NormalizedFrame, LetterboxInfo) {
    // 入口处一次性转换为规范布局
    let rgb = image.to_rgb8();
    debug!("预处理输入尺寸: {}x{}", rgb.width(), rgb.height());

    let (target_w, target_h) = self.config.target_size;
    let (resized, info) = letterbox(&rgb, target_w, target_h);
    let denoised = remove_noise(&resized, self.config.denoise);
    let mut adjusted = adjust_brightness(&denoised, self.config.alpha, self.config.beta);

    if self.config.enhance_contrast {
      debug!("应用 CLAHE 对比度增强");
      adjusted = enhance_contrast(&adjusted);
    }

    (NormalizedFrame::new(adjusted), info)
  }
}

/// `out = clip(alpha * in + beta, 0, 255)`
pub fn adjust_brightness(image: &RgbImage, alpha: f32, beta: f32) -> RgbImage {
  let mut out = image.clone();
  if alpha == 1.0 && beta == 0.0 {
    return out;
  }
  for v in out.iter_mut() {
    *v = (alpha * (*v as f32) + beta).clamp(0.0, 255.0) as u8;
  }
  out
}
