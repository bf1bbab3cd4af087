// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - 规范化帧定义
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

use image::{GrayImage, RgbImage, imageops};

const RGB_CHANNELS: usize = 3;

/// 流水线内部唯一的像素布局：RGB 8 位、按行打包（NHWC）。
/// 正常情况下由预处理器构造。
#[derive(Debug, Clone)]
pub struct NormalizedFrame {
  image: RgbImage,
}

impl NormalizedFrame {
  pub(crate) fn new(image: RgbImage) -> Self {
    Self { image }
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn as_rgb(&self) -> &RgbImage {
    &self.image
  }

  pub fn into_rgb(self) -> RgbImage {
    self.image
  }

  pub fn to_gray(&self) -> GrayImage {
    imageops::grayscale(&self.image)
  }

  /// 拉伸到 width×height 并转换为 NCHW 浮点布局，像素值归一化到 [0, 1]
  pub fn to_nchw_f32(&self, width: u32, height: u32) -> Vec<f32> {
    let resized;
    let image = if self.image.dimensions() == (width, height) {
      &self.image
    } else {
      resized = imageops::resize(&self.image, width, height, imageops::FilterType::Triangle);
      &resized
    };

    let plane_size = (width * height) as usize;
    let mut data = vec![0f32; plane_size * RGB_CHANNELS];

    for (x, y, pixel) in image.enumerate_pixels() {
      let idx = (y * width + x) as usize;
      for c in 0..RGB_CHANNELS {
        data[c * plane_size + idx] = pixel[c] as f32 / 255.0;
      }
    }

    data
  }
}

// 直接包装已是 RGB8 的图像，不做尺寸规范化
impl From<RgbImage> for NormalizedFrame {
  fn from(image: RgbImage) -> Self {
    Self::new(image)
  }
}
