// 该文件是 Shanan （山南西风） 项目的一部分。
// src/preprocess/denoise.rs - 去噪
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

use std::str::FromStr;

use image::{GrayImage, Rgb, RgbImage};
use imageproc::filter::{median_filter, separable_filter_equal};

/// 5 抽头二项式核，即 5×5 高斯核的可分离形式
pub const SMOOTH_KERNEL_5: [f32; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

const MEDIAN_RADIUS: u32 = 2;
const BILATERAL_DIAMETER: i32 = 9;
const BILATERAL_SIGMA_COLOR: f32 = 75.0;
const BILATERAL_SIGMA_SPACE: f32 = 75.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DenoiseMode {
  /// 固定 5×5 平滑核
  #[default]
  Gaussian,
  /// 5×5 中值滤波，适合椒盐噪声
  Median,
  /// 双边滤波，保留边缘
  EdgePreserving,
  None,
}

impl FromStr for DenoiseMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "gaussian" => Ok(DenoiseMode::Gaussian),
      "median" => Ok(DenoiseMode::Median),
      "bilateral" | "edge-preserving" => Ok(DenoiseMode::EdgePreserving),
      "none" => Ok(DenoiseMode::None),
      other => Err(format!("未知的去噪方式: {}", other)),
    }
  }
}

pub fn remove_noise(image: &RgbImage, mode: DenoiseMode) -> RgbImage {
  match mode {
    DenoiseMode::Gaussian => smooth5(image),
    DenoiseMode::Median => median_filter(image, MEDIAN_RADIUS, MEDIAN_RADIUS),
    DenoiseMode::EdgePreserving => bilateral(image),
    DenoiseMode::None => image.clone(),
  }
}

/// 固定 5×5 平滑
pub fn smooth5(image: &RgbImage) -> RgbImage {
  separable_filter_equal(image, &SMOOTH_KERNEL_5)
}

pub fn smooth5_gray(image: &GrayImage) -> GrayImage {
  separable_filter_equal(image, &SMOOTH_KERNEL_5)
}

fn bilateral(image: &RgbImage) -> RgbImage {
  let (width, height) = image.dimensions();
  let radius = BILATERAL_DIAMETER / 2;
  let color_coeff = -0.5 / (BILATERAL_SIGMA_COLOR * BILATERAL_SIGMA_COLOR);
  let space_coeff = -0.5 / (BILATERAL_SIGMA_SPACE * BILATERAL_SIGMA_SPACE);

  // 圆形窗口内的空间权重只需计算一次
  let mut window = Vec::new();
  for dy in -radius..=radius {
    for dx in -radius..=radius {
      let r2 = (dx * dx + dy * dy) as f32;
      if r2.sqrt() <= radius as f32 {
        window.push((dx, dy, (r2 * space_coeff).exp()));
      }
    }
  }

  RgbImage::from_fn(width, height, |x, y| {
    let center = image.get_pixel(x, y);
    let mut sum = [0f32; 3];
    let mut weight_sum = 0f32;

    for &(dx, dy, space_weight) in &window {
      let sx = (x as i32 + dx).clamp(0, width as i32 - 1) as u32;
      let sy = (y as i32 + dy).clamp(0, height as i32 - 1) as u32;
      let sample = image.get_pixel(sx, sy);

      // 颜色距离取三通道 L1 距离
      let color_dist: f32 = (0..3)
        .map(|c| (sample[c] as f32 - center[c] as f32).abs())
        .sum();
      let w = space_weight * (color_dist * color_dist * color_coeff).exp();

      for c in 0..3 {
        sum[c] += sample[c] as f32 * w;
      }
      weight_sum += w;
    }

    Rgb([
      (sum[0] / weight_sum).round().clamp(0.0, 255.0) as u8,
      (sum[1] / weight_sum).round().clamp(0.0, 255.0) as u8,
      (sum[2] / weight_sum).round().clamp(0.0, 255.0) as u8,
    ])
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn every_mode_keeps_uniform_image_uniform() {
    let image = RgbImage::from_pixel(32, 32, Rgb([96, 96, 96]));
    for mode in [
      DenoiseMode::Gaussian,
      DenoiseMode::Median,
      DenoiseMode::EdgePreserving,
      DenoiseMode::None,
    ] {
      let out = remove_noise(&image, mode);
      assert_eq!(out.dimensions(), (32, 32));
      assert!(out.pixels().all(|p| p == &Rgb([96, 96, 96])), "{mode:?}");
    }
  }

  #[test]
  fn median_removes_isolated_speck() {
    let mut image = RgbImage::from_pixel(16, 16, Rgb([20, 20, 20]));
    image.put_pixel(8, 8, Rgb([255, 255, 255]));
    let out = remove_noise(&image, DenoiseMode::Median);
    assert_eq!(out.get_pixel(8, 8), &Rgb([20, 20, 20]));
  }

  #[test]
  fn bilateral_keeps_strong_edge() {
    let image = RgbImage::from_fn(20, 20, |x, _| {
      if x < 10 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
    });
    let out = remove_noise(&image, DenoiseMode::EdgePreserving);
    assert!(out.get_pixel(9, 10)[0] < 10);
    assert!(out.get_pixel(10, 10)[0] > 245);
  }

  #[test]
  fn parse_mode_names() {
    assert_eq!("median".parse::<DenoiseMode>().unwrap(), DenoiseMode::Median);
    assert_eq!("Bilateral".parse::<DenoiseMode>().unwrap(), DenoiseMode::EdgePreserving);
    assert!("sharpen".parse::<DenoiseMode>().is_err());
  }
}
