// 该文件是 Shanan （山南西风） 项目的一部分。
// src/classical/threshold.rs - 高斯加权自适应阈值
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

use image::{GrayImage, Luma};
use imageproc::filter::separable_filter_equal;

/// 反相二值化：像素比局部高斯均值暗超过 `offset` 时置 255，否则置 0
pub fn adaptive_threshold_gaussian(image: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
  let kernel = gaussian_kernel(block_size);
  let mean = separable_filter_equal(image, &kernel);

  GrayImage::from_fn(image.width(), image.height(), |x, y| {
    let src = image.get_pixel(x, y)[0] as i32;
    let local = mean.get_pixel(x, y)[0] as i32;
    if src - local > -offset {
      Luma([0])
    } else {
      Luma([255])
    }
  })
}

/// 奇数尺寸高斯核，σ 按 `0.3·((k−1)·0.5 − 1) + 0.8` 由尺寸推出
fn gaussian_kernel(size: u32) -> Vec<f32> {
  let size = if size % 2 == 0 { size + 1 } else { size.max(3) };
  let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
  let half = (size / 2) as i32;
  let mut kernel: Vec<f32> = (-half..=half)
    .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
    .collect();
  let sum: f32 = kernel.iter().sum();
  for k in kernel.iter_mut() {
    *k /= sum;
  }
  kernel
}
