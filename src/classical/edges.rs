// 该文件是 Shanan （山南西风） 项目的一部分。
// src/classical/edges.rs - 双阈值边缘检测
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

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::definitions::Image;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

type Magnitude = ImageBuffer<Luma<f32>, Vec<f32>>;

/// tan(22.5°) 与 tan(67.5°)，用于把梯度方向量化为四个方向
const TAN_22_5: f32 = 0.414_213_57;
const TAN_67_5: f32 = 2.414_213_7;

/// Canny 边缘检测，输入须已平滑，这里不再模糊。
///
/// 梯度为 3×3 Sobel，幅值取 `|gx| + |gy|`；经非极大值抑制后，
/// 幅值不低于 `high` 的像素为强边缘，8 邻域内不低于 `low` 的像素随之连通。
/// 输出中边缘为 255，其余为 0。
pub fn canny_presmoothed(image: &GrayImage, low: f32, high: f32) -> GrayImage {
  let (width, height) = image.dimensions();
  if width < 3 || height < 3 {
    return GrayImage::new(width, height);
  }

  let gx = horizontal_sobel(image);
  let gy = vertical_sobel(image);
  let magnitude = Magnitude::from_fn(width, height, |x, y| {
    let h = gx.get_pixel(x, y)[0] as f32;
    let v = gy.get_pixel(x, y)[0] as f32;
    Luma([h.abs() + v.abs()])
  });

  let thinned = non_maximum_suppression(&magnitude, &gx, &gy);
  hysteresis(&thinned, low, high)
}

fn non_maximum_suppression(
  magnitude: &Magnitude,
  gx: &Image<Luma<i16>>,
  gy: &Image<Luma<i16>>,
) -> Magnitude {
  let (width, height) = magnitude.dimensions();
  let mut out = Magnitude::new(width, height);
  for y in 1..height - 1 {
    for x in 1..width - 1 {
      let value = magnitude.get_pixel(x, y)[0];
      if value == 0.0 {
        continue;
      }
      let h = gx.get_pixel(x, y)[0] as f32;
      let v = gy.get_pixel(x, y)[0] as f32;
      let (ah, av) = (h.abs(), v.abs());

      // 沿梯度方向的两个相邻像素
      let ((x1, y1), (x2, y2)) = if av <= ah * TAN_22_5 {
        ((x - 1, y), (x + 1, y))
      } else if av >= ah * TAN_67_5 {
        ((x, y - 1), (x, y + 1))
      } else if (h > 0.0) == (v > 0.0) {
        ((x - 1, y - 1), (x + 1, y + 1))
      } else {
        ((x + 1, y - 1), (x - 1, y + 1))
      };

      if value >= magnitude.get_pixel(x1, y1)[0] && value >= magnitude.get_pixel(x2, y2)[0] {
        out.put_pixel(x, y, Luma([value]));
      }
    }
  }
  out
}

fn hysteresis(thinned: &Magnitude, low: f32, high: f32) -> GrayImage {
  let (width, height) = thinned.dimensions();
  let mut out = GrayImage::new(width, height);
  let mut stack = Vec::new();

  for y in 0..height {
    for x in 0..width {
      if thinned.get_pixel(x, y)[0] < high || out.get_pixel(x, y)[0] != 0 {
        continue;
      }
      out.put_pixel(x, y, Luma([255]));
      stack.push((x, y));

      while let Some((cx, cy)) = stack.pop() {
        for ny in cy.saturating_sub(1)..=(cy + 1).min(height - 1) {
          for nx in cx.saturating_sub(1)..=(cx + 1).min(width - 1) {
            let weak = thinned.get_pixel(nx, ny)[0];
            if weak > 0.0 && weak >= low && out.get_pixel(nx, ny)[0] == 0 {
              out.put_pixel(nx, ny, Luma([255]));
              stack.push((nx, ny));
            }
          }
        }
      }
    }
  }
  out
}
