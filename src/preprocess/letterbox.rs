// 该文件是 Shanan （山南西风） 项目的一部分。
// src/preprocess/letterbox.rs - 保持宽高比的缩放与填充
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

use image::{RgbImage, imageops};
use serde::Serialize;

/// letterbox 几何信息，可用于把检测框映射回原图
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LetterboxInfo {
  pub scale: f64,
  pub resized_width: u32,
  pub resized_height: u32,
  pub pad_left: u32,
  pub pad_top: u32,
}

/// 等比缩放后用零值像素对称填充到 target_w×target_h，奇数余量给右/下侧
pub fn letterbox(image: &RgbImage, target_w: u32, target_h: u32) -> (RgbImage, LetterboxInfo) {
  let (src_w, src_h) = image.dimensions();
  let scale = (target_w as f64 / src_w as f64).min(target_h as f64 / src_h as f64);

  let new_w = ((src_w as f64 * scale) as u32).clamp(1, target_w);
  let new_h = ((src_h as f64 * scale) as u32).clamp(1, target_h);

  let resized = if (new_w, new_h) == (src_w, src_h) {
    image.clone()
  } else {
    imageops::resize(image, new_w, new_h, imageops::FilterType::Triangle)
  };

  let pad_left = (target_w - new_w) / 2;
  let pad_top = (target_h - new_h) / 2;

  let info = LetterboxInfo {
    scale,
    resized_width: new_w,
    resized_height: new_h,
    pad_left,
    pad_top,
  };

  if (new_w, new_h) == (target_w, target_h) {
    return (resized, info);
  }

  let mut canvas = RgbImage::new(target_w, target_h);
  imageops::replace(&mut canvas, &resized, pad_left as i64, pad_top as i64);
  (canvas, info)
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn wide_image_is_padded_vertically_with_zeros() {
    let image = RgbImage::from_pixel(200, 100, Rgb([200, 150, 100]));
    let (out, info) = letterbox(&image, 640, 640);

    assert_eq!(out.dimensions(), (640, 640));
    assert_eq!((info.resized_width, info.resized_height), (640, 320));
    assert_eq!((info.pad_left, info.pad_top), (0, 160));

    for x in [0, 320, 639] {
      assert_eq!(out.get_pixel(x, 0), &Rgb([0, 0, 0]));
      assert_eq!(out.get_pixel(x, 159), &Rgb([0, 0, 0]));
      assert_eq!(out.get_pixel(x, 480), &Rgb([0, 0, 0]));
      assert_eq!(out.get_pixel(x, 639), &Rgb([0, 0, 0]));
      assert_eq!(out.get_pixel(x, 320), &Rgb([200, 150, 100]));
    }
  }

  #[test]
  fn odd_remainder_goes_to_trailing_side() {
    // 10x7 -> scale 64, 640x448 -> 目标 640x449, 剩余 1 行给底部
    let image = RgbImage::from_pixel(10, 7, Rgb([9, 9, 9]));
    let (out, info) = letterbox(&image, 640, 449);
    assert_eq!(info.resized_height, 448);
    assert_eq!(info.pad_top, 0);
    assert_eq!(out.get_pixel(5, 447), &Rgb([9, 9, 9]));
    assert_eq!(out.get_pixel(5, 448), &Rgb([0, 0, 0]));

    // 剩余 3 列：左 1 右 2
    let image = RgbImage::from_pixel(7, 10, Rgb([9, 9, 9]));
    let (out, info) = letterbox(&image, 10, 10);
    assert_eq!((info.resized_width, info.pad_left), (7, 1));
    assert_eq!(out.get_pixel(0, 5), &Rgb([0, 0, 0]));
    assert_eq!(out.get_pixel(1, 5), &Rgb([9, 9, 9]));
    assert_eq!(out.get_pixel(7, 5), &Rgb([9, 9, 9]));
    assert_eq!(out.get_pixel(8, 5), &Rgb([0, 0, 0]));
    assert_eq!(out.get_pixel(9, 5), &Rgb([0, 0, 0]));
  }

  #[test]
  fn source_content_is_never_cropped() {
    // 四角标记在缩放后仍应全部出现在非填充区域内
    let mut image = RgbImage::from_pixel(400, 160, Rgb([50, 50, 50]));
    for (x, y) in [(0, 0), (399, 0), (0, 159), (399, 159)] {
      image.put_pixel(x, y, Rgb([255, 255, 255]));
    }
    let (out, info) = letterbox(&image, 100, 100);
    assert_eq!((info.resized_width, info.resized_height), (100, 40));
    let top = info.pad_top;
    let bottom = info.pad_top + info.resized_height - 1;
    for y in [top, bottom] {
      assert_ne!(out.get_pixel(0, y), &Rgb([0, 0, 0]));
      assert_ne!(out.get_pixel(99, y), &Rgb([0, 0, 0]));
    }
  }

  #[test]
  fn exact_size_is_passed_through() {
    let image = RgbImage::from_fn(64, 64, |x, y| Rgb([x as u8, y as u8, 0]));
    let (out, info) = letterbox(&image, 64, 64);
    assert_eq!(out, image);
    assert_eq!(info.scale, 1.0);
  }
}
