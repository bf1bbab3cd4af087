// 该文件是 Shanan （山南西风） 项目的一部分。
// src/preprocess/contrast.rs - 亮度通道自适应直方图均衡（CLAHE）
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

use image::{GrayImage, Luma, Rgb, RgbImage};

const CLAHE_CLIP_LIMIT: f32 = 2.0;
const CLAHE_TILES: u32 = 8;

/// 只对亮度通道做 CLAHE，色度（Cb/Cr）保持不变
pub fn enhance_contrast(image: &RgbImage) -> RgbImage {
  let (width, height) = image.dimensions();
  let mut luma = GrayImage::new(width, height);
  let mut chroma = Vec::with_capacity((width * height) as usize);

  for (x, y, p) in image.enumerate_pixels() {
    let (yv, cb, cr) = rgb_to_ycbcr(p);
    luma.put_pixel(x, y, Luma([yv.round().clamp(0.0, 255.0) as u8]));
    chroma.push((cb, cr));
  }

  let equalized = clahe(&luma, CLAHE_CLIP_LIMIT, CLAHE_TILES, CLAHE_TILES);

  RgbImage::from_fn(width, height, |x, y| {
    let (cb, cr) = chroma[(y * width + x) as usize];
    ycbcr_to_rgb(equalized.get_pixel(x, y)[0] as f32, cb, cr)
  })
}

// BT.601 全范围
fn rgb_to_ycbcr(p: &Rgb<u8>) -> (f32, f32, f32) {
  let (r, g, b) = (p[0] as f32, p[1] as f32, p[2] as f32);
  let y = 0.299 * r + 0.587 * g + 0.114 * b;
  let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
  let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
  (y, cb, cr)
}

fn ycbcr_to_rgb(y: f32, cb: f32, cr: f32) -> Rgb<u8> {
  let r = y + 1.402 * (cr - 128.0);
  let g = y - 0.344_136 * (cb - 128.0) - 0.714_136 * (cr - 128.0);
  let b = y + 1.772 * (cb - 128.0);
  Rgb([
    r.round().clamp(0.0, 255.0) as u8,
    g.round().clamp(0.0, 255.0) as u8,
    b.round().clamp(0.0, 255.0) as u8,
  ])
}

/// 分块限制对比度直方图均衡，块间双线性插值
pub fn clahe(image: &GrayImage, clip_limit: f32, tiles_x: u32, tiles_y: u32) -> GrayImage {
  let (width, height) = image.dimensions();
  if width == 0 || height == 0 {
    return image.clone();
  }
  let tiles_x = tiles_x.clamp(1, width);
  let tiles_y = tiles_y.clamp(1, height);
  let tile_w = width.div_ceil(tiles_x);
  let tile_h = height.div_ceil(tiles_y);

  let mut luts = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];
  for ty in 0..tiles_y {
    for tx in 0..tiles_x {
      let x0 = tx * tile_w;
      let y0 = ty * tile_h;
      let x1 = (x0 + tile_w).min(width);
      let y1 = (y0 + tile_h).min(height);

      let mut hist = [0u32; 256];
      for y in y0..y1 {
        for x in x0..x1 {
          hist[image.get_pixel(x, y)[0] as usize] += 1;
        }
      }
      let area = (x1.saturating_sub(x0) * y1.saturating_sub(y0)).max(1);
      luts[(ty * tiles_x + tx) as usize] = tile_lut(&mut hist, area, clip_limit);
    }
  }

  GrayImage::from_fn(width, height, |x, y| {
    let v = image.get_pixel(x, y)[0] as usize;

    // 像素相对块中心的位置
    let fx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
    let fy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
    let tx0 = fx.floor().clamp(0.0, (tiles_x - 1) as f32) as u32;
    let ty0 = fy.floor().clamp(0.0, (tiles_y - 1) as f32) as u32;
    let tx1 = (tx0 + 1).min(tiles_x - 1);
    let ty1 = (ty0 + 1).min(tiles_y - 1);
    let ax = (fx - tx0 as f32).clamp(0.0, 1.0);
    let ay = (fy - ty0 as f32).clamp(0.0, 1.0);

    let lut = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][v] as f32;
    let top = lut(tx0, ty0) * (1.0 - ax) + lut(tx1, ty0) * ax;
    let bottom = lut(tx0, ty1) * (1.0 - ax) + lut(tx1, ty1) * ax;
    Luma([(top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8])
  })
}

fn tile_lut(hist: &mut [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
  let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);

  // 裁剪超出部分并平均分配回各灰度级
  let mut excess = 0u32;
  for h in hist.iter_mut() {
    if *h > limit {
      excess += *h - limit;
      *h = limit;
    }
  }
  let bonus = excess / 256;
  for h in hist.iter_mut() {
    *h += bonus;
  }
  let residual = (excess % 256) as usize;
  if residual > 0 {
    let step = (256 / residual).max(1);
    for i in (0..256).step_by(step).take(residual) {
      hist[i] += 1;
    }
  }

  let scale = 255.0 / area as f32;
  let mut lut = [0u8; 256];
  let mut cumulative = 0u32;
  for (i, h) in hist.iter().enumerate() {
    cumulative += h;
    lut[i] = (cumulative as f32 * scale).round().clamp(0.0, 255.0) as u8;
  }
  lut
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn gray_image_stays_gray() {
    let image = RgbImage::from_fn(64, 64, |x, _| {
      let v = 100 + (x % 8) as u8;
      Rgb([v, v, v])
    });
    let out = enhance_contrast(&image);
    assert_eq!(out.dimensions(), image.dimensions());
    for p in out.pixels() {
      assert!(p[0].abs_diff(p[1]) <= 1 && p[1].abs_diff(p[2]) <= 1, "{p:?}");
    }
  }

  #[test]
  fn low_contrast_range_is_stretched() {
    let image = GrayImage::from_fn(64, 64, |x, _| Luma([100 + (x % 16) as u8]));
    let out = clahe(&image, 40.0, 1, 1);
    let min = out.pixels().map(|p| p[0]).min().unwrap();
    let max = out.pixels().map(|p| p[0]).max().unwrap();
    assert!(max - min > 100, "range {min}..{max}");
  }
}
