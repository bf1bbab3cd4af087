// 该文件是 Shanan （山南西风） 项目的一部分。
// src/classical/irregularity.rs - 表面不规则检测
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

use image::GrayImage;
use tracing::debug;

use super::{adaptive_threshold_gaussian, check_frame, external_contours};
use crate::detection::{DetectError, Detection, Detector, SURFACE_IRREGULARITY};
use crate::frame::NormalizedFrame;

#[derive(Debug, Clone, PartialEq)]
pub struct IrregularityConfig {
  /// 自适应阈值邻域边长（奇数）
  pub block_size: u32,
  pub offset: i32,
  pub min_area: f64,
  pub max_area: f64,
  pub max_circularity: f64,
  pub max_confidence: f32,
  pub area_scale: f64,
}

impl Default for IrregularityConfig {
  fn default() -> Self {
    Self {
      block_size: 11,
      offset: 2,
      min_area: 200.0,
      max_area: 50_000.0,
      max_circularity: 0.5,
      max_confidence: 0.8,
      area_scale: 5000.0,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct IrregularityDetector {
  config: IrregularityConfig,
}

impl IrregularityDetector {
  pub fn new(config: IrregularityConfig) -> Self {
    Self { config }
  }

  pub fn irregularity_mask(&self, gray: &GrayImage) -> GrayImage {
    adaptive_threshold_gaussian(gray, self.config.block_size, self.config.offset)
  }

  /// 面积落在开区间内且圆度低于阈值的轮廓视为不规则
  pub fn classify_mask(&self, mask: &GrayImage) -> Vec<Detection> {
    let (width, height) = mask.dimensions();
    let cfg = &self.config;
    external_contours(mask)
      .into_iter()
      .filter(|c| c.area > cfg.min_area && c.area < cfg.max_area)
      .filter(|c| c.circularity() < cfg.max_circularity)
      .filter_map(|c| {
        let confidence = (c.area / cfg.area_scale).min(cfg.max_confidence as f64);
        Detection::new(SURFACE_IRREGULARITY, confidence as f32, c.bbox(), width, height)
      })
      .collect()
  }
}

impl Detector for IrregularityDetector {
  fn name(&self) -> &'static str {
    "irregularity"
  }

  fn detect(&self, frame: &NormalizedFrame) -> Result<Vec<Detection>, DetectError> {
    check_frame(frame)?;
    let mask = self.irregularity_mask(&frame.to_gray());
    let detections = self.classify_mask(&mask);
    debug!("表面不规则检测: {} 个结果", detections.len());
    Ok(detections)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Luma, Rgb, RgbImage};
  use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
  use imageproc::rect::Rect;

  fn draw_plus<I>(image: &mut I, cx: i32, cy: i32, arm: u32, thick: u32, color: I::Pixel)
  where
    I: imageproc::drawing::Canvas,
  {
    let half_arm = (arm / 2) as i32;
    let half_thick = (thick / 2) as i32;
    draw_filled_rect_mut(image, Rect::at(cx - half_arm, cy - half_thick).of_size(arm, thick), color);
    draw_filled_rect_mut(image, Rect::at(cx - half_thick, cy - half_arm).of_size(thick, arm), color);
  }

  #[test]
  fn cross_shaped_contour_is_irregular() {
    let mut mask = GrayImage::new(100, 100);
    draw_plus(&mut mask, 50, 50, 40, 6, Luma([255]));

    let found = IrregularityDetector::default().classify_mask(&mask);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kind, SURFACE_IRREGULARITY);
    assert!(found[0].confidence > 0.0 && found[0].confidence < 0.8);
  }

  #[test]
  fn tiny_contour_is_below_area_floor() {
    // 面积约 38，低于下限
    let mut mask = GrayImage::new(100, 100);
    draw_filled_rect_mut(&mut mask, Rect::at(10, 10).of_size(20, 3), Luma([255]));
    assert!(IrregularityDetector::default().classify_mask(&mask).is_empty());
  }

  #[test]
  fn blank_gray_frame_has_no_irregularities() {
    let frame = NormalizedFrame::from(RgbImage::from_pixel(640, 640, Rgb([128, 128, 128])));
    assert!(IrregularityDetector::default().detect(&frame).unwrap().is_empty());
  }

  #[test]
  fn round_dark_spot_is_not_irregular() {
    let mut image = RgbImage::from_pixel(200, 200, Rgb([180, 180, 180]));
    draw_filled_circle_mut(&mut image, (100, 100), 12, Rgb([40, 40, 40]));
    let found = IrregularityDetector::default()
      .detect(&NormalizedFrame::from(image))
      .unwrap();
    assert!(found.is_empty(), "{found:?}");
  }

  #[test]
  fn dark_cross_is_irregular() {
    let mut image = RgbImage::from_pixel(640, 640, Rgb([180, 180, 180]));
    draw_plus(&mut image, 320, 320, 60, 6, Rgb([40, 40, 40]));
    let found = IrregularityDetector::default()
      .detect(&NormalizedFrame::from(image))
      .unwrap();
    assert_eq!(found.len(), 1);
    let b = found[0].bbox;
    assert!(b.x1 <= 291 && b.x2 >= 349, "{b:?}");
  }
}
