// 该文件是 Shanan （山南西风） 项目的一部分。
// src/classical/crack.rs - 裂纹检测
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
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, dilate};
use tracing::debug;

use super::{canny_presmoothed, check_frame, external_contours};
use crate::detection::{CRACK, DetectError, Detection, Detector};
use crate::frame::NormalizedFrame;
use crate::preprocess::smooth5_gray;

#[derive(Debug, Clone, PartialEq)]
pub struct CrackConfig {
  pub canny_low: f32,
  pub canny_high: f32,
  /// 3×3 膨胀次数
  pub dilate_iterations: u8,
  /// 3×3 闭运算次数
  pub close_iterations: u8,
  pub min_area: f64,
  pub min_aspect_ratio: f64,
  pub max_confidence: f32,
  /// 置信度 = area / area_scale
  pub area_scale: f64,
}

impl Default for CrackConfig {
  fn default() -> Self {
    Self {
      canny_low: 50.0,
      canny_high: 150.0,
      dilate_iterations: 2,
      close_iterations: 3,
      min_area: 100.0,
      min_aspect_ratio: 3.0,
      max_confidence: 0.9,
      area_scale: 1000.0,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct CrackDetector {
  config: CrackConfig,
}

impl CrackDetector {
  pub fn new(config: CrackConfig) -> Self {
    Self { config }
  }

  /// 5×5 平滑 → Canny → 膨胀 → 闭运算，连接断开的裂纹片段
  pub fn crack_mask(&self, gray: &GrayImage) -> GrayImage {
    // 平滑只做这一次，Canny 内部不再模糊
    let blurred = smooth5_gray(gray);
    let edges = canny_presmoothed(&blurred, self.config.canny_low, self.config.canny_high);
    // 3×3 结构元素迭代 n 次等价于 L∞ 半径 n
    let dilated = dilate(&edges, Norm::LInf, self.config.dilate_iterations);
    close(&dilated, Norm::LInf, self.config.close_iterations)
  }

  /// 在二值掩码上按面积与长宽比挑出裂纹
  pub fn classify_mask(&self, mask: &GrayImage) -> Vec<Detection> {
    let (width, height) = mask.dimensions();
    external_contours(mask)
      .into_iter()
      .filter(|c| c.area > self.config.min_area)
      .filter(|c| c.aspect_ratio() > self.config.min_aspect_ratio)
      .filter_map(|c| {
        let confidence = (c.area / self.config.area_scale).min(self.config.max_confidence as f64);
        Detection::new(CRACK, confidence as f32, c.bbox(), width, height)
      })
      .collect()
  }
}

impl Detector for CrackDetector {
  fn name(&self) -> &'static str {
    "crack"
  }

  fn detect(&self, frame: &NormalizedFrame) -> Result<Vec<Detection>, DetectError> {
    check_frame(frame)?;
    let mask = self.crack_mask(&frame.to_gray());
    let detections = self.classify_mask(&mask);
    debug!("裂纹检测: {} 个结果", detections.len());
    Ok(detections)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Luma, Rgb, RgbImage};
  use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut};
  use imageproc::rect::Rect;

  #[test]
  fn long_thin_contour_is_a_crack() {
    // 长宽比 10、面积约 550
    let mut mask = GrayImage::new(200, 100);
    draw_filled_rect_mut(&mut mask, Rect::at(50, 40).of_size(80, 8), Luma([255]));

    let found = CrackDetector::default().classify_mask(&mask);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kind, CRACK);
    assert!((found[0].confidence - 0.553).abs() < 1e-3);
    assert_eq!(
      (found[0].bbox.x1, found[0].bbox.y1, found[0].bbox.x2, found[0].bbox.y2),
      (50, 40, 130, 48)
    );
  }

  #[test]
  fn compact_or_tiny_contours_are_not_cracks() {
    let mut mask = GrayImage::new(200, 200);
    // 方形：长宽比 1
    draw_filled_rect_mut(&mut mask, Rect::at(20, 20).of_size(40, 40), Luma([255]));
    // 细长但面积不足 100
    draw_filled_rect_mut(&mut mask, Rect::at(100, 150).of_size(40, 2), Luma([255]));
    assert!(CrackDetector::default().classify_mask(&mask).is_empty());
  }

  #[test]
  fn blank_gray_frame_has_no_cracks() {
    let frame = NormalizedFrame::from(RgbImage::from_pixel(640, 640, Rgb([128, 128, 128])));
    assert!(CrackDetector::default().detect(&frame).unwrap().is_empty());
  }

  #[test]
  fn bright_bar_yields_one_crack() {
    let mut image = RgbImage::from_pixel(640, 640, Rgb([20, 20, 20]));
    draw_filled_rect_mut(&mut image, Rect::at(200, 300).of_size(100, 10), Rgb([230, 230, 230]));
    let found = CrackDetector::default()
      .detect(&NormalizedFrame::from(image))
      .unwrap();
    assert_eq!(found.len(), 1);
    assert!((found[0].confidence - 0.9).abs() < 1e-6);
  }

  #[test]
  fn thin_diagonal_line_yields_one_crack_spanning_it() {
    let mut image = RgbImage::from_pixel(640, 640, Rgb([10, 10, 10]));
    draw_line_segment_mut(&mut image, (300.0, 100.0), (360.0, 500.0), Rgb([250, 250, 250]));

    let found = CrackDetector::default()
      .detect(&NormalizedFrame::from(image))
      .unwrap();
    assert_eq!(found.len(), 1);
    let b = found[0].bbox;
    // 膨胀与闭运算会把框向外扩几个像素
    let tol = 8;
    assert!((b.x1 - 300).abs() <= tol, "{b:?}");
    assert!((b.y1 - 100).abs() <= tol, "{b:?}");
    assert!((b.x2 - 361).abs() <= tol, "{b:?}");
    assert!((b.y2 - 501).abs() <= tol, "{b:?}");
  }

  fn single_crack(start: (f32, f32), end: (f32, f32)) -> Vec<Detection> {
    let mut image = RgbImage::from_pixel(640, 640, Rgb([10, 10, 10]));
    draw_line_segment_mut(&mut image, start, end, Rgb([250, 250, 250]));
    CrackDetector::default()
      .detect(&NormalizedFrame::from(image))
      .unwrap()
  }

  #[test]
  fn one_pixel_horizontal_and_vertical_lines_are_cracks() {
    let found = single_crack((100.0, 320.0), (540.0, 320.0));
    assert_eq!(found.len(), 1);
    let b = found[0].bbox;
    assert!((b.x1 - 100).abs() <= 8 && (b.x2 - 541).abs() <= 8, "{b:?}");
    assert!(b.y1 <= 320 && b.y2 > 320, "{b:?}");
    assert!((found[0].confidence - 0.9).abs() < 1e-6);

    let found = single_crack((320.0, 100.0), (320.0, 540.0));
    assert_eq!(found.len(), 1);
    let b = found[0].bbox;
    assert!((b.y1 - 100).abs() <= 8 && (b.y2 - 541).abs() <= 8, "{b:?}");
    assert!(b.x1 <= 320 && b.x2 > 320, "{b:?}");
  }

  #[test]
  fn line_at_45_degrees_is_edged_but_has_square_extent() {
    let mut image = RgbImage::from_pixel(640, 640, Rgb([10, 10, 10]));
    draw_line_segment_mut(&mut image, (150.0, 150.0), (450.0, 450.0), Rgb([250, 250, 250]));
    let frame = NormalizedFrame::from(image);

    let detector = CrackDetector::default();
    let mask = detector.crack_mask(&frame.to_gray());
    assert_eq!(mask.get_pixel(300, 300)[0], 255);
    // 外接矩形近似正方形，长宽比达不到裂纹条件
    assert!(detector.detect(&frame).unwrap().is_empty());
  }

  #[test]
  fn round_blob_is_not_a_crack() {
    let mut image = RgbImage::from_pixel(640, 640, Rgb([20, 20, 20]));
    draw_filled_circle_mut(&mut image, (320, 320), 40, Rgb([220, 220, 220]));
    let found = CrackDetector::default()
      .detect(&NormalizedFrame::from(image))
      .unwrap();
    assert!(found.is_empty());
  }

  #[test]
  fn tiny_frame_is_rejected() {
    let frame = NormalizedFrame::from(RgbImage::new(2, 2));
    assert!(matches!(
      CrackDetector::default().detect(&frame),
      Err(DetectError::InvalidFrame { .. })
    ));
  }
}
