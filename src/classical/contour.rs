// 该文件是 Shanan （山南西风） 项目的一部分。
// src/classical/contour.rs - 轮廓提取与形状度量
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
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometry::{arc_length, contour_area};
use imageproc::point::Point;

use crate::detection::BBox;

/// 单个外轮廓及其形状度量
#[derive(Debug, Clone)]
pub struct ContourShape {
  pub points: Vec<Point<i32>>,
  /// 轮廓像素中心构成的多边形面积
  pub area: f64,
  /// 闭合弧长
  pub perimeter: f64,
  pub x: i32,
  pub y: i32,
  pub width: i32,
  pub height: i32,
}

impl ContourShape {
  pub fn new(points: Vec<Point<i32>>) -> Self {
    let area = contour_area(&points);
    let perimeter = if points.len() > 1 {
      arc_length(&points, true)
    } else {
      0.0
    };
    let (x, y, width, height) = bounding_rect(&points);
    Self {
      points,
      area,
      perimeter,
      x,
      y,
      width,
      height,
    }
  }

  /// 长边与短边之比，短边至少按 1 计
  pub fn aspect_ratio(&self) -> f64 {
    let long = self.width.max(self.height) as f64;
    let short = self.width.min(self.height).max(1) as f64;
    long / short
  }

  /// `4π·area / perimeter²`，周长为 0 时记为 0
  pub fn circularity(&self) -> f64 {
    if self.perimeter > 0.0 {
      4.0 * std::f64::consts::PI * self.area / (self.perimeter * self.perimeter)
    } else {
      0.0
    }
  }

  /// 外接矩形，右/下边界为开区间
  pub fn bbox(&self) -> BBox {
    BBox::new(self.x, self.y, self.x + self.width, self.y + self.height)
  }
}

/// 只保留最外层轮廓（不在任何孔洞内部的外边界）
pub fn external_contours(mask: &GrayImage) -> Vec<ContourShape> {
  find_contours::<i32>(mask)
    .into_iter()
    .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
    .map(|c| ContourShape::new(c.points))
    .collect()
}

fn bounding_rect(points: &[Point<i32>]) -> (i32, i32, i32, i32) {
  if points.is_empty() {
    return (0, 0, 0, 0);
  }
  let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
  let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
  for p in points {
    min_x = min_x.min(p.x);
    min_y = min_y.min(p.y);
    max_x = max_x.max(p.x);
    max_y = max_y.max(p.y);
  }
  (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Luma;
  use imageproc::drawing::draw_filled_rect_mut;
  use imageproc::rect::Rect;

  #[test]
  fn filled_rectangle_metrics() {
    let mut mask = GrayImage::new(50, 50);
    draw_filled_rect_mut(&mut mask, Rect::at(10, 20).of_size(20, 5), Luma([255]));

    let contours = external_contours(&mask);
    assert_eq!(contours.len(), 1);
    let c = &contours[0];
    assert_eq!((c.x, c.y, c.width, c.height), (10, 20, 20, 5));
    assert!((c.area - 19.0 * 4.0).abs() < 1e-9);
    assert!((c.perimeter - 2.0 * (19.0 + 4.0)).abs() < 1e-6);
    assert!((c.aspect_ratio() - 4.0).abs() < 1e-9);
    assert_eq!(c.bbox(), BBox::new(10, 20, 30, 25));
  }

  #[test]
  fn nested_shapes_report_only_outer_border() {
    let mut mask = GrayImage::new(60, 60);
    draw_filled_rect_mut(&mut mask, Rect::at(5, 5).of_size(50, 50), Luma([255]));
    draw_filled_rect_mut(&mut mask, Rect::at(15, 15).of_size(30, 30), Luma([0]));
    draw_filled_rect_mut(&mut mask, Rect::at(25, 25).of_size(10, 10), Luma([255]));

    let contours = external_contours(&mask);
    assert_eq!(contours.len(), 1);
    assert_eq!((contours[0].width, contours[0].height), (50, 50));
  }

  #[test]
  fn single_pixel_has_zero_area_and_circularity() {
    let mut mask = GrayImage::new(10, 10);
    mask.put_pixel(4, 4, Luma([255]));
    for c in external_contours(&mask) {
      assert_eq!(c.area, 0.0);
      assert_eq!(c.circularity(), 0.0);
    }
  }
}
