// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 缺陷检测结果标注
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

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use thiserror::Error;
use tracing::debug;

use crate::detection::{BBox, CRACK, Detection, DetectionSet, SURFACE_IRREGULARITY};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_PADDING: i32 = 10;
const LABEL_TEXT_OFFSET: i32 = 5;
const BOX_THICKNESS: i32 = 2;
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const NEUTRAL_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Error, Debug)]
pub enum FontError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("无效的字体文件: {0}")]
  Invalid(String),
}

/// 缺陷类型到颜色的固定映射，未知类型为中性白色
pub fn palette(kind: &str) -> Rgb<u8> {
  match kind {
    CRACK => Rgb([255, 0, 0]),
    SURFACE_IRREGULARITY => Rgb([0, 255, 0]),
    "Dent" => Rgb([0, 0, 255]),
    "Leak" => Rgb([255, 255, 0]),
    _ => NEUTRAL_COLOR,
  }
}

pub fn label_text(detection: &Detection) -> String {
  let confidence = if detection.confidence.is_finite() {
    detection.confidence.clamp(0.0, 1.0)
  } else {
    0.0
  };
  format!("{}: {:.2}", detection.kind, confidence)
}

/// 随程序一起发布的默认标签字体
static EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

#[derive(Clone)]
pub struct Annotator {
  font: FontArc,
  font_size: f32,
}

impl Default for Annotator {
  fn default() -> Self {
    let font = FontArc::try_from_slice(EMBEDDED_FONT).expect("无法加载嵌入的字体文件");
    Self {
      font,
      font_size: LABEL_FONT_SIZE,
    }
  }
}

impl std::fmt::Debug for Annotator {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Annotator")
      .field("font_size", &self.font_size)
      .finish_non_exhaustive()
  }
}

fn load_font(path: &Path) -> Result<FontArc, FontError> {
  let data = std::fs::read(path)?;
  FontArc::try_from_vec(data).map_err(|e| FontError::Invalid(format!("{}: {}", path.display(), e)))
}

impl Annotator {
  /// 用外部字体文件替换内置字体
  pub fn with_font_file(path: &Path) -> Result<Self, FontError> {
    let font = load_font(path)?;
    debug!("加载字体: {}", path.display());
    Ok(Self {
      font,
      font_size: LABEL_FONT_SIZE,
    })
  }

  pub fn with_font_size(mut self, size: f32) -> Self {
    self.font_size = size;
    self
  }

  /// 在副本上绘制所有检测框与标签，输入图像保持不变
  pub fn annotate(&self, image: &RgbImage, detections: &DetectionSet) -> RgbImage {
    let mut canvas = image.clone();
    for detection in detections {
      self.draw_detection(&mut canvas, detection);
    }
    canvas
  }

  fn draw_detection(&self, image: &mut RgbImage, detection: &Detection) {
    let (width, height) = image.dimensions();
    // 上游越界或颠倒的框在这里重新限制，仍然退化则跳过
    let Some(bbox) = detection.bbox.clamp_to(width, height) else {
      debug!("跳过无效的检测框: {:?}", detection.bbox);
      return;
    };
    let color = palette(&detection.kind);
    draw_box(image, bbox, color);

    let label = label_text(detection);
    let (text_w, text_h) = text_size(PxScale::from(self.font_size), &self.font, &label);
    let bg_w = (text_w as i32).clamp(1, width as i32);
    let bg_h = (text_h as i32 + LABEL_PADDING).clamp(1, height as i32);

    // 标签底边贴住框的上沿，放不下时下移到图像顶端
    let label_bottom = bbox.y1.max(bg_h);
    let top = (label_bottom - bg_h).clamp(0, height as i32 - bg_h);
    let left = bbox.x1.clamp(0, width as i32 - bg_w);

    draw_filled_rect_mut(
      image,
      Rect::at(left, top).of_size(bg_w as u32, bg_h as u32),
      color,
    );

    draw_text_mut(
      image,
      TEXT_COLOR,
      left,
      top + LABEL_TEXT_OFFSET,
      PxScale::from(self.font_size),
      &self.font,
      &label,
    );
  }
}

fn draw_box(image: &mut RgbImage, bbox: BBox, color: Rgb<u8>) {
  for t in 0..BOX_THICKNESS {
    let w = bbox.width() + 1 - 2 * t;
    let h = bbox.height() + 1 - 2 * t;
    if w <= 0 || h <= 0 {
      break;
    }
    let rect = Rect::at(bbox.x1 + t, bbox.y1 + t).of_size(w as u32, h as u32);
    draw_hollow_rect_mut(image, rect, color);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn detection(kind: &str, confidence: f32, bbox: BBox) -> Detection {
    Detection {
      kind: kind.to_string(),
      confidence,
      bbox,
    }
  }

  #[test]
  fn palette_is_fixed_with_neutral_fallback() {
    assert_eq!(palette(CRACK), Rgb([255, 0, 0]));
    assert_eq!(palette(SURFACE_IRREGULARITY), Rgb([0, 255, 0]));
    assert_eq!(palette("Dent"), Rgb([0, 0, 255]));
    assert_eq!(palette("Leak"), Rgb([255, 255, 0]));
    assert_eq!(palette("person"), NEUTRAL_COLOR);
  }

  #[test]
  fn label_has_two_decimals() {
    let d = detection(CRACK, 0.456, BBox::new(0, 0, 5, 5));
    assert_eq!(label_text(&d), "Crack: 0.46");
    let d = detection("Leak", f32::NAN, BBox::new(0, 0, 5, 5));
    assert_eq!(label_text(&d), "Leak: 0.00");
  }

  #[test]
  fn annotation_draws_on_a_copy() {
    let image = RgbImage::from_pixel(200, 200, Rgb([10, 10, 10]));
    let set = DetectionSet::from(vec![detection(CRACK, 0.8, BBox::new(50, 80, 150, 120))]);

    let annotated = Annotator::default().annotate(&image, &set);
    assert!(image.pixels().all(|p| *p == Rgb([10, 10, 10])));
    // 框线两像素宽
    assert_eq!(*annotated.get_pixel(100, 120), Rgb([255, 0, 0]));
    assert_eq!(*annotated.get_pixel(100, 119), Rgb([255, 0, 0]));
    assert_eq!(*annotated.get_pixel(100, 118), Rgb([10, 10, 10]));
    // 标签背景在框上方，底部留白处只有背景色
    assert_eq!(*annotated.get_pixel(52, 78), Rgb([255, 0, 0]));
  }

  #[test]
  fn label_is_clamped_inside_the_image() {
    let image = RgbImage::from_pixel(120, 60, Rgb([10, 10, 10]));
    let set = DetectionSet::from(vec![detection("Surface Irregularity", 0.5, BBox::new(100, 0, 119, 20))]);

    let annotated = Annotator::default().annotate(&image, &set);
    // 框贴顶，标签被放到图像内：右上角一定被背景覆盖
    assert_eq!(*annotated.get_pixel(119, 0), Rgb([0, 255, 0]));
    assert_eq!(*annotated.get_pixel(0, 59), Rgb([10, 10, 10]));
  }

  #[test]
  fn malformed_boxes_do_not_abort() {
    let image = RgbImage::from_pixel(64, 64, Rgb([0, 0, 0]));
    let set = DetectionSet::from(vec![
      detection("Dent", 0.9, BBox::new(40, 40, 10, 10)),
      detection("Dent", f32::INFINITY, BBox::new(500, 500, 600, 600)),
      detection("Dent", -3.0, BBox::new(-20, -20, 5, 5)),
    ]);
    let annotated = Annotator::default().annotate(&image, &set);
    assert_eq!(*annotated.get_pixel(10, 40), Rgb([0, 0, 255]));
    assert_eq!(annotated.dimensions(), (64, 64));
  }

  #[test]
  fn label_text_is_drawn_with_the_bundled_font() {
    // 文字像素既不是底图颜色也不是标签背景色
    let image = RgbImage::from_pixel(200, 200, Rgb([10, 10, 10]));
    let set = DetectionSet::from(vec![detection(CRACK, 0.8, BBox::new(50, 80, 150, 120))]);

    let annotated = Annotator::default().annotate(&image, &set);
    let text_pixels = (0..80)
      .flat_map(|y| (0..200).map(move |x| (x, y)))
      .map(|(x, y)| *annotated.get_pixel(x, y))
      .filter(|p| *p != Rgb([10, 10, 10]) && *p != Rgb([255, 0, 0]))
      .count();
    assert!(text_pixels > 0);
  }

  #[test]
  fn font_file_override_is_validated() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("bogus.ttf");
    std::fs::write(&bogus, b"not a font").unwrap();
    assert!(matches!(
      Annotator::with_font_file(&bogus),
      Err(FontError::Invalid(_))
    ));
    assert!(matches!(
      Annotator::with_font_file(&dir.path().join("absent.ttf")),
      Err(FontError::IoError(_))
    ));
  }
}
