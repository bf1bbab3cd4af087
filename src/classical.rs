// 该文件是 Shanan （山南西风） 项目的一部分。
// src/classical.rs - 经典视觉缺陷检测
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

//! 两条互相独立的启发式检测路径，均在规范化帧的灰度图上工作：
//!
//! - [`CrackDetector`]：边缘 + 形态学闭运算后，取细长轮廓作为裂纹；
//! - [`IrregularityDetector`]：自适应阈值后，取低圆度轮廓作为表面不规则。

use crate::detection::DetectError;
use crate::frame::NormalizedFrame;

mod contour;
mod crack;
mod edges;
mod irregularity;
mod threshold;

pub use self::contour::{ContourShape, external_contours};
pub use self::crack::{CrackConfig, CrackDetector};
pub use self::edges::canny_presmoothed;
pub use self::irregularity::{IrregularityConfig, IrregularityDetector};
pub use self::threshold::adaptive_threshold_gaussian;

const MIN_FRAME_SIDE: u32 = 3;

pub(crate) fn check_frame(frame: &NormalizedFrame) -> Result<(), DetectError> {
  if frame.width() < MIN_FRAME_SIDE || frame.height() < MIN_FRAME_SIDE {
    return Err(DetectError::InvalidFrame {
      width: frame.width(),
      height: frame.height(),
    });
  }
  Ok(())
}
