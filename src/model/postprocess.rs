// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/postprocess.rs - 模型输出解码与非极大值抑制
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

use tracing::debug;

use crate::detection::{BBox, DetectError, Detection, UNKNOWN};

/// 行内布局：`[cx, cy, w, h, objectness, class scores...]`
pub const BOX_FIELDS: usize = 4;
pub const SCORE_OFFSET: usize = 5;

/// 模型的一个输出张量，按最后一维切分为行
#[derive(Debug, Clone)]
pub struct RawOutput {
  pub row_len: usize,
  pub data: Vec<f32>,
}

impl RawOutput {
  pub fn new(row_len: usize, data: Vec<f32>) -> Self {
    Self { row_len, data }
  }

  pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
    self.data.chunks_exact(self.row_len.max(1))
  }
}

/// 阈值过滤后、NMS 之前的候选框
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
  pub class_id: usize,
  pub score: f32,
  pub bbox: BBox,
}

/// 取分数最高的类别；并列时取索引较小者
fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
  scores
    .iter()
    .copied()
    .enumerate()
    .filter(|(_, s)| s.is_finite())
    .fold(None, |best, (i, s)| match best {
      Some((_, b)) if b >= s => best,
      _ => Some((i, s)),
    })
}

/// 把归一化的中心点形式换算为像素角点形式并限制在帧内，退化时返回 None
///
/// 坐标先截断为 i64 再做整数运算，超大的输出值饱和而不会溢出。
pub fn to_corner_box(row: &[f32], width: u32, height: u32) -> Option<BBox> {
  let (w_f, h_f) = (width as f32, height as f32);
  let cx = (row[0] * w_f) as i64;
  let cy = (row[1] * h_f) as i64;
  let bw = (row[2] * w_f) as i64;
  let bh = (row[3] * h_f) as i64;
  let x = cx.saturating_sub(bw / 2);
  let y = cy.saturating_sub(bh / 2);

  let to_i32 = |v: i64| v.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
  BBox::new(
    to_i32(x),
    to_i32(y),
    to_i32(x.saturating_add(bw)),
    to_i32(y.saturating_add(bh)),
  )
  .clamp_to(width, height)
}

/// 解码所有输出张量中分数高于阈值的行
pub fn decode_outputs(
  outputs: &[RawOutput],
  width: u32,
  height: u32,
  score_threshold: f32,
) -> Result<Vec<Candidate>, DetectError> {
  let mut candidates = Vec::new();
  for (idx, output) in outputs.iter().enumerate() {
    if output.row_len <= SCORE_OFFSET {
      return Err(DetectError::OutputShape(format!(
        "第 {} 个输出的行长度为 {}，至少需要 {}",
        idx,
        output.row_len,
        SCORE_OFFSET + 1
      )));
    }
    for row in output.rows() {
      let Some((class_id, score)) = argmax(&row[SCORE_OFFSET..]) else {
        continue;
      };
      if score <= score_threshold || !row[..BOX_FIELDS].iter().all(|v| v.is_finite()) {
        continue;
      }
      // 先限制到帧内再参与 NMS，保证输出框两两 IoU 不超过阈值
      let Some(bbox) = to_corner_box(row, width, height) else {
        continue;
      };
      candidates.push(Candidate {
        class_id,
        score,
        bbox,
      });
    }
  }
  debug!("阈值过滤后候选框: {} 个", candidates.len());
  Ok(candidates)
}

/// 与类别无关的贪心 NMS：按分数稳定降序，删除与已保留框 IoU 大于阈值的框
pub fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
  for candidate in candidates {
    if kept
      .iter()
      .all(|k| k.bbox.iou(&candidate.bbox) <= iou_threshold)
    {
      kept.push(candidate);
    }
  }
  kept
}

/// 解析类别名，越界时为 "Unknown"；框被裁剪后退化的结果丢弃
pub fn into_detections(
  candidates: Vec<Candidate>,
  class_names: &[String],
  width: u32,
  height: u32,
) -> Vec<Detection> {
  candidates
    .into_iter()
    .filter_map(|c| {
      let kind = class_names
        .get(c.class_id)
        .map(String::as_str)
        .unwrap_or(UNKNOWN);
      Detection::new(kind, c.score, c.bbox, width, height)
    })
    .collect()
}
