// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/record.rs - 检测结果记录
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

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detection::DetectionSet;

/// 单张图像的检测记录，写为 JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
  pub original_filename: String,
  pub processed_filename: String,
  pub timestamp: DateTime<Utc>,
  pub defect_count: usize,
  /// 按缺陷类型计数
  pub defect_types: BTreeMap<String, usize>,
  pub detections: DetectionSet,
}

impl DetectionRecord {
  pub fn new(
    original_filename: impl Into<String>,
    processed_filename: impl Into<String>,
    timestamp: DateTime<Utc>,
    detections: &DetectionSet,
  ) -> Self {
    let mut defect_types = BTreeMap::new();
    for d in detections {
      *defect_types.entry(d.kind.clone()).or_insert(0) += 1;
    }
    Self {
      original_filename: original_filename.into(),
      processed_filename: processed_filename.into(),
      timestamp,
      defect_count: detections.len(),
      defect_types,
      detections: detections.clone(),
    }
  }

  pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, self)?;
    writer.flush()
  }

  pub fn read_json(path: &Path) -> std::io::Result<Self> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
  }
}
