// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::output::Render;
use crate::output::record::DetectionRecord;
use crate::pipeline::PipelineOutput;
use crate::{FromUrl, FromUrlWithScheme, url_file_path};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// `folder:///path/to/dir[?only_defects]`
///
/// 每张图像写入 `dir/YYYY/MM/DD/`：标注图像 `processed_<stamp>_<name>.png`
/// 与记录 `results_<stamp>_<name>.json`。带 `only_defects` 参数时跳过未检出
/// 缺陷的图像。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counter: Mutex<u16>,
  only_defects: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let only_defects = uri.query_pairs().any(|(k, _)| k == "only_defects");

    Ok(DirectoryRecordOutput {
      directory: url_file_path(uri),
      frame_counter: Mutex::new(0),
      only_defects,
    })
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
      frame_counter: Mutex::new(0),
      only_defects: false,
    }
  }

  pub fn with_only_defects(mut self, only_defects: bool) -> Self {
    self.only_defects = only_defects;
    self
  }

  fn frame_id(&self) -> u16 {
    // 计数器只做文件名去重，锁中毒时沿用旧值
    let mut counter = self
      .frame_counter
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    *counter = counter.wrapping_add(1);
    *counter
  }

  fn day_directory(&self, now: &DateTime<Utc>) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }
    Ok(directory)
  }
}

/// 去掉目录与扩展名，只保留文件名主体
fn file_stem(name: &str) -> String {
  Path::new(name)
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| "image".to_string())
}

impl Render for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, name: &str, output: &PipelineOutput) -> Result<(), Self::Error> {
    if self.only_defects && output.detections.is_empty() {
      debug!("{}: 未检出缺陷，跳过记录", name);
      return Ok(());
    }

    let now = Utc::now();
    let directory = self.day_directory(&now)?;
    let stamp = format!("{}-{:04X}", now.format("%Y%m%d_%H%M%S"), self.frame_id());
    let stem = file_stem(name);

    let processed_filename = format!("processed_{}_{}.png", stamp, stem);
    output.annotated.save(directory.join(&processed_filename))?;

    let record = DetectionRecord::new(name, &processed_filename, now, &output.detections);
    let record_path = directory.join(format!("results_{}_{}.json", stamp, stem));
    record.write_json(&record_path)?;

    info!(
      "{}: {} 个缺陷，记录写入 {}",
      name,
      record.defect_count,
      record_path.display()
    );
    Ok(())
  }
}
