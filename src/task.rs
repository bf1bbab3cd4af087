// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 检测任务
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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, mpsc};
use std::thread;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::input::{InputError, SourceImage};
use crate::output::Render;
use crate::pipeline::DefectPipeline;

pub trait Task<I, O>: Sized {
  type Error;
  fn run_task(self, input: I, pipeline: &DefectPipeline, output: &O)
  -> Result<TaskSummary, Self::Error>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskSummary {
  /// 成功完成检测并输出的图像数
  pub processed: usize,
  /// 读取、解码或输出失败的图像数
  pub failed: usize,
  /// 检出缺陷总数
  pub defects: usize,
}

/// 只处理输入的第一张图像，任何失败都作为错误返回
pub struct OneShotTask;

impl<I, O> Task<I, O> for OneShotTask
where
  I: Iterator<Item = Result<SourceImage, InputError>>,
  O: Render,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    pipeline: &DefectPipeline,
    output: &O,
  ) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let source = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))??;
    info!("读取图像 {}，开始检测...", source.name);

    let now = Instant::now();
    let image = source.decode()?;
    let result = pipeline.run_image(&image);
    info!("检测完成，耗时: {:.2?}", now.elapsed());

    output.render_result(&source.name, &result)?;
    Ok(TaskSummary {
      processed: 1,
      failed: 0,
      defects: result.detections.len(),
    })
  }
}

/// 处理全部输入；多个工作线程共享同一条流水线，单张图像失败只记录不中断
#[derive(Debug, Clone, Copy)]
pub struct BatchTask {
  workers: usize,
}

impl Default for BatchTask {
  fn default() -> Self {
    Self { workers: 1 }
  }
}

impl BatchTask {
  pub fn with_workers(mut self, workers: usize) -> Self {
    self.workers = workers.max(1);
    self
  }
}

#[derive(Default)]
struct Counters {
  processed: AtomicUsize,
  failed: AtomicUsize,
  defects: AtomicUsize,
}

impl Counters {
  fn summary(&self) -> TaskSummary {
    TaskSummary {
      processed: self.processed.load(Ordering::Relaxed),
      failed: self.failed.load(Ordering::Relaxed),
      defects: self.defects.load(Ordering::Relaxed),
    }
  }
}

fn process_one<O>(source: &SourceImage, pipeline: &DefectPipeline, output: &O, counters: &Counters)
where
  O: Render,
  O::Error: std::fmt::Display,
{
  let now = Instant::now();
  let result = match source.decode() {
    Ok(image) => pipeline.run_image(&image),
    Err(e) => {
      error!("{}: {}", source.name, e);
      counters.failed.fetch_add(1, Ordering::Relaxed);
      return;
    }
  };
  info!(
    "{}: 检出 {} 个缺陷，耗时: {:.2?}",
    source.name,
    result.detections.len(),
    now.elapsed()
  );

  match output.render_result(&source.name, &result) {
    Ok(()) => {
      counters.processed.fetch_add(1, Ordering::Relaxed);
      counters
        .defects
        .fetch_add(result.detections.len(), Ordering::Relaxed);
    }
    Err(e) => {
      error!("{}: 输出失败: {}", source.name, e);
      counters.failed.fetch_add(1, Ordering::Relaxed);
    }
  }
}

impl<I, O> Task<I, O> for BatchTask
where
  I: Iterator<Item = Result<SourceImage, InputError>>,
  O: Render + Sync,
  O::Error: std::fmt::Display,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    input: I,
    pipeline: &DefectPipeline,
    output: &O,
  ) -> Result<TaskSummary, Self::Error> {
    info!("开始批量任务，工作线程数: {}", self.workers);
    let counters = Counters::default();
    let started = Instant::now();

    let (tx, rx) = mpsc::sync_channel::<SourceImage>(self.workers * 2);
    let rx = Mutex::new(rx);

    thread::scope(|scope| {
      for _ in 0..self.workers {
        scope.spawn(|| {
          loop {
            let next = match rx.lock() {
              Ok(guard) => guard.recv(),
              Err(_) => break,
            };
            let Ok(source) = next else {
              break;
            };
            process_one(&source, pipeline, output, &counters);
          }
        });
      }

      for item in input {
        match item {
          Ok(source) => {
            if tx.send(source).is_err() {
              warn!("工作线程已全部退出，停止读取输入");
              break;
            }
          }
          Err(e) => {
            error!("读取输入失败: {}", e);
            counters.failed.fetch_add(1, Ordering::Relaxed);
          }
        }
      }
      drop(tx);
    });

    let summary = counters.summary();
    info!(
      "任务完成: 成功 {} 张，失败 {} 张，共 {} 个缺陷，耗时: {:.2?}",
      summary.processed,
      summary.failed,
      summary.defects,
      started.elapsed()
    );
    Ok(summary)
  }
}
