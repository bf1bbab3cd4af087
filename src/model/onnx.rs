// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/onnx.rs - 基于 tract 的 ONNX 推理后端
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

use tracing::{debug, info};
use tract_onnx::prelude::*;

use super::postprocess::RawOutput;
use super::{Model, ModelConfig, ModelError};
use crate::detection::DetectError;

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

pub struct OnnxModel {
  plan: OnnxPlan,
  input_size: (u32, u32),
}

impl OnnxModel {
  /// 加载并优化计算图；外部权重文件由 tract 在拓扑文件目录中查找
  pub fn load(config: &ModelConfig, input_size: (u32, u32)) -> Result<Self, ModelError> {
    let (width, height) = input_size;
    info!("加载 ONNX 模型: {}", config.topology.display());

    let plan = tract_onnx::onnx()
      .model_for_path(&config.topology)
      .and_then(|m| {
        m.with_input_fact(
          0,
          f32::fact([1, 3, height as usize, width as usize]).into(),
        )
      })
      .and_then(|m| m.into_optimized())
      .and_then(|m| m.into_runnable())
      .map_err(|e| ModelError::Load(format!("{e:#}")))?;

    debug!("模型输入尺寸: {}x{}", width, height);
    info!("模型加载完成");
    Ok(Self { plan, input_size })
  }
}

impl Model for OnnxModel {
  fn input_size(&self) -> (u32, u32) {
    self.input_size
  }

  fn infer(&self, input: &[f32]) -> Result<Vec<RawOutput>, DetectError> {
    let (width, height) = self.input_size;
    let tensor = Tensor::from_shape(&[1, 3, height as usize, width as usize], input)
      .map_err(|e| DetectError::Inference(e.to_string()))?;

    let outputs = self
      .plan
      .run(tvec!(tensor.into()))
      .map_err(|e| DetectError::Inference(e.to_string()))?;

    outputs
      .iter()
      .map(|value| {
        let view = value
          .to_array_view::<f32>()
          .map_err(|e| DetectError::OutputShape(e.to_string()))?;
        let row_len = view.shape().last().copied().unwrap_or(0);
        Ok(RawOutput::new(row_len, view.iter().copied().collect()))
      })
      .collect()
  }
}
