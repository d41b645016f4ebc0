// 该文件是 PCB Defect （板检） 项目的一部分。
// src/task.rs - 推理任务
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

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::info;

use crate::{model::Model, output::Render};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: &M, output: &O) -> Result<Self::Output, Self::Error>;
}

#[derive(Error, Debug)]
pub enum TaskError {
  #[error("没有输入帧")]
  NoInput,
  #[error("推理失败: {0}")]
  Inference(#[source] BoxError),
  #[error("渲染失败: {0}")]
  Render(#[source] BoxError),
}

/// 一次推理的完整产物
#[derive(Debug)]
pub struct Inspection<F, D, R> {
  pub frame: F,
  pub result: D,
  pub rendered: R,
  /// 仅模型推理耗时
  pub elapsed: Duration,
}

/// 取第一帧，推理、渲染后结束
pub struct OneShotTask;

impl<F, D, I, M, O> Task<I, M, O> for OneShotTask
where
  I: IntoIterator<Item = F>,
  M: Model<Input = F, Output = D>,
  O: Render<F, D>,
{
  type Output = Inspection<F, D, O::Rendered>;
  type Error = TaskError;

  fn run_task(self, input: I, model: &M, output: &O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let frame = input.into_iter().next().ok_or(TaskError::NoInput)?;
    info!("输入帧获取成功，开始推理...");

    let now = Instant::now();
    let result = model
      .infer(&frame)
      .map_err(|e| TaskError::Inference(Box::new(e)))?;
    let elapsed = now.elapsed();
    info!("推理完成，耗时: {:.2?}", elapsed);

    let rendered = output
      .render_result(&frame, &result)
      .map_err(|e| TaskError::Render(Box::new(e)))?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(Inspection {
      frame,
      result,
      rendered,
      elapsed,
    })
  }
}
