// 该文件是 PCB Defect （板检） 项目的一部分。
// src/model.rs - 模型
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

use image::RgbImage;

pub trait Model {
  type Input;
  type Output;
  type Error: std::error::Error + Send + Sync + 'static;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 网页与命令行共用的 PCB 检测模型
pub trait PcbDetector:
  Model<Input = RgbImage, Output = DetectResult<PcbDefect>> + Send + Sync + 'static
{
}

impl<M> PcbDetector for M where
  M: Model<Input = RgbImage, Output = DetectResult<PcbDefect>> + Send + Sync + 'static
{
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem<T> {
  pub kind: T,
  pub score: f32,
  pub bbox: [f32; 4], // 相对原图归一化的 [x_min, y_min, x_max, y_max]
}

impl<T> DetectItem<T> {
  /// 换算为原图像素坐标
  pub fn bbox_px(&self, width: u32, height: u32) -> [f32; 4] {
    let (w, h) = (width as f32, height as f32);
    [
      self.bbox[0] * w,
      self.bbox[1] * h,
      self.bbox[2] * w,
      self.bbox[3] * h,
    ]
  }
}

#[derive(Debug, Clone)]
pub struct DetectResult<T> {
  pub items: Box<[DetectItem<T>]>,
}

impl<T> DetectResult<T> {
  pub fn empty() -> Self {
    Self {
      items: Box::new([]),
    }
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

impl<T> From<Vec<DetectItem<T>>> for DetectResult<T> {
  fn from(items: Vec<DetectItem<T>>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> String;
  fn to_label_id(&self) -> u32;
  fn from_label_id(id: u32) -> Self;
}

mod label;
pub mod loader;
mod yolov5;

pub use self::label::PcbDefect;
pub use self::loader::ModelLoader;
pub use self::yolov5::{DetectParams, Yolov5, Yolov5Builder, Yolov5Error};
