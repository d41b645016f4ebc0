// 该文件是 PCB Defect （板检） 项目的一部分。
// src/frame.rs - NCHW 帧定义
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

use image::{Rgb, RgbImage, imageops::FilterType};
use ndarray::Array4;

const RGB_CHANNELS: usize = 3;
const LETTERBOX_FILL: u8 = 114;

/// 信箱缩放（letterbox）几何信息，用于把模型坐标映射回原图
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
  pub source_width: u32,
  pub source_height: u32,
  pub target: u32,
  pub scale: f32,
  pub pad_x: u32,
  pub pad_y: u32,
}

impl Letterbox {
  pub fn fit(source_width: u32, source_height: u32, target: u32) -> Self {
    let scale = (target as f32 / source_width.max(1) as f32)
      .min(target as f32 / source_height.max(1) as f32);

    let resized_w = ((source_width as f32 * scale).round() as u32).clamp(1, target);
    let resized_h = ((source_height as f32 * scale).round() as u32).clamp(1, target);

    // 与 YOLOv5 一致：padding 偏向左上方
    let pad_x = ((target - resized_w) as f32 / 2.0 - 0.1).round().max(0.0) as u32;
    let pad_y = ((target - resized_h) as f32 / 2.0 - 0.1).round().max(0.0) as u32;

    Self {
      source_width,
      source_height,
      target,
      scale,
      pad_x,
      pad_y,
    }
  }

  pub fn resized_size(&self) -> (u32, u32) {
    (
      ((self.source_width as f32 * self.scale).round() as u32).clamp(1, self.target),
      ((self.source_height as f32 * self.scale).round() as u32).clamp(1, self.target),
    )
  }

  /// 模型输入坐标 -> 原图坐标（已裁剪到原图范围）
  pub fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
    let sx = (x - self.pad_x as f32) / self.scale;
    let sy = (y - self.pad_y as f32) / self.scale;
    (
      sx.clamp(0.0, self.source_width as f32),
      sy.clamp(0.0, self.source_height as f32),
    )
  }
}

/// 归一化到 [0, 1] 的 RGB NCHW 浮点帧，batch 固定为 1
#[derive(Debug, Clone)]
pub struct RgbNchwFrame {
  data: Array4<f32>,
  letterbox: Letterbox,
}

impl RgbNchwFrame {
  pub fn letterbox(image: &RgbImage, target: u32) -> Self {
    let letterbox = Letterbox::fit(image.width(), image.height(), target);
    let (resized_w, resized_h) = letterbox.resized_size();

    let resized = image::imageops::resize(image, resized_w, resized_h, FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(target, target, Rgb([LETTERBOX_FILL; RGB_CHANNELS]));
    image::imageops::overlay(
      &mut canvas,
      &resized,
      letterbox.pad_x as i64,
      letterbox.pad_y as i64,
    );

    let side = target as usize;
    let data = Array4::from_shape_fn((1, RGB_CHANNELS, side, side), |(_, c, y, x)| {
      canvas.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
    });

    Self { data, letterbox }
  }

  pub fn tensor(&self) -> &Array4<f32> {
    &self.data
  }

  pub fn geometry(&self) -> &Letterbox {
    &self.letterbox
  }

  pub fn height(&self) -> usize {
    self.data.shape()[2]
  }

  pub fn width(&self) -> usize {
    self.data.shape()[3]
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }
}
