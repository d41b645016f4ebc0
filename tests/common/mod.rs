// 该文件是 PCB Defect （板检） 项目的一部分。
// tests/common/mod.rs - 集成测试公共部分
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

#![allow(dead_code)]

use std::{
  io::Cursor,
  sync::atomic::{AtomicUsize, Ordering},
};

use image::{ImageFormat, Rgb, RgbImage};
use thiserror::Error;

pub use pcb_defect::model::{DetectItem, DetectResult, Model, PcbDefect};

pub const BOUNDARY: &str = "pcb-defect-test-boundary";

/// 按预设结果回答的模型
pub struct ScriptedModel {
  items: Vec<DetectItem<PcbDefect>>,
  fail: bool,
  calls: AtomicUsize,
}

#[derive(Error, Debug)]
#[error("scripted failure")]
pub struct ScriptedError;

impl ScriptedModel {
  pub fn new(items: Vec<DetectItem<PcbDefect>>) -> Self {
    Self {
      items,
      fail: false,
      calls: AtomicUsize::new(0),
    }
  }

  pub fn failing() -> Self {
    Self {
      items: Vec::new(),
      fail: true,
      calls: AtomicUsize::new(0),
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl Model for ScriptedModel {
  type Input = RgbImage;
  type Output = DetectResult<PcbDefect>;
  type Error = ScriptedError;

  fn infer(&self, _input: &RgbImage) -> Result<Self::Output, Self::Error> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.fail {
      return Err(ScriptedError);
    }
    Ok(DetectResult::from(self.items.clone()))
  }
}

pub fn item(kind: PcbDefect, score: f32, bbox: [f32; 4]) -> DetectItem<PcbDefect> {
  DetectItem { kind, score, bbox }
}

pub fn sample_image(width: u32, height: u32) -> RgbImage {
  RgbImage::from_fn(width, height, |x, y| Rgb([(x * 7) as u8, (y * 5) as u8, 90]))
}

pub fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
  let mut buffer = Cursor::new(Vec::new());
  image.write_to(&mut buffer, format).unwrap();
  buffer.into_inner()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
  encode(&sample_image(width, height), ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
  encode(&sample_image(width, height), ImageFormat::Jpeg)
}

/// 最小 GIF 文件头，足以被识别为 GIF
pub fn gif_bytes() -> Vec<u8> {
  let mut bytes = b"GIF89a".to_vec();
  bytes.extend_from_slice(&[1, 0, 1, 0, 0, 0, 0, 0x3b]);
  bytes
}

pub fn multipart_content_type() -> String {
  format!("multipart/form-data; boundary={}", BOUNDARY)
}

/// 单个文件字段的 multipart 请求体
pub fn multipart_body(field: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
  let mut body = Vec::new();
  body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
  body.extend_from_slice(
    format!(
      "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
      field, file_name
    )
    .as_bytes(),
  );
  body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
  body.extend_from_slice(bytes);
  body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
  body
}

/// 只有普通文本字段、没有文件
pub fn multipart_text_only(field: &str, value: &str) -> Vec<u8> {
  format!(
    "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"\r\n\r\n{v}\r\n--{b}--\r\n",
    b = BOUNDARY,
    f = field,
    v = value
  )
  .into_bytes()
}
