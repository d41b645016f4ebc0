// 该文件是 PCB Defect （板检） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use std::{convert::Infallible, path::Path};

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;
use tracing::info;

use crate::{
  model::{DetectItem, DetectResult, WithLabel},
  output::Render,
};

// YOLOv5 的类别调色板，按类别编号取模
const PALETTE: [[u8; 3]; 20] = [
  [0xFF, 0x38, 0x38],
  [0xFF, 0x9D, 0x97],
  [0xFF, 0x70, 0x1F],
  [0xFF, 0xB2, 0x1D],
  [0xCF, 0xD2, 0x31],
  [0x48, 0xF9, 0x0A],
  [0x92, 0xCC, 0x17],
  [0x3D, 0xDB, 0x86],
  [0x1A, 0x93, 0x34],
  [0x00, 0xD4, 0xBB],
  [0x2C, 0x99, 0xA8],
  [0x00, 0xC2, 0xFF],
  [0x34, 0x45, 0x93],
  [0x64, 0x73, 0xFF],
  [0x00, 0x18, 0xEC],
  [0x84, 0x38, 0xFF],
  [0x52, 0x00, 0x85],
  [0xCB, 0x38, 0xFF],
  [0xFF, 0x95, 0xC8],
  [0xFF, 0x37, 0xC7],
];

const LABEL_TEXT_COLOR: [u8; 3] = [255, 255, 255];
const LABEL_TEXT_PADDING: u32 = 2;
const MIN_LINE_WIDTH: i32 = 2;
const MIN_FONT_SIZE: f32 = 12.0;

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("无法读取字体文件: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(String),
}

const EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// 在原图上绘制检测框与类别标签
pub struct Draw {
  font: FontVec,
}

impl Draw {
  pub fn with_font(font: FontVec) -> Self {
    Self { font }
  }

  /// 使用内置的 DejaVu Sans 字体
  pub fn embedded() -> Result<Self, DrawError> {
    let font = FontVec::try_from_vec(EMBEDDED_FONT.to_vec())
      .map_err(|e| DrawError::InvalidFont(e.to_string()))?;
    Ok(Self::with_font(font))
  }

  pub fn from_font_file(path: &Path) -> Result<Self, DrawError> {
    let data = std::fs::read(path)?;
    let font = FontVec::try_from_vec(data).map_err(|e| DrawError::InvalidFont(e.to_string()))?;
    info!("加载标签字体: {}", path.display());
    Ok(Self::with_font(font))
  }

  pub fn color_of(class_id: u32) -> [u8; 3] {
    PALETTE[class_id as usize % PALETTE.len()]
  }

  fn line_width(image: &RgbImage) -> i32 {
    let mean_side = (image.width() + image.height()) as f32 / 2.0;
    ((mean_side * 0.003).round() as i32).max(MIN_LINE_WIDTH)
  }

  fn font_size(image: &RgbImage) -> f32 {
    let mean_side = (image.width() + image.height()) as f32 / 2.0;
    (mean_side * 0.035).round().max(MIN_FONT_SIZE)
  }

  // bbox 为归一化坐标 [x_min, y_min, x_max, y_max]
  fn draw_bbox_with_label<T: WithLabel>(&self, image: &mut RgbImage, item: &DetectItem<T>) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let x_min = ((item.bbox[0] * w as f32).floor() as i32).clamp(0, w - 1);
    let y_min = ((item.bbox[1] * h as f32).floor() as i32).clamp(0, h - 1);
    let x_max = ((item.bbox[2] * w as f32).ceil() as i32).clamp(0, w - 1);
    let y_max = ((item.bbox[3] * h as f32).ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    let color = Rgb(Self::color_of(item.kind.to_label_id()));

    // 边框向内加粗
    let line_width = Self::line_width(image);
    for t in 0..line_width {
      let (bw, bh) = (x_max - x_min - 2 * t + 1, y_max - y_min - 2 * t + 1);
      if bw <= 0 || bh <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(bw as u32, bh as u32);
      draw_hollow_rect_mut(image, rect, color);
    }

    let font = &self.font;
    let label = format!("{} {:.2}", item.kind.to_label_str(), item.score);
    let scale = PxScale::from(Self::font_size(image));
    let (text_w, text_h) = text_size(scale, font, &label);
    let tag_w = text_w + 2 * LABEL_TEXT_PADDING;
    let tag_h = text_h + 2 * LABEL_TEXT_PADDING;

    // 框上方放不下时把标签放进框内
    let tag_y = if y_min >= tag_h as i32 {
      y_min - tag_h as i32
    } else {
      y_min
    };
    let tag_w = tag_w.min((w - x_min) as u32);
    let tag_h = tag_h.min((h - tag_y) as u32);
    if tag_w == 0 || tag_h == 0 {
      return;
    }

    draw_filled_rect_mut(image, Rect::at(x_min, tag_y).of_size(tag_w, tag_h), color);
    draw_text_mut(
      image,
      Rgb(LABEL_TEXT_COLOR),
      x_min + LABEL_TEXT_PADDING as i32,
      tag_y + LABEL_TEXT_PADDING as i32,
      scale,
      font,
      &label,
    );
  }
}

pub trait DrawDetectionOnImage<T: WithLabel> {
  fn draw_detections_on_image(&self, image: &mut RgbImage, result: &DetectResult<T>);
}

impl<T: WithLabel> DrawDetectionOnImage<T> for Draw {
  fn draw_detections_on_image(&self, image: &mut RgbImage, result: &DetectResult<T>) {
    for item in result.items.iter() {
      self.draw_bbox_with_label(image, item);
    }
  }
}

impl<T: WithLabel> Render<RgbImage, DetectResult<T>> for Draw {
  type Rendered = RgbImage;
  type Error = Infallible;

  fn render_result(&self, frame: &RgbImage, result: &DetectResult<T>) -> Result<RgbImage, Infallible> {
    let mut image = frame.clone();
    self.draw_detections_on_image(&mut image, result);
    Ok(image)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::PcbDefect;

  fn board() -> RgbImage {
    RgbImage::from_fn(333, 217, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 40]))
  }

  fn one_short() -> DetectResult<PcbDefect> {
    DetectResult::from(vec![DetectItem {
      kind: PcbDefect::Short,
      score: 0.87,
      bbox: [0.2, 0.3, 0.6, 0.7],
    }])
  }

  #[test]
  fn annotated_image_keeps_dimensions() {
    let image = board();
    let annotated = Draw::embedded().unwrap().render_result(&image, &one_short()).unwrap();
    assert_eq!(annotated.dimensions(), image.dimensions());
    assert_ne!(annotated, image);
  }

  #[test]
  fn zero_detections_leave_image_untouched() {
    let image = board();
    let annotated = Draw::embedded().unwrap()
      .render_result(&image, &DetectResult::<PcbDefect>::empty())
      .unwrap();
    assert_eq!(annotated, image);
  }

  #[test]
  fn box_uses_class_colour() {
    let image = RgbImage::new(100, 100);
    let annotated = Draw::embedded().unwrap().render_result(&image, &one_short()).unwrap();
    let color = Draw::color_of(PcbDefect::Short.to_label_id());
    // 左上角 (20, 30) 落在边框上
    assert_eq!(annotated.get_pixel(20, 30).0, color);
    // 框内部不被填充
    assert_eq!(annotated.get_pixel(40, 50).0, [0, 0, 0]);
  }

  #[test]
  fn label_tag_is_drawn_above_box() {
    let image = RgbImage::new(100, 100);
    let annotated = Draw::embedded().unwrap().render_result(&image, &one_short()).unwrap();
    let color = Draw::color_of(PcbDefect::Short.to_label_id());
    // 标签底边紧贴框的上边 y = 30
    assert_eq!(annotated.get_pixel(20, 29).0, color);
    // 白色文字叠在标签底色上
    let has_text = (10..30)
      .flat_map(|y| (22..70).map(move |x| (x, y)))
      .any(|(x, y)| annotated.get_pixel(x, y).0[2] > 0x80);
    assert!(has_text);
  }

  #[test]
  fn degenerate_box_is_skipped() {
    let image = RgbImage::new(50, 50);
    let result = DetectResult::from(vec![DetectItem {
      kind: PcbDefect::Spur,
      score: 0.5,
      bbox: [0.5, 0.5, 0.5, 0.5],
    }]);
    let annotated = Draw::embedded().unwrap().render_result(&image, &result).unwrap();
    assert_eq!(annotated, image);
  }

  #[test]
  fn invalid_font_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("font.ttf");
    std::fs::write(&path, b"not a font").unwrap();
    assert!(matches!(
      Draw::from_font_file(&path),
      Err(DrawError::InvalidFont(_))
    ));
    assert!(matches!(
      Draw::from_font_file(&dir.path().join("missing.ttf")),
      Err(DrawError::IoError(_))
    ));
  }
}
