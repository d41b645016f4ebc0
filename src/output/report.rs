// 该文件是 PCB Defect （板检） 项目的一部分。
// src/output/report.rs - 检测结果文本
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

use std::fmt;

use crate::model::{DetectItem, DetectResult, WithLabel};

/// 单条检测结果的展示行：`{index}: {label} (Confidence: {score:.2})`
pub struct DetectionLine<'a, T> {
  pub index: usize,
  pub item: &'a DetectItem<T>,
}

impl<T: WithLabel> fmt::Display for DetectionLine<'_, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}: {} (Confidence: {:.2})",
      self.index,
      self.item.kind.to_label_str(),
      self.item.score
    )
  }
}

/// 按模型输出顺序编号，序号从 1 开始
pub fn detection_lines<T: WithLabel>(result: &DetectResult<T>) -> Vec<String> {
  result
    .items
    .iter()
    .enumerate()
    .map(|(i, item)| DetectionLine { index: i + 1, item }.to_string())
    .collect()
}

/// 检测结果的文本记录，随输出图像一起保存
pub struct Record {
  pub label_with_name: bool,
}

impl Record {
  pub fn render<T: WithLabel>(&self, result: &DetectResult<T>) -> String {
    result
      .items
      .iter()
      .map(|item| {
        let name = if self.label_with_name {
          item.kind.to_label_str()
        } else {
          item.kind.to_label_id().to_string()
        };
        format!(
          "{}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}",
          name, item.score, item.bbox[0], item.bbox[1], item.bbox[2], item.bbox[3]
        )
      })
      .collect::<Vec<_>>()
      .join("\n")
  }

  pub fn record<T: WithLabel>(
    &self,
    result: &DetectResult<T>,
    path: &std::path::Path,
  ) -> Result<(), std::io::Error> {
    std::fs::write(path.with_extension("txt"), self.render(result))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::PcbDefect;

  fn item(kind: PcbDefect, score: f32) -> DetectItem<PcbDefect> {
    DetectItem {
      kind,
      score,
      bbox: [0.1, 0.2, 0.3, 0.4],
    }
  }

  #[test]
  fn confidence_has_two_decimals() {
    let item = item(PcbDefect::Short, 0.9456);
    let line = DetectionLine { index: 1, item: &item };
    assert_eq!(line.to_string(), "1: short (Confidence: 0.95)");

    let item = self::item(PcbDefect::Spur, 0.5);
    assert_eq!(
      DetectionLine { index: 2, item: &item }.to_string(),
      "2: spur (Confidence: 0.50)"
    );
  }

  #[test]
  fn lines_follow_model_order() {
    let result = DetectResult::from(vec![
      item(PcbDefect::Spur, 0.31),
      item(PcbDefect::MissingHole, 0.99),
      item(PcbDefect::Unknown(9), 0.4),
    ]);

    let lines = detection_lines(&result);
    assert_eq!(lines.len(), result.len());
    assert_eq!(
      lines,
      vec![
        "1: spur (Confidence: 0.31)",
        "2: missing_hole (Confidence: 0.99)",
        "3: class9 (Confidence: 0.40)",
      ]
    );
  }

  #[test]
  fn no_detections_no_lines() {
    assert!(detection_lines(&DetectResult::<PcbDefect>::empty()).is_empty());
  }

  #[test]
  fn record_is_written_next_to_image() {
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("out.png");
    let result = DetectResult::from(vec![item(PcbDefect::MouseBite, 0.75)]);

    Record { label_with_name: true }.record(&result, &image_path).unwrap();
    let text = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
    assert_eq!(text, "mouse_bite, 0.7500, 0.1000, 0.2000, 0.3000, 0.4000");

    assert_eq!(
      Record { label_with_name: false }.render(&result),
      "1, 0.7500, 0.1000, 0.2000, 0.3000, 0.4000"
    );
  }
}
