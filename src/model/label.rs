// 该文件是 PCB Defect （板检） 项目的一部分。
// src/model/label.rs - PCB 缺陷类别
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

use crate::model::WithLabel;

/// 按训练时的类别编号排列
const PCB_DEFECT_NAMES: [&str; 6] = [
  "missing_hole",
  "mouse_bite",
  "open_circuit",
  "short",
  "spur",
  "spurious_copper",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PcbDefect {
  MissingHole,
  MouseBite,
  OpenCircuit,
  Short,
  Spur,
  SpuriousCopper,
  /// 模型输出了类别表之外的编号
  Unknown(u32),
}

impl PcbDefect {
  pub const ALL: [PcbDefect; 6] = [
    PcbDefect::MissingHole,
    PcbDefect::MouseBite,
    PcbDefect::OpenCircuit,
    PcbDefect::Short,
    PcbDefect::Spur,
    PcbDefect::SpuriousCopper,
  ];

  pub fn names() -> &'static [&'static str] {
    &PCB_DEFECT_NAMES
  }
}

impl WithLabel for PcbDefect {
  fn to_label_str(&self) -> String {
    match self {
      PcbDefect::Unknown(id) => format!("class{}", id),
      known => PCB_DEFECT_NAMES[known.to_label_id() as usize].to_string(),
    }
  }

  fn to_label_id(&self) -> u32 {
    match self {
      PcbDefect::MissingHole => 0,
      PcbDefect::MouseBite => 1,
      PcbDefect::OpenCircuit => 2,
      PcbDefect::Short => 3,
      PcbDefect::Spur => 4,
      PcbDefect::SpuriousCopper => 5,
      PcbDefect::Unknown(id) => *id,
    }
  }

  fn from_label_id(id: u32) -> Self {
    Self::ALL
      .get(id as usize)
      .copied()
      .unwrap_or(PcbDefect::Unknown(id))
  }
}

impl std::fmt::Display for PcbDefect {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.to_label_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ids_follow_training_order() {
    for (id, name) in PCB_DEFECT_NAMES.iter().enumerate() {
      let defect = PcbDefect::from_label_id(id as u32);
      assert_eq!(defect.to_label_id(), id as u32);
      assert_eq!(&defect.to_label_str(), name);
    }
  }

  #[test]
  fn unknown_id_keeps_its_number() {
    let defect = PcbDefect::from_label_id(42);
    assert_eq!(defect, PcbDefect::Unknown(42));
    assert_eq!(defect.to_string(), "class42");
    assert_eq!(defect.to_label_id(), 42);
  }
}
