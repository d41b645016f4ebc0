// 该文件是 PCB Defect （板检） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::Parser;
use url::Url;

/// PCB 缺陷检测网页服务
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型路径，使用 yolov5 方案
  #[arg(long, value_name = "MODEL", default_value = "yolov5:yolov5/models/best.onnx")]
  pub model: Url,

  /// 监听地址
  #[arg(long, default_value = "0.0.0.0")]
  pub host: String,

  /// 监听端口
  #[arg(short, long, default_value = "8501")]
  pub port: u16,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.25", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub iou: f32,

  /// 每张图最多保留的检测数
  #[arg(long, default_value = "1000", value_name = "COUNT")]
  pub max_det: usize,

  /// 模型输入边长
  #[arg(long, default_value = "640", value_name = "PIXELS")]
  pub input_size: u32,

  /// ONNX Runtime 算子内线程数
  #[arg(long, value_name = "COUNT")]
  pub threads: Option<usize>,

  /// 标签字体（TTF/OTF），不提供时只绘制边框
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 上传大小上限 (MB, 1 - 4096)
  #[arg(
    long,
    default_value = "200",
    value_name = "MB",
    value_parser = clap::value_parser!(u64).range(1..=MAX_UPLOAD_MB)
  )]
  pub max_upload_mb: u64,
}

const MAX_UPLOAD_MB: u64 = 4096;

impl Args {
  /// 上传上限换算为字节，超出平台范围时取最大值
  pub fn max_upload_bytes(&self) -> usize {
    usize::try_from(self.max_upload_mb)
      .unwrap_or(usize::MAX)
      .saturating_mul(1024 * 1024)
  }
}
