// 该文件是 PCB Defect （板检） 项目的一部分。
// src/bin/oneshot.rs - 单张图像检测
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use pcb_defect::{
  FromUrl,
  input::ImageFileInput,
  model::{PcbDefect, Yolov5Builder},
  output::{Draw, Record, SaveImageFileOutput, detection_lines},
  task::{OneShotTask, Task},
};
use tracing::info;

/// 对单张 PCB 图像运行缺陷检测并保存标注结果
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型路径
  #[arg(long, value_name = "MODEL", default_value = "yolov5:yolov5/models/best.onnx")]
  pub model: Url,
  /// 输入图像
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，同时写出同名 .txt 记录
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 标签字体
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let draw = match &args.font {
    Some(path) => Draw::from_font_file(path)?,
    None => Draw::embedded()?,
  };

  let input_image = ImageFileInput::from_url(&args.input)?;
  let model = Yolov5Builder::from_url(&args.model)?.build::<PcbDefect>()?;
  let output = SaveImageFileOutput::from_url(&args.output)?
    .with_draw(draw)
    .with_record(Record {
      label_with_name: true,
    });

  let inspection = OneShotTask.run_task(input_image, &model, &output)?;
  for line in detection_lines(&inspection.result) {
    println!("{}", line);
  }

  Ok(())
}
