// 该文件是 PCB Defect （板检） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use pcb_defect::{
  FromUrl,
  model::{DetectParams, ModelLoader, PcbDefect, Yolov5, Yolov5Builder},
  output::Draw,
  web::{self, AppState},
};

static MODEL: ModelLoader<Yolov5<PcbDefect>> = ModelLoader::new();

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("PCB Defect v{}", env!("CARGO_PKG_VERSION"));
  info!("模型文件路径: {}", args.model);

  let params = DetectParams {
    confidence: args.confidence,
    iou: args.iou,
    max_det: args.max_det,
  };
  let builder = Yolov5Builder::from_url(&args.model)?
    .params(params)
    .input_size(args.input_size)
    .intra_threads(args.threads);

  // 模型加载失败时直接退出，不提供服务
  let model = MODEL
    .get_or_load(|| builder.build::<PcbDefect>())
    .with_context(|| format!("无法加载模型: {}", args.model))?;
  info!("检测参数: {:?}", model.params());

  let draw = match &args.font {
    Some(path) => Draw::from_font_file(path)?,
    None => Draw::embedded()?,
  };

  let state = AppState::new(model, draw).with_max_upload_bytes(args.max_upload_bytes());
  let app = web::router(Arc::new(state));

  let addr: SocketAddr = format!("{}:{}", args.host, args.port)
    .parse()
    .with_context(|| format!("无效的监听地址: {}:{}", args.host, args.port))?;
  info!("服务启动于 http://{}", addr);

  let listener = tokio::net::TcpListener::bind(addr).await?;
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  info!("服务已退出");
  Ok(())
}

async fn shutdown_signal() {
  if tokio::signal::ctrl_c().await.is_ok() {
    info!("收到中断信号，准备退出...");
  }
}
