// 该文件是 PCB Defect （板检） 项目的一部分。
// src/web/routes.rs - 请求处理
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

use std::sync::Arc;

use axum::{
  Json,
  extract::{Multipart, State},
  http::StatusCode,
  response::Html,
};
use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
  input::UploadedImage,
  model::{DetectResult, PcbDefect, PcbDetector, WithLabel},
  output::detection_lines,
  task::{Inspection, OneShotTask, Task},
  web::{
    AppState, UPLOAD_FIELD, WebError,
    page::{self, ResultView},
  },
};

type PcbInspection = Inspection<RgbImage, DetectResult<PcbDefect>, RgbImage>;

struct Upload {
  file_name: Option<String>,
  bytes: Vec<u8>,
}

#[derive(Debug, Serialize)]
pub struct ApiDetection {
  pub index: usize,
  pub label: String,
  pub confidence: f32,
  /// 原图像素坐标 [x_min, y_min, x_max, y_max]
  pub bbox: [f32; 4],
}

#[derive(Debug, Serialize)]
pub struct ApiResponse {
  pub width: u32,
  pub height: u32,
  pub elapsed_ms: f64,
  pub detections: Vec<ApiDetection>,
  pub lines: Vec<String>,
}

impl From<&PcbInspection> for ApiResponse {
  fn from(inspection: &PcbInspection) -> Self {
    let (width, height) = inspection.frame.dimensions();
    let detections = inspection
      .result
      .items
      .iter()
      .enumerate()
      .map(|(i, item)| ApiDetection {
        index: i + 1,
        label: item.kind.to_label_str(),
        confidence: item.score,
        bbox: item.bbox_px(width, height),
      })
      .collect();

    ApiResponse {
      width,
      height,
      elapsed_ms: inspection.elapsed.as_secs_f64() * 1000.0,
      detections,
      lines: detection_lines(&inspection.result),
    }
  }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
  pub status: String,
  pub version: String,
  pub started_at: String,
}

/// GET / - 上传页面
pub async fn index() -> Html<String> {
  Html(page::render_index())
}

/// POST /detect - 表单上传，返回带结果的页面
pub async fn detect_page<M: PcbDetector>(
  State(state): State<Arc<AppState<M>>>,
  multipart: Multipart,
) -> (StatusCode, Html<String>) {
  let outcome = inspect_upload(state, multipart, |inspection| {
    let lines = detection_lines(&inspection.result);
    Ok(ResultView::new(&inspection.frame, &inspection.rendered, lines)?)
  })
  .await;

  match outcome {
    Ok(view) => (StatusCode::OK, Html(page::render_result(&view))),
    Err(e) => {
      e.log();
      (e.status(), Html(page::render_error(&e.user_message())))
    }
  }
}

/// POST /api/detect - 同样的上传，返回 JSON
pub async fn detect_api<M: PcbDetector>(
  State(state): State<Arc<AppState<M>>>,
  multipart: Multipart,
) -> Result<Json<ApiResponse>, WebError> {
  let response = inspect_upload(state, multipart, |inspection| Ok(ApiResponse::from(&inspection))).await?;
  Ok(Json(response))
}

/// GET /health - 健康检查
pub async fn health<M: PcbDetector>(State(state): State<Arc<AppState<M>>>) -> Json<HealthResponse> {
  Json(HealthResponse {
    status: "ok".to_string(),
    version: env!("CARGO_PKG_VERSION").to_string(),
    started_at: state.started_at.to_rfc3339(),
  })
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, WebError> {
  while let Some(field) = multipart.next_field().await? {
    if field.name() != Some(UPLOAD_FIELD) {
      debug!("忽略表单字段: {:?}", field.name());
      continue;
    }

    let file_name = field.file_name().map(str::to_owned);
    let bytes = field.bytes().await?;

    // 浏览器未选择文件时仍会提交一个空字段
    if bytes.is_empty() && file_name.as_deref().is_none_or(str::is_empty) {
      return Err(WebError::MissingFile);
    }

    return Ok(Upload {
      file_name,
      bytes: bytes.to_vec(),
    });
  }

  Err(WebError::MissingFile)
}

/// 解码、推理和结果整理都在阻塞线程池上同步完成
async fn inspect_upload<M, T, F>(
  state: Arc<AppState<M>>,
  multipart: Multipart,
  finish: F,
) -> Result<T, WebError>
where
  M: PcbDetector,
  T: Send + 'static,
  F: FnOnce(PcbInspection) -> Result<T, WebError> + Send + 'static,
{
  let upload = read_upload(multipart).await?;
  info!(
    "收到上传: {} ({} 字节)",
    upload.file_name.as_deref().unwrap_or("<unnamed>"),
    upload.bytes.len()
  );

  tokio::task::spawn_blocking(move || {
    let uploaded = UploadedImage::decode(upload.file_name.as_deref(), &upload.bytes)?;
    debug!(
      "解码完成: {:?} {}x{}",
      uploaded.format,
      uploaded.width(),
      uploaded.height()
    );

    let inspection = OneShotTask.run_task(
      std::iter::once(uploaded.image),
      state.model.as_ref(),
      state.draw.as_ref(),
    )?;
    info!("检测到 {} 个缺陷", inspection.result.len());

    finish(inspection)
  })
  .await?
}
