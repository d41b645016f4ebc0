// 该文件是 PCB Defect （板检） 项目的一部分。
// src/web.rs - 网页服务
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
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::model::PcbDetector;

mod error;
pub mod page;
mod routes;
mod state;

pub use self::error::WebError;
pub use self::routes::{ApiDetection, ApiResponse, HealthResponse};
pub use self::state::AppState;

/// 上传字段名，与页面表单一致
pub const UPLOAD_FIELD: &str = "image";

pub fn router<M: PcbDetector>(state: Arc<AppState<M>>) -> Router {
  let body_limit = state.max_upload_bytes;

  Router::new()
    .route("/", get(routes::index))
    .route("/detect", post(routes::detect_page::<M>))
    .route("/api/detect", post(routes::detect_api::<M>))
    .route("/health", get(routes::health::<M>))
    .with_state(state)
    .layer(DefaultBodyLimit::max(body_limit))
    .layer(TraceLayer::new_for_http())
}
