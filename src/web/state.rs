// 该文件是 PCB Defect （板检） 项目的一部分。
// src/web/state.rs - 共享状态
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

use chrono::{DateTime, Utc};

use crate::output::Draw;

/// 默认上传上限 200 MB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// 所有请求共享的只读状态
pub struct AppState<M> {
  pub model: Arc<M>,
  pub draw: Arc<Draw>,
  pub started_at: DateTime<Utc>,
  pub max_upload_bytes: usize,
}

impl<M> AppState<M> {
  pub fn new(model: Arc<M>, draw: Draw) -> Self {
    Self {
      model,
      draw: Arc::new(draw),
      started_at: Utc::now(),
      max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
    }
  }

  pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
    self.max_upload_bytes = max_upload_bytes;
    self
  }
}
