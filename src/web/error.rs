// 该文件是 PCB Defect （板检） 项目的一部分。
// src/web/error.rs - 请求错误
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

use axum::{
  Json,
  extract::multipart::MultipartError,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::{input::InputError, task::TaskError};

#[derive(Error, Debug)]
pub enum WebError {
  #[error("Please choose an image to upload")]
  MissingFile,
  #[error("Invalid upload: {0}")]
  Multipart(#[from] MultipartError),
  #[error(transparent)]
  Input(#[from] InputError),
  #[error("Detection failed: {0}")]
  Task(#[from] TaskError),
  #[error("Cannot encode the result image: {0}")]
  Encode(#[from] image::ImageError),
  #[error("Detection worker stopped: {0}")]
  Join(#[from] tokio::task::JoinError),
}

impl WebError {
  pub fn status(&self) -> StatusCode {
    match self {
      WebError::MissingFile => StatusCode::BAD_REQUEST,
      WebError::Multipart(e) => e.status(),
      WebError::Input(e) if e.is_unsupported() => StatusCode::UNSUPPORTED_MEDIA_TYPE,
      WebError::Input(_) => StatusCode::BAD_REQUEST,
      WebError::Task(_) | WebError::Encode(_) | WebError::Join(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  /// 展示给用户的信息，服务端故障不暴露细节
  pub fn user_message(&self) -> String {
    if self.status().is_server_error() {
      "Detection failed, please try again later".to_string()
    } else {
      self.to_string()
    }
  }

  pub fn log(&self) {
    if self.status().is_server_error() {
      error!("处理上传失败: {}", self);
    } else {
      warn!("拒绝上传: {}", self);
    }
  }
}

impl IntoResponse for WebError {
  fn into_response(self) -> Response {
    self.log();
    (self.status(), Json(json!({ "error": self.user_message() }))).into_response()
  }
}
