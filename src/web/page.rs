// 该文件是 PCB Defect （板检） 项目的一部分。
// src/web/page.rs - 页面渲染
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

//! 单页界面：标题、侧边栏、上传表单与检测结果

use std::{fmt::Write, io::Cursor};

use base64::Engine;
use image::{ImageFormat, RgbImage};

use crate::{input::ALLOWED_EXTENSIONS, web::UPLOAD_FIELD};

const STYLE: &str = include_str!("../../assets/style.css");
const SCRIPT: &str = include_str!("../../assets/preview.js");

const TITLE: &str = "🌟 PCB Defect Detection 🌟";
const INTRO: &str = "Upload an image of defected PCB to detect defects or errors using our trained ML model. \
This model will analyze and identify the defects in the PCB.";
const CREDIT: &str = "Developed by the Sukhesh and Team ⚡️";

/// 一次检测的页面数据
#[derive(Debug, Clone)]
pub struct ResultView {
  pub uploaded_uri: String,
  pub annotated_uri: String,
  pub lines: Vec<String>,
}

impl ResultView {
  pub fn new(uploaded: &RgbImage, annotated: &RgbImage, lines: Vec<String>) -> Result<Self, image::ImageError> {
    Ok(Self {
      uploaded_uri: png_data_uri(uploaded)?,
      annotated_uri: png_data_uri(annotated)?,
      lines,
    })
  }
}

pub fn png_data_uri(image: &RgbImage) -> Result<String, image::ImageError> {
  let mut buffer = Cursor::new(Vec::new());
  image.write_to(&mut buffer, ImageFormat::Png)?;
  let encoded = base64::engine::general_purpose::STANDARD.encode(buffer.into_inner());
  Ok(format!("data:image/png;base64,{}", encoded))
}

/// 上传控件的 accept 属性，如 `.jpg,.jpeg,.png`
pub fn accept_attribute() -> String {
  ALLOWED_EXTENSIONS
    .iter()
    .map(|ext| format!(".{}", ext))
    .collect::<Vec<_>>()
    .join(",")
}

pub fn render_index() -> String {
  render_page("")
}

pub fn render_result(view: &ResultView) -> String {
  let mut body = String::from("<section class=\"result\">\n");
  let _ = write!(
    body,
    "<figure><img class=\"uploaded-image\" src=\"{}\" alt=\"Uploaded Image\">\
     <figcaption>Uploaded Image</figcaption></figure>\n\
     <figure><img class=\"detected-image\" src=\"{}\" alt=\"Detected Image\">\
     <figcaption>Detected Image</figcaption></figure>\n",
    view.uploaded_uri, view.annotated_uri
  );

  body.push_str("<div class=\"detections\">\n");
  for line in &view.lines {
    let _ = writeln!(body, "<p class=\"confidence\">{}</p>", escape_html(line));
  }
  body.push_str("</div>\n</section>\n");

  render_page(&body)
}

pub fn render_error(message: &str) -> String {
  render_page(&format!(
    "<div class=\"error\" role=\"alert\">{}</div>\n",
    escape_html(message)
  ))
}

fn render_page(body: &str) -> String {
  format!(
    r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>PCB Defect Detection</title>
<style>
{style}
</style>
</head>
<body>
<aside class="sidebar">
<div class="sidebar-content">
<div class="logo" aria-hidden="true">🔬</div>
<h2>About</h2>
<p>This app uses a custom-trained YOLOv5 model for object detection.</p>
<p>{intro}</p>
<p>{credit}</p>
<hr>
</div>
</aside>
<main class="main">
<div class="title"><h1>{title}</h1></div>
<p>{intro}</p>
<h3>📤 Upload an Image</h3>
<form id="upload-form" action="/detect" method="post" enctype="multipart/form-data">
<label for="image">Choose an image...</label>
<input id="image" type="file" name="{field}" accept="{accept}" required>
<button type="submit">Detect</button>
</form>
<div id="client-error" class="error" role="alert" hidden></div>
<img id="preview" class="uploaded-image" alt="Uploaded Image" hidden>
<p id="detecting" hidden>Detecting...</p>
{body}</main>
<script>
{script}
</script>
</body>
</html>
"#,
    style = STYLE,
    intro = INTRO,
    credit = CREDIT,
    title = TITLE,
    field = UPLOAD_FIELD,
    accept = accept_attribute(),
    body = body,
    script = SCRIPT,
  )
}

fn escape_html(text: &str) -> String {
  let mut escaped = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => escaped.push_str("&amp;"),
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      '"' => escaped.push_str("&quot;"),
      '\'' => escaped.push_str("&#39;"),
      c => escaped.push(c),
    }
  }
  escaped
}
