// 该文件是 PCB Defect （板检） 项目的一部分。
// src/input.rs - 上传图像输入
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

use std::{io::Cursor, path::Path};

use image::{
  ColorType, DynamicImage, ImageDecoder, ImageFormat, ImageReader, RgbImage,
  metadata::Orientation,
};
use thiserror::Error;
use tracing::debug;

mod read_image_file;
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

/// 上传控件与服务端共同接受的扩展名
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum InputError {
  #[error("Unsupported file type '.{0}', please upload a JPG, JPEG or PNG image")]
  UnsupportedExtension(String),
  #[error("Unsupported image format, please upload a JPG, JPEG or PNG image")]
  UnsupportedFormat,
  #[error("The uploaded file is empty")]
  Empty,
  #[error("Cannot decode the uploaded image: {0}")]
  Decode(#[from] image::ImageError),
}

impl InputError {
  /// 文件类型被拒绝（而非内容损坏）
  pub fn is_unsupported(&self) -> bool {
    matches!(
      self,
      InputError::UnsupportedExtension(_) | InputError::UnsupportedFormat
    )
  }
}

/// 检查文件名扩展名，无扩展名时交由内容嗅探决定
pub fn check_extension(file_name: &str) -> Result<(), InputError> {
  let Some(ext) = Path::new(file_name).extension().and_then(|e| e.to_str()) else {
    return Ok(());
  };

  let ext = ext.to_ascii_lowercase();
  if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
    Ok(())
  } else {
    Err(InputError::UnsupportedExtension(ext))
  }
}

/// 解码后的上传图像，只在单个请求内存活
#[derive(Debug, Clone)]
pub struct UploadedImage {
  pub format: ImageFormat,
  pub color: ColorType,
  pub image: RgbImage,
}

impl UploadedImage {
  pub fn decode(file_name: Option<&str>, bytes: &[u8]) -> Result<Self, InputError> {
    if let Some(name) = file_name {
      check_extension(name)?;
    }

    if bytes.is_empty() {
      return Err(InputError::Empty);
    }

    let format = match image::guess_format(bytes) {
      Ok(format @ (ImageFormat::Jpeg | ImageFormat::Png)) => format,
      Ok(other) => {
        debug!("拒绝图像格式: {:?}", other);
        return Err(InputError::UnsupportedFormat);
      }
      Err(_) => return Err(InputError::UnsupportedFormat),
    };

    // 手机拍摄的照片按 EXIF 方向摆正后再推理
    let mut decoder = ImageReader::with_format(Cursor::new(bytes), format).into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut decoded = DynamicImage::from_decoder(decoder)?;
    if orientation != Orientation::NoTransforms {
      debug!("按 EXIF 方向 {:?} 旋转图像", orientation);
      decoded.apply_orientation(orientation);
    }

    let color = decoded.color();
    if color != ColorType::Rgb8 {
      debug!("将 {:?} 图像转换为 RGB8", color);
    }

    Ok(UploadedImage {
      format,
      color,
      image: decoded.to_rgb8(),
    })
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }
}
