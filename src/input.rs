// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input.rs - 图像输入
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

use std::path::Path;

use image::{DynamicImage, ImageReader};
use thiserror::Error;

use crate::FromUrl;

mod read_image_file;
pub use self::read_image_file::{ImageFileInput, ImageFolderInput};

/// 文件层允许的图像扩展名
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

#[derive(Error, Debug)]
pub enum InputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像解码失败: {0}")]
  Decode(#[from] image::ImageError),
  #[error("不支持的图像文件: {0}")]
  Unsupported(String),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 待检测的原始图像：名称 + 未解码的字节
#[derive(Debug, Clone)]
pub struct SourceImage {
  pub name: String,
  pub bytes: Vec<u8>,
}

impl SourceImage {
  pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
    Self {
      name: name.into(),
      bytes,
    }
  }

  pub fn read(path: &Path) -> Result<Self, InputError> {
    let bytes = std::fs::read(path)?;
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| path.display().to_string());
    Ok(Self { name, bytes })
  }

  pub fn decode(&self) -> Result<DynamicImage, InputError> {
    decode_bytes(&self.bytes)
  }
}

pub fn is_supported_image(path: &Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
    .unwrap_or(false)
}

/// 从字节缓冲解码，格式由内容推断
pub fn decode_bytes(bytes: &[u8]) -> Result<DynamicImage, InputError> {
  let image = ImageReader::new(std::io::Cursor::new(bytes))
    .with_guessed_format()?
    .decode()?;
  Ok(image)
}

/// 从文件路径解码
pub fn decode_path(path: &Path) -> Result<DynamicImage, InputError> {
  let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
  Ok(image)
}

pub enum InputWrapper {
  ReadImageFile(ImageFileInput),
  ReadImageFolder(ImageFolderInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    use crate::FromUrlWithScheme;

    match url.scheme() {
      ImageFileInput::SCHEME => Ok(InputWrapper::ReadImageFile(ImageFileInput::from_url(url)?)),
      ImageFolderInput::SCHEME => Ok(InputWrapper::ReadImageFolder(
        ImageFolderInput::from_url(url)?,
      )),
      other => Err(InputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Iterator for InputWrapper {
  type Item = Result<SourceImage, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapper::ReadImageFile(input) => input.next(),
      InputWrapper::ReadImageFolder(input) => input.next(),
    }
  }
}
