//! Local storage for uploaded horse images.
//!
//! Stored paths are relative to the media root (`uploads/horse/<uuid>.png`)
//! and are what the store records. Public URLs are built by prefixing the
//! configured media URL.

use std::{
  io::{self, Cursor},
  path::PathBuf,
};

use image::{ImageFormat, ImageReader};
use uuid::Uuid;

const HORSE_DIR: &str = "uploads/horse";

/// Image formats accepted for upload. [`ImageKind::sniff`] recognises them
/// by their magic bytes; [`ImageKind::decodes`] confirms the rest of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
  Jpeg,
  Png,
  Gif,
  WebP,
  Bmp,
}

impl ImageKind {
  pub fn sniff(bytes: &[u8]) -> Option<Self> {
    match bytes {
      [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
      [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
      [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(Self::Gif),
      [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::WebP),
      [b'B', b'M', ..] if bytes.len() > 14 => Some(Self::Bmp),
      _ => None,
    }
  }

  fn format(self) -> ImageFormat {
    match self {
      Self::Jpeg => ImageFormat::Jpeg,
      Self::Png => ImageFormat::Png,
      Self::Gif => ImageFormat::Gif,
      Self::WebP => ImageFormat::WebP,
      Self::Bmp => ImageFormat::Bmp,
    }
  }

  /// Whether `bytes` decode as a complete image of this kind. Truncated or
  /// corrupted files fail here even when their signature is intact.
  pub fn decodes(self, bytes: &[u8]) -> bool {
    ImageReader::with_format(Cursor::new(bytes), self.format())
      .decode()
      .is_ok()
  }

  pub fn extension(self) -> &'static str {
    match self {
      Self::Jpeg => "jpg",
      Self::Png => "png",
      Self::Gif => "gif",
      Self::WebP => "webp",
      Self::Bmp => "bmp",
    }
  }
}

#[derive(Debug, Clone)]
pub struct MediaStore {
  root:       PathBuf,
  url_prefix: String,
}

impl MediaStore {
  pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
    Self { root: root.into(), url_prefix: url_prefix.into() }
  }

  /// Write a horse image under a fresh name and return its relative path.
  pub async fn save_horse_image(&self, kind: ImageKind, bytes: &[u8]) -> io::Result<String> {
    let dir = self.root.join(HORSE_DIR);
    tokio::fs::create_dir_all(&dir).await?;
    let file_name = format!("{}.{}", Uuid::new_v4(), kind.extension());
    tokio::fs::write(dir.join(&file_name), bytes).await?;
    Ok(format!("{HORSE_DIR}/{file_name}"))
  }

  /// Delete a stored file. Failures are logged and otherwise ignored.
  pub async fn remove(&self, relative: &str) {
    if let Err(e) = tokio::fs::remove_file(self.root.join(relative)).await {
      tracing::warn!(path = relative, error = %e, "could not remove media file");
    }
  }

  pub fn url_for(&self, relative: &str) -> String {
    if self.url_prefix.ends_with('/') {
      format!("{}{relative}", self.url_prefix)
    } else {
      format!("{}/{relative}", self.url_prefix)
    }
  }
}
