// src/utils/upload.rs

use std::path::Path;

use image::imageops::FilterType;

use crate::{config::PHOTO_WIDTH, error::AppError};

/// A photo received in the store form, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    /// Only `image/*` uploads are accepted. Checked before anything touches the disk.
    pub fn new(content_type: Option<&str>, bytes: Vec<u8>) -> Result<Self, AppError> {
        let content_type = content_type.unwrap_or_default();
        if !content_type.starts_with("image/") {
            return Err(AppError::UnsupportedMedia(
                "That filetype isn't allowed".to_string(),
            ));
        }
        Ok(Self {
            content_type: content_type.to_string(),
            bytes,
        })
    }

    /// `image/png` -> `png`.
    pub fn extension(&self) -> &str {
        self.content_type
            .split('/')
            .nth(1)
            .and_then(|sub| sub.split(';').next())
            .map(str::trim)
            .filter(|ext| !ext.is_empty())
            .unwrap_or("img")
    }

    /// A fresh random filename that keeps the original extension.
    pub fn filename(&self) -> String {
        format!("{}.{}", uuid::Uuid::new_v4(), self.extension())
    }
}

/// Resizes the photo to `PHOTO_WIDTH` pixels wide (keeping its aspect ratio),
/// writes it into `dir` and returns the stored filename.
pub async fn save_photo(dir: &Path, upload: PhotoUpload) -> Result<String, AppError> {
    let filename = upload.filename();
    let path = dir.join(&filename);

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    tokio::task::spawn_blocking(move || resize_and_write(&upload.bytes, &path))
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))??;

    tracing::info!("Stored photo {}", filename);
    Ok(filename)
}

/// Deletes a stored photo whose store write failed. Failures are only logged.
pub async fn remove_photo(dir: &Path, filename: &str) {
    if let Err(e) = tokio::fs::remove_file(dir.join(filename)).await {
        tracing::warn!("Could not remove orphaned photo {}: {}", filename, e);
    }
}

fn resize_and_write(bytes: &[u8], path: &Path) -> Result<(), AppError> {
    let format = image::guess_format(bytes)
        .map_err(|_| AppError::BadRequest("Could not read the uploaded image".to_string()))?;
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|_| AppError::BadRequest("Could not read the uploaded image".to_string()))?;

    let (width, height) = resized_dimensions(img.width(), img.height(), PHOTO_WIDTH);
    let resized = img.resize_exact(width, height, FilterType::Triangle);

    resized
        .save_with_format(path, format)
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Scales `(width, height)` to `target_width`, preserving the aspect ratio.
pub fn resized_dimensions(width: u32, height: u32, target_width: u32) -> (u32, u32) {
    if width == 0 {
        return (target_width, height.max(1));
    }
    let scaled = (u64::from(height) * u64::from(target_width) + u64::from(width) / 2) / u64::from(width);
    (target_width, scaled.clamp(1, u64::from(u32::MAX)) as u32)
}
