//! Image cropping for pending ads
//!
//! Selections carry normalized crop boxes relative to the image as displayed,
//! so EXIF orientation is applied before cropping.

use crate::models::{ImageSelection, SelectionCrop};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageDecoder, ImageReader};
use lista_common::fs_utils::safe_relative_path;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// URL prefix under which the input root is served
pub const MEDIA_PREFIX: &str = "/media/";

/// JPEG quality of cropped output
pub const JPEG_QUALITY: u8 = 92;

/// Cropping errors
#[derive(Debug, Error)]
pub enum CropError {
    /// URL outside the media mount
    #[error("Invalid media URL: {0}")]
    InvalidUrl(String),

    /// Referenced source image does not exist
    #[error("Source image not found: {0}")]
    SourceMissing(String),

    /// Decode or encode failure
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Map a media URL to a path relative to the input root
pub fn media_relative_path(url: &str) -> Result<PathBuf, CropError> {
    let rest = url
        .strip_prefix(MEDIA_PREFIX)
        .ok_or_else(|| CropError::InvalidUrl(url.to_string()))?;
    safe_relative_path(rest).map_err(|_| CropError::InvalidUrl(url.to_string()))
}

/// Pixel box `(left, top, width, height)` for a normalized crop
///
/// Every crop value is clamped to [0, 1] first. Returns `None` for an
/// empty box.
pub fn crop_box(width: u32, height: u32, crop: &SelectionCrop) -> Option<(u32, u32, u32, u32)> {
    let clamp = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
    let (x, y, w, h) = (clamp(crop.x), clamp(crop.y), clamp(crop.w), clamp(crop.h));
    let (fw, fh) = (width as f64, height as f64);

    let left = ((x * fw).round() as u32).min(width);
    let top = ((y * fh).round() as u32).min(height);
    let right = (((x + w) * fw).round() as u32).min(width);
    let bottom = (((y + h) * fh).round() as u32).min(height);

    if right <= left || bottom <= top {
        return None;
    }
    Some((left, top, right - left, bottom - top))
}

/// Decode an image with its EXIF orientation applied
pub fn open_oriented(path: &Path) -> Result<DynamicImage, CropError> {
    let mut decoder = ImageReader::open(path)?.with_guessed_format()?.into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);
    Ok(img)
}

/// Crop every selection into `ad_dir` as `cropped_NN.jpg`
///
/// `NN` is the 1-based position in `selections`; selections whose box is
/// empty are skipped without renumbering the rest.
pub fn crop_selections(
    input_root: &Path,
    ad_dir: &Path,
    selections: &[ImageSelection],
) -> Result<Vec<PathBuf>, CropError> {
    std::fs::create_dir_all(ad_dir)?;
    let mut written = Vec::new();

    for (idx, selection) in selections.iter().enumerate() {
        let rel = media_relative_path(&selection.url)?;
        let source = input_root.join(&rel);
        if !source.is_file() {
            return Err(CropError::SourceMissing(rel.display().to_string()));
        }

        let img = open_oriented(&source)?.to_rgb8();
        let Some((left, top, width, height)) = crop_box(img.width(), img.height(), &selection.crop) else {
            debug!(url = %selection.url, "Skipping empty crop");
            continue;
        };
        let cropped = image::imageops::crop_imm(&img, left, top, width, height).to_image();

        let out_path = ad_dir.join(format!("cropped_{:02}.jpg", idx + 1));
        let mut writer = BufWriter::new(File::create(&out_path)?);
        JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY).encode_image(&cropped)?;
        writer.flush()?;

        debug!(
            source = %source.display(),
            output = %out_path.display(),
            width,
            height,
            "Cropped image"
        );
        written.push(out_path);
    }

    info!(ad_dir = %ad_dir.display(), count = written.len(), "Cropped selections");
    Ok(written)
}
