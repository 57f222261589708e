// Copyright @yucwang 2026

use crate::io::exr_utils::write_exr_to_file;
use crate::math::bitmap::Bitmap;

use std::fmt;
use std::path::Path;

#[derive(Debug)]
pub enum ImageWriteError {
    Exr(exr::error::Error),
    Image(image::ImageError),
    UnsupportedFormat(String),
}

impl From<exr::error::Error> for ImageWriteError {
    fn from(err: exr::error::Error) -> Self {
        ImageWriteError::Exr(err)
    }
}

impl From<image::ImageError> for ImageWriteError {
    fn from(err: image::ImageError) -> Self {
        ImageWriteError::Image(err)
    }
}

impl fmt::Display for ImageWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageWriteError::Exr(err) => write!(f, "exr error: {}", err),
            ImageWriteError::Image(err) => write!(f, "image error: {}", err),
            ImageWriteError::UnsupportedFormat(ext) => write!(f, "unsupported output format: '{}'", ext),
        }
    }
}

impl std::error::Error for ImageWriteError {}

/// Picks the encoder from the extension: `.exr` keeps linear radiance,
/// `.png` stores the tone-mapped 8-bit preview.
pub fn write_image<P: AsRef<Path>>(image: &Bitmap, path: P) -> Result<(), ImageWriteError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "exr" => write_exr_to_file(image, path)?,
        "png" => write_png_to_file(image, path)?,
        _ => return Err(ImageWriteError::UnsupportedFormat(extension)),
    }
    log::info!("Image written to: {}.", path.display());
    Ok(())
}

pub fn write_png_to_file<P: AsRef<Path>>(image: &Bitmap, path: P) -> Result<(), image::ImageError> {
    image::save_buffer(
        path,
        &image.to_rgb8(),
        image.width() as u32,
        image.height() as u32,
        image::ColorType::Rgb8,
    )
}
