/* Copyright 2020 @TwoCookingMice */

use crate::math::bitmap::Bitmap;

use exr::prelude::*;
use std::path::Path;

/// Writes linear radiance as a 32-bit float RGB OpenEXR file.
pub fn write_exr_to_file<P: AsRef<Path>>(image: &Bitmap, file_path: P) -> exr::error::UnitResult {
    log::info!("Starting writing openexr images: {}.", file_path.as_ref().display());

    write_rgb_file(file_path, image.width(), image.height(), |x, y| {
        let c = image[(x, y)];
        (c.x, c.y, c.z)
    })
}
