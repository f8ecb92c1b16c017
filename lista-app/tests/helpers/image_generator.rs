//! Synthetic image fixtures

use image::{GrayImage, Luma, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

/// Uniform black frame, i.e. a separator card
pub fn write_black_image(path: &Path, side: u32) {
    GrayImage::from_pixel(side, side, Luma([0])).save(path).unwrap();
}

/// Full-range random noise (high entropy, dense edges)
pub fn write_noise_image(path: &Path, side: u32, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    GrayImage::from_fn(side, side, |_, _| Luma([rng.gen::<u8>()]))
        .save(path)
        .unwrap();
}

/// Bright gradient with a dark block, standing in for a product photo
pub fn write_photo_like_image(path: &Path, width: u32, height: u32) {
    RgbImage::from_fn(width, height, |x, y| {
        if x > width / 3 && x < 2 * width / 3 && y > height / 3 && y < 2 * height / 3 {
            Rgb([30, 30, 30])
        } else {
            Rgb([(x * 255 / width.max(1)) as u8, 180, (y * 255 / height.max(1)) as u8])
        }
    })
    .save(path)
    .unwrap();
}
