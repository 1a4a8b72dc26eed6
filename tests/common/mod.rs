#![allow(dead_code)]

use std::fs;
use std::path::Path;

use image::{GrayImage, Luma, Rgb, RgbImage};

fn ensure_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
}

/// Writes a real image, encoded by the path's extension, so header-based
/// dimension reads work.
pub fn write_image(path: &Path, width: u32, height: u32) {
    ensure_parent(path);
    RgbImage::from_pixel(width, height, Rgb([90, 120, 150]))
        .save(path)
        .expect("write image");
}

/// Writes an 8-bit grayscale mask with the given `(x, y, value)` pixels set,
/// encoded by the path's extension.
pub fn write_mask(path: &Path, width: u32, height: u32, pixels: &[(u32, u32, u8)]) {
    ensure_parent(path);
    let mut mask = GrayImage::new(width, height);
    for &(x, y, value) in pixels {
        mask.put_pixel(x, y, Luma([value]));
    }
    mask.save(path).expect("write mask");
}

/// Pixels of a filled rectangle, for `write_mask`.
pub fn rect(x: u32, y: u32, w: u32, h: u32, value: u8) -> Vec<(u32, u32, u8)> {
    (y..y + h)
        .flat_map(|py| (x..x + w).map(move |px| (px, py, value)))
        .collect()
}

/// The two-image dataset used by the end-to-end tests: `a` has an empty
/// mask, `b` a 2x2 blob at (2, 1).
pub fn create_two_image_dataset(root: &Path) {
    write_image(&root.join("images/a.jpg"), 6, 5);
    write_image(&root.join("images/b.jpg"), 6, 5);
    write_mask(&root.join("masks/a.png"), 6, 5, &[]);
    write_mask(&root.join("masks/b.png"), 6, 5, &rect(2, 1, 2, 2, 1));
}
