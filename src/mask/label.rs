//! Integer-valued segmentation masks read from disk.

use std::path::Path;

use image::{DynamicImage, ImageReader};

use super::BinaryMask;
use crate::error::PrepError;

/// Which pixels of a label mask count as foreground for one category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelSelector {
    /// Any non-zero value (single-category datasets).
    AnyForeground,
    /// Pixels equal to the given class value.
    Equals(u16),
}

impl LabelSelector {
    #[inline]
    fn matches(self, value: u16) -> bool {
        match self {
            LabelSelector::AnyForeground => value > 0,
            LabelSelector::Equals(wanted) => value == wanted,
        }
    }
}

/// A `height x width` grid of class values, stored row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelMask {
    height: u32,
    width: u32,
    values: Vec<u16>,
}

impl LabelMask {
    pub fn from_row_major(height: u32, width: u32, values: Vec<u16>) -> Result<Self, PrepError> {
        if values.len() != height as usize * width as usize {
            return Err(PrepError::MaskShape {
                message: format!(
                    "{} values supplied for a {}x{} label mask",
                    values.len(),
                    height,
                    width
                ),
            });
        }
        Ok(Self {
            height,
            width,
            values,
        })
    }

    /// Converts a decoded image into class values.
    ///
    /// Grayscale images keep their values, grayscale+alpha uses the luma
    /// channel and colour images use the red channel.
    pub fn from_image(image: &DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        let values = match image {
            DynamicImage::ImageLuma8(buf) => buf.as_raw().iter().map(|&v| u16::from(v)).collect(),
            DynamicImage::ImageLuma16(buf) => buf.as_raw().clone(),
            DynamicImage::ImageLumaA8(buf) => buf.pixels().map(|p| u16::from(p.0[0])).collect(),
            DynamicImage::ImageLumaA16(buf) => buf.pixels().map(|p| p.0[0]).collect(),
            DynamicImage::ImageRgb16(buf) => buf.pixels().map(|p| p.0[0]).collect(),
            DynamicImage::ImageRgba16(buf) => buf.pixels().map(|p| p.0[0]).collect(),
            other => other
                .to_rgb8()
                .pixels()
                .map(|p| u16::from(p.0[0]))
                .collect(),
        };

        Self {
            height,
            width,
            values,
        }
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Class value at `(x, y)`.
    ///
    /// # Panics
    /// Panics if the coordinate lies outside the mask.
    #[inline]
    pub fn value(&self, x: u32, y: u32) -> u16 {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} label mask",
            self.width,
            self.height
        );
        self.values[y as usize * self.width as usize + x as usize]
    }

    /// Binary mask of the pixels selected by `selector`.
    pub fn binary_where(&self, selector: LabelSelector) -> BinaryMask {
        let width = self.width as usize;
        BinaryMask::from_fn(self.height, self.width, |x, y| {
            selector.matches(self.values[y as usize * width + x as usize])
        })
    }
}

/// Decodes an image file, picking the format from its content.
///
/// Materialized masks are always named `.png` whatever their encoding, so
/// the extension cannot be trusted.
pub fn open_image(path: &Path) -> Result<DynamicImage, image::ImageError> {
    ImageReader::open(path)?.with_guessed_format()?.decode()
}

/// Reads a mask file as class values.
pub fn read_label_mask(path: &Path) -> Result<LabelMask, PrepError> {
    let image = open_image(path).map_err(|source| PrepError::MaskRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(LabelMask::from_image(&image))
}
