//! Diagnostic image grids with mask overlays.
//!
//! Previews are best effort: [`render_split_preview`] logs and swallows
//! every failure so a broken image or a missing renderer never fails a run.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::error::PrepError;
use crate::mask::{open_image, read_label_mask, LabelMask};
use crate::materialize::{normalized_mask_name, SplitLayout};
use crate::pairing::list_images;
use crate::split::SplitName;

/// One grid cell: an image and its mask, if the split has one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewItem {
    pub image: PathBuf,
    pub mask: Option<PathBuf>,
}

/// Capability that composes preview images.
pub trait PreviewRenderer {
    /// Whether this renderer can produce output at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Renders `items` into a single image at `out_path`.
    fn render(&self, items: &[PreviewItem], out_path: &Path) -> Result<(), PrepError>;
}

/// Renderer used when previews are not wanted or cannot be produced.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledRenderer;

impl PreviewRenderer for DisabledRenderer {
    fn is_available(&self) -> bool {
        false
    }

    fn render(&self, _items: &[PreviewItem], out_path: &Path) -> Result<(), PrepError> {
        Err(PrepError::Render {
            path: out_path.to_path_buf(),
            message: "preview rendering is unavailable".to_string(),
        })
    }
}

/// Fixed-column grid of thumbnails with masks blended on top.
#[derive(Clone, Debug)]
pub struct GridRenderer {
    pub columns: u32,
    /// Edge length of each square cell in pixels.
    pub tile_size: u32,
    /// Opacity of the mask overlay.
    pub alpha: f32,
}

impl Default for GridRenderer {
    fn default() -> Self {
        Self {
            columns: 4,
            tile_size: 256,
            alpha: 0.35,
        }
    }
}

// Overlay colours indexed by mask value (wrapping after the last one).
const PALETTE: [[u8; 3]; 8] = [
    [230, 25, 75],
    [60, 180, 75],
    [255, 225, 25],
    [0, 130, 200],
    [245, 130, 48],
    [145, 30, 180],
    [70, 240, 240],
    [240, 50, 230],
];

impl PreviewRenderer for GridRenderer {
    fn render(&self, items: &[PreviewItem], out_path: &Path) -> Result<(), PrepError> {
        if items.is_empty() {
            return Ok(());
        }
        if self.columns == 0 || self.tile_size == 0 {
            return Err(PrepError::Render {
                path: out_path.to_path_buf(),
                message: "grid needs at least one column and a non-zero tile size".to_string(),
            });
        }

        let columns = self.columns.min(items.len() as u32);
        let rows = (items.len() as u32).div_ceil(self.columns);
        let mut canvas =
            RgbImage::from_pixel(columns * self.tile_size, rows * self.tile_size, Rgb([255; 3]));

        for (index, item) in items.iter().enumerate() {
            let tile = self.render_tile(item, out_path)?;
            let col = index as u32 % self.columns;
            let row = index as u32 / self.columns;
            let x = col * self.tile_size + (self.tile_size - tile.width()) / 2;
            let y = row * self.tile_size + (self.tile_size - tile.height()) / 2;
            imageops::replace(&mut canvas, &tile, i64::from(x), i64::from(y));
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        canvas.save(out_path).map_err(|err| PrepError::Render {
            path: out_path.to_path_buf(),
            message: err.to_string(),
        })
    }
}

impl GridRenderer {
    fn render_tile(&self, item: &PreviewItem, out_path: &Path) -> Result<RgbImage, PrepError> {
        let render_err = |path: &Path, err: image::ImageError| PrepError::Render {
            path: out_path.to_path_buf(),
            message: format!("{}: {err}", path.display()),
        };

        let source = open_image(&item.image).map_err(|err| render_err(&item.image, err))?;
        let (w, h) = fit_within(source.width(), source.height(), self.tile_size);
        let mut tile = imageops::resize(&source.to_rgb8(), w, h, FilterType::Triangle);

        if let Some(mask_path) = &item.mask {
            // Same class values the exporter sees.
            let labels = read_label_mask(mask_path).map_err(|err| PrepError::Render {
                path: out_path.to_path_buf(),
                message: err.to_string(),
            })?;
            blend_mask(&mut tile, &labels, self.alpha);
        }

        Ok(tile)
    }
}

/// Largest size with the same aspect ratio that fits a `max x max` square.
fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (1, 1);
    }
    let scale = f64::from(max) / f64::from(width.max(height));
    let w = (f64::from(width) * scale).round().max(1.0) as u32;
    let h = (f64::from(height) * scale).round().max(1.0) as u32;
    (w.min(max), h.min(max))
}

/// Tints every tile pixel whose nearest mask pixel holds a non-zero class.
fn blend_mask(tile: &mut RgbImage, labels: &LabelMask, alpha: f32) {
    if labels.width() == 0 || labels.height() == 0 {
        return;
    }
    let alpha = alpha.clamp(0.0, 1.0);
    let (tile_w, tile_h) = (u64::from(tile.width()), u64::from(tile.height()));

    for (x, y, pixel) in tile.enumerate_pixels_mut() {
        // Nearest-neighbour sampling keeps class values intact.
        let mx = (u64::from(x) * u64::from(labels.width()) / tile_w) as u32;
        let my = (u64::from(y) * u64::from(labels.height()) / tile_h) as u32;
        let value = labels.value(mx, my);
        if value == 0 {
            continue;
        }
        let color = PALETTE[(usize::from(value) - 1) % PALETTE.len()];
        for (channel, overlay) in pixel.0.iter_mut().zip(color) {
            let blended = f32::from(*channel) * (1.0 - alpha) + f32::from(overlay) * alpha;
            *channel = blended.round() as u8;
        }
    }
}

/// Lists up to `max_count` images of a materialized split with their masks.
pub fn collect_preview_items(
    layout: &SplitLayout,
    split: SplitName,
    max_count: usize,
) -> Result<Vec<PreviewItem>, PrepError> {
    let images_dir = layout.images_dir(split);
    if !images_dir.is_dir() {
        return Ok(Vec::new());
    }

    let masks_dir = layout.masks_dir(split);
    Ok(list_images(&images_dir)?
        .into_iter()
        .take(max_count)
        .map(|image| {
            let mask = normalized_mask_name(&image)
                .map(|name| masks_dir.join(name))
                .filter(|path| path.is_file());
            PreviewItem { image, mask }
        })
        .collect())
}

/// Renders `preview_{split}.png`, returning its path on success.
///
/// Never fails: an unavailable renderer or a rendering error is logged as a
/// warning and yields `None`.
pub fn render_split_preview(
    renderer: &dyn PreviewRenderer,
    layout: &SplitLayout,
    split: SplitName,
    max_count: usize,
) -> Option<PathBuf> {
    if max_count == 0 {
        return None;
    }
    if !renderer.is_available() {
        tracing::warn!(split = split.as_str(), "preview renderer unavailable; skipping");
        return None;
    }

    let out_path = layout.preview_path(split);
    let result = collect_preview_items(layout, split, max_count).and_then(|items| {
        if items.is_empty() {
            return Ok(None);
        }
        renderer.render(&items, &out_path).map(|()| Some(out_path.clone()))
    });

    match result {
        Ok(Some(path)) => {
            tracing::info!(path = %path.display(), "preview saved");
            Some(path)
        }
        Ok(None) => None,
        Err(err) => {
            tracing::warn!(split = split.as_str(), error = %err, "preview skipped");
            None
        }
    }
}
