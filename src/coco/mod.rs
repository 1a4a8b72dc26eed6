//! COCO instance-segmentation export.
//!
//! Builds one `instances.json` per split from its materialized pairs:
//! an image record per pair, one category per supplied name and one
//! annotation per category that is actually present in an image's mask.
//!
//! # Category modes
//!
//! With a single category name every non-zero mask pixel is foreground. With
//! several names, category `c` (1-based, in the order the names were given)
//! selects the pixels whose value equals `c`.
//!
//! # Deterministic ids
//!
//! Per-image work runs in parallel, but results are collected in traversal
//! order and ids are derived from position afterwards: image `i` gets id
//! `i + 1`, annotation ids continue from the previous image's count. The
//! output is identical to a sequential run.

mod ids;
mod schema;

pub use ids::{AnnotationId, CategoryId, ImageId};
pub use schema::{
    from_coco_slice, read_coco_json, write_coco_json, CocoAnnotation, CocoCategory,
    CocoDocument, CocoImage,
};

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use crate::error::PrepError;
use crate::mask::{read_label_mask, EncodedMask, LabelSelector, MaskCodec};
use crate::pairing::ImageMaskPair;

/// A category with its 1-based id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Assigns ids 1..=N to `names` in the given order.
pub fn build_categories(names: &[String]) -> Result<Vec<Category>, PrepError> {
    if names.is_empty() {
        return Err(PrepError::InvalidOptions {
            message: "at least one category name is required".to_string(),
        });
    }

    Ok(names
        .iter()
        .enumerate()
        .map(|(index, name)| Category {
            id: CategoryId::from_index(index),
            name: name.clone(),
        })
        .collect())
}

/// How mask values map to categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CategoryMode {
    /// One category; any non-zero pixel belongs to it.
    Single,
    /// Several categories; pixel value `c` belongs to category id `c`.
    Multi,
}

impl CategoryMode {
    pub fn for_categories(categories: &[Category]) -> Self {
        if categories.len() == 1 {
            CategoryMode::Single
        } else {
            CategoryMode::Multi
        }
    }

    fn selector(self, category: &Category) -> Result<LabelSelector, PrepError> {
        match self {
            CategoryMode::Single => Ok(LabelSelector::AnyForeground),
            CategoryMode::Multi => u16::try_from(category.id.as_u64())
                .map(LabelSelector::Equals)
                .map_err(|_| PrepError::InvalidOptions {
                    message: format!(
                        "category id {} exceeds the largest mask value",
                        category.id
                    ),
                }),
        }
    }
}

/// Counts written by one export.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub images: usize,
    pub annotations: usize,
}

/// Per-image result before ids are assigned.
struct ImageEntry {
    file_name: String,
    width: u32,
    height: u32,
    masks: Vec<(CategoryId, EncodedMask)>,
}

/// Builds the COCO document for `pairs`.
///
/// Every pair must carry a mask. Categories whose mask is empty for an
/// image produce no annotation; the image record is still emitted.
pub fn build_coco_document(
    pairs: &[ImageMaskPair],
    categories: &[Category],
    codec: &dyn MaskCodec,
) -> Result<CocoDocument, PrepError> {
    codec.ensure_available()?;

    let mode = CategoryMode::for_categories(categories);
    let selectors = categories
        .iter()
        .map(|category| Ok((category.id, mode.selector(category)?)))
        .collect::<Result<Vec<_>, PrepError>>()?;

    let entries = pairs
        .par_iter()
        .map(|pair| encode_image(pair, &selectors, codec))
        .collect::<Result<Vec<_>, PrepError>>()?;

    let mut doc = CocoDocument {
        images: Vec::with_capacity(entries.len()),
        annotations: Vec::new(),
        categories: categories
            .iter()
            .map(|category| CocoCategory {
                id: category.id,
                name: category.name.clone(),
            })
            .collect(),
    };

    for (index, entry) in entries.into_iter().enumerate() {
        let image_id = ImageId::from_index(index);
        doc.images.push(CocoImage {
            id: image_id,
            file_name: entry.file_name,
            width: entry.width,
            height: entry.height,
        });

        for (category_id, encoded) in entry.masks {
            let Some(bbox) = encoded.bbox else {
                continue;
            };
            doc.annotations.push(CocoAnnotation {
                id: AnnotationId::from_index(doc.annotations.len()),
                image_id,
                category_id,
                segmentation: encoded.segmentation,
                area: encoded.area,
                bbox: bbox.to_xywh(),
                iscrowd: 0,
            });
        }
    }

    Ok(doc)
}

fn encode_image(
    pair: &ImageMaskPair,
    selectors: &[(CategoryId, LabelSelector)],
    codec: &dyn MaskCodec,
) -> Result<ImageEntry, PrepError> {
    let image_path = pair.image_path();
    let mask_path = pair.mask_path().ok_or_else(|| PrepError::MaskRequired {
        image: image_path.to_path_buf(),
    })?;

    let (width, height) = read_image_dimensions(image_path)?;
    let labels = read_label_mask(mask_path)?;
    if (labels.width(), labels.height()) != (width, height) {
        tracing::warn!(
            image = %image_path.display(),
            mask = %mask_path.display(),
            "mask is {}x{} but image is {}x{}; encoding at mask size",
            labels.width(),
            labels.height(),
            width,
            height
        );
    }

    let mut masks = Vec::new();
    for &(category_id, selector) in selectors {
        let binary = labels.binary_where(selector);
        if binary.area() == 0 {
            continue;
        }
        masks.push((category_id, codec.encode(&binary)?));
    }

    let file_name = image_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(ImageEntry {
        file_name,
        width,
        height,
        masks,
    })
}

/// Reads pixel dimensions from the image header.
pub fn read_image_dimensions(path: &Path) -> Result<(u32, u32), PrepError> {
    let size = imagesize::size(path).map_err(|source| PrepError::ImageDimensionRead {
        path: path.to_path_buf(),
        source,
    })?;

    Ok((
        dimension_to_u32(path, "width", size.width)?,
        dimension_to_u32(path, "height", size.height)?,
    ))
}

fn dimension_to_u32(path: &Path, axis: &str, value: usize) -> Result<u32, PrepError> {
    u32::try_from(value).map_err(|_| PrepError::ImageDimensions {
        path: path.to_path_buf(),
        message: format!("{axis} {value} does not fit in u32"),
    })
}

/// Builds and writes the COCO document for one split.
pub fn export_coco(
    pairs: &[ImageMaskPair],
    category_names: &[String],
    out_path: &Path,
    codec: &dyn MaskCodec,
) -> Result<ExportSummary, PrepError> {
    let categories = build_categories(category_names)?;
    let doc = build_coco_document(pairs, &categories, codec)?;
    write_coco_json(out_path, &doc)?;

    tracing::info!(
        path = %out_path.display(),
        images = doc.images.len(),
        annotations = doc.annotations.len(),
        "saved COCO annotations"
    );

    Ok(ExportSummary {
        path: out_path.to_path_buf(),
        images: doc.images.len(),
        annotations: doc.annotations.len(),
    })
}
