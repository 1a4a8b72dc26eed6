//! End-to-end dataset preparation.
//!
//! Stages run strictly in order: validate options and capabilities, pair
//! images with masks, split, then for each split materialize files, export
//! COCO annotations and render a preview. Everything that can be checked
//! without touching the output tree is checked before `splits/` is created.

mod report;

pub use report::{PrepareReport, SplitSummary};

use std::path::PathBuf;

use crate::coco::{build_categories, export_coco};
use crate::error::PrepError;
use crate::mask::MaskCodec;
use crate::materialize::{materialize_split, SplitLayout};
use crate::pairing::{pair_images, MaskLookup};
use crate::preview::{render_split_preview, PreviewRenderer};
use crate::split::{split_items, SplitRatios, DEFAULT_SEED};

/// Everything a preparation run needs; paths are explicit.
#[derive(Clone, Debug)]
pub struct PrepareOptions {
    pub dataset_root: PathBuf,
    pub images_subdir: String,
    pub masks_subdir: Option<String>,
    pub ratios: SplitRatios,
    pub seed: u64,
    pub to_coco: bool,
    pub category_names: Vec<String>,
    /// Items per split preview; 0 disables previews.
    pub viz: usize,
    pub mask_lookup: MaskLookup,
}

impl PrepareOptions {
    pub fn new(dataset_root: impl Into<PathBuf>) -> Self {
        Self {
            dataset_root: dataset_root.into(),
            images_subdir: "images".to_string(),
            masks_subdir: None,
            ratios: SplitRatios::default(),
            seed: DEFAULT_SEED,
            to_coco: false,
            category_names: vec!["tooth".to_string()],
            viz: 0,
            mask_lookup: MaskLookup::default(),
        }
    }

    pub fn images_dir(&self) -> PathBuf {
        self.dataset_root.join(&self.images_subdir)
    }

    pub fn masks_dir(&self) -> Option<PathBuf> {
        self.masks_subdir
            .as_ref()
            .map(|subdir| self.dataset_root.join(subdir))
    }
}

/// Validate options before any work starts.
pub fn validate_prepare_options(opts: &PrepareOptions) -> Result<(), PrepError> {
    opts.ratios.validate()?;

    if opts.to_coco {
        if opts.masks_subdir.is_none() {
            return Err(PrepError::InvalidOptions {
                message: "--to-coco requires --masks-subdir".to_string(),
            });
        }
        build_categories(&opts.category_names)?;
    }

    if opts
        .category_names
        .iter()
        .any(|name| name.trim().is_empty())
    {
        return Err(PrepError::InvalidOptions {
            message: "category names must not be empty".to_string(),
        });
    }

    Ok(())
}

/// Runs the whole preparation pipeline.
pub fn prepare_dataset(
    opts: &PrepareOptions,
    codec: &dyn MaskCodec,
    renderer: &dyn PreviewRenderer,
) -> Result<PrepareReport, PrepError> {
    validate_prepare_options(opts)?;
    if opts.to_coco {
        codec.ensure_available()?;
    }

    let images_dir = opts.images_dir();
    let masks_dir = opts.masks_dir();
    let pairs = pair_images(&images_dir, masks_dir.as_deref(), &opts.mask_lookup)?;
    tracing::info!(
        images = pairs.len(),
        with_masks = masks_dir.is_some(),
        dir = %images_dir.display(),
        "paired images"
    );
    if pairs.is_empty() {
        tracing::warn!(dir = %images_dir.display(), "no images found");
    }

    let plan = split_items(pairs, &opts.ratios, opts.seed)?;
    tracing::info!(
        train = plan.train.len(),
        val = plan.val.len(),
        test = plan.test.len(),
        seed = opts.seed,
        "split dataset"
    );

    let layout = SplitLayout::under_dataset_root(&opts.dataset_root);
    let mut report = PrepareReport::new(layout.root().to_path_buf(), opts.seed);

    for (split, items) in plan.iter() {
        let materialized = materialize_split(&layout, split, items).map_err(|err| {
            tracing::error!(split = split.as_str(), stage = "materialize", error = %err);
            err
        })?;

        let mut summary = SplitSummary::new(split, &materialized);

        if opts.to_coco {
            let out_path = layout.annotations_path(split);
            let exported = export_coco(&materialized, &opts.category_names, &out_path, codec)
                .map_err(|err| {
                    tracing::error!(split = split.as_str(), stage = "export", error = %err);
                    err
                })?;
            summary.annotations = Some(exported.annotations);
            summary.annotations_path = Some(exported.path);
        }

        summary.preview_path = render_split_preview(renderer, &layout, split, opts.viz);
        report.splits.push(summary);
    }

    Ok(report)
}
