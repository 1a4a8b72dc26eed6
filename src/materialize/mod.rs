//! Copying split members into the `splits/` output tree.
//!
//! Layout under the splits root:
//!
//! ```text
//! {split}/images/<image file name>
//! {split}/masks/<image stem>.png
//! {split}/annotations/instances.json
//! preview_{split}.png
//! ```

use std::collections::HashSet;
use std::fs::{self, File, FileTimes};
use std::path::{Path, PathBuf};

use crate::error::PrepError;
use crate::pairing::ImageMaskPair;
use crate::split::SplitName;

/// Name of the output directory created under the dataset root.
pub const SPLITS_DIR_NAME: &str = "splits";

/// Resolves every output path of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitLayout {
    root: PathBuf,
}

impl SplitLayout {
    /// Layout rooted at `root` (the `splits/` directory itself).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout at `<dataset_root>/splits`.
    pub fn under_dataset_root(dataset_root: &Path) -> Self {
        Self::new(dataset_root.join(SPLITS_DIR_NAME))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn split_dir(&self, split: SplitName) -> PathBuf {
        self.root.join(split.as_str())
    }

    pub fn images_dir(&self, split: SplitName) -> PathBuf {
        self.split_dir(split).join("images")
    }

    pub fn masks_dir(&self, split: SplitName) -> PathBuf {
        self.split_dir(split).join("masks")
    }

    pub fn annotations_path(&self, split: SplitName) -> PathBuf {
        self.split_dir(split)
            .join("annotations")
            .join("instances.json")
    }

    pub fn preview_path(&self, split: SplitName) -> PathBuf {
        self.root.join(format!("preview_{}.png", split.as_str()))
    }
}

/// Mask file name written for an image: `{stem}.png`.
pub fn normalized_mask_name(image: &Path) -> Option<PathBuf> {
    let mut name = image.file_stem()?.to_os_string();
    name.push(".png");
    Some(PathBuf::from(name))
}

/// Copies every pair of `split` into its `images/` and `masks/` directories.
///
/// Returns the pairs as they exist inside the split, in input order. The
/// first failing copy aborts the split; files already copied for earlier
/// pairs stay on disk.
pub fn materialize_split(
    layout: &SplitLayout,
    split: SplitName,
    pairs: &[ImageMaskPair],
) -> Result<Vec<ImageMaskPair>, PrepError> {
    let targets = plan_targets(layout, split, pairs)?;

    let images_dir = layout.images_dir(split);
    let masks_dir = layout.masks_dir(split);
    fs::create_dir_all(&images_dir)?;
    fs::create_dir_all(&masks_dir)?;

    let mut materialized = Vec::with_capacity(pairs.len());
    for (pair, (image_dst, mask_dst)) in pairs.iter().zip(targets) {
        copy_pair(split, pair, &image_dst, mask_dst.as_deref())?;
        materialized.push(ImageMaskPair::new(image_dst, mask_dst));
    }

    tracing::debug!(
        split = split.as_str(),
        count = materialized.len(),
        "copied split files"
    );
    Ok(materialized)
}

type Targets = Vec<(PathBuf, Option<PathBuf>)>;

/// Computes destination paths and rejects name clashes before any copy.
fn plan_targets(
    layout: &SplitLayout,
    split: SplitName,
    pairs: &[ImageMaskPair],
) -> Result<Targets, PrepError> {
    let images_dir = layout.images_dir(split);
    let masks_dir = layout.masks_dir(split);
    let mut seen_images: HashSet<PathBuf> = HashSet::with_capacity(pairs.len());
    let mut seen_masks: HashSet<PathBuf> = HashSet::with_capacity(pairs.len());
    let mut targets = Vec::with_capacity(pairs.len());

    for pair in pairs {
        let image = pair.image_path();
        let (Some(file_name), Some(mask_name)) = (image.file_name(), normalized_mask_name(image))
        else {
            return Err(PrepError::InvalidOptions {
                message: format!("image path {} has no file name", image.display()),
            });
        };

        let image_dst = images_dir.join(file_name);
        let mask_dst = pair.mask_path().map(|_| masks_dir.join(&mask_name));

        // `a.jpg` and `a.png` would both write `masks/a.png`.
        let clash = !seen_images.insert(image_dst.clone())
            || mask_dst
                .as_ref()
                .is_some_and(|mask| !seen_masks.insert(mask.clone()));
        if clash {
            return Err(PrepError::DuplicateFileName {
                split: split.as_str().to_string(),
                file_name: file_name.to_string_lossy().into_owned(),
            });
        }

        targets.push((image_dst, mask_dst));
    }

    Ok(targets)
}

fn copy_pair(
    split: SplitName,
    pair: &ImageMaskPair,
    image_dst: &Path,
    mask_dst: Option<&Path>,
) -> Result<(), PrepError> {
    copy_preserving_times(split, pair.image_path(), image_dst)?;

    if let (Some(mask_src), Some(mask_dst)) = (pair.mask_path(), mask_dst) {
        if let Err(err) = copy_preserving_times(split, mask_src, mask_dst) {
            // Keep the pair all-or-nothing.
            if let Err(cleanup) = fs::remove_file(image_dst) {
                tracing::warn!(
                    path = %image_dst.display(),
                    error = %cleanup,
                    "failed to remove partially copied image"
                );
            }
            return Err(err);
        }
    }

    Ok(())
}

/// Copies file contents and carries over access/modification times where
/// the platform reports them.
fn copy_preserving_times(split: SplitName, from: &Path, to: &Path) -> Result<(), PrepError> {
    let wrap = |source: std::io::Error| PrepError::CopyFailed {
        split: split.as_str().to_string(),
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    fs::copy(from, to).map_err(wrap)?;

    let metadata = fs::metadata(from).map_err(wrap)?;
    let mut times = FileTimes::new();
    let mut any = false;
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
        any = true;
    }
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
        any = true;
    }
    if any {
        File::options()
            .write(true)
            .open(to)
            .and_then(|file| file.set_times(times))
            .map_err(wrap)?;
    }

    Ok(())
}
