//! Run report printed after a preparation run.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::pairing::ImageMaskPair;
use crate::split::SplitName;

/// Outcome of a whole run.
#[derive(Clone, Debug, Serialize)]
pub struct PrepareReport {
    pub splits_root: PathBuf,
    pub seed: u64,
    pub splits: Vec<SplitSummary>,
}

impl PrepareReport {
    pub fn new(splits_root: PathBuf, seed: u64) -> Self {
        Self {
            splits_root,
            seed,
            splits: Vec::new(),
        }
    }

    pub fn total_images(&self) -> usize {
        self.splits.iter().map(|s| s.images).sum()
    }

    pub fn split(&self, name: SplitName) -> Option<&SplitSummary> {
        self.splits.iter().find(|s| s.split == name)
    }
}

/// Outcome of one split.
#[derive(Clone, Debug, Serialize)]
pub struct SplitSummary {
    pub split: SplitName,
    pub images: usize,
    pub masks: usize,
    /// Set only when COCO export ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_path: Option<PathBuf>,
    /// File names of the split's images, in traversal order.
    pub files: Vec<String>,
}

impl SplitSummary {
    pub fn new(split: SplitName, pairs: &[ImageMaskPair]) -> Self {
        Self {
            split,
            images: pairs.len(),
            masks: pairs.iter().filter(|p| p.mask_path().is_some()).count(),
            annotations: None,
            annotations_path: None,
            preview_path: None,
            files: pairs
                .iter()
                .filter_map(|p| p.image_path().file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

impl fmt::Display for PrepareReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Prepared {} image(s) into {} (seed {}):",
            self.total_images(),
            self.splits_root.display(),
            self.seed
        )?;

        for summary in &self.splits {
            write!(
                f,
                "  {:<5} {} image(s), {} mask(s)",
                summary.split.as_str(),
                summary.images,
                summary.masks
            )?;
            if let Some(annotations) = summary.annotations {
                write!(f, ", {annotations} annotation(s)")?;
            }
            writeln!(f)?;

            if let Some(path) = &summary.annotations_path {
                writeln!(f, "        annotations: {}", path.display())?;
            }
            if let Some(path) = &summary.preview_path {
                writeln!(f, "        preview: {}", path.display())?;
            }
        }

        Ok(())
    }
}
