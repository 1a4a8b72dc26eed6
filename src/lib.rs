//! segprep: reproducible splits and COCO RLE export for segmentation datasets.
//!
//! Given a directory of images and, optionally, a directory of per-image
//! label masks, segprep pairs them, shuffles the pairs with a fixed seed into
//! train/val/test, copies each split into `splits/{split}/`, and can write a
//! COCO `instances.json` with compressed RLE segmentations per split.
//!
//! # Modules
//!
//! - [`mask`]: binary masks, COCO RLE codec, label-mask reading
//! - [`pairing`]: image discovery and mask lookup
//! - [`split`]: seeded train/val/test partitioning
//! - [`materialize`]: output layout and file copying
//! - [`coco`]: COCO document building and I/O
//! - [`preview`]: optional overlay grids
//! - [`pipeline`]: the end-to-end run
//! - [`error`]: error types

pub mod coco;
pub mod error;
pub mod mask;
pub mod materialize;
pub mod pairing;
pub mod pipeline;
pub mod preview;
pub mod split;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

pub use error::PrepError;

use mask::CocoRleCodec;
use pairing::{MaskLookup, MaskNamingRule};
use pipeline::{prepare_dataset, PrepareOptions, PrepareReport};
use preview::GridRenderer;
use split::{SplitRatios, DEFAULT_SEED};

/// The segprep CLI application.
#[derive(Parser)]
#[command(name = "segprep")]
#[command(version, about)]
struct Cli {
    /// Dataset root containing the images (and masks) subdirectories.
    #[arg(long, env = "SEGPREP_DATASET_ROOT")]
    dataset_root: PathBuf,

    /// Images subdirectory under the dataset root.
    #[arg(long, default_value = "images")]
    images_subdir: String,

    /// Masks subdirectory under the dataset root; omit to split images only.
    #[arg(long)]
    masks_subdir: Option<String>,

    /// Train, val and test ratios.
    #[arg(
        long,
        num_args = 3,
        value_names = ["TRAIN", "VAL", "TEST"],
        default_values_t = [0.7, 0.2, 0.1]
    )]
    split: Vec<f64>,

    /// Seed for the split shuffle.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Write COCO instances.json per split (requires --masks-subdir).
    #[arg(long)]
    to_coco: bool,

    /// Ordered category names; ids are assigned 1..N in this order.
    #[arg(long, num_args = 1.., default_values_t = [String::from("tooth")])]
    category_names: Vec<String>,

    /// Number of items per split preview (0 disables previews).
    #[arg(long, default_value_t = 0)]
    viz: usize,

    /// Mask naming rules, tried in order.
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [MaskNamingRule::StemPng, MaskNamingRule::ExactName]
    )]
    mask_lookup: Vec<MaskNamingRule>,

    /// Output format for the run report.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    output: ReportFormat,
}

/// Run report formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

impl Cli {
    fn to_options(&self) -> Result<PrepareOptions, PrepError> {
        let [train, val, test] = self.split[..] else {
            return Err(PrepError::InvalidSplitRatios {
                message: format!("expected 3 ratios, got {}", self.split.len()),
            });
        };

        Ok(PrepareOptions {
            dataset_root: self.dataset_root.clone(),
            images_subdir: self.images_subdir.clone(),
            masks_subdir: self.masks_subdir.clone(),
            ratios: SplitRatios::new(train, val, test),
            seed: self.seed,
            to_coco: self.to_coco,
            category_names: self.category_names.clone(),
            viz: self.viz,
            mask_lookup: MaskLookup::new(self.mask_lookup.clone())?,
        })
    }
}

/// Run the segprep CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), PrepError> {
    let cli = Cli::parse();
    let opts = cli.to_options()?;

    let report = prepare_dataset(&opts, &CocoRleCodec, &GridRenderer::default())?;
    print!("{}", render_report(&report, cli.output)?);

    Ok(())
}

fn render_report(report: &PrepareReport, format: ReportFormat) -> Result<String, PrepError> {
    match format {
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(report)
                .map_err(|source| PrepError::ReportSerialize { source })?;
            Ok(format!("{json}\n"))
        }
        ReportFormat::Text => Ok(report.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SplitSummary;
    use crate::split::SplitName;

    fn sample_report() -> PrepareReport {
        let mut report = PrepareReport::new(PathBuf::from("data/splits"), 5);
        report.splits.push(SplitSummary::new(SplitName::Train, &[]));
        report
    }

    #[test]
    fn json_report_ends_with_newline_and_parses() {
        let rendered = render_report(&sample_report(), ReportFormat::Json).expect("render");
        assert!(rendered.ends_with("}\n"));

        let value: serde_json::Value = serde_json::from_str(&rendered).expect("valid json");
        assert_eq!(value["seed"], 5);
        assert_eq!(value["splits"][0]["split"], "train");
    }

    #[test]
    fn text_report_matches_display() {
        let report = sample_report();
        let rendered = render_report(&report, ReportFormat::Text).expect("render");
        assert_eq!(rendered, report.to_string());
    }

    #[test]
    fn report_serialize_error_names_the_report() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = PrepError::ReportSerialize { source };
        assert!(err.to_string().starts_with("Failed to serialize run report"));
    }
}
