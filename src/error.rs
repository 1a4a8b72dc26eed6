use std::path::PathBuf;
use thiserror::Error;

/// The main error type for segprep operations.
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed while traversing {path}: {message}")]
    DirectoryWalk { path: PathBuf, message: String },

    #[error("Mask missing for {image} (searched in {masks_dir})")]
    MissingMask { image: PathBuf, masks_dir: PathBuf },

    #[error("Mask codec '{codec}' is unavailable; COCO export cannot run")]
    CodecUnavailable { codec: String },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageDimensionRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Unsupported image dimensions in {path}: {message}")]
    ImageDimensions { path: PathBuf, message: String },

    #[error("Failed to read mask {path}: {source}")]
    MaskRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid mask shape: {message}")]
    MaskShape { message: String },

    #[error("Invalid RLE: {message}")]
    RleDecode { message: String },

    #[error("Failed to copy {from} -> {to} for split '{split}': {source}")]
    CopyFailed {
        split: String,
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Split '{split}' contains more than one image named '{file_name}'")]
    DuplicateFileName { split: String, file_name: String },

    #[error("COCO export requires a mask for {image}")]
    MaskRequired { image: PathBuf },

    #[error("Failed to write COCO JSON to {path}: {source}")]
    CocoJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse COCO JSON from {path}: {source}")]
    CocoJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize run report: {source}")]
    ReportSerialize {
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid split ratios: {message}")]
    InvalidSplitRatios { message: String },

    #[error("Invalid options: {message}")]
    InvalidOptions { message: String },

    #[error("Failed to render preview {path}: {message}")]
    Render { path: PathBuf, message: String },
}
