//! `instances.json` document types, reader and atomic writer.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{AnnotationId, CategoryId, ImageId};
use crate::error::PrepError;
use crate::mask::CompressedRle;

/// Top-level COCO instances document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoDocument {
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
    pub categories: Vec<CocoCategory>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoImage {
    pub id: ImageId,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoCategory {
    pub id: CategoryId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotation {
    pub id: AnnotationId,
    pub image_id: ImageId,
    pub category_id: CategoryId,
    pub segmentation: CompressedRle,
    pub area: f64,
    /// `[x, y, width, height]`, top-left origin.
    pub bbox: [f64; 4],
    pub iscrowd: u8,
}

/// Writes `doc` to `path`, creating parent directories.
///
/// The document is serialized into a temporary file next to `path` and
/// renamed into place only once fully written, so a failed write never
/// leaves a truncated `instances.json` behind.
pub fn write_coco_json(path: &Path, doc: &CocoDocument) -> Result<(), PrepError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(PrepError::Io)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(PrepError::Io)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        serde_json::to_writer(&mut writer, doc).map_err(|source| PrepError::CocoJsonWrite {
            path: path.to_path_buf(),
            source,
        })?;
        writer.flush().map_err(PrepError::Io)?;
    }
    temp.as_file().sync_all().map_err(PrepError::Io)?;
    temp.persist(path).map_err(|err| PrepError::Io(err.error))?;

    Ok(())
}

/// Reads an `instances.json` document.
pub fn read_coco_json(path: &Path) -> Result<CocoDocument, PrepError> {
    let file = File::open(path).map_err(PrepError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| PrepError::CocoJsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses a document from bytes, e.g. fuzz input.
pub fn from_coco_slice(bytes: &[u8]) -> Result<CocoDocument, serde_json::Error> {
    serde_json::from_slice(bytes)
}
