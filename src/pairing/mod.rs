//! Image discovery and image/mask pairing.
//!
//! Discovery order is the traversal order for the whole pipeline: images are
//! sorted by full path, so splitting and id assignment only depend on the
//! directory contents, not on how the filesystem lists them.

use std::fmt;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::PrepError;

/// Raster extensions accepted as images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "tif", "tiff"];

/// An image file and, when masks are in use, its segmentation mask.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageMaskPair {
    image_path: PathBuf,
    mask_path: Option<PathBuf>,
}

impl ImageMaskPair {
    pub fn new(image_path: impl Into<PathBuf>, mask_path: Option<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            mask_path,
        }
    }

    #[inline]
    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    #[inline]
    pub fn mask_path(&self) -> Option<&Path> {
        self.mask_path.as_deref()
    }
}

/// One way of deriving a mask file name from an image path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum MaskNamingRule {
    /// `{image stem}.png`
    StemPng,
    /// The image's own file name.
    ExactName,
}

impl MaskNamingRule {
    pub fn as_str(self) -> &'static str {
        match self {
            MaskNamingRule::StemPng => "stem-png",
            MaskNamingRule::ExactName => "exact-name",
        }
    }

    fn candidate(self, masks_dir: &Path, image: &Path) -> Option<PathBuf> {
        match self {
            MaskNamingRule::StemPng => {
                let stem = image.file_stem()?;
                let mut name = stem.to_os_string();
                name.push(".png");
                Some(masks_dir.join(name))
            }
            MaskNamingRule::ExactName => Some(masks_dir.join(image.file_name()?)),
        }
    }
}

impl fmt::Display for MaskNamingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered mask naming rules; the first candidate that exists wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaskLookup {
    rules: Vec<MaskNamingRule>,
}

impl MaskLookup {
    pub fn new(rules: Vec<MaskNamingRule>) -> Result<Self, PrepError> {
        if rules.is_empty() {
            return Err(PrepError::InvalidOptions {
                message: "mask lookup needs at least one naming rule".to_string(),
            });
        }
        Ok(Self { rules })
    }

    /// Returns the first existing mask for `image` in `masks_dir`.
    pub fn find(&self, masks_dir: &Path, image: &Path) -> Option<PathBuf> {
        self.rules
            .iter()
            .filter_map(|rule| rule.candidate(masks_dir, image))
            .find(|candidate| candidate.is_file())
    }
}

impl Default for MaskLookup {
    fn default() -> Self {
        Self {
            rules: vec![MaskNamingRule::StemPng, MaskNamingRule::ExactName],
        }
    }
}

/// Recursively lists image files under `dir`, sorted by full path.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, PrepError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|source| PrepError::DirectoryWalk {
            path: dir.to_path_buf(),
            message: source.to_string(),
        })?;

        if entry.file_type().is_file() && is_image_file(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

fn is_image_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    IMAGE_EXTENSIONS
        .iter()
        .any(|allowed| ext.eq_ignore_ascii_case(allowed))
}

/// Discovers images and resolves their masks.
///
/// Without `masks_dir` every pair has no mask. With one, the first image
/// without a mask aborts the whole call with [`PrepError::MissingMask`]; no
/// pairs are returned in that case.
pub fn pair_images(
    images_dir: &Path,
    masks_dir: Option<&Path>,
    lookup: &MaskLookup,
) -> Result<Vec<ImageMaskPair>, PrepError> {
    let images = list_images(images_dir)?;

    let Some(masks_dir) = masks_dir else {
        return Ok(images
            .into_iter()
            .map(|image| ImageMaskPair::new(image, None))
            .collect());
    };

    if !masks_dir.is_dir() {
        return Err(PrepError::InvalidOptions {
            message: format!("masks directory {} does not exist", masks_dir.display()),
        });
    }

    images
        .into_iter()
        .map(|image| match lookup.find(masks_dir, &image) {
            Some(mask) => Ok(ImageMaskPair::new(image, Some(mask))),
            None => Err(PrepError::MissingMask {
                image,
                masks_dir: masks_dir.to_path_buf(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(path, b"x").expect("write file");
    }

    #[test]
    fn list_images_filters_and_sorts() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let root = temp.path();
        touch(&root.join("b.JPG"));
        touch(&root.join("a.png"));
        touch(&root.join("nested/c.tiff"));
        touch(&root.join("notes.txt"));
        touch(&root.join("noext"));

        let images = list_images(root).expect("list images");
        let names: Vec<_> = images
            .iter()
            .map(|p| p.strip_prefix(root).expect("under root").to_path_buf())
            .collect();

        assert_eq!(
            names,
            vec![
                PathBuf::from("a.png"),
                PathBuf::from("b.JPG"),
                PathBuf::from("nested/c.tiff"),
            ]
        );
    }

    #[test]
    fn list_images_missing_dir_fails() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let err = list_images(&temp.path().join("absent")).unwrap_err();
        assert!(matches!(err, PrepError::DirectoryWalk { .. }));
    }

    #[test]
    fn stem_png_preferred_over_exact_name() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let masks = temp.path().join("masks");
        touch(&masks.join("a.png"));
        touch(&masks.join("a.jpg"));

        let found = MaskLookup::default().find(&masks, Path::new("images/a.jpg"));
        assert_eq!(found, Some(masks.join("a.png")));
    }

    #[test]
    fn exact_name_used_as_fallback() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let masks = temp.path().join("masks");
        touch(&masks.join("a.jpg"));

        let found = MaskLookup::default().find(&masks, Path::new("images/a.jpg"));
        assert_eq!(found, Some(masks.join("a.jpg")));
    }

    #[test]
    fn custom_rule_order_is_respected() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let masks = temp.path().join("masks");
        touch(&masks.join("a.png"));
        touch(&masks.join("a.jpg"));

        let rules = vec![MaskNamingRule::ExactName, MaskNamingRule::StemPng];
        let lookup = MaskLookup::new(rules).expect("rules");
        assert_eq!(
            lookup.find(&masks, Path::new("a.jpg")),
            Some(masks.join("a.jpg"))
        );
    }

    #[test]
    fn empty_rule_list_is_rejected() {
        assert!(MaskLookup::new(Vec::new()).is_err());
    }

    #[test]
    fn pair_images_without_masks() {
        let temp = tempfile::tempdir().expect("create temp dir");
        touch(&temp.path().join("images/a.jpg"));

        let pairs =
            pair_images(&temp.path().join("images"), None, &MaskLookup::default()).expect("pair");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].mask_path(), None);
    }

    #[test]
    fn pair_images_fails_on_missing_mask() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let root = temp.path();
        touch(&root.join("images/a.jpg"));
        touch(&root.join("images/b.jpg"));
        touch(&root.join("masks/a.png"));

        let err = pair_images(
            &root.join("images"),
            Some(&root.join("masks")),
            &MaskLookup::default(),
        )
        .unwrap_err();

        match err {
            PrepError::MissingMask { image, .. } => {
                assert_eq!(image, root.join("images/b.jpg"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn pair_images_rejects_missing_masks_dir() {
        let temp = tempfile::tempdir().expect("create temp dir");
        touch(&temp.path().join("images/a.jpg"));

        let err = pair_images(
            &temp.path().join("images"),
            Some(&temp.path().join("masks")),
            &MaskLookup::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PrepError::InvalidOptions { .. }));
    }
}
