//! Binary masks and COCO run-length encoding.
//!
//! A [`BinaryMask`] is the in-memory form of one category's foreground. The
//! [`MaskCodec`] capability turns it into the compressed RLE that COCO
//! tooling reads, together with its area and bounding box.
//!
//! # Column-major runs
//!
//! COCO RLE walks pixels column by column (Fortran order): pixel `(x, y)`
//! is the `x * height + y`-th pixel of the traversal. Runs alternate between
//! background and foreground and always start with background, so a mask
//! whose first pixel is set begins with a zero-length run.

mod label;
mod rle;

pub use label::{open_image, read_label_mask, LabelMask, LabelSelector};
pub use rle::{CompressedRle, Rle};

use crate::error::PrepError;

/// A `height x width` mask of {0, 1} pixels, stored row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct BinaryMask {
    height: u32,
    width: u32,
    data: Vec<u8>,
}

impl BinaryMask {
    /// Creates an all-background mask.
    pub fn zeros(height: u32, width: u32) -> Self {
        Self {
            height,
            width,
            data: vec![0; height as usize * width as usize],
        }
    }

    /// Builds a mask from row-major pixel values; any non-zero value is foreground.
    pub fn from_row_major(height: u32, width: u32, data: Vec<u8>) -> Result<Self, PrepError> {
        let expected = height as usize * width as usize;
        if data.len() != expected {
            return Err(PrepError::MaskShape {
                message: format!(
                    "{} pixels supplied for a {}x{} mask (expected {})",
                    data.len(),
                    height,
                    width,
                    expected
                ),
            });
        }

        let data = data.into_iter().map(|v| u8::from(v != 0)).collect();
        Ok(Self {
            height,
            width,
            data,
        })
    }

    /// Builds a mask by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(height: u32, width: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut data = Vec::with_capacity(height as usize * width as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(u8::from(f(x, y)));
            }
        }
        Self {
            height,
            width,
            data,
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

    /// Returns whether pixel `(x, y)` is foreground.
    ///
    /// # Panics
    /// Panics if the coordinate lies outside the mask.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[self.index(x, y)] != 0
    }

    /// Sets pixel `(x, y)`.
    ///
    /// # Panics
    /// Panics if the coordinate lies outside the mask.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        let idx = self.index(x, y);
        self.data[idx] = u8::from(value);
    }

    /// Number of foreground pixels.
    pub fn area(&self) -> u64 {
        self.data.iter().map(|&v| u64::from(v)).sum()
    }

    /// Tightest axis-aligned box containing every foreground pixel, or `None`
    /// for an empty mask.
    pub fn bbox(&self) -> Option<MaskBox> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;

        for y in 0..self.height {
            let row = &self.data[y as usize * self.width as usize..][..self.width as usize];
            let Some(first) = row.iter().position(|&v| v != 0) else {
                continue;
            };
            // `first` exists, so `rposition` does too.
            let last = row.iter().rposition(|&v| v != 0).unwrap_or(first);
            let (first, last) = (first as u32, last as u32);

            bounds = Some(match bounds {
                None => (first, y, last, y),
                Some((x0, y0, x1, _)) => (x0.min(first), y0, x1.max(last), y),
            });
        }

        bounds.map(|(x0, y0, x1, y1)| MaskBox {
            x: x0,
            y: y0,
            width: x1 - x0 + 1,
            height: y1 - y0 + 1,
        })
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} mask",
            self.width,
            self.height
        );
        y as usize * self.width as usize + x as usize
    }
}

impl std::fmt::Debug for BinaryMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "BinaryMask({}x{})", self.width, self.height)?;
        for y in 0..self.height {
            let row: String = (0..self.width)
                .map(|x| if self.get(x, y) { '#' } else { '.' })
                .collect();
            writeln!(f, "  {row}")?;
        }
        Ok(())
    }
}

/// Pixel-aligned bounding box in COCO `[x, y, width, height]` order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaskBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl MaskBox {
    /// Returns the box as COCO's float `[x, y, w, h]` array.
    pub fn to_xywh(&self) -> [f64; 4] {
        [
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.width),
            f64::from(self.height),
        ]
    }
}

/// Result of encoding one category mask.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedMask {
    pub segmentation: CompressedRle,
    pub area: f64,
    /// `None` exactly when `area == 0.0`.
    pub bbox: Option<MaskBox>,
}

/// Capability that turns binary masks into COCO segmentation RLE and back.
///
/// The exporter only talks to this trait so it can be exercised without the
/// native codec (see [`UnavailableCodec`]).
pub trait MaskCodec: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Checked once before any export work starts.
    fn ensure_available(&self) -> Result<(), PrepError> {
        Ok(())
    }

    fn encode(&self, mask: &BinaryMask) -> Result<EncodedMask, PrepError>;

    fn decode(&self, rle: &CompressedRle) -> Result<BinaryMask, PrepError>;
}

/// Native COCO RLE codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct CocoRleCodec;

impl MaskCodec for CocoRleCodec {
    fn name(&self) -> &str {
        "coco-rle"
    }

    fn encode(&self, mask: &BinaryMask) -> Result<EncodedMask, PrepError> {
        let rle = Rle::encode(mask);
        let area = rle.area();
        let bbox = if area > 0 { mask.bbox() } else { None };

        Ok(EncodedMask {
            segmentation: CompressedRle::from(&rle),
            area: area as f64,
            bbox,
        })
    }

    fn decode(&self, rle: &CompressedRle) -> Result<BinaryMask, PrepError> {
        rle.to_rle()?.decode()
    }
}

/// Stand-in for a missing codec; every call fails with `CodecUnavailable`.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableCodec;

impl UnavailableCodec {
    fn unavailable(&self) -> PrepError {
        PrepError::CodecUnavailable {
            codec: self.name().to_string(),
        }
    }
}

impl MaskCodec for UnavailableCodec {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn ensure_available(&self) -> Result<(), PrepError> {
        Err(self.unavailable())
    }

    fn encode(&self, _mask: &BinaryMask) -> Result<EncodedMask, PrepError> {
        Err(self.unavailable())
    }

    fn decode(&self, _rle: &CompressedRle) -> Result<BinaryMask, PrepError> {
        Err(self.unavailable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_mask() -> BinaryMask {
        // 2x2 blob at (3, 1)..=(4, 2) in a 5 wide, 4 tall mask.
        BinaryMask::from_fn(4, 5, |x, y| (3..=4).contains(&x) && (1..=2).contains(&y))
    }

    #[test]
    fn from_row_major_rejects_wrong_length() {
        let err = BinaryMask::from_row_major(2, 2, vec![0, 1, 0]).unwrap_err();
        assert!(matches!(err, PrepError::MaskShape { .. }));
    }

    #[test]
    fn from_row_major_normalizes_values() {
        let mask = BinaryMask::from_row_major(1, 3, vec![0, 7, 255]).expect("valid shape");
        assert!(!mask.get(0, 0));
        assert!(mask.get(1, 0));
        assert!(mask.get(2, 0));
        assert_eq!(mask.area(), 2);
    }

    #[test]
    fn bbox_of_blob_is_tight() {
        let bbox = blob_mask().bbox().expect("non-empty");
        assert_eq!(
            bbox,
            MaskBox {
                x: 3,
                y: 1,
                width: 2,
                height: 2
            }
        );
        assert_eq!(bbox.to_xywh(), [3.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn bbox_of_empty_mask_is_none() {
        assert_eq!(BinaryMask::zeros(3, 3).bbox(), None);
    }

    #[test]
    fn bbox_spans_disjoint_pixels() {
        let mut mask = BinaryMask::zeros(6, 6);
        mask.set(5, 0, true);
        mask.set(0, 4, true);
        assert_eq!(
            mask.bbox(),
            Some(MaskBox {
                x: 0,
                y: 0,
                width: 6,
                height: 5
            })
        );
    }

    #[test]
    fn codec_encodes_area_and_bbox() {
        let encoded = CocoRleCodec.encode(&blob_mask()).expect("encode");
        assert_eq!(encoded.area, 4.0);
        assert_eq!(encoded.bbox.map(|b| b.to_xywh()), Some([3.0, 1.0, 2.0, 2.0]));
        assert_eq!(encoded.segmentation.size, [4, 5]);
    }

    #[test]
    fn codec_omits_bbox_for_empty_mask() {
        let encoded = CocoRleCodec.encode(&BinaryMask::zeros(4, 4)).expect("encode");
        assert_eq!(encoded.area, 0.0);
        assert_eq!(encoded.bbox, None);
    }

    #[test]
    fn codec_decode_inverts_encode() {
        let mask = blob_mask();
        let encoded = CocoRleCodec.encode(&mask).expect("encode");
        let decoded = CocoRleCodec.decode(&encoded.segmentation).expect("decode");
        assert_eq!(decoded, mask);
    }

    #[test]
    fn unavailable_codec_fails_every_call() {
        let codec = UnavailableCodec;
        assert!(matches!(
            codec.ensure_available(),
            Err(PrepError::CodecUnavailable { .. })
        ));
        assert!(codec.encode(&blob_mask()).is_err());
    }
}
