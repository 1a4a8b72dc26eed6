//! Uncompressed runs and the COCO counts-string compression.
//!
//! The string form is the one produced by `rleToString` in the reference
//! `maskApi.c`: from the fourth run on, each value is stored as the
//! difference to the run two positions earlier, then written as 5-bit groups
//! (bit `0x20` marks continuation, bit `0x10` of the last group is the sign)
//! offset into printable ASCII by 48.

use serde::{Deserialize, Serialize};

use super::BinaryMask;
use crate::error::PrepError;

const ASCII_OFFSET: u8 = 48;
// A u32 run (or a delta of two) never needs more than 7 groups; anything
// longer cannot come from a valid encoder.
const MAX_GROUPS: u32 = 12;

/// Column-major run lengths of a binary mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rle {
    height: u32,
    width: u32,
    counts: Vec<u32>,
}

impl Rle {
    /// Wraps raw run lengths. Consistency with the size is checked by [`Rle::decode`].
    pub fn from_counts(height: u32, width: u32, counts: Vec<u32>) -> Self {
        Self {
            height,
            width,
            counts,
        }
    }

    /// Encodes a mask in column-major order.
    pub fn encode(mask: &BinaryMask) -> Self {
        let mut counts = Vec::new();
        let mut current = false;
        let mut run = 0u32;

        for x in 0..mask.width() {
            for y in 0..mask.height() {
                let value = mask.get(x, y);
                if value != current {
                    counts.push(run);
                    run = 0;
                    current = value;
                }
                run += 1;
            }
        }
        counts.push(run);

        Self {
            height: mask.height(),
            width: mask.width(),
            counts,
        }
    }

    /// Expands the runs back into a mask.
    pub fn decode(&self) -> Result<BinaryMask, PrepError> {
        let total: u64 = self.counts.iter().map(|&c| u64::from(c)).sum();
        let expected = u64::from(self.height) * u64::from(self.width);
        if total != expected {
            return Err(PrepError::RleDecode {
                message: format!(
                    "runs cover {total} pixels but a {}x{} mask has {expected}",
                    self.height, self.width
                ),
            });
        }

        let mut mask = BinaryMask::zeros(self.height, self.width);
        let h = self.height as usize;
        let mut offset = 0usize;

        for (i, &run) in self.counts.iter().enumerate() {
            let run = run as usize;
            if i % 2 == 1 {
                for k in offset..offset + run {
                    mask.set((k / h) as u32, (k % h) as u32, true);
                }
            }
            offset += run;
        }

        Ok(mask)
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Number of foreground pixels (sum of the odd-indexed runs).
    pub fn area(&self) -> u64 {
        self.counts
            .iter()
            .skip(1)
            .step_by(2)
            .map(|&c| u64::from(c))
            .sum()
    }

    /// Compresses the runs into the COCO counts string.
    pub fn to_counts_string(&self) -> String {
        let mut out = String::with_capacity(self.counts.len() * 2);

        for (i, &count) in self.counts.iter().enumerate() {
            let mut x = i64::from(count);
            if i > 2 {
                x -= i64::from(self.counts[i - 2]);
            }

            loop {
                let mut c = (x & 0x1f) as u8;
                x >>= 5;
                let more = if c & 0x10 != 0 { x != -1 } else { x != 0 };
                if more {
                    c |= 0x20;
                }
                out.push(char::from(c + ASCII_OFFSET));
                if !more {
                    break;
                }
            }
        }

        out
    }

    /// Parses a COCO counts string for a mask of the given size.
    pub fn from_counts_str(counts: &str, height: u32, width: u32) -> Result<Self, PrepError> {
        let bytes = counts.as_bytes();
        let mut runs: Vec<u32> = Vec::with_capacity(bytes.len());
        let mut pos = 0usize;

        while pos < bytes.len() {
            let mut x: i64 = 0;
            let mut group = 0u32;
            let mut more = true;

            while more {
                let Some(&byte) = bytes.get(pos) else {
                    return Err(PrepError::RleDecode {
                        message: format!("counts string ends inside a value at byte {pos}"),
                    });
                };
                if !(ASCII_OFFSET..ASCII_OFFSET + 64).contains(&byte) {
                    return Err(PrepError::RleDecode {
                        message: format!("invalid character {:?} at byte {pos}", char::from(byte)),
                    });
                }
                if group >= MAX_GROUPS {
                    return Err(PrepError::RleDecode {
                        message: format!("value starting before byte {pos} is too long"),
                    });
                }

                let c = i64::from(byte - ASCII_OFFSET);
                x |= (c & 0x1f) << (5 * group);
                more = c & 0x20 != 0;
                pos += 1;
                group += 1;
                if !more && c & 0x10 != 0 {
                    x |= -1i64 << (5 * group);
                }
            }

            if runs.len() > 2 {
                x += i64::from(runs[runs.len() - 2]);
            }
            let run = u32::try_from(x).map_err(|_| PrepError::RleDecode {
                message: format!("run {} decodes to out-of-range length {x}", runs.len()),
            })?;
            runs.push(run);
        }

        Ok(Self {
            height,
            width,
            counts: runs,
        })
    }
}

/// COCO JSON segmentation object: `{"size": [h, w], "counts": "..."}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedRle {
    pub size: [u32; 2],
    pub counts: String,
}

impl CompressedRle {
    pub fn to_rle(&self) -> Result<Rle, PrepError> {
        let [height, width] = self.size;
        Rle::from_counts_str(&self.counts, height, width)
    }
}

impl From<&Rle> for CompressedRle {
    fn from(rle: &Rle) -> Self {
        Self {
            size: [rle.height, rle.width],
            counts: rle.to_counts_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts_string(counts: &[u32]) -> String {
        Rle::from_counts(1, counts.iter().sum(), counts.to_vec()).to_counts_string()
    }

    #[test]
    fn encode_walks_columns() {
        // Row-major:
        //   0 1
        //   0 1
        //   1 0
        // Column-major stream: 0 0 1 | 1 1 0
        let mask = BinaryMask::from_row_major(3, 2, vec![0, 1, 0, 1, 1, 0]).expect("mask");
        let rle = Rle::encode(&mask);
        assert_eq!(rle.counts(), &[2, 3, 1]);
        assert_eq!(rle.area(), 3);
    }

    #[test]
    fn encode_leading_foreground_starts_with_zero_run() {
        let mask = BinaryMask::from_fn(2, 2, |_, _| true);
        assert_eq!(Rle::encode(&mask).counts(), &[0, 4]);
    }

    #[test]
    fn encode_empty_mask() {
        let mask = BinaryMask::zeros(0, 0);
        let rle = Rle::encode(&mask);
        assert_eq!(rle.counts(), &[0]);
        assert_eq!(rle.decode().expect("decode"), mask);
    }

    #[test]
    fn decode_rejects_mismatched_total() {
        let rle = Rle::from_counts(2, 2, vec![1, 2]);
        assert!(matches!(rle.decode(), Err(PrepError::RleDecode { .. })));
    }

    #[test]
    fn counts_string_matches_reference_encoder() {
        assert_eq!(counts_string(&[4]), "4");
        assert_eq!(counts_string(&[0, 4]), "04");
        assert_eq!(counts_string(&[1, 2, 1]), "121");
        // Fourth value stored as delta to the second: 5 - 1 = 4.
        assert_eq!(counts_string(&[2, 1, 1, 5]), "2114");
        // Negative delta 2 - 5 = -3 becomes a single sign-extended group.
        assert_eq!(counts_string(&[1, 5, 1, 2]), "151M");
        // Multi-group values.
        assert_eq!(counts_string(&[100]), "T3");
        assert_eq!(counts_string(&[16]), "`0");
    }

    #[test]
    fn counts_string_parses_back() {
        for counts in [
            vec![4],
            vec![0, 4],
            vec![2, 1, 1, 5],
            vec![1, 5, 1, 2],
            vec![100, 16, 3, 70_000, 1],
        ] {
            let total: u32 = counts.iter().sum();
            let rle = Rle::from_counts(1, total, counts.clone());
            let parsed = Rle::from_counts_str(&rle.to_counts_string(), 1, total).expect("parse");
            assert_eq!(parsed.counts(), counts.as_slice());
        }
    }

    #[test]
    fn counts_string_rejects_bad_input() {
        assert!(Rle::from_counts_str("4 ", 1, 4).is_err());
        // '`' (value 48) sets the continuation bit and then the input ends.
        assert!(Rle::from_counts_str("`", 1, 16).is_err());
        // First value decodes to -3.
        assert!(Rle::from_counts_str("M", 1, 1).is_err());
    }

    #[test]
    fn compressed_rle_serializes_as_coco_object() {
        let mask = BinaryMask::from_fn(2, 2, |x, _| x == 1);
        let compressed = CompressedRle::from(&Rle::encode(&mask));
        let json = serde_json::to_value(&compressed).expect("serialize");
        assert_eq!(json, serde_json::json!({"size": [2, 2], "counts": "22"}));
    }
}
