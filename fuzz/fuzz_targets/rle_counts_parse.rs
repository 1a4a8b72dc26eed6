//! Fuzz target for the compressed RLE counts-string decoder.
//!
//! Run with:
//!   cargo +nightly fuzz run rle_counts_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use segprep::mask::Rle;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 || data.len() > 64 * 1024 {
        return;
    }

    // First two bytes pick a small shape; the rest is the counts string.
    let height = u32::from(data[0]) + 1;
    let width = u32::from(data[1]) + 1;
    let Ok(counts) = std::str::from_utf8(&data[2..]) else {
        return;
    };

    if let Ok(rle) = Rle::from_counts_str(counts, height, width) {
        if let Ok(mask) = rle.decode() {
            assert_eq!(Rle::encode(&mask).area(), rle.area());
        }
    }
});
