//! Fuzz target for `instances.json` parsing.
//!
//! Run with:
//!   cargo +nightly fuzz run coco_json_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use segprep::coco::from_coco_slice;

fuzz_target!(|data: &[u8]| {
    // 10MB is generous for a single split's annotations.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(doc) = from_coco_slice(data) else {
        return;
    };
    // Only parse the counts; sizes are attacker-controlled and may be huge.
    for ann in &doc.annotations {
        let _ = ann.segmentation.to_rle();
    }
});
