#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use segprep::mask::BinaryMask;
use segprep::split::SplitRatios;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Random masks up to `max_h` x `max_w` with independent pixels.
pub fn arb_mask(max_h: u32, max_w: u32) -> BoxedStrategy<BinaryMask> {
    (1..=max_h, 1..=max_w)
        .prop_flat_map(|(h, w)| {
            proptest::collection::vec(any::<bool>(), (h * w) as usize).prop_map(move |bits| {
                BinaryMask::from_fn(h, w, |x, y| bits[(y * w + x) as usize])
            })
        })
        .boxed()
}

/// Random masks made of a few filled rectangles, which give long runs.
pub fn arb_blob_mask(max_h: u32, max_w: u32) -> BoxedStrategy<BinaryMask> {
    (1..=max_h, 1..=max_w)
        .prop_flat_map(|(h, w)| {
            let rect = (0..w, 0..h, 1..=w, 1..=h);
            proptest::collection::vec(rect, 0..4).prop_map(move |rects| {
                BinaryMask::from_fn(h, w, |x, y| {
                    rects
                        .iter()
                        .any(|&(rx, ry, rw, rh)| x >= rx && x < rx + rw && y >= ry && y < ry + rh)
                })
            })
        })
        .boxed()
}

/// Ratios with train + val never exceeding one.
pub fn arb_ratios() -> BoxedStrategy<SplitRatios> {
    (0u32..=100, 0u32..=100)
        .prop_map(|(a, b)| {
            let train = f64::from(a) / 100.0;
            let val = f64::from(b.min(100 - a)) / 100.0;
            SplitRatios::new(train, val, (1.0 - train - val).max(0.0))
        })
        .boxed()
}
