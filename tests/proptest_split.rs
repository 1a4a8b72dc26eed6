use std::collections::BTreeSet;

use proptest::prelude::*;
use segprep::split::{split_items, split_sizes};

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn split_partitions_every_item(
        n in 0usize..200,
        ratios in proptest_helpers::arb_ratios(),
        seed in any::<u64>(),
    ) {
        let plan = split_items((0..n).collect(), &ratios, seed).expect("valid ratios");

        prop_assert_eq!(plan.total_len(), n);
        let seen: BTreeSet<usize> = plan
            .iter()
            .flat_map(|(_, part)| part.iter().copied())
            .collect();
        prop_assert_eq!(seen.len(), n);
    }

    #[test]
    fn split_sizes_follow_floor_rule(
        n in 0usize..500,
        ratios in proptest_helpers::arb_ratios(),
    ) {
        let (train, val, test) = split_sizes(n, &ratios);
        prop_assert_eq!(train, (n as f64 * ratios.train).floor() as usize);
        prop_assert_eq!(val, (n as f64 * ratios.val).floor() as usize);
        prop_assert_eq!(train + val + test, n);
    }

    #[test]
    fn same_seed_same_plan(
        n in 0usize..100,
        ratios in proptest_helpers::arb_ratios(),
        seed in any::<u64>(),
    ) {
        let items: Vec<usize> = (0..n).collect();
        let first = split_items(items.clone(), &ratios, seed).expect("first split");
        let second = split_items(items, &ratios, seed).expect("second split");
        prop_assert_eq!(first, second);
    }
}
