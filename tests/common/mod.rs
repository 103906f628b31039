#![allow(dead_code)]

use std::path::PathBuf;

use irig::{drive, Timestamp, TimestampSource, Variant};
use rand::{rngs::StdRng, Rng};

pub fn fixture_path(name: &str) -> PathBuf {
    let mut path =
        PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
    path.push("tests/fixtures");
    path.push(name);
    path
}

pub fn random_timestamp(rng: &mut StdRng) -> Timestamp {
    Timestamp::new(
        rng.gen_range(2000..=2098),
        rng.gen_range(1..=365),
        rng.gen_range(0..=23),
        rng.gen_range(0..=59),
        rng.gen_range(0..=59),
    )
    .unwrap()
}

/// Digital levels for `ticks` driver ticks of consecutive frames, including the bootstrap
/// marker.
pub fn levels(variant: &Variant, start: Timestamp, ticks: usize) -> Vec<bool> {
    drive(variant, TimestampSource::new(start, variant))
        .take(ticks)
        .map(|sample| sample.level)
        .collect()
}

pub fn oversample(levels: &[bool], factor: usize) -> Vec<bool> {
    levels
        .iter()
        .flat_map(|level| std::iter::repeat(*level).take(factor))
        .collect()
}

pub fn after_seconds(ts: Timestamp, seconds: usize) -> Timestamp {
    (0..seconds).fold(ts, |ts, _| ts.next_second())
}
