//! IRIG time code variants.
//!
//! |Variant|Frame width|Tick rate|Bit rate|
//! |---|---|---|---|
//! |A|100|10 kHz|1000 bps|
//! |B|100|1 kHz|100 bps|
//! |D|60|1/6 Hz|1 bit/min|
//! |E|100|100 Hz|10 bps|
//! |G|100|100 kHz|10000 bps|
//! |H|60|10 Hz|1 bps|
//!
//! All standard variants use 10 ticks per bit.
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Static per-variant configuration shared by every component.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub name: char,
    /// Number of symbols in a frame, 60 or 100.
    pub frame_width: usize,
    /// Number of clock ticks per bit period.
    pub pulse_length_ticks: u32,
    pub tick_rate_hz: f64,
}

impl Variant {
    /// Ticks per bit used by the standard variants.
    pub const PULSE_LENGTH_TICKS: u32 = 10;

    pub const A: Variant = Variant::standard('A', 100, 10_000.0);
    pub const B: Variant = Variant::standard('B', 100, 1_000.0);
    pub const D: Variant = Variant::standard('D', 60, 1.0 / 6.0);
    pub const E: Variant = Variant::standard('E', 100, 100.0);
    pub const G: Variant = Variant::standard('G', 100, 100_000.0);
    pub const H: Variant = Variant::standard('H', 60, 10.0);

    pub const ALL: [Variant; 6] = [
        Variant::A,
        Variant::B,
        Variant::D,
        Variant::E,
        Variant::G,
        Variant::H,
    ];

    const fn standard(name: char, frame_width: usize, tick_rate_hz: f64) -> Self {
        Variant {
            name,
            frame_width,
            pulse_length_ticks: Self::PULSE_LENGTH_TICKS,
            tick_rate_hz,
        }
    }

    /// Fewest ticks per bit for which every symbol, including a marker, ends low so that
    /// consecutive pulses stay separable.
    pub const MIN_PULSE_LENGTH_TICKS: u32 = 5;

    /// Construct a non-standard variant, e.g., to drive a standard frame layout with a
    /// different number of ticks per bit.
    ///
    /// # Panics
    /// If `frame_width` is not 60 or 100, or `pulse_length_ticks` is less than
    /// [Variant::MIN_PULSE_LENGTH_TICKS]. These are configuration errors, not runtime
    /// conditions.
    #[must_use]
    pub fn custom(
        name: char,
        frame_width: usize,
        pulse_length_ticks: u32,
        tick_rate_hz: f64,
    ) -> Self {
        let variant = Variant {
            name,
            frame_width,
            pulse_length_ticks,
            tick_rate_hz,
        };
        variant.assert_valid();
        variant
    }

    /// Check the frame width and pulse length, which public construction through
    /// [Variant::custom] guarantees but struct literals and deserialization do not.
    ///
    /// # Panics
    /// See [Variant::custom].
    pub fn assert_valid(&self) {
        assert!(
            self.frame_width == 60 || self.frame_width == 100,
            "frame width must be 60 or 100; got {}",
            self.frame_width
        );
        assert_pulse_length(self.pulse_length_ticks);
    }

    /// Look up a standard variant by name.
    ///
    /// # Errors
    /// [Error::UnknownVariant] if `name` is not one of A, B, D, E, G, H.
    pub fn lookup(name: &str) -> Result<Self> {
        name.parse()
    }

    /// Bits transmitted per second.
    #[must_use]
    pub fn bit_rate_hz(&self) -> f64 {
        self.tick_rate_hz / f64::from(self.pulse_length_ticks)
    }

    /// Number of ticks in one full frame.
    #[must_use]
    pub fn frame_ticks(&self) -> usize {
        self.frame_width * self.pulse_length_ticks as usize
    }

    /// Duration of one full frame in seconds.
    #[must_use]
    pub fn frame_seconds(&self) -> f64 {
        self.frame_ticks() as f64 / self.tick_rate_hz
    }
}

/// # Panics
/// If `pulse_length_ticks` is less than [Variant::MIN_PULSE_LENGTH_TICKS].
pub(crate) fn assert_pulse_length(pulse_length_ticks: u32) {
    assert!(
        pulse_length_ticks >= Variant::MIN_PULSE_LENGTH_TICKS,
        "pulse length must be at least {} ticks; got {pulse_length_ticks}",
        Variant::MIN_PULSE_LENGTH_TICKS
    );
}

impl FromStr for Variant {
    type Err = Error;

    /// Accepts `B`, `b`, `IRIG-B` or `irig_b`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();
        let key = upper
            .strip_prefix("IRIG-")
            .or_else(|| upper.strip_prefix("IRIG_"))
            .or_else(|| upper.strip_prefix("IRIG"))
            .unwrap_or(&upper);

        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Variant::ALL
                .into_iter()
                .find(|v| v.name == c)
                .ok_or_else(|| Error::UnknownVariant(trimmed.to_string())),
            _ => Err(Error::UnknownVariant(trimmed.to_string())),
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IRIG-{}", self.name)
    }
}
