//! Recovery of timestamps from sampled digital signals.
//!
//! Symbols are recovered by counting consecutive high samples and classifying the count on the
//! falling edge against the duty cycle of each symbol, longest first. A pulse shorter than the
//! shortest symbol is noise and is dropped. A pulse still high when the samples end is not
//! classified.
use std::cmp::Reverse;

use tracing::{debug, trace};
use typed_builder::TypedBuilder;

use crate::prelude::*;
use crate::symbol::Symbol;
use crate::timecode::{decode, Frame, Timestamp};
use crate::variant::Variant;

/// Classify a high pulse of `count` samples within a bit period of `period` samples.
///
/// Returns `None` for pulses too short to be any symbol.
#[must_use]
pub fn classify(count: u64, period: u64) -> Option<Symbol> {
    Symbol::BY_WIDTH
        .into_iter()
        .find(|symbol| symbol.fits(count, period))
}

/// Demodulation parameters.
#[derive(Clone, Copy, Debug, TypedBuilder)]
pub struct DemodConfig {
    #[builder(default = Variant::B)]
    pub variant: Variant,
    /// Number of samples taken per encoder tick.
    #[builder(default = 1)]
    pub samples_per_tick: u32,
}

impl DemodConfig {
    /// Samples in one bit period.
    ///
    /// # Panics
    /// If `samples_per_tick` is 0.
    #[must_use]
    pub fn period(&self) -> u64 {
        assert!(self.samples_per_tick > 0, "samples per tick must be at least 1");
        u64::from(self.variant.pulse_length_ticks) * u64::from(self.samples_per_tick)
    }
}

#[derive(Clone, Debug)]
struct PulseCounter {
    period: u64,
    count: u64,
}

impl PulseCounter {
    fn new(period: u64) -> Self {
        PulseCounter { period, count: 0 }
    }

    fn push(&mut self, level: bool) -> Option<Symbol> {
        if level {
            self.count += 1;
            return None;
        }
        if self.count == 0 {
            return None;
        }
        let count = std::mem::take(&mut self.count);
        let symbol = classify(count, self.period);
        if symbol.is_none() {
            trace!(count, period = self.period, "discarding noise pulse");
        }
        symbol
    }
}

/// Lazily classify `samples` into symbols.
///
/// # Panics
/// If `config.samples_per_tick` is 0.
pub fn symbols<I>(samples: I, config: &DemodConfig) -> impl Iterator<Item = Symbol>
where
    I: IntoIterator<Item = bool>,
{
    let mut counter = PulseCounter::new(config.period());
    samples
        .into_iter()
        .filter_map(move |level| counter.push(level))
}

/// Decode the first frame in `samples`. The samples must start at the reference marker of a
/// frame.
///
/// # Errors
/// [Error::IncompleteFrame] if the samples end before a full frame of symbols is recovered,
/// [Error::MalformedFrame] if the recovered frame cannot be decoded.
///
/// # Panics
/// If `samples_per_tick` is 0.
pub fn demodulate<I>(samples: I, variant: &Variant, samples_per_tick: u32) -> Result<Timestamp>
where
    I: IntoIterator<Item = bool>,
{
    let config = DemodConfig::builder()
        .variant(*variant)
        .samples_per_tick(samples_per_tick)
        .build();
    let recovered: Vec<Symbol> = symbols(samples, &config)
        .take(variant.frame_width)
        .collect();
    if recovered.len() < variant.frame_width {
        return Err(Error::IncompleteFrame {
            actual: recovered.len(),
            expected: variant.frame_width,
        });
    }
    let frame = Frame::new(recovered)?;
    decode(&frame, variant)
}

/// Decode the first frame in `samples` without knowing the variant.
///
/// Every distinct frame layout of the standard variants is tried, widest first. Variants that
/// share a layout cannot be told apart from samples alone; the first matching entry of
/// [Variant::ALL] is reported.
///
/// # Errors
/// The error for the last layout tried if none decode.
///
/// # Panics
/// If `samples_per_tick` is 0.
pub fn demodulate_any<I>(samples: I, samples_per_tick: u32) -> Result<(Variant, Timestamp)>
where
    I: IntoIterator<Item = bool>,
{
    let samples: Vec<bool> = samples.into_iter().collect();

    let mut candidates: Vec<Variant> = Vec::new();
    for variant in Variant::ALL {
        let seen = candidates.iter().any(|c| {
            c.frame_width == variant.frame_width
                && c.pulse_length_ticks == variant.pulse_length_ticks
        });
        if !seen {
            candidates.push(variant);
        }
    }
    candidates.sort_by_key(|v| Reverse(v.frame_width));

    let mut last_err = Error::IncompleteFrame {
        actual: 0,
        expected: 0,
    };
    for variant in candidates {
        match demodulate(samples.iter().copied(), &variant, samples_per_tick) {
            Ok(ts) => return Ok((variant, ts)),
            Err(err) => {
                debug!(variant = %variant, "no frame: {err}");
                last_err = err;
            }
        }
    }
    Err(last_err)
}

/// Push-style demodulator for continuous signals.
///
/// The demodulator hunts for two consecutive markers, which only occur where the last marker
/// of one frame is followed by the reference marker of the next, and then decodes every
/// following frame. Sync is dropped when a frame fails to decode and hunting starts over.
#[derive(Clone, Debug)]
pub struct StreamDemodulator {
    variant: Variant,
    pulses: PulseCounter,
    previous: Option<Symbol>,
    synced: bool,
    symbols: Vec<Symbol>,
}

impl StreamDemodulator {
    /// # Panics
    /// If `config.samples_per_tick` is 0.
    #[must_use]
    pub fn new(config: &DemodConfig) -> Self {
        StreamDemodulator {
            variant: config.variant,
            pulses: PulseCounter::new(config.period()),
            previous: None,
            synced: false,
            symbols: Vec::with_capacity(config.variant.frame_width),
        }
    }

    /// Process one sample, returning the decode result when a frame completes.
    pub fn push(&mut self, level: bool) -> Option<Result<Timestamp>> {
        let symbol = self.pulses.push(level)?;
        self.push_symbol(symbol)
    }

    /// Process a recovered symbol, returning the decode result when a frame completes.
    pub fn push_symbol(&mut self, symbol: Symbol) -> Option<Result<Timestamp>> {
        if !self.synced {
            if self.previous == Some(Symbol::Marker) && symbol == Symbol::Marker {
                debug!(variant = %self.variant, "acquired frame sync");
                self.synced = true;
                self.symbols.clear();
                self.symbols.push(symbol);
            }
            self.previous = Some(symbol);
            return None;
        }

        self.symbols.push(symbol);
        if self.symbols.len() < self.variant.frame_width {
            return None;
        }

        let symbols = std::mem::replace(
            &mut self.symbols,
            Vec::with_capacity(self.variant.frame_width),
        );
        let last = symbols.last().copied();
        let zult = Frame::new(symbols).and_then(|frame| decode(&frame, &self.variant));
        if let Err(err) = &zult {
            debug!(variant = %self.variant, "lost frame sync: {err}");
            self.synced = false;
            self.previous = last;
        }
        Some(zult)
    }

    /// Decode every frame in `samples`.
    pub fn timestamps<I>(mut self, samples: I) -> impl Iterator<Item = Result<Timestamp>>
    where
        I: IntoIterator<Item = bool>,
    {
        samples
            .into_iter()
            .filter_map(move |level| self.push(level))
    }

    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Drop sync and any partial pulse or frame.
    pub fn reset(&mut self) {
        self.pulses.count = 0;
        self.previous = None;
        self.synced = false;
        self.symbols.clear();
    }
}
