//! Amplitude modulated analog signal.
//!
//! Each digital sample is expanded into a fixed number of carrier samples, at the large
//! amplitude while the level is high and the small amplitude otherwise. The carrier phase is
//! taken from the running output sample index so it is continuous across amplitude changes.
use std::f64::consts::TAU;

use typed_builder::TypedBuilder;

/// TTL high level in volts.
pub const TTL_AMPLITUDE: f64 = 5.0;

/// Carrier and amplitude settings. The defaults produce one full 1 kHz carrier cycle per
/// digital sample at 32 kHz.
#[derive(Clone, Copy, Debug, PartialEq, TypedBuilder)]
pub struct AnalogConfig {
    #[builder(default = 1_000.0)]
    pub carrier_hz: f64,
    #[builder(default = 32_000.0)]
    pub sample_rate_hz: f64,
    /// Carrier samples emitted for each digital sample.
    #[builder(default = 32)]
    pub samples_per_level: u32,
    #[builder(default = TTL_AMPLITUDE)]
    pub high_amplitude: f64,
    #[builder(default = TTL_AMPLITUDE / 3.0)]
    pub low_amplitude: f64,
}

impl Default for AnalogConfig {
    fn default() -> Self {
        AnalogConfig::builder().build()
    }
}

impl AnalogConfig {
    /// Modulate `levels` onto the carrier.
    ///
    /// # Panics
    /// If `samples_per_level` is 0 or `sample_rate_hz` is not positive.
    pub fn modulate<I>(&self, levels: I) -> Modulated<I::IntoIter>
    where
        I: IntoIterator<Item = bool>,
    {
        assert!(self.samples_per_level > 0, "samples per level must be at least 1");
        assert!(self.sample_rate_hz > 0.0, "sample rate must be positive");
        Modulated {
            levels: levels.into_iter(),
            config: *self,
            index: 0,
            amplitude: 0.0,
            remaining: 0,
        }
    }

    fn amplitude(&self, level: bool) -> f64 {
        if level {
            self.high_amplitude
        } else {
            self.low_amplitude
        }
    }
}

/// Iterator of analog samples. See [AnalogConfig::modulate].
#[derive(Clone, Debug)]
pub struct Modulated<I> {
    levels: I,
    config: AnalogConfig,
    index: u64,
    amplitude: f64,
    remaining: u32,
}

impl<I> Iterator for Modulated<I>
where
    I: Iterator<Item = bool>,
{
    type Item = f64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            let level = self.levels.next()?;
            self.amplitude = self.config.amplitude(level);
            self.remaining = self.config.samples_per_level;
        }
        self.remaining -= 1;

        #[allow(clippy::cast_precision_loss)]
        let phase = TAU * self.index as f64 * self.config.carrier_hz / self.config.sample_rate_hz;
        self.index += 1;
        Some(self.amplitude * phase.sin())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let per = self.config.samples_per_level as usize;
        let extra = self.remaining as usize;
        let (lo, hi) = self.levels.size_hint();
        (
            lo.saturating_mul(per).saturating_add(extra),
            hi.and_then(|hi| hi.checked_mul(per))
                .and_then(|hi| hi.checked_add(extra)),
        )
    }
}
