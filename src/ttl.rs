//! Digital (TTL) signal generation.
//!
//! [TtlEncoder] clocks a [FrameSequencer] and a [BitSymbolEncoder] from a single driver. Each
//! tick the sequencer consumes the request the encoder produced on the previous tick, so a new
//! symbol always takes effect on the first tick of a bit period.
//!
//! [drive] wraps a [TtlEncoder] and a [FrameSource] in an unbounded iterator that refills the
//! sequencer mailbox right after every latch.
use tracing::{trace, warn};

use crate::analog::TTL_AMPLITUDE;
use crate::encoder::BitSymbolEncoder;
use crate::prelude::*;
use crate::sequencer::{FrameSequencer, Phase};
use crate::symbol::Symbol;
use crate::timecode::{encode, Frame, Timestamp};
use crate::variant::Variant;

/// Supplies the frames to transmit, one per latch.
pub trait FrameSource {
    /// Returns `None` if no frame is available, in which case the last frame is repeated.
    fn next_frame(&mut self) -> Option<Frame>;
}

impl<F> FrameSource for F
where
    F: FnMut() -> Option<Frame>,
{
    fn next_frame(&mut self) -> Option<Frame> {
        self()
    }
}

/// Frames for consecutive timestamps, advancing by the frame duration of the variant.
///
/// Variants with frames shorter than a second repeat the same timestamp until a full second
/// has elapsed.
#[derive(Clone, Debug)]
pub struct TimestampSource {
    next: Timestamp,
    variant: Variant,
    elapsed: f64,
}

impl TimestampSource {
    #[must_use]
    pub fn new(start: Timestamp, variant: &Variant) -> Self {
        TimestampSource {
            next: start,
            variant: *variant,
            elapsed: 0.0,
        }
    }

    /// Timestamp of the next frame produced.
    #[must_use]
    pub fn peek(&self) -> Timestamp {
        self.next
    }

    fn advance(&mut self) {
        const EPSILON: f64 = 1e-9;
        self.elapsed += self.variant.frame_seconds();
        while self.elapsed >= 1.0 - EPSILON {
            self.next = self.next.next_second();
            self.elapsed -= 1.0;
        }
        self.elapsed = self.elapsed.max(0.0);
    }
}

impl FrameSource for TimestampSource {
    fn next_frame(&mut self) -> Option<Frame> {
        match encode(&self.next, &self.variant) {
            Ok(frame) => {
                self.advance();
                Some(frame)
            }
            Err(err) => {
                warn!(
                    timestamp = %self.next,
                    variant = %self.variant,
                    "cannot encode frame: {err}"
                );
                None
            }
        }
    }
}

/// Signal state after one driver tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtlSample {
    /// Digital level of the signal.
    pub level: bool,
    /// Symbol being transmitted.
    pub symbol: Symbol,
    /// Set on the last tick of a bit period.
    pub request: bool,
    /// Set on the tick the sequencer latched a frame from its mailbox.
    pub frame_latched: bool,
}

impl TtlSample {
    /// Signal level in TTL volts.
    #[must_use]
    pub fn volts(&self) -> f64 {
        if self.level {
            TTL_AMPLITUDE
        } else {
            0.0
        }
    }
}

/// A [FrameSequencer] and [BitSymbolEncoder] advanced together.
#[derive(Clone, Debug)]
pub struct TtlEncoder {
    sequencer: FrameSequencer,
    encoder: BitSymbolEncoder,
    enabled: bool,
    // One-credit request token from the encoder, consumed on the next enabled tick.
    request: bool,
}

impl TtlEncoder {
    /// Create an enabled encoder for `variant` with an empty mailbox.
    #[must_use]
    pub fn new(variant: &Variant) -> Self {
        TtlEncoder {
            sequencer: FrameSequencer::new(variant.frame_width),
            encoder: BitSymbolEncoder::new(variant.pulse_length_ticks),
            enabled: true,
            request: false,
        }
    }

    /// Place the next frame to transmit in the sequencer mailbox.
    ///
    /// # Errors
    /// [Error::MalformedFrame] if the frame width does not match the variant.
    pub fn offer(&mut self, frame: Frame) -> Result<()> {
        self.sequencer.offer(frame)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Restart from the bootstrap marker. The mailbox frame is kept.
    pub fn reset(&mut self) {
        self.sequencer.reset();
        self.encoder.reset();
        self.request = false;
    }

    /// Advance one tick.
    pub fn tick(&mut self) -> TtlSample {
        let seq = self.sequencer.tick(self.enabled, self.request);
        let enc = self.encoder.tick(self.enabled, seq.symbol);
        if self.enabled {
            self.request = enc.request;
        }
        TtlSample {
            level: enc.level,
            symbol: seq.symbol,
            request: enc.request,
            frame_latched: seq.frame_latched,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.sequencer.phase()
    }

    #[must_use]
    pub fn sequencer(&self) -> &FrameSequencer {
        &self.sequencer
    }

    #[must_use]
    pub fn encoder(&self) -> &BitSymbolEncoder {
        &self.encoder
    }
}

/// Unbounded iterator of [TtlSample]s, one per tick. See [drive].
pub struct Drive<S> {
    encoder: TtlEncoder,
    source: S,
    exhausted: bool,
}

/// Transmit the frames produced by `source` for `variant`.
///
/// The first frame is requested immediately and another each time a frame is latched, so the
/// source has a full frame period to produce each frame. When the source returns `None` the
/// last frame is repeated.
pub fn drive<S: FrameSource>(variant: &Variant, source: S) -> Drive<S> {
    let mut drive = Drive {
        encoder: TtlEncoder::new(variant),
        source,
        exhausted: false,
    };
    drive.refill();
    drive
}

impl<S: FrameSource> Drive<S> {
    fn refill(&mut self) {
        let Some(frame) = self.source.next_frame() else {
            if !self.exhausted {
                warn!("frame source did not supply a frame; repeating the last frame");
            }
            self.exhausted = true;
            return;
        };
        self.exhausted = false;
        trace!(frame = %frame, "offering frame");
        if let Err(err) = self.encoder.offer(frame) {
            warn!("dropping frame: {err}");
        }
    }

    #[must_use]
    pub fn encoder(&self) -> &TtlEncoder {
        &self.encoder
    }

    pub fn encoder_mut(&mut self) -> &mut TtlEncoder {
        &mut self.encoder
    }
}

impl<S: FrameSource> Iterator for Drive<S> {
    type Item = TtlSample;

    fn next(&mut self) -> Option<Self::Item> {
        let sample = self.encoder.tick();
        if sample.frame_latched {
            self.refill();
        }
        Some(sample)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::demod::demodulate;
    use crate::timecode::decode;
    use test_case::test_case;

    fn start() -> Timestamp {
        Timestamp::new(2023, 59, 23, 59, 58).unwrap()
    }

    fn marker_wave() -> Vec<bool> {
        let mut wave = vec![true; 8];
        wave.extend([false; 2]);
        wave
    }

    #[test]
    fn drive_matches_frame_waveform() {
        let ts = start();
        let samples: Vec<TtlSample> = drive(&Variant::B, TimestampSource::new(ts, &Variant::B))
            .take(10 + 3 * 1000)
            .collect();
        let levels: Vec<bool> = samples.iter().map(|s| s.level).collect();

        assert_eq!(levels[..10], marker_wave());
        let mut expected = ts;
        for n in 0..3 {
            let frame = encode(&expected, &Variant::B).unwrap();
            let wave: Vec<bool> = frame.waveform(10).collect();
            let start = 10 + n * 1000;
            assert_eq!(levels[start..start + 1000], wave, "frame {n}");
            expected = expected.next_second();
        }
    }

    #[test]
    fn bootstrap_and_latch_timing() {
        let samples: Vec<TtlSample> =
            drive(&Variant::B, TimestampSource::new(start(), &Variant::B))
                .take(2100)
                .collect();

        assert_eq!(samples[0].symbol, Symbol::Marker);
        assert_eq!(samples[10].symbol, Symbol::Marker);

        let latches: Vec<usize> = samples
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.frame_latched.then_some(i))
            .collect();
        assert_eq!(latches, vec![11, 1010, 2010]);

        let requests = samples.iter().filter(|s| s.request).count();
        assert_eq!(requests, 210);
        assert!(samples[9].request);
        assert!(!samples[10].request);
    }

    #[test]
    fn disable_pauses_without_losing_request() {
        let frame = encode(&start(), &Variant::B).unwrap();

        let mut reference = TtlEncoder::new(&Variant::B);
        reference.offer(frame.clone()).unwrap();
        let expected: Vec<bool> = (0..1500).map(|_| reference.tick().level).collect();

        let mut ttl = TtlEncoder::new(&Variant::B);
        ttl.offer(frame).unwrap();
        // last tick carries a request
        let mut got: Vec<bool> = (0..1010).map(|_| ttl.tick().level).collect();
        ttl.set_enabled(false);
        for _ in 0..17 {
            let sample = ttl.tick();
            assert!(!sample.request);
            assert!(!sample.frame_latched);
        }
        ttl.set_enabled(true);
        got.extend((0..490).map(|_| ttl.tick().level));

        assert_eq!(got, expected);
    }

    #[test]
    fn reset_restarts_bootstrap() {
        let mut ttl = TtlEncoder::new(&Variant::H);
        ttl.offer(encode(&start(), &Variant::H).unwrap()).unwrap();
        for _ in 0..333 {
            ttl.tick();
        }
        ttl.reset();
        assert_eq!(ttl.phase(), Phase::AwaitingFirstMarker);
        let samples: Vec<TtlSample> = (0..20).map(|_| ttl.tick()).collect();
        assert_eq!(samples[0].symbol, Symbol::Marker);
        assert_eq!(samples[10].symbol, Symbol::Marker);
        assert!(samples[11].frame_latched);
    }

    #[test]
    fn exhausted_source_repeats_last_frame() {
        let frame = encode(&start(), &Variant::B).unwrap();
        let mut frames = vec![frame.clone()].into_iter();
        let levels: Vec<bool> = drive(&Variant::B, move || frames.next())
            .take(10 + 2 * 1000)
            .map(|s| s.level)
            .collect();

        let wave: Vec<bool> = frame.waveform(10).collect();
        assert_eq!(levels[10..1010], wave);
        assert_eq!(levels[1010..2010], wave);
    }

    #[test]
    fn wrong_width_frames_are_dropped() {
        let good = encode(&start(), &Variant::B).unwrap();
        let bad = encode(&start().next_second(), &Variant::H).unwrap();
        let mut frames = vec![good.clone(), bad].into_iter();
        let levels: Vec<bool> = drive(&Variant::B, move || frames.next())
            .take(2010)
            .map(|s| s.level)
            .collect();

        let wave: Vec<bool> = good.waveform(10).collect();
        assert_eq!(levels[1010..2010], wave);
    }

    #[test]
    fn timestamp_source_advances_by_frame_duration() {
        let ts = start();

        let mut source = TimestampSource::new(ts, &Variant::H);
        let first = source.next_frame().unwrap();
        let second = source.next_frame().unwrap();
        assert_eq!(decode(&first, &Variant::H).unwrap(), ts);
        let mut expected = ts;
        for _ in 0..60 {
            expected = expected.next_second();
        }
        assert_eq!(decode(&second, &Variant::H).unwrap(), expected);

        // ten frames per second
        let mut source = TimestampSource::new(ts, &Variant::A);
        for _ in 0..10 {
            assert_eq!(decode(&source.next_frame().unwrap(), &Variant::A).unwrap(), ts);
        }
        assert_eq!(source.peek(), ts.next_second());
    }

    #[test]
    fn timestamp_source_stops_at_end_of_epoch() {
        let ts = Timestamp::new(2099, 365, 23, 59, 59).unwrap();
        let mut source = TimestampSource::new(ts, &Variant::B);
        assert!(source.next_frame().is_some());
        assert!(source.next_frame().is_none());
    }

    #[test_case(60)]
    #[test_case(100)]
    fn shortest_pulse_length_demodulates(frame_width: usize) {
        let variant = Variant::custom('X', frame_width, Variant::MIN_PULSE_LENGTH_TICKS, 1000.0);
        let ts = Timestamp::new(2016, 239, 2, 11, 11).unwrap();
        let skip = variant.pulse_length_ticks as usize;
        let levels: Vec<bool> = drive(&variant, TimestampSource::new(ts, &variant))
            .skip(skip)
            .take(variant.frame_ticks())
            .map(|s| s.level)
            .collect();

        let got = demodulate(levels, &variant, 1).unwrap();
        assert_eq!(got, decode(&encode(&ts, &variant).unwrap(), &variant).unwrap());
    }

    #[test]
    fn volts() {
        let mut ttl = TtlEncoder::new(&Variant::B);
        let sample = ttl.tick();
        assert!((sample.volts() - TTL_AMPLITUDE).abs() < f64::EPSILON);
    }
}
