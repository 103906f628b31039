//! Symbol to pulse-width waveform encoding.
//!
//! ```text
//!              ___________________________________________________________
//! symbol      X______0____X_____1_____X_____1_____X____2______X__________X
//!                        _           _           _           _          _
//! request     |_________| |_________| |_________| |_________| |________| |
//!              __          _____       _____       ________    __
//! level       |  |________|     |_____|     |_____|        |__|  |________
//! ```
use crate::symbol::Symbol;
use crate::variant::assert_pulse_length;

/// Output of one encoder tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncoderOutput {
    /// Digital signal level.
    pub level: bool,
    /// High for exactly one tick at the end of each bit period. The next symbol must be
    /// supplied before the following tick.
    pub request: bool,
}

/// Clocked encoder turning one [Symbol] per bit period into a pulse of the symbol's duty
/// cycle.
///
/// The encoder does not latch symbols; the caller must hold the symbol stable for the whole
/// bit period, i.e., from the tick after a request up to and including the next request.
#[derive(Clone, Debug)]
pub struct BitSymbolEncoder {
    pulse_length: u32,
    tick_counter: u32,
    level: bool,
    request: bool,
}

impl BitSymbolEncoder {
    /// # Panics
    /// If `pulse_length_ticks` is less than [crate::Variant::MIN_PULSE_LENGTH_TICKS].
    #[must_use]
    pub fn new(pulse_length_ticks: u32) -> Self {
        assert_pulse_length(pulse_length_ticks);
        BitSymbolEncoder {
            pulse_length: pulse_length_ticks,
            tick_counter: 0,
            level: false,
            request: false,
        }
    }

    /// Advance one tick.
    ///
    /// While disabled the level is held, the tick counter is frozen, and no request is
    /// produced.
    pub fn tick(&mut self, enable: bool, symbol: Symbol) -> EncoderOutput {
        if !enable {
            self.request = false;
            return self.output();
        }

        self.level = self.tick_counter < symbol.high_ticks(self.pulse_length);
        self.request = self.tick_counter == self.pulse_length - 1;
        self.tick_counter = (self.tick_counter + 1) % self.pulse_length;

        self.output()
    }

    /// Clear counter, level and request regardless of enable.
    pub fn reset(&mut self) {
        self.tick_counter = 0;
        self.level = false;
        self.request = false;
    }

    #[must_use]
    pub fn output(&self) -> EncoderOutput {
        EncoderOutput {
            level: self.level,
            request: self.request,
        }
    }

    /// Position within the current bit period of the next tick.
    #[must_use]
    pub fn tick_counter(&self) -> u32 {
        self.tick_counter
    }

    #[must_use]
    pub fn pulse_length(&self) -> u32 {
        self.pulse_length
    }
}
