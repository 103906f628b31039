//! Pulse-width coded IRIG symbols.
//!
//! Every bit period carries one symbol, distinguished only by how long the signal is held
//! high at the start of the period:
//!
//! |Symbol|Duty cycle|Text|
//! |---|---|---|
//! |[Symbol::Zero]|0.2|`0`|
//! |[Symbol::One]|0.5|`1`|
//! |[Symbol::Marker]|0.8|`_`|
use serde::{Deserialize, Serialize};

use crate::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    Zero,
    One,
    /// Position/reference marker.
    Marker,
}

impl Symbol {
    /// All symbols, longest pulse first. Classification relies on this order.
    pub const BY_WIDTH: [Symbol; 3] = [Symbol::Marker, Symbol::One, Symbol::Zero];

    /// Duty cycle in tenths of a bit period.
    #[must_use]
    pub const fn duty_tenths(self) -> u32 {
        match self {
            Symbol::Zero => 2,
            Symbol::One => 5,
            Symbol::Marker => 8,
        }
    }

    /// Fraction of the bit period the signal is held high.
    #[must_use]
    pub fn duty(self) -> f64 {
        f64::from(self.duty_tenths()) / 10.0
    }

    /// Number of ticks, out of `pulse_length` ticks, that are high for this symbol, i.e., the
    /// number of tick counter values `t` where `t < duty * pulse_length`.
    #[must_use]
    pub fn high_ticks(self, pulse_length: u32) -> u32 {
        (self.duty_tenths() * pulse_length).div_ceil(10)
    }

    /// True when a high pulse of `count` samples is at least as long as this symbol's pulse,
    /// where a full bit period is `period` samples.
    #[must_use]
    pub fn fits(self, count: u64, period: u64) -> bool {
        count * 10 >= u64::from(self.duty_tenths()) * period
    }

    /// Symbol for a data bit.
    #[must_use]
    pub fn from_bit(bit: bool) -> Self {
        if bit {
            Symbol::One
        } else {
            Symbol::Zero
        }
    }

    #[must_use]
    pub fn is_marker(self) -> bool {
        self == Symbol::Marker
    }

    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Symbol::Zero => '0',
            Symbol::One => '1',
            Symbol::Marker => '_',
        }
    }
}

impl TryFrom<char> for Symbol {
    type Error = Error;

    fn try_from(c: char) -> Result<Self> {
        match c {
            '0' => Ok(Symbol::Zero),
            '1' => Ok(Symbol::One),
            '_' => Ok(Symbol::Marker),
            _ => Err(Error::MalformedFrame(format!("invalid symbol character {c:?}"))),
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
