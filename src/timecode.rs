//! Conversion between calendar timestamps and IRIG frames.
//!
//! A frame carries one timestamp as BCD digits, units digit first, with a position marker at
//! index 0 and at every index `i` where `(i + 1) % 10 == 0`. Within a digit the most
//! significant bit is transmitted first. Every position that is neither a marker nor a data bit
//! (control functions, straight binary seconds, padding) is always [Symbol::Zero].
//!
//! 100-bit layout (the 60-bit layout used by variants D and H is the first 60 positions):
//! ```text
//! [0]       P0 reference marker
//! [1..=4]   seconds units        [5] 0    [6..=8]   seconds tens
//! [9]       P1
//! [10..=13] minutes units        [14] 0   [15..=17] minutes tens   [18] 0
//! [19]      P2
//! [20..=23] hours units          [24] 0   [25..=26] hours tens     [27..=28] 0
//! [29]      P3
//! [30..=33] day-of-year units    [34] 0   [35..=38] day-of-year tens
//! [39]      P4
//! [40..=41] day-of-year hundreds [42..=48] 0
//! [49]      P5
//! [50..=53] year units           [54] 0   [55..=58] year tens
//! [59]      P6
//! [60..=98] control functions and straight binary seconds, all 0, markers at 69, 79, 89
//! [99]      P0 of the next frame
//! ```
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::prelude::*;
use crate::symbol::Symbol;
use crate::variant::Variant;

/// Years are carried as two digits counted from this year.
pub const EPOCH_YEAR: u16 = 2000;

/// A time of day on a day of the year, at one second resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    pub year: u16,
    /// 1-based day of the year, 1 to 366.
    pub day_of_year: u16,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Timestamp {
    /// Construct a timestamp, validating every field.
    ///
    /// # Errors
    /// [Error::InvalidYear] if `year` cannot be encoded, [Error::InvalidTimestamp] if any other
    /// field is out of range.
    pub fn new(year: u16, day_of_year: u16, hour: u8, minute: u8, second: u8) -> Result<Self> {
        let ts = Timestamp {
            year,
            day_of_year,
            hour,
            minute,
            second,
        };
        ts.validate()?;
        Ok(ts)
    }

    /// Construct from any chrono date/time, dropping any sub-second part.
    ///
    /// # Errors
    /// [Error::InvalidYear] if the year is negative or too large to represent.
    pub fn from_datetime<T: Datelike + Timelike>(dt: &T) -> Result<Self> {
        let year = u16::try_from(dt.year()).map_err(|_| Error::InvalidYear(dt.year()))?;
        #[allow(clippy::cast_possible_truncation)]
        let ts = Timestamp {
            year,
            day_of_year: dt.ordinal() as u16,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second() as u8,
        };
        Ok(ts)
    }

    /// The current UTC time.
    ///
    /// # Errors
    /// Only if the system clock is set to a year that cannot be represented.
    pub fn now() -> Result<Self> {
        Self::from_datetime(&Utc::now())
    }

    /// Check every field is in range and the year is representable.
    ///
    /// # Errors
    /// See [Timestamp::new].
    pub fn validate(&self) -> Result<()> {
        if !(EPOCH_YEAR..EPOCH_YEAR + 100).contains(&self.year) {
            return Err(Error::InvalidYear(i32::from(self.year)));
        }
        if self.second > 59 {
            return Err(Error::InvalidTimestamp(format!("second {} > 59", self.second)));
        }
        if self.minute > 59 {
            return Err(Error::InvalidTimestamp(format!("minute {} > 59", self.minute)));
        }
        if self.hour > 23 {
            return Err(Error::InvalidTimestamp(format!("hour {} > 23", self.hour)));
        }
        if !(1..=366).contains(&self.day_of_year) {
            return Err(Error::InvalidTimestamp(format!(
                "day of year {} not in 1..=366",
                self.day_of_year
            )));
        }
        Ok(())
    }

    /// Calendar date/time for this timestamp.
    ///
    /// # Errors
    /// [Error::InvalidTimestamp] if the day/time does not exist, e.g., day 366 of a
    /// non-leap year.
    pub fn to_naive(&self) -> Result<NaiveDateTime> {
        NaiveDate::from_yo_opt(i32::from(self.year), u32::from(self.day_of_year))
            .and_then(|d| {
                d.and_hms_opt(
                    u32::from(self.hour),
                    u32::from(self.minute),
                    u32::from(self.second),
                )
            })
            .ok_or_else(|| Error::InvalidTimestamp(format!("{self} is not a calendar time")))
    }

    /// The timestamp one second later, rolling over into the next year as needed.
    #[must_use]
    pub fn next_second(&self) -> Self {
        let mut next = *self;
        next.second += 1;
        if next.second < 60 {
            return next;
        }
        next.second = 0;
        next.minute += 1;
        if next.minute < 60 {
            return next;
        }
        next.minute = 0;
        next.hour += 1;
        if next.hour < 24 {
            return next;
        }
        next.hour = 0;
        next.day_of_year += 1;
        if next.day_of_year <= days_in_year(next.year) {
            return next;
        }
        next.day_of_year = 1;
        next.year = next.year.saturating_add(1);
        next
    }
}

fn days_in_year(year: u16) -> u16 {
    if NaiveDate::from_yo_opt(i32::from(year), 366).is_some() {
        366
    } else {
        365
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:03} {:02}:{:02}:{:02}",
            self.year, self.day_of_year, self.hour, self.minute, self.second
        )
    }
}

/// One frame of symbols, 60 or 100 long.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Frame {
    symbols: Vec<Symbol>,
}

impl Frame {
    /// Frame widths in use by the standard variants.
    pub const WIDTHS: [usize; 2] = [60, 100];

    /// Wrap `symbols` in a frame. Only the width is checked here; layout violations are
    /// reported by [decode].
    ///
    /// # Errors
    /// [Error::MalformedFrame] if there are not 60 or 100 symbols.
    pub fn new(symbols: Vec<Symbol>) -> Result<Self> {
        if !Self::WIDTHS.contains(&symbols.len()) {
            return Err(Error::MalformedFrame(format!(
                "frame must have 60 or 100 symbols; got {}",
                symbols.len()
            )));
        }
        Ok(Frame { symbols })
    }

    /// True for positions that always carry a marker.
    #[must_use]
    pub fn is_marker_position(index: usize) -> bool {
        index == 0 || index % 10 == 9
    }

    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    #[must_use]
    pub fn into_symbols(self) -> Vec<Symbol> {
        self.symbols
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.symbols.len()
    }

    /// Data bit at `index`; anything other than [Symbol::One] reads as 0.
    ///
    /// # Panics
    /// If `index` is out of range.
    #[must_use]
    pub fn bit(&self, index: usize) -> bool {
        self.symbols[index] == Symbol::One
    }

    /// Digital signal for this frame with `pulse_length` samples per symbol, high for the
    /// duty cycle of each symbol.
    pub fn waveform(&self, pulse_length: u32) -> impl Iterator<Item = bool> + '_ {
        self.symbols.iter().flat_map(move |symbol| {
            let high = symbol.high_ticks(pulse_length);
            (0..pulse_length).map(move |tick| tick < high)
        })
    }
}

impl FromStr for Frame {
    type Err = Error;

    /// Parse a bit string of `_`, `0` and `1`, ignoring whitespace.
    fn from_str(s: &str) -> Result<Self> {
        let symbols = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(Symbol::try_from)
            .collect::<Result<Vec<_>>>()?;
        Frame::new(symbols)
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for symbol in &self.symbols {
            write!(f, "{}", symbol.as_char())?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
enum Field {
    Second,
    Minute,
    Hour,
    Day,
    Year,
}

/// One BCD digit of a time field.
struct Digit {
    field: Field,
    /// Decimal place value of the digit, 1, 10 or 100.
    place: u16,
    start: usize,
    width: usize,
}

const fn digit(field: Field, place: u16, start: usize, width: usize) -> Digit {
    Digit {
        field,
        place,
        start,
        width,
    }
}

const LAYOUT: [Digit; 11] = [
    digit(Field::Second, 1, 1, 4),
    digit(Field::Second, 10, 6, 3),
    digit(Field::Minute, 1, 10, 4),
    digit(Field::Minute, 10, 15, 3),
    digit(Field::Hour, 1, 20, 4),
    digit(Field::Hour, 10, 25, 2),
    digit(Field::Day, 1, 30, 4),
    digit(Field::Day, 10, 35, 4),
    digit(Field::Day, 100, 40, 2),
    digit(Field::Year, 1, 50, 4),
    digit(Field::Year, 10, 55, 4),
];

fn is_data_position(index: usize) -> bool {
    LAYOUT
        .iter()
        .any(|d| (d.start..d.start + d.width).contains(&index))
}

/// True for positions that are always [Symbol::Zero].
#[must_use]
pub fn is_forced_zero(index: usize) -> bool {
    !Frame::is_marker_position(index) && !is_data_position(index)
}

fn field_value(ts: &Timestamp, field: Field) -> u16 {
    match field {
        Field::Second => u16::from(ts.second),
        Field::Minute => u16::from(ts.minute),
        Field::Hour => u16::from(ts.hour),
        Field::Day => ts.day_of_year,
        Field::Year => ts.year - EPOCH_YEAR,
    }
}

/// Encode `ts` into a frame for `variant`.
///
/// # Errors
/// [Error::InvalidYear] if the year is before 2000 or after 2099, [Error::InvalidTimestamp] if
/// any other field is out of range.
///
/// # Panics
/// If `variant` was built by hand with an unsupported frame width or pulse length; see
/// [Variant::assert_valid].
pub fn encode(ts: &Timestamp, variant: &Variant) -> Result<Frame> {
    variant.assert_valid();
    ts.validate()?;

    let mut symbols = vec![Symbol::Zero; variant.frame_width];
    for (idx, symbol) in symbols.iter_mut().enumerate() {
        if Frame::is_marker_position(idx) {
            *symbol = Symbol::Marker;
        }
    }
    for d in &LAYOUT {
        let value = (field_value(ts, d.field) / d.place) % 10;
        for b in 0..d.width {
            let bit = (value >> (d.width - 1 - b)) & 1 == 1;
            symbols[d.start + b] = Symbol::from_bit(bit);
        }
    }

    trace!(variant = %variant, timestamp = %ts, "encoded frame");
    Frame::new(symbols)
}

/// Decode a frame for `variant` back into a timestamp.
///
/// # Errors
/// [Error::MalformedFrame] if the frame width does not match `variant`, a marker or forced-zero
/// position holds the wrong symbol, a data position holds a marker, a BCD digit is greater
/// than 9, or a decoded field is out of range.
pub fn decode(frame: &Frame, variant: &Variant) -> Result<Timestamp> {
    if frame.width() != variant.frame_width {
        return Err(Error::MalformedFrame(format!(
            "{variant} frames have {} symbols; got {}",
            variant.frame_width,
            frame.width()
        )));
    }

    for (idx, symbol) in frame.symbols().iter().enumerate() {
        let ok = if Frame::is_marker_position(idx) {
            symbol.is_marker()
        } else if is_data_position(idx) {
            !symbol.is_marker()
        } else {
            *symbol == Symbol::Zero
        };
        if !ok {
            return Err(Error::MalformedFrame(format!(
                "unexpected {symbol:?} at index {idx}"
            )));
        }
    }

    let mut values = [0u16; 5];
    for d in &LAYOUT {
        let digit = (d.start..d.start + d.width)
            .fold(0u16, |acc, idx| (acc << 1) | u16::from(frame.bit(idx)));
        if digit > 9 {
            return Err(Error::MalformedFrame(format!(
                "invalid BCD digit {digit} at index {}",
                d.start
            )));
        }
        values[d.field as usize] += digit * d.place;
    }

    let [second, minute, hour, day_of_year, year] = values;
    #[allow(clippy::cast_possible_truncation)]
    let ts = Timestamp {
        year: EPOCH_YEAR + year,
        day_of_year,
        hour: hour as u8,
        minute: minute as u8,
        second: second as u8,
    };
    ts.validate()
        .map_err(|err| Error::MalformedFrame(format!("frame decodes to invalid time: {err}")))?;
    Ok(ts)
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const SCENARIO_1: &str = "_00000000_100101000_000100000_001000000_100000000_011000001_000000000_000000000_000000000_000000000_";
    const SCENARIO_2: &str = "_00010001_000100010_001000000_100100011_100000000_011000001_000000000_000000000_000000000_000000000_";

    fn random_timestamp(rng: &mut StdRng) -> Timestamp {
        Timestamp {
            year: rng.gen_range(2000..=2099),
            day_of_year: rng.gen_range(1..=366),
            hour: rng.gen_range(0..=23),
            minute: rng.gen_range(0..=59),
            second: rng.gen_range(0..=59),
        }
    }

    #[test]
    fn encode_literal_scenario() {
        let dt = NaiveDate::from_ymd_opt(2016, 7, 20)
            .unwrap()
            .and_hms_opt(1, 49, 0)
            .unwrap();
        let ts = Timestamp::from_datetime(&dt).unwrap();
        assert_eq!(ts.day_of_year, 202);

        let frame = encode(&ts, &Variant::B).unwrap();
        assert_eq!(frame.to_string(), SCENARIO_1);
    }

    #[test]
    fn decode_literal_scenario() {
        let frame: Frame = SCENARIO_2.parse().unwrap();
        let ts = decode(&frame, &Variant::B).unwrap();

        let expected = NaiveDate::from_ymd_opt(2016, 8, 26)
            .unwrap()
            .and_hms_opt(2, 11, 11)
            .unwrap();
        assert_eq!(ts.to_naive().unwrap(), expected);
        assert_eq!(ts, Timestamp::new(2016, 239, 2, 11, 11).unwrap());
    }

    #[test]
    fn round_trip() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..2000 {
            let ts = random_timestamp(&mut rng);
            for variant in [Variant::B, Variant::H] {
                let frame = encode(&ts, &variant).unwrap();
                assert_eq!(decode(&frame, &variant).unwrap(), ts, "frame={frame}");
            }
        }
    }

    #[test]
    fn round_trip_extremes() {
        for ts in [
            Timestamp::new(2000, 1, 0, 0, 0).unwrap(),
            Timestamp::new(2099, 366, 23, 59, 59).unwrap(),
            Timestamp::new(2024, 300, 12, 30, 45).unwrap(),
        ] {
            let frame = encode(&ts, &Variant::A).unwrap();
            assert_eq!(decode(&frame, &Variant::A).unwrap(), ts);
        }
    }

    #[test]
    fn markers_and_forced_zeros_are_fixed() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..200 {
            let ts = random_timestamp(&mut rng);
            let frame = encode(&ts, &Variant::E).unwrap();
            for (idx, symbol) in frame.symbols().iter().enumerate() {
                if idx == 0 || (idx + 1) % 10 == 0 {
                    assert_eq!(*symbol, Symbol::Marker, "index {idx}");
                } else if is_forced_zero(idx) {
                    assert_eq!(*symbol, Symbol::Zero, "index {idx}");
                } else {
                    assert!(!symbol.is_marker(), "index {idx}");
                }
            }
        }
    }

    #[test]
    fn forced_zero_positions() {
        let mut expected: Vec<usize> = vec![5, 14, 18, 24, 27, 28, 34, 54];
        expected.extend(42..=48);
        for start in [60, 70, 80, 90] {
            expected.extend(start..=start + 8);
        }
        expected.sort_unstable();

        let got: Vec<usize> = (0..100).filter(|idx| is_forced_zero(*idx)).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn sixty_bit_frame_is_prefix() {
        let ts = Timestamp::new(2016, 202, 1, 49, 0).unwrap();
        let frame = encode(&ts, &Variant::H).unwrap();
        assert_eq!(frame.width(), 60);
        assert_eq!(frame.to_string(), SCENARIO_1[..60]);
    }

    #[test]
    fn encode_invalid_year() {
        for year in [1999, 2100] {
            let ts = Timestamp {
                year,
                day_of_year: 1,
                hour: 0,
                minute: 0,
                second: 0,
            };
            assert_eq!(
                encode(&ts, &Variant::B),
                Err(Error::InvalidYear(i32::from(year)))
            );
        }
    }

    #[test]
    fn encode_invalid_fields() {
        let good = Timestamp::new(2020, 10, 10, 10, 10).unwrap();
        for bad in [
            Timestamp { second: 60, ..good },
            Timestamp { minute: 60, ..good },
            Timestamp { hour: 24, ..good },
            Timestamp { day_of_year: 0, ..good },
            Timestamp { day_of_year: 367, ..good },
        ] {
            assert!(
                matches!(encode(&bad, &Variant::B), Err(Error::InvalidTimestamp(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    #[should_panic(expected = "frame width must be 60 or 100")]
    fn encode_unsupported_width() {
        let variant = Variant {
            frame_width: 30,
            ..Variant::B
        };
        let ts = Timestamp::new(2020, 10, 10, 10, 10).unwrap();
        let _ = encode(&ts, &variant);
    }

    #[test]
    fn decode_wrong_width() {
        let frame: Frame = SCENARIO_2.parse().unwrap();
        assert!(matches!(
            decode(&frame, &Variant::H),
            Err(Error::MalformedFrame(_))
        ));
    }

    fn modified(idx: usize, symbol: Symbol) -> Frame {
        let mut symbols = SCENARIO_2.parse::<Frame>().unwrap().into_symbols();
        symbols[idx] = symbol;
        Frame::new(symbols).unwrap()
    }

    #[test]
    fn decode_missing_marker() {
        for idx in [0, 9, 49, 99] {
            assert!(matches!(
                decode(&modified(idx, Symbol::Zero), &Variant::B),
                Err(Error::MalformedFrame(_))
            ));
        }
    }

    #[test]
    fn decode_forced_zero_violation() {
        for idx in [5, 28, 45, 65, 98] {
            assert!(matches!(
                decode(&modified(idx, Symbol::One), &Variant::B),
                Err(Error::MalformedFrame(_))
            ));
        }
    }

    #[test]
    fn decode_marker_in_data() {
        assert!(matches!(
            decode(&modified(2, Symbol::Marker), &Variant::B),
            Err(Error::MalformedFrame(_))
        ));
    }

    #[test]
    fn decode_invalid_bcd_digit() {
        // seconds units 0001 -> 1111
        let mut symbols = SCENARIO_2.parse::<Frame>().unwrap().into_symbols();
        for symbol in &mut symbols[1..=4] {
            *symbol = Symbol::One;
        }
        let zult = decode(&Frame::new(symbols).unwrap(), &Variant::B);
        assert!(matches!(zult, Err(Error::MalformedFrame(msg)) if msg.contains("BCD")));
    }

    #[test]
    fn decode_out_of_range_field() {
        // minutes tens 001 -> 110, i.e., minute 61
        let mut symbols = SCENARIO_2.parse::<Frame>().unwrap().into_symbols();
        symbols[15] = Symbol::One;
        symbols[16] = Symbol::One;
        symbols[17] = Symbol::Zero;
        assert!(matches!(
            decode(&Frame::new(symbols).unwrap(), &Variant::B),
            Err(Error::MalformedFrame(_))
        ));
    }

    #[test]
    fn frame_parse_errors() {
        assert!(matches!(
            "_0101_".parse::<Frame>(),
            Err(Error::MalformedFrame(_))
        ));
        assert!(matches!(
            SCENARIO_2.replace('1', "x").parse::<Frame>(),
            Err(Error::MalformedFrame(_))
        ));
    }

    #[test]
    fn frame_waveform() {
        let frame: Frame = SCENARIO_2.parse().unwrap();
        let wave: Vec<bool> = frame.waveform(10).collect();
        assert_eq!(wave.len(), 1000);
        // P0 marker then seconds units MSB (0) then ... 0001
        assert_eq!(wave[..10], [true, true, true, true, true, true, true, true, false, false]);
        assert_eq!(wave[10..20].iter().filter(|x| **x).count(), 2);
        assert_eq!(wave[40..50].iter().filter(|x| **x).count(), 5);
    }

    #[test]
    fn next_second_rolls_over() {
        let ts = Timestamp::new(2016, 366, 23, 59, 59).unwrap();
        assert_eq!(ts.next_second(), Timestamp::new(2017, 1, 0, 0, 0).unwrap());

        let ts = Timestamp::new(2017, 365, 23, 59, 59).unwrap();
        assert_eq!(ts.next_second(), Timestamp::new(2018, 1, 0, 0, 0).unwrap());

        let ts = Timestamp::new(2017, 100, 10, 59, 59).unwrap();
        assert_eq!(ts.next_second(), Timestamp::new(2017, 100, 11, 0, 0).unwrap());
    }

    #[test]
    fn to_naive_rejects_missing_leap_day() {
        let ts = Timestamp::new(2017, 366, 0, 0, 0).unwrap();
        assert!(matches!(ts.to_naive(), Err(Error::InvalidTimestamp(_))));
    }

    #[test]
    fn display() {
        let ts = Timestamp::new(2026, 7, 3, 9, 5).unwrap();
        assert_eq!(ts.to_string(), "2026-007 03:09:05");
    }

    #[test]
    fn from_datetime_rejects_negative_year() {
        let dt = NaiveDate::from_ymd_opt(-5, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(Timestamp::from_datetime(&dt), Err(Error::InvalidYear(-5)));
    }
}
