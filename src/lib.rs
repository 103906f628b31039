#![doc = include_str!("../README.md")]

mod error;

pub(crate) mod prelude {
    pub use crate::error::{Error, Result};
}

pub mod analog;
pub mod demod;
pub mod encoder;
pub mod sequencer;
pub mod symbol;
pub mod timecode;
pub mod ttl;
pub mod variant;

pub use analog::{AnalogConfig, Modulated, TTL_AMPLITUDE};
pub use demod::{classify, demodulate, demodulate_any, DemodConfig, StreamDemodulator};
pub use encoder::{BitSymbolEncoder, EncoderOutput};
pub use error::{Error, Result};
pub use sequencer::{FrameSequencer, Phase, SequencerOutput};
pub use symbol::Symbol;
pub use timecode::{decode, encode, Frame, Timestamp};
pub use ttl::{drive, Drive, FrameSource, TimestampSource, TtlEncoder, TtlSample};
pub use variant::Variant;
