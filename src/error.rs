#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Year cannot be carried by the two BCD year digits counted from 2000.
    #[error("Invalid year {0}; must be 2000 through 2099")]
    InvalidYear(i32),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Frame structure does not match the protocol layout.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Signal ended before a full frame of symbols was recovered.
    #[error("Incomplete frame: got {actual} of {expected} symbols")]
    IncompleteFrame { actual: usize, expected: usize },

    #[error("Unknown IRIG variant {0:?}")]
    UnknownVariant(String),
}

pub type Result<T> = std::result::Result<T, Error>;
