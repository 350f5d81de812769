//! Error types for model construction and stream coding.

use thiserror::Error;

/// Error variants for model construction, encoding and decoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The alphabet bounds are inverted (or the alphabet is empty).
    #[error("invalid alphabet: lower bound {lower} exceeds upper bound {upper}")]
    InvalidAlphabet {
        /// Smallest symbol of the requested alphabet.
        lower: i32,
        /// Largest symbol of the requested alphabet.
        upper: i32,
    },

    /// The fixed-point precision is zero or exceeds the probability width.
    #[error("invalid precision {precision}: must be in 1..=32")]
    InvalidPrecision {
        /// The rejected precision in bits.
        precision: u32,
    },

    /// The alphabet has more symbols than the precision can give nonzero mass.
    #[error("alphabet of {alphabet_size} symbols cannot be represented at precision {precision}")]
    AlphabetTooLarge {
        /// Number of symbols in the requested alphabet.
        alphabet_size: u64,
        /// The precision in bits.
        precision: u32,
    },

    /// A provided probability is invalid (negative, non-finite, or zero where
    /// nonzero mass is required).
    #[error("invalid probability: {0}")]
    InvalidProbability(f64),

    /// An explicit fixed-point probability table does not sum to `1 << precision`.
    #[error("fixed-point probabilities sum to {sum} but must sum to {expected}")]
    InvalidTotal {
        /// Actual sum of the provided table.
        sum: u64,
        /// Required sum, `1 << precision`.
        expected: u64,
    },

    /// Tried to encode a symbol outside the model's alphabet.
    #[error("symbol {0} has zero probability under the entropy model")]
    ImpossibleSymbol(i32),

    /// The compressed stream is malformed (e.g. truncated or corrupted) and
    /// decoding left the coder's working interval.
    #[error("malformed compressed stream")]
    CorruptedStream,
}

/// A specialized Result type for coding operations.
pub type Result<T> = std::result::Result<T, Error>;
