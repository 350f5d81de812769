//! # Stream Entropy Coding
//!
//! *Losslessly compress integer symbols under any probability model, at
//! rates within a fraction of a bit of the information content.*
//!
//! ## Intuition First
//!
//! A message drawn from a known probability distribution carries a precise
//! amount of information: improbable symbols carry many bits, probable ones
//! carry almost none. A stream code packs symbols so tightly that each one
//! occupies just its information content — including *fractional* bits. Two
//! consecutive symbols of 0.3 bits each really do fit into less than one
//! bit of output, because the coder amortizes across the whole stream.
//!
//! This crate provides the two workhorse stream codes and the fixed-point
//! model substrate they share:
//!
//! - [`AnsCoder`] — Asymmetric Numeral Systems, a *stack*: encoding pushes
//!   symbols, decoding pops them in reverse order. One data structure does
//!   both, so reads and writes can be interleaved.
//! - [`RangeEncoder`] / [`RangeDecoder`] — range coding, a *queue*: the
//!   decoder consumes words in the order the encoder emitted them, which is
//!   the natural fit for sequential decoding with context-dependent models.
//! - [`Quantizer`] / [`Categorical`] — convert continuous or categorical
//!   probability models into exactly invertible fixed-point tables, the
//!   form both coders consume.
//!
//! ## The Problem
//!
//! Floating-point probabilities cannot drive an entropy coder: encoder and
//! decoder must agree on every probability *bit for bit*, or the decoded
//! stream silently diverges. All models here are therefore quantized to
//! integer probabilities with denominator `2^P` (precision `P`, typically
//! 24), normalized exactly, with every symbol of the declared alphabet kept
//! at nonzero mass so that it remains encodable.
//!
//! ## Historical Context
//!
//! ```text
//! 1948  Shannon    Entropy as the fundamental limit
//! 1976  Rissanen   Arithmetic coding: optimal rate, bit-serial
//! 1979  Martin     Range coding: arithmetic coding in word-sized steps
//! 2009  Duda       Asymmetric Numeral Systems: optimal rate at table speed
//! 2014  zstd       ANS in production compressors (tANS; LZFSE follows)
//! 2019  Townsend   Bits-back coding with ANS for latent-variable models
//! ```
//!
//! ## Mathematical Formulation
//!
//! With fixed-point probabilities `p_s` summing to `2^P` and left
//! cumulatives `c_s`, the ANS state update for encoding symbol `s` is
//!
//! ```text
//! state' = floor(state / p_s) * 2^P + c_s + (state mod p_s)
//! ```
//!
//! which is invertible because the quantile function maps `state' mod 2^P`
//! back to `(s, c_s, p_s)`. The range coder instead maintains an interval
//! `[low, low + range)` and narrows it per symbol:
//!
//! ```text
//! low'   = low + c_s * (range >> P)
//! range' = p_s * (range >> P)
//! ```
//!
//! Both coders renormalize against a word buffer to keep their state within
//! `[2^W, 2^2W)` — ANS by moving whole words between state and buffer (in
//! both directions), the range coder by emitting settled words of `low`
//! behind a carry-resolution pipeline.
//!
//! ## Complexity Analysis
//!
//! - **Time**: O(1) per encoded symbol; quantile lookups when decoding are
//!   O(log N) binary searches or seeded linear searches. Quantizing a
//!   continuous model costs O(N) CDF evaluations up front.
//! - **Space**: O(alphabet size) per model, O(1) coder state beyond the
//!   compressed words themselves.
//!
//! ## Failure Modes
//!
//! 1. **Model mismatch**: decoding with a model that differs from the
//!    encoder's (even in the last bit of one probability) produces garbage
//!    from that symbol on. Quantization here is deterministic precisely so
//!    that equal inputs yield equal tables.
//! 2. **Precision vs. word width**: a model's precision must not exceed the
//!    coder's word width, or renormalization cannot keep the state bounded.
//!
//! ## Implementation Notes
//!
//! The two coders deliberately share no machinery beyond the model
//! interface: their buffers grow in opposite directions, their
//! renormalization transfers words in opposite orders, and their sealing
//! rituals differ. Compressed buffers use native word order in memory; the
//! little-endian convention applies when words are persisted or exchanged.
//!
//! ## References
//!
//! - Duda, J. (2009). "Asymmetric numeral systems: entropy coding combining
//!   speed of Huffman coding with compression rate of arithmetic coding."
//! - Martin, G. N. N. (1979). "Range encoding: an algorithm for removing
//!   redundancy from a digitised message."
//! - Bamler, R. (2022). "Understanding entropy coding with asymmetric
//!   numeral systems: a statistician's perspective."

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ans;
pub mod error;
pub mod model;
pub mod range;

pub use ans::{AnsCoder, DefaultAnsCoder, SmallAnsCoder};
pub use error::{Error, Result};
pub use model::{
    Categorical, ContinuousDistribution, CustomDistribution, EntropyModel, QuantizedModel,
    Quantizer,
};
pub use range::{
    DefaultRangeDecoder, DefaultRangeEncoder, RangeDecoder, RangeEncoder, SmallRangeDecoder,
    SmallRangeEncoder,
};

use std::fmt::Debug;

mod sealed {
    pub trait Sealed {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
}

/// The smallest unit of compressed data.
///
/// Implemented for `u16` and `u32`. A coder over word type `W` keeps an
/// internal state twice as wide as `W`; all state arithmetic is carried in
/// `u64` and masked to the state width, so the two word sizes share one
/// code path. The trait is sealed: coders rely on words behaving exactly
/// like the builtin unsigned integers.
pub trait Word:
    sealed::Sealed + Copy + Eq + Ord + Debug + Default + Send + Sync + 'static
{
    /// Width of the word in bits.
    const BITS: u32;

    /// The all-ones word.
    const MAX: Self;

    /// Widens the word into the shared `u64` arithmetic domain.
    fn to_u64(self) -> u64;

    /// Truncates `bits` to the word width.
    fn from_u64(bits: u64) -> Self;
}

impl Word for u16 {
    const BITS: u32 = 16;
    const MAX: Self = u16::MAX;

    #[inline(always)]
    fn to_u64(self) -> u64 {
        u64::from(self)
    }

    #[inline(always)]
    fn from_u64(bits: u64) -> Self {
        bits as u16
    }
}

impl Word for u32 {
    const BITS: u32 = 32;
    const MAX: Self = u32::MAX;

    #[inline(always)]
    fn to_u64(self) -> u64 {
        u64::from(self)
    }

    #[inline(always)]
    fn from_u64(bits: u64) -> Self {
        bits as u32
    }
}
