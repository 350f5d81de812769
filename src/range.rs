//! Stream coding on a queue (range coding).
//!
//! Range coding descends from arithmetic coding: the encoder maintains a
//! shrinking interval `[low, low + range)` and narrows it to the sub-interval
//! of each encoded symbol. Words of `low` that can no longer change are
//! emitted as they settle, so the decoder consumes words in the order the
//! encoder produced them ("first in first out"). This is the opposite
//! ordering discipline from the stack-based [`AnsCoder`](crate::AnsCoder),
//! which is why encoding and decoding are separate types here: a
//! [`RangeEncoder`] only grows its output, a [`RangeDecoder`] only consumes
//! its input.
//!
//! The only subtlety of the queue discipline is carry propagation: narrowing
//! the interval can increment `low` past a word boundary *after* that word
//! was shifted out. Emission therefore runs behind by one cached word plus a
//! run of pending all-ones words, which a late carry can still flip to
//! zeros before anything is committed to the output.
//!
//! # Example
//!
//! ```
//! use statrs::distribution::Normal;
//! use streamcode::{DefaultRangeDecoder, DefaultRangeEncoder, Quantizer};
//!
//! let quantizer = Quantizer::new(-100..=100, 24).unwrap();
//! let model = quantizer.quantize(Normal::new(0.0, 10.0).unwrap());
//! let symbols = vec![-10, 4, 0, 3];
//!
//! let mut encoder = DefaultRangeEncoder::new();
//! encoder
//!     .encode_symbols(symbols.iter().map(|&s| (s, &model)))
//!     .unwrap();
//! let compressed = encoder.into_compressed();
//!
//! let mut decoder = DefaultRangeDecoder::from_compressed(compressed);
//! let decoded = decoder
//!     .decode_symbols(std::iter::repeat(&model).take(4))
//!     .unwrap();
//! assert_eq!(decoded, symbols);
//! ```

use crate::error::{Error, Result};
use crate::model::EntropyModel;
use crate::Word;

/// Entropy encoder with queue ("first in first out") discipline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeEncoder<W: Word = u32> {
    low: u64,
    range: u64,
    /// Last shifted-out word, held back because a carry may still reach it.
    cache: Option<W>,
    /// Length of the run of all-ones words behind `cache`; a carry turns
    /// the entire run into zeros.
    num_pending: usize,
    /// Carry out of `low`, not yet applied to `cache` and the pending run.
    carry: bool,
    output: Vec<W>,
}

/// A [`RangeEncoder`] over 32-bit words (64-bit state).
pub type DefaultRangeEncoder = RangeEncoder<u32>;

/// A [`RangeEncoder`] over 16-bit words (32-bit state).
pub type SmallRangeEncoder = RangeEncoder<u16>;

impl<W: Word> RangeEncoder<W> {
    const STATE_BITS: u32 = 2 * W::BITS;
    const STATE_MASK: u64 = u64::MAX >> (64 - Self::STATE_BITS);
    const RENORM_LOWER: u64 = 1u64 << W::BITS;

    /// Creates an empty encoder.
    pub fn new() -> Self {
        Self {
            low: 0,
            range: Self::STATE_MASK,
            cache: None,
            num_pending: 0,
            carry: false,
            output: Vec::new(),
        }
    }

    /// Returns `true` if no symbol has been encoded yet.
    pub fn is_empty(&self) -> bool {
        self.range == Self::STATE_MASK && self.low == 0 && self.output.is_empty()
    }

    /// Appends a symbol to the compressed stream.
    ///
    /// # Errors
    ///
    /// [`Error::ImpossibleSymbol`] if the symbol is outside the model's
    /// alphabet; the encoder is left unchanged in that case.
    pub fn encode_symbol<M: EntropyModel>(&mut self, symbol: i32, model: M) -> Result<()> {
        let (left_cumulative, probability) = model.left_cumulative_and_probability(symbol)?;
        let precision = model.precision();
        debug_assert!(precision <= W::BITS);
        debug_assert!(probability >= 1 && left_cumulative + probability <= 1u64 << precision);

        let unit = self.range >> precision;
        let (sum, wrapped) = self.low.overflowing_add(left_cumulative * unit);
        if wrapped || sum > Self::STATE_MASK {
            // The carry is consumed by the next `shift_low`; two carries
            // without an emission in between cannot happen.
            debug_assert!(!self.carry);
            self.carry = true;
        }
        self.low = sum & Self::STATE_MASK;
        self.range = unit * probability;

        while self.range < Self::RENORM_LOWER {
            self.shift_low();
            self.range <<= W::BITS;
        }

        Ok(())
    }

    /// Encodes a sequence of symbols in forward order.
    ///
    /// # Errors
    ///
    /// Propagates the first encoding error; symbols after the failed one
    /// stay unencoded.
    pub fn encode_symbols<M, I>(&mut self, symbols_and_models: I) -> Result<()>
    where
        M: EntropyModel,
        I: IntoIterator<Item = (i32, M)>,
    {
        for (symbol, model) in symbols_and_models {
            self.encode_symbol(symbol, model)?;
        }
        Ok(())
    }

    /// Shifts the top word out of `low` into the cache/pending pipeline.
    ///
    /// An all-ones word joins the pending run (it may still be flipped by a
    /// carry); anything else settles the pipeline: the cache and the run are
    /// committed, with an outstanding carry rippled through them.
    fn shift_low(&mut self) {
        let outgoing = W::from_u64(self.low >> W::BITS);
        if self.carry || outgoing != W::MAX {
            if let Some(cache) = self.cache {
                debug_assert!(!(self.carry && cache == W::MAX));
                self.output
                    .push(W::from_u64(cache.to_u64() + u64::from(self.carry)));
            } else {
                debug_assert!(!self.carry, "carry cannot precede the first emitted word");
            }
            let fill = if self.carry { W::from_u64(0) } else { W::MAX };
            self.output
                .extend(std::iter::repeat(fill).take(self.num_pending));
            self.num_pending = 0;
            self.cache = Some(outgoing);
            self.carry = false;
        } else {
            self.num_pending += 1;
        }
        self.low = (self.low << W::BITS) & Self::STATE_MASK;
    }

    /// Returns a copy of the sealed compressed data without consuming the
    /// encoder.
    pub fn get_compressed(&self) -> Vec<W> {
        self.clone().into_compressed()
    }

    /// Seals the stream and returns the compressed words.
    ///
    /// Emits one trailing word derived from `low` such that a decoder that
    /// reads zeros past the end of the buffer lands inside the final
    /// interval. An encoder with no symbols seals to an empty buffer.
    pub fn into_compressed(mut self) -> Vec<W> {
        if self.is_empty() {
            return self.output;
        }

        // Word-aligned points are spaced `2^(S-W)` apart and the
        // renormalized `range` is at least `2^W = 2^(S-W)`, so rounding
        // `low` up to a word boundary stays below `low + range` and the
        // rounded point is identified by its top word alone.
        let step = 1u64 << (Self::STATE_BITS - W::BITS);
        debug_assert!(self.range >= step);
        let (rounded, wrapped) = self.low.overflowing_add(step - 1);
        if wrapped || rounded > Self::STATE_MASK {
            debug_assert!(!self.carry);
            self.carry = true;
        }
        self.low = rounded & Self::STATE_MASK & !(step - 1);
        self.shift_low();

        // Drain the pipeline; no carry can be outstanding anymore.
        debug_assert!(!self.carry);
        if let Some(cache) = self.cache.take() {
            self.output.push(cache);
        }
        self.output
            .extend(std::iter::repeat(W::MAX).take(self.num_pending));
        self.num_pending = 0;

        self.output
    }
}

impl<W: Word> Default for RangeEncoder<W> {
    fn default() -> Self {
        Self::new()
    }
}

/// Entropy decoder with queue ("first in first out") discipline.
///
/// Consumes the words produced by a [`RangeEncoder`] in emission order. A
/// decoder that detects a malformed stream reports
/// [`Error::CorruptedStream`] and stays poisoned: every further decoding
/// attempt returns the same error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeDecoder<W: Word = u32> {
    low: u64,
    range: u64,
    /// Position of the compressed stream inside `[low, low + range)`.
    point: u64,
    input: Vec<W>,
    pos: usize,
    poisoned: bool,
}

/// A [`RangeDecoder`] over 32-bit words (64-bit state).
pub type DefaultRangeDecoder = RangeDecoder<u32>;

/// A [`RangeDecoder`] over 16-bit words (32-bit state).
pub type SmallRangeDecoder = RangeDecoder<u16>;

impl<W: Word> RangeDecoder<W> {
    const STATE_BITS: u32 = 2 * W::BITS;
    const STATE_MASK: u64 = u64::MAX >> (64 - Self::STATE_BITS);
    const RENORM_LOWER: u64 = 1u64 << W::BITS;

    /// Creates a decoder over previously compressed words.
    ///
    /// Reads the first two words into the decoding point; a buffer shorter
    /// than the state is zero-padded, which matches how the encoder seals.
    pub fn from_compressed(input: Vec<W>) -> Self {
        let mut decoder = Self {
            low: 0,
            range: Self::STATE_MASK,
            point: 0,
            input,
            pos: 0,
            poisoned: false,
        };
        for _ in 0..2 {
            decoder.point = (decoder.point << W::BITS) | decoder.next_word();
        }
        decoder
    }

    /// Number of input words not yet consumed.
    pub fn num_remaining_words(&self) -> usize {
        self.input.len() - self.pos
    }

    fn next_word(&mut self) -> u64 {
        // Reading past the end yields zeros, mirroring the sealed tail.
        match self.input.get(self.pos) {
            Some(word) => {
                self.pos += 1;
                word.to_u64()
            }
            None => 0,
        }
    }

    /// Removes the next symbol from the compressed stream.
    ///
    /// # Errors
    ///
    /// [`Error::CorruptedStream`] if the decoding point has left the working
    /// interval, which cannot happen for a well-formed stream. The decoder
    /// is poisoned afterwards.
    pub fn decode_symbol<M: EntropyModel>(&mut self, model: M) -> Result<i32> {
        if self.poisoned {
            return Err(Error::CorruptedStream);
        }
        let precision = model.precision();
        debug_assert!(precision <= W::BITS);

        let unit = self.range >> precision;
        let offset = self.point.wrapping_sub(self.low) & Self::STATE_MASK;
        if offset >= self.range {
            self.poisoned = true;
            return Err(Error::CorruptedStream);
        }
        // The clamp absorbs the slop of the sealed tail in the last symbol.
        let quantile = (offset / unit).min((1u64 << precision) - 1);
        let (symbol, left_cumulative, probability) = model.quantile_function(quantile);
        debug_assert!(left_cumulative <= quantile && quantile < left_cumulative + probability);

        self.low = self.low.wrapping_add(left_cumulative * unit) & Self::STATE_MASK;
        self.range = unit * probability;
        while self.range < Self::RENORM_LOWER {
            let word = self.next_word();
            self.low = (self.low << W::BITS) & Self::STATE_MASK;
            self.point = ((self.point << W::BITS) | word) & Self::STATE_MASK;
            self.range <<= W::BITS;
        }

        Ok(symbol)
    }

    /// Decodes one symbol per provided model.
    ///
    /// # Errors
    ///
    /// Stops at and propagates the first decoding error.
    pub fn decode_symbols<M, I>(&mut self, models: I) -> Result<Vec<i32>>
    where
        M: EntropyModel,
        I: IntoIterator<Item = M>,
    {
        models
            .into_iter()
            .map(|model| self.decode_symbol(model))
            .collect()
    }
}
