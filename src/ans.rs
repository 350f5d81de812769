//! Stream coding on a stack (Asymmetric Numeral Systems).
//!
//! The [`AnsCoder`] is a single data structure that supports both encoding
//! and decoding: encoding *pushes* symbols onto the coder, decoding *pops*
//! them back off in reverse order ("last in first out"). Because the two
//! directions operate on the same state, pushes and pops may be interleaved
//! arbitrarily, growing and shrinking the compressed data as you go.
//!
//! The coder state is a single `S`-bit integer, where `S` is twice the
//! width of a compressed word. Encoding multiplies information into the
//! state; just before the state would overflow, its low word is chopped off
//! and pushed onto the word buffer. Decoding runs the exact inverse and
//! pops words back as the state drains. Outside these transfers the state
//! always stays in `[2^W, 2^S)` (or at zero for an empty coder), which is
//! what makes the two directions exact mirrors of each other.
//!
//! # Example
//!
//! ```
//! use statrs::distribution::Normal;
//! use streamcode::{DefaultAnsCoder, Quantizer};
//!
//! let quantizer = Quantizer::new(-100..=100, 24).unwrap();
//! let model = quantizer.quantize(Normal::new(0.0, 10.0).unwrap());
//! let symbols = vec![-10, 4, 0, 3];
//!
//! let mut coder = DefaultAnsCoder::new();
//! coder
//!     .encode_symbols_reverse(symbols.iter().map(|&s| (s, &model)))
//!     .unwrap();
//!
//! // Decoding pops the symbols back in their original order.
//! let decoded = coder.decode_symbols(std::iter::repeat(&model).take(4));
//! assert_eq!(decoded, symbols);
//! ```

use crate::error::Result;
use crate::model::EntropyModel;
use crate::Word;

/// Entropy coder with stack ("last in first out") discipline.
///
/// Generic over the compressed word type `W` (`u32` by default, `u16` for
/// narrow streams). The fixed-point precision of every model used with the
/// coder must not exceed `W`'s width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnsCoder<W: Word = u32> {
    state: u64,
    buf: Vec<W>,
}

/// An [`AnsCoder`] over 32-bit words (64-bit state).
pub type DefaultAnsCoder = AnsCoder<u32>;

/// An [`AnsCoder`] over 16-bit words (32-bit state).
pub type SmallAnsCoder = AnsCoder<u16>;

impl<W: Word> AnsCoder<W> {
    const STATE_BITS: u32 = 2 * W::BITS;
    const RENORM_LOWER: u64 = 1u64 << W::BITS;

    /// Creates an empty coder.
    pub fn new() -> Self {
        Self {
            state: 0,
            buf: Vec::new(),
        }
    }

    /// Creates a coder holding previously compressed data.
    ///
    /// This is the starting point for decoding data obtained from
    /// [`into_compressed`](Self::into_compressed). It can also be used to
    /// push further symbols onto an existing compressed buffer.
    pub fn from_compressed(compressed: Vec<W>) -> Self {
        let mut coder = Self {
            state: 0,
            buf: compressed,
        };
        while coder.state < Self::RENORM_LOWER {
            match coder.buf.pop() {
                Some(word) => coder.state = (coder.state << W::BITS) | word.to_u64(),
                None => break,
            }
        }
        coder
    }

    /// Returns `true` if no compressed data is left on the coder.
    pub fn is_empty(&self) -> bool {
        self.state == 0 && self.buf.is_empty()
    }

    /// The current coder state.
    pub fn state(&self) -> u64 {
        self.state
    }

    /// Number of words the sealed representation would occupy.
    pub fn num_words(&self) -> usize {
        let state_bits = 64 - self.state.leading_zeros();
        self.buf.len() + state_bits.div_ceil(W::BITS) as usize
    }

    /// Size of the compressed data in bits, including the partially filled
    /// state.
    pub fn num_bits(&self) -> u64 {
        self.buf.len() as u64 * W::BITS as u64 + (64 - self.state.leading_zeros()) as u64
    }

    /// Pushes a symbol onto the coder.
    ///
    /// # Errors
    ///
    /// [`Error::ImpossibleSymbol`](crate::Error::ImpossibleSymbol) if the
    /// symbol is outside the model's alphabet; the coder is left unchanged
    /// in that case.
    pub fn encode_symbol<M: EntropyModel>(&mut self, symbol: i32, model: M) -> Result<()> {
        let (left_cumulative, probability) = model.left_cumulative_and_probability(symbol)?;
        let precision = model.precision();
        debug_assert!(precision <= W::BITS);
        debug_assert!(probability >= 1 && left_cumulative + probability <= 1u64 << precision);

        while self.state >> (Self::STATE_BITS - precision) >= probability {
            self.buf.push(W::from_u64(self.state));
            self.state >>= W::BITS;
        }
        self.state =
            ((self.state / probability) << precision) | (left_cumulative + self.state % probability);

        Ok(())
    }

    /// Pops a symbol off the coder.
    ///
    /// Decoding is the exact inverse of [`encode_symbol`](Self::encode_symbol)
    /// and cannot fail: even a drained coder keeps producing symbols in a
    /// deterministic way (those of quantile zero). This is what makes
    /// zero-information messages decodable; popping more symbols than were
    /// pushed is otherwise a caller bug.
    pub fn decode_symbol<M: EntropyModel>(&mut self, model: M) -> i32 {
        let precision = model.precision();
        debug_assert!(precision <= W::BITS);

        let quantile = self.state & ((1u64 << precision) - 1);
        let (symbol, left_cumulative, probability) = model.quantile_function(quantile);
        debug_assert!(left_cumulative <= quantile && quantile < left_cumulative + probability);

        self.state = probability * (self.state >> precision) + (quantile - left_cumulative);
        while self.state < Self::RENORM_LOWER {
            match self.buf.pop() {
                Some(word) => self.state = (self.state << W::BITS) | word.to_u64(),
                None => break,
            }
        }

        symbol
    }

    /// Encodes a sequence of symbols in reverse order, so that decoding
    /// returns them in forward order.
    ///
    /// # Errors
    ///
    /// Propagates the first encoding error; symbols after the failed one
    /// (i.e. earlier in the provided sequence) stay unencoded.
    pub fn encode_symbols_reverse<M, I>(&mut self, symbols_and_models: I) -> Result<()>
    where
        M: EntropyModel,
        I: IntoIterator<Item = (i32, M)>,
        I::IntoIter: DoubleEndedIterator,
    {
        for (symbol, model) in symbols_and_models.into_iter().rev() {
            self.encode_symbol(symbol, model)?;
        }
        Ok(())
    }

    /// Decodes one symbol per provided model.
    pub fn decode_symbols<M, I>(&mut self, models: I) -> Vec<i32>
    where
        M: EntropyModel,
        I: IntoIterator<Item = M>,
    {
        models
            .into_iter()
            .map(|model| self.decode_symbol(model))
            .collect()
    }

    /// Returns a copy of the sealed compressed data without consuming the
    /// coder.
    pub fn get_compressed(&self) -> Vec<W> {
        self.clone().into_compressed()
    }

    /// Seals the coder and returns the compressed words.
    ///
    /// The state's words are appended on top of the buffer, low half first,
    /// omitting leading zero halves; an empty coder seals to an empty
    /// buffer. [`from_compressed`](Self::from_compressed) inverts this
    /// exactly.
    pub fn into_compressed(self) -> Vec<W> {
        let Self { mut state, mut buf } = self;
        while state != 0 {
            buf.push(W::from_u64(state));
            state >>= W::BITS;
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Categorical, Quantizer};
    use statrs::distribution::Normal;

    #[test]
    fn test_roundtrip_categorical() {
        let model = Categorical::from_probabilities(&[0.2, 0.1, 0.3, 0.4], 24).unwrap();
        let symbols = vec![0, 3, 2, 3, 1, 0, 0, 2, 3, 3, 1, 2];

        let mut coder = DefaultAnsCoder::new();
        coder
            .encode_symbols_reverse(symbols.iter().map(|&s| (s, &model)))
            .unwrap();
        let decoded = coder.decode_symbols(std::iter::repeat(&model).take(symbols.len()));

        assert_eq!(decoded, symbols);
        assert!(coder.is_empty());
    }

    #[test]
    fn test_stack_discipline_reverses_order() {
        let model = Categorical::from_probabilities(&[0.5, 0.5], 24).unwrap();
        let mut coder = DefaultAnsCoder::new();
        coder.encode_symbol(0, &model).unwrap();
        coder.encode_symbol(1, &model).unwrap();

        // The last symbol pushed is the first popped.
        assert_eq!(coder.decode_symbol(&model), 1);
        assert_eq!(coder.decode_symbol(&model), 0);
    }

    #[test]
    fn test_roundtrip_gaussian_per_symbol_models() {
        let symbols = vec![6, 10, -4, 2, -9, 41, 3, 0, 2];
        let means = [2.5, 13.1, -1.1, -3.0, -6.1, 34.2, 2.8, -6.4, -3.1];
        let stds = [4.1, 8.7, 6.2, 5.4, 24.1, 12.7, 4.9, 28.9, 4.2];
        let quantizer = Quantizer::new(-100..=100, 24).unwrap();
        let build_models = || {
            means
                .iter()
                .zip(&stds)
                .map(|(&m, &s)| quantizer.quantize(Normal::new(m, s).unwrap()))
                .collect::<Vec<_>>()
        };

        let mut coder = DefaultAnsCoder::new();
        coder
            .encode_symbols_reverse(symbols.iter().copied().zip(build_models()))
            .unwrap();
        let decoded = coder.decode_symbols(build_models());

        assert_eq!(decoded, symbols);
        assert!(coder.is_empty());
    }

    #[test]
    fn test_seal_and_reload_cycle() {
        let model = Categorical::from_probabilities(&[0.7, 0.2, 0.1], 24).unwrap();
        let symbols = vec![0, 0, 1, 0, 2, 1, 0, 0, 0, 1, 2, 2, 0, 1];

        let mut coder = DefaultAnsCoder::new();
        coder
            .encode_symbols_reverse(symbols.iter().map(|&s| (s, &model)))
            .unwrap();
        assert_eq!(coder.get_compressed(), coder.clone().into_compressed());

        let compressed = coder.into_compressed();
        assert!(compressed.last() != Some(&0));

        let mut decoder = DefaultAnsCoder::from_compressed(compressed);
        let decoded = decoder.decode_symbols(std::iter::repeat(&model).take(symbols.len()));
        assert_eq!(decoded, symbols);
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_compressed_output_is_deterministic() {
        let model = Categorical::from_probabilities(&[0.4, 0.6], 16).unwrap();
        let symbols = vec![1, 0, 1, 1, 0, 1, 0, 0, 1, 1];

        let encode = || {
            let mut coder = DefaultAnsCoder::new();
            coder
                .encode_symbols_reverse(symbols.iter().map(|&s| (s, &model)))
                .unwrap();
            coder.into_compressed()
        };
        assert_eq!(encode(), encode());
    }

    #[test]
    fn test_state_invariant_holds_after_each_symbol() {
        let model = Categorical::from_fixed_point(&[1, (1 << 24) - 1], 24).unwrap();
        let mut coder = DefaultAnsCoder::new();
        for i in 0..200 {
            coder.encode_symbol(i % 2, &model).unwrap();
            // Once words have been flushed, the state must be renormalized.
            if !coder.buf.is_empty() {
                assert!(coder.state() >= 1 << 32);
            }
        }
    }

    #[test]
    fn test_empty_message() {
        let coder = DefaultAnsCoder::new();
        assert!(coder.is_empty());
        assert_eq!(coder.num_bits(), 0);
        assert!(coder.into_compressed().is_empty());

        let mut reloaded = DefaultAnsCoder::from_compressed(Vec::new());
        assert!(reloaded.is_empty());
        assert_eq!(reloaded.decode_symbols(std::iter::empty::<&Categorical>()), vec![]);
    }

    #[test]
    fn test_single_symbol_alphabet_costs_no_bits() {
        let quantizer = Quantizer::new(7..=7, 24).unwrap();
        let model = quantizer.quantize(Normal::new(0.0, 1.0).unwrap());

        let mut coder = DefaultAnsCoder::new();
        for _ in 0..1000 {
            coder.encode_symbol(7, &model).unwrap();
        }
        assert!(coder.is_empty());
        assert_eq!(coder.num_bits(), 0);

        // The degenerate model decodes from the drained coder indefinitely.
        let decoded = coder.decode_symbols(std::iter::repeat(&model).take(1000));
        assert!(decoded.iter().all(|&s| s == 7));
    }

    #[test]
    fn test_symbols_at_alphabet_bounds() {
        let quantizer = Quantizer::new(-100..=100, 24).unwrap();
        let model = quantizer.quantize(Normal::new(3.0, 10.0).unwrap());
        let symbols = vec![-100, 100, -100, 0, 100];

        let mut coder = DefaultAnsCoder::new();
        coder
            .encode_symbols_reverse(symbols.iter().map(|&s| (s, &model)))
            .unwrap();
        let decoded = coder.decode_symbols(std::iter::repeat(&model).take(symbols.len()));
        assert_eq!(decoded, symbols);
    }

    #[test]
    fn test_impossible_symbol_leaves_coder_unchanged() {
        let model = Categorical::from_probabilities(&[0.5, 0.5], 24).unwrap();
        let mut coder = DefaultAnsCoder::new();
        coder.encode_symbol(1, &model).unwrap();
        let before = coder.clone();

        assert!(coder.encode_symbol(2, &model).is_err());
        assert_eq!(coder, before);
    }

    #[test]
    fn test_interleaved_push_and_pop() {
        let model = Categorical::from_probabilities(&[0.25, 0.25, 0.5], 20).unwrap();
        let mut coder = DefaultAnsCoder::new();

        coder.encode_symbol(2, &model).unwrap();
        coder.encode_symbol(0, &model).unwrap();
        assert_eq!(coder.decode_symbol(&model), 0);
        coder.encode_symbol(1, &model).unwrap();
        assert_eq!(coder.decode_symbol(&model), 1);
        assert_eq!(coder.decode_symbol(&model), 2);
        assert!(coder.is_empty());
    }

    #[test]
    fn test_u16_words_roundtrip() {
        let model = Categorical::from_probabilities(&[0.1, 0.2, 0.3, 0.4], 12).unwrap();
        let symbols = vec![3, 1, 0, 2, 3, 3, 2, 1, 3, 0, 2, 2, 1, 3, 3, 0];

        let mut coder = SmallAnsCoder::new();
        coder
            .encode_symbols_reverse(symbols.iter().map(|&s| (s, &model)))
            .unwrap();

        let mut decoder = SmallAnsCoder::from_compressed(coder.into_compressed());
        let decoded = decoder.decode_symbols(std::iter::repeat(&model).take(symbols.len()));
        assert_eq!(decoded, symbols);
    }
}
