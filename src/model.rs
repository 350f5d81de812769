//! Fixed-point entropy models over bounded integer alphabets.
//!
//! Stream coders cannot work with floating-point probabilities: the tiniest
//! rounding difference between the encoder's and the decoder's view of a
//! model desynchronizes the stream and garbles everything that follows. The
//! types in this module therefore convert probability models into *exactly
//! invertible* fixed-point mass functions. With precision `P`, every symbol
//! in the model's alphabet gets an integer probability in `[1, 2^P]`, the
//! probabilities sum to exactly `2^P`, and the quantile function is an exact
//! inverse of the cumulative: for every `q` in `[0, 2^P)` there is exactly
//! one symbol whose interval `[c, c + p)` contains `q`.
//!
//! Guaranteeing a *nonzero* probability for every symbol in the declared
//! alphabet is what makes the models safe to encode with: a symbol with zero
//! mass cannot be written at any bit rate. Naive rounding of a continuous
//! CDF produces zeros in the tails, so quantization deterministically lifts
//! them, paying with mass taken from wherever the most slack is.
//!
//! Two model families are provided:
//! - [`QuantizedModel`], built by a [`Quantizer`] from any
//!   [`ContinuousDistribution`] (e.g. `statrs` Gaussians or Cauchys, or
//!   caller-supplied CDF closures via [`CustomDistribution`]);
//! - [`Categorical`], built from an explicit probability table.

use std::ops::RangeInclusive;

use statrs::distribution::ContinuousCDF;

use crate::error::{Error, Result};

/// A discrete probability distribution in fixed-point representation.
///
/// Implementations must uphold three contracts for the declared alphabet
/// `[lower, upper]` and precision `P`:
///
/// 1. every symbol in the alphabet has probability at least 1;
/// 2. the probabilities sum to exactly `1 << P`;
/// 3. `quantile_function(q) = (s, c, p)` implies `c <= q < c + p` and
///    `left_cumulative_and_probability(s) = Ok((c, p))`.
///
/// Coders rely on these contracts; they are checked by the constructors in
/// this module and by debug assertions in the coders.
pub trait EntropyModel {
    /// The fixed-point precision in bits. Probabilities are integers with
    /// denominator `1 << precision`.
    fn precision(&self) -> u32;

    /// Returns `(left_cumulative, probability)` of `symbol`, or
    /// [`Error::ImpossibleSymbol`] if the symbol is outside the alphabet.
    fn left_cumulative_and_probability(&self, symbol: i32) -> Result<(u64, u64)>;

    /// Returns the `(symbol, left_cumulative, probability)` of the unique
    /// bin that satisfies `left_cumulative <= quantile < left_cumulative +
    /// probability`.
    ///
    /// `quantile` must be below `1 << precision`.
    fn quantile_function(&self, quantile: u64) -> (i32, u64, u64);
}

impl<M: EntropyModel + ?Sized> EntropyModel for &M {
    fn precision(&self) -> u32 {
        (*self).precision()
    }

    fn left_cumulative_and_probability(&self, symbol: i32) -> Result<(u64, u64)> {
        (*self).left_cumulative_and_probability(symbol)
    }

    fn quantile_function(&self, quantile: u64) -> (i32, u64, u64) {
        (*self).quantile_function(quantile)
    }
}

/// A one-dimensional continuous probability distribution, described by its
/// CDF and an approximate inverse CDF.
///
/// The CDF is evaluated once per alphabet bin when a distribution is
/// quantized; after that all coding decisions are made on the fixed-point
/// table. The inverse only *seeds* quantile searches and is never trusted
/// for correctness: a sloppy (or outright wrong) inverse degrades lookup
/// speed, not coding results.
pub trait ContinuousDistribution {
    /// Cumulative distribution function at `x`.
    fn cdf(&self, x: f64) -> f64;

    /// Approximate inverse of [`cdf`](Self::cdf).
    fn quantile(&self, p: f64) -> f64;
}

impl ContinuousDistribution for statrs::distribution::Normal {
    fn cdf(&self, x: f64) -> f64 {
        ContinuousCDF::cdf(self, x)
    }

    fn quantile(&self, p: f64) -> f64 {
        self.inverse_cdf(p)
    }
}

impl ContinuousDistribution for statrs::distribution::Cauchy {
    fn cdf(&self, x: f64) -> f64 {
        ContinuousCDF::cdf(self, x)
    }

    fn quantile(&self, p: f64) -> f64 {
        self.inverse_cdf(p)
    }
}

/// A continuous distribution defined by caller-supplied closures.
///
/// This is the escape hatch for models without a closed form in `statrs`:
/// any CDF can be quantized as long as it is monotonically non-decreasing
/// on the alphabet. The quantile closure may be a rough approximation.
///
/// # Example
///
/// ```
/// use streamcode::{CustomDistribution, Quantizer};
///
/// let logistic = CustomDistribution::new(
///     |x: f64| 1.0 / (1.0 + (-x).exp()),
///     |p: f64| (p / (1.0 - p)).ln(),
/// );
/// let quantizer = Quantizer::new(-10..=10, 16).unwrap();
/// let model = quantizer.quantize(logistic);
/// ```
#[derive(Debug, Clone)]
pub struct CustomDistribution<F, G> {
    cdf: F,
    quantile: G,
}

impl<F, G> CustomDistribution<F, G>
where
    F: Fn(f64) -> f64,
    G: Fn(f64) -> f64,
{
    /// Wraps a CDF and an approximate inverse CDF.
    pub fn new(cdf: F, quantile: G) -> Self {
        Self { cdf, quantile }
    }
}

impl<F, G> ContinuousDistribution for CustomDistribution<F, G>
where
    F: Fn(f64) -> f64,
    G: Fn(f64) -> f64,
{
    fn cdf(&self, x: f64) -> f64 {
        (self.cdf)(x)
    }

    fn quantile(&self, p: f64) -> f64 {
        (self.quantile)(p)
    }
}

/// Shared fixed-point table: exclusive prefix sums of the probabilities.
///
/// `cumulative` has one entry per symbol plus a sentinel: `cumulative[0] ==
/// 0` and `cumulative[len - 1] == 1 << precision`, strictly increasing.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SymbolTable {
    lower: i32,
    precision: u32,
    cumulative: Vec<u64>,
}

impl SymbolTable {
    fn total(&self) -> u64 {
        1u64 << self.precision
    }

    fn alphabet_size(&self) -> usize {
        self.cumulative.len() - 1
    }

    fn upper(&self) -> i32 {
        self.lower + (self.alphabet_size() - 1) as i32
    }

    fn lookup(&self, symbol: i32) -> Result<(u64, u64)> {
        let index = (symbol as i64) - (self.lower as i64);
        if index < 0 || index >= self.alphabet_size() as i64 {
            return Err(Error::ImpossibleSymbol(symbol));
        }
        let index = index as usize;
        let left = self.cumulative[index];
        Ok((left, self.cumulative[index + 1] - left))
    }

    /// Quantile lookup seeded with a guessed index, corrected by linear
    /// steps against the table. Terminates for any seed because the table
    /// partitions `[0, total)`.
    fn invert_seeded(&self, quantile: u64, seed: usize) -> (i32, u64, u64) {
        debug_assert!(quantile < self.total());
        let mut index = seed.min(self.alphabet_size() - 1);
        while quantile < self.cumulative[index] {
            index -= 1;
        }
        while quantile >= self.cumulative[index + 1] {
            index += 1;
        }
        let left = self.cumulative[index];
        (
            self.lower + index as i32,
            left,
            self.cumulative[index + 1] - left,
        )
    }

    /// Quantile lookup by binary search for the last entry `<= quantile`.
    fn invert_binary(&self, quantile: u64) -> (i32, u64, u64) {
        debug_assert!(quantile < self.total());
        let index = self.cumulative.partition_point(|&c| c <= quantile) - 1;
        let left = self.cumulative[index];
        (
            self.lower + index as i32,
            left,
            self.cumulative[index + 1] - left,
        )
    }

    /// Entropy of the table in bits.
    fn entropy(&self) -> f64 {
        let total = self.total() as f64;
        -self
            .cumulative
            .windows(2)
            .map(|pair| {
                let mass = (pair[1] - pair[0]) as f64 / total;
                mass * mass.log2()
            })
            .sum::<f64>()
    }
}

/// Validates alphabet bounds and precision; returns the alphabet size.
fn check_alphabet(lower: i32, upper: i32, precision: u32) -> Result<usize> {
    if !(1..=32).contains(&precision) {
        return Err(Error::InvalidPrecision { precision });
    }
    if lower > upper {
        return Err(Error::InvalidAlphabet { lower, upper });
    }
    let size = (upper as i64 - lower as i64 + 1) as u64;
    if size > 1u64 << precision {
        return Err(Error::AlphabetTooLarge {
            alphabet_size: size,
            precision,
        });
    }
    Ok(size as usize)
}

/// Gives every zero entry unit mass taken from the entry with the most
/// slack, one unit at a time. Ties resolve to the lowest donor index, so
/// the result is deterministic. The total mass is preserved.
///
/// Requires the entries to sum to at least the slice length, which holds
/// whenever the alphabet fits the precision.
fn lift_zero_probabilities(probabilities: &mut [u64]) {
    while let Some(zero) = probabilities.iter().position(|&p| p == 0) {
        let (donor, &mass) = probabilities
            .iter()
            .enumerate()
            .max_by_key(|&(index, &p)| (p, std::cmp::Reverse(index)))
            .expect("alphabet is non-empty");
        debug_assert!(mass >= 2, "no donor with slack for zero-probability bin");
        probabilities[donor] -= 1;
        probabilities[zero] += 1;
    }
}

/// Rebuilds the exclusive prefix sums from a probability slice.
fn rebuild_cumulative(cumulative: &mut [u64], probabilities: &[u64]) {
    let mut acc = 0;
    for (entry, &p) in cumulative.iter_mut().zip(probabilities) {
        *entry = acc;
        acc += p;
    }
    cumulative[probabilities.len()] = acc;
}

/// Builder that turns continuous distributions into [`QuantizedModel`]s.
///
/// A quantizer pins down the alphabet `lower..=upper` and the fixed-point
/// precision once, and can then quantize arbitrarily many distributions —
/// the usual pattern for models whose parameters vary per symbol:
///
/// ```
/// use statrs::distribution::Normal;
/// use streamcode::{DefaultAnsCoder, Quantizer};
///
/// let quantizer = Quantizer::new(-100..=100, 24).unwrap();
/// let mut coder = DefaultAnsCoder::new();
///
/// let model = quantizer.quantize(Normal::new(8.3, 4.1).unwrap());
/// coder.encode_symbol(12, &model).unwrap();
/// let model = quantizer.quantize(Normal::new(-1.4, 2.7).unwrap());
/// coder.encode_symbol(-2, &model).unwrap();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantizer {
    lower: i32,
    upper: i32,
    precision: u32,
}

impl Quantizer {
    /// Creates a quantizer for the inclusive symbol range `domain` with the
    /// given fixed-point precision in bits.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAlphabet`] if the domain is empty,
    /// [`Error::InvalidPrecision`] if `precision` is outside `1..=32`, and
    /// [`Error::AlphabetTooLarge`] if the domain has more than
    /// `1 << precision` symbols (in which case not every symbol could get a
    /// nonzero probability).
    pub fn new(domain: RangeInclusive<i32>, precision: u32) -> Result<Self> {
        let (lower, upper) = (*domain.start(), *domain.end());
        check_alphabet(lower, upper, precision)?;
        Ok(Self {
            lower,
            upper,
            precision,
        })
    }

    /// The alphabet this quantizer maps distributions onto.
    pub fn domain(&self) -> RangeInclusive<i32> {
        self.lower..=self.upper
    }

    /// The fixed-point precision in bits.
    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Quantizes a continuous distribution onto the alphabet.
    ///
    /// Bin boundaries sit at half-integers: symbol `s` receives the mass of
    /// `(s - 0.5, s + 0.5]`, with the two outermost bins extended to swallow
    /// the tails. Cumulatives are rounded to the fixed-point grid and bins
    /// that round to zero are lifted to probability 1 deterministically, so
    /// the same distribution always quantizes to the identical table.
    pub fn quantize<D: ContinuousDistribution>(&self, distribution: D) -> QuantizedModel<D> {
        let mut model = QuantizedModel {
            table: SymbolTable {
                lower: self.lower,
                precision: self.precision,
                cumulative: Vec::new(),
            },
            upper: self.upper,
            distribution,
        };
        model.rebuild_table();
        model
    }
}

/// A continuous distribution quantized to fixed point on a bounded integer
/// alphabet.
///
/// Created by [`Quantizer::quantize`]. The wrapped distribution is retained
/// after construction only to seed quantile searches; all coding decisions
/// read the integer table, so two models built from identical inputs encode
/// and decode identically.
#[derive(Debug, Clone)]
pub struct QuantizedModel<D> {
    table: SymbolTable,
    upper: i32,
    distribution: D,
}

impl<D: ContinuousDistribution> QuantizedModel<D> {
    /// The alphabet of the model.
    pub fn support(&self) -> RangeInclusive<i32> {
        self.table.lower..=self.upper
    }

    /// Entropy of the quantized model in bits per symbol.
    pub fn entropy(&self) -> f64 {
        self.table.entropy()
    }

    /// Replaces the wrapped distribution and requantizes in place.
    ///
    /// Alphabet and precision stay fixed, and the cumulative table's
    /// allocation is reused. This is the cheap path for parameterized
    /// per-symbol model families.
    pub fn requantize(&mut self, distribution: D) {
        self.distribution = distribution;
        self.rebuild_table();
    }

    fn rebuild_table(&mut self) {
        let lower = self.table.lower;
        let size = (self.upper as i64 - lower as i64 + 1) as usize;
        let total = 1u64 << self.table.precision;
        let scale = total as f64;

        let cumulative = &mut self.table.cumulative;
        cumulative.clear();
        cumulative.reserve(size + 1);
        cumulative.push(0);
        let mut previous = 0u64;
        for offset in 1..size {
            // Left bin boundary of symbol `lower + offset`.
            let boundary = lower as f64 + offset as f64 - 0.5;
            let rounded = (self.distribution.cdf(boundary) * scale).round();
            let snapped = if rounded.is_finite() && rounded > 0.0 {
                (rounded as u64).min(total)
            } else {
                0
            };
            // Snapping to the running maximum keeps the table monotone even
            // for a sloppy caller-supplied CDF.
            let snapped = snapped.max(previous);
            cumulative.push(snapped);
            previous = snapped;
        }
        cumulative.push(total);

        if cumulative.windows(2).any(|pair| pair[1] == pair[0]) {
            let mut probabilities: Vec<u64> =
                cumulative.windows(2).map(|pair| pair[1] - pair[0]).collect();
            lift_zero_probabilities(&mut probabilities);
            rebuild_cumulative(cumulative, &probabilities);
        }
    }
}

impl<D: ContinuousDistribution> EntropyModel for QuantizedModel<D> {
    fn precision(&self) -> u32 {
        self.table.precision
    }

    fn left_cumulative_and_probability(&self, symbol: i32) -> Result<(u64, u64)> {
        self.table.lookup(symbol)
    }

    fn quantile_function(&self, quantile: u64) -> (i32, u64, u64) {
        let total = self.table.total();
        debug_assert!(quantile < total);
        // Seed with the continuous inverse, then let the table decide. A
        // saturating cast turns non-finite guesses into an in-range seed.
        let guess = self
            .distribution
            .quantile((quantile as f64 + 0.5) / total as f64);
        let seed = (guess as i64)
            .saturating_sub(self.table.lower as i64)
            .clamp(0, self.table.alphabet_size() as i64 - 1) as usize;
        self.table.invert_seeded(quantile, seed)
    }
}

/// A categorical distribution over `0..=N-1` in fixed-point representation.
///
/// This is the fallback for distributions without a closed-form CDF: the
/// caller provides the probability table explicitly. Quantile lookups use
/// binary search over the cumulatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorical {
    table: SymbolTable,
}

impl Categorical {
    /// Approximates floating-point probabilities in fixed point.
    ///
    /// The probabilities need not be normalized; they are scaled to
    /// `1 << precision`, floored, and the residual goes to the entries with
    /// the largest fractional parts (lowest index first on ties). Entries
    /// that end up at zero are lifted to probability 1, taking mass from the
    /// largest entry. The construction is deterministic.
    ///
    /// # Errors
    ///
    /// Rejects empty tables, non-finite or negative entries, an all-zero
    /// table, invalid precisions, and tables longer than `1 << precision`.
    pub fn from_probabilities(probabilities: &[f64], precision: u32) -> Result<Self> {
        if probabilities.is_empty() {
            return Err(Error::InvalidAlphabet { lower: 0, upper: -1 });
        }
        let upper = i32::try_from(probabilities.len() - 1).map_err(|_| Error::AlphabetTooLarge {
            alphabet_size: probabilities.len() as u64,
            precision,
        })?;
        let size = check_alphabet(0, upper, precision)?;
        for &p in probabilities {
            if !p.is_finite() || p < 0.0 {
                return Err(Error::InvalidProbability(p));
            }
        }
        let sum: f64 = probabilities.iter().sum();
        if sum <= 0.0 {
            return Err(Error::InvalidProbability(sum));
        }

        let total = 1u64 << precision;
        let scale = total as f64 / sum;
        let mut weights = Vec::with_capacity(size);
        let mut fractions = Vec::with_capacity(size);
        for (index, &p) in probabilities.iter().enumerate() {
            let scaled = p * scale;
            let floor = scaled.floor();
            weights.push((floor as u64).min(total));
            fractions.push((scaled - floor, index));
        }

        let assigned: u64 = weights.iter().sum();
        if assigned < total {
            // Largest fractional parts win the residual, lowest index first.
            fractions.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
            let mut residual = total - assigned;
            let mut rank = 0;
            while residual > 0 {
                weights[fractions[rank % size].1] += 1;
                residual -= 1;
                rank += 1;
            }
        } else {
            // Floating-point round-up overshoot; take it back from the
            // largest entries.
            let mut excess = assigned - total;
            while excess > 0 {
                let (donor, _) = weights
                    .iter()
                    .enumerate()
                    .max_by_key(|&(index, &w)| (w, std::cmp::Reverse(index)))
                    .expect("table is non-empty");
                weights[donor] -= 1;
                excess -= 1;
            }
        }
        lift_zero_probabilities(&mut weights);

        let mut cumulative = vec![0u64; size + 1];
        rebuild_cumulative(&mut cumulative, &weights);
        Ok(Self {
            table: SymbolTable {
                lower: 0,
                precision,
                cumulative,
            },
        })
    }

    /// Builds a categorical model from an exact fixed-point table.
    ///
    /// # Errors
    ///
    /// Every weight must be nonzero and the weights must sum to exactly
    /// `1 << precision`; otherwise [`Error::InvalidProbability`] or
    /// [`Error::InvalidTotal`] is returned.
    pub fn from_fixed_point(weights: &[u64], precision: u32) -> Result<Self> {
        if weights.is_empty() {
            return Err(Error::InvalidAlphabet { lower: 0, upper: -1 });
        }
        let upper = i32::try_from(weights.len() - 1).map_err(|_| Error::AlphabetTooLarge {
            alphabet_size: weights.len() as u64,
            precision,
        })?;
        let size = check_alphabet(0, upper, precision)?;
        if weights.contains(&0) {
            return Err(Error::InvalidProbability(0.0));
        }
        let total = 1u64 << precision;
        let sum = weights.iter().try_fold(0u64, |acc, &w| {
            acc.checked_add(w).filter(|&s| s <= total)
        });
        match sum {
            Some(sum) if sum == total => {}
            _ => {
                return Err(Error::InvalidTotal {
                    sum: weights.iter().fold(0u64, |acc, &w| acc.saturating_add(w)),
                    expected: total,
                });
            }
        }

        let mut cumulative = vec![0u64; size + 1];
        rebuild_cumulative(&mut cumulative, weights);
        Ok(Self {
            table: SymbolTable {
                lower: 0,
                precision,
                cumulative,
            },
        })
    }

    /// The alphabet of the model, `0..=N-1`.
    pub fn support(&self) -> RangeInclusive<i32> {
        0..=self.table.upper()
    }

    /// Entropy of the model in bits per symbol.
    pub fn entropy(&self) -> f64 {
        self.table.entropy()
    }
}

impl EntropyModel for Categorical {
    fn precision(&self) -> u32 {
        self.table.precision
    }

    fn left_cumulative_and_probability(&self, symbol: i32) -> Result<(u64, u64)> {
        self.table.lookup(symbol)
    }

    fn quantile_function(&self, quantile: u64) -> (i32, u64, u64) {
        self.table.invert_binary(quantile)
    }
}
