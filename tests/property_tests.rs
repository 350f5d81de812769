use proptest::prelude::*;
use statrs::distribution::Normal;
use streamcode::{
    Categorical, DefaultAnsCoder, DefaultRangeDecoder, DefaultRangeEncoder, EntropyModel,
    Quantizer, SmallAnsCoder, SmallRangeDecoder, SmallRangeEncoder,
};

proptest! {
    #[test]
    fn test_categorical_invariants(
        weights in prop::collection::vec(1e-6..1.0f64, 1..16),
        precision in 8u32..=24,
    ) {
        let model = Categorical::from_probabilities(&weights, precision).unwrap();
        let total = 1u64 << precision;

        let mut acc = 0;
        for s in 0..weights.len() as i32 {
            let (c, p) = model.left_cumulative_and_probability(s).unwrap();
            prop_assert_eq!(c, acc);
            prop_assert!(p >= 1);
            acc += p;
        }
        prop_assert_eq!(acc, total);
    }

    #[test]
    fn test_quantile_function_inverts_cumulative(
        mean in -20.0..20.0f64,
        std in 0.1..15.0f64,
        precision in 8u32..=12,
    ) {
        let quantizer = Quantizer::new(-30..=30, precision).unwrap();
        let model = quantizer.quantize(Normal::new(mean, std).unwrap());

        for q in 0..(1u64 << precision) {
            let (s, c, p) = model.quantile_function(q);
            prop_assert!(c <= q && q < c + p);
            prop_assert_eq!(model.left_cumulative_and_probability(s).unwrap(), (c, p));
        }
    }

    #[test]
    fn test_ans_roundtrip_categorical(
        weights in prop::collection::vec(0.01..1.0f64, 2..16),
        indices in prop::collection::vec(0usize..1000, 1..300),
        precision in 8u32..=24,
    ) {
        let model = Categorical::from_probabilities(&weights, precision).unwrap();
        let symbols: Vec<i32> = indices.iter().map(|&i| (i % weights.len()) as i32).collect();

        let mut coder = DefaultAnsCoder::new();
        coder
            .encode_symbols_reverse(symbols.iter().map(|&s| (s, &model)))
            .unwrap();
        let mut decoder = DefaultAnsCoder::from_compressed(coder.into_compressed());
        let decoded = decoder.decode_symbols(std::iter::repeat(&model).take(symbols.len()));

        prop_assert_eq!(decoded, symbols);
        prop_assert!(decoder.is_empty());
    }

    #[test]
    fn test_range_roundtrip_categorical(
        weights in prop::collection::vec(0.01..1.0f64, 2..16),
        indices in prop::collection::vec(0usize..1000, 1..300),
        precision in 8u32..=24,
    ) {
        let model = Categorical::from_probabilities(&weights, precision).unwrap();
        let symbols: Vec<i32> = indices.iter().map(|&i| (i % weights.len()) as i32).collect();

        let mut encoder = DefaultRangeEncoder::new();
        encoder
            .encode_symbols(symbols.iter().map(|&s| (s, &model)))
            .unwrap();
        let mut decoder = DefaultRangeDecoder::from_compressed(encoder.into_compressed());
        let decoded = decoder
            .decode_symbols(std::iter::repeat(&model).take(symbols.len()))
            .unwrap();

        prop_assert_eq!(decoded, symbols);
    }

}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_both_coders_roundtrip_per_symbol_gaussians(
        params in prop::collection::vec(
            (-80.0..80.0f64, 0.2..40.0f64, -100i32..=100),
            1..60,
        ),
    ) {
        let quantizer = Quantizer::new(-100..=100, 24).unwrap();
        let symbols: Vec<i32> = params.iter().map(|&(_, _, s)| s).collect();
        let build_models = || {
            params
                .iter()
                .map(|&(mean, std, _)| quantizer.quantize(Normal::new(mean, std).unwrap()))
                .collect::<Vec<_>>()
        };

        let mut coder = DefaultAnsCoder::new();
        coder
            .encode_symbols_reverse(symbols.iter().copied().zip(build_models()))
            .unwrap();
        let mut decoder = DefaultAnsCoder::from_compressed(coder.into_compressed());
        prop_assert_eq!(decoder.decode_symbols(build_models()), symbols.clone());

        let mut encoder = DefaultRangeEncoder::new();
        encoder
            .encode_symbols(symbols.iter().copied().zip(build_models()))
            .unwrap();
        let mut decoder = DefaultRangeDecoder::from_compressed(encoder.into_compressed());
        prop_assert_eq!(decoder.decode_symbols(build_models()).unwrap(), symbols);
    }
}

proptest! {
    #[test]
    fn test_16_bit_coders_roundtrip(
        weights in prop::collection::vec(0.01..1.0f64, 2..8),
        indices in prop::collection::vec(0usize..1000, 1..200),
    ) {
        let model = Categorical::from_probabilities(&weights, 12).unwrap();
        let symbols: Vec<i32> = indices.iter().map(|&i| (i % weights.len()) as i32).collect();

        let mut coder = SmallAnsCoder::new();
        coder
            .encode_symbols_reverse(symbols.iter().map(|&s| (s, &model)))
            .unwrap();
        let mut decoder = SmallAnsCoder::from_compressed(coder.into_compressed());
        prop_assert_eq!(
            decoder.decode_symbols(std::iter::repeat(&model).take(symbols.len())),
            symbols.clone()
        );

        let mut encoder = SmallRangeEncoder::new();
        encoder
            .encode_symbols(symbols.iter().map(|&s| (s, &model)))
            .unwrap();
        let mut decoder = SmallRangeDecoder::from_compressed(encoder.into_compressed());
        prop_assert_eq!(
            decoder.decode_symbols(std::iter::repeat(&model).take(symbols.len())).unwrap(),
            symbols
        );
    }

    #[test]
    fn test_range_decoder_tolerates_arbitrary_input(
        words in prop::collection::vec(any::<u32>(), 0..20),
        count in 0usize..30,
    ) {
        let model = Categorical::from_probabilities(&[0.3, 0.2, 0.5], 16).unwrap();
        let mut decoder = DefaultRangeDecoder::from_compressed(words);
        for _ in 0..count {
            // Arbitrary input may decode to arbitrary symbols or report a
            // corrupted stream, but it must never panic.
            let _ = decoder.decode_symbol(&model);
        }
    }
}
