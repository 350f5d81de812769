#![no_main]
use libfuzzer_sys::fuzz_target;
use streamcode::{Categorical, DefaultAnsCoder, DefaultRangeDecoder, DefaultRangeEncoder};

fuzz_target!(|data: (Vec<u8>, Vec<u8>)| {
    let (weight_bytes, message_bytes) = data;
    if weight_bytes.is_empty() || weight_bytes.len() > 64 {
        return;
    }

    let weights: Vec<f64> = weight_bytes.iter().map(|&b| 1.0 + f64::from(b)).collect();
    let model = match Categorical::from_probabilities(&weights, 16) {
        Ok(model) => model,
        Err(_) => return,
    };
    let symbols: Vec<i32> = message_bytes
        .iter()
        .map(|&b| (b as usize % weights.len()) as i32)
        .collect();

    let mut coder = DefaultAnsCoder::new();
    coder
        .encode_symbols_reverse(symbols.iter().map(|&s| (s, &model)))
        .unwrap();
    let mut decoder = DefaultAnsCoder::from_compressed(coder.into_compressed());
    let decoded = decoder.decode_symbols(std::iter::repeat(&model).take(symbols.len()));
    assert_eq!(decoded, symbols);

    let mut encoder = DefaultRangeEncoder::new();
    encoder
        .encode_symbols(symbols.iter().map(|&s| (s, &model)))
        .unwrap();
    let mut decoder = DefaultRangeDecoder::from_compressed(encoder.into_compressed());
    let decoded = decoder
        .decode_symbols(std::iter::repeat(&model).take(symbols.len()))
        .unwrap();
    assert_eq!(decoded, symbols);
});
