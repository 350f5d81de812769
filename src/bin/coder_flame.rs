use statrs::distribution::Normal;
use streamcode::{DefaultAnsCoder, DefaultRangeDecoder, DefaultRangeEncoder, Quantizer};

fn main() {
    let quantizer = Quantizer::new(-100..=100, 24).unwrap();
    let models: Vec<_> = (0..10_000)
        .map(|i| {
            let mean = (i % 50) as f64 - 25.0;
            let std = 3.0 + (i % 17) as f64;
            quantizer.quantize(Normal::new(mean, std).unwrap())
        })
        .collect();
    let symbols: Vec<i32> = (0..10_000).map(|i| ((i * 7) % 101) as i32 - 50).collect();

    for _ in 0..100 {
        let mut coder = DefaultAnsCoder::new();
        coder
            .encode_symbols_reverse(symbols.iter().copied().zip(models.iter()))
            .unwrap();
        let mut decoder = DefaultAnsCoder::from_compressed(coder.into_compressed());
        let decoded = decoder.decode_symbols(models.iter());
        assert_eq!(decoded, symbols);

        let mut encoder = DefaultRangeEncoder::new();
        encoder
            .encode_symbols(symbols.iter().copied().zip(models.iter()))
            .unwrap();
        let mut decoder = DefaultRangeDecoder::from_compressed(encoder.into_compressed());
        let decoded = decoder.decode_symbols(models.iter()).unwrap();
        assert_eq!(decoded, symbols);
    }
}
