use criterion::{criterion_group, criterion_main, Criterion};
use statrs::distribution::Normal;
use streamcode::{
    Categorical, DefaultAnsCoder, DefaultRangeDecoder, DefaultRangeEncoder, Quantizer,
};

fn bench_ans(c: &mut Criterion) {
    let mut group = c.benchmark_group("ans");
    let model = Categorical::from_probabilities(&[0.5, 0.25, 0.25], 24).unwrap();
    let symbols: Vec<i32> = (0..1000).map(|i| (i % 3) as i32).collect();

    group.bench_function("encode", |b| {
        b.iter(|| {
            let mut coder = DefaultAnsCoder::new();
            coder
                .encode_symbols_reverse(symbols.iter().map(|&s| (s, &model)))
                .unwrap();
            coder.into_compressed()
        })
    });

    let mut coder = DefaultAnsCoder::new();
    coder
        .encode_symbols_reverse(symbols.iter().map(|&s| (s, &model)))
        .unwrap();
    let compressed = coder.into_compressed();

    group.bench_function("decode", |b| {
        b.iter(|| {
            let mut coder = DefaultAnsCoder::from_compressed(compressed.clone());
            coder.decode_symbols(std::iter::repeat(&model).take(symbols.len()))
        })
    });
}

fn bench_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("range");
    let model = Categorical::from_probabilities(&[0.5, 0.25, 0.25], 24).unwrap();
    let symbols: Vec<i32> = (0..1000).map(|i| (i % 3) as i32).collect();

    group.bench_function("encode", |b| {
        b.iter(|| {
            let mut encoder = DefaultRangeEncoder::new();
            encoder
                .encode_symbols(symbols.iter().map(|&s| (s, &model)))
                .unwrap();
            encoder.into_compressed()
        })
    });

    let mut encoder = DefaultRangeEncoder::new();
    encoder
        .encode_symbols(symbols.iter().map(|&s| (s, &model)))
        .unwrap();
    let compressed = encoder.into_compressed();

    group.bench_function("decode", |b| {
        b.iter(|| {
            let mut decoder = DefaultRangeDecoder::from_compressed(compressed.clone());
            decoder
                .decode_symbols(std::iter::repeat(&model).take(symbols.len()))
                .unwrap()
        })
    });
}

fn bench_quantizer(c: &mut Criterion) {
    let quantizer = Quantizer::new(-100..=100, 24).unwrap();
    c.bench_function("quantize_gaussian", |b| {
        b.iter(|| quantizer.quantize(Normal::new(3.2, 5.1).unwrap()))
    });

    let mut model = quantizer.quantize(Normal::new(0.0, 1.0).unwrap());
    c.bench_function("requantize_gaussian", |b| {
        b.iter(|| model.requantize(Normal::new(3.2, 5.1).unwrap()))
    });
}

criterion_group!(benches, bench_ans, bench_range, bench_quantizer);
criterion_main!(benches);
