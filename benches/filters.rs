use criterion::{criterion_group, criterion_main, Criterion};
use pdfcore::{dictionary, Object};

fn bench_flate_round_trip(c: &mut Criterion) {
    let payload = "the quick brown fox jumps over the lazy dog\n".repeat(2000);
    let dict = dictionary! { b"Filter" => Object::Name(b"FlateDecode".to_vec()) };
    let encoded = pdfcore::filters::encode(b"FlateDecode", None, payload.as_bytes()).unwrap();

    c.bench_function("flate_decode", |b| {
        b.iter(|| {
            pdfcore::filters::decode(&dict, &encoded).unwrap();
        })
    });

    c.bench_function("flate_encode", |b| {
        b.iter(|| {
            pdfcore::filters::encode(b"FlateDecode", None, payload.as_bytes()).unwrap();
        })
    });
}

fn bench_ascii85_round_trip(c: &mut Criterion) {
    let payload = "the quick brown fox jumps over the lazy dog\n".repeat(500);
    let dict = dictionary! { b"Filter" => Object::Name(b"ASCII85Decode".to_vec()) };
    let encoded = pdfcore::filters::encode(b"ASCII85Decode", None, payload.as_bytes()).unwrap();

    c.bench_function("ascii85_decode", |b| {
        b.iter(|| {
            pdfcore::filters::decode(&dict, &encoded).unwrap();
        })
    });
}

criterion_group!(benches, bench_flate_round_trip, bench_ascii85_round_trip);
criterion_main!(benches);
