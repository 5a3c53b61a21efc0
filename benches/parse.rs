use criterion::{criterion_group, criterion_main, Criterion};
use pdfcore::Document;

/// A single-page classical-xref document with computed offsets, large enough
/// to exercise the object parser and filter pipeline without a binary asset.
fn sample_pdf_bytes(repeat_content: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"%PDF-1.5\n");
    let mut offsets = [0u32; 5];

    offsets[1] = buf.len() as u32;
    buf.extend_from_slice(b"1 0 obj<</Type/Catalog/Pages 2 0 R>>endobj\n");

    offsets[2] = buf.len() as u32;
    buf.extend_from_slice(b"2 0 obj<</Type/Pages/Kids[3 0 R]/Count 1>>endobj\n");

    offsets[3] = buf.len() as u32;
    buf.extend_from_slice(
        b"3 0 obj<</Type/Page/Parent 2 0 R/MediaBox[0 0 612 792]/Contents 4 0 R/Resources<<>>>>endobj\n",
    );

    offsets[4] = buf.len() as u32;
    let content = "BT /F1 12 Tf (Hello, world) Tj ET\n".repeat(repeat_content);
    buf.extend_from_slice(format!("4 0 obj<</Length {}>>stream\n", content.len()).as_bytes());
    buf.extend_from_slice(content.as_bytes());
    buf.extend_from_slice(b"\nendstream endobj\n");

    let xref_start = buf.len();
    buf.extend_from_slice(b"xref\n0 5\n0000000000 65535 f \n");
    for &offset in &offsets[1..] {
        buf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    buf.extend_from_slice(b"trailer\n<</Root 1 0 R/Size 5>>\nstartxref\n");
    buf.extend_from_slice(format!("{xref_start}\n%%EOF").as_bytes());
    buf
}

fn bench_load_small(c: &mut Criterion) {
    let buffer = sample_pdf_bytes(1);
    c.bench_function("load_small_document", |b| {
        b.iter(|| {
            Document::load_mem(&buffer).unwrap();
        })
    });
}

fn bench_load_large_content_stream(c: &mut Criterion) {
    let buffer = sample_pdf_bytes(2000);
    c.bench_function("load_large_content_stream", |b| {
        b.iter(|| {
            Document::load_mem(&buffer).unwrap();
        })
    });
}

fn bench_decode_content_stream(c: &mut Criterion) {
    let buffer = sample_pdf_bytes(500);
    let doc = Document::load_mem(&buffer).unwrap();

    c.bench_function("decode_content_stream", |b| {
        b.iter(|| {
            let stream = doc.get_object((4, 0)).unwrap().as_stream().unwrap();
            stream.decompressed_content().unwrap();
        })
    });
}

criterion_group!(benches, bench_load_small, bench_load_large_content_stream, bench_decode_content_stream);
criterion_main!(benches);
