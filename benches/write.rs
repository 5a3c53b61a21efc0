use criterion::{criterion_group, criterion_main, Criterion};
use pdfcore::writer::SaveOptions;
use pdfcore::Document;

fn sample_document(page_count: usize) -> Document {
    let mut doc = Document::new();
    // Reserve the Pages object number up front (content referencing it needs
    // to exist before its Kids array is known) and fill it in afterward.
    let pages_id = doc.add_object(pdfcore::dictionary! { b"Type" => "Pages" });
    let mut kids = Vec::new();

    for _ in 0..page_count {
        let content_id = doc.add_object(pdfcore::Stream::new(pdfcore::Dictionary::new(), b"BT (page) Tj ET".to_vec()));
        let page_id = doc.add_object(pdfcore::dictionary! {
            b"Type" => "Page",
            b"Parent" => pdfcore::Object::Reference(pages_id),
            b"Contents" => pdfcore::Object::Reference(content_id),
        });
        kids.push(pdfcore::Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        pdfcore::dictionary! {
            b"Type" => "Pages",
            b"Kids" => pdfcore::Object::Array(kids),
            b"Count" => page_count as i64,
        }
        .into(),
    );
    let catalog_id = doc.add_object(pdfcore::dictionary! { b"Type" => "Catalog", b"Pages" => pdfcore::Object::Reference(pages_id) });
    doc.trailer.set(b"Root", pdfcore::Object::Reference(catalog_id));
    doc
}

fn bench_write_full_classical(c: &mut Criterion) {
    let mut doc = sample_document(200);
    c.bench_function("write_full_classical_xref", |b| {
        b.iter(|| {
            doc.save_to_bytes().unwrap();
        })
    });
}

fn bench_write_full_with_object_streams(c: &mut Criterion) {
    let mut doc = sample_document(200);
    let options = SaveOptions::builder().use_xref_streams(true).use_object_streams(true).build();
    c.bench_function("write_full_packed_object_streams", |b| {
        b.iter(|| {
            pdfcore::writer::write_full(&mut doc, Some(options.clone())).unwrap();
        })
    });
}

criterion_group!(benches, bench_write_full_classical, bench_write_full_with_object_streams);
criterion_main!(benches);
