//! Full-rewrite and incremental-update serialization.

mod serialize;

use std::collections::BTreeMap;

use crate::config::Eol;
use crate::document::Document;
use crate::encryption;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectId};
use crate::xref::{encode_stream_entry, Xref, XrefEntry, XrefStreamWidths};

/// Options controlling how `Document::save*` lays a document out on disk.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    pub use_xref_streams: bool,
    pub use_object_streams: bool,
}

impl SaveOptions {
    pub fn builder() -> SaveOptionsBuilder {
        SaveOptionsBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SaveOptionsBuilder {
    options: SaveOptions,
}

impl SaveOptionsBuilder {
    pub fn use_xref_streams(mut self, yes: bool) -> Self {
        self.options.use_xref_streams = yes;
        self
    }

    pub fn use_object_streams(mut self, yes: bool) -> Self {
        self.options.use_object_streams = yes;
        self
    }

    pub fn build(self) -> SaveOptions {
        self.options
    }
}

/// Serialize the whole document from scratch: header, every live object (in
/// object-number order, renumbered to a compact range starting at 1), a
/// fresh xref section, and a trailer.
pub fn write_full(document: &mut Document, options: Option<SaveOptions>) -> Result<Vec<u8>> {
    let options = options.unwrap_or(SaveOptions { use_xref_streams: document.config.write_xref_stream, use_object_streams: document.config.write_object_stream });
    let eol = document.config.eol;

    let mut out = Vec::new();
    out.extend_from_slice(format!("%PDF-{}\n", document.version).as_bytes());
    out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

    let renumbered = renumber_objects(document);
    let encrypt_id = renumbered.trailer.get(b"Encrypt").ok().and_then(|o| o.as_reference().ok());
    let encryption_state = document.encryption_state.clone();

    let objects: BTreeMap<ObjectId, Object> = if options.use_object_streams {
        pack_object_streams(&renumbered.objects, encrypt_id, document.config.object_stream_target_size)?
    } else {
        renumbered.objects
    };

    let mut offsets = BTreeMap::new();
    for (&id, obj) in &objects {
        let mut obj = obj.clone();
        if let Some(ref state) = encryption_state {
            if Some(id) != encrypt_id {
                encryption::encrypt_object(state, id, &mut obj).map_err(Error::Decryption)?;
            }
        }
        offsets.insert(id, out.len() as u32);
        serialize::write_indirect_object(&mut out, id.0, id.1, &obj, eol);
    }

    let max_id = objects.keys().map(|(n, _)| *n).max().unwrap_or(0);
    let size = max_id + 1;

    let mut xref = Xref::new(size);
    xref.insert(0, XrefEntry::Free { next: 0, generation: 65535 });
    for (&id, &offset) in &offsets {
        xref.insert(id.0, XrefEntry::Normal { offset, generation: id.1 });
    }

    let mut trailer = renumbered.trailer;
    trailer.set(b"Size", Object::Integer(size as i64));
    trailer.remove(b"Prev");

    let xref_start = out.len();
    if options.use_xref_streams {
        write_xref_stream(&mut out, &xref, &trailer, eol);
    } else {
        write_classical_xref(&mut out, &xref, size);
        out.extend_from_slice(b"trailer\n");
        let mut body = Vec::new();
        serialize::write_object(&mut body, &Object::Dictionary(trailer), eol);
        out.extend_from_slice(&body);
        out.push(b'\n');
    }
    out.extend_from_slice(format!("startxref\n{xref_start}\n%%EOF\n").as_bytes());

    Ok(out)
}

/// Result of compacting object numbers to a dense `1..=N` range.
struct Renumbered {
    objects: BTreeMap<ObjectId, Object>,
    trailer: Dictionary,
}

/// Assign every live object a fresh sequential id starting at 1 (preserving
/// relative order by the old id) and rewrite every `Object::Reference` in
/// the object graph and trailer to match.
fn renumber_objects(document: &Document) -> Renumbered {
    let mut mapping: BTreeMap<ObjectId, ObjectId> = BTreeMap::new();
    for (next, &old_id) in document.objects.keys().enumerate() {
        mapping.insert(old_id, (next as u32 + 1, 0));
    }

    let mut objects = BTreeMap::new();
    for (&old_id, obj) in &document.objects {
        let mut obj = obj.clone();
        rewrite_references(&mut obj, &mapping);
        objects.insert(mapping[&old_id], obj);
    }

    let mut trailer_obj = Object::Dictionary(document.trailer.clone());
    rewrite_references(&mut trailer_obj, &mapping);
    let Object::Dictionary(trailer) = trailer_obj else { unreachable!() };

    Renumbered { objects, trailer }
}

fn rewrite_references(obj: &mut Object, mapping: &BTreeMap<ObjectId, ObjectId>) {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = mapping.get(id) {
                *id = new_id;
            }
        }
        Object::Array(items) => {
            for item in items {
                rewrite_references(item, mapping);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                rewrite_references(value, mapping);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                rewrite_references(value, mapping);
            }
        }
        _ => {}
    }
}

fn pack_object_streams(objects: &BTreeMap<ObjectId, Object>, encrypt_id: Option<ObjectId>, target_size: usize) -> Result<BTreeMap<ObjectId, Object>> {
    // Streams, the Catalog, and the Encrypt dictionary can't go inside an
    // object stream; everything else is a packing candidate.
    let mut direct = BTreeMap::new();
    let mut candidates: Vec<(ObjectId, Object)> = Vec::new();
    for (&id, obj) in objects {
        let is_catalog = matches!(obj, Object::Dictionary(dict) if dict.has_type(b"Catalog"));
        let is_encrypt = Some(id) == encrypt_id;
        match obj {
            Object::Stream(_) => {
                direct.insert(id, obj.clone());
            }
            _ if is_catalog || is_encrypt => {
                direct.insert(id, obj.clone());
            }
            _ => candidates.push((id, obj.clone())),
        }
    }

    let target = target_size.max(1);
    for chunk in candidates.chunks(target) {
        let mut header = Vec::new();
        let mut body = Vec::new();
        for (id, obj) in chunk {
            let rel_offset = body.len();
            header.extend_from_slice(format!("{} {} ", id.0, rel_offset).as_bytes());
            serialize::write_object(&mut body, obj, Eol::Lf);
            body.push(b' ');
        }
        let first = header.len();
        let mut payload = header;
        payload.extend_from_slice(&body);

        let compressed = crate::filters::flate::encode(&payload);
        let mut dict = Dictionary::new();
        dict.set(b"Type", Object::Name(b"ObjStm".to_vec()));
        dict.set(b"N", Object::Integer(chunk.len() as i64));
        dict.set(b"First", Object::Integer(first as i64));
        dict.set(b"Filter", Object::Name(b"FlateDecode".to_vec()));
        let mut stream = crate::object::Stream::new(dict, compressed);
        stream.already_decrypted = true;

        let stream_id = direct.keys().map(|(n, _)| *n).chain(objects.keys().map(|(n, _)| *n)).max().unwrap_or(0) + 1;
        direct.insert((stream_id, 0), Object::Stream(stream));
    }

    Ok(direct)
}

fn write_classical_xref(out: &mut Vec<u8>, xref: &Xref, size: u32) {
    out.extend_from_slice(b"xref\n");
    out.extend_from_slice(format!("0 {size}\n").as_bytes());
    for n in 0..size {
        let row = match xref.get(n) {
            Some(XrefEntry::Normal { offset, generation }) => format!("{offset:010} {generation:05} n \n"),
            Some(XrefEntry::Free { next, generation }) => format!("{next:010} {generation:05} f \n"),
            _ => "0000000000 65535 f \n".to_string(),
        };
        out.extend_from_slice(row.as_bytes());
    }
}

fn write_xref_stream(out: &mut Vec<u8>, xref: &Xref, trailer: &Dictionary, eol: Eol) {
    let widths = XrefStreamWidths { type_field: 1, field2: 4, field3: 2 };
    let size = xref.size;
    let mut content = Vec::new();
    for n in 0..size {
        let entry = xref.get(n).copied().unwrap_or(XrefEntry::Free { next: 0, generation: 65535 });
        content.extend_from_slice(&encode_stream_entry(&entry, &widths));
    }
    let compressed = crate::filters::flate::encode(&content);

    let mut dict = trailer.clone();
    dict.set(b"Type", Object::Name(b"XRef".to_vec()));
    dict.set(b"W", Object::Array(vec![Object::Integer(1), Object::Integer(4), Object::Integer(2)]));
    dict.set(b"Index", Object::Array(vec![Object::Integer(0), Object::Integer(size as i64)]));
    dict.set(b"Filter", Object::Name(b"FlateDecode".to_vec()));
    dict.remove(b"Prev");

    let stream = crate::object::Stream::new(dict, compressed);
    let new_id = (size, 0);
    serialize::write_indirect_object(out, new_id.0, new_id.1, &Object::Stream(stream), eol);
}

/// Append an incremental update: the updated/added objects plus a new xref
/// section whose `Prev` points back into `original`.
pub fn write_incremental(document: &mut Document, original: &[u8]) -> Result<Vec<u8>> {
    let eol = document.config.eol;
    let mut out = original.to_vec();
    if out.last() != Some(&b'\n') {
        out.push(b'\n');
    }

    let encryption_state = document.encryption_state.clone();
    let encrypt_id = document.trailer.get(b"Encrypt").ok().and_then(|o| o.as_reference().ok());
    let mut offsets = BTreeMap::new();
    for (&id, obj) in &document.objects {
        let mut obj = obj.clone();
        if let Some(ref state) = encryption_state {
            if Some(id) != encrypt_id {
                encryption::encrypt_object(state, id, &mut obj).map_err(Error::Decryption)?;
            }
        }
        offsets.insert(id, out.len() as u32);
        serialize::write_indirect_object(&mut out, id.0, id.1, &obj, eol);
    }

    let size = document.objects.keys().map(|(n, _)| *n).max().map(|n| n + 1).unwrap_or(document.max_id + 1).max(document.max_id + 1);
    let mut xref = Xref::new(size);
    for (&id, &offset) in &offsets {
        xref.insert(id.0, XrefEntry::Normal { offset, generation: id.1 });
    }

    let mut trailer = document.trailer.clone();
    trailer.set(b"Size", Object::Integer(size as i64));
    trailer.set(b"Prev", Object::Integer(document.xref_start as i64));

    let xref_start = out.len();
    write_xref_stream(&mut out, &xref, &trailer, eol);
    out.extend_from_slice(format!("startxref\n{xref_start}\n%%EOF\n").as_bytes());

    Ok(out)
}
