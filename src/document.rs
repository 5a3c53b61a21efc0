use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::cancellation::CancellationToken;
use crate::config::DocumentConfig;
use crate::encryption::{self, EncryptionState};
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectId, ObjectMap};
use crate::reader::Reader;
use crate::xref::Xref;

/// The in-memory object model of a parsed PDF file: trailer, cross-reference
/// table, and the indirect-object table itself (populated lazily or eagerly
/// depending on how the document was loaded).
#[derive(Debug, Clone)]
pub struct Document {
    /// The optional 4-byte high-bit comment following the header.
    pub binary_mark: Vec<u8>,
    /// Byte offset of the xref section the trailer's `startxref` pointed at.
    pub xref_start: usize,
    /// `"M.N"` from the `%PDF-M.N` header.
    pub version: String,
    /// Highest valid object number (`Size - 1`).
    pub max_id: u32,
    pub trailer: Dictionary,
    pub reference_table: Xref,
    pub objects: ObjectMap,
    pub encryption_state: Option<EncryptionState>,
    pub config: DocumentConfig,
    pub cancellation: CancellationToken,
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Document {
            binary_mark: Vec::new(),
            xref_start: 0,
            version: "1.7".to_string(),
            max_id: 0,
            trailer: Dictionary::new(),
            reference_table: Xref::new(0),
            objects: BTreeMap::new(),
            encryption_state: None,
            config: DocumentConfig::default(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_config(config: DocumentConfig) -> Self {
        Document { config, ..Document::new() }
    }

    /// Parse a whole PDF file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Document> {
        let buffer = fs::read(path).map_err(Error::Io)?;
        Document::load_mem(&buffer)
    }

    /// Parse a whole PDF already held in memory.
    pub fn load_mem(buffer: &[u8]) -> Result<Document> {
        Document::load_mem_with_password(buffer, None)
    }

    pub fn load_with_password<P: AsRef<Path>>(path: P, password: &str) -> Result<Document> {
        let buffer = fs::read(path).map_err(Error::Io)?;
        Document::load_mem_with_password(&buffer, Some(password.to_string()))
    }

    fn load_mem_with_password(buffer: &[u8], password: Option<String>) -> Result<Document> {
        let reader = Reader {
            buffer,
            document: Document::new(),
            encryption_state: None,
            password,
            raw_objects: std::collections::HashMap::new(),
        };
        reader.read(None)
    }

    /// Read title/author/page-count metadata without materializing every
    /// object, for a quick scan of a large file.
    pub fn load_metadata<P: AsRef<Path>>(path: P) -> Result<crate::reader::PdfMetadata> {
        let buffer = fs::read(path).map_err(Error::Io)?;
        let reader = Reader {
            buffer: &buffer,
            document: Document::new(),
            encryption_state: None,
            password: None,
            raw_objects: std::collections::HashMap::new(),
        };
        reader.read_metadata()
    }

    pub fn load_metadata_with_password<P: AsRef<Path>>(path: P, password: &str) -> Result<crate::reader::PdfMetadata> {
        let buffer = fs::read(path).map_err(Error::Io)?;
        let reader = Reader {
            buffer: &buffer,
            document: Document::new(),
            encryption_state: None,
            password: Some(password.to_string()),
            raw_objects: std::collections::HashMap::new(),
        };
        reader.read_metadata()
    }

    /// Verify `password` against the document's Standard Security Handler
    /// and, if it's a match, cache the derived file key.
    pub fn authenticate_password(&self, password: &str) -> Result<()> {
        if self.trailer.get(b"Encrypt").is_err() {
            return if password.is_empty() { Ok(()) } else { Ok(()) };
        }
        EncryptionState::decode(self, password).map(|_| ())
    }

    /// Direct (non-cycle-checked) lookup of an already-loaded object.
    pub fn get_object(&self, id: ObjectId) -> Result<&Object> {
        self.objects.get(&id).ok_or(Error::ObjectNotFound(id))
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        self.objects.get_mut(&id).ok_or(Error::ObjectNotFound(id))
    }

    /// Follow `obj` if it's a `Reference`, returning the resolved id (same as
    /// the input id for a direct object) and a clone of the target object.
    /// Bounded by `config.max_reference_depth` to guard against cycles.
    pub fn dereference(&self, obj: &Object) -> Result<(Option<ObjectId>, Object)> {
        let mut current = obj.clone();
        let mut current_id = None;
        let mut seen = HashSet::new();
        for _ in 0..self.config.max_reference_depth {
            match current {
                Object::Reference(id) => {
                    if !seen.insert(id) {
                        return Err(Error::ReferenceCycle(id));
                    }
                    current = self.get_object(id)?.clone();
                    current_id = Some(id);
                }
                other => return Ok((current_id, other)),
            }
        }
        Err(Error::ReferenceCycle(current_id.unwrap_or((0, 0))))
    }

    /// Resolve `id` and require the result to be a `Dictionary` (or a
    /// stream's dictionary).
    pub fn get_dictionary(&self, id: ObjectId) -> Result<&Dictionary> {
        self.get_object(id)?.as_dict()
    }

    pub fn catalog(&self) -> Result<&Dictionary> {
        let root = self.trailer.get(b"Root")?.as_reference()?;
        self.get_dictionary(root)
    }

    pub fn info(&self) -> Option<&Dictionary> {
        let info_ref = self.trailer.get(b"Info").ok()?.as_reference().ok()?;
        self.get_dictionary(info_ref).ok()
    }

    /// Flatten the page tree rooted at `/Root/Pages` into `(object id -> page
    /// dictionary id)`. Values equal keys; the map's ordering is page order
    /// as encountered via `Kids`, not object-number order.
    pub fn get_pages(&self) -> BTreeMap<u32, ObjectId> {
        let mut pages = BTreeMap::new();
        if let Ok(root) = self.catalog().and_then(|c| c.get(b"Pages")).and_then(Object::as_reference) {
            let mut seen = HashSet::new();
            let _ = self.collect_pages(root, &mut pages, &mut seen);
        }
        pages
    }

    fn collect_pages(&self, id: ObjectId, out: &mut BTreeMap<u32, ObjectId>, seen: &mut HashSet<ObjectId>) -> Result<()> {
        if !seen.insert(id) {
            return Err(Error::ReferenceCycle(id));
        }
        let dict = self.get_dictionary(id)?;
        match dict.get_type() {
            Ok(t) if t == b"Pages" => {
                if let Ok(kids) = dict.get(b"Kids").and_then(Object::as_array) {
                    for kid in kids {
                        if let Ok(kid_id) = kid.as_reference() {
                            let _ = self.collect_pages(kid_id, out, seen);
                        }
                    }
                }
                Ok(())
            }
            _ => {
                out.insert(id.0, id);
                Ok(())
            }
        }
    }

    /// Resolve a page's inheritable `Resources`/`MediaBox`/etc. entry,
    /// walking up `Parent` links when the page dictionary doesn't carry it.
    pub fn get_inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<Object> {
        let mut current = page_id;
        let mut seen = HashSet::new();
        loop {
            if !seen.insert(current) {
                return None;
            }
            let dict = self.get_dictionary(current).ok()?;
            if let Ok(value) = dict.get(key) {
                return Some(value.clone());
            }
            current = dict.get(b"Parent").ok()?.as_reference().ok()?;
        }
    }

    /// Re-encrypt (if the document was decrypted on load) and serialize the
    /// whole document to `path`, always performing a full rewrite.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let bytes = crate::writer::write_full(self, None)?;
        fs::write(path, bytes).map_err(Error::Io)
    }

    pub fn save_with_options<P: AsRef<Path>>(&mut self, path: P, options: crate::writer::SaveOptions) -> Result<()> {
        let bytes = crate::writer::write_full(self, Some(options))?;
        fs::write(path, bytes).map_err(Error::Io)
    }

    /// Append an incremental update (new/changed objects plus a fresh
    /// xref/trailer linked via `Prev`) to the *original* file bytes.
    pub fn save_incremental<P: AsRef<Path>>(&mut self, original: &[u8], path: P) -> Result<()> {
        let bytes = crate::writer::write_incremental(self, original)?;
        fs::write(path, bytes).map_err(Error::Io)
    }

    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>> {
        crate::writer::write_full(self, None)
    }

    /// Set up a fresh `Encrypt` dictionary in the trailer and cache the
    /// derived encryption state for `password`. Objects stay plaintext in
    /// memory; the writer applies `encryption::encrypt_object` to each one
    /// (skipping the Encrypt dictionary itself) at save time.
    pub fn encrypt(&mut self, owner_password: &str, user_password: &str) -> Result<()> {
        if self.trailer.get(b"ID").is_err() {
            let id: [u8; 16] = rand::random();
            self.trailer.set(b"ID", Object::Array(vec![Object::string_literal(id.to_vec()), Object::string_literal(id.to_vec())]));
        }
        let (state, encrypt_dict) = encryption::setup_new_encryption(self, owner_password, user_password)?;
        let encrypt_id = self.next_object_id();
        self.objects.insert(encrypt_id, Object::Dictionary(encrypt_dict));
        self.trailer.set(b"Encrypt", Object::Reference(encrypt_id));
        self.encryption_state = Some(state);
        Ok(())
    }

    pub fn next_object_id(&self) -> ObjectId {
        (self.objects.keys().map(|(n, _)| *n).max().unwrap_or(0) + 1, 0)
    }

    pub fn add_object<O: Into<Object>>(&mut self, object: O) -> ObjectId {
        let id = self.next_object_id();
        self.objects.insert(id, object.into());
        id
    }
}
