use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// `(object number, generation number)`.
pub type ObjectId = (u32, u16);

/// A PDF name, stored already-unescaped (canonical form).
pub type NameBytes = Vec<u8>;

/// Insertion-order-preserving dictionary keyed by Name.
///
/// Order only matters for serialization aesthetics; lookups are by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary(IndexMap<NameBytes, Object>);

impl Dictionary {
    pub fn new() -> Self {
        Dictionary(IndexMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NameBytes, &Object)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&NameBytes, &mut Object)> {
        self.0.iter_mut()
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &[u8]) -> Result<&Object> {
        self.0.get(key).ok_or_else(|| Error::Internal(format!("missing key /{}", String::from_utf8_lossy(key))))
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Result<&mut Object> {
        self.0
            .get_mut(key)
            .ok_or_else(|| Error::Internal(format!("missing key /{}", String::from_utf8_lossy(key))))
    }

    /// Setting a `Null` value is equivalent to removing the key.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<NameBytes>,
        V: Into<Object>,
    {
        let key = key.into();
        let value = value.into();
        if matches!(value, Object::Null) {
            self.0.shift_remove(&key);
        } else {
            self.0.insert(key, value);
        }
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Object> {
        self.0.shift_remove(key)
    }

    /// `/Type` entry as bytes, if present.
    pub fn get_type(&self) -> Result<&[u8]> {
        self.get(b"Type")?.as_name()
    }

    pub fn has_type(&self, type_name: &[u8]) -> bool {
        matches!(self.get(b"Type"), Ok(Object::Name(n)) if n == type_name)
    }
}

/// A PDF stream: a dictionary plus a byte payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    /// Raw (still-filtered) content as found on disk, or set by a writer.
    pub content: Vec<u8>,
    /// Decoded content cache; `None` until `decode_content` succeeds.
    pub(crate) decoded: Option<Vec<u8>>,
    /// Byte offset (within the source buffer) where the raw payload begins.
    /// `None` for streams constructed in memory.
    pub start_position: Option<usize>,
    /// True once the stream's strings have been through the encryption layer.
    pub(crate) already_decrypted: bool,
}

impl Stream {
    pub fn new(dict: Dictionary, content: Vec<u8>) -> Self {
        let mut dict = dict;
        dict.set(b"Length", Object::Integer(content.len() as i64));
        Stream { dict, content, decoded: None, start_position: None, already_decrypted: false }
    }

    pub fn set_content(&mut self, content: Vec<u8>) {
        self.dict.set(b"Length", Object::Integer(content.len() as i64));
        self.content = content;
        self.decoded = None;
    }

    /// Run the stream's `Filter`/`DecodeParms` chain, caching the result.
    pub fn decompressed_content(&self) -> Result<Vec<u8>> {
        if let Some(ref d) = self.decoded {
            return Ok(d.clone());
        }
        crate::filters::decode(&self.dict, &self.content)
    }

    pub fn decode_content(&mut self) -> Result<&[u8]> {
        if self.decoded.is_none() {
            let decoded = crate::filters::decode(&self.dict, &self.content)?;
            self.decoded = Some(decoded);
        }
        Ok(self.decoded.as_deref().unwrap())
    }
}

/// The PDF object model: eleven tagged kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    /// Canonicalized name (escapes resolved).
    Name(NameBytes),
    /// Opaque byte string, still in `(...)`-escaped form as read; see
    /// `as_str`/`as_bytes` for the unescaped view.
    String(Vec<u8>, StringFormat),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Literal,
    Hexadecimal,
}

impl Object {
    pub fn string_literal<S: Into<Vec<u8>>>(s: S) -> Self {
        Object::String(s.into(), StringFormat::Literal)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::Name(_) => "Name",
            Object::String(..) => "String",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream(_) => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    fn wrong_type(&self, expected: &'static str) -> Error {
        Error::WrongObjectType { expected, found: self.type_name() }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Object::Boolean(b) => Ok(*b),
            _ => Err(self.wrong_type("Boolean")),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Object::Integer(i) => Ok(*i),
            Object::Real(f) => Ok(*f as i64),
            _ => Err(self.wrong_type("Integer")),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Object::Integer(i) => Ok(*i as f64),
            Object::Real(f) => Ok(*f),
            _ => Err(self.wrong_type("Real")),
        }
    }

    pub fn as_name(&self) -> Result<&[u8]> {
        match self {
            Object::Name(n) => Ok(n),
            _ => Err(self.wrong_type("Name")),
        }
    }

    pub fn as_name_str(&self) -> Result<&str> {
        std::str::from_utf8(self.as_name()?).map_err(|e| Error::Internal(e.to_string()))
    }

    pub fn as_str(&self) -> Result<&[u8]> {
        match self {
            Object::String(s, _) => Ok(s),
            _ => Err(self.wrong_type("String")),
        }
    }

    pub fn as_array(&self) -> Result<&[Object]> {
        match self {
            Object::Array(a) => Ok(a),
            _ => Err(self.wrong_type("Array")),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Object>> {
        match self {
            Object::Array(a) => Ok(a),
            _ => Err(self.wrong_type("Array")),
        }
    }

    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(&s.dict),
            _ => Err(self.wrong_type("Dictionary")),
        }
    }

    pub fn as_dict_mut(&mut self) -> Result<&mut Dictionary> {
        match self {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(&mut s.dict),
            _ => Err(self.wrong_type("Dictionary")),
        }
    }

    pub fn as_stream(&self) -> Result<&Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            _ => Err(self.wrong_type("Stream")),
        }
    }

    pub fn as_stream_mut(&mut self) -> Result<&mut Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            _ => Err(self.wrong_type("Stream")),
        }
    }

    pub fn as_reference(&self) -> Result<ObjectId> {
        match self {
            Object::Reference(id) => Ok(*id),
            _ => Err(self.wrong_type("Reference")),
        }
    }
}

impl From<bool> for Object {
    fn from(b: bool) -> Self {
        Object::Boolean(b)
    }
}
impl From<i64> for Object {
    fn from(i: i64) -> Self {
        Object::Integer(i)
    }
}
impl From<f64> for Object {
    fn from(f: f64) -> Self {
        Object::Real(f)
    }
}
impl From<String> for Object {
    fn from(s: String) -> Self {
        Object::string_literal(s.into_bytes())
    }
}
impl From<&str> for Object {
    fn from(s: &str) -> Self {
        Object::Name(s.as_bytes().to_vec())
    }
}
impl From<Vec<Object>> for Object {
    fn from(a: Vec<Object>) -> Self {
        Object::Array(a)
    }
}
impl From<Dictionary> for Object {
    fn from(d: Dictionary) -> Self {
        Object::Dictionary(d)
    }
}
impl From<Stream> for Object {
    fn from(s: Stream) -> Self {
        Object::Stream(s)
    }
}
impl From<ObjectId> for Object {
    fn from(id: ObjectId) -> Self {
        Object::Reference(id)
    }
}

/// Canonicalize a PDF name's bytes: unescape `#xx` sequences.
pub fn unescape_name(raw: &[u8]) -> Result<NameBytes> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            let hi = (raw[i + 1] as char).to_digit(16);
            let lo = (raw[i + 2] as char).to_digit(16);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(raw[i]);
        i += 1;
    }
    Ok(out)
}

/// Re-escape a canonical name's bytes for serialization: any byte outside
/// `0x21..=0x7E` (printable, non-whitespace) or equal to `#` is hex-escaped.
pub fn escape_name(name: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len());
    for &b in name {
        let regular = (0x21..=0x7E).contains(&b)
            && b != b'#'
            && b != b'/'
            && b != b'('
            && b != b')'
            && b != b'<'
            && b != b'>'
            && b != b'['
            && b != b']'
            && b != b'{'
            && b != b'}'
            && b != b'%';
        if regular {
            out.push(b);
        } else {
            out.extend_from_slice(format!("#{b:02X}").as_bytes());
        }
    }
    out
}

/// Construct a `Dictionary` with a literal, ordered set of entries.
#[macro_export]
macro_rules! dictionary {
    () => { $crate::object::Dictionary::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut dict = $crate::object::Dictionary::new();
        $(dict.set($key, $value);)+
        dict
    }};
}

/// A `BTreeMap`-ordered object store, used for pending writer object tables
/// and object-stream contents alike.
pub type ObjectMap = BTreeMap<ObjectId, Object>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dictionary_null_value_is_key_removal() {
        let mut a = Dictionary::new();
        a.set(b"K".to_vec(), Object::Integer(1));
        a.set(b"K".to_vec(), Object::Null);
        assert!(!a.has(b"K"));
        assert_eq!(a, Dictionary::new());
    }

    #[test]
    fn name_escape_roundtrip() {
        let raw = b"Name#20With#20Spaces";
        let canon = unescape_name(raw).unwrap();
        assert_eq!(canon, b"Name With Spaces");
        let reescaped = escape_name(&canon);
        assert_eq!(reescaped, b"Name#20With#20Spaces");
    }

    #[test]
    fn dictionary_macro_builds_in_order() {
        let dict = dictionary! {
            b"Type" => "Catalog",
            b"Count" => Object::Integer(3),
        };
        let keys: Vec<_> = dict.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![b"Type".to_vec(), b"Count".to_vec()]);
    }
}
