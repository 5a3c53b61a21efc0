use std::fmt;

use crate::object::ObjectId;

/// Top-level error taxonomy.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("xref error: {0}")]
    Xref(#[from] XrefError),

    #[error("unsupported feature: {0}")]
    Unsupported(#[from] UnsupportedFeature),

    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal invariant violated: {0}")]
    Internal(String),

    #[error("xref table has no entry for the requested object")]
    MissingXrefEntry,

    #[error("object {0:?} not found")]
    ObjectNotFound(ObjectId),

    #[error("reference cycle detected resolving object {0:?}")]
    ReferenceCycle(ObjectId),

    #[error("invalid byte offset {0}")]
    InvalidOffset(usize),

    #[error("invalid stream: {0}")]
    InvalidStream(String),

    #[error("numeric cast failed: {0}")]
    NumericCast(String),

    #[error("wrong object type: expected {expected}, found {found}")]
    WrongObjectType { expected: &'static str, found: &'static str },

    #[error("invalid password")]
    InvalidPassword,

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("feature not implemented: {0}")]
    Unimplemented(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("file does not start with a valid %PDF-M.N header")]
    InvalidFileHeader,
    #[error("unbalanced parentheses in string literal")]
    UnbalancedParens,
    #[error("invalid hex string")]
    InvalidHexString,
    #[error("invalid name escape")]
    InvalidNameEscape,
    #[error("unterminated array")]
    UnterminatedArray,
    #[error("unterminated dictionary")]
    UnterminatedDictionary,
    #[error("dictionary key must be a Name")]
    NonNameDictionaryKey,
    #[error("duplicate dictionary key under strict validation")]
    DuplicateDictionaryKey,
    #[error("stream dictionary missing or has a broken Length entry")]
    BrokenStreamLength,
    #[error("expected 'endstream' keyword not found")]
    MissingEndstream,
    #[error("expected 'endobj' keyword not found")]
    MissingEndobj,
    #[error("invalid EOL after 'stream' keyword")]
    InvalidStreamEol,
    #[error("object parsing exceeded the maximum nesting/bracket depth")]
    TooDeeplyNested,
    #[error("malformed indirect object header")]
    InvalidIndirectObjectHeader,
    #[error("'{n} {g} R' is not a valid indirect reference under strict validation")]
    InvalidIndirectReference { n: u32, g: u16 },
    #[error("xref table is malformed")]
    InvalidXref,
    #[error("numeric literal overflowed and was truncated to 0")]
    NumericOverflow,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum XrefError {
    #[error("could not locate 'startxref'")]
    Start,
    #[error("'Prev' offset in trailer is out of range")]
    PrevStart,
    #[error("'XRefStm' offset in trailer is out of range")]
    StreamStart,
    #[error("xref stream 'W' array is invalid")]
    InvalidWidthArray,
    #[error("xref stream or trailer is missing 'Size'")]
    MissingSize,
    #[error("xref table could not be repaired by scanning")]
    RepairFailed,
    #[error("free-list contains a loop")]
    FreeListLoop,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedFeature {
    #[error("unrecognized stream filter '{0}'")]
    Filter(String),
    #[error("unsupported encryption revision V{0}")]
    EncryptionRevision(u8),
    #[error("unsupported key length {0} bits")]
    KeyLength(u32),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("wrong or missing password")]
    WrongPassword,
    #[error("document requires a password but none was supplied")]
    PasswordRequired,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub rule: &'static str,
    pub object: Option<ObjectId>,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object {
            Some(id) => write!(f, "[{}] object {:?}: {}", self.rule, id, self.message),
            None => write!(f, "[{}] {}", self.rule, self.message),
        }
    }
}
