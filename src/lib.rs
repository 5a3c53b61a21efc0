//! A PDF (ISO 32000) object-model and cross-reference engine: lexer and
//! parser, indirect-object table backed by classical and compressed xref,
//! the stream filter pipeline, the Standard Security Handler, and a writer
//! that can do a full rewrite or an incremental update.

pub mod cancellation;
pub mod config;
pub mod document;
pub mod encryption;
pub mod error;
pub mod filters;
pub mod object;
mod object_stream;
pub mod parser;
pub mod reader;
pub mod validator;
pub mod writer;
pub mod xref;

pub use cancellation::CancellationToken;
pub use config::{DocumentConfig, Eol, KeyLength, ValidationMode};
pub use document::Document;
pub use encryption::{CryptMethod, EncryptionState, Permissions};
pub use error::{AuthError, Error, ParseError, Result, UnsupportedFeature, ValidationError, XrefError};
pub use object::{Dictionary, NameBytes, Object, ObjectId, ObjectMap, Stream, StringFormat};
pub use reader::Reader;
pub use validator::{Finding, Report, Severity, Validator};
pub use xref::{Xref, XrefEntry};
