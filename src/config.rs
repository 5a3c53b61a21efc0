/// Validation strictness policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    Strict,
    #[default]
    Relaxed,
    None,
}

/// End-of-line style used when writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Eol {
    Lf,
    Cr,
    #[default]
    CrLf,
}

impl Eol {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Eol::Lf => b"\n",
            Eol::Cr => b"\r",
            Eol::CrLf => b"\r\n",
        }
    }
}

/// Preferred encryption key length in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLength {
    Bits40,
    Bits128,
    Bits256,
}

/// Every option recognized by the core, gathered into one
/// configuration value consumed by both the reader and the writer.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    pub validation_mode: ValidationMode,
    /// Enable object-stream + xref-stream reading (PDF >= 1.5).
    pub reader_15: bool,
    /// Force-decode every stream on read, for diagnostics.
    pub decode_all_streams: bool,
    pub eol: Eol,
    pub write_object_stream: bool,
    pub write_xref_stream: bool,
    pub encrypt_using_aes: bool,
    pub encrypt_key_length: KeyLength,
    /// P-flag permission bitmap applied when creating a new Encrypt dict.
    pub permissions: u32,
    pub user_password: Option<String>,
    pub owner_password: Option<String>,
    /// Maximum indirect-reference chain depth before `ReferenceCycle`.
    pub max_reference_depth: usize,
    /// Target object count per packed object stream on full rewrite.
    pub object_stream_target_size: usize,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        DocumentConfig {
            validation_mode: ValidationMode::default(),
            reader_15: true,
            decode_all_streams: false,
            eol: Eol::default(),
            write_object_stream: false,
            write_xref_stream: false,
            encrypt_using_aes: true,
            encrypt_key_length: KeyLength::Bits128,
            permissions: 0xFFFF_FFFC,
            user_password: None,
            owner_password: None,
            max_reference_depth: 32,
            object_stream_target_size: 100,
        }
    }
}
