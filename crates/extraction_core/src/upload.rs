use std::fmt;

use thiserror::Error;

/// Largest document the extraction service accepts, in bytes.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// MIME types the extraction service can read.
pub const ALLOWED_MIME_TYPES: [&str; 5] = [
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/bmp",
];

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// A file the user picked for extraction, before anything is sent.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Builds an upload whose MIME type is inferred from the file extension.
    pub fn from_file_name(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_type_for_file_name(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

// Document bodies can be megabytes; keep them out of debug output.
impl fmt::Debug for DocumentUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentUpload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid file type {mime_type}; upload a PDF or PNG, JPEG, GIF or BMP image")]
    InvalidType { mime_type: String },
    #[error("file is {actual} bytes, which exceeds the {max_bytes} byte limit")]
    TooLarge { max_bytes: u64, actual: u64 },
    #[error("selected file is empty")]
    Empty,
}

/// Checks an upload against the service's type and size limits.
///
/// Runs before any request is built; a failing upload never reaches the network.
pub fn validate(upload: &DocumentUpload) -> Result<(), ValidationError> {
    if !is_mime_type_allowed(&upload.mime_type) {
        return Err(ValidationError::InvalidType {
            mime_type: upload.mime_type.clone(),
        });
    }
    let size = upload.size_bytes();
    if size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::TooLarge {
            max_bytes: MAX_UPLOAD_BYTES,
            actual: size,
        });
    }
    if size == 0 {
        return Err(ValidationError::Empty);
    }
    Ok(())
}

pub fn is_mime_type_allowed(mime_type: &str) -> bool {
    let essence = mime_type.split(';').next().unwrap_or(mime_type).trim();
    ALLOWED_MIME_TYPES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(essence))
}

pub fn mime_type_for_file_name(file_name: &str) -> &'static str {
    let extension = match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return FALLBACK_MIME_TYPE,
    };
    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => FALLBACK_MIME_TYPE,
    }
}
