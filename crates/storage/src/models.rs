//! Storage models.

/// Well-known content types used by stores and their callers.
pub mod content_type {
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const JSON: &str = "application/json; charset=utf-8";
    pub const TEXT: &str = "text/plain; charset=utf-8";

    /// Guess a content type from the extension of a key, for records that
    /// were placed in a store without going through [`put`](crate::StorageBackend::put).
    pub fn from_extension(key: &str) -> &'static str {
        let ext = key.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => JSON,
            Some("txt") => TEXT,
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            Some("avif") => "image/avif",
            Some("gif") => "image/gif",
            _ => OCTET_STREAM,
        }
    }
}

/// How a stored record should be interpreted by a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Opaque bytes.
    Binary,
    /// A character string (`text/*`).
    Text,
    /// A structured value (`application/json` or `*+json`).
    Json,
}

/// A value held in a store, along with the content type it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub data: Vec<u8>,
    pub content_type: String,
}
impl Record {
    pub fn new(data: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self { data: data.into(), content_type: content_type.into() }
    }

    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::new(data, content_type::OCTET_STREAM)
    }

    /// Classify the record by its content type (parameters such as
    /// `charset` are ignored).
    pub fn kind(&self) -> ValueKind {
        let essence = self.content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        if essence == "application/json" || essence.ends_with("+json") {
            ValueKind::Json
        } else if essence.starts_with("text/") {
            ValueKind::Text
        } else {
            ValueKind::Binary
        }
    }
}
