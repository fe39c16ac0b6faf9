use serde::{Deserialize, Serialize};

// ============================================================================
// Captures
// ============================================================================

/// A stored reference image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capture {
    pub name: String,
    pub url: String,
    pub size: u64,
    /// RFC 3339, millisecond precision, UTC.
    pub created_at: String,
}

/// Body of `POST /api/captures`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadCaptureInput {
    /// Base64 payload, optionally prefixed with a `data:<mime>;base64,` header.
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Response of `POST /api/captures`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureCreated {
    pub ok: bool,
    pub name: String,
    pub url: String,
}

/// An image waiting to be uploaded (from a file, a paste, a drop or a URL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl PendingImage {
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}
