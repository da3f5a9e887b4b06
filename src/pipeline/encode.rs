//! File encoding: raw image bytes → base64 [`EncodedFile`].
//!
//! Vision APIs accept images as base64 strings embedded in the JSON request
//! body, tagged with a MIME type. The MIME type is taken from the detected
//! format (magic bytes), never from the file extension, and only the three
//! formats the upload form offers are accepted: PNG, JPEG and WEBP.

use crate::error::FacilitatorError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// A selected file, ready to attach to a model request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedFile {
    /// Standard base64 of the file bytes (no `data:` prefix).
    pub payload: String,
    /// e.g. `image/jpeg`.
    pub mime_type: String,
    /// Original file name, for display.
    pub name: String,
}

impl fmt::Debug for EncodedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

impl EncodedFile {
    /// `data:` URI form, for previews.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.payload)
    }

    /// Decoded size in bytes.
    pub fn byte_len(&self) -> usize {
        // base64 expands 3 bytes to 4 chars; padding shaves the tail
        let padding = self.payload.bytes().rev().take_while(|&b| b == b'=').count();
        ((self.payload.len() / 4) * 3).saturating_sub(padding)
    }
}

/// Encode in-memory image bytes.
///
/// Rejects empty input, formats other than PNG/JPEG/WEBP, and data whose
/// header matches but which does not decode.
pub fn encode_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<EncodedFile, FacilitatorError> {
    let name = name.into();
    if bytes.is_empty() {
        return Err(FacilitatorError::EmptyFile { name });
    }

    let format = image::guess_format(bytes).map_err(|_| FacilitatorError::UnsupportedImage {
        name: name.clone(),
        detected: "unknown format".into(),
    })?;
    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP) {
        return Err(FacilitatorError::UnsupportedImage {
            name,
            detected: format!("{format:?}"),
        });
    }

    let img = image::load_from_memory_with_format(bytes, format).map_err(|e| {
        FacilitatorError::CorruptImage {
            name: name.clone(),
            detail: e.to_string(),
        }
    })?;

    let payload = STANDARD.encode(bytes);
    debug!(
        "Encoded {} ({}x{} {:?}) → {} bytes base64",
        name,
        img.width(),
        img.height(),
        format,
        payload.len()
    );

    Ok(EncodedFile {
        payload,
        mime_type: format.to_mime_type().to_string(),
        name,
    })
}

/// Read and encode an image file from disk.
pub async fn encode_file(path: impl AsRef<Path>) -> Result<EncodedFile, FacilitatorError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => FacilitatorError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => FacilitatorError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => FacilitatorError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    encode_bytes(display_name(path), &bytes)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
