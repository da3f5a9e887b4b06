//! Input resolution: turn user-supplied locations into pipeline inputs.
//!
//! The image may be a local path or an HTTP(S) URL; URLs are downloaded into
//! memory (images are small) and then go through the same encoder as local
//! files, so validation is identical. Document text may be given inline, read
//! from a file, or read from stdin with `-`.

use crate::error::FacilitatorError;
use crate::pipeline::encode::{self, EncodedFile};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load and encode an image from a local path or URL.
pub async fn resolve_image(input: &str, timeout_secs: u64) -> Result<EncodedFile, FacilitatorError> {
    if is_url(input) {
        let bytes = download_url(input, timeout_secs).await?;
        encode::encode_bytes(url_file_name(input), &bytes)
    } else {
        debug!("Resolving local image: {}", input);
        encode::encode_file(input).await
    }
}

/// Where the document text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Text passed directly.
    Inline(String),
    /// Path to a UTF-8 text file.
    File(PathBuf),
    /// Read everything from standard input.
    Stdin,
}

impl DocumentSource {
    /// Interpret a CLI-style argument: `-` means stdin, anything else a path.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            DocumentSource::Stdin
        } else {
            DocumentSource::File(PathBuf::from(arg))
        }
    }

    /// Load the text. No trimming or normalisation is applied.
    pub async fn load(&self) -> Result<String, FacilitatorError> {
        match self {
            DocumentSource::Inline(text) => Ok(text.clone()),
            DocumentSource::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| match e.kind() {
                        std::io::ErrorKind::NotFound => {
                            FacilitatorError::FileNotFound { path: path.clone() }
                        }
                        std::io::ErrorKind::PermissionDenied => {
                            FacilitatorError::PermissionDenied { path: path.clone() }
                        }
                        _ => FacilitatorError::ReadFailed {
                            path: path.clone(),
                            source: e,
                        },
                    })
            }
            DocumentSource::Stdin => {
                let mut text = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut text)
                    .await
                    .map_err(|e| FacilitatorError::ReadFailed {
                        path: PathBuf::from("<stdin>"),
                        source: e,
                    })?;
                Ok(text)
            }
        }
    }
}

/// Download a URL into memory with a timeout.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, FacilitatorError> {
    info!("Downloading image: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| FacilitatorError::DownloadFailed {
            url: url.to_string(),
            reason: format!("Failed to create HTTP client: {e}"),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            FacilitatorError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            FacilitatorError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(FacilitatorError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            FacilitatorError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            FacilitatorError::DownloadFailed {
                url: url.to_string(),
                reason: format!("Failed to read response body: {e}"),
            }
        }
    })?;

    debug!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

/// Last path segment of a URL, without query or fragment.
fn url_file_name(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);
    rest.split_once('/')
        .and_then(|(_, path)| path.rsplit('/').find(|seg| !seg.is_empty()))
        .unwrap_or("image")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn detects_urls() {
        assert!(is_url("https://example.com/xray.png"));
        assert!(is_url("http://localhost/a.jpg"));
        assert!(!is_url("/tmp/xray.png"));
        assert!(!is_url("xray.png"));
    }

    #[test]
    fn file_name_from_url() {
        assert_eq!(url_file_name("https://h.org/scans/chest.jpg?sig=1"), "chest.jpg");
        assert_eq!(url_file_name("https://h.org/scans/chest.png#top"), "chest.png");
        assert_eq!(url_file_name("https://h.org/"), "image");
    }

    #[test]
    fn dash_means_stdin() {
        assert_eq!(DocumentSource::from_arg("-"), DocumentSource::Stdin);
        assert_eq!(
            DocumentSource::from_arg("notes.txt"),
            DocumentSource::File(PathBuf::from("notes.txt"))
        );
    }

    #[tokio::test]
    async fn loads_file_verbatim() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "Patient: Jane Doe\n\n  Age 45  \n").unwrap();
        let text = DocumentSource::File(tmp.path().to_path_buf())
            .load()
            .await
            .unwrap();
        assert_eq!(text, "Patient: Jane Doe\n\n  Age 45  \n");
    }

    #[tokio::test]
    async fn missing_document_file() {
        let err = DocumentSource::from_arg("/no/such/notes.txt")
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, FacilitatorError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn downloads_and_encodes_image() {
        let png = crate::pipeline::encode::tests::image_bytes(image::ImageFormat::Png);
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/scans/chest.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(png.clone())
            .create_async()
            .await;

        let url = format!("{}/scans/chest.png", server.url());
        let file = resolve_image(&url, 5).await.expect("download should succeed");
        assert_eq!(file.name, "chest.png");
        assert_eq!(file.mime_type, "image/png");
        assert_eq!(file.byte_len(), png.len());
    }

    #[tokio::test]
    async fn http_error_is_download_failure() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/missing.png")
            .with_status(404)
            .create_async()
            .await;

        let err = resolve_image(&format!("{}/missing.png", server.url()), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, FacilitatorError::DownloadFailed { .. }), "got {err:?}");
    }
}
