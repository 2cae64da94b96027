//! Input resolution: normalise a user-supplied path or URL to deck bytes.
//!
//! A `.pptx` is a zip container, so the whole file is read into memory and
//! handed to the extractor as a byte buffer; no temp file is needed. Size and
//! zip magic (`PK\x03\x04`) are checked here so callers get a meaningful
//! error instead of a zip parser failure.

use crate::error::ThesisError;
use futures::StreamExt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Zip local-file-header signature that every `.pptx` starts with.
const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// A deck loaded into memory.
#[derive(Debug, Clone)]
pub struct ResolvedDeck {
    /// The path or URL the bytes came from (used in error messages).
    pub source: String,
    pub bytes: Vec<u8>,
}

impl ResolvedDeck {
    /// Wrap in-memory bytes, applying the same checks as file input.
    pub fn from_bytes(
        source: impl Into<String>,
        bytes: Vec<u8>,
        max_file_size: u64,
    ) -> Result<Self, ThesisError> {
        let source = source.into();
        check_deck_bytes(&source, &bytes, max_file_size)?;
        Ok(Self { source, bytes })
    }

    pub fn file_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to deck bytes.
///
/// If the input is a URL, download it. If it is a local file, validate it
/// exists, is readable and is within `max_file_size` before reading it.
pub async fn resolve_input(
    input: &str,
    max_file_size: u64,
    timeout_secs: u64,
) -> Result<ResolvedDeck, ThesisError> {
    if input.trim().is_empty() {
        return Err(ThesisError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, max_file_size, timeout_secs).await
    } else {
        resolve_local(input, max_file_size).await
    }
}

/// Validate the byte buffer of a deck: size limit, then zip magic.
pub fn check_deck_bytes(source: &str, bytes: &[u8], max_file_size: u64) -> Result<(), ThesisError> {
    let size = bytes.len() as u64;
    if size > max_file_size {
        return Err(ThesisError::FileTooLarge {
            size,
            limit: max_file_size,
        });
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    if &magic != ZIP_MAGIC {
        return Err(ThesisError::NotAPptx {
            source_name: source.to_string(),
            magic,
        });
    }
    Ok(())
}

/// Read a local deck, validating existence, permissions and size first.
async fn resolve_local(path_str: &str, max_file_size: u64) -> Result<ResolvedDeck, ThesisError> {
    let path = PathBuf::from(path_str);

    let meta = match tokio::fs::metadata(&path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ThesisError::PermissionDenied { path });
        }
        Err(_) => return Err(ThesisError::FileNotFound { path }),
    };
    if !meta.is_file() {
        return Err(ThesisError::InvalidInput {
            input: path_str.to_string(),
        });
    }
    // Reject oversized decks before pulling them into memory.
    if meta.len() > max_file_size {
        return Err(ThesisError::FileTooLarge {
            size: meta.len(),
            limit: max_file_size,
        });
    }

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            ThesisError::PermissionDenied { path: path.clone() }
        } else {
            ThesisError::FileNotFound { path: path.clone() }
        }
    })?;

    check_deck_bytes(path_str, &bytes, max_file_size)?;
    debug!("Resolved local deck: {} ({} bytes)", path.display(), bytes.len());
    Ok(ResolvedDeck {
        source: path_str.to_string(),
        bytes,
    })
}

/// Download a URL into memory.
async fn download_url(
    url: &str,
    max_file_size: u64,
    timeout_secs: u64,
) -> Result<ResolvedDeck, ThesisError> {
    info!("Downloading deck from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ThesisError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ThesisError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ThesisError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ThesisError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    if let Some(len) = response.content_length() {
        if len > max_file_size {
            return Err(ThesisError::FileTooLarge {
                size: len,
                limit: max_file_size,
            });
        }
    }

    // Content-Length may be absent (chunked transfer); enforce the cap per chunk.
    let mut bytes: Vec<u8> = Vec::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| ThesisError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let size = (bytes.len() + chunk.len()) as u64;
        if size > max_file_size {
            return Err(ThesisError::FileTooLarge {
                size,
                limit: max_file_size,
            });
        }
        bytes.extend_from_slice(&chunk);
    }

    check_deck_bytes(url, &bytes, max_file_size)?;
    info!("Downloaded {} bytes", bytes.len());

    Ok(ResolvedDeck {
        source: url.to_string(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LIMIT: u64 = 50 * 1024 * 1024;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/deck.pptx"));
        assert!(is_url("http://example.com/deck.pptx"));
        assert!(!is_url("/tmp/deck.pptx"));
        assert!(!is_url("deck.pptx"));
        assert!(!is_url(""));
    }

    #[test]
    fn rejects_non_zip_bytes() {
        let err = check_deck_bytes("deck.pptx", b"%PDF-1.7", LIMIT).unwrap_err();
        match err {
            ThesisError::NotAPptx { magic, .. } => assert_eq!(&magic, b"%PDF"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_oversized_bytes() {
        let err = check_deck_bytes("deck.pptx", b"PK\x03\x04rest", 4).unwrap_err();
        assert!(matches!(err, ThesisError::FileTooLarge { size: 8, limit: 4 }));
    }

    #[test]
    fn accepts_zip_magic() {
        let deck = ResolvedDeck::from_bytes("mem", b"PK\x03\x04....".to_vec(), LIMIT).unwrap();
        assert_eq!(deck.file_size(), 8);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = resolve_input("/definitely/not/here.pptx", LIMIT, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ThesisError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn local_file_size_checked_before_read() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"PK\x03\x04 a fairly long body").unwrap();
        let err = resolve_input(tmp.path().to_str().unwrap(), 10, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ThesisError::FileTooLarge { limit: 10, .. }));
    }

    #[tokio::test]
    async fn downloads_deck_from_url() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/deck.pptx")
            .with_status(200)
            .with_body(b"PK\x03\x04zipbody".to_vec())
            .create_async()
            .await;

        let url = format!("{}/deck.pptx", server.url());
        let deck = resolve_input(&url, LIMIT, 5).await.unwrap();
        assert_eq!(deck.source, url);
        assert_eq!(&deck.bytes[..4], b"PK\x03\x04");
    }

    #[tokio::test]
    async fn chunked_download_stops_at_size_limit() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/big.pptx")
            .with_status(200)
            .with_chunked_body(|w| {
                w.write_all(b"PK\x03\x04")?;
                for _ in 0..64 {
                    w.write_all(&[b'x'; 1024])?;
                }
                Ok(())
            })
            .create_async()
            .await;

        let url = format!("{}/big.pptx", server.url());
        let err = resolve_input(&url, 16 * 1024, 5).await.unwrap_err();
        match err {
            ThesisError::FileTooLarge { size, limit } => {
                assert_eq!(limit, 16 * 1024);
                assert!(size > limit);
            }
            other => panic!("expected FileTooLarge, got {other}"),
        }
    }

    #[tokio::test]
    async fn download_http_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/missing.pptx")
            .with_status(404)
            .create_async()
            .await;

        let url = format!("{}/missing.pptx", server.url());
        let err = resolve_input(&url, LIMIT, 5).await.unwrap_err();
        match err {
            ThesisError::DownloadFailed { reason, .. } => assert!(reason.contains("404")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
