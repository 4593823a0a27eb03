//! Input acquisition: read a local file or fetch a URL into memory.
//!
//! Both PDF and HTML converters work on in-memory bytes, so nothing is
//! written to disk. For URLs the document type is taken from the
//! `Content-Type` header and, failing that, from the URL path's extension.

use crate::error::MarkitdownError;
use crate::filetype::FileType;
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// A document read into memory, with its detected type.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub bytes: Vec<u8>,
    pub file_type: FileType,
    /// URL the document was served from, after redirects. Relative links in
    /// HTML resolve against it. `None` for local files and `file://` URLs.
    pub url: Option<Url>,
}

/// Check if the input string is a URL the converter fetches.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://") || input.starts_with("file://")
}

/// Load a local path or URL, detecting its type.
pub async fn load(source: &str, timeout_secs: u64) -> Result<LoadedSource, MarkitdownError> {
    if is_url(source) {
        return fetch(source, timeout_secs).await;
    }
    let path = Path::new(source);
    let file_type = FileType::from_path(path)?;
    let bytes = read_local(path).await?;
    Ok(LoadedSource {
        bytes,
        file_type,
        url: None,
    })
}

/// Read a local file fully into memory.
pub async fn read_local(path: &Path) -> Result<Vec<u8>, MarkitdownError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(MarkitdownError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(MarkitdownError::FileNotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(MarkitdownError::InvalidInput {
            input: path.display().to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Fetch a URL and detect its document type.
///
/// `file://` URLs are read from disk; `http(s)://` URLs are downloaded with
/// a whole-request timeout of `timeout_secs`.
pub async fn fetch(url: &str, timeout_secs: u64) -> Result<LoadedSource, MarkitdownError> {
    let parsed = Url::parse(url).map_err(|e| MarkitdownError::InvalidInput {
        input: url.to_string(),
        reason: format!("failed to parse URL: {e}"),
    })?;

    match parsed.scheme() {
        "file" => fetch_file(&parsed).await,
        "http" | "https" => fetch_http(&parsed, timeout_secs).await,
        other => Err(MarkitdownError::InvalidInput {
            input: url.to_string(),
            reason: format!("unsupported URL scheme '{other}'"),
        }),
    }
}

async fn fetch_file(url: &Url) -> Result<LoadedSource, MarkitdownError> {
    let path: PathBuf = url.to_file_path().map_err(|_| MarkitdownError::InvalidInput {
        input: url.to_string(),
        reason: "not a valid local file URL".to_string(),
    })?;
    let file_type = FileType::from_path(&path)?;
    let bytes = read_local(&path).await?;
    Ok(LoadedSource {
        bytes,
        file_type,
        url: None,
    })
}

async fn fetch_http(url: &Url, timeout_secs: u64) -> Result<LoadedSource, MarkitdownError> {
    info!("Downloading: {}", url);

    let download_failed = |reason: String| MarkitdownError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let request_failed = |e: reqwest::Error| {
        if e.is_timeout() {
            MarkitdownError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            download_failed(e.to_string())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| download_failed(e.to_string()))?;

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(request_failed)?;

    if !response.status().is_success() {
        return Err(download_failed(format!("HTTP {}", response.status())));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let file_type = detect_remote_type(content_type.as_deref(), url)?;
    let served_from = response.url().clone();

    let bytes = response.bytes().await.map_err(request_failed)?.to_vec();
    info!(
        "Downloaded {} bytes ({}) from {}",
        bytes.len(),
        file_type,
        url
    );

    Ok(LoadedSource {
        bytes,
        file_type,
        url: Some(served_from),
    })
}

/// `Content-Type` first, then the extension of the URL path.
pub fn detect_remote_type(
    content_type: Option<&str>,
    url: &Url,
) -> Result<FileType, MarkitdownError> {
    content_type
        .and_then(FileType::from_mime)
        .or_else(|| {
            Path::new(url.path())
                .extension()
                .and_then(|e| e.to_str())
                .and_then(FileType::from_extension)
        })
        .ok_or_else(|| MarkitdownError::UnsupportedFileType {
            detail: format!("cannot determine type of '{}'", url),
        })
}
