//! Conversion entry points.
//!
//! [`convert`] takes anything a user might type, a local path or a URL,
//! works out the document type, and hands the bytes to the matching
//! [`DocumentConverter`]. The narrower entry points skip the steps the
//! caller already did.

use crate::config::ConversionConfig;
use crate::converters::{new_converter, DocumentConverter};
use crate::error::MarkitdownError;
use crate::filetype::FileType;
use crate::pipeline::input::{self, LoadedSource};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Convert a local file or a URL to Markdown.
///
/// `http://`, `https://` and `file://` sources are treated as URLs,
/// everything else as a local path.
///
/// # Example
/// ```rust,no_run
/// use markitdown::{convert, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConversionConfig::default();
/// let markdown = convert("https://example.com/article.html", &config).await?;
/// println!("{}", markdown);
/// # Ok(())
/// # }
/// ```
pub async fn convert(
    source: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<String, MarkitdownError> {
    let source = source.as_ref();
    if input::is_url(source) {
        convert_url(source, config).await
    } else {
        convert_local(source, config).await
    }
}

/// Convert a local file; the type comes from its extension.
pub async fn convert_local(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<String, MarkitdownError> {
    let path = path.as_ref();
    info!("Starting conversion: {}", path.display());
    let file_type = FileType::from_path(path)?;
    let bytes = input::read_local(path).await?;
    convert_bytes(bytes, file_type, config).await
}

/// Convert an already loaded source. The URL it was fetched from, if any,
/// becomes `config.html_base_url`.
pub async fn convert_loaded(
    source: LoadedSource,
    config: &ConversionConfig,
) -> Result<String, MarkitdownError> {
    match source.url {
        Some(url) => {
            let mut config = config.clone();
            config.html_base_url = Some(url);
            convert_bytes(source.bytes, source.file_type, &config).await
        }
        None => convert_bytes(source.bytes, source.file_type, config).await,
    }
}

/// Fetch a URL and convert it.
///
/// Relative links in HTML are resolved against the URL the page was served
/// from, keeping its scheme and port.
pub async fn convert_url(url: &str, config: &ConversionConfig) -> Result<String, MarkitdownError> {
    info!("Starting conversion: {}", url);
    let fetched = input::fetch(url, config.download_timeout_secs).await?;
    convert_loaded(fetched, config).await
}

/// Convert an in-memory document of a known type.
pub async fn convert_bytes(
    bytes: Vec<u8>,
    file_type: FileType,
    config: &ConversionConfig,
) -> Result<String, MarkitdownError> {
    let start = Instant::now();
    let converter: Box<dyn DocumentConverter> = new_converter(file_type, config)?;
    debug!("Converting {} bytes as {}", bytes.len(), file_type);

    let markdown = converter.convert(bytes).await?;
    info!(
        "Conversion complete: {} ({} chars) in {:?}",
        file_type,
        markdown.len(),
        start.elapsed()
    );
    Ok(markdown)
}

/// Convert a source and write the Markdown to `output_path`.
///
/// The file is written atomically (temp file in the same directory, then
/// rename) and, on unix, is readable by the owner only. Returns the number
/// of bytes written.
pub async fn convert_to_file(
    source: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<usize, MarkitdownError> {
    let markdown = convert(source, config).await?;
    write_atomic(output_path.as_ref().to_path_buf(), markdown).await
}

/// Write `contents` to `path` via a temp file and rename.
pub async fn write_atomic(path: PathBuf, contents: String) -> Result<usize, MarkitdownError> {
    let target = path.clone();
    let write_failed = move |source: std::io::Error| MarkitdownError::OutputWriteFailed {
        path: target.clone(),
        source,
    };

    tokio::task::spawn_blocking(move || {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(&write_failed)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(&write_failed)?;
        tmp.write_all(contents.as_bytes()).map_err(&write_failed)?;
        tmp.as_file().sync_all().map_err(&write_failed)?;
        tmp.persist(&path).map_err(|e| write_failed(e.error))?;

        debug!("Wrote {} bytes to {}", contents.len(), path.display());
        Ok(contents.len())
    })
    .await
    .map_err(|e| MarkitdownError::Internal(format!("Write task panicked: {}", e)))?
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    source: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<String, MarkitdownError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| MarkitdownError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(source, config))
}
