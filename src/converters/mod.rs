//! Per-format document converters.

pub mod html;
pub mod pdf;

pub use html::HtmlConverter;
pub use pdf::PdfConverter;

use crate::config::ConversionConfig;
use crate::error::MarkitdownError;
use crate::filetype::FileType;
use futures::future::BoxFuture;

/// Turns the raw bytes of one document into markdown.
pub trait DocumentConverter: Send + Sync {
    fn convert(&self, bytes: Vec<u8>) -> BoxFuture<'_, Result<String, MarkitdownError>>;
}

/// Pick the converter for `file_type`.
///
/// Recognised types without a converter fail with
/// [`MarkitdownError::UnsupportedFileType`].
pub fn new_converter(
    file_type: FileType,
    config: &ConversionConfig,
) -> Result<Box<dyn DocumentConverter>, MarkitdownError> {
    match file_type {
        FileType::Html => Ok(Box::new(HtmlConverter::new(config))),
        FileType::Pdf => Ok(Box::new(PdfConverter::new(config))),
        other => Err(MarkitdownError::UnsupportedFileType {
            detail: format!("no converter for '{}' documents", other),
        }),
    }
}
