//! Document Text Extraction
//!
//! Turns uploaded documents into plain study material. Only the extraction
//! contract lives here; the pipeline never sees the original document.

/// Reasons an upload cannot be turned into text.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("unsupported document type: {0}")]
    Unsupported(String),
    #[error("document is not valid UTF-8 text")]
    InvalidEncoding,
    #[error("document contains no text")]
    Empty,
}

/// Defines the contract for anything that can pull text out of an upload.
pub trait DocumentExtractor: Send + Sync {
    fn extract(
        &self,
        filename: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, ExtractError>;
}

/// Accepts plain-text and Markdown uploads.
pub struct PlainTextExtractor;

const TEXT_TYPES: [&str; 3] = ["text/plain", "text/markdown", "text/x-markdown"];
const TEXT_EXTENSIONS: [&str; 4] = ["txt", "md", "markdown", "text"];

impl PlainTextExtractor {
    fn is_supported(filename: &str, content_type: Option<&str>) -> bool {
        let by_type = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| TEXT_TYPES.contains(&ct.trim().to_lowercase().as_str()))
            .unwrap_or(false);
        let by_extension = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| TEXT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);
        by_type || by_extension
    }
}

impl DocumentExtractor for PlainTextExtractor {
    fn extract(
        &self,
        filename: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, ExtractError> {
        if !Self::is_supported(filename, content_type) {
            return Err(ExtractError::Unsupported(
                content_type.unwrap_or(filename).to_string(),
            ));
        }

        let text = std::str::from_utf8(bytes).map_err(|_| ExtractError::InvalidEncoding)?;
        let text = text
            .strip_prefix('\u{feff}')
            .unwrap_or(text)
            .replace("\r\n", "\n");
        let text = text.trim();
        if text.is_empty() {
            return Err(ExtractError::Empty);
        }
        Ok(text.to_string())
    }
}
