//! Document text extraction for the job-input stage. PDF only; the raw file
//! never leaves the process.

use thiserror::Error;

/// Upload cap for job-description documents.
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Only PDF documents are supported")]
    UnsupportedFormat,

    #[error("Document too large (maximum {} MB)", MAX_DOCUMENT_BYTES / (1024 * 1024))]
    TooLarge,

    #[error("Failed to read the document: {0}")]
    Unreadable(String),

    #[error("No text could be extracted from the document")]
    Empty,
}

/// Returns true for the MIME types / filenames the extractor accepts.
pub fn is_pdf(content_type: Option<&str>, file_name: Option<&str>) -> bool {
    if content_type == Some("application/pdf") {
        return true;
    }
    file_name
        .map(|name| name.to_ascii_lowercase().ends_with(".pdf"))
        .unwrap_or(false)
}

/// Extracts the text content of a PDF, pages concatenated in order with the
/// page breaks the parser emits. The output is trimmed; a document with no
/// recognizable text is an error, prompting the caller to paste manually.
pub fn extract_text(data: &[u8]) -> Result<String, ExtractionError> {
    if data.len() > MAX_DOCUMENT_BYTES {
        return Err(ExtractionError::TooLarge);
    }

    let text = pdf_extract::extract_text_from_mem(data)
        .map_err(|e| ExtractionError::Unreadable(e.to_string()))?;

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(ExtractionError::Empty);
    }
    Ok(text)
}
