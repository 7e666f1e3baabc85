use thiserror::Error;

/// Failures raised by a [`PdfSource`](crate::source::PdfSource) while reading a document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Document is encrypted")]
    Encrypted,

    #[error("Page {0} not found")]
    MissingPage(u32),

    #[error("Unreadable content on page {page}: {message}")]
    Content { page: u32, message: String },
}

#[derive(Error, Debug)]
pub enum CompareError {
    #[error("Failed to parse PDF '{file_name}': {message}")]
    ParseError { file_name: String, message: String },

    #[error("Error extracting text from '{file_name}': {message}")]
    Extraction { file_name: String, message: String },

    #[error("'{0}' is password protected")]
    PasswordProtected(String),

    #[error("Page {page} is out of range for '{file_name}' (1-{page_count})")]
    PageOutOfRange {
        file_name: String,
        page: u32,
        page_count: u32,
    },

    #[error("Nothing to compare: {0}")]
    EmptyText(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CompareError {
    /// Wrap a source failure with the name of the file it came from
    pub fn from_source(file_name: &str, err: SourceError) -> Self {
        match err {
            SourceError::Encrypted => CompareError::PasswordProtected(file_name.to_string()),
            SourceError::Parse(message) => CompareError::ParseError {
                file_name: file_name.to_string(),
                message,
            },
            other => CompareError::Extraction {
                file_name: file_name.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Stable machine-readable code for API and JS callers
    pub fn code(&self) -> &'static str {
        match self {
            CompareError::ParseError { .. } => "PARSE_ERROR",
            CompareError::Extraction { .. } => "EXTRACTION_ERROR",
            CompareError::PasswordProtected(_) => "PASSWORD_REQUIRED",
            CompareError::PageOutOfRange { .. } => "PAGE_OUT_OF_RANGE",
            CompareError::EmptyText(_) => "EMPTY_TEXT",
            CompareError::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypted_source_maps_to_password_protected() {
        let err = CompareError::from_source("secret.pdf", SourceError::Encrypted);
        assert!(matches!(err, CompareError::PasswordProtected(ref name) if name == "secret.pdf"));
        assert_eq!(err.code(), "PASSWORD_REQUIRED");
    }

    #[test]
    fn test_extraction_error_names_file() {
        let err = CompareError::from_source(
            "report.pdf",
            SourceError::Content {
                page: 3,
                message: "bad stream".into(),
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("report.pdf"));
        assert!(msg.contains("page 3"));
    }
}
