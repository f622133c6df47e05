mod docx;
mod md;
mod pdf;

use std::path::Path;

use docload_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("DOCX XML error: {0}")]
    Xml(String),
    #[error("loader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A block of extracted text with its page, if the format has pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedBlock {
    pub text: String,
    pub page_label: Option<String>,
}

impl LoadedBlock {
    pub fn new(text: impl Into<String>, page_label: Option<String>) -> Self {
        Self {
            text: text.into(),
            page_label,
        }
    }
}

/// Supported input formats, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderKind {
    Pdf,
    Docx,
    Markdown,
}

impl LoaderKind {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "md" | "markdown" => Ok(Self::Markdown),
            other => Err(ConfigError::UnsupportedExtension(other.to_string())),
        }
    }

    /// Whether `path` has an extension one of the loaders accepts.
    pub fn is_supported(path: impl AsRef<Path>) -> bool {
        Self::from_path(path).is_ok()
    }

    /// Read and extract `path`. PDF yields one block per page, DOCX one block
    /// per paragraph fragment with its page, Markdown a single block.
    pub fn load(self, path: impl AsRef<Path>) -> Result<Vec<LoadedBlock>, LoadError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        match self {
            Self::Pdf => pdf::extract_pdf(&bytes),
            Self::Docx => docx::extract_docx(&bytes),
            Self::Markdown => Ok(md::extract_md(&bytes)),
        }
    }
}

impl std::fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pdf => f.write_str("pdf"),
            Self::Docx => f.write_str("docx"),
            Self::Markdown => f.write_str("markdown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_loader_by_extension() {
        assert_eq!(LoaderKind::from_path("a/b/book.PDF").unwrap(), LoaderKind::Pdf);
        assert_eq!(LoaderKind::from_path("notes.docx").unwrap(), LoaderKind::Docx);
        assert_eq!(LoaderKind::from_path("readme.md").unwrap(), LoaderKind::Markdown);
        assert_eq!(LoaderKind::from_path("x.markdown").unwrap(), LoaderKind::Markdown);
    }

    #[test]
    fn rejects_unknown_extension() {
        assert_eq!(
            LoaderKind::from_path("data.xlsx"),
            Err(ConfigError::UnsupportedExtension("xlsx".into()))
        );
        assert!(!LoaderKind::is_supported("no_extension"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = LoaderKind::Markdown.load("/definitely/not/here.md").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(err.to_string().contains("here.md"));
    }
}
