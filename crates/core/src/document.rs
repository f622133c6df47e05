use serde::{Deserialize, Serialize};

/// Reported for units whose loader had no page or section information.
pub const PAGE_LABEL_UNKNOWN: &str = "N/A";

/// One atomic piece of extracted document content, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUnit {
    /// Non-empty text of the unit.
    pub text: String,
    /// Loader-supplied page or section identifier.
    pub page_label: Option<String>,
    /// 0-based position within the document. Defines window adjacency.
    pub order_index: usize,
}

impl RawUnit {
    pub fn new(text: impl Into<String>, page_label: Option<String>, order_index: usize) -> Self {
        Self {
            text: text.into(),
            page_label,
            order_index,
        }
    }

    /// Page label, or [`PAGE_LABEL_UNKNOWN`] when the loader did not supply one.
    pub fn page_label(&self) -> &str {
        self.page_label.as_deref().unwrap_or(PAGE_LABEL_UNKNOWN)
    }
}

/// The unit persisted to a collection: enriched text plus attribution metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Header, optional summary and original text, in that order.
    pub content: String,
    /// File name without directory. Identical for every chunk of a document.
    pub source: String,
    pub page_label: Option<String>,
    /// File name without extension.
    pub doc_title: String,
    /// Position of the chunk within its document.
    pub chunk_index: usize,
}

impl Chunk {
    /// Content length in characters.
    pub fn len_chars(&self) -> usize {
        self.content.chars().count()
    }
}

/// Strip any directory part from `path`, accepting both `/` and `\` separators
/// regardless of the host platform.
pub fn source_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// File name with directory and extension stripped.
pub fn doc_title(path: &str) -> &str {
    let name = source_name(path);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_name_strips_unix_and_windows_dirs() {
        assert_eq!(source_name("/data/books/manual.pdf"), "manual.pdf");
        assert_eq!(source_name(r"C:\books\manual.pdf"), "manual.pdf");
        assert_eq!(source_name("docs/sub\\mixed.docx"), "mixed.docx");
        assert_eq!(source_name("plain.md"), "plain.md");
    }

    #[test]
    fn doc_title_drops_extension() {
        assert_eq!(doc_title("/tmp/My Report.v2.pdf"), "My Report.v2");
        assert_eq!(doc_title("notes.md"), "notes");
        assert_eq!(doc_title("README"), "README");
        assert_eq!(doc_title(".hidden"), ".hidden");
    }

    #[test]
    fn missing_page_label_reports_sentinel() {
        let unit = RawUnit::new("text", None, 0);
        assert_eq!(unit.page_label(), PAGE_LABEL_UNKNOWN);
        let unit = RawUnit::new("text", Some("4".into()), 1);
        assert_eq!(unit.page_label(), "4");
    }

    #[test]
    fn chunk_length_counts_chars() {
        let chunk = Chunk {
            content: "héllo".into(),
            source: "a.md".into(),
            page_label: None,
            doc_title: "a".into(),
            chunk_index: 0,
        };
        assert_eq!(chunk.len_chars(), 5);
    }
}
