use super::{LoadError, LoadedBlock};

/// Extract one block per non-blank page. Page labels are 1-based page
/// numbers counted before blank pages are dropped.
pub fn extract_pdf(bytes: &[u8]) -> Result<Vec<LoadedBlock>, LoadError> {
    let text =
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| LoadError::Pdf(e.to_string()))?;
    Ok(split_pages(&text))
}

/// pdf-extract returns the whole document as one string with form feeds
/// (`\x0C`) between pages.
fn split_pages(text: &str) -> Vec<LoadedBlock> {
    if text.trim().is_empty() {
        tracing::warn!("PDF contains no extractable text (scanned or image-only?)");
        return Vec::new();
    }
    text.split('\x0C')
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, page)| LoadedBlock::new(page.trim(), Some((i + 1).to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_form_feed() {
        let blocks = split_pages("first page\x0Csecond page\x0C");
        assert_eq!(
            blocks,
            vec![
                LoadedBlock::new("first page", Some("1".into())),
                LoadedBlock::new("second page", Some("2".into())),
            ]
        );
    }

    #[test]
    fn blank_pages_keep_numbering() {
        let blocks = split_pages("one\x0C  \n \x0Cthree");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].page_label.as_deref(), Some("3"));
    }

    #[test]
    fn single_page_without_breaks() {
        let blocks = split_pages("  only text  ");
        assert_eq!(blocks, vec![LoadedBlock::new("only text", Some("1".into()))]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(split_pages(" \n ").is_empty());
    }

    #[test]
    fn garbage_bytes_fail() {
        assert!(matches!(extract_pdf(b"not a pdf"), Err(LoadError::Pdf(_))));
    }
}
