//! Per-format preparation of loaded blocks before splitting.

use crate::document::{LoadedBlock, LoaderKind};

/// Arrange loaded blocks into the units the splitter works on. PDF pages and
/// the single Markdown block are split as loaded; DOCX paragraphs are first
/// grouped by page so no chunk crosses a page boundary.
pub fn prepare_blocks(kind: LoaderKind, blocks: Vec<LoadedBlock>) -> Vec<LoadedBlock> {
    match kind {
        LoaderKind::Docx => group_by_page(blocks),
        LoaderKind::Pdf | LoaderKind::Markdown => blocks,
    }
}

/// Join blocks that share a page label with `"\n"`, one block per page, in
/// the order each page is first seen.
pub fn group_by_page(blocks: Vec<LoadedBlock>) -> Vec<LoadedBlock> {
    let mut pages: Vec<(Option<String>, Vec<String>)> = Vec::new();
    for block in blocks {
        match pages.iter_mut().find(|(label, _)| *label == block.page_label) {
            Some((_, texts)) => texts.push(block.text),
            None => pages.push((block.page_label, vec![block.text])),
        }
    }
    pages
        .into_iter()
        .map(|(label, texts)| LoadedBlock::new(texts.join("\n"), label))
        .collect()
}
