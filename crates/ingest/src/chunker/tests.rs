//! Tests for the recursive splitter and block preparation.

use super::{group_by_page, prepare_blocks, TextSplitter};
use crate::document::{LoadedBlock, LoaderKind};
use docload_core::ConfigError;

fn splitter(size: usize, overlap: usize) -> TextSplitter {
    TextSplitter::new(size, overlap).unwrap()
}

// ── Parameters ──────────────────────────────────────────────────────

#[test]
fn rejects_invalid_parameters() {
    assert_eq!(TextSplitter::new(0, 0), Err(ConfigError::ZeroChunkSize));
    assert_eq!(
        TextSplitter::new(10, 10),
        Err(ConfigError::OverlapTooLarge { size: 10, overlap: 10 })
    );
    assert!(TextSplitter::new(2000, 100).is_ok());
}

// ── Splitting ───────────────────────────────────────────────────────

#[test]
fn sentence_separator_scenario() {
    assert_eq!(splitter(5, 0).split("A. B. C. D."), vec!["A. B", ". C", ". D."]);
}

#[test]
fn short_text_is_one_chunk() {
    assert_eq!(splitter(100, 10).split("  Just a line.  "), vec!["Just a line."]);
}

#[test]
fn empty_and_blank_text_yield_nothing() {
    assert!(splitter(10, 0).split("").is_empty());
    assert!(splitter(10, 0).split(" \n\n \n").is_empty());
}

#[test]
fn falls_back_to_finer_separators() {
    let chunks = splitter(10, 0).split("para one is long\n\nshort");
    assert_eq!(chunks, vec!["para one", "is long", "short"]);
}

#[test]
fn hard_cuts_text_without_separators() {
    assert_eq!(splitter(3, 0).split("abcdefgh"), vec!["abc", "def", "gh"]);
}

#[test]
fn measures_characters_not_bytes() {
    assert_eq!(splitter(2, 0).split("ééééé"), vec!["éé", "éé", "é"]);
}

#[test]
fn overlap_repeats_trailing_pieces() {
    let chunks = splitter(8, 3).split("aa bb cc dd ee");
    assert_eq!(chunks, vec!["aa bb cc", "cc dd", "dd ee"]);
}

#[test]
fn chunks_respect_size_bound() {
    let text = (0..400)
        .map(|i| format!("word{i}"))
        .collect::<Vec<_>>()
        .join(" ")
        + "\n\nAnother paragraph. With sentences. And more.\nAnd a line.";
    for (size, overlap) in [(50, 0), (50, 10), (120, 40), (7, 3)] {
        for chunk in splitter(size, overlap).split(&text) {
            assert!(
                chunk.chars().count() <= size,
                "chunk of {} chars exceeds {size}: {chunk:?}",
                chunk.chars().count()
            );
            assert!(!chunk.is_empty());
            assert_eq!(chunk, chunk.trim());
        }
    }
}

#[test]
fn consecutive_chunks_share_between_one_word_and_overlap() {
    let text = (0..200).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
    let overlap = 12;
    let chunks = splitter(40, overlap).split(&text);
    assert!(chunks.len() > 3);
    for pair in chunks.windows(2) {
        let prev: Vec<&str> = pair[0].split(' ').collect();
        let next: Vec<&str> = pair[1].split(' ').collect();
        // Longest word-aligned suffix of prev that prefixes next.
        let shared = (1..=prev.len().min(next.len()))
            .rev()
            .find(|&n| prev[prev.len() - n..] == next[..n])
            .map(|n| prev[prev.len() - n..].join(" ").chars().count())
            .unwrap_or(0);
        assert!(shared <= overlap, "shared {shared} > {overlap}");
        assert!(shared > 0, "no overlap between {:?} and {:?}", pair[0], pair[1]);
    }
}

#[test]
fn overlap_carries_trailing_words() {
    let chunks = splitter(20, 8).split("one two three four five six seven eight nine ten");
    assert_eq!(
        chunks,
        vec!["one two three four", "four five six seven", "seven eight nine", "nine ten"]
    );
}

#[test]
fn splitting_is_deterministic() {
    let text = "First line.\nSecond line. Third sentence here.\n\nNew paragraph with words.";
    let s = splitter(20, 5);
    assert_eq!(s.split(text), s.split(text));
}

// ── Units ───────────────────────────────────────────────────────────

#[test]
fn split_units_numbers_across_blocks() {
    let blocks = vec![
        LoadedBlock::new("alpha beta gamma", Some("1".into())),
        LoadedBlock::new("delta", Some("2".into())),
    ];
    let units = splitter(11, 0).split_units(&blocks);
    let got: Vec<(&str, &str, usize)> = units
        .iter()
        .map(|u| (u.text.as_str(), u.page_label(), u.order_index))
        .collect();
    assert_eq!(
        got,
        vec![("alpha beta", "1", 0), ("gamma", "1", 1), ("delta", "2", 2)]
    );
}

#[test]
fn unlabeled_units_report_unknown_page() {
    let units = splitter(50, 0).split_units(&[LoadedBlock::new("text", None)]);
    assert_eq!(units[0].page_label(), "N/A");
}

#[test]
fn pdf_pages_do_not_overlap() {
    let blocks = vec![
        LoadedBlock::new("Alpha bravo charlie delta echo.", Some("1".into())),
        LoadedBlock::new("Foxtrot golf hotel india juliet.", Some("2".into())),
    ];
    let blocks = prepare_blocks(LoaderKind::Pdf, blocks);
    let units = splitter(500, 50).split_units(&blocks);
    assert_eq!(units.len(), 2);
    assert!(!units[1].text.contains("echo"));
}

// ── DOCX page grouping ──────────────────────────────────────────────

#[test]
fn groups_paragraphs_by_first_seen_page() {
    let blocks = vec![
        LoadedBlock::new("p1 a", Some("1".into())),
        LoadedBlock::new("p2 a", Some("2".into())),
        LoadedBlock::new("p1 b", Some("1".into())),
        LoadedBlock::new("p2 b", Some("2".into())),
    ];
    assert_eq!(
        group_by_page(blocks),
        vec![
            LoadedBlock::new("p1 a\np1 b", Some("1".into())),
            LoadedBlock::new("p2 a\np2 b", Some("2".into())),
        ]
    );
}

#[test]
fn docx_chunks_never_cross_pages() {
    let blocks = vec![
        LoadedBlock::new("short one", Some("1".into())),
        LoadedBlock::new("short two", Some("2".into())),
    ];
    let blocks = prepare_blocks(LoaderKind::Docx, blocks);
    let units = splitter(1000, 0).split_units(&blocks);
    assert_eq!(units.len(), 2);
    assert_eq!(units[0].text, "short one");
    assert_eq!(units[1].page_label(), "2");
}
