//! DOCX text extraction with page tracking.
//!
//! A DOCX file is a ZIP archive; the body lives in `word/document.xml`.
//! Text comes from `w:t` runs grouped by `w:p` paragraphs. Pages are counted
//! from explicit breaks (`<w:br w:type="page"/>`) and the breaks Word records
//! at its last layout (`<w:lastRenderedPageBreak/>`). Breaks with no text
//! between them count once, since Word usually writes both for one break.
//! Paragraphs nest (text boxes hold their own `w:p` inside a paragraph), so
//! each open paragraph keeps its own buffer.

use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{LoadError, LoadedBlock};

pub fn extract_docx(bytes: &[u8]) -> Result<Vec<LoadedBlock>, LoadError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")?
        .read_to_string(&mut xml)
        .map_err(|e| LoadError::Xml(format!("cannot read word/document.xml: {e}")))?;
    parse_document_xml(&xml)
}

#[derive(Default)]
struct PageTracker {
    page: usize,
    text_on_page: bool,
    /// Open paragraphs, innermost last.
    paragraphs: Vec<String>,
    blocks: Vec<LoadedBlock>,
}

impl PageTracker {
    fn new() -> Self {
        Self {
            page: 1,
            ..Self::default()
        }
    }

    fn open_paragraph(&mut self) {
        self.paragraphs.push(String::new());
    }

    fn close_paragraph(&mut self) {
        if let Some(text) = self.paragraphs.pop() {
            self.emit(&text);
        }
    }

    /// Buffer of the innermost open paragraph. Text outside any paragraph
    /// gets one of its own.
    fn current(&mut self) -> &mut String {
        if self.paragraphs.is_empty() {
            self.paragraphs.push(String::new());
        }
        let last = self.paragraphs.len() - 1;
        &mut self.paragraphs[last]
    }

    fn emit(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            self.blocks
                .push(LoadedBlock::new(text, Some(self.page.to_string())));
            self.text_on_page = true;
        }
    }

    /// Emit the innermost paragraph's text collected so far on the current page.
    fn flush_current(&mut self) {
        if let Some(text) = self.paragraphs.last_mut().map(std::mem::take) {
            self.emit(&text);
        }
    }

    fn page_break(&mut self) {
        self.flush_current();
        if self.text_on_page {
            self.page += 1;
            self.text_on_page = false;
        }
    }

    fn finish(mut self) -> Vec<LoadedBlock> {
        while !self.paragraphs.is_empty() {
            self.close_paragraph();
        }
        self.blocks
    }
}

fn is_page_break(e: &BytesStart<'_>) -> Result<bool, LoadError> {
    match e.name().as_ref() {
        b"w:lastRenderedPageBreak" => Ok(true),
        b"w:br" => {
            let kind = e
                .try_get_attribute("w:type")
                .map_err(|err| LoadError::Xml(err.to_string()))?;
            Ok(kind.is_some_and(|a| a.value.as_ref() == b"page"))
        }
        _ => Ok(false),
    }
}

fn parse_document_xml(xml: &str) -> Result<Vec<LoadedBlock>, LoadError> {
    let mut reader = Reader::from_str(xml);
    let mut tracker = PageTracker::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:t" => in_text = true,
                b"w:p" => tracker.open_paragraph(),
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => tracker.close_paragraph(),
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if is_page_break(&e)? {
                    tracker.page_break();
                } else if e.name().as_ref() == b"w:tab" {
                    tracker.current().push('\t');
                } else if e.name().as_ref() == b"w:br" {
                    tracker.current().push('\n');
                }
            }
            Ok(Event::Text(e)) if in_text => {
                let text = e.unescape().map_err(|err| LoadError::Xml(err.to_string()))?;
                tracker.current().push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(LoadError::Xml(format!(
                    "error at position {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }
    Ok(tracker.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn wrap(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        )
    }

    fn labels(blocks: &[LoadedBlock]) -> Vec<(&str, &str)> {
        blocks
            .iter()
            .map(|b| (b.text.as_str(), b.page_label.as_deref().unwrap_or("")))
            .collect()
    }

    #[test]
    fn paragraphs_without_breaks_are_page_one() {
        let xml = wrap(
            "<w:p><w:r><w:t>Hello </w:t></w:r><w:r><w:t>World</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Second paragraph</w:t></w:r></w:p>",
        );
        let blocks = parse_document_xml(&xml).unwrap();
        assert_eq!(labels(&blocks), vec![("Hello World", "1"), ("Second paragraph", "1")]);
    }

    #[test]
    fn explicit_and_rendered_breaks_count_once() {
        let xml = wrap(
            r#"<w:p><w:r><w:t>Page one</w:t></w:r><w:r><w:br w:type="page"/></w:r></w:p>
               <w:p><w:r><w:lastRenderedPageBreak/><w:t>Page two</w:t></w:r></w:p>
               <w:p><w:r><w:lastRenderedPageBreak/><w:t>Page three</w:t></w:r></w:p>"#,
        );
        let blocks = parse_document_xml(&xml).unwrap();
        assert_eq!(
            labels(&blocks),
            vec![("Page one", "1"), ("Page two", "2"), ("Page three", "3")]
        );
    }

    #[test]
    fn break_inside_paragraph_splits_it() {
        let xml = wrap(
            r#"<w:p><w:r><w:t>before</w:t><w:br w:type="page"/><w:t>after</w:t></w:r></w:p>"#,
        );
        let blocks = parse_document_xml(&xml).unwrap();
        assert_eq!(labels(&blocks), vec![("before", "1"), ("after", "2")]);
    }

    #[test]
    fn text_box_keeps_surrounding_paragraph() {
        let xml = wrap(
            r#"<w:p><w:r><w:t>Outer start</w:t></w:r><w:r><w:pict><v:textbox><w:txbxContent>
               <w:p><w:r><w:t>Box text</w:t></w:r></w:p>
               </w:txbxContent></v:textbox></w:pict></w:r><w:r><w:t xml:space="preserve"> outer end</w:t></w:r></w:p>"#,
        );
        let blocks = parse_document_xml(&xml).unwrap();
        assert_eq!(
            labels(&blocks),
            vec![("Box text", "1"), ("Outer start outer end", "1")]
        );
    }

    #[test]
    fn line_breaks_and_entities() {
        let xml = wrap(r#"<w:p><w:r><w:t>a &amp; b</w:t><w:br/><w:t>c</w:t></w:r></w:p>"#);
        let blocks = parse_document_xml(&xml).unwrap();
        assert_eq!(blocks[0].text, "a & b\nc");
    }

    #[test]
    fn reads_zip_archive() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(wrap("<w:p><w:r><w:t>zipped</w:t></w:r></w:p>").as_bytes())
                .unwrap();
            zip.finish().unwrap();
        }
        let blocks = extract_docx(&buf).unwrap();
        assert_eq!(labels(&blocks), vec![("zipped", "1")]);
    }

    #[test]
    fn archive_without_document_fails() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file("other.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.finish().unwrap();
        }
        assert!(matches!(extract_docx(&buf), Err(LoadError::Zip(_))));
    }
}
