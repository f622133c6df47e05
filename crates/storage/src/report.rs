use std::fmt;

use docload_core::ChunkStats;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub source: String,
    pub chunk_count: usize,
}

/// Collection analytics: chunks per document and the chunk-length distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionReport {
    pub collection: String,
    pub total_chunks: usize,
    /// In first-inserted order.
    pub documents: Vec<DocumentSummary>,
    pub lengths: ChunkStats,
}

impl CollectionReport {
    /// Build from `(source, content length in chars)` rows in insertion order.
    pub fn from_rows(collection: &str, rows: impl IntoIterator<Item = (String, usize)>) -> Self {
        let mut documents: Vec<DocumentSummary> = Vec::new();
        let mut lengths = Vec::new();
        for (source, len) in rows {
            lengths.push(len);
            match documents.iter_mut().find(|d| d.source == source) {
                Some(doc) => doc.chunk_count += 1,
                None => documents.push(DocumentSummary { source, chunk_count: 1 }),
            }
        }
        Self {
            collection: collection.to_string(),
            total_chunks: lengths.len(),
            documents,
            lengths: ChunkStats::from_lengths(&lengths),
        }
    }
}

impl fmt::Display for CollectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Collection: {}", self.collection)?;
        writeln!(f, "Documents: {}", self.documents.len())?;
        for doc in &self.documents {
            writeln!(f, "  * {} ({} chunks)", doc.source, doc.chunk_count)?;
        }
        writeln!(f, "Total chunks: {}", self.total_chunks)?;
        writeln!(f, "Avg. length: {:.1} (chars)", self.lengths.mean)?;
        writeln!(f, "Std dev: {:.1} (chars)", self.lengths.stdev)?;
        write!(f, "75-perc: {:.1} (chars)", self.lengths.p75)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_rows_by_source_in_order() {
        let report = CollectionReport::from_rows(
            "books",
            vec![
                ("b.pdf".to_string(), 10),
                ("a.pdf".to_string(), 20),
                ("b.pdf".to_string(), 30),
            ],
        );
        assert_eq!(report.total_chunks, 3);
        assert_eq!(
            report.documents,
            vec![
                DocumentSummary { source: "b.pdf".into(), chunk_count: 2 },
                DocumentSummary { source: "a.pdf".into(), chunk_count: 1 },
            ]
        );
        assert!((report.lengths.mean - 20.0).abs() < 1e-9);
    }

    #[test]
    fn display_lists_documents() {
        let report = CollectionReport::from_rows("books", vec![("a.pdf".to_string(), 5)]);
        let text = report.to_string();
        assert!(text.contains("Collection: books"));
        assert!(text.contains("* a.pdf (1 chunks)"));
        assert!(text.contains("Total chunks: 1"));
    }

    #[test]
    fn serializes_to_json() {
        let report = CollectionReport::from_rows("c", Vec::new());
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"total_chunks\":0"));
        assert!(json.contains("\"documents\":[]"));
    }
}
