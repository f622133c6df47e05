//! Context enrichment: every chunk gets a document-title header and, when
//! enabled, a summary of the units around it.

use std::ops::Range;
use std::sync::Arc;

use docload_core::config::{SummaryConfig, SummaryFailurePolicy};
use docload_core::{Chunk, ConfigError, RawUnit};
use docload_llm::{SummaryError, Summarizer};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("summary for unit {index} failed: {source}")]
    Summary {
        index: usize,
        #[source]
        source: SummaryError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichConfig {
    pub summary_enabled: bool,
    pub window_half_width: usize,
    pub failure_policy: SummaryFailurePolicy,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            summary_enabled: false,
            window_half_width: 2,
            failure_policy: SummaryFailurePolicy::Fail,
        }
    }
}

impl From<&SummaryConfig> for EnrichConfig {
    fn from(config: &SummaryConfig) -> Self {
        Self {
            summary_enabled: config.enabled,
            window_half_width: config.window_half_width,
            failure_policy: config.failure_policy,
        }
    }
}

/// Indices of the units summarized for unit `index` out of `len`:
/// up to `half_width` on each side, clamped to the document.
pub fn summary_window(index: usize, len: usize, half_width: usize) -> Range<usize> {
    index.saturating_sub(half_width)..len.min(index.saturating_add(half_width).saturating_add(1))
}

pub fn title_header(doc_title: &str) -> String {
    format!("# Doc. title: {doc_title}\n")
}

pub struct ContextEnricher {
    config: EnrichConfig,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl ContextEnricher {
    pub fn new(
        config: EnrichConfig,
        summarizer: Option<Arc<dyn Summarizer>>,
    ) -> Result<Self, ConfigError> {
        if config.summary_enabled && summarizer.is_none() {
            return Err(ConfigError::MissingSummarizer);
        }
        Ok(Self { config, summarizer })
    }

    /// Header-only enricher.
    pub fn without_summaries() -> Self {
        Self {
            config: EnrichConfig::default(),
            summarizer: None,
        }
    }

    pub fn config(&self) -> &EnrichConfig {
        &self.config
    }

    /// Turn the ordered units of one document into final chunks, one per unit,
    /// in the same order. Content is the title header, the optional summary
    /// line and the unit text.
    pub async fn enrich(
        &self,
        doc_title: &str,
        source: &str,
        units: &[RawUnit],
    ) -> Result<Vec<Chunk>, EnrichError> {
        let header = title_header(doc_title);
        let mut chunks = Vec::with_capacity(units.len());

        for (i, unit) in units.iter().enumerate() {
            let mut content = header.clone();
            if let Some(summary) = self.summary_for(i, units).await? {
                content.push_str("Summary: ");
                content.push_str(&summary);
                content.push_str("\n\n");
            }
            content.push_str(&unit.text);

            chunks.push(Chunk {
                content,
                source: source.to_string(),
                page_label: unit.page_label.clone(),
                doc_title: doc_title.to_string(),
                chunk_index: unit.order_index,
            });
        }
        debug!(source, chunks = chunks.len(), "document enriched");
        Ok(chunks)
    }

    async fn summary_for(&self, index: usize, units: &[RawUnit]) -> Result<Option<String>, EnrichError> {
        let summarizer = match (&self.summarizer, self.config.summary_enabled) {
            (Some(s), true) => s,
            _ => return Ok(None),
        };
        let window = summary_window(index, units.len(), self.config.window_half_width);
        let context = units[window]
            .iter()
            .map(|u| u.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        match summarizer.summarize(&context).await {
            Ok(summary) => Ok(Some(summary)),
            Err(e) if self.config.failure_policy == SummaryFailurePolicy::Omit => {
                warn!(unit = index, error = %e, "summary unavailable, chunk keeps header only");
                Ok(None)
            }
            Err(source) => Err(EnrichError::Summary { index, source }),
        }
    }
}
