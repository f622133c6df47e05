//! Chunk-context summarization over an [`LlmProvider`].
//!
//! [`LlmSummarizer`] sends the fixed summary prompt. [`ThrottledSummarizer`]
//! wraps any summarizer so calls are serialized, preceded by a fixed pause,
//! bounded by a timeout and retried a bounded number of times.

use std::time::Duration;

use async_trait::async_trait;
use docload_core::config::{LlmConfig, OllamaConfig, SummaryConfig};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::provider::{LlmError, LlmProvider, Message};

const SUMMARY_SYSTEM_PROMPT: &str = "You summarize passages taken from a larger document. \
Write a short summary (at most three sentences) of the text provided by the user. \
Write the summary in the same language as the text. \
Return only the summary: no preamble, no headings, no commentary.";

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("summary service call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("summary service timed out after {0:?}")]
    Timeout(Duration),

    #[error("summary service returned an empty summary")]
    Empty,

    #[error("summary failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<SummaryError>,
    },
}

/// Produces a same-language summary of a block of text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError>;
}

/// Summarizer backed by a chat-completion provider and a fixed prompt.
pub struct LlmSummarizer {
    provider: Box<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl LlmSummarizer {
    pub fn new(provider: Box<dyn LlmProvider>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }

    /// Build from config, creating the appropriate provider.
    pub fn from_config(
        llm_config: &LlmConfig,
        ollama_config: &OllamaConfig,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let provider = crate::providers::create_provider(llm_config, ollama_config, timeout)?;
        Ok(Self::new(provider, llm_config.temperature, llm_config.max_tokens))
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
        let messages = vec![Message::system(SUMMARY_SYSTEM_PROMPT), Message::user(text)];
        let summary = self
            .provider
            .complete(messages, self.temperature, self.max_tokens)
            .await?;
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(SummaryError::Empty);
        }
        Ok(summary.to_string())
    }
}

/// Rate-limits an inner summarizer to respect an external throughput quota.
///
/// Calls are serialized through an async mutex. Every attempt, retries
/// included, waits `delay` first and is cut off after `timeout`.
pub struct ThrottledSummarizer<S> {
    inner: S,
    delay: Duration,
    timeout: Duration,
    max_retries: u32,
    gate: Mutex<()>,
}

impl<S: Summarizer> ThrottledSummarizer<S> {
    pub fn new(inner: S, delay: Duration, timeout: Duration, max_retries: u32) -> Self {
        Self {
            inner,
            delay,
            timeout,
            max_retries,
            gate: Mutex::new(()),
        }
    }

    pub fn from_config(inner: S, config: &SummaryConfig) -> Self {
        Self::new(
            inner,
            Duration::from_millis(config.delay_ms),
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )
    }

    async fn attempt(&self, text: &str) -> Result<String, SummaryError> {
        tokio::time::sleep(self.delay).await;
        match tokio::time::timeout(self.timeout, self.inner.summarize(text)).await {
            Ok(result) => result,
            Err(_) => Err(SummaryError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl<S: Summarizer> Summarizer for ThrottledSummarizer<S> {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
        let _serialized = self.gate.lock().await;
        let attempts = self.max_retries + 1;
        let mut attempt = 1;
        loop {
            match self.attempt(text).await {
                Ok(summary) => {
                    debug!(attempt, chars = summary.len(), "summary produced");
                    return Ok(summary);
                }
                Err(e) if attempt < attempts => {
                    warn!(attempt, error = %e, "summary attempt failed, retrying");
                    attempt += 1;
                }
                Err(e) => {
                    return Err(SummaryError::Exhausted {
                        attempts,
                        last: Box::new(e),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Fails the first `failures` calls, then echoes a prefix of the input.
    struct FlakySummarizer {
        calls: AtomicUsize,
        failures: usize,
    }

    #[async_trait]
    impl Summarizer for FlakySummarizer {
        async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(SummaryError::Empty);
            }
            Ok(format!("summary of {}", text.len()))
        }
    }

    struct SlowSummarizer;

    #[async_trait]
    impl Summarizer for SlowSummarizer {
        async fn summarize(&self, _text: &str) -> Result<String, SummaryError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok("late".into())
        }
    }

    struct CannedProvider(String);

    #[async_trait]
    impl LlmProvider for CannedProvider {
        async fn complete(
            &self,
            messages: Vec<Message>,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            assert_eq!(messages.len(), 2);
            assert!(messages[0].content.contains("same language"));
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let inner = FlakySummarizer { calls: AtomicUsize::new(0), failures: 2 };
        let s = ThrottledSummarizer::new(inner, Duration::ZERO, Duration::from_secs(1), 2);
        assert_eq!(s.summarize("abcd").await.unwrap(), "summary of 4");
        assert_eq!(s.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let inner = FlakySummarizer { calls: AtomicUsize::new(0), failures: 10 };
        let s = ThrottledSummarizer::new(inner, Duration::ZERO, Duration::from_secs(1), 1);
        let err = s.summarize("x").await.unwrap_err();
        assert!(matches!(err, SummaryError::Exhausted { attempts: 2, .. }));
        assert_eq!(s.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn slow_call_times_out() {
        let s = ThrottledSummarizer::new(
            SlowSummarizer,
            Duration::ZERO,
            Duration::from_millis(20),
            0,
        );
        let err = s.summarize("x").await.unwrap_err();
        match err {
            SummaryError::Exhausted { last, .. } => {
                assert!(matches!(*last, SummaryError::Timeout(_)))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn pause_precedes_each_call() {
        let inner = FlakySummarizer { calls: AtomicUsize::new(0), failures: 0 };
        let s = Arc::new(ThrottledSummarizer::new(
            inner,
            Duration::from_millis(30),
            Duration::from_secs(1),
            0,
        ));
        let start = std::time::Instant::now();
        let a = tokio::spawn({
            let s = s.clone();
            async move { s.summarize("a").await }
        });
        let b = tokio::spawn({
            let s = s.clone();
            async move { s.summarize("b").await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();
        // Serialized: two pauses back to back, never overlapping.
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn llm_summarizer_trims_output() {
        let s = LlmSummarizer::new(Box::new(CannedProvider("  A short summary.\n".into())), 0.1, 64);
        assert_eq!(s.summarize("text").await.unwrap(), "A short summary.");
    }

    #[tokio::test]
    async fn llm_summarizer_rejects_blank_output() {
        let s = LlmSummarizer::new(Box::new(CannedProvider("   ".into())), 0.1, 64);
        assert!(matches!(s.summarize("text").await, Err(SummaryError::Empty)));
    }
}
