pub mod provider;
pub mod providers;
pub mod summarizer;

pub use provider::{LlmError, LlmProvider, Message, Role};
pub use providers::create_provider;
pub use summarizer::{LlmSummarizer, SummaryError, Summarizer, ThrottledSummarizer};
