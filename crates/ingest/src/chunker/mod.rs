//! Recursive character splitting.
//!
//! Turns loaded blocks into ordered, overlapping [`RawUnit`]s. Text is cut at
//! the coarsest separator that keeps pieces under `chunk_size` characters,
//! falling back to finer separators and finally to single characters.
//!
//! [`RawUnit`]: docload_core::RawUnit

mod splitter;
mod strategies;

pub use splitter::{TextSplitter, SEPARATORS};
pub use strategies::{group_by_page, prepare_blocks};

#[cfg(test)]
mod tests;
