//! The analyst: the external text-analysis collaborator consumed by the
//! job pipeline.
//!
//! Four operations, each returning its token usage so jobs can account
//! cost: detect the site language, select the pages worth reading, extract
//! a knowledge chunk from one page, and compile the chunks into the final
//! document. Implementations wrap a specific LLM provider; the pipeline
//! only sees this trait.

pub mod openai;
pub mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Language used when detection fails or is undetermined.
pub const DEFAULT_LANGUAGE: &str = "English";

/// Prompt/completion token counts for one or more analyst calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    /// Create a usage record.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    /// Accumulate another call's usage into this one.
    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(other.completion_tokens);
    }

    /// Total tokens across both directions.
    pub fn total(&self) -> u64 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// Errors from analyst calls.
///
/// Responses that do not match the documented schema are a typed error,
/// never a best-effort guess.
#[derive(Debug, Error)]
pub enum AnalystError {
    /// Transport-level failure reaching the provider
    #[error("analyst request failed: {0}")]
    Http(String),

    /// Provider returned a non-success status
    #[error("analyst API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected schema
    #[error("analyst response did not match the expected schema: {detail}")]
    Schema { detail: String },

    /// Prompt exceeded the model's context window
    #[error("prompt exceeded the model context window")]
    ContextLength,

    /// Provider returned no usable choices
    #[error("analyst returned an empty response")]
    Empty,
}

/// Result type alias for analyst calls.
pub type AnalystResult<T> = std::result::Result<T, AnalystError>;

/// A page offered to the selection step: URL plus whatever title discovery
/// has seen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageListing {
    pub url: String,
    pub title: Option<String>,
}

/// One page chosen by the selection step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedPage {
    pub url: String,
    pub title: Option<String>,
    /// Why the analyst considered this page foundational
    pub reason: Option<String>,
}

/// Knowledge extracted from a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub url: String,
    pub title: String,
    /// Markdown content in the target language
    pub content: String,
}

/// The external content-analysis collaborator.
#[async_trait]
pub trait Analyst: Send + Sync {
    /// Identify the primary human language of an HTML snippet.
    ///
    /// Implementations default to [`DEFAULT_LANGUAGE`] on empty or
    /// undetermined input rather than erroring.
    async fn detect_language(
        &self,
        html_snippet: &str,
        url: &str,
    ) -> AnalystResult<(String, TokenUsage)>;

    /// Choose up to `budget` foundational pages from the discovered set.
    async fn select_pages(
        &self,
        pages: &[PageListing],
        root_url: &str,
        budget: usize,
        language: &str,
    ) -> AnalystResult<(Vec<SelectedPage>, TokenUsage)>;

    /// Extract a title and Markdown knowledge chunk from one page's HTML.
    async fn extract_page(
        &self,
        html: &str,
        url: &str,
        title: Option<&str>,
        language: &str,
    ) -> AnalystResult<(KnowledgeChunk, TokenUsage)>;

    /// Compile the extracted chunks into one Markdown document.
    async fn compile(
        &self,
        chunks: &[KnowledgeChunk],
        root_url: &str,
        language: &str,
    ) -> AnalystResult<(String, TokenUsage)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_accumulates_saturating() {
        let mut usage = TokenUsage::new(10, 5);
        usage.add(TokenUsage::new(90, 45));
        assert_eq!(usage.prompt_tokens, 100);
        assert_eq!(usage.completion_tokens, 50);
        assert_eq!(usage.total(), 150);

        let mut huge = TokenUsage::new(u64::MAX, 0);
        huge.add(TokenUsage::new(1, 1));
        assert_eq!(huge.prompt_tokens, u64::MAX);
    }
}
