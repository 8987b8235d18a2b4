//! OpenAI implementation of the [`Analyst`] trait.
//!
//! A thin reqwest client against the chat-completions API. Structured
//! steps request `json_object` responses and parse them into typed
//! structs; a shape mismatch is a typed error, never a guess. Token usage
//! is taken from the API's `usage` block.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::prompts;
use super::{
    Analyst, AnalystError, AnalystResult, KnowledgeChunk, PageListing, SelectedPage, TokenUsage,
    DEFAULT_LANGUAGE,
};

/// Ceiling on HTML characters sent to extraction.
const MAX_HTML_CHARS: usize = 3_500_000;

/// Ceiling on text characters sent to language detection.
const MAX_LANG_SNIPPET_CHARS: usize = 7_500;

const MAX_TOKENS_LANG_DETECT: u32 = 50;
const MAX_TOKENS_PAGE_SELECTION: u32 = 1_500;
const MAX_TOKENS_EXTRACTION: u32 = 4_090;
const MAX_TOKENS_COMPILATION: u32 = 4_090;

/// OpenAI-backed analyst.
#[derive(Clone)]
pub struct OpenAiAnalyst {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiAnalyst {
    /// Create an analyst with the given API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: "gpt-4.1-nano-2025-04-14".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Set the chat model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (proxies, gateways).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Current model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// One chat-completion round trip.
    async fn chat(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        temperature: f32,
        json_response: bool,
    ) -> AnalystResult<(String, TokenUsage)> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens,
            temperature,
            response_format: json_response.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalystError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if body.contains("context_length_exceeded") {
                return Err(AnalystError::ContextLength);
            }
            return Err(AnalystError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AnalystError::Schema {
                detail: e.to_string(),
            })?;

        let usage = chat_response
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(AnalystError::Empty)?;

        Ok((content.trim().to_string(), usage))
    }
}

#[async_trait]
impl Analyst for OpenAiAnalyst {
    async fn detect_language(
        &self,
        html_snippet: &str,
        url: &str,
    ) -> AnalystResult<(String, TokenUsage)> {
        let text = visible_text(html_snippet);
        let text = truncate_chars(&text, MAX_LANG_SNIPPET_CHARS);
        if text.trim().is_empty() {
            warn!(url, "Nothing to detect a language from, defaulting");
            return Ok((DEFAULT_LANGUAGE.to_string(), TokenUsage::default()));
        }

        let (system, user) = prompts::language_detection(&text, url);
        let (answer, usage) = self
            .chat(&system, &user, MAX_TOKENS_LANG_DETECT, 0.0, false)
            .await?;

        let language = capitalize(answer.trim());
        if language.is_empty() || language.eq_ignore_ascii_case("undetermined") {
            info!(url, "Language undetermined, defaulting to {DEFAULT_LANGUAGE}");
            return Ok((DEFAULT_LANGUAGE.to_string(), usage));
        }

        info!(url, language = %language, "Detected site language");
        Ok((language, usage))
    }

    async fn select_pages(
        &self,
        pages: &[PageListing],
        root_url: &str,
        budget: usize,
        language: &str,
    ) -> AnalystResult<(Vec<SelectedPage>, TokenUsage)> {
        if pages.is_empty() {
            return Ok((Vec::new(), TokenUsage::default()));
        }

        let (system, user) = prompts::page_selection(pages, root_url, budget, language);
        let (body, usage) = self
            .chat(&system, &user, MAX_TOKENS_PAGE_SELECTION, 0.1, true)
            .await?;

        let parsed: SelectionResponse =
            serde_json::from_str(&body).map_err(|e| AnalystError::Schema {
                detail: format!("page selection: {e}"),
            })?;

        // Keep only URLs that were actually offered, carrying their titles.
        let selected: Vec<SelectedPage> = parsed
            .pages
            .into_iter()
            .filter_map(|choice| {
                let listing = pages.iter().find(|p| p.url == choice.url)?;
                Some(SelectedPage {
                    url: choice.url,
                    title: listing.title.clone(),
                    reason: choice.reason,
                })
            })
            .take(budget)
            .collect();

        info!(
            root_url,
            offered = pages.len(),
            selected = selected.len(),
            "Analyst selected pages"
        );
        Ok((selected, usage))
    }

    async fn extract_page(
        &self,
        html: &str,
        url: &str,
        title: Option<&str>,
        language: &str,
    ) -> AnalystResult<(KnowledgeChunk, TokenUsage)> {
        let html = truncate_chars(html, MAX_HTML_CHARS);
        let (system, user) = prompts::knowledge_extraction(&html, url, title, language);
        let (body, usage) = self
            .chat(&system, &user, MAX_TOKENS_EXTRACTION, 0.1, true)
            .await?;

        let parsed: ExtractionResponse =
            serde_json::from_str(&body).map_err(|e| AnalystError::Schema {
                detail: format!("knowledge extraction: {e}"),
            })?;

        Ok((
            KnowledgeChunk {
                url: url.to_string(),
                title: parsed.title_suggestion,
                content: parsed.extracted_chunk,
            },
            usage,
        ))
    }

    async fn compile(
        &self,
        chunks: &[KnowledgeChunk],
        root_url: &str,
        language: &str,
    ) -> AnalystResult<(String, TokenUsage)> {
        if chunks.is_empty() {
            return Ok(("No knowledge chunks to compile.".to_string(), TokenUsage::default()));
        }

        let (system, user) = prompts::knowledge_compilation(chunks, root_url, language);
        let (body, usage) = self
            .chat(&system, &user, MAX_TOKENS_COMPILATION, 0.3, false)
            .await?;

        info!(root_url, chunks = chunks.len(), "Compiled knowledge base");
        Ok((body, usage))
    }
}

/// Strip scripts, styles, and tags; collapse whitespace.
fn visible_text(html: &str) -> String {
    let script = regex::Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap();
    let style = regex::Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap();
    let tags = regex::Regex::new(r"<[^>]+>").unwrap();

    let text = script.replace_all(html, " ");
    let text = style.replace_all(&text, " ");
    let text = tags.replace_all(&text, " ");

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// Schema for the page-selection response.
#[derive(Deserialize)]
struct SelectionResponse {
    pages: Vec<SelectionChoice>,
}

#[derive(Deserialize)]
struct SelectionChoice {
    url: String,
    #[serde(default)]
    reason: Option<String>,
}

/// Schema for the knowledge-extraction response.
#[derive(Deserialize)]
struct ExtractionResponse {
    title_suggestion: String,
    extracted_chunk: String,
}
