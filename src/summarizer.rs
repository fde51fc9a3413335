use crate::llm::{ApiKey, ChatBackend, ChatMessage, ChatRequest, LlmError};
use std::borrow::Cow;
use tracing::{info, warn};

pub const MAX_SUMMARY_INPUT_CHARS: usize = 12_000;
pub const TRUNCATION_MARKER: &str = "\n\n[Document truncated for analysis...]";
pub const SUMMARY_TEMPERATURE: f32 = 0.3;
pub const SUMMARY_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_MODEL: &str = "gpt-4";

const SYSTEM_PROMPT: &str = "You are a document analysis expert who extracts key information, \
metrics, and dates from documents.";

#[derive(Debug, thiserror::Error)]
pub enum SummarizationError {
    #[error("Error calling the language model: {cause}")]
    Backend {
        #[from]
        cause: LlmError,
    },
    #[error("Failed to generate summary: the model returned no text")]
    EmptySummary,
}

/// Produces the three-section summary (highlights, metrics, dates).
#[derive(Debug, Clone)]
pub struct Summarizer {
    pub model: String,
    pub max_input_chars: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for Summarizer {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

impl Summarizer {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_input_chars: MAX_SUMMARY_INPUT_CHARS,
            temperature: SUMMARY_TEMPERATURE,
            max_tokens: SUMMARY_MAX_TOKENS,
        }
    }

    /// The document text as it will be sent: the first `max_input_chars`
    /// characters plus the truncation marker, or the text unchanged.
    pub fn effective_input<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match truncate_chars(text, self.max_input_chars) {
            Some(head) => Cow::Owned(format!("{}{}", head, TRUNCATION_MARKER)),
            None => Cow::Borrowed(text),
        }
    }

    pub fn build_request(&self, text: &str) -> ChatRequest {
        let prompt = format!(
            "Analyze the following document and provide a detailed summary with:\n\n\
             1. **Key Highlights**: List the main points, findings, and important information\n\
             2. **Important Metrics**: Extract all numbers, percentages, statistics, financial figures, and quantitative data\n\
             3. **Dates**: List all dates mentioned with their context\n\n\
             Format your response clearly with these three sections.\n\n\
             Document:\n{}\n",
            self.effective_input(text)
        );

        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub async fn summarize<B: ChatBackend + ?Sized>(
        &self,
        backend: &B,
        api_key: &ApiKey,
        text: &str,
    ) -> Result<String, SummarizationError> {
        let request = self.build_request(text);
        let response = backend.complete(api_key, &request).await.map_err(|e| {
            warn!(error = %e, "summary request failed");
            e
        })?;

        if response.content.trim().is_empty() {
            return Err(SummarizationError::EmptySummary);
        }

        info!(
            model = %response.model,
            chars = response.content.chars().count(),
            "summary generated"
        );
        Ok(response.content)
    }
}

/// Returns the first `max_chars` characters when `text` is longer than that.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> Option<&str> {
    text.char_indices()
        .nth(max_chars)
        .map(|(byte_idx, _)| &text[..byte_idx])
}
