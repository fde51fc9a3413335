use crate::llm::{ApiKey, ChatBackend, ChatMessage, ChatRequest, LlmError};
use crate::summarizer::{truncate_chars, DEFAULT_MODEL};
use tracing::{info, warn};

pub const MAX_CHAT_CONTEXT_CHARS: usize = 10_000;
pub const HISTORY_WINDOW: usize = 8;
pub const CHAT_TEMPERATURE: f32 = 0.7;
pub const CHAT_MAX_TOKENS: u32 = 1000;

#[derive(Debug, thiserror::Error)]
#[error("{cause}")]
pub struct ChatError {
    #[from]
    pub cause: LlmError,
}

impl ChatError {
    /// Text shown in the transcript in place of the assistant's answer.
    pub fn as_reply(&self) -> String {
        format!("Error: {}", self.cause)
    }
}

/// Answers questions grounded in a single document.
#[derive(Debug, Clone)]
pub struct ChatAssistant {
    pub model: String,
    pub max_context_chars: usize,
    pub history_window: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatAssistant {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

impl ChatAssistant {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_context_chars: MAX_CHAT_CONTEXT_CHARS,
            history_window: HISTORY_WINDOW,
            temperature: CHAT_TEMPERATURE,
            max_tokens: CHAT_MAX_TOKENS,
        }
    }

    /// System grounding message, then the most recent `history_window` prior
    /// turns in their original order, then the new question.
    ///
    /// `history` must not already end with `question`: the window covers the
    /// turns before it, so the question is sent exactly once rather than also
    /// appearing as the last history entry.
    pub fn build_request(
        &self,
        question: &str,
        document_text: &str,
        history: &[ChatMessage],
    ) -> ChatRequest {
        let document = truncate_chars(document_text, self.max_context_chars).unwrap_or(document_text);
        let mut messages = Vec::with_capacity(self.history_window + 2);
        messages.push(ChatMessage::system(format!(
            "You are a helpful assistant that answers questions about a document. \
             Base your answers only on the document content provided.\n\nDocument:\n{}",
            document
        )));

        let start = history.len().saturating_sub(self.history_window);
        messages.extend(history[start..].iter().cloned());
        messages.push(ChatMessage::user(question));

        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub async fn answer<B: ChatBackend + ?Sized>(
        &self,
        backend: &B,
        api_key: &ApiKey,
        question: &str,
        document_text: &str,
        history: &[ChatMessage],
    ) -> Result<String, ChatError> {
        let request = self.build_request(question, document_text, history);
        match backend.complete(api_key, &request).await {
            Ok(response) => {
                info!(
                    history = request.messages.len() - 2,
                    chars = response.content.chars().count(),
                    "chat answer received"
                );
                Ok(response.content)
            }
            Err(e) => {
                warn!(error = %e, "chat request failed");
                Err(ChatError::from(e))
            }
        }
    }
}
