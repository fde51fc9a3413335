use crate::chat::ChatAssistant;
use crate::doc_processor::{self, Document, ExtractionError};
use crate::llm::{ApiKey, ChatBackend, ChatMessage};
use crate::summarizer::{SummarizationError, Summarizer};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Extracting,
    Extracted,
    Summarizing,
    /// Summary available, chat enabled.
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please upload a file first")]
    MissingDocument,
    #[error("Please enter your OpenAI API key")]
    MissingApiKey,
    #[error("Invalid API key format. It should start with 'sk-'")]
    MalformedApiKey,
    #[error("Please analyze a document first to start chatting")]
    NotReady,
    #[error("Please type a question about the document")]
    EmptyQuestion,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Summarization(#[from] SummarizationError),
}

/// Everything one interactive session knows. Lives only in memory.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    state: SessionState,
    document: Option<Document>,
    summary: Option<String>,
    transcript: Vec<ChatMessage>,
    api_key: Option<ApiKey>,
}

impl Session {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Empty,
            document: None,
            summary: None,
            transcript: Vec::new(),
            api_key: None,
        }
    }

    fn reset_document(&mut self) {
        self.document = None;
        self.summary = None;
        self.transcript.clear();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    pub name: String,
    pub format: String,
    pub size_kb: f64,
    pub text: String,
}

/// Snapshot handed to the interface after every action.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub session_id: Uuid,
    pub state: SessionState,
    pub document: Option<DocumentInfo>,
    pub summary: Option<String>,
    pub transcript: Vec<ChatMessage>,
    pub api_key: Option<String>,
}

impl SessionView {
    pub fn chat_enabled(&self) -> bool {
        self.state == SessionState::Ready
    }
}

/// Owns the session and dispatches interface events to the extractor, the
/// summarizer and the chat assistant, one event at a time.
pub struct SessionController<B> {
    session: Session,
    backend: B,
    summarizer: Summarizer,
    assistant: ChatAssistant,
}

impl<B: ChatBackend> SessionController<B> {
    pub fn new(backend: B) -> Self {
        Self::with_clients(backend, Summarizer::default(), ChatAssistant::default())
    }

    pub fn with_clients(backend: B, summarizer: Summarizer, assistant: ChatAssistant) -> Self {
        Self {
            session: Session::new(),
            backend,
            summarizer,
            assistant,
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn view(&self) -> SessionView {
        let session = &self.session;
        SessionView {
            session_id: session.id,
            state: session.state,
            document: session.document.as_ref().map(|doc| DocumentInfo {
                name: doc.name.clone(),
                format: doc.format.to_string(),
                size_kb: doc.size_kb(),
                text: doc.text().to_string(),
            }),
            summary: session.summary.clone(),
            transcript: session.transcript.clone(),
            api_key: session.api_key.as_ref().map(ApiKey::masked),
        }
    }

    /// Store the credential as entered; it is validated when used.
    pub fn set_api_key(&mut self, key: &str) -> SessionView {
        let key = ApiKey::new(key);
        self.session.api_key = if key.is_empty() { None } else { Some(key) };
        self.view()
    }

    pub fn set_model(&mut self, model: &str) {
        self.summarizer.model = model.to_string();
        self.assistant.model = model.to_string();
    }

    /// Replace the current document. On failure the session holds no
    /// document at all.
    pub fn upload_document(
        &mut self,
        name: &str,
        raw_bytes: Vec<u8>,
    ) -> Result<SessionView, SessionError> {
        self.session.state = SessionState::Extracting;
        self.session.reset_document();

        match doc_processor::parse_upload(name, raw_bytes) {
            Ok(document) => {
                info!(session = %self.session.id, name, format = %document.format, "document uploaded");
                self.session.document = Some(document);
                self.session.state = SessionState::Extracted;
                Ok(self.view())
            }
            Err(e) => {
                warn!(session = %self.session.id, name, error = %e, "extraction failed");
                self.session.state = SessionState::Empty;
                Err(e.into())
            }
        }
    }

    /// Summarize the current document. A new summary clears the transcript.
    pub async fn analyze(&mut self) -> Result<SessionView, SessionError> {
        let has_document = self.session.document.is_some()
            && matches!(
                self.session.state,
                SessionState::Extracted | SessionState::Ready
            );
        if !has_document {
            return Err(ValidationError::MissingDocument.into());
        }
        let api_key = self.valid_api_key()?.clone();

        let previous = self.session.state;
        self.session.state = SessionState::Summarizing;
        let text = self
            .session
            .document
            .as_ref()
            .map(Document::text)
            .unwrap_or_default();

        let result = self.summarizer.summarize(&self.backend, &api_key, text).await;
        match result {
            Ok(summary) => {
                info!(session = %self.session.id, "document analyzed");
                self.session.summary = Some(summary);
                self.session.transcript.clear();
                self.session.state = SessionState::Ready;
                Ok(self.view())
            }
            Err(e) => {
                self.session.state = previous;
                Err(e.into())
            }
        }
    }

    /// One chat turn. Backend failures become the assistant's reply so the
    /// transcript always grows by exactly two messages.
    pub async fn ask_question(&mut self, question: &str) -> Result<SessionView, SessionError> {
        if self.session.state != SessionState::Ready || self.session.document.is_none() {
            return Err(ValidationError::NotReady.into());
        }
        if question.trim().is_empty() {
            return Err(ValidationError::EmptyQuestion.into());
        }
        let api_key = self.valid_api_key()?.clone();

        let history_len = self.session.transcript.len();
        self.session.transcript.push(ChatMessage::user(question));

        let document_text = self
            .session
            .document
            .as_ref()
            .map(Document::text)
            .unwrap_or_default();
        let reply = match self
            .assistant
            .answer(
                &self.backend,
                &api_key,
                question,
                document_text,
                &self.session.transcript[..history_len],
            )
            .await
        {
            Ok(answer) => answer,
            Err(e) => e.as_reply(),
        };

        self.session.transcript.push(ChatMessage::assistant(reply));
        info!(
            session = %self.session.id,
            messages = self.session.transcript.len(),
            "chat turn recorded"
        );
        Ok(self.view())
    }

    pub fn clear_chat(&mut self) -> Result<SessionView, SessionError> {
        if self.session.state != SessionState::Ready {
            return Err(ValidationError::NotReady.into());
        }
        self.session.transcript.clear();
        Ok(self.view())
    }

    fn valid_api_key(&self) -> Result<&ApiKey, ValidationError> {
        let key = self
            .session
            .api_key
            .as_ref()
            .filter(|key| !key.is_empty())
            .ok_or(ValidationError::MissingApiKey)?;
        if !key.has_expected_prefix() {
            return Err(ValidationError::MalformedApiKey);
        }
        Ok(key)
    }
}
