pub mod chat;
pub mod document;
pub mod settings;

use crate::db::Database;
use crate::llm::ChatBackend;
use crate::session::{SessionController, SessionState, SessionView};
use std::fmt;
use std::path::PathBuf;

/// One line of user input, interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Upload(PathBuf),
    Key(String),
    Analyze,
    Summary,
    Text,
    Clear,
    Status,
    Settings,
    Set { key: String, value: String },
    Unset(String),
    Help,
    Quit,
    Ask(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandParseError {
    #[error("Unknown command: /{0}. Type /help for the list of commands")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
}

impl Command {
    /// Blank lines yield `None`; anything not starting with `/` is a question.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Command::Ask(line.to_string())));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match name.to_lowercase().as_str() {
            "upload" | "open" => {
                if arg.is_empty() {
                    return Err(CommandParseError::Usage("/upload <path>"));
                }
                Command::Upload(PathBuf::from(arg))
            }
            "key" => Command::Key(arg.to_string()),
            "analyze" => Command::Analyze,
            "summary" => Command::Summary,
            "text" => Command::Text,
            "clear" => Command::Clear,
            "status" => Command::Status,
            "settings" => Command::Settings,
            "set" => match arg.split_once(char::is_whitespace) {
                Some((key, value)) => Command::Set {
                    key: key.to_string(),
                    value: value.trim().to_string(),
                },
                None => return Err(CommandParseError::Usage("/set <name> <value>")),
            },
            "unset" => {
                if arg.is_empty() {
                    return Err(CommandParseError::Usage("/unset <name>"));
                }
                Command::Unset(arg.to_string())
            }
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(CommandParseError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

/// What the interface needs to serve commands.
pub struct App<B> {
    pub controller: SessionController<B>,
    pub db: Database,
}

impl<B: ChatBackend> App<B> {
    pub fn new(controller: SessionController<B>, db: Database) -> Self {
        Self { controller, db }
    }
}

/// Lines to print after a command, and whether the loop should stop.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Reply {
    pub lines: Vec<String>,
    pub quit: bool,
}

impl Reply {
    pub fn line(line: impl Into<String>) -> Self {
        Self {
            lines: vec![line.into()],
            quit: false,
        }
    }

    pub fn error(err: impl fmt::Display) -> Self {
        Self::line(format!("error: {}", err))
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }
}

pub async fn dispatch<B: ChatBackend>(app: &mut App<B>, command: Command) -> Reply {
    match command {
        Command::Upload(path) => document::upload(app, &path),
        Command::Key(key) => settings::set_api_key(app, &key),
        Command::Analyze => document::analyze(app).await,
        Command::Summary => document::show_summary(&app.controller.view()),
        Command::Text => document::show_text(&app.controller.view()),
        Command::Ask(question) => chat::ask(app, &question).await,
        Command::Clear => chat::clear(app),
        Command::Status => status(&app.controller.view()),
        Command::Settings => settings::list(app),
        Command::Set { key, value } => settings::set(app, &key, &value),
        Command::Unset(key) => settings::unset(app, &key),
        Command::Help => help(),
        Command::Quit => Reply {
            lines: Vec::new(),
            quit: true,
        },
    }
}

pub fn status(view: &SessionView) -> Reply {
    let state = match view.state {
        SessionState::Empty => "no document",
        SessionState::Extracting => "extracting",
        SessionState::Extracted => "document loaded, not analyzed",
        SessionState::Summarizing => "summarizing",
        SessionState::Ready => "ready to chat",
    };
    let mut reply = Reply::line(format!("State: {}", state));
    match &view.document {
        Some(doc) => reply.push(format!(
            "Document: {} ({}, {:.2} KB)",
            doc.name, doc.format, doc.size_kb
        )),
        None => reply.push("Document: none"),
    }
    reply.push(format!(
        "API key: {}",
        view.api_key.as_deref().unwrap_or("not set")
    ));
    reply.push(format!("Messages: {}", view.transcript.len()));
    reply
}

pub fn help() -> Reply {
    Reply {
        lines: [
            "/upload <path>      load a PDF, DOC, DOCX, TXT, XLS or XLSX file",
            "/key <sk-...>       set the OpenAI API key for this session",
            "/analyze            summarize the loaded document",
            "/summary            show the summary again",
            "/text               show the full extracted text",
            "/clear              clear the chat history",
            "/status             show the session state",
            "/settings           list stored settings",
            "/set <name> <value> store a setting (openai_api_key, openai_base_url, model)",
            "/unset <name>       remove a stored setting",
            "/quit               leave",
            "anything else       ask a question about the document",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
        quit: false,
    }
}
