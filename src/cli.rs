use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "doc-analyzer")]
#[command(
    about = "Upload a document (PDF, DOC, DOCX, TXT, XLS, XLSX), get an AI summary of its \
             highlights, metrics and dates, then chat about it."
)]
pub struct Cli {
    /// Document to upload at start-up.
    pub file: Option<PathBuf>,

    /// OpenAI API key (starts with sk-).
    #[arg(short = 'k', long = "api-key", env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API.
    #[arg(long = "base-url", env = "OPENAI_BASE_URL")]
    pub base_url: Option<String>,

    /// Model used for both the summary and the chat.
    #[arg(short = 'm', long = "model", env = "DOC_ANALYZER_MODEL")]
    pub model: Option<String>,

    /// Keep settings in this SQLite file instead of in memory.
    #[arg(long = "settings-db")]
    pub settings_db: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long = "log-level", default_value = "warn")]
    pub log_level: String,
}
