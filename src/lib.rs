pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod doc_processor;
pub mod llm;
pub mod repl;
pub mod session;
pub mod summarizer;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use commands::App;
use config::AppConfig;
use db::Database;
use llm::openai::{OpenAiClient, OpenAiConfig};
use session::SessionController;
use std::io::Write;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let db = match &cli.settings_db {
        Some(path) => Database::open(path)
            .with_context(|| format!("failed to open settings database {}", path.display()))?,
        None => Database::in_memory().context("failed to create in-memory settings")?,
    };
    let config = AppConfig::resolve(&cli, &db)?;
    tracing::info!(base_url = %config.base_url, model = %config.model, "starting");

    let backend = OpenAiClient::new(OpenAiConfig {
        base_url: config.base_url.clone(),
    });
    let mut controller = SessionController::new(backend);
    controller.set_model(&config.model);
    if let Some(key) = &config.api_key {
        controller.set_api_key(key);
    }
    let mut app = App::new(controller, db);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Document Analyzer & Chat Assistant")?;
    writeln!(out, "Type /help for commands.")?;

    if let Some(path) = &cli.file {
        let reply = commands::document::upload(&mut app, path);
        repl::print_reply(&mut out, &reply)?;
    }

    repl::run_loop(&mut app, BufReader::new(tokio::io::stdin()), &mut out).await
}

fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
