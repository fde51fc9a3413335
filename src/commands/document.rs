use super::{App, Reply};
use crate::llm::ChatBackend;
use crate::session::SessionView;
use std::path::Path;
use tracing::warn;

/// Read a file from disk and hand it to the session as an upload.
pub fn upload<B: ChatBackend>(app: &mut App<B>, path: &Path) -> Reply {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read upload");
            return Reply::error(format!("could not read {}: {}", path.display(), e));
        }
    };

    match app.controller.upload_document(&filename, bytes) {
        Ok(view) => {
            let mut reply = Reply::default();
            if let Some(doc) = &view.document {
                reply.push(format!("File loaded: {}", doc.name));
                reply.push(format!("File size: {:.2} KB", doc.size_kb));
            }
            reply.push("Type /analyze to generate the summary.");
            reply
        }
        Err(e) => Reply::error(e),
    }
}

pub async fn analyze<B: ChatBackend>(app: &mut App<B>) -> Reply {
    match app.controller.analyze().await {
        Ok(view) => {
            let mut reply = Reply::line("Document analyzed successfully!");
            reply.lines.extend(show_summary(&view).lines);
            reply
        }
        Err(e) => Reply::error(e),
    }
}

pub fn show_summary(view: &SessionView) -> Reply {
    match &view.summary {
        Some(summary) => {
            let mut reply = Reply::line("=== Document Summary ===");
            reply.lines.extend(summary.lines().map(str::to_string));
            reply
        }
        None => Reply::line("No summary yet. Upload a document and type /analyze."),
    }
}

pub fn show_text(view: &SessionView) -> Reply {
    match &view.document {
        Some(doc) => {
            let mut reply = Reply::line(format!("=== {} ===", doc.name));
            reply.lines.extend(doc.text.lines().map(str::to_string));
            reply
        }
        None => Reply::line("No document loaded."),
    }
}
