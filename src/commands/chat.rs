use super::{App, Reply};
use crate::llm::{ChatBackend, Role};

pub async fn ask<B: ChatBackend>(app: &mut App<B>, question: &str) -> Reply {
    match app.controller.ask_question(question).await {
        Ok(view) => match view.transcript.last() {
            Some(message) if message.role == Role::Assistant => {
                let mut reply = Reply::default();
                reply.lines.extend(
                    message
                        .content
                        .lines()
                        .map(|line| format!("assistant> {}", line)),
                );
                reply
            }
            _ => Reply::default(),
        },
        Err(e) => Reply::error(e),
    }
}

pub fn clear<B: ChatBackend>(app: &mut App<B>) -> Reply {
    match app.controller.clear_chat() {
        Ok(_) => Reply::line("Chat history cleared."),
        Err(e) => Reply::error(e),
    }
}
