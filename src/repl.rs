use crate::commands::{self, App, Command, Reply};
use crate::llm::ChatBackend;
use anyhow::{Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

const PROMPT: &str = "> ";

/// Read commands line by line until `/quit` or end of input. Each command runs
/// to completion before the next line is read.
pub async fn run_loop<B, R, W>(app: &mut App<B>, input: R, output: &mut W) -> Result<()>
where
    B: ChatBackend,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        write!(output, "{}", PROMPT).context("failed to write prompt")?;
        output.flush().context("failed to flush output")?;

        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            debug!("input closed");
            return Ok(());
        };

        let reply = match Command::parse(&line) {
            Ok(Some(command)) => commands::dispatch(app, command).await,
            Ok(None) => continue,
            Err(e) => Reply::error(e),
        };

        print_reply(output, &reply)?;
        if reply.quit {
            return Ok(());
        }
    }
}

pub fn print_reply<W: Write>(output: &mut W, reply: &Reply) -> Result<()> {
    for line in &reply.lines {
        writeln!(output, "{}", line).context("failed to write reply")?;
    }
    Ok(())
}
