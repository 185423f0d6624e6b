use crate::bot::Bot;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::Result;
use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// Reads messages from `input`, one per line, and writes the bot's reply to each to `output`
/// followed by a blank line. Blank lines are skipped. Returns when `input` is exhausted.
///
/// Messages are handled strictly in order; a reply is written before the next line is read.
pub async fn chat<R, W>(bot: &mut Bot, input: R, mut output: W) -> Result<Out<usize>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut handled = 0;
    while let Some(line) = lines
        .next_line()
        .await
        .context("Unable to read the next message")
        .pub_result(ErrorType::Service)?
    {
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        let reply = bot.reply(message).await;
        output
            .write_all(format!("{reply}\n\n").as_bytes())
            .await
            .context("Unable to write the reply")
            .pub_result(ErrorType::Service)?;
        output
            .flush()
            .await
            .context("Unable to flush the reply")
            .pub_result(ErrorType::Service)?;
        handled += 1;
        debug!("Replied to message {handled}");
    }
    info!("Chat input closed after {handled} messages");
    Ok(Out::new(format!("Handled {handled} messages"), handled))
}
