use std::io::Write;

use common::protocol::{is_game_over_text, requests_input};
use tokio::io::{AsyncBufRead, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, Lines};

#[derive(Debug, PartialEq, Eq)]
pub enum GameEnd {
    Finished,
    ServerClosed,
    InputClosed,
}

/// Prints whatever the server sends. Whenever it asks for a move, reads the
/// next non-blank token from `input` and sends it as one line.
pub async fn play_game<R, W, I>(
    mut server: R,
    mut writer: W,
    mut input: Lines<I>,
    out: &mut impl Write,
) -> Result<GameEnd, String>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    I: AsyncBufRead + Unpin,
{
    let mut buffer = vec![0u8; 1024];

    loop {
        let len = server
            .read(&mut buffer)
            .await
            .map_err(|e| format!("Failed to read from server: {}", e))?;
        if len == 0 {
            return Ok(GameEnd::ServerClosed);
        }

        let reply = String::from_utf8_lossy(&buffer[..len]);
        writeln!(out, "{}", reply).map_err(|e| e.to_string())?;

        if is_game_over_text(&reply) {
            return Ok(GameEnd::Finished);
        }

        if requests_input(&reply) {
            write!(out, "Your move: ").map_err(|e| e.to_string())?;
            out.flush().map_err(|e| e.to_string())?;

            let Some(token) = next_token(&mut input).await? else {
                return Ok(GameEnd::InputClosed);
            };
            writer
                .write_all(format!("{}\n", token).as_bytes())
                .await
                .map_err(|e| format!("Failed to send move: {}", e))?;
        }
    }
}

async fn next_token<I: AsyncBufRead + Unpin>(input: &mut Lines<I>) -> Result<Option<String>, String> {
    while let Some(line) = input.next_line().await.map_err(|e| e.to_string())? {
        if let Some(token) = line.split_whitespace().next() {
            return Ok(Some(token.to_string()));
        }
    }
    Ok(None)
}
