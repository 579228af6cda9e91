use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use common::{ClientId, log, log_error};

use crate::broadcaster::ClientOutbox;
use crate::games::tictactoe::Player;
use crate::server_config::MAX_LINE_LENGTH;
use crate::session::SessionEvent;

/// A participant's socket, split into a reader task feeding the session's
/// event queue and a serialized outbox. Dropping it stops the reader and lets
/// the writer flush what is queued before closing the socket.
pub struct Connection {
    client_id: ClientId,
    outbox: ClientOutbox,
    reader: JoinHandle<()>,
}

impl Connection {
    pub fn spawn(
        stream: TcpStream,
        client_id: ClientId,
        player: Player,
        events: mpsc::Sender<SessionEvent>,
        outbound_queue_size: usize,
    ) -> Self {
        let (read_half, write_half) = stream.into_split();
        let outbox = ClientOutbox::spawn(client_id.clone(), player, write_half, outbound_queue_size, events.clone());
        let reader = tokio::spawn(read_loop(client_id.clone(), player, read_half, events));

        Self {
            client_id,
            outbox,
            reader,
        }
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub async fn deliver(&self, message: &str) {
        self.outbox.deliver(message).await;
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(
    client_id: ClientId,
    player: Player,
    read_half: OwnedReadHalf,
    events: mpsc::Sender<SessionEvent>,
) {
    let mut reader = BufReader::new(read_half);
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        match (&mut reader).take(MAX_LINE_LENGTH as u64).read_until(b'\n', &mut buffer).await {
            Ok(0) => {
                log!("[{}] Player {} disconnected", client_id, player);
                break;
            }
            Ok(len) if len == MAX_LINE_LENGTH && buffer.last() != Some(&b'\n') => {
                log_error!("[{}] Player {} sent a line over {} bytes", client_id, player, MAX_LINE_LENGTH);
                break;
            }
            Ok(_) if buffer.last() != Some(&b'\n') => {
                log!("[{}] Player {} disconnected mid-line", client_id, player);
                break;
            }
            Ok(_) => {
                // Invalid UTF-8 becomes replacement characters.
                let line = String::from_utf8_lossy(&buffer)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                if events.send(SessionEvent::Line { player, line }).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                log_error!("[{}] Error on receive: {}", client_id, e);
                break;
            }
        }
    }

    let _ = events.send(SessionEvent::Closed { player }).await;
}
