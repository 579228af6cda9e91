use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;

use common::{ClientId, log, log_error};

use crate::games::tictactoe::Player;
use crate::session::SessionEvent;

pub type ClientSender = mpsc::Sender<String>;

/// Outbound queue for one participant. A single writer task drains it, so
/// messages reach the socket whole and in the order they were queued.
#[derive(Debug, Clone)]
pub struct ClientOutbox {
    client_id: ClientId,
    sender: ClientSender,
}

impl ClientOutbox {
    pub fn spawn(
        client_id: ClientId,
        player: Player,
        writer: OwnedWriteHalf,
        queue_size: usize,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(queue_size);
        tokio::spawn(write_loop(client_id.clone(), player, writer, receiver, events));
        Self { client_id, sender }
    }

    pub async fn deliver(&self, message: &str) {
        if self.sender.send(message.to_string()).await.is_err() {
            log!("[{}] Dropped message, writer already closed", self.client_id);
        }
    }
}

async fn write_loop(
    client_id: ClientId,
    player: Player,
    mut writer: OwnedWriteHalf,
    mut receiver: mpsc::Receiver<String>,
    events: mpsc::Sender<SessionEvent>,
) {
    while let Some(message) = receiver.recv().await {
        if let Err(e) = writer.write_all(message.as_bytes()).await {
            log_error!("[{}] Write failed: {}", client_id, e);
            // The reader normally reports the same failure; never block on a full queue here.
            let _ = events.try_send(SessionEvent::Closed { player });
            return;
        }
    }

    // Every sender is gone: the session ended. Flush and close our half.
    if let Err(e) = writer.shutdown().await {
        log!("[{}] Shutdown failed: {}", client_id, e);
    }
}
