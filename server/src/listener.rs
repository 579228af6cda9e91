use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use common::{ClientId, SessionId, log, log_error};

use crate::connection::Connection;
use crate::games::SessionRng;
use crate::games::tictactoe::Player;
use crate::matchmaking::{MatchTicket, Resolution, spawn_matchmaking_timer};
use crate::server_config::{SESSION_EVENT_QUEUE_SIZE, ServerSettings};
use crate::session::{GameSession, SessionEvent, WaitingSession};

/// Pairs accepted connections into sessions. Owned by the accept loop alone,
/// so the waiting slot and the session counter need no locking.
pub struct Matchmaker {
    settings: ServerSettings,
    next_session_number: u64,
    waiting: Option<WaitingSession>,
}

impl Matchmaker {
    pub fn new(settings: ServerSettings) -> Self {
        Self {
            settings,
            next_session_number: 1,
            waiting: None,
        }
    }

    /// Hands a freshly accepted connection to the waiting session, or starts
    /// a new session with it.
    pub async fn assign(&mut self, stream: TcpStream, client_id: ClientId) {
        let Some(waiting) = self.waiting.take() else {
            self.start_session(stream, client_id);
            return;
        };

        match waiting.ticket.try_resolve(Resolution::SecondPlayer) {
            Ok(()) => {
                let event = SessionEvent::SecondPlayer { stream, client_id };
                if waiting.events.send(event).await.is_err() {
                    log_error!("[{}] Session ended before player 2 could join", waiting.session_id);
                }
            }
            Err(Resolution::Bot) => {
                log!(
                    "[{}] Game already started with bot. Closing connection for {}",
                    waiting.session_id,
                    client_id
                );
                drop(stream);
            }
            Err(_) => {
                log!("[{}] Player 1 left while waiting, starting a new session", waiting.session_id);
                self.start_session(stream, client_id);
            }
        }
    }

    fn start_session(&mut self, stream: TcpStream, client_id: ClientId) {
        let session_id = SessionId::from_number(self.next_session_number);
        self.next_session_number += 1;

        log!("[{}] Player 1 connected from {}", session_id, client_id);

        let ticket = Arc::new(MatchTicket::new());
        let (events_tx, events_rx) = mpsc::channel(SESSION_EVENT_QUEUE_SIZE);
        let connection = Connection::spawn(
            stream,
            client_id,
            Player::One,
            events_tx.clone(),
            self.settings.outbound_queue_size,
        );

        let session = GameSession::new(
            session_id.clone(),
            connection,
            ticket.clone(),
            events_tx.clone(),
            events_rx,
            SessionRng::from_random(),
            self.settings.outbound_queue_size,
        );
        self.waiting = Some(session.waiting_handle());

        spawn_matchmaking_timer(session_id, ticket, self.settings.matchmaking_timeout(), events_tx);
        tokio::spawn(session.run());
    }
}

pub async fn bind_listener(host: &str, port: u16) -> Result<TcpListener, String> {
    TcpListener::bind((host, port))
        .await
        .map_err(|e| format!("Failed to bind {}:{}: {}", host, port, e))
}

/// Accepts connections until the task is dropped. Accept failures are logged
/// and never stop the loop.
pub async fn run_listener(listener: TcpListener, settings: ServerSettings) {
    match listener.local_addr() {
        Ok(addr) => log!(
            "TicTacToe server version {}. Listening for incoming connections on {}...",
            common::protocol::VERSION,
            addr
        ),
        Err(e) => log_error!("Listening on unknown address: {}", e),
    }

    let mut matchmaker = Matchmaker::new(settings);
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                matchmaker.assign(stream, ClientId::from(peer)).await;
            }
            Err(e) => {
                log_error!("Error accepting connection: {}", e);
            }
        }
    }
}

/// Binds an ephemeral loopback port and serves it in the background.
pub async fn spawn_local_server(settings: ServerSettings) -> Result<SocketAddr, String> {
    let listener = bind_listener("127.0.0.1", 0).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to read local address: {}", e))?;
    tokio::spawn(run_listener(listener, settings));
    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::protocol;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const WAIT: Duration = Duration::from_secs(5);

    struct TestClient {
        stream: TcpStream,
        received: String,
        cursor: usize,
    }

    impl TestClient {
        async fn connect(addr: SocketAddr) -> Self {
            Self {
                stream: TcpStream::connect(addr).await.unwrap(),
                received: String::new(),
                cursor: 0,
            }
        }

        /// Reads until `needle` shows up after everything already consumed and
        /// returns the text up to and including it.
        async fn expect(&mut self, needle: &str) -> String {
            let deadline = tokio::time::Instant::now() + WAIT;
            loop {
                if let Some(offset) = self.received[self.cursor..].find(needle) {
                    let end = self.cursor + offset + needle.len();
                    let text = self.received[self.cursor..end].to_string();
                    self.cursor = end;
                    return text;
                }
                let mut buffer = [0u8; 1024];
                let read = tokio::time::timeout_at(deadline, self.stream.read(&mut buffer))
                    .await
                    .unwrap_or_else(|_| panic!("timed out waiting for {:?}, got {:?}", needle, &self.received[self.cursor..]))
                    .unwrap();
                assert!(read > 0, "connection closed while waiting for {:?}", needle);
                self.received.push_str(&String::from_utf8_lossy(&buffer[..read]));
            }
        }

        async fn expect_closed_without_data(&mut self) {
            let mut buffer = [0u8; 64];
            let read = tokio::time::timeout(WAIT, self.stream.read(&mut buffer))
                .await
                .expect("connection was not closed")
                .unwrap_or(0);
            assert_eq!(read, 0, "unexpected data: {:?}", String::from_utf8_lossy(&buffer[..read]));
        }

        async fn send(&mut self, line: &str) {
            self.stream.write_all(format!("{}\n", line).as_bytes()).await.unwrap();
        }
    }

    fn settings(timeout_ms: u64) -> ServerSettings {
        ServerSettings {
            bind_host: "127.0.0.1".to_string(),
            matchmaking_timeout_ms: timeout_ms,
            ..ServerSettings::default()
        }
    }

    async fn human_pair(addr: SocketAddr) -> (TestClient, TestClient) {
        let mut first = TestClient::connect(addr).await;
        first.expect("You are the first player\n").await;
        let mut second = TestClient::connect(addr).await;
        second.expect("You are the second player\n").await;

        first.expect(protocol::PROMPT).await;
        second.expect(protocol::WAIT_NOTICE).await;
        (first, second)
    }

    #[tokio::test]
    async fn test_two_players_play_until_row_win() {
        let addr = spawn_local_server(settings(10_000)).await.unwrap();
        let (mut first, mut second) = human_pair(addr).await;

        for (x_move, o_move) in [("1", "4"), ("2", "5")] {
            first.send(x_move).await;
            first.expect(protocol::WAIT_NOTICE).await;
            second.expect(protocol::PROMPT).await;
            second.send(o_move).await;
            second.expect(protocol::WAIT_NOTICE).await;
            first.expect(protocol::PROMPT).await;
        }
        first.send("3").await;

        let first_text = first.expect(protocol::WIN).await;
        assert!(first_text.contains("X X X\nO O 6\n7 8 9\n"));
        let second_text = second.expect(protocol::LOSE).await;
        assert!(second_text.contains("X X X\nO O 6\n7 8 9\n"));
        assert!(!second_text.contains("won"));

        first.expect_closed_without_data().await;
        second.expect_closed_without_data().await;
    }

    #[tokio::test]
    async fn test_two_players_reach_a_draw() {
        let addr = spawn_local_server(settings(10_000)).await.unwrap();
        let (mut first, mut second) = human_pair(addr).await;

        let moves = ["1", "2", "3", "5", "4", "6", "8", "7"];
        for pair in moves.chunks(2) {
            first.send(pair[0]).await;
            second.expect(protocol::PROMPT).await;
            second.send(pair[1]).await;
            first.expect(protocol::PROMPT).await;
        }
        first.send("9").await;

        let expected_board = "X O X\nX O O\nO X X\n";
        let first_text = first.expect("draw").await;
        let second_text = second.expect("draw").await;
        assert!(first_text.contains(expected_board));
        assert!(second_text.contains(expected_board));
    }

    #[tokio::test]
    async fn test_invalid_moves_are_reprompted_without_changing_turn() {
        let addr = spawn_local_server(settings(10_000)).await.unwrap();
        let (mut first, mut second) = human_pair(addr).await;

        first.send("10").await;
        first.expect("Invalid move. Try again.\nEnter your turn: ").await;
        first.send("abc").await;
        first.expect("Invalid input. Please enter a number.\nEnter your turn: ").await;

        first.send("5").await;
        let board = second.expect(protocol::PROMPT).await;
        assert!(board.contains("1 2 3\n4 X 6\n7 8 9\n"));

        second.send("5").await;
        second.expect("Invalid move. Try again.\nEnter your turn: ").await;
        second.send("1").await;
        let board = first.expect(protocol::PROMPT).await;
        assert!(board.contains("O 2 3\n4 X 6\n7 8 9\n"));
    }

    #[tokio::test]
    async fn test_lone_player_gets_bot_after_timeout() {
        let addr = spawn_local_server(settings(100)).await.unwrap();
        let mut player = TestClient::connect(addr).await;

        player.expect("Please wait for the other player to connect...\n").await;
        let intro = player.expect(protocol::PROMPT).await;
        assert!(intro.contains(protocol::PLAYING_BOT));
        assert!(intro.contains("1 2 3\n4 5 6\n7 8 9\n"));

        player.send("5").await;
        let reply = player.expect("Bot's move: ").await;
        assert!(reply.contains("4 X 6"));
    }

    fn bot_position(text: &str) -> usize {
        text.split("Bot's move: ")
            .nth(1)
            .and_then(|rest| rest.lines().next())
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or_else(|| panic!("no bot move in {:?}", text))
    }

    #[tokio::test]
    async fn test_bot_blocks_two_in_a_row() {
        let addr = spawn_local_server(settings(50)).await.unwrap();
        let mut player = TestClient::connect(addr).await;
        player.expect(protocol::PROMPT).await;

        player.send("1").await;
        let first_reply = player.expect(protocol::PROMPT).await;
        let first_bot_move = bot_position(&first_reply);

        // Pair up with cell 1 on a line the bot has not touched.
        let (second_move, threat) = if first_bot_move == 2 || first_bot_move == 3 { (4, 7) } else { (2, 3) };
        player.send(&second_move.to_string()).await;
        let second_reply = player.expect(protocol::PROMPT).await;

        assert_eq!(bot_position(&second_reply), threat);
    }

    #[tokio::test]
    async fn test_connection_after_bot_switch_is_closed() {
        let addr = spawn_local_server(settings(50)).await.unwrap();
        let mut player = TestClient::connect(addr).await;
        player.expect(protocol::PLAYING_BOT).await;

        let mut late = TestClient::connect(addr).await;
        late.expect_closed_without_data().await;

        // The slot is cleared, so the next arrival starts a fresh session.
        let mut next = TestClient::connect(addr).await;
        next.expect("You are the first player\n").await;

        // The bot game is unaffected.
        player.expect(protocol::PROMPT).await;
        player.send("5").await;
        player.expect("Bot's move: ").await;
    }

    #[tokio::test]
    async fn test_second_player_before_timeout_prevents_bot() {
        let addr = spawn_local_server(settings(300)).await.unwrap();
        let (mut first, mut second) = human_pair(addr).await;

        tokio::time::sleep(Duration::from_millis(500)).await;

        first.send("5").await;
        let text = second.expect(protocol::PROMPT).await;
        assert!(text.contains("4 X 6"));
        assert!(!first.expect(protocol::WAIT_NOTICE).await.contains("Bot's move"));
    }

    #[tokio::test]
    async fn test_abandoned_session_is_not_joined() {
        let addr = spawn_local_server(settings(10_000)).await.unwrap();
        let mut quitter = TestClient::connect(addr).await;
        quitter.expect("You are the first player\n").await;
        drop(quitter);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut next = TestClient::connect(addr).await;
        next.expect("You are the first player\n").await;
    }

    #[tokio::test]
    async fn test_opponent_disconnect_ends_session() {
        let addr = spawn_local_server(settings(10_000)).await.unwrap();
        let (first, mut second) = human_pair(addr).await;

        drop(first);
        second.expect_closed_without_data().await;
    }

    #[tokio::test]
    async fn test_out_of_turn_line_is_applied_on_next_turn() {
        let addr = spawn_local_server(settings(10_000)).await.unwrap();
        let (mut first, mut second) = human_pair(addr).await;

        second.send("9").await;
        first.send("1").await;

        // Player two's early "9" is consumed as soon as it is their turn.
        let board = first.expect(protocol::PROMPT).await;
        assert!(board.contains("X 2 3\n4 5 6\n7 8 O\n"));
        second.expect(protocol::WAIT_NOTICE).await;
    }

    #[tokio::test]
    async fn test_sessions_run_in_parallel() {
        let addr = spawn_local_server(settings(10_000)).await.unwrap();
        let (mut a1, mut a2) = human_pair(addr).await;
        let (mut b1, mut b2) = human_pair(addr).await;

        b1.send("9").await;
        let b_board = b2.expect(protocol::PROMPT).await;
        assert!(b_board.contains("7 8 X"));

        a1.send("1").await;
        let a_board = a2.expect(protocol::PROMPT).await;
        assert!(a_board.contains("X 2 3"));
        assert!(a_board.contains("7 8 9"));
    }
}
