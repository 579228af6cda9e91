use std::collections::VecDeque;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::mpsc;

use common::protocol::{self, MoveInput};
use common::{ClientId, SessionId, log, log_error};

use crate::connection::Connection;
use crate::games::SessionRng;
use crate::games::tictactoe::{Board, GameStatus, Mark, Player, check_win_with_line};
use crate::matchmaking::{MatchTicket, Resolution};
use crate::server_config::PENDING_LINE_LIMIT;

/// Everything a session reacts to. Readers, writers, the matchmaking timer
/// and the accept loop all feed one queue, and the session task consumes it
/// alone, so board, turn and outbound writes are never touched concurrently.
#[derive(Debug)]
pub enum SessionEvent {
    Line { player: Player, line: String },
    Closed { player: Player },
    SecondPlayer { stream: TcpStream, client_id: ClientId },
    MatchmakingTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    AwaitingSecondPlayer,
    HumanVsHuman,
    HumanVsBot,
}

enum PlayerSlot {
    Unconnected,
    Human(Connection),
    Bot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Finished,
}

/// The handle the accept loop keeps for a session that still waits for its
/// second player.
#[derive(Clone)]
pub struct WaitingSession {
    pub session_id: SessionId,
    pub ticket: Arc<MatchTicket>,
    pub events: mpsc::Sender<SessionEvent>,
}

pub struct GameSession {
    session_id: SessionId,
    board: Board,
    players: [PlayerSlot; 2],
    turn: Player,
    mode: SessionMode,
    ticket: Arc<MatchTicket>,
    events: mpsc::Receiver<SessionEvent>,
    events_tx: mpsc::Sender<SessionEvent>,
    pending: [VecDeque<String>; 2],
    rng: SessionRng,
    outbound_queue_size: usize,
}

impl GameSession {
    /// Creates a session around its first participant. `events_tx` must be
    /// the sender half of `events`; the session hands it to the second
    /// player's connection.
    pub fn new(
        session_id: SessionId,
        first_player: Connection,
        ticket: Arc<MatchTicket>,
        events_tx: mpsc::Sender<SessionEvent>,
        events: mpsc::Receiver<SessionEvent>,
        rng: SessionRng,
        outbound_queue_size: usize,
    ) -> Self {
        Self {
            session_id,
            board: Board::new(),
            players: [PlayerSlot::Human(first_player), PlayerSlot::Unconnected],
            turn: Player::One,
            mode: SessionMode::AwaitingSecondPlayer,
            ticket,
            events,
            events_tx,
            pending: [VecDeque::new(), VecDeque::new()],
            rng,
            outbound_queue_size,
        }
    }

    pub fn waiting_handle(&self) -> WaitingSession {
        WaitingSession {
            session_id: self.session_id.clone(),
            ticket: self.ticket.clone(),
            events: self.events_tx.clone(),
        }
    }

    /// Runs the match to completion. Connections close when the session is
    /// dropped at the end.
    pub async fn run(mut self) {
        self.deliver(Player::One, &protocol::first_player_welcome()).await;

        if self.await_second_player().await {
            self.start().await;
            self.play().await;
        }

        log!("[{}] Session finished", self.session_id);
    }

    async fn await_second_player(&mut self) -> bool {
        while let Some(event) = self.events.recv().await {
            match event {
                SessionEvent::SecondPlayer { stream, client_id } => {
                    let connection = Connection::spawn(
                        stream,
                        client_id,
                        Player::Two,
                        self.events_tx.clone(),
                        self.outbound_queue_size,
                    );
                    log!("[{}] Player 2 connected from {}. Starting game", self.session_id, connection.client_id());
                    connection.deliver(&protocol::second_player_welcome()).await;
                    self.players[Player::Two.index()] = PlayerSlot::Human(connection);
                    self.mode = SessionMode::HumanVsHuman;
                    return true;
                }
                SessionEvent::MatchmakingTimeout => {
                    log!(
                        "[{}] Starting game with bot for player 1 (rng seed {})",
                        self.session_id,
                        self.rng.seed()
                    );
                    self.players[Player::Two.index()] = PlayerSlot::Bot;
                    self.mode = SessionMode::HumanVsBot;
                    return true;
                }
                SessionEvent::Line { player, line } => self.hold_line(player, line),
                SessionEvent::Closed { player } => {
                    // Stop the timer and let the accept loop start afresh, unless a
                    // resolution already won; a claimed second player is dropped with us.
                    let _ = self.ticket.try_resolve(Resolution::Abandoned);
                    log!("[{}] Player {} left before the game started", self.session_id, player);
                    return false;
                }
            }
        }
        false
    }

    async fn start(&mut self) {
        self.board.reset();
        self.turn = Player::One;
        let board_text = self.board.render();

        self.deliver(Player::One, protocol::PLAYING_CROSSES).await;
        self.deliver(Player::One, &board_text).await;

        match self.mode {
            SessionMode::HumanVsBot => {
                self.deliver(Player::One, protocol::PLAYING_BOT).await;
                self.deliver(Player::One, protocol::PROMPT).await;
            }
            _ => {
                self.deliver(Player::Two, protocol::PLAYING_NOUGHTS).await;
                self.deliver(Player::Two, &board_text).await;
                self.deliver(Player::One, protocol::PROMPT).await;
                self.deliver(Player::Two, protocol::WAIT_NOTICE).await;
            }
        }
    }

    async fn play(&mut self) {
        while let Some(line) = self.next_line_for_turn().await {
            log!("[{}] Received from player {}: {}", self.session_id, self.turn, line);
            if self.process_move(&line).await == Flow::Finished {
                return;
            }
        }
    }

    /// Waits for the next line from whoever holds the turn. Lines from the
    /// other player are held until their turn. `None` once a participant's
    /// connection is gone.
    async fn next_line_for_turn(&mut self) -> Option<String> {
        if let Some(line) = self.pending[self.turn.index()].pop_front() {
            return Some(line);
        }

        while let Some(event) = self.events.recv().await {
            match event {
                SessionEvent::Line { player, line } if player == self.turn => return Some(line),
                SessionEvent::Line { player, line } => self.hold_line(player, line),
                SessionEvent::Closed { player } => {
                    log_error!("[{}] Connection to player {} lost, ending session", self.session_id, player);
                    return None;
                }
                SessionEvent::SecondPlayer { client_id, .. } => {
                    log!("[{}] Unexpected late player {} dropped", self.session_id, client_id);
                }
                SessionEvent::MatchmakingTimeout => {}
            }
        }
        None
    }

    fn hold_line(&mut self, player: Player, line: String) {
        let queue = &mut self.pending[player.index()];
        if queue.len() >= PENDING_LINE_LIMIT {
            log!("[{}] Discarding out-of-turn line from player {}: {}", self.session_id, player, line);
            return;
        }
        queue.push_back(line);
    }

    async fn process_move(&mut self, line: &str) -> Flow {
        let mover = self.turn;

        let position = match protocol::parse_move(line) {
            MoveInput::Position(position) => position,
            MoveInput::Malformed => {
                log!("[{}] Player {} sent malformed move {:?}", self.session_id, mover, line);
                self.deliver(mover, &protocol::rejection(protocol::INVALID_INPUT)).await;
                return Flow::Continue;
            }
        };

        if !self.board.make_move(position, mover.mark()) {
            log!("[{}] Player {} tried invalid move {}", self.session_id, mover, position);
            self.deliver(mover, &protocol::rejection(protocol::INVALID_MOVE)).await;
            return Flow::Continue;
        }

        let board_text = self.board.render();
        match self.board.check_result() {
            GameStatus::Won(winner) => {
                self.log_win(winner);
                self.broadcast(&board_text).await;
                self.deliver(winner, protocol::WIN).await;
                if self.mode == SessionMode::HumanVsHuman {
                    self.deliver(winner.other(), protocol::LOSE).await;
                }
                Flow::Finished
            }
            GameStatus::Draw => {
                log!("[{}] Game ended in a draw", self.session_id);
                self.broadcast(&format!("{}{}", board_text, protocol::DRAW)).await;
                Flow::Finished
            }
            GameStatus::InProgress => {
                self.broadcast(&board_text).await;
                match self.mode {
                    SessionMode::HumanVsBot => self.play_bot_turn().await,
                    _ => {
                        self.deliver(mover, protocol::WAIT_NOTICE).await;
                        self.turn = mover.other();
                        self.deliver(self.turn, protocol::PROMPT).await;
                        Flow::Continue
                    }
                }
            }
        }
    }

    async fn play_bot_turn(&mut self) -> Flow {
        let Some(position) = self.board.select_bot_move(&mut self.rng) else {
            log_error!("[{}] Bot found no open cell on an unfinished board", self.session_id);
            return Flow::Finished;
        };
        self.board.make_move(position as i64, Mark::O);

        self.deliver(Player::One, &self.board.render()).await;
        self.deliver(Player::One, &protocol::bot_move(position)).await;

        match self.board.check_result() {
            GameStatus::Won(winner) => {
                self.log_win(winner);
                self.deliver(Player::One, protocol::BOT_WON).await;
                Flow::Finished
            }
            GameStatus::Draw => {
                log!("[{}] Game ended in a draw", self.session_id);
                self.deliver(Player::One, protocol::DRAW).await;
                Flow::Finished
            }
            GameStatus::InProgress => {
                self.deliver(Player::One, protocol::PROMPT).await;
                Flow::Continue
            }
        }
    }

    fn log_win(&self, winner: Player) {
        match check_win_with_line(self.board.cells()) {
            Some(line) => log!("[{}] Player {} wins with {}", self.session_id, winner, line),
            None => log!("[{}] Player {} wins", self.session_id, winner),
        }
    }

    async fn deliver(&self, player: Player, message: &str) {
        if let PlayerSlot::Human(connection) = &self.players[player.index()] {
            connection.deliver(message).await;
        }
    }

    /// Player one's connection is always written before player two's.
    async fn broadcast(&self, message: &str) {
        for player in Player::ALL {
            self.deliver(player, message).await;
        }
    }
}
