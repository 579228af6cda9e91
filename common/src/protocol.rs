//! Text exchanged between the server and the client.
//!
//! The protocol is newline-terminated human-readable text. Clients detect the
//! end of a game and input requests by substring matching, so the exact
//! wording of the outcome and prompt messages is part of the contract.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_GAME_PORT: u16 = 12345;

pub const PROMPT: &str = "Enter your turn: ";
pub const WAIT_NOTICE: &str = "Please wait for the other player's turn...\n";
pub const INVALID_MOVE: &str = "Invalid move. Try again.\n";
pub const INVALID_INPUT: &str = "Invalid input. Please enter a number.\n";

pub const PLAYING_CROSSES: &str = "You are playing crosses (X). Good luck!\n";
pub const PLAYING_NOUGHTS: &str = "You are playing noughts (O). Good luck!\n";
pub const PLAYING_BOT: &str = "You are playing against the bot.\n";

pub const WIN: &str = "Congratulations! You won!\n";
pub const LOSE: &str = "Sorry! You lose!\n";
pub const BOT_WON: &str = "Sorry! The bot won!\n";
pub const DRAW: &str = "It's a draw!\n";

const GAME_END_MARKERS: [&str; 3] = ["won", "lose", "draw"];
const INPUT_REQUEST_MARKERS: [&str; 2] = ["Enter your turn:", "Invalid"];

pub fn first_player_welcome() -> String {
    format!(
        "Welcome to the TicTacToe server version {}!\nYou are the first player\nPlease wait for the other player to connect...\n",
        VERSION
    )
}

pub fn second_player_welcome() -> String {
    format!("Welcome to the TicTacToe server version {}!\nYou are the second player\n", VERSION)
}

pub fn bot_move(position: usize) -> String {
    format!("Bot's move: {}\n", position)
}

pub fn rejection(reason: &str) -> String {
    format!("{}{}", reason, PROMPT)
}

pub fn is_game_over_text(text: &str) -> bool {
    GAME_END_MARKERS.iter().any(|marker| text.contains(marker))
}

pub fn requests_input(text: &str) -> bool {
    INPUT_REQUEST_MARKERS.iter().any(|marker| text.contains(marker))
}

/// A received move line, before it is checked against the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveInput {
    /// Any base-10 integer; range and occupancy are the board's concern.
    Position(i64),
    Malformed,
}

/// Reads the leading integer of a line: optional whitespace, an optional
/// sign, then at least one digit. Anything after the digits is ignored, so
/// `"5abc"` is 5. No digits or an out-of-range number is `Malformed`.
pub fn parse_move(line: &str) -> MoveInput {
    let text = line.trim_start();
    let sign_len = usize::from(text.starts_with(['+', '-']));
    let digit_len = text[sign_len..].bytes().take_while(u8::is_ascii_digit).count();
    if digit_len == 0 {
        return MoveInput::Malformed;
    }

    match text[..sign_len + digit_len].parse::<i64>() {
        Ok(position) => MoveInput::Position(position),
        Err(_) => MoveInput::Malformed,
    }
}
