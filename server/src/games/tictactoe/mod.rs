pub mod board;
pub mod bot_controller;
pub mod types;
pub mod win_detector;

pub use board::{Board, CELL_COUNT};
pub use bot_controller::calculate_move;
pub use types::{GameStatus, Mark, Player, WinningLine};
pub use win_detector::{check_win, check_win_with_line};

