use super::bot_controller::calculate_move;
use super::types::{GameStatus, Mark, Player};
use super::win_detector::check_win;
use crate::games::SessionRng;

pub const CELL_COUNT: usize = 9;
pub const ROW_LENGTH: usize = 3;

/// The 3x3 grid. Positions exposed to players are 1-based; an empty cell is
/// shown as its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [Mark; CELL_COUNT],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [Mark::Empty; CELL_COUNT],
        }
    }

    /// Builds a board from nine characters: `X`, `O`, anything else is empty.
    #[cfg(test)]
    pub fn from_layout(layout: &str) -> Self {
        let mut board = Self::new();
        for (index, ch) in layout.chars().take(CELL_COUNT).enumerate() {
            board.cells[index] = match ch {
                'X' => Mark::X,
                'O' => Mark::O,
                _ => Mark::Empty,
            };
        }
        board
    }

    pub fn reset(&mut self) {
        self.cells = [Mark::Empty; CELL_COUNT];
    }

    pub fn cells(&self) -> &[Mark; CELL_COUNT] {
        &self.cells
    }

    #[cfg(test)]
    pub fn get(&self, position: usize) -> Option<Mark> {
        let index = position.checked_sub(1)?;
        self.cells.get(index).copied()
    }

    /// Places `mark` at a 1-based position. Returns false without touching the
    /// board if the position is outside 1..=9, the cell is taken, or `mark` is
    /// `Mark::Empty`.
    pub fn make_move(&mut self, position: i64, mark: Mark) -> bool {
        if mark.is_empty() || !(1..=CELL_COUNT as i64).contains(&position) {
            return false;
        }
        let cell = &mut self.cells[(position - 1) as usize];
        if !cell.is_empty() {
            return false;
        }
        *cell = mark;
        true
    }

    pub fn check_result(&self) -> GameStatus {
        if let Some(winner) = check_win(&self.cells).and_then(Player::from_mark) {
            return GameStatus::Won(winner);
        }
        if self.is_full() {
            GameStatus::Draw
        } else {
            GameStatus::InProgress
        }
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| !cell.is_empty())
    }

    /// 1-based positions of the cells still open, ascending.
    pub fn available_positions(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_empty())
            .map(|(index, _)| index + 1)
            .collect()
    }

    pub fn select_bot_move(&self, rng: &mut SessionRng) -> Option<usize> {
        calculate_move(self, rng)
    }

    pub fn render(&self) -> String {
        let mut rendered = String::from("The board currently is:\n");
        for (index, cell) in self.cells.iter().enumerate() {
            match cell {
                Mark::X => rendered.push('X'),
                Mark::O => rendered.push('O'),
                Mark::Empty => rendered.push_str(&(index + 1).to_string()),
            }
            rendered.push(if index % ROW_LENGTH == ROW_LENGTH - 1 { '\n' } else { ' ' });
        }
        rendered
    }
}
