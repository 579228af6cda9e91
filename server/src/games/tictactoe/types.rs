use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mark {
    Empty,
    X,
    O,
}

impl Mark {
    pub fn is_empty(&self) -> bool {
        *self == Mark::Empty
    }
}

/// Seat in a match. Player one always plays crosses and moves first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub const ALL: [Player; 2] = [Player::One, Player::Two];

    pub fn mark(self) -> Mark {
        match self {
            Player::One => Mark::X,
            Player::Two => Mark::O,
        }
    }

    pub fn from_mark(mark: Mark) -> Option<Player> {
        match mark {
            Mark::X => Some(Player::One),
            Mark::O => Some(Player::Two),
            Mark::Empty => None,
        }
    }

    pub fn other(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index() + 1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    InProgress,
    Won(Player),
    Draw,
}

/// Three cells holding the same mark. Cell indices are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinningLine {
    pub mark: Mark,
    pub cells: [usize; 3],
}

impl WinningLine {
    pub fn new(mark: Mark, cells: [usize; 3]) -> Self {
        Self { mark, cells }
    }
}

impl fmt::Display for WinningLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.cells;
        write!(f, "{}-{}-{}", a + 1, b + 1, c + 1)
    }
}
