use super::board::CELL_COUNT;
use super::types::{Mark, WinningLine};

/// Rows, then columns, then both diagonals.
pub const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

pub fn check_win(cells: &[Mark; CELL_COUNT]) -> Option<Mark> {
    check_win_with_line(cells).map(|line| line.mark)
}

pub fn check_win_with_line(cells: &[Mark; CELL_COUNT]) -> Option<WinningLine> {
    WINNING_LINES.iter().find_map(|&line| {
        let [a, b, c] = line;
        let mark = cells[a];
        if !mark.is_empty() && cells[b] == mark && cells[c] == mark {
            Some(WinningLine::new(mark, line))
        } else {
            None
        }
    })
}
