use super::board::Board;
use super::types::Mark;
use super::win_detector::WINNING_LINES;
use crate::games::SessionRng;

/// Picks the bot's next 1-based position: block the first line where the
/// human has two crosses and the third cell is open, otherwise a uniformly
/// random open cell. `None` only for a full board.
pub fn calculate_move(board: &Board, rng: &mut SessionRng) -> Option<usize> {
    find_blocking_move(board).or_else(|| calculate_random_move(board, rng))
}

pub fn find_blocking_move(board: &Board) -> Option<usize> {
    let cells = board.cells();
    WINNING_LINES.iter().find_map(|line| {
        let crosses = line.iter().filter(|&&index| cells[index] == Mark::X).count();
        let open = line.iter().find(|&&index| cells[index].is_empty());
        match open {
            Some(&index) if crosses == 2 => Some(index + 1),
            _ => None,
        }
    })
}

fn calculate_random_move(board: &Board, rng: &mut SessionRng) -> Option<usize> {
    rng.choose(&board.available_positions()).copied()
}
