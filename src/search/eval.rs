//! Static evaluation: material plus a small positional nudge, from the
//! side-to-move's perspective. Every value it can return sits well inside
//! the mate threshold.

use crate::board::{Board, Color, Piece};

/// c3..f6 block, the squares worth contesting early.
const CENTER: u64 = 0x0000_3C3C_3C3C_0000;
/// Back ranks, for the minor-piece development nudge.
const BACK_RANKS: u64 = 0xFF00_0000_0000_00FF;

const CENTRAL_PAWN_BONUS: i32 = 10;
const DEVELOPED_MINOR_BONUS: i32 = 5;

const MATERIAL: [(Piece, i32); 5] = [
    (Piece::Pawn, 100),
    (Piece::Knight, 320),
    (Piece::Bishop, 330),
    (Piece::Rook, 500),
    (Piece::Queen, 900),
];

fn side_score(board: &Board, color: Color) -> i32 {
    let mut score = 0;
    for &(piece, value) in &MATERIAL {
        score += board.pieces(piece, color).count_ones() as i32 * value;
    }

    let pawns = board.pieces(Piece::Pawn, color);
    score += (pawns & CENTER).count_ones() as i32 * CENTRAL_PAWN_BONUS;

    let minors = board.pieces(Piece::Knight, color) | board.pieces(Piece::Bishop, color);
    score += (minors & !BACK_RANKS).count_ones() as i32 * DEVELOPED_MINOR_BONUS;

    score
}

/// Score for the side to move.
pub fn static_eval(board: &Board) -> i32 {
    let white = side_score(board, Color::White);
    let black = side_score(board, Color::Black);
    match board.side_to_move {
        Color::White => white - black,
        Color::Black => black - white,
    }
}
