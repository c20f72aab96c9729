//! Make / unmake machinery.
//!
//! `make_move` mutates the board in place and returns an `Undo` token;
//! `unmake_move` with that token restores the previous state bit-exactly,
//! Zobrist key and repetition counters included. The token carries the
//! pre-move hash, so unmake assigns scalars back instead of XOR-reversing
//! each incremental update.

use crate::board::{Board, CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ, Color, Piece};
use crate::hash::zobrist::{xor_castling_rights_delta, zobrist_keys};
use crate::moves::magic::MagicTables;
use crate::moves::movegen::generate_pseudo_legal;
use crate::moves::square_control::{in_check, is_legal_castling};
use crate::moves::types::{Move, MoveBuffer, NullMoveUndo, Undo};
use crate::square::Square;

/// Castling rook (from, to) keyed by the king's destination index.
#[inline(always)]
fn rook_castle_squares(king_to_idx: u8) -> Option<(Square, Square)> {
    match king_to_idx {
        6 => Some((Square::from_index(7), Square::from_index(5))), // White O-O
        2 => Some((Square::from_index(0), Square::from_index(3))), // White O-O-O
        62 => Some((Square::from_index(63), Square::from_index(61))), // Black O-O
        58 => Some((Square::from_index(56), Square::from_index(59))), // Black O-O-O
        _ => None,
    }
}

/// Which castling right dies when a rook leaves (or is captured on) a home
/// corner.
#[inline(always)]
fn rights_mask_for_rook(color: Color, rook_sq: u8) -> u8 {
    match (color, rook_sq) {
        (Color::White, 0) => CASTLE_WQ,  // a1
        (Color::White, 7) => CASTLE_WK,  // h1
        (Color::Black, 56) => CASTLE_BQ, // a8
        (Color::Black, 63) => CASTLE_BK, // h8
        _ => 0,
    }
}

#[inline(always)]
fn remove_piece(board: &mut Board, color: Color, piece: Piece, idx: usize) {
    let new_bb = board.bb(color, piece) & !(1u64 << idx);
    board.set_bb(color, piece, new_bb);
}

#[inline(always)]
fn place_piece(board: &mut Board, color: Color, piece: Piece, idx: usize) {
    let new_bb = board.bb(color, piece) | (1u64 << idx);
    board.set_bb(color, piece, new_bb);
}

pub fn make_move(board: &mut Board, mv: Move) -> Undo {
    let keys = zobrist_keys();
    let color = board.side_to_move;
    let from_idx = mv.from.index() as usize;
    let to_idx = mv.to.index() as usize;

    debug_assert_eq!(
        board.piece_at(mv.from),
        Some((color, mv.piece)),
        "move {} does not match the board",
        mv
    );

    // Capture identity first: the EP victim does not stand on the
    // destination square.
    let capture = if mv.is_en_passant() {
        let cap_idx = match color {
            Color::White => to_idx - 8,
            Color::Black => to_idx + 8,
        };
        Some((
            color.opposite(),
            Piece::Pawn,
            Square::from_index(cap_idx as u8),
        ))
    } else {
        board
            .piece_at(mv.to)
            .map(|(cap_color, cap_piece)| (cap_color, cap_piece, mv.to))
    };

    let castling_rook = if mv.is_castling() {
        rook_castle_squares(mv.to.index())
    } else {
        None
    };

    let undo = Undo {
        capture,
        castling_rook,
        prev_castling_rights: board.castling_rights,
        prev_ep_file: board.ep_file,
        prev_halfmove_clock: board.halfmove_clock,
        prev_fullmove_number: board.fullmove_number,
        prev_side: color,
        prev_zobrist: board.zobrist,
    };

    // Hash out the old EP file; a fresh one only appears on a double push.
    if let Some(file) = board.ep_file {
        board.zobrist ^= keys.ep_file[file as usize];
    }
    board.ep_file = None;

    // Clocks.
    if capture.is_some() || mv.piece == Piece::Pawn {
        board.halfmove_clock = 0;
    } else {
        board.halfmove_clock += 1;
    }
    if color == Color::Black {
        board.fullmove_number += 1;
    }

    // Castling rights erosion, hashed as a delta.
    let old_rights = board.castling_rights;
    let mut mask_to_clear: u8 = 0;
    if mv.piece == Piece::King {
        mask_to_clear |= match color {
            Color::White => CASTLE_WK | CASTLE_WQ,
            Color::Black => CASTLE_BK | CASTLE_BQ,
        };
    }
    if mv.piece == Piece::Rook {
        mask_to_clear |= rights_mask_for_rook(color, mv.from.index());
    }
    if let Some((cap_color, cap_piece, cap_sq)) = capture
        && cap_piece == Piece::Rook
    {
        mask_to_clear |= rights_mask_for_rook(cap_color, cap_sq.index());
    }
    let new_rights = old_rights & !mask_to_clear;
    if new_rights != old_rights {
        board.castling_rights = new_rights;
        xor_castling_rights_delta(&mut board.zobrist, keys, old_rights, new_rights);
    }

    // Piece movement; set_bb keeps mailbox, occupancy, and hash in sync.
    if let Some((cap_color, cap_piece, cap_sq)) = capture {
        remove_piece(board, cap_color, cap_piece, cap_sq.index() as usize);
    }
    remove_piece(board, color, mv.piece, from_idx);
    if let Some(prom) = mv.promotion {
        debug_assert_eq!(mv.piece, Piece::Pawn, "only pawns promote");
        place_piece(board, color, prom, to_idx);
    } else {
        place_piece(board, color, mv.piece, to_idx);
    }
    if let Some((rook_from, rook_to)) = castling_rook {
        remove_piece(board, color, Piece::Rook, rook_from.index() as usize);
        place_piece(board, color, Piece::Rook, rook_to.index() as usize);
    }

    // A double push leaves the EP file behind it.
    if mv.is_double_pawn_push() {
        let file = mv.from.file();
        board.ep_file = Some(file);
        board.zobrist ^= keys.ep_file[file as usize];
    }

    // Flip the side to move.
    board.side_to_move = color.opposite();
    board.zobrist ^= keys.side_to_move;

    // Repetition bookkeeping: the post-move key joins stack and multiset.
    board.key_stack.push(board.zobrist);
    *board.key_counts.entry(board.zobrist).or_insert(0) += 1;

    #[cfg(debug_assertions)]
    board.assert_hash();

    undo
}

pub fn unmake_move(board: &mut Board, mv: Move, undo: Undo) {
    // Drop the position being left from the repetition records.
    let popped = board.key_stack.pop();
    debug_assert_eq!(popped, Some(board.zobrist), "unmake out of order");
    if let Some(count) = board.key_counts.get_mut(&board.zobrist) {
        *count -= 1;
        if *count == 0 {
            board.key_counts.remove(&board.zobrist);
        }
    }

    let color = undo.prev_side;
    let from_idx = mv.from.index() as usize;
    let to_idx = mv.to.index() as usize;

    // Reverse the placements.
    if let Some(prom) = mv.promotion {
        remove_piece(board, color, prom, to_idx);
        place_piece(board, color, Piece::Pawn, from_idx);
    } else {
        remove_piece(board, color, mv.piece, to_idx);
        place_piece(board, color, mv.piece, from_idx);
    }
    if let Some((cap_color, cap_piece, cap_sq)) = undo.capture {
        place_piece(board, cap_color, cap_piece, cap_sq.index() as usize);
    }
    if let Some((rook_from, rook_to)) = undo.castling_rook {
        remove_piece(board, color, Piece::Rook, rook_to.index() as usize);
        place_piece(board, color, Piece::Rook, rook_from.index() as usize);
    }

    // Scalars come straight from the token, the hash included.
    board.side_to_move = undo.prev_side;
    board.castling_rights = undo.prev_castling_rights;
    board.ep_file = undo.prev_ep_file;
    board.halfmove_clock = undo.prev_halfmove_clock;
    board.fullmove_number = undo.prev_fullmove_number;
    board.zobrist = undo.prev_zobrist;

    #[cfg(debug_assertions)]
    board.assert_hash();
}

/// Pass the move: flip side, clear EP, bump the halfmove clock. Repetition
/// history is deliberately untouched.
pub fn make_null_move(board: &mut Board) -> NullMoveUndo {
    let keys = zobrist_keys();
    let undo = NullMoveUndo {
        prev_ep_file: board.ep_file,
        prev_halfmove_clock: board.halfmove_clock,
        prev_zobrist: board.zobrist,
    };

    if let Some(file) = board.ep_file {
        board.zobrist ^= keys.ep_file[file as usize];
    }
    board.ep_file = None;
    board.halfmove_clock += 1;

    board.side_to_move = board.side_to_move.opposite();
    board.zobrist ^= keys.side_to_move;

    undo
}

pub fn unmake_null_move(board: &mut Board, undo: NullMoveUndo) {
    board.side_to_move = board.side_to_move.opposite();
    board.ep_file = undo.prev_ep_file;
    board.halfmove_clock = undo.prev_halfmove_clock;
    board.zobrist = undo.prev_zobrist;

    #[cfg(debug_assertions)]
    board.assert_hash();
}

/// All strictly legal moves: pseudo-legal generation filtered by
/// make-test-unmake, with the castling transit check up front.
pub fn generate_legal(
    board: &mut Board,
    tables: &MagicTables,
    moves: &mut impl MoveBuffer,
    scratch: &mut impl MoveBuffer,
) {
    scratch.clear();
    generate_pseudo_legal(board, tables, scratch);
    moves.clear();

    for i in 0..scratch.len() {
        let mv = scratch[i];
        if mv.is_castling() && !is_legal_castling(board, mv, tables) {
            continue;
        }
        let mover = board.side_to_move;
        let undo = make_move(board, mv);
        let illegal = in_check(board, mover, tables);
        unmake_move(board, mv, undo);
        if !illegal {
            moves.push(mv);
        }
    }
}

/// Is this pseudo-legal move actually legal here? Castling is fully decided
/// by the transit check; everything else makes, tests the mover's king, and
/// unmakes.
#[inline]
pub fn is_legal_move(board: &mut Board, mv: Move, tables: &MagicTables) -> bool {
    if mv.is_castling() {
        return is_legal_castling(board, mv, tables);
    }
    let mover = board.side_to_move;
    let undo = make_move(board, mv);
    let illegal = in_check(board, mover, tables);
    unmake_move(board, mv, undo);
    !illegal
}
