//! The engine boundary: one object owning the transposition table and the
//! killer/history state, so several engines can coexist in a process, plus
//! the UCI move-string glue the shell speaks through.

use crate::board::Board;
use crate::moves::execute::{generate_legal, make_move};
use crate::moves::magic::MagicTables;
use crate::moves::types::Move;
use crate::search::context::SearchContext;
use crate::search::search::{CancelToken, SearchReport, find_best_move};
use crate::search::tt::{DEFAULT_TT_BITS, TranspositionTable};
use crate::square::Square;
use std::str::FromStr;

pub struct Engine {
    tt: TranspositionTable,
    ctx: SearchContext,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_tt_bits(DEFAULT_TT_BITS)
    }

    pub fn with_tt_bits(bits: u32) -> Self {
        Self {
            tt: TranspositionTable::new(bits),
            ctx: SearchContext::new(),
        }
    }

    /// Forget everything learned: table, killers, history.
    pub fn new_game(&mut self) {
        self.tt.clear();
        self.ctx.clear();
    }

    pub fn clear_transposition_table(&mut self) {
        self.tt.clear();
    }

    /// Search to `max_depth` unless cancelled first.
    pub fn find_best_move(
        &mut self,
        board: &mut Board,
        tables: &MagicTables,
        max_depth: i32,
        cancel: &CancelToken,
    ) -> SearchReport {
        find_best_move(board, tables, &mut self.tt, &mut self.ctx, max_depth, cancel)
    }
}

/// Resolve a UCI move string against the current position. Succeeds iff a
/// legal move matches the (from, to, promotion) triple.
pub fn parse_uci_move(
    board: &mut Board,
    tables: &MagicTables,
    text: &str,
) -> Result<Move, String> {
    if !text.is_ascii() || (text.len() != 4 && text.len() != 5) {
        return Err(format!("bad UCI move string: {:?}", text));
    }

    let from = Square::from_str(&text[0..2])?;
    let to = Square::from_str(&text[2..4])?;
    let promotion = match text.as_bytes().get(4) {
        None => None,
        Some(b'q') => Some(crate::board::Piece::Queen),
        Some(b'r') => Some(crate::board::Piece::Rook),
        Some(b'b') => Some(crate::board::Piece::Bishop),
        Some(b'n') => Some(crate::board::Piece::Knight),
        Some(_) => return Err(format!("bad promotion letter in {:?}", text)),
    };

    let mut moves: Vec<Move> = Vec::new();
    let mut scratch: Vec<Move> = Vec::with_capacity(256);
    generate_legal(board, tables, &mut moves, &mut scratch);

    moves
        .iter()
        .copied()
        .find(|m| m.from == from && m.to == to && m.promotion == promotion)
        .ok_or_else(|| format!("{} is not legal here", text))
}

/// Apply a UCI move if it is legal. `false` leaves the board untouched.
pub fn apply_uci_move(board: &mut Board, tables: &MagicTables, text: &str) -> bool {
    match parse_uci_move(board, tables, text) {
        Ok(mv) => {
            make_move(board, mv);
            true
        }
        Err(_) => false,
    }
}
