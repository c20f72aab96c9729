//! Staged move picker: lazy, allocation-free ordering.
//!
//! Stages run PV/TT move -> captures and promotions by MVV-LVA -> killers
//! -> quiets by history score. Each stage is generated on first demand and
//! deduplicates against the earlier ones, so a cutoff on the hash move
//! costs no generation work at all.

use crate::board::{Board, Color, Piece};
use crate::moves::execute::is_legal_move;
use crate::moves::square_control::is_legal_castling;
use crate::moves::king::KING_ATTACKS;
use crate::moves::knight::KNIGHT_ATTACKS;
use crate::moves::magic::MagicTables;
use crate::moves::movegen::{generate_pseudo_legal_captures, generate_pseudo_legal_quiets};
use crate::moves::pawn::pawn_attacks;
use crate::moves::types::Move;
use crate::search::context::HistoryTable;
use crate::search::ordering::mvv_lva_score;
use arrayvec::ArrayVec;

/// What the picker is allowed to yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerMode {
    /// Every yielded move is fully legal (make-tested).
    LegalAll,
    /// Pseudo-legal stream; the consumer make-tests each move itself.
    PseudoLegalAll,
    /// Captures and promotions only, pseudo-legal. The quiescence feed.
    CapturesOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    PvMove,
    HashMove,
    GenerateCaptures,
    Captures,
    Killer1,
    Killer2,
    GenerateQuiets,
    Quiets,
    Done,
}

pub struct MovePicker {
    mode: PickerMode,
    stage: Stage,

    captures: ArrayVec<Move, 128>,
    capture_scores: ArrayVec<i32, 128>,
    capture_idx: usize,

    quiets: ArrayVec<Move, 256>,
    quiet_scores: ArrayVec<i32, 256>,
    quiet_idx: usize,

    pv_move: Option<Move>,
    hash_move: Option<Move>,
    killers: [Option<Move>; 2],
}

impl MovePicker {
    pub fn new(
        mode: PickerMode,
        pv_move: Option<Move>,
        hash_move: Option<Move>,
        killers: [Option<Move>; 2],
    ) -> Self {
        Self {
            mode,
            stage: Stage::PvMove,
            captures: ArrayVec::new(),
            capture_scores: ArrayVec::new(),
            capture_idx: 0,
            quiets: ArrayVec::new(),
            quiet_scores: ArrayVec::new(),
            quiet_idx: 0,
            pv_move,
            hash_move,
            killers,
        }
    }

    #[inline]
    fn is_pv(&self, mv: Move) -> bool {
        self.pv_move.is_some_and(|pv| mv.same_action(pv))
    }

    #[inline]
    fn is_hash(&self, mv: Move) -> bool {
        self.hash_move.is_some_and(|hm| mv.same_action(hm))
    }

    #[inline]
    fn is_killer(&self, mv: Move) -> bool {
        self.killers
            .iter()
            .any(|k| k.is_some_and(|k| mv.same_action(k)))
    }

    #[inline]
    fn emitted_earlier(&self, mv: Move) -> bool {
        self.is_pv(mv) || self.is_hash(mv) || self.is_killer(mv)
    }

    /// Can this injected move be returned in the current mode and position?
    fn injected_ok(&self, board: &mut Board, mv: Move, tables: &MagicTables) -> bool {
        if self.mode == PickerMode::CapturesOnly && mv.is_quiet() {
            return false;
        }
        if !is_pseudo_legal(board, mv, tables) {
            return false;
        }
        // castling legality is transit safety; make-testing cannot see it
        if mv.is_castling() && !is_legal_castling(board, mv, tables) {
            return false;
        }
        self.mode != PickerMode::LegalAll || is_legal_move(board, mv, tables)
    }

    fn generate_captures(&mut self, board: &Board, tables: &MagicTables) {
        let mut raw: ArrayVec<Move, 128> = ArrayVec::new();
        generate_pseudo_legal_captures(board, tables, &mut raw);
        for mv in raw {
            if self.is_pv(mv) || self.is_hash(mv) {
                continue;
            }
            self.captures.push(mv);
            self.capture_scores.push(mvv_lva_score(mv, board));
        }
    }

    fn generate_quiets(&mut self, board: &Board, tables: &MagicTables, history: &HistoryTable) {
        let mut raw: ArrayVec<Move, 256> = ArrayVec::new();
        generate_pseudo_legal_quiets(board, tables, &mut raw);
        let color = board.side_to_move;
        for mv in raw {
            if self.emitted_earlier(mv) {
                continue;
            }
            self.quiets.push(mv);
            self.quiet_scores
                .push(history[color as usize][mv.piece as usize][mv.to.index() as usize]);
        }
    }

    /// Selection-sort step over the unsorted tail.
    fn pick_best(
        moves: &mut ArrayVec<Move, 128>,
        scores: &mut ArrayVec<i32, 128>,
        idx: &mut usize,
    ) -> Option<Move> {
        if *idx >= moves.len() {
            return None;
        }
        let mut best = *idx;
        for i in (*idx + 1)..moves.len() {
            if scores[i] > scores[best] {
                best = i;
            }
        }
        moves.swap(*idx, best);
        scores.swap(*idx, best);
        let mv = moves[*idx];
        *idx += 1;
        Some(mv)
    }

    fn pick_best_quiet(&mut self) -> Option<Move> {
        if self.quiet_idx >= self.quiets.len() {
            return None;
        }
        let mut best = self.quiet_idx;
        for i in (self.quiet_idx + 1)..self.quiets.len() {
            if self.quiet_scores[i] > self.quiet_scores[best] {
                best = i;
            }
        }
        self.quiets.swap(self.quiet_idx, best);
        self.quiet_scores.swap(self.quiet_idx, best);
        let mv = self.quiets[self.quiet_idx];
        self.quiet_idx += 1;
        Some(mv)
    }

    /// The next move, or None when exhausted. Loop-based so deep positions
    /// cannot recurse the stage machine.
    pub fn next(
        &mut self,
        board: &mut Board,
        tables: &MagicTables,
        history: &HistoryTable,
    ) -> Option<Move> {
        loop {
            match self.stage {
                Stage::PvMove => {
                    self.stage = Stage::HashMove;
                    if let Some(pv) = self.pv_move
                        && self.injected_ok(board, pv, tables)
                    {
                        return Some(pv);
                    }
                }

                Stage::HashMove => {
                    self.stage = Stage::GenerateCaptures;
                    if let Some(hm) = self.hash_move
                        && !self.is_pv(hm)
                        && self.injected_ok(board, hm, tables)
                    {
                        return Some(hm);
                    }
                }

                Stage::GenerateCaptures => {
                    self.generate_captures(board, tables);
                    self.stage = Stage::Captures;
                }

                Stage::Captures => {
                    while let Some(mv) = Self::pick_best(
                        &mut self.captures,
                        &mut self.capture_scores,
                        &mut self.capture_idx,
                    ) {
                        if self.mode == PickerMode::LegalAll && !is_legal_move(board, mv, tables) {
                            continue;
                        }
                        return Some(mv);
                    }
                    self.stage = if self.mode == PickerMode::CapturesOnly {
                        Stage::Done
                    } else {
                        Stage::Killer1
                    };
                }

                Stage::Killer1 => {
                    self.stage = Stage::Killer2;
                    if let Some(k1) = self.killers[0]
                        && k1.is_quiet()
                        && !self.is_pv(k1)
                        && !self.is_hash(k1)
                        && self.injected_ok(board, k1, tables)
                    {
                        return Some(k1);
                    }
                }

                Stage::Killer2 => {
                    self.stage = Stage::GenerateQuiets;
                    if let Some(k2) = self.killers[1]
                        && k2.is_quiet()
                        && !self.is_pv(k2)
                        && !self.is_hash(k2)
                        && self.killers[0].is_none_or(|k1| !k2.same_action(k1))
                        && self.injected_ok(board, k2, tables)
                    {
                        return Some(k2);
                    }
                }

                Stage::GenerateQuiets => {
                    self.generate_quiets(board, tables, history);
                    self.stage = Stage::Quiets;
                }

                Stage::Quiets => {
                    while let Some(mv) = self.pick_best_quiet() {
                        if mv.is_castling() && !is_legal_castling(board, mv, tables) {
                            continue;
                        }
                        if self.mode == PickerMode::LegalAll && !is_legal_move(board, mv, tables) {
                            continue;
                        }
                        return Some(mv);
                    }
                    self.stage = Stage::Done;
                }

                Stage::Done => return None,
            }
        }
    }
}

/// Could the move generator have produced this move here? Guards injected
/// TT and killer moves, whose stored geometry may be stale for the current
/// position.
pub fn is_pseudo_legal(board: &Board, mv: Move, tables: &MagicTables) -> bool {
    let color = board.side_to_move;
    let from_idx = mv.from.index() as usize;
    let to_idx = mv.to.index() as usize;
    let from_bb = mv.from.bitboard();
    let to_bb = mv.to.bitboard();

    // the named piece must stand on the source square
    if board.pieces(mv.piece, color) & from_bb == 0 {
        return false;
    }

    // never onto a friendly piece
    if board.occupancy(color) & to_bb != 0 {
        return false;
    }

    // a capture needs a victim (except en passant), a quiet needs none
    let enemy = board.opponent_occupancy(color);
    if mv.is_capture() && !mv.is_en_passant() && enemy & to_bb == 0 {
        return false;
    }
    if !mv.is_capture() && enemy & to_bb != 0 {
        return false;
    }

    // kings are never capture targets
    if to_bb & board.pieces(Piece::King, color.opposite()) != 0 {
        return false;
    }

    match mv.piece {
        Piece::Pawn => {
            let attacks = pawn_attacks(mv.from.index(), color);

            if mv.is_en_passant() {
                match board.ep_target_square() {
                    Some(ep) if ep == mv.to => attacks & to_bb != 0,
                    _ => false,
                }
            } else if mv.is_capture() {
                attacks & to_bb != 0 && promotion_rank_ok(mv, color)
            } else {
                let empty = !board.occupied();
                let (push, double_rank): (i32, u64) = match color {
                    Color::White => (8, 0x0000_0000_0000_FF00),
                    Color::Black => (-8, 0x00FF_0000_0000_0000),
                };
                if mv.is_double_pawn_push() {
                    let middle = (from_idx as i32 + push) as usize;
                    from_bb & double_rank != 0
                        && to_idx as i32 == from_idx as i32 + 2 * push
                        && empty & (1u64 << middle) != 0
                        && empty & to_bb != 0
                } else {
                    to_idx as i32 == from_idx as i32 + push
                        && empty & to_bb != 0
                        && promotion_rank_ok(mv, color)
                }
            }
        }
        Piece::Knight => KNIGHT_ATTACKS[from_idx] & to_bb != 0,
        Piece::Bishop => tables.bishop.attacks(from_idx, board.occupied()) & to_bb != 0,
        Piece::Rook => tables.rook.attacks(from_idx, board.occupied()) & to_bb != 0,
        Piece::Queen => tables.queen_attacks(from_idx, board.occupied()) & to_bb != 0,
        Piece::King => {
            if mv.is_castling() {
                let occ = board.occupied();
                if mv.is_kingside_castle() {
                    let between = match color {
                        Color::White => 0x0000_0000_0000_0060,
                        Color::Black => 0x6000_0000_0000_0000,
                    };
                    board.has_kingside_castle(color) && occ & between == 0
                } else {
                    let between = match color {
                        Color::White => 0x0000_0000_0000_000E,
                        Color::Black => 0x0E00_0000_0000_0000,
                    };
                    board.has_queenside_castle(color) && occ & between == 0
                }
            } else {
                KING_ATTACKS[from_idx] & to_bb != 0
            }
        }
    }
}

#[inline]
fn promotion_rank_ok(mv: Move, color: Color) -> bool {
    let last_rank = match color {
        Color::White => 7,
        Color::Black => 0,
    };
    if mv.is_promotion() {
        mv.to.rank() == last_rank
    } else {
        mv.to.rank() != last_rank
    }
}
