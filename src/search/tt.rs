//! Transposition table: fixed-size, power-of-two, direct-mapped.
//!
//! Mate scores are stored relative to the probing node (`score + ply` for
//! wins, `score - ply` for losses) so a mate found deep in one subtree
//! reads correctly from another depth. Replacement is depth-preferred for
//! the same key; a different key always takes the slot.

use crate::moves::types::Move;

pub const INF: i32 = 32_000;
pub const MATE_SCORE: i32 = 31_000;
/// Anything at or beyond this is a mate-distance score. Strictly above any
/// value the static evaluator can produce.
pub const MATE_THRESHOLD: i32 = 30_000;

pub const DEFAULT_TT_BITS: u32 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    Exact,
    /// Fail-high: score is a lower bound (beta cutoff happened).
    LowerBound,
    /// Fail-low: score is an upper bound (nothing beat alpha).
    UpperBound,
}

#[derive(Clone, Copy, Debug)]
struct TTEntry {
    key: u64,
    best_move: Option<Move>,
    score: i32,
    depth: u8,
    bound: NodeType,
    valid: bool,
}

const EMPTY_ENTRY: TTEntry = TTEntry {
    key: 0,
    best_move: None,
    score: 0,
    depth: 0,
    bound: NodeType::Exact,
    valid: false,
};

/// Outcome of a probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Probe {
    Miss,
    /// Key matched but the stored score is not usable at this depth and
    /// window; the move is still worth ordering first.
    Hit(Option<Move>),
    /// Stored score answers this node outright.
    Cutoff(i32, Option<Move>),
}

/// Shift a score into its TT representation: mate distances become
/// root-relative.
pub fn score_to_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply
    } else if score <= -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}

/// Inverse of `score_to_tt` at probe time.
pub fn score_from_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply
    } else if score <= -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}

pub struct TranspositionTable {
    entries: Vec<TTEntry>,
}

impl TranspositionTable {
    /// `2^bits` entries, direct-mapped.
    pub fn new(bits: u32) -> Self {
        Self {
            entries: vec![EMPTY_ENTRY; 1usize << bits],
        }
    }

    pub fn clear(&mut self) {
        self.entries.fill(EMPTY_ENTRY);
    }

    #[inline(always)]
    fn index(&self, key: u64) -> usize {
        (key as usize) & (self.entries.len() - 1)
    }

    pub fn probe(&self, key: u64, depth: u8, alpha: i32, beta: i32, ply: i32) -> Probe {
        let entry = &self.entries[self.index(key)];
        if !entry.valid || entry.key != key {
            return Probe::Miss;
        }

        if entry.depth >= depth {
            let score = score_from_tt(entry.score, ply);
            let usable = match entry.bound {
                NodeType::Exact => true,
                NodeType::UpperBound => score <= alpha,
                NodeType::LowerBound => score >= beta,
            };
            if usable {
                return Probe::Cutoff(score, entry.best_move);
            }
        }

        Probe::Hit(entry.best_move)
    }

    pub fn store(
        &mut self,
        key: u64,
        depth: u8,
        score: i32,
        bound: NodeType,
        best_move: Option<Move>,
        ply: i32,
    ) {
        let index = self.index(key);
        let entry = &mut self.entries[index];

        // depth-preferred: never clobber an equal-or-deeper result for the
        // same key
        if entry.valid && entry.key == key && entry.depth >= depth {
            return;
        }

        // keep an existing best move if the new result has none
        let best_move = if best_move.is_some() {
            best_move
        } else if entry.valid && entry.key == key {
            entry.best_move
        } else {
            None
        };

        *entry = TTEntry {
            key,
            best_move,
            score: score_to_tt(score, ply),
            depth,
            bound,
            valid: true,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Piece;
    use crate::moves::types::{QUIET_MOVE, Move};
    use crate::square::Square;

    fn mv(from: u8, to: u8) -> Move {
        Move::new(
            Square::from_index(from),
            Square::from_index(to),
            Piece::Knight,
            None,
            QUIET_MOVE,
        )
    }

    #[test]
    fn empty_table_misses() {
        let tt = TranspositionTable::new(10);
        assert_eq!(tt.probe(0xABCD, 1, -INF, INF, 0), Probe::Miss);
    }

    #[test]
    fn exact_scores_cut_at_equal_or_lower_depth() {
        let mut tt = TranspositionTable::new(10);
        tt.store(42, 5, 123, NodeType::Exact, Some(mv(1, 18)), 0);

        match tt.probe(42, 5, -INF, INF, 0) {
            Probe::Cutoff(score, m) => {
                assert_eq!(score, 123);
                assert!(m.is_some());
            }
            other => panic!("expected cutoff, got {:?}", other),
        }

        // deeper request: only the move survives
        assert_eq!(tt.probe(42, 6, -INF, INF, 0), Probe::Hit(Some(mv(1, 18))));
    }

    #[test]
    fn bounds_respect_the_window() {
        let mut tt = TranspositionTable::new(10);
        tt.store(7, 4, 50, NodeType::LowerBound, None, 0);
        // lower bound 50 cuts when beta <= 50
        assert!(matches!(tt.probe(7, 4, 0, 40, 0), Probe::Cutoff(50, _)));
        assert!(matches!(tt.probe(7, 4, 0, 60, 0), Probe::Hit(_)));

        tt.store(9, 4, -20, NodeType::UpperBound, None, 0);
        // upper bound -20 cuts when alpha >= -20
        assert!(matches!(tt.probe(9, 4, 0, 100, 0), Probe::Cutoff(-20, _)));
        assert!(matches!(tt.probe(9, 4, -50, 100, 0), Probe::Hit(_)));
    }

    #[test]
    fn depth_preferred_replacement_for_same_key() {
        let mut tt = TranspositionTable::new(10);
        tt.store(5, 8, 10, NodeType::Exact, None, 0);
        tt.store(5, 3, 99, NodeType::Exact, None, 0); // shallower, ignored
        assert!(matches!(tt.probe(5, 8, -INF, INF, 0), Probe::Cutoff(10, _)));

        tt.store(5, 9, 77, NodeType::Exact, None, 0); // deeper, replaces
        assert!(matches!(tt.probe(5, 9, -INF, INF, 0), Probe::Cutoff(77, _)));
    }

    #[test]
    fn mate_scores_normalize_through_the_table() {
        let mut tt = TranspositionTable::new(10);
        // mate found at ply 4, scored mate-in-(MATE_SCORE - found_ply)
        let found_ply = 4;
        let score_at_node = MATE_SCORE - 6;
        tt.store(11, 9, score_at_node, NodeType::Exact, None, found_ply);

        // read back at a different ply: distance adjusts
        match tt.probe(11, 9, -INF, INF, 2) {
            Probe::Cutoff(score, _) => {
                assert_eq!(score, score_at_node + found_ply - 2);
            }
            other => panic!("expected cutoff, got {:?}", other),
        }
    }

    #[test]
    fn clear_wipes_everything() {
        let mut tt = TranspositionTable::new(10);
        tt.store(1, 1, 1, NodeType::Exact, None, 0);
        tt.clear();
        assert_eq!(tt.probe(1, 1, -INF, INF, 0), Probe::Miss);
    }
}
