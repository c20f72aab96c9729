//! Iterative-deepening negamax with quiescence, null-move pruning, and
//! killer/history ordering.
//!
//! Cancellation is cooperative: the flag is polled at the top of every
//! node. A node that observes it mid-way returns `complete = false`;
//! parents discard such scores and never write them to the table, and
//! iterative deepening reports the last depth that finished whole.

use crate::board::Board;
use crate::moves::execute::{
    generate_legal, make_move, make_null_move, unmake_move, unmake_null_move,
};
use crate::moves::magic::MagicTables;
use crate::moves::square_control::in_check;
use crate::moves::types::Move;
use crate::search::context::{HistoryTable, MAX_PLY, SearchContext};
use crate::search::eval::static_eval;
use crate::search::picker::{MovePicker, PickerMode};
use crate::search::tt::{INF, MATE_SCORE, MATE_THRESHOLD, NodeType, Probe, TranspositionTable};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Null-move depth reduction.
const NULL_MOVE_R: i32 = 2;
/// History reward for a quiet beta cutoff, scaled by remaining depth.
const HISTORY_BONUS_MULT: i32 = 300;
const HISTORY_BONUS_BASE: i32 = -250;

/// Shared cancellation flag. Cloning hands the same signal to another
/// thread; firing it is sticky for the lifetime of the token.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Per-node result. `complete == false` means cancellation interrupted the
/// subtree and the score is garbage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    pub best_move: Option<Move>,
    pub score: i32,
    pub complete: bool,
}

impl SearchOutcome {
    const fn aborted() -> Self {
        SearchOutcome {
            best_move: None,
            score: 0,
            complete: false,
        }
    }

    const fn done(best_move: Option<Move>, score: i32) -> Self {
        SearchOutcome {
            best_move,
            score,
            complete: true,
        }
    }
}

/// What `find_best_move` hands back to the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchReport {
    pub best_move: Option<Move>,
    pub score: i32,
    pub completed_depth: i32,
    pub nodes: u64,
}

/// Iterative deepening driver. On cancellation before depth 1 completes,
/// falls back to the first legal move with the static evaluation.
pub fn find_best_move(
    board: &mut Board,
    tables: &MagicTables,
    tt: &mut TranspositionTable,
    ctx: &mut SearchContext,
    max_depth: i32,
    cancel: &CancelToken,
) -> SearchReport {
    let mut nodes: u64 = 0;
    let mut report = SearchReport {
        best_move: None,
        score: 0,
        completed_depth: 0,
        nodes: 0,
    };

    for depth in 1..=max_depth {
        let outcome = negamax(
            board,
            tables,
            tt,
            ctx,
            depth,
            0,
            -INF,
            INF,
            report.best_move,
            false,
            &mut nodes,
            cancel,
        );

        // a cancelled iteration's partial best move is untrustworthy
        if !outcome.complete {
            break;
        }

        report.best_move = outcome.best_move;
        report.score = outcome.score;
        report.completed_depth = depth;
        debug!(depth, score = outcome.score, nodes, "iteration complete");

        if outcome.score.abs() >= MATE_THRESHOLD {
            break;
        }
    }

    if report.completed_depth == 0 {
        let mut moves: Vec<Move> = Vec::new();
        let mut scratch: Vec<Move> = Vec::with_capacity(256);
        generate_legal(board, tables, &mut moves, &mut scratch);
        report.best_move = moves.first().copied();
        report.score = static_eval(board);
    }

    report.nodes = nodes;
    report
}

#[allow(clippy::too_many_arguments)]
fn negamax(
    board: &mut Board,
    tables: &MagicTables,
    tt: &mut TranspositionTable,
    ctx: &mut SearchContext,
    depth: i32,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    pv_hint: Option<Move>,
    parent_was_null: bool,
    nodes: &mut u64,
    cancel: &CancelToken,
) -> SearchOutcome {
    if cancel.is_cancelled() {
        return SearchOutcome::aborted();
    }
    *nodes += 1;

    if depth <= 0 {
        return quiescence(board, tables, &ctx.history, ply + 1, alpha, beta, nodes, cancel);
    }
    if ply >= MAX_PLY {
        return SearchOutcome::done(None, static_eval(board));
    }

    // repetition and fifty-move draws end the line at once
    if ply > 0 && (board.is_repetition() || board.halfmove_clock >= 100) {
        return SearchOutcome::done(None, 0);
    }

    let stm = board.side_to_move;
    let in_check_now = in_check(board, stm, tables);

    // Null-move pruning: hand the opponent a free tempo; if a reduced
    // search still fails high, the real position will too. Off in check,
    // at the root, after a null parent, and in pawn-only endgames.
    if !parent_was_null
        && depth >= 3
        && ply > 0
        && !in_check_now
        && board.has_major_pieces(stm)
    {
        let undo = make_null_move(board);
        let child = negamax(
            board,
            tables,
            tt,
            ctx,
            depth - 1 - NULL_MOVE_R,
            ply + 1,
            -beta,
            -beta + 1,
            None,
            true,
            nodes,
            cancel,
        );
        unmake_null_move(board, undo);

        if !child.complete {
            return SearchOutcome::aborted();
        }
        if -child.score >= beta {
            tt.store(
                board.zobrist,
                depth as u8,
                beta,
                NodeType::LowerBound,
                None,
                ply as i32,
            );
            return SearchOutcome::done(None, beta);
        }
    }

    // Transposition table: a usable score answers every node but the root;
    // the stored move always improves ordering.
    let mut hash_move = None;
    match tt.probe(board.zobrist, depth as u8, alpha, beta, ply as i32) {
        Probe::Cutoff(score, tt_move) => {
            if ply > 0 {
                return SearchOutcome::done(tt_move, score);
            }
            hash_move = tt_move;
        }
        Probe::Hit(tt_move) => hash_move = tt_move,
        Probe::Miss => {}
    }

    let mut picker = MovePicker::new(
        PickerMode::PseudoLegalAll,
        pv_hint,
        hash_move,
        ctx.killers_at(ply),
    );

    let alpha_original = alpha;
    let mut best_score = -INF;
    let mut best_move: Option<Move> = None;
    let mut move_count = 0usize;
    let mut cutoff = false;
    let mut quiets_tried: Vec<Move> = Vec::new();

    while let Some(mv) = picker.next(board, tables, &ctx.history) {
        let undo = make_move(board, mv);
        // the stream is pseudo-legal; drop anything that leaves us in check
        if in_check(board, stm, tables) {
            unmake_move(board, mv, undo);
            continue;
        }

        let child = negamax(
            board,
            tables,
            tt,
            ctx,
            depth - 1,
            ply + 1,
            -beta,
            -alpha,
            None,
            false,
            nodes,
            cancel,
        );
        unmake_move(board, mv, undo);

        if !child.complete {
            return SearchOutcome::aborted();
        }

        move_count += 1;
        let score = -child.score;

        if score > best_score {
            best_score = score;
            best_move = Some(mv);
        }
        if score > alpha {
            alpha = score;
        }
        if score >= beta {
            cutoff = true;
            if mv.is_quiet() {
                ctx.update_killer(ply, mv);
                let bonus = HISTORY_BONUS_MULT * depth + HISTORY_BONUS_BASE;
                ctx.update_history(stm, mv, bonus);
                for &earlier in &quiets_tried {
                    ctx.update_history(stm, earlier, -bonus);
                }
            }
            break;
        }
        if mv.is_quiet() {
            quiets_tried.push(mv);
        }
    }

    if move_count == 0 {
        let score = if in_check_now {
            -MATE_SCORE + ply as i32
        } else {
            0
        };
        return SearchOutcome::done(None, score);
    }

    if cancel.is_cancelled() {
        return SearchOutcome::aborted();
    }

    let bound = if cutoff {
        NodeType::LowerBound
    } else if best_score <= alpha_original {
        NodeType::UpperBound
    } else {
        NodeType::Exact
    };
    tt.store(
        board.zobrist,
        depth as u8,
        best_score,
        bound,
        best_move,
        ply as i32,
    );

    SearchOutcome::done(best_move, best_score)
}

/// Horizon extension over forcing moves only. In check it becomes a full
/// evasion search with no stand-pat; otherwise the static score may stand
/// and only captures and promotions are expanded.
#[allow(clippy::too_many_arguments)]
fn quiescence(
    board: &mut Board,
    tables: &MagicTables,
    history: &HistoryTable,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    nodes: &mut u64,
    cancel: &CancelToken,
) -> SearchOutcome {
    if cancel.is_cancelled() {
        return SearchOutcome::aborted();
    }
    *nodes += 1;

    if ply >= MAX_PLY {
        return SearchOutcome::done(None, static_eval(board));
    }

    let stm = board.side_to_move;
    let in_check_now = in_check(board, stm, tables);

    let mut best_score;
    let mode;
    if in_check_now {
        // every evasion must be examined; standing pat in check is illegal
        best_score = -INF;
        mode = PickerMode::PseudoLegalAll;
    } else {
        let stand_pat = static_eval(board);
        if stand_pat >= beta {
            return SearchOutcome::done(None, stand_pat);
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }
        best_score = stand_pat;
        mode = PickerMode::CapturesOnly;
    }

    let mut picker = MovePicker::new(mode, None, None, [None, None]);
    let mut move_count = 0usize;

    while let Some(mv) = picker.next(board, tables, history) {
        let undo = make_move(board, mv);
        if in_check(board, stm, tables) {
            unmake_move(board, mv, undo);
            continue;
        }

        let child = quiescence(board, tables, history, ply + 1, -beta, -alpha, nodes, cancel);
        unmake_move(board, mv, undo);

        if !child.complete {
            return SearchOutcome::aborted();
        }

        move_count += 1;
        let score = -child.score;
        if score > best_score {
            best_score = score;
        }
        if score > alpha {
            alpha = score;
        }
        if score >= beta {
            break;
        }
    }

    if in_check_now && move_count == 0 {
        return SearchOutcome::done(None, -MATE_SCORE + ply as i32);
    }

    SearchOutcome::done(None, best_score)
}
