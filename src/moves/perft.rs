//! Perft: exhaustive legal-move tree enumeration, the move generator's
//! ground truth. The statistics variant classifies each move made one ply
//! above the leaves (captures, castles, promotions, checks of every
//! flavor) and counts checkmates at the leaves themselves.

use crate::board::{Board, Color, EMPTY_SQ, Piece};
use crate::moves::{
    execute::{generate_legal, make_move, unmake_move},
    magic::MagicTables,
    square_control::{attackers_to, in_check},
    types::Move,
};
use crate::square::Square;
use rayon::prelude::*;
use tracing::{debug, instrument};

const MAX_PERFT_DEPTH: usize = 20;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PerftCounters {
    pub nodes: u64,
    pub captures: u64,
    pub ep_captures: u64,
    pub castles: u64,
    pub promotions: u64,
    pub checks: u64,
    pub double_checks: u64,
    pub discovered_checks: u64,
    pub checkmates: u64,
}

impl PerftCounters {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn add(&mut self, o: &PerftCounters) {
        self.nodes += o.nodes;
        self.captures += o.captures;
        self.ep_captures += o.ep_captures;
        self.castles += o.castles;
        self.promotions += o.promotions;
        self.checks += o.checks;
        self.double_checks += o.double_checks;
        self.discovered_checks += o.discovered_checks;
        self.checkmates += o.checkmates;
    }
}

// one extra slot: the statistics leaf generates replies at ply == depth
fn create_move_buffers() -> [Vec<Move>; MAX_PERFT_DEPTH + 1] {
    std::array::from_fn(|_| Vec::with_capacity(64))
}

fn create_pseudo_buffers() -> [Vec<Move>; MAX_PERFT_DEPTH + 1] {
    std::array::from_fn(|_| Vec::with_capacity(256))
}

fn check_depth(depth: u32) {
    assert!(
        (depth as usize) <= MAX_PERFT_DEPTH,
        "depth {} exceeds MAX_PERFT_DEPTH {}",
        depth,
        MAX_PERFT_DEPTH
    );
}

fn perft_recursive(
    board: &mut Board,
    tables: &MagicTables,
    depth: u32,
    ply: usize,
    move_buffers: &mut [Vec<Move>],
    pseudo_buffers: &mut [Vec<Move>],
) -> u64 {
    if depth == 0 {
        return 1;
    }

    {
        let moves = &mut move_buffers[ply];
        let pseudo = &mut pseudo_buffers[ply];
        generate_legal(board, tables, moves, pseudo);
    }

    // bulk count: each legal move at depth 1 is exactly one leaf
    if depth == 1 {
        return move_buffers[ply].len() as u64;
    }

    let move_count = move_buffers[ply].len();
    let mut node_count = 0;

    for i in 0..move_count {
        let mv = move_buffers[ply][i];
        let undo = make_move(board, mv);
        node_count += perft_recursive(
            board,
            tables,
            depth - 1,
            ply + 1,
            move_buffers,
            pseudo_buffers,
        );
        unmake_move(board, mv, undo);
    }

    node_count
}

/// Serial node count to `depth`.
#[instrument(skip(board, tables), fields(depth))]
pub fn perft(board: &mut Board, tables: &MagicTables, depth: u32) -> u64 {
    check_depth(depth);
    let mut move_buffers = create_move_buffers();
    let mut pseudo_buffers = create_pseudo_buffers();
    perft_recursive(
        board,
        tables,
        depth,
        0,
        &mut move_buffers,
        &mut pseudo_buffers,
    )
}

/// Root-parallel node count: legal root moves are materialized once, then
/// fanned out over independent clones of the board. Each task tallies
/// locally and the reduction sums.
#[instrument(skip(board, tables), fields(depth))]
pub fn perft_parallel(board: &Board, tables: &MagicTables, depth: u32) -> u64 {
    check_depth(depth);
    if depth < 2 {
        return perft(&mut board.clone(), tables, depth);
    }

    let mut root = board.clone();
    let mut moves: Vec<Move> = Vec::new();
    let mut scratch: Vec<Move> = Vec::with_capacity(256);
    generate_legal(&mut root, tables, &mut moves, &mut scratch);

    moves
        .par_iter()
        .map(|&mv| {
            let mut child = board.clone();
            let _undo = make_move(&mut child, mv);
            let mut move_buffers = create_move_buffers();
            let mut pseudo_buffers = create_pseudo_buffers();
            perft_recursive(
                &mut child,
                tables,
                depth - 1,
                0,
                &mut move_buffers,
                &mut pseudo_buffers,
            )
        })
        .sum()
}

/// Per-root-move node counts, for diffing against a reference engine.
#[instrument(skip(board, tables), fields(depth))]
pub fn perft_divide(board: &mut Board, tables: &MagicTables, depth: u32) -> Vec<(Move, u64)> {
    check_depth(depth);
    let mut move_buffers = create_move_buffers();
    let mut pseudo_buffers = create_pseudo_buffers();

    {
        let moves = &mut move_buffers[0];
        let pseudo = &mut pseudo_buffers[0];
        generate_legal(board, tables, moves, pseudo);
        debug!(depth, moves = moves.len(), "divide: root legal moves");
    }

    let move_count = move_buffers[0].len();
    let mut out = Vec::with_capacity(move_count);

    for i in 0..move_count {
        let mv = move_buffers[0][i];
        let undo = make_move(board, mv);
        let count = if depth <= 1 {
            1
        } else {
            perft_recursive(
                board,
                tables,
                depth - 1,
                1,
                &mut move_buffers,
                &mut pseudo_buffers,
            )
        };
        unmake_move(board, mv, undo);
        debug!(%mv, nodes = count, "divide: root child total");
        out.push((mv, count));
    }

    out
}

/// Node count plus the classification counters.
pub fn perft_statistics(
    board: &mut Board,
    tables: &MagicTables,
    depth: u32,
    out: &mut PerftCounters,
) {
    check_depth(depth);
    let mut move_buffers = create_move_buffers();
    let mut pseudo_buffers = create_pseudo_buffers();
    perft_statistics_recursive(
        board,
        tables,
        depth,
        0,
        out,
        &mut move_buffers,
        &mut pseudo_buffers,
    );
}

fn perft_statistics_recursive(
    board: &mut Board,
    tables: &MagicTables,
    depth: u32,
    ply: usize,
    out: &mut PerftCounters,
    move_buffers: &mut [Vec<Move>],
    pseudo_buffers: &mut [Vec<Move>],
) {
    if depth == 0 {
        out.nodes += 1;
        let stm = board.side_to_move;
        if in_check(board, stm, tables) {
            let moves = &mut move_buffers[ply];
            let pseudo = &mut pseudo_buffers[ply];
            generate_legal(board, tables, moves, pseudo);
            if move_buffers[ply].is_empty() {
                out.checkmates += 1;
            }
        }
        return;
    }

    {
        let moves = &mut move_buffers[ply];
        let pseudo = &mut pseudo_buffers[ply];
        generate_legal(board, tables, moves, pseudo);
    }

    let move_count = move_buffers[ply].len();
    for i in 0..move_count {
        let mv = move_buffers[ply][i];

        if depth == 1 {
            // classify the move that reaches a leaf
            if mv.is_capture() {
                out.captures += 1;
                if mv.is_en_passant() {
                    out.ep_captures += 1;
                }
            }
            if mv.is_castling() {
                out.castles += 1;
            }
            if mv.promotion.is_some() {
                out.promotions += 1;
            }

            let open_rays = discovered_check_rays_before(board, mv);
            let undo = make_move(board, mv);

            let defender = board.side_to_move;
            let king_sq = board.king_square(defender);
            let attackers = attackers_to(board, king_sq, defender.opposite(), tables);
            if attackers != 0 {
                out.checks += 1;
                if attackers.count_ones() >= 2 {
                    out.double_checks += 1;
                }
            }
            if discovered_check_after(board, mv, king_sq, open_rays) {
                out.discovered_checks += 1;
            }

            perft_statistics_recursive(
                board,
                tables,
                depth - 1,
                ply + 1,
                out,
                move_buffers,
                pseudo_buffers,
            );
            unmake_move(board, mv, undo);
        } else {
            let undo = make_move(board, mv);
            perft_statistics_recursive(
                board,
                tables,
                depth - 1,
                ply + 1,
                out,
                move_buffers,
                pseudo_buffers,
            );
            unmake_move(board, mv, undo);
        }
    }
}

// ---------------------------------------------------------------------------
// Discovered-check detection
// ---------------------------------------------------------------------------

/// 0x88 ray deltas from the king; the flag marks diagonals.
const RAYS: [(i8, bool); 8] = [
    (16, false),
    (-16, false),
    (1, false),
    (-1, false),
    (17, true),
    (15, true),
    (-17, true),
    (-15, true),
];

/// First occupied square walking `delta` from `from`, with its mailbox cell.
fn first_occupied_along(board: &Board, from: Square, delta: i8) -> Option<(Square, u8)> {
    let mut idx = from.to_0x88() as i16 + delta as i16;
    while !Square::off_board_0x88(idx) {
        let cell = board.mailbox_0x88(idx as u8);
        if cell != EMPTY_SQ {
            return Some((Square::from_0x88(idx as u8), cell));
        }
        idx += delta as i16;
    }
    None
}

/// Pre-move scan: which rays from the defender's king are blocked first by
/// the mover's source square (or by the pawn an en-passant capture will
/// remove)? Only those rays can reveal a slider.
fn discovered_check_rays_before(board: &Board, mv: Move) -> u8 {
    let mover = board.side_to_move;
    let king_sq = board.king_square(mover.opposite());

    let ep_victim = if mv.is_en_passant() {
        let idx = match mover {
            Color::White => mv.to.index() - 8,
            Color::Black => mv.to.index() + 8,
        };
        Some(Square::from_index(idx))
    } else {
        None
    };

    let mut rays = 0u8;
    for (i, &(delta, _)) in RAYS.iter().enumerate() {
        if let Some((sq, _)) = first_occupied_along(board, king_sq, delta)
            && (sq == mv.from || Some(sq) == ep_victim)
        {
            rays |= 1 << i;
        }
    }
    rays
}

/// Post-move scan over the flagged rays: a discovered check is revealed
/// when the first occupied square is now a compatible slider of the side
/// that just moved, and is not the moved piece itself.
fn discovered_check_after(board: &Board, mv: Move, king_sq: Square, rays: u8) -> bool {
    if rays == 0 {
        return false;
    }
    // the side that just moved is no longer on move
    let mover = board.side_to_move.opposite();

    for (i, &(delta, diagonal)) in RAYS.iter().enumerate() {
        if rays & (1 << i) == 0 {
            continue;
        }
        let Some((sq, cell)) = first_occupied_along(board, king_sq, delta) else {
            continue;
        };
        if sq == mv.to {
            // the destination blocks (or is) the first piece: any check from
            // there is a direct check, not a discovery
            continue;
        }
        let color = Color::from_u8(cell >> 3 & 1);
        if color != mover {
            continue;
        }
        let piece = Piece::from_u8(cell & 0b111);
        let compatible = if diagonal {
            matches!(piece, Piece::Bishop | Piece::Queen)
        } else {
            matches!(piece, Piece::Rook | Piece::Queen)
        };
        if compatible {
            return true;
        }
    }
    false
}
