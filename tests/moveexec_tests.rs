//! Make/unmake round-trips for every special move kind, plus a longer fuzz
//! walk in debug builds.

use forklift::board::{Board, Color, Piece};
use forklift::engine::{apply_uci_move, parse_uci_move};
use forklift::moves::execute::{generate_legal, make_move, unmake_move};
use forklift::moves::magic::magic_tables;
use forklift::moves::types::Move;
use forklift::square::Square;
use std::str::FromStr;

fn legal_moves(board: &mut Board) -> Vec<Move> {
    let tables = magic_tables();
    let mut moves: Vec<Move> = Vec::new();
    let mut scratch: Vec<Move> = Vec::with_capacity(256);
    generate_legal(board, tables, &mut moves, &mut scratch);
    moves
}

fn round_trip(fen: &str, uci: &str) -> Board {
    let tables = magic_tables();
    let mut board = Board::from_str(fen).unwrap();
    let before = board.clone();
    let mv = parse_uci_move(&mut board, tables, uci).unwrap();

    let undo = make_move(&mut board, mv);
    assert!(board.validate().is_ok(), "inconsistent after {}", uci);
    unmake_move(&mut board, mv, undo);
    assert_eq!(board, before, "round trip failed for {}", uci);

    // return the post-move board for further checks
    let mv = parse_uci_move(&mut board, tables, uci).unwrap();
    make_move(&mut board, mv);
    board
}

#[test]
fn every_special_move_kind_round_trips() {
    // quiet, double push, capture
    round_trip("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", "e2e4");
    round_trip("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", "b1c3");
    round_trip("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2", "e4d5");

    // en passant both colors
    round_trip("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1", "e5d6");
    round_trip("4k3/8/8/8/3Pp3/8/8/4K3 b - d3 0 1", "e4d3");

    // all four castles
    round_trip("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", "e1g1");
    round_trip("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", "e1c1");
    round_trip("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1", "e8g8");
    round_trip("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1", "e8c8");

    // promotions, with and without capture, all four pieces
    for promo in ["q", "r", "b", "n"] {
        round_trip("4k3/P7/8/8/8/8/8/4K3 w - - 0 1", &format!("a7a8{}", promo));
        round_trip("1r2k3/P7/8/8/8/8/8/4K3 w - - 0 1", &format!("a7b8{}", promo));
    }
}

#[test]
fn queenside_castle_places_the_rook_on_d1() {
    let after = round_trip("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", "e1c1");
    assert_eq!(after.king_square(Color::White).to_string(), "c1");
    assert_eq!(
        after.piece_at(Square::from_str("d1").unwrap()),
        Some((Color::White, Piece::Rook))
    );
    assert_eq!(after.piece_at(Square::from_str("a1").unwrap()), None);
    // black rights survive a white castle
    assert!(after.has_kingside_castle(Color::Black));
    assert!(after.has_queenside_castle(Color::Black));
}

#[test]
fn ep_window_lasts_exactly_one_half_move() {
    let tables = magic_tables();
    let mut board = Board::new();
    assert!(apply_uci_move(&mut board, tables, "e2e4"));
    assert!(apply_uci_move(&mut board, tables, "a7a6"));
    assert!(apply_uci_move(&mut board, tables, "e4e5"));
    assert!(apply_uci_move(&mut board, tables, "d7d5"));

    // EP available right now
    assert_eq!(board.ep_file, Some(3));
    assert!(legal_moves(&mut board).iter().any(|m| m.is_en_passant()));

    // decline it; the window closes
    assert!(apply_uci_move(&mut board, tables, "h2h3"));
    assert!(apply_uci_move(&mut board, tables, "h7h6"));
    assert_eq!(board.ep_file, None);
    assert!(!legal_moves(&mut board).iter().any(|m| m.is_en_passant()));
}

#[test]
fn rook_moves_erode_rights_one_side_at_a_time() {
    let tables = magic_tables();
    let mut board = Board::from_str("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    assert!(apply_uci_move(&mut board, tables, "h1h2"));
    assert!(!board.has_kingside_castle(Color::White));
    assert!(board.has_queenside_castle(Color::White));

    assert!(apply_uci_move(&mut board, tables, "a8a7"));
    assert!(!board.has_queenside_castle(Color::Black));
    assert!(board.has_kingside_castle(Color::Black));
}

#[test]
fn king_moves_erode_both_rights() {
    let tables = magic_tables();
    let mut board = Board::from_str("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    assert!(apply_uci_move(&mut board, tables, "e1e2"));
    assert!(!board.has_kingside_castle(Color::White));
    assert!(!board.has_queenside_castle(Color::White));
    assert!(board.has_kingside_castle(Color::Black));
}

#[test]
fn deep_walk_unwinds_to_the_start() {
    let tables = magic_tables();
    let mut board = Board::from_str(
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    )
    .unwrap();
    let before = board.clone();

    // depth-first walk three plies deep, unmaking on the way back up
    fn walk(board: &mut Board, depth: u32) {
        if depth == 0 {
            return;
        }
        let tables = magic_tables();
        let mut moves: Vec<Move> = Vec::new();
        let mut scratch: Vec<Move> = Vec::with_capacity(256);
        generate_legal(board, tables, &mut moves, &mut scratch);
        for mv in moves {
            let undo = make_move(board, mv);
            walk(board, depth - 1);
            unmake_move(board, mv, undo);
        }
    }

    walk(&mut board, 3);
    assert_eq!(board, before);
    let _ = tables;
}

#[cfg(debug_assertions)]
#[test]
fn make_undo_fuzz_sanity() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let tables = magic_tables();
    let mut board = Board::new();
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..1000 {
        let mut moves: Vec<Move> = Vec::with_capacity(64);
        let mut scratch: Vec<Move> = Vec::with_capacity(256);
        generate_legal(&mut board, tables, &mut moves, &mut scratch);
        if moves.is_empty() {
            break;
        }

        let idx = rng.random_range(0..moves.len());
        let mv = moves[idx];
        let undo = make_move(&mut board, mv);
        board.assert_hash();
        unmake_move(&mut board, mv, undo);
        board.assert_hash();

        // then actually play it
        make_move(&mut board, mv);
    }
}
