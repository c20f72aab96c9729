//! Line-oriented shell over the engine core. Reads commands from stdin,
//! owns nothing but the current board, one engine, and a cancel handle.

use forklift::board::Board;
use forklift::engine::{Engine, apply_uci_move};
use forklift::moves::execute::{generate_legal, make_move, unmake_move};
use forklift::moves::magic::{MagicTables, magic_tables};
use forklift::moves::perft::{PerftCounters, perft, perft_parallel, perft_statistics};
use forklift::moves::types::Move;
use forklift::search::search::CancelToken;
use forklift::search::tt::MATE_THRESHOLD;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead};
use std::str::FromStr;
use std::time::Instant;

fn main() {
    forklift::logger::init_logging("logs/forklift.log", "info");

    let tables = magic_tables();
    let mut engine = Engine::new();
    let mut board = Board::new();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l.trim().to_string(),
            Err(_) => break,
        };
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "uci" => {
                println!("id name Forklift");
                println!("uciok");
            }
            "isready" => println!("readyok"),
            "ucinewgame" => {
                engine.new_game();
                board = Board::new();
            }
            "position" => {
                if let Some(new_board) = handle_position(&parts, tables) {
                    board = new_board;
                }
            }
            "go" => handle_go(&parts, &mut board, tables, &mut engine),
            "perft" => handle_perft(&parts, &mut board, tables),
            "divide" => handle_divide(&parts, &mut board, tables),
            "stats" => handle_stats(&parts, &mut board, tables),
            "fen" => println!("{}", board.to_fen()),
            "d" | "display" => println!("{}", board),
            "quit" => break,
            other => eprintln!("unknown command: {}", other),
        }
    }
}

fn handle_position(parts: &[&str], tables: &MagicTables) -> Option<Board> {
    let board = if parts.get(1) == Some(&"startpos") {
        Board::new()
    } else if parts.get(1) == Some(&"fen") {
        let fen_end = parts
            .iter()
            .position(|&p| p == "moves")
            .unwrap_or(parts.len());
        let fen_string = parts[2..fen_end].join(" ");
        match Board::from_str(&fen_string) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("bad fen: {}", e);
                return None;
            }
        }
    } else {
        Board::new()
    };

    let mut board = board;
    if let Some(moves_idx) = parts.iter().position(|&p| p == "moves") {
        for move_str in &parts[moves_idx + 1..] {
            if !apply_uci_move(&mut board, tables, move_str) {
                eprintln!("invalid move: {}", move_str);
                return None;
            }
        }
    }
    Some(board)
}

fn handle_go(parts: &[&str], board: &mut Board, tables: &MagicTables, engine: &mut Engine) {
    let mut depth = 6;
    if let Some(idx) = parts.iter().position(|&p| p == "depth")
        && let Some(d) = parts.get(idx + 1).and_then(|s| s.parse().ok())
    {
        depth = d;
    }

    let cancel = CancelToken::new();
    let start = Instant::now();
    let report = engine.find_best_move(board, tables, depth, &cancel);
    let elapsed = start.elapsed();

    let score_str = if report.score.abs() >= MATE_THRESHOLD {
        let moves = (forklift::search::tt::MATE_SCORE - report.score.abs() + 1) / 2;
        if report.score > 0 {
            format!("mate {}", moves)
        } else {
            format!("mate -{}", moves)
        }
    } else {
        format!("cp {}", report.score)
    };

    println!(
        "info depth {} score {} nodes {} time {}",
        report.completed_depth,
        score_str,
        report.nodes,
        elapsed.as_millis()
    );
    match report.best_move {
        Some(mv) => println!("bestmove {}", mv.to_uci()),
        None => println!("bestmove 0000"),
    }
}

fn depth_arg(parts: &[&str]) -> u32 {
    parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(4)
}

fn handle_perft(parts: &[&str], board: &mut Board, tables: &MagicTables) {
    let depth = depth_arg(parts);
    let parallel = parts.contains(&"parallel");
    let start = Instant::now();
    let nodes = if parallel {
        perft_parallel(board, tables, depth)
    } else {
        perft(board, tables, depth)
    };
    let secs = start.elapsed().as_secs_f64().max(1e-9);
    println!(
        "nodes {} time {:.3}s nps {}",
        nodes,
        secs,
        (nodes as f64 / secs) as u64
    );
}

fn handle_divide(parts: &[&str], board: &mut Board, tables: &MagicTables) {
    let depth = depth_arg(parts);

    let mut moves: Vec<Move> = Vec::new();
    let mut scratch: Vec<Move> = Vec::with_capacity(256);
    generate_legal(board, tables, &mut moves, &mut scratch);

    let bar = ProgressBar::new(moves.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .expect("valid progress template"),
    );

    let mut total = 0u64;
    let mut rows = Vec::with_capacity(moves.len());
    for mv in moves {
        bar.set_message(mv.to_uci());
        let undo = make_move(board, mv);
        let count = if depth <= 1 {
            1
        } else {
            perft(board, tables, depth - 1)
        };
        unmake_move(board, mv, undo);
        total += count;
        rows.push((mv, count));
        bar.inc(1);
    }
    bar.finish_and_clear();

    for (mv, count) in rows {
        println!("{}: {}", mv.to_uci(), count);
    }
    println!("total {}", total);
}

fn handle_stats(parts: &[&str], board: &mut Board, tables: &MagicTables) {
    let depth = depth_arg(parts);
    let mut out = PerftCounters::zero();
    perft_statistics(board, tables, depth, &mut out);
    println!(
        "nodes {} captures {} ep {} castles {} promotions {} checks {} double-checks {} discovered {} checkmates {}",
        out.nodes,
        out.captures,
        out.ep_captures,
        out.castles,
        out.promotions,
        out.checks,
        out.double_checks,
        out.discovered_checks,
        out.checkmates
    );
}
