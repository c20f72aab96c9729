//! Forsyth-Edwards Notation, both directions.
//!
//! Parsing is recoverable: any malformed input leaves an error string and
//! the board untouched by the caller's standards (parse into a fresh board
//! via `FromStr`). Four- and five-field FENs are tolerated by defaulting
//! the halfmove clock to 0 and the fullmove number to 1.

use super::fen_tables::{CHAR_TO_PC, fen_char};
use super::{Board, CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ, Color};
use crate::square::Square;
use std::str::FromStr;

impl Board {
    /// Load a position from a FEN string, replacing all current state.
    pub fn set_fen(&mut self, fen: &str) -> Result<(), String> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(format!(
                "FEN needs at least 4 fields, got {}: {:?}",
                fields.len(),
                fen
            ));
        }

        let mut board = Board::new_empty();

        // 1) Piece placement, ranks 8 down to 1.
        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(format!("FEN has {} ranks, expected 8", ranks.len()));
        }
        for (row, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - row as u8;
            let mut file = 0u8;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    if skip == 0 || skip > 8 {
                        return Err(format!("bad empty-run digit {:?} in FEN rank", c));
                    }
                    file += skip as u8;
                } else {
                    let entry = CHAR_TO_PC
                        .get(c as usize)
                        .copied()
                        .flatten()
                        .ok_or_else(|| format!("unknown piece character {:?}", c))?;
                    if file >= 8 {
                        return Err(format!("rank {} overflows 8 files", rank + 1));
                    }
                    let (piece, color) = entry;
                    board.place(Square::from_file_rank(file, rank), color, piece);
                    file += 1;
                }
            }
            if file != 8 {
                return Err(format!("rank {} has {} files, expected 8", rank + 1, file));
            }
        }

        // 2) Side to move.
        board.side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(format!("bad side-to-move field {:?}", other)),
        };

        // 3) Castling rights.
        if fields[2] != "-" {
            for c in fields[2].chars() {
                board.castling_rights |= match c {
                    'K' => CASTLE_WK,
                    'Q' => CASTLE_WQ,
                    'k' => CASTLE_BK,
                    'q' => CASTLE_BQ,
                    other => return Err(format!("bad castling character {:?}", other)),
                };
            }
        }

        // 4) En-passant target square.
        if fields[3] != "-" {
            let sq = Square::from_str(fields[3])?;
            let expected_rank = match board.side_to_move {
                Color::White => 5,
                Color::Black => 2,
            };
            if sq.rank() != expected_rank {
                return Err(format!(
                    "en-passant square {} on wrong rank for side to move",
                    sq
                ));
            }
            board.ep_file = Some(sq.file());
        }

        // 5/6) Clocks, defaulted when absent.
        board.halfmove_clock = match fields.get(4) {
            Some(s) => s
                .parse()
                .map_err(|_| format!("bad halfmove clock {:?}", s))?,
            None => 0,
        };
        board.fullmove_number = match fields.get(5) {
            Some(s) => s
                .parse()
                .map_err(|_| format!("bad fullmove number {:?}", s))?,
            None => 1,
        };

        board.validate()?;
        board.refresh_zobrist();
        board.reset_repetitions();

        *self = board;
        Ok(())
    }

    /// Emit the position as a six-field FEN string.
    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(90);

        for rank in (0u8..8).rev() {
            let mut empty_run = 0;
            for file in 0u8..8 {
                match self.piece_at(Square::from_file_rank(file, rank)) {
                    Some((color, piece)) => {
                        if empty_run > 0 {
                            fen.push((b'0' + empty_run) as char);
                            empty_run = 0;
                        }
                        fen.push(fen_char(color, piece));
                    }
                    None => empty_run += 1,
                }
            }
            if empty_run > 0 {
                fen.push((b'0' + empty_run) as char);
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        fen.push(' ');
        if self.castling_rights == 0 {
            fen.push('-');
        } else {
            if self.castling_rights & CASTLE_WK != 0 {
                fen.push('K');
            }
            if self.castling_rights & CASTLE_WQ != 0 {
                fen.push('Q');
            }
            if self.castling_rights & CASTLE_BK != 0 {
                fen.push('k');
            }
            if self.castling_rights & CASTLE_BQ != 0 {
                fen.push('q');
            }
        }

        fen.push(' ');
        match self.ep_target_square() {
            Some(sq) => fen.push_str(&sq.to_string()),
            None => fen.push('-'),
        }

        fen.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));
        fen
    }
}
