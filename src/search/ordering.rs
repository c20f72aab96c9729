use crate::board::{Board, Piece};
use crate::moves::types::Move;

/// Most-valuable-victim / least-valuable-attacker: `10 * value(victim) -
/// value(attacker)`. Promotions get the promoted piece's value on top so a
/// queening capture leads the stage.
pub fn mvv_lva_score(mv: Move, board: &Board) -> i32 {
    let mut score = 0;

    if mv.is_en_passant() {
        // destination is empty; the victim is always a pawn
        score += 10 * Piece::Pawn.value() - Piece::Pawn.value();
    } else if mv.is_capture() {
        if let Some((_, victim)) = board.piece_at(mv.to) {
            score += 10 * victim.value() - mv.piece.value();
        }
    }

    if let Some(promo) = mv.promotion {
        score += promo.value();
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::execute::generate_legal;
    use crate::moves::magic::magic_tables;
    use std::str::FromStr;

    #[test]
    fn pawn_takes_queen_beats_queen_takes_pawn() {
        let tables = magic_tables();
        // white pawn b4 can take the a5 queen; white queen d1 can take the d7 pawn
        let mut b = Board::from_str("4k3/3p4/8/q7/1P6/8/8/3QK3 w - - 0 1").unwrap();
        let mut moves = Vec::new();
        let mut scratch = Vec::with_capacity(256);
        generate_legal(&mut b, tables, &mut moves, &mut scratch);

        let pxq = moves.iter().find(|m| m.to_uci() == "b4a5").unwrap();
        let qxp = moves.iter().find(|m| m.to_uci() == "d1d7").unwrap();
        assert!(mvv_lva_score(*pxq, &b) > mvv_lva_score(*qxp, &b));
    }

    #[test]
    fn quiet_moves_score_zero() {
        let tables = magic_tables();
        let mut b = Board::new();
        let mut moves = Vec::new();
        let mut scratch = Vec::with_capacity(256);
        generate_legal(&mut b, tables, &mut moves, &mut scratch);
        for mv in &moves {
            assert_eq!(mvv_lva_score(*mv, &b), 0, "{}", mv);
        }
    }
}
