//! Zobrist keys: random-but-deterministic 64-bit keys for every hashable
//! position component. Generated once per process from a fixed seed so any
//! two engines (and any two runs) agree on every key.

use crate::board::castle_bits::*;
use once_cell::sync::OnceCell;
use rand::{RngCore, SeedableRng, rngs::StdRng};

const ZOBRIST_SEED: u64 = 0x9E37_79B9_AAAC_5C87;

pub struct ZobristKeys {
    /// [color][piece][square] with {White=0, Black=1} and {P,N,B,R,Q,K}={0..5}
    pub piece: [[[u64; 64]; 6]; 2],
    /// XORed in when Black is to move.
    pub side_to_move: u64,
    /// [0]=K, [1]=Q, [2]=k, [3]=q (bit order K,Q,k,q)
    pub castling: [u64; 4],
    /// a..h => 0..7
    pub ep_file: [u64; 8],
}

/// XOR the hash contribution of every castling right that differs between
/// `old` and `new_` rights masks.
#[inline]
pub fn xor_castling_rights_delta(hash: &mut u64, keys: &ZobristKeys, old: u8, new_: u8) {
    let d = old ^ new_;
    if d & CASTLE_WK != 0 {
        *hash ^= keys.castling[0];
    }
    if d & CASTLE_WQ != 0 {
        *hash ^= keys.castling[1];
    }
    if d & CASTLE_BK != 0 {
        *hash ^= keys.castling[2];
    }
    if d & CASTLE_BQ != 0 {
        *hash ^= keys.castling[3];
    }
}

/// Global keys, initialized on first use.
pub fn zobrist_keys() -> &'static ZobristKeys {
    static KEYS: OnceCell<ZobristKeys> = OnceCell::new();
    KEYS.get_or_init(|| generate_zobrist_keys(StdRng::seed_from_u64(ZOBRIST_SEED)))
}

fn generate_zobrist_keys(mut rng: StdRng) -> ZobristKeys {
    #[inline]
    fn non_zero(r: &mut StdRng) -> u64 {
        // avoid zero keys to reduce degenerate collisions
        let mut v = r.next_u64();
        while v == 0 {
            v = r.next_u64();
        }
        v
    }

    let mut keys = ZobristKeys {
        piece: [[[0u64; 64]; 6]; 2],
        side_to_move: 0,
        castling: [0u64; 4],
        ep_file: [0u64; 8],
    };

    for c in 0..2 {
        for p in 0..6 {
            for sq in 0..64 {
                keys.piece[c][p][sq] = non_zero(&mut rng);
            }
        }
    }

    for i in 0..4 {
        keys.castling[i] = non_zero(&mut rng);
    }

    for f in 0..8 {
        keys.ep_file[f] = non_zero(&mut rng);
    }

    keys.side_to_move = non_zero(&mut rng);

    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_deterministic_and_nonzero() {
        let a = generate_zobrist_keys(StdRng::seed_from_u64(ZOBRIST_SEED));
        let b = generate_zobrist_keys(StdRng::seed_from_u64(ZOBRIST_SEED));
        assert_eq!(a.side_to_move, b.side_to_move);
        assert_eq!(a.piece[1][3][42], b.piece[1][3][42]);
        assert_ne!(a.side_to_move, 0);
        for f in 0..8 {
            assert_ne!(a.ep_file[f], 0);
            assert_eq!(a.ep_file[f], b.ep_file[f]);
        }
    }

    #[test]
    fn castling_delta_is_involutive() {
        let keys = zobrist_keys();
        let mut h = 0xDEAD_BEEFu64;
        let start = h;
        xor_castling_rights_delta(&mut h, keys, CASTLE_ALL, CASTLE_WK | CASTLE_BQ);
        assert_ne!(h, start);
        xor_castling_rights_delta(&mut h, keys, CASTLE_WK | CASTLE_BQ, CASTLE_ALL);
        assert_eq!(h, start);
    }
}
