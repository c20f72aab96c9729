//! Magic bitboard tables, built once at startup.
//!
//! The construction enumerates every relevant-occupancy subset per square,
//! searches a collision-free magic multiplier with a fixed-seed PRNG (so
//! every run builds the identical tables), and packs all per-square rows
//! into one flat array addressed by prefix-sum offsets. A self-check runs
//! before the tables are published; any inconsistency is fatal.

pub mod attacks;
pub mod search;
pub mod structs;

pub use structs::{MagicEntry, MagicTables, SliderTable};

use crate::utils::nth_subset;
use attacks::{
    bishop_attacks_per_square, bishop_relevancy_mask, rook_attacks_per_square, rook_relevancy_mask,
};
use once_cell::sync::Lazy;
use rand::{SeedableRng, rngs::StdRng};
use search::find_magic_number_for_square;

const MAGIC_SEED: u64 = 0xD6E1_28A9_5B3C_0F47;

static TABLES: Lazy<MagicTables> = Lazy::new(|| {
    let tables = generate_magic_tables(MAGIC_SEED)
        .unwrap_or_else(|e| panic!("magic table construction failed: {}", e));
    verify_tables(&tables);
    tables
});

/// The process-wide slider tables. Immutable after first use; share freely.
#[inline]
pub fn magic_tables() -> &'static MagicTables {
    &TABLES
}

pub fn generate_magic_tables(seed: u64) -> Result<MagicTables, String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let rook = build_slider_table(rook_relevancy_mask, rook_attacks_per_square, &mut rng)?;
    let bishop = build_slider_table(bishop_relevancy_mask, bishop_attacks_per_square, &mut rng)?;
    Ok(MagicTables { rook, bishop })
}

fn build_slider_table(
    mask_fn: fn(usize) -> u64,
    attack_fn: fn(usize, u64) -> u64,
    rng: &mut StdRng,
) -> Result<SliderTable, String> {
    let mut entries = Vec::with_capacity(64);
    let mut total = 0usize;

    // pass 1: masks and prefix-sum offsets
    for square in 0..64 {
        let mask = mask_fn(square);
        let bits = mask.count_ones();
        entries.push(MagicEntry {
            mask,
            magic: 0,
            shift: 64 - bits,
            offset: total,
        });
        total += 1usize << bits;
    }

    // pass 2: find magics and fill the packed rows
    let mut packed = vec![0u64; total].into_boxed_slice();
    for square in 0..64 {
        let entry = &mut entries[square];
        let bits = entry.mask.count_ones();
        let count = 1usize << bits;

        let blockers: Vec<u64> = (0..count as u64)
            .map(|i| nth_subset(entry.mask, i))
            .collect();
        let attack_sets: Vec<u64> = blockers.iter().map(|&b| attack_fn(square, b)).collect();

        entry.magic =
            find_magic_number_for_square(entry.mask, &blockers, &attack_sets, entry.shift, rng)?;

        for (&blocker, &attack) in blockers.iter().zip(&attack_sets) {
            let index = (blocker.wrapping_mul(entry.magic) >> entry.shift) as usize;
            packed[entry.offset + index] = attack;
        }
    }

    let entries: Box<[MagicEntry; 64]> = entries
        .into_boxed_slice()
        .try_into()
        .expect("exactly 64 entries");

    Ok(SliderTable { entries, packed })
}

/// Construction-time check: every square owns a non-empty table span, and
/// the magic lookup reproduces the scan generator on every subset.
fn verify_tables(tables: &MagicTables) {
    for square in 0..64 {
        verify_square(&tables.rook, square, rook_attacks_per_square, "rook");
        verify_square(&tables.bishop, square, bishop_attacks_per_square, "bishop");
    }
}

fn verify_square(table: &SliderTable, square: usize, attack_fn: fn(usize, u64) -> u64, kind: &str) {
    let span = table.span_len(square);
    assert!(span > 0, "{} table empty at square {}", kind, square);
    assert!(
        table.packed[table.entry(square).offset..][..span]
            .iter()
            .any(|&a| a != 0),
        "{} table all-zero at square {}",
        kind,
        square
    );

    let mask = table.entry(square).mask;
    for i in 0..(1u64 << mask.count_ones()) {
        let blockers = nth_subset(mask, i);
        assert_eq!(
            table.attacks(square, blockers),
            attack_fn(square, blockers),
            "{} magic collision at square {} subset {}",
            kind,
            square,
            i
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_builds_identical_tables() {
        let a = generate_magic_tables(MAGIC_SEED).unwrap();
        let b = generate_magic_tables(MAGIC_SEED).unwrap();
        for sq in 0..64 {
            assert_eq!(a.rook.entry(sq), b.rook.entry(sq));
            assert_eq!(a.bishop.entry(sq), b.bishop.entry(sq));
        }
        assert_eq!(a.rook.packed, b.rook.packed);
    }

    #[test]
    fn global_tables_pass_verification() {
        // first access runs verify_tables; reaching here means it held
        let tables = magic_tables();
        assert_eq!(tables.rook.attacks(0, 0).count_ones(), 14);
        assert_eq!(tables.bishop.attacks(27, 0).count_ones(), 13);
    }
}
