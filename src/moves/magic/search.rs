use rand::RngCore;

const MAX_ATTEMPTS: u32 = 1_000_000;

#[inline(always)]
/// A sparse 64-bit candidate: AND-ing three draws keeps the popcount low,
/// which is what makes a multiplier likely to hash without collisions.
pub fn random_sparse_u64<R: RngCore>(rng: &mut R) -> u64 {
    rng.next_u64() & rng.next_u64() & rng.next_u64()
}

/// Checks a candidate by filling a scratch table. Two subsets may share an
/// index only if they produce the same attack set (a benign collision).
pub fn is_magic_candidate_valid(
    blockers: &[u64],
    attacks: &[u64],
    magic: u64,
    shift: u32,
    scratch: &mut [u64],
) -> bool {
    scratch.fill(u64::MAX);

    for (&blocker, &attack) in blockers.iter().zip(attacks) {
        let index = (blocker.wrapping_mul(magic) >> shift) as usize;
        if scratch[index] == u64::MAX {
            scratch[index] = attack;
        } else if scratch[index] != attack {
            return false;
        }
    }
    true
}

/// Finds a collision-free magic for one square, or fails loudly after a
/// bounded number of attempts.
pub fn find_magic_number_for_square<R: RngCore>(
    mask: u64,
    blockers: &[u64],
    attacks: &[u64],
    shift: u32,
    rng: &mut R,
) -> Result<u64, String> {
    let mut scratch = vec![0u64; blockers.len()];

    for _attempt in 0..MAX_ATTEMPTS {
        let magic = random_sparse_u64(rng);
        // require the product to touch the high bits, otherwise the shift
        // collapses too many subsets onto index 0
        if (mask.wrapping_mul(magic) >> 56).count_ones() < 6 {
            continue;
        }
        if is_magic_candidate_valid(blockers, attacks, magic, shift, &mut scratch) {
            return Ok(magic);
        }
    }
    Err(format!(
        "no valid magic number after {} attempts (mask {:#018x})",
        MAX_ATTEMPTS, mask
    ))
}
