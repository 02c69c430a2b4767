//! Camera identity hasher
//!
//! Maps a camera's vendor identifier string to the 32-bit identity used on
//! the wire. The hash is keyed by a 256-byte substitution table generated
//! when the hasher is built, so identities are stable for the lifetime of
//! one hasher but differ between processes unless the table is seeded.

use rand::{RngCore, SeedableRng, rngs::StdRng};
use tracing::trace;

use camctl_types::CameraIdentity;

/// Keyed rolling string hasher
///
/// # Algorithm
///
/// ```text
/// 1. h = 0x1F351F35
/// 2. For each byte c: h = rotr(h, 11) + table[(c ^ h) & 0xFF]
/// 3. h ^= h >> 16
/// 4. Return h ^ (h >> 8)
/// ```
///
/// Not cryptographic: distinct strings may collide.
///
/// # Examples
///
/// ```
/// use camctl_core::IdentityHasher;
///
/// let hasher = IdentityHasher::from_seed(7);
/// assert_eq!(hasher.hash("DEV_1AB22C00"), hasher.hash("DEV_1AB22C00"));
/// ```
#[derive(Clone)]
pub struct IdentityHasher {
    table: [u8; 256],
}

impl IdentityHasher {
    /// Initial accumulator value
    pub const INITIAL: u32 = 0x1F35_1F35;

    /// Create a hasher with a random substitution table
    pub fn new() -> Self {
        Self::from_rng(&mut rand::thread_rng())
    }

    /// Create a hasher whose table is derived from `seed`
    ///
    /// Identities from equally seeded hashers match across restarts.
    pub fn from_seed(seed: u64) -> Self {
        Self::from_rng(&mut StdRng::seed_from_u64(seed))
    }

    /// Create a hasher from an explicit substitution table
    pub fn from_table(table: [u8; 256]) -> Self {
        Self { table }
    }

    fn from_rng<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut table = [0u8; 256];
        rng.fill_bytes(&mut table);
        Self { table }
    }

    /// Hash an identifier string
    pub fn hash(&self, input: &str) -> CameraIdentity {
        let mut h = Self::INITIAL;
        for &byte in input.as_bytes() {
            let index = (byte ^ (h as u8)) as usize;
            h = h.rotate_right(11).wrapping_add(self.table[index] as u32);
        }

        // Whiten the low bits
        h ^= h >> 16;
        let h = h ^ (h >> 8);

        trace!(input = input, identity = h, "Hashed camera identifier");

        CameraIdentity(h)
    }
}

impl Default for IdentityHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IdentityHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityHasher").finish_non_exhaustive()
    }
}
