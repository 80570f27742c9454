// The transition law as an affine map over Z/2^48.
//
// One generator step is `s -> M*s + A`. Affine maps compose into affine
// maps, so `n` steps collapse into a single pair `(M_n, A_n)` with
//
//   M_n = M^n                          mod 2^48
//   A_n = (M^(n-1) + ... + M + 1) * A  mod 2^48
//
// `AffineStep::steps` builds that pair by square-and-multiply in O(log n)
// compositions, so skipping a billion draws costs about thirty multiplies.
// The cracker leans on this: it tests each candidate state with one multiply
// and one add regardless of how many unobserved draws sit between the two
// observations.
//
// Because `M` is odd it is a unit modulo 2^48, which makes every power of
// the transition invertible. `inverse` is what lets a recovered state be
// walked back to the seed.

use crate::{ADDEND, GeneratorState, MULTIPLIER, STATE_MASK};
use serde::{Deserialize, Serialize};

/// The affine map `s -> (multiplier * s + addend) mod 2^48`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AffineStep {
    pub multiplier: u64,
    pub addend: u64,
}

impl AffineStep {
    /// Zero steps.
    pub const IDENTITY: Self = Self {
        multiplier: 1,
        addend: 0,
    };

    /// One generator transition.
    pub const SINGLE: Self = Self {
        multiplier: MULTIPLIER,
        addend: ADDEND,
    };

    /// Build a map, reducing both coefficients modulo 2^48.
    pub const fn new(multiplier: u64, addend: u64) -> Self {
        Self {
            multiplier: multiplier & STATE_MASK,
            addend: addend & STATE_MASK,
        }
    }

    /// The combined transition for `n` consecutive generator steps.
    pub fn steps(n: u64) -> Self {
        Self::SINGLE.pow(n)
    }

    /// Apply this map `n` times, by repeated squaring.
    pub fn pow(self, mut n: u64) -> Self {
        let mut acc = Self::IDENTITY;
        let mut base = self;
        while n > 0 {
            if n & 1 == 1 {
                acc = acc.then(base);
            }
            base = base.then(base);
            n >>= 1;
        }
        acc
    }

    /// Compose: apply `self` first, then `next`.
    ///
    /// `next(self(s)) = m2*(m1*s + a1) + a2 = (m2*m1)*s + (m2*a1 + a2)`.
    pub const fn then(self, next: Self) -> Self {
        Self {
            multiplier: next.multiplier.wrapping_mul(self.multiplier) & STATE_MASK,
            addend: next
                .multiplier
                .wrapping_mul(self.addend)
                .wrapping_add(next.addend)
                & STATE_MASK,
        }
    }

    /// Apply to a raw 48-bit value. This is the cracker's inner loop.
    #[inline]
    pub const fn apply_raw(self, raw: u64) -> u64 {
        self.multiplier.wrapping_mul(raw).wrapping_add(self.addend) & STATE_MASK
    }

    pub const fn apply(self, state: GeneratorState) -> GeneratorState {
        GeneratorState::from_raw(self.apply_raw(state.raw()))
    }

    /// The map that undoes this one. Requires an odd multiplier, which every
    /// power of the generator's transition has.
    pub const fn inverse(self) -> Self {
        let inv = inverse_mod_2_48(self.multiplier);
        // s = inv * (t - a)
        Self {
            multiplier: inv,
            addend: inv.wrapping_mul(self.addend.wrapping_neg()) & STATE_MASK,
        }
    }
}

/// Multiplicative inverse of an odd `m` modulo 2^48.
///
/// Newton's iteration `x <- x * (2 - m*x)` doubles the number of correct low
/// bits each round. An odd `m` is its own inverse modulo 8 (3 bits), so five
/// rounds give 96 bits, comfortably past 48.
const fn inverse_mod_2_48(m: u64) -> u64 {
    let mut x = m;
    let mut i = 0;
    while i < 5 {
        x = x.wrapping_mul(2u64.wrapping_sub(m.wrapping_mul(x)));
        i += 1;
    }
    x & STATE_MASK
}
