// Bit-exact replica of the 48-bit linear congruential generator used by the
// battle engine's seeded RNG (the classic `0x5DEECE66D` / `0xB` family).
//
// The generator state is a plain 48-bit integer wrapped in `GeneratorState`.
// Every operation is a pure function from one state to the next: callers
// thread the returned state forward themselves, and there is no process-wide
// generator. `Lcg` is a thin owning handle for callers that prefer `&mut self`
// methods; it holds exactly one `GeneratorState` and nothing else.
//
// Module overview:
// - `affine.rs`: `AffineStep`, the transition law as an affine map, with
//                closed-form n-step powers and inverses. The cracker in
//                `warseed_crack` works entirely in terms of these maps.
// - `error.rs`:  `LcgError` for bad bit widths and non-power-of-two bounds.
//
// **Critical constraint: bit-exactness.** `MULTIPLIER`, `ADDEND` and the
// 48-bit modulus define compatibility with the externally observed draw
// sequences. They are not configurable. All arithmetic is unsigned and
// wrapping, masked to 48 bits; there is no floating point in this crate.

pub mod affine;
pub mod error;

pub use affine::AffineStep;
pub use error::LcgError;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The generator's fixed multiplier `M`.
pub const MULTIPLIER: u64 = 0x5_DEEC_E66D;

/// The generator's fixed addend `A`.
pub const ADDEND: u64 = 0xB;

/// Width of the internal state in bits.
pub const STATE_BITS: u32 = 48;

/// Mask selecting the low 48 bits (reduction modulo `2^48`).
pub const STATE_MASK: u64 = (1 << STATE_BITS) - 1;

/// Widest value `next_bits` and `draw_power_of_two` will extract.
pub const MAX_DRAW_BITS: u32 = 31;

/// A 48-bit generator state. The inner value is always `< 2^48`.
///
/// Serialized as the bare integer. Deserialization goes through `from_raw`,
/// so out-of-range input is masked like any other raw value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct GeneratorState(u64);

impl GeneratorState {
    /// Seed a state the way the target RNG's constructor does:
    /// `(seed XOR M) mod 2^48`.
    ///
    /// Negative seeds are accepted; their two's-complement bits are used, so
    /// `-1` and `0xFFFF_FFFF_FFFF` produce the same state.
    pub const fn seeded(seed: i64) -> Self {
        Self((seed as u64 ^ MULTIPLIER) & STATE_MASK)
    }

    /// Wrap a raw value, discarding anything above bit 47.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw & STATE_MASK)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    /// The low 48 bits of the seed that `seeded` would turn into this state.
    pub const fn seed_bits(self) -> u64 {
        (self.0 ^ MULTIPLIER) & STATE_MASK
    }

    /// Apply the transition law once: `(M * state + A) mod 2^48`.
    pub const fn step(self) -> Self {
        Self(self.0.wrapping_mul(MULTIPLIER).wrapping_add(ADDEND) & STATE_MASK)
    }

    /// Walk the generator back `n` transitions.
    pub fn rewind(self, n: u64) -> Self {
        AffineStep::steps(n).inverse().apply(self)
    }

    /// The top `bits` bits of this state, without advancing.
    ///
    /// `bits == 0` yields 0. Callers must keep `bits <= STATE_BITS`.
    pub const fn top_bits(self, bits: u32) -> u64 {
        if bits == 0 {
            0
        } else {
            self.0 >> (STATE_BITS - bits)
        }
    }

    /// Advance once and return the top `bits` bits of the new state.
    ///
    /// `bits` must be in `1..=31`.
    pub fn next_bits(self, bits: u32) -> Result<(Self, u32), LcgError> {
        if !(1..=MAX_DRAW_BITS).contains(&bits) {
            return Err(LcgError::InvalidBitWidth {
                bits,
                min: 1,
                max: MAX_DRAW_BITS,
            });
        }
        let next = self.step();
        Ok((next, next.top_bits(bits) as u32))
    }

    /// Draw a value below `2^k`, advancing the state exactly once.
    ///
    /// Computed the way the target RNG's bounded draw does for power-of-two
    /// bounds, `(bound * next_bits(31)) >> 31`, which is the same as the top
    /// `k` bits of the post-transition state. `k == 0` (bound 1) always
    /// returns 0 but still consumes a transition.
    pub fn draw_power_of_two(self, k: u32) -> Result<(Self, u32), LcgError> {
        if k > MAX_DRAW_BITS {
            return Err(LcgError::InvalidBitWidth {
                bits: k,
                min: 0,
                max: MAX_DRAW_BITS,
            });
        }
        let (next, r) = self.next_bits(MAX_DRAW_BITS)?;
        let bound = 1u64 << k;
        Ok((next, ((bound * u64::from(r)) >> MAX_DRAW_BITS) as u32))
    }

    /// Draw a value below `bound`, which must be a power of two.
    pub fn draw_bounded(self, bound: u32) -> Result<(Self, u32), LcgError> {
        self.draw_power_of_two(bound_exponent(bound)?)
    }
}

impl From<u64> for GeneratorState {
    fn from(raw: u64) -> Self {
        Self::from_raw(raw)
    }
}

impl From<GeneratorState> for u64 {
    fn from(state: GeneratorState) -> Self {
        state.raw()
    }
}

impl fmt::Display for GeneratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#014x}", self.0)
    }
}

/// Convert a power-of-two bound into its exponent `k` (`bound == 2^k`).
///
/// Zero and non-powers of two are rejected with `UnsupportedBound`: the
/// target RNG handles those with a rejection loop whose draw count depends
/// on the state, which the cracker cannot model.
pub fn bound_exponent(bound: u32) -> Result<u32, LcgError> {
    if bound.is_power_of_two() {
        Ok(bound.trailing_zeros())
    } else {
        Err(LcgError::UnsupportedBound {
            bound: u64::from(bound),
        })
    }
}

/// Owning handle around a single `GeneratorState`.
///
/// Two `Lcg` instances created with the same seed produce identical draws for
/// identical width sequences.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lcg {
    state: GeneratorState,
}

impl Lcg {
    pub fn new(seed: i64) -> Self {
        Self::from_state(GeneratorState::seeded(seed))
    }

    pub fn from_state(state: GeneratorState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> GeneratorState {
        self.state
    }

    pub fn next_bits(&mut self, bits: u32) -> Result<u32, LcgError> {
        let (state, value) = self.state.next_bits(bits)?;
        self.state = state;
        Ok(value)
    }

    pub fn draw_power_of_two(&mut self, k: u32) -> Result<u32, LcgError> {
        let (state, value) = self.state.draw_power_of_two(k)?;
        self.state = state;
        Ok(value)
    }

    pub fn draw_bounded(&mut self, bound: u32) -> Result<u32, LcgError> {
        let (state, value) = self.state.draw_bounded(bound)?;
        self.state = state;
        Ok(value)
    }
}
