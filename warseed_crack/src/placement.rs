// Ground-truth draw sequences for exercising the cracker.
//
// `simulate` replays a seed through a list of draw widths, threading the
// generator state forward the way the battle engine does. It is the fixture
// generator for tests and the `simulate`/`demo` commands, not part of the
// attack itself.
//
// `MatchLayout` models how a match start consumes draws. Warriors are loaded
// group by group: before each group is placed the engine shuffles the
// remaining groups with a draw bounded by how many remain, then draws the
// warrior's load position. With two groups and a 64 KiB arena that is
// widths `[1, 16, 0, 16]`. The two position draws are what a spectator sees;
// the shuffle draws are invisible but still consume transitions.

use crate::error::CrackError;
use crate::observation::ObservationSequence;
use serde::{Deserialize, Serialize};
use warseed_lcg::{GeneratorState, MAX_DRAW_BITS, bound_exponent};

/// Replay `seed` through draws of the given widths and return every value.
pub fn simulate(seed: i64, widths: &[u32]) -> Result<Vec<u32>, CrackError> {
    simulate_from(GeneratorState::seeded(seed), widths).map(|(_, values)| values)
}

/// Replay from an explicit state. Returns the final state with the values.
pub fn simulate_from(
    state: GeneratorState,
    widths: &[u32],
) -> Result<(GeneratorState, Vec<u32>), CrackError> {
    let mut state = state;
    let mut values = Vec::with_capacity(widths.len());
    for &k in widths {
        let (next, value) = state.draw_power_of_two(k)?;
        state = next;
        values.push(value);
    }
    Ok((state, values))
}

/// How a match start consumes generator draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchLayout {
    /// Number of warrior groups, each placed with one position draw.
    pub groups: u32,
    /// Width of a load-position draw (16 for a 64 KiB arena).
    pub position_bits: u32,
}

impl Default for MatchLayout {
    fn default() -> Self {
        Self {
            groups: 2,
            position_bits: 16,
        }
    }
}

impl MatchLayout {
    /// Widths of every draw made while placing all groups, in order.
    ///
    /// Fails with `UnsupportedBound` when a shuffle bound (the number of
    /// groups still unplaced) is not a power of two, e.g. for 3 groups.
    pub fn widths(&self) -> Result<Vec<u32>, CrackError> {
        if self.groups == 0 {
            return Err(CrackError::InvalidConfig(
                "a match needs at least one group".into(),
            ));
        }
        if self.position_bits > MAX_DRAW_BITS {
            return Err(CrackError::InvalidBitWidth {
                bits: self.position_bits,
                min: 0,
                max: MAX_DRAW_BITS,
            });
        }
        let mut widths = Vec::with_capacity(2 * self.groups as usize);
        for remaining in (1..=self.groups).rev() {
            widths.push(bound_exponent(remaining)?);
            widths.push(self.position_bits);
        }
        Ok(widths)
    }

    /// Indices of the load-position draws within `widths()`.
    pub fn position_indices(&self) -> Vec<usize> {
        (0..self.groups as usize).map(|g| 2 * g + 1).collect()
    }
}

/// Everything a match start drew, and the subset a spectator can see.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPlacement {
    pub layout: MatchLayout,
    /// Every draw, shuffles included.
    pub draws: Vec<u32>,
    /// Load position of each group, in placement order.
    pub positions: Vec<u32>,
}

impl MatchPlacement {
    /// The sequence as an outside observer sees it: widths of every draw,
    /// values only for the load positions.
    pub fn observations(&self) -> Result<ObservationSequence, CrackError> {
        let mut seq = ObservationSequence::from_widths(&self.layout.widths()?)?;
        for (index, &position) in self
            .layout
            .position_indices()
            .iter()
            .zip(&self.positions)
        {
            seq.observe(*index, position)?;
        }
        Ok(seq)
    }
}

/// Run the placement phase of a match for `seed`.
pub fn simulate_match(seed: i64, layout: MatchLayout) -> Result<MatchPlacement, CrackError> {
    let draws = simulate(seed, &layout.widths()?)?;
    let positions = layout
        .position_indices()
        .into_iter()
        .map(|i| draws[i])
        .collect();
    Ok(MatchPlacement {
        layout,
        draws,
        positions,
    })
}
