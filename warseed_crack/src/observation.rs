// What an outside observer can see of the generator.
//
// Every draw the engine makes consumes exactly one transition and exposes at
// most the top `k` bits of the new state. An `Observation` is one such
// exposed value together with its width. An `ObservationSequence` is the
// full ordered list of draws a process makes for an unknown seed, where only
// some draws have known values; the rest still consume a transition each,
// which is why the distance between two observations is counted in draws,
// not in observed values.
//
// Indexing convention: draw `i` leaves the generator in the state reached
// after `i + 1` transitions from the seeded state. The distance between
// draws `i` and `j` is therefore `j - i` transitions.

use crate::cracker::CrackRequest;
use crate::error::CrackError;
use serde::{Deserialize, Serialize};
use warseed_lcg::{GeneratorState, MAX_DRAW_BITS, STATE_BITS, bound_exponent};

/// The top `bits` bits of a post-transition state, as revealed by one draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ObservationRecord")]
pub struct Observation {
    bits: u32,
    value: u32,
}

/// Unvalidated wire form of an `Observation`.
#[derive(Deserialize)]
struct ObservationRecord {
    bits: u32,
    value: u32,
}

impl TryFrom<ObservationRecord> for Observation {
    type Error = CrackError;

    fn try_from(record: ObservationRecord) -> Result<Self, CrackError> {
        Self::new(record.bits, record.value)
    }
}

impl Observation {
    pub fn new(bits: u32, value: u32) -> Result<Self, CrackError> {
        check_width(bits)?;
        if u64::from(value) >> bits != 0 {
            return Err(CrackError::ValueOutOfRange {
                value: u64::from(value),
                bits,
            });
        }
        Ok(Self { bits, value })
    }

    /// An observation of a draw made with a power-of-two `bound`.
    pub fn from_bound(bound: u32, value: u32) -> Result<Self, CrackError> {
        Self::new(bound_exponent(bound)?, value)
    }

    pub fn bits(self) -> u32 {
        self.bits
    }

    pub fn value(self) -> u32 {
        self.value
    }

    /// The observed value placed back in its position in a 48-bit state,
    /// with every unknown bit zero.
    pub fn high_bits(self) -> u64 {
        if self.bits == 0 {
            0
        } else {
            u64::from(self.value) << (STATE_BITS - self.bits)
        }
    }

    /// Whether a raw 48-bit state would have produced this observation.
    #[inline]
    pub fn matches_raw(self, raw: u64) -> bool {
        GeneratorState::from_raw(raw).top_bits(self.bits) == u64::from(self.value)
    }
}

/// An observation made a known number of transitions after some reference
/// draw. Used to filter candidate sets with draws beyond the cracked pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaterObservation {
    pub steps: u64,
    pub observation: Observation,
}

/// One draw in a sequence: its width, and its value if it was seen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDraw {
    pub bits: u32,
    pub value: Option<u32>,
}

/// The ordered draws a process makes from one seed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SequenceRecord")]
pub struct ObservationSequence {
    draws: Vec<SequenceDraw>,
}

#[derive(Deserialize)]
struct SequenceRecord {
    draws: Vec<SequenceDraw>,
}

impl TryFrom<SequenceRecord> for ObservationSequence {
    type Error = CrackError;

    fn try_from(record: SequenceRecord) -> Result<Self, CrackError> {
        for draw in &record.draws {
            match draw.value {
                Some(value) => {
                    Observation::new(draw.bits, value)?;
                }
                None => check_width(draw.bits)?,
            }
        }
        Ok(Self {
            draws: record.draws,
        })
    }
}

impl ObservationSequence {
    /// A sequence of draws with the given widths, none observed yet.
    pub fn from_widths(widths: &[u32]) -> Result<Self, CrackError> {
        let draws = widths
            .iter()
            .map(|&bits| {
                check_width(bits)?;
                Ok(SequenceDraw { bits, value: None })
            })
            .collect::<Result<Vec<_>, CrackError>>()?;
        Ok(Self { draws })
    }

    /// Record the value seen for draw `index`.
    pub fn observe(&mut self, index: usize, value: u32) -> Result<(), CrackError> {
        let len = self.draws.len();
        let draw = self
            .draws
            .get_mut(index)
            .ok_or(CrackError::SequenceIndex { index, len })?;
        let checked = Observation::new(draw.bits, value)?;
        draw.value = Some(checked.value());
        Ok(())
    }

    pub fn draws(&self) -> &[SequenceDraw] {
        &self.draws
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// Draw widths in order, observed or not.
    pub fn widths(&self) -> Vec<u32> {
        self.draws.iter().map(|d| d.bits).collect()
    }

    /// Every observed draw with its index, in sequence order.
    pub fn observed(&self) -> impl Iterator<Item = (usize, Observation)> + '_ {
        self.draws.iter().enumerate().filter_map(|(i, d)| {
            d.value.map(|value| (i, Observation { bits: d.bits, value }))
        })
    }

    /// The observation at `index`, which must have a value.
    pub fn observation(&self, index: usize) -> Result<Observation, CrackError> {
        let draw = self.draws.get(index).ok_or(CrackError::SequenceIndex {
            index,
            len: self.draws.len(),
        })?;
        let value = draw.value.ok_or(CrackError::UnobservedDraw { index })?;
        Ok(Observation {
            bits: draw.bits,
            value,
        })
    }

    /// Transitions between draw `first` and draw `second`, counting every
    /// unobserved draw in between.
    pub fn steps_between(&self, first: usize, second: usize) -> Result<u64, CrackError> {
        let len = self.draws.len();
        for index in [first, second] {
            if index >= len {
                return Err(CrackError::SequenceIndex { index, len });
            }
        }
        if second < first {
            return Err(CrackError::OutOfOrder { first, second });
        }
        Ok((second - first) as u64)
    }

    /// Build a cracking request from two observed draws.
    pub fn pair(&self, first: usize, second: usize) -> Result<CrackRequest, CrackError> {
        let steps = self.steps_between(first, second)?;
        Ok(CrackRequest::from_steps(
            self.observation(first)?,
            self.observation(second)?,
            steps,
        ))
    }

    /// Observed draws strictly after `after`, expressed relative to the
    /// state produced by draw `reference`.
    pub fn later_than(&self, reference: usize, after: usize) -> Vec<LaterObservation> {
        self.observed()
            .filter(|&(i, _)| i > after && i >= reference)
            .map(|(i, observation)| LaterObservation {
                steps: (i - reference) as u64,
                observation,
            })
            .collect()
    }
}

fn check_width(bits: u32) -> Result<(), CrackError> {
    if bits > MAX_DRAW_BITS {
        return Err(CrackError::InvalidBitWidth {
            bits,
            min: 0,
            max: MAX_DRAW_BITS,
        });
    }
    Ok(())
}
