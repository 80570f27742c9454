// warseed_crack: recover the battle engine's RNG state from warrior
// placements.
//
// The engine seeds a 48-bit LCG (see `warseed_lcg`) per match and uses it to
// pick where each warrior is loaded. Those load positions are the top 16
// bits of the generator state at two known points in the draw sequence. This
// crate turns such high-bits-only observations back into the set of
// generator states, and from there seeds, that could have produced them.
//
// Module overview:
// - `observation.rs`: `Observation`, `ObservationSequence`: what a caller can
//                     see of a draw sequence, and step counting between draws.
// - `placement.rs`:   Fixture generator: replays seeds through draw widths and
//                     models the draws a match start makes (`MatchLayout`).
// - `cracker.rs`:     `CrackRequest`, `Cracker`: the low-bits search over
//                     combined n-step transitions, parallel scanning, and
//                     refinement with extra observations.
// - `report.rs`:      `ScanReport` and the full-space time extrapolation.
// - `config.rs`:      `CrackConfig`: search bounds and worker settings (JSON).
// - `error.rs`:       `CrackError`.
//
// The `warseed` binary (`main.rs`) wraps all of this for the command line.
// Nothing here talks to the engine itself; it is only ever observed.

pub mod config;
pub mod cracker;
pub mod error;
pub mod observation;
pub mod placement;
pub mod report;

pub use config::CrackConfig;
pub use cracker::{CandidateState, CrackRequest, Cracker, refine};
pub use error::CrackError;
pub use observation::{LaterObservation, Observation, ObservationSequence};
pub use report::ScanReport;
