// Scan results and cost extrapolation.
//
// A `ScanReport` says how much of the space a scan covered, how many
// candidates it found, and how long it took. From the elapsed time the
// report extrapolates the cost of the full space as
// `elapsed * space / scanned`. Wall-clock time varies from machine to
// machine, so only the formula is tested. It is evaluated in `u128`
// nanoseconds with a single division at the end; the multiplication is
// checked, so an estimate past `u128::MAX` nanoseconds comes back as `None`
// instead of wrapping.

use crate::cracker::{CandidateState, CrackRequest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;
const NANOS_PER_HOUR: u128 = 3600 * NANOS_PER_SEC;

/// The outcome of one bounded scan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub request: CrackRequest,
    /// Size of the full low-bit space.
    pub space: u64,
    /// How many low-bit values were tested, starting from 0.
    pub scanned: u64,
    /// Exact number of consistent candidates among those tested.
    pub hits: u64,
    /// Concrete candidates, lowest low bits first, up to the recording cap.
    pub candidates: Vec<CandidateState>,
    pub elapsed: Duration,
}

impl ScanReport {
    /// Whether more hits were found than recorded.
    pub fn truncated(&self) -> bool {
        self.hits > self.candidates.len() as u64
    }

    /// Whether the whole space was covered, making `hits` the exact size of
    /// the candidate set.
    pub fn is_exhaustive(&self) -> bool {
        self.scanned == self.space
    }

    /// Projected time to scan the full space at the observed rate.
    pub fn estimate(&self) -> Option<Estimate> {
        extrapolate(self.elapsed, self.scanned, self.space)
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = self.request.first();
        let second = self.request.second();
        writeln!(
            f,
            "Observations: {}-bit {} then {}-bit {}, {} transition(s) apart",
            first.bits(),
            first.value(),
            second.bits(),
            second.value(),
            self.request.steps()
        )?;
        for c in &self.candidates {
            writeln!(f, "Found candidate state: {}", c.state)?;
        }
        if self.truncated() {
            writeln!(
                f,
                "... {} more not recorded",
                self.hits - self.candidates.len() as u64
            )?;
        }
        writeln!(
            f,
            "Scanned {} of 2^{} candidates in {:.4}s, {} hit(s)",
            self.scanned,
            self.request.unknown_bits(),
            self.elapsed.as_secs_f64(),
            self.hits
        )?;
        writeln!(
            f,
            "Expected candidates over the full space: 2^{}",
            self.request.expected_candidates_log2()
        )?;
        match self.estimate() {
            Some(estimate) => write!(
                f,
                "Estimated time for 2^{}: {}",
                self.request.unknown_bits(),
                estimate
            ),
            None => write!(f, "Estimated time: unavailable"),
        }
    }
}

/// Projected scan time, in nanoseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Estimate {
    pub nanos: u128,
}

impl Estimate {
    /// `None` if the estimate exceeds what a `Duration` can represent.
    pub fn as_duration(self) -> Option<Duration> {
        let secs = u64::try_from(self.nanos / NANOS_PER_SEC).ok()?;
        Some(Duration::new(secs, (self.nanos % NANOS_PER_SEC) as u32))
    }

    /// Hours, for display only.
    pub fn hours(self) -> f64 {
        self.nanos as f64 / NANOS_PER_HOUR as f64
    }
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} hours", self.hours())
    }
}

/// `elapsed * space / scanned`, floored to whole nanoseconds.
/// `None` when nothing was scanned or the product does not fit in `u128`.
pub fn extrapolate(elapsed: Duration, scanned: u64, space: u64) -> Option<Estimate> {
    if scanned == 0 {
        return None;
    }
    let total = elapsed.as_nanos().checked_mul(u128::from(space))?;
    Some(Estimate {
        nanos: total / u128::from(scanned),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Observation;
    use warseed_lcg::GeneratorState;

    fn report(scanned: u64, hits: u64, recorded: usize, elapsed: Duration) -> ScanReport {
        let request = CrackRequest::from_steps(
            Observation::new(16, 50_024).unwrap(),
            Observation::new(16, 16_703).unwrap(),
            2,
        );
        ScanReport {
            request,
            space: 1 << 32,
            scanned,
            hits,
            candidates: (0..recorded as u64)
                .map(|low| CandidateState {
                    low_bits: low,
                    state: request.candidate_state(low),
                })
                .collect(),
            elapsed,
        }
    }

    #[test]
    fn extrapolation_is_exact_for_million_attempts() {
        let t = Duration::from_millis(250);
        let estimate = extrapolate(t, 1_000_000, 1 << 32).unwrap();
        assert_eq!(estimate.nanos, 250_000_000 * (1u128 << 32) / 1_000_000);
        assert_eq!(estimate.nanos, 1_073_741_824_000);
    }

    #[test]
    fn extrapolation_floors_once() {
        let t = Duration::new(1, 1);
        let estimate = extrapolate(t, 1_000_000, 1 << 32).unwrap();
        assert_eq!(estimate.nanos, 4_294_967_300_294);
    }

    #[test]
    fn extrapolation_does_not_wrap() {
        let t = Duration::from_secs(1 << 40);
        let estimate = extrapolate(t, 1, 1 << 48).unwrap();
        assert_eq!(estimate.nanos, t.as_nanos() << 48);
        assert_eq!(estimate.as_duration(), None);
        assert_eq!(extrapolate(Duration::MAX, 1, 1 << 48), None);
    }

    #[test]
    fn extrapolation_of_empty_scan_is_none() {
        assert_eq!(extrapolate(Duration::from_secs(1), 0, 1 << 32), None);
    }

    #[test]
    fn exhaustive_scan_estimates_its_own_time() {
        let t = Duration::from_micros(1234);
        let estimate = extrapolate(t, 1 << 18, 1 << 18).unwrap();
        assert_eq!(estimate.as_duration(), Some(t));
    }

    #[test]
    fn estimate_hours() {
        let estimate = Estimate {
            nanos: 2 * NANOS_PER_HOUR,
        };
        assert_eq!(estimate.hours(), 2.0);
        assert_eq!(estimate.to_string(), "2.00 hours");
    }

    #[test]
    fn truncation_and_exhaustiveness() {
        let r = report(1000, 3, 3, Duration::from_millis(1));
        assert!(!r.truncated());
        assert!(!r.is_exhaustive());
        let r = report(1 << 32, 5, 2, Duration::from_millis(1));
        assert!(r.truncated());
        assert!(r.is_exhaustive());
    }

    #[test]
    fn display_lists_candidates_and_estimate() {
        let r = report(1_000_000, 2, 1, Duration::from_millis(250));
        let text = r.to_string();
        assert!(text.contains("Found candidate state: 0xc36800000000"));
        assert!(text.contains("1 more not recorded"));
        assert!(text.contains("Expected candidates over the full space: 2^16"));
        assert!(text.contains("Estimated time for 2^32: 0.30 hours"));
    }

    #[test]
    fn serialization_roundtrip() {
        let r = report(10, 1, 1, Duration::from_nanos(42));
        let json = serde_json::to_string(&r).unwrap();
        let restored: ScanReport = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, r);
        assert_eq!(
            restored.candidates[0].state,
            GeneratorState::from_raw(0xC368_0000_0000)
        );
    }
}
