//! Capacity-constrained search over how many filter records to merge.
//!
//! The midpoint is the candidate count of highest-priority records folded
//! into one compression attempt. Whether a midpoint fits the capacity is
//! assumed to shrink monotonically as the midpoint grows, but that is not
//! guaranteed (more exclusions can occasionally remove entries too), so the
//! driver bounds its probes like a binary search while only ever trusting
//! successes it actually observed.

use std::collections::BTreeMap;

use crate::error::{CompressError, Result};
use crate::expand::expand;
use crate::filter::BitFieldRecord;
use crate::minimize::{MinimizeError, Minimizer};
use crate::table::RoutingTable;

/// One probe's outcome, retained for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Success { entries: usize },
    Failure { reason: String },
}

impl Attempt {
    pub fn is_success(&self) -> bool {
        matches!(self, Attempt::Success { .. })
    }
}

/// Result of one router's search: the accumulator threaded through the
/// probe loop.
///
/// Invariants: `attempts[&best_midpoint]` is a `Success`, `best_table` is
/// the table that probe produced, and no midpoint above `best_midpoint` has
/// a recorded `Success`. `best_midpoint` is never interpolated; it was
/// probed and observed to fit.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best_midpoint: u32,
    pub best_table: RoutingTable,
    pub attempts: BTreeMap<u32, Attempt>,
}

/// A probe either fits (carrying the compressed table) or does not.
pub enum ProbeOutcome {
    Fits(RoutingTable),
    DoesNotFit { reason: String },
}

struct Accumulator {
    best_midpoint: u32,
    best_table: RoutingTable,
    attempts: BTreeMap<u32, Attempt>,
}

impl Accumulator {
    fn record(&mut self, midpoint: u32, outcome: ProbeOutcome) -> bool {
        match outcome {
            ProbeOutcome::Fits(table) => {
                self.attempts.insert(
                    midpoint,
                    Attempt::Success {
                        entries: table.len(),
                    },
                );
                if midpoint >= self.best_midpoint {
                    self.best_midpoint = midpoint;
                    self.best_table = table;
                }
                true
            }
            ProbeOutcome::DoesNotFit { reason } => {
                self.attempts.insert(midpoint, Attempt::Failure { reason });
                false
            }
        }
    }
}

/// Find the largest midpoint in `[0, n]` observed to satisfy `probe`,
/// assuming midpoint 0 already succeeded with `zero_table`.
///
/// Keeps `best_success` (largest observed success) and `min_fail` (smallest
/// observed failure bound) and repeatedly probes their midpoint, so the
/// probe count is O(log n) and each midpoint is probed at most once.
fn drive_search(
    n: u32,
    zero_table: RoutingTable,
    mut probe: impl FnMut(u32) -> ProbeOutcome,
) -> SearchResult {
    let mut acc = Accumulator {
        best_midpoint: 0,
        best_table: zero_table,
        attempts: BTreeMap::new(),
    };
    acc.attempts.insert(
        0,
        Attempt::Success {
            entries: acc.best_table.len(),
        },
    );

    let mut best_success: u32 = 0;
    let mut min_fail: u64 = n as u64 + 1;
    while (best_success as u64) < min_fail - 1 {
        let midpoint = ((best_success as u64 + min_fail) / 2) as u32;
        if acc.record(midpoint, probe(midpoint)) {
            best_success = midpoint;
        } else {
            min_fail = midpoint as u64;
        }
    }

    acc.best_midpoint = best_success;
    SearchResult {
        best_midpoint: acc.best_midpoint,
        best_table: acc.best_table,
        attempts: acc.attempts,
    }
}

fn probe_once<M: Minimizer + ?Sized>(
    table: &RoutingTable,
    records: &[BitFieldRecord],
    minimizer: &M,
    target_length: usize,
    midpoint: u32,
) -> ProbeOutcome {
    let candidate = expand(table, records, midpoint);
    match minimizer.compress(&candidate, target_length) {
        Ok(compressed) if compressed.len() <= target_length => {
            tracing::debug!(
                midpoint,
                entries = compressed.len(),
                "compression attempt fits"
            );
            ProbeOutcome::Fits(compressed)
        }
        Ok(compressed) => ProbeOutcome::DoesNotFit {
            reason: MinimizeError::TooLarge {
                achieved: compressed.len(),
            }
            .to_string(),
        },
        Err(e) => {
            tracing::debug!(midpoint, error = %e, "compression attempt failed");
            ProbeOutcome::DoesNotFit {
                reason: e.to_string(),
            }
        }
    }
}

/// Search for the largest number of records (by priority rank) whose merge
/// still compresses within `target_length`.
///
/// Probes midpoint 0 first; if even the unmerged table cannot compress, the
/// run fails with [`CompressError::InfeasibleAtZero`] — merging only ever
/// adds candidate entries before compression, so no midpoint can do better.
/// Probes are strictly sequential; each depends on the retained best.
pub fn run_search<M: Minimizer + ?Sized>(
    table: &RoutingTable,
    records: &[BitFieldRecord],
    minimizer: &M,
    target_length: usize,
) -> Result<SearchResult> {
    let n = records.len() as u32;

    let zero_table = match probe_once(table, records, minimizer, target_length, 0) {
        ProbeOutcome::Fits(t) => t,
        ProbeOutcome::DoesNotFit { reason } => {
            tracing::warn!(
                x = table.x,
                y = table.y,
                target_length,
                reason = %reason,
                "table infeasible with no bit-fields merged"
            );
            return Err(CompressError::InfeasibleAtZero {
                x: table.x,
                y: table.y,
                entries_before: table.len(),
                target_length,
            });
        }
    };

    Ok(drive_search(n, zero_table, |midpoint| {
        probe_once(table, records, minimizer, target_length, midpoint)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FlagsWord;
    use crate::table::{LinkSet, ProcessorSet, RoutingEntry};

    fn table_of(n: usize) -> RoutingTable {
        let mut table = RoutingTable::new(0, 0);
        for i in 0..n {
            table.push(RoutingEntry::new(
                i as u32,
                0xFFFF_FFFF,
                ProcessorSet::empty(),
                LinkSet::empty(),
                false,
            ));
        }
        table
    }

    fn fits() -> ProbeOutcome {
        ProbeOutcome::Fits(table_of(1))
    }

    fn fails() -> ProbeOutcome {
        ProbeOutcome::DoesNotFit {
            reason: "too big".into(),
        }
    }

    fn drive(n: u32, pred: impl Fn(u32) -> bool) -> SearchResult {
        drive_search(n, table_of(1), |m| if pred(m) { fits() } else { fails() })
    }

    #[test]
    fn test_all_midpoints_succeed() {
        let result = drive(10, |_| true);
        assert_eq!(result.best_midpoint, 10);
        assert!(result.attempts[&10].is_success());
    }

    #[test]
    fn test_none_beyond_zero_succeed() {
        let result = drive(10, |m| m == 0);
        assert_eq!(result.best_midpoint, 0);
        assert!(result.attempts[&0].is_success());
    }

    #[test]
    fn test_threshold_found() {
        for threshold in 0..=16u32 {
            let result = drive(16, |m| m <= threshold);
            assert_eq!(result.best_midpoint, threshold);
        }
    }

    #[test]
    fn test_probe_count_logarithmic() {
        let mut probes = 0;
        let result = drive_search(1_000_000, table_of(1), |m| {
            probes += 1;
            if m <= 123_456 {
                fits()
            } else {
                fails()
            }
        });
        assert_eq!(result.best_midpoint, 123_456);
        assert!(probes <= 21, "{probes} probes for n = 1M");
    }

    #[test]
    fn test_each_midpoint_probed_at_most_once() {
        let mut seen = std::collections::HashSet::new();
        drive_search(64, table_of(1), |m| {
            assert!(seen.insert(m), "midpoint {m} probed twice");
            if m < 20 {
                fits()
            } else {
                fails()
            }
        });
    }

    #[test]
    fn test_non_monotonic_only_observed_success_reported() {
        // Succeeds at 0..=4 and again at 9, fails in between. Whatever the
        // probe order visits, the reported best must itself have succeeded
        // and carry a Success attempt.
        let pred = |m: u32| m <= 4 || m == 9;
        let result = drive(10, pred);
        assert!(pred(result.best_midpoint));
        assert!(result.attempts[&result.best_midpoint].is_success());
        // And nothing above it is falsely claimed successful.
        for (&m, attempt) in &result.attempts {
            if m > result.best_midpoint {
                assert!(!attempt.is_success());
            }
        }
    }

    #[test]
    fn test_zero_records_trivial() {
        let result = drive(0, |_| true);
        assert_eq!(result.best_midpoint, 0);
        assert_eq!(result.attempts.len(), 1);
    }

    #[test]
    fn test_best_table_is_from_best_midpoint() {
        let result = drive_search(8, table_of(5), |m| {
            if m <= 6 {
                ProbeOutcome::Fits(table_of(m as usize))
            } else {
                fails()
            }
        });
        assert_eq!(result.best_midpoint, 6);
        assert_eq!(result.best_table.len(), 6);
        assert_eq!(
            result.attempts[&6],
            Attempt::Success { entries: 6 }
        );
    }

    // ── run_search over expand + minimizer ─────────────────────────

    fn record(processor_id: u8, key: u32, bits: Vec<u32>, n_atoms: u32, rank: u32) -> BitFieldRecord {
        BitFieldRecord {
            processor_id,
            master_pop_key: key,
            flags: FlagsWord::from_n_atoms(n_atoms),
            bits,
            write_back_address: 0,
            sort_index: Some(rank),
        }
    }

    /// Minimizer that deletes entries with no destinations at all, then
    /// checks the target.
    fn drop_dead_entries(
        table: &RoutingTable,
        target: usize,
    ) -> std::result::Result<RoutingTable, MinimizeError> {
        let kept: Vec<RoutingEntry> = table
            .iter()
            .filter(|e| !(e.processors.is_empty() && e.links.is_empty()))
            .cloned()
            .collect();
        if kept.len() <= target {
            Ok(RoutingTable::with_entries(table.x, table.y, kept))
        } else {
            Err(MinimizeError::TooLarge {
                achieved: kept.len(),
            })
        }
    }

    #[test]
    fn test_infeasible_at_zero() {
        // Live destinations on every entry, so the minimizer cannot shrink
        // the table at all and even midpoint 0 misses the target.
        let mut table = RoutingTable::new(0, 0);
        for i in 0..5u32 {
            table.push(RoutingEntry::new(
                i,
                0xFFFF_FFFF,
                [1].into_iter().collect(),
                LinkSet::empty(),
                false,
            ));
        }
        let err = run_search(&table, &[], &drop_dead_entries, 3).unwrap_err();
        assert!(
            matches!(
                err,
                CompressError::InfeasibleAtZero {
                    entries_before: 5,
                    target_length: 3,
                    ..
                }
            ),
            "got {err}"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn test_merging_removes_dead_entries() {
        // One entry, 4 atoms, single processor wanting nothing. Unmerged,
        // the expansion holds 4 live entries; merged, all 4 atoms lose
        // their only destination and compress away.
        let mut table = RoutingTable::new(0, 0);
        table.push(RoutingEntry::new(
            0x1000,
            0xFFFF_0000,
            [1].into_iter().collect(),
            LinkSet::empty(),
            false,
        ));
        let records = vec![record(1, 0x1000, vec![0b0000], 4, 0)];

        let result = run_search(&table, &records, &drop_dead_entries, 4).unwrap();
        assert_eq!(result.best_midpoint, 1);
        assert!(result.best_table.is_empty());
        assert!(result.attempts[&1].is_success());
        assert_eq!(result.attempts[&0], Attempt::Success { entries: 4 });
    }

    #[test]
    fn test_lying_minimizer_not_trusted() {
        // Minimizer claims success but returns an oversized table; the probe
        // must be recorded as a failure.
        let liar = |table: &RoutingTable, _target: usize| Ok(table.clone());
        let table = table_of(2);
        let err = run_search(&table, &[], &liar, 1).unwrap_err();
        assert!(matches!(err, CompressError::InfeasibleAtZero { .. }));
    }

    #[test]
    fn test_successful_attempts_within_target() {
        let mut table = RoutingTable::new(0, 0);
        table.push(RoutingEntry::new(
            0x1000,
            0xFFFF_0000,
            [1, 2].into_iter().collect(),
            LinkSet::empty(),
            false,
        ));
        let records = vec![
            record(1, 0x1000, vec![0b0001], 4, 0),
            record(2, 0x1000, vec![0b0001], 4, 1),
        ];

        let target = 4;
        let result = run_search(&table, &records, &drop_dead_entries, target).unwrap();
        for attempt in result.attempts.values() {
            if let Attempt::Success { entries } = attempt {
                assert!(*entries <= target);
            }
        }
        assert!(result.best_table.len() <= target);
    }
}
