//! Report value objects handed to the external reporting layer.
//!
//! Textual rendering is out of scope; these are plain serializable values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::search::{Attempt, SearchResult};

/// One failed merged-marker write. The table decision stands regardless;
/// the filter is simply a candidate again next run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteBackFailure {
    pub processor_id: u8,
    pub master_pop_key: u32,
    pub address: u32,
    pub error: String,
}

/// One compression attempt, flattened for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptReport {
    pub success: bool,
    /// Entry count of the compressed table, for successful attempts.
    pub entries: Option<usize>,
    /// Failure reason, for failed attempts.
    pub reason: Option<String>,
}

impl From<&Attempt> for AttemptReport {
    fn from(attempt: &Attempt) -> Self {
        match attempt {
            Attempt::Success { entries } => AttemptReport {
                success: true,
                entries: Some(*entries),
                reason: None,
            },
            Attempt::Failure { reason } => AttemptReport {
                success: false,
                entries: None,
                reason: Some(reason.clone()),
            },
        }
    }
}

/// Per-router compression summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterSummary {
    pub x: u8,
    pub y: u8,
    /// Records folded into the table (rank below the best midpoint).
    pub n_merged: u32,
    /// Records that were candidates for merging.
    pub n_candidates: u32,
    /// Entry count of the uncompressed input table.
    pub entries_before: usize,
    /// Entry count of the adopted compressed table.
    pub entries_after: usize,
    /// Packets per delivery round the merged filters stop the router from
    /// forwarding to cores that would drop them.
    pub redundant_packets_filtered: u64,
    /// Every probed midpoint and how it went.
    pub attempts: BTreeMap<u32, AttemptReport>,
    pub write_back_failures: Vec<WriteBackFailure>,
}

impl RouterSummary {
    /// Fraction of candidate records merged, in percent. 100 when there
    /// were no candidates.
    pub fn percent_merged(&self) -> f64 {
        if self.n_candidates == 0 {
            100.0
        } else {
            100.0 * f64::from(self.n_merged) / f64::from(self.n_candidates)
        }
    }
}

pub(crate) fn attempts_report(search: &SearchResult) -> BTreeMap<u32, AttemptReport> {
    search
        .attempts
        .iter()
        .map(|(&midpoint, attempt)| (midpoint, AttemptReport::from(attempt)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> RouterSummary {
        RouterSummary {
            x: 3,
            y: 4,
            n_merged: 2,
            n_candidates: 8,
            entries_before: 100,
            entries_after: 40,
            redundant_packets_filtered: 123,
            attempts: BTreeMap::from([
                (
                    0,
                    AttemptReport {
                        success: true,
                        entries: Some(40),
                        reason: None,
                    },
                ),
                (
                    4,
                    AttemptReport {
                        success: false,
                        entries: None,
                        reason: Some("minimized table still has 1100 entries".into()),
                    },
                ),
            ]),
            write_back_failures: vec![WriteBackFailure {
                processor_id: 1,
                master_pop_key: 0x1000,
                address: 0x6000_0008,
                error: "timeout".into(),
            }],
        }
    }

    #[test]
    fn test_serde_roundtrip() {
        let original = summary();
        let json = serde_json::to_string(&original).unwrap();
        let back: RouterSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(original, back);
    }

    #[test]
    fn test_percent_merged() {
        let s = summary();
        assert_eq!(s.percent_merged(), 25.0);
    }

    #[test]
    fn test_percent_merged_no_candidates() {
        let mut s = summary();
        s.n_merged = 0;
        s.n_candidates = 0;
        assert_eq!(s.percent_merged(), 100.0);
    }

    #[test]
    fn test_attempt_report_from_attempt() {
        let ok = AttemptReport::from(&Attempt::Success { entries: 7 });
        assert!(ok.success);
        assert_eq!(ok.entries, Some(7));
        assert_eq!(ok.reason, None);

        let bad = AttemptReport::from(&Attempt::Failure {
            reason: "rejected".into(),
        });
        assert!(!bad.success);
        assert_eq!(bad.reason.as_deref(), Some("rejected"));
    }
}
