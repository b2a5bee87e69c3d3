//! Merge-priority ordering of filter records.
//!
//! Records merged first should be the ones that buy the most: filters owned
//! by the most contended cores (many incoming connections) and filters that
//! suppress the most packets (high redundancy). The order produced here is a
//! greedy balance of the two, not an optimal assignment.

use std::collections::{BTreeMap, BTreeSet};

use crate::filter::BitFieldRecord;

/// Assign a dense merge-priority rank to every record; lower rank = merge
/// first. Returns the number of records ranked.
///
/// `core_loads` maps core id to the number of incoming connections
/// terminating at that core (the caller computes this from its placement
/// graph).
///
/// The order is built in two phases:
///
/// 1. Cores are walked from most to least loaded. At each step the load gap
///    to the next core is computed, and that many records are pulled to the
///    front, highest redundancy first, drawing from every core walked so
///    far. This levels the worst-off cores down to their neighbours before
///    any globally-ordered merging happens.
/// 2. Every remaining record is appended ordered by redundancy descending.
///
/// Ties are broken by discovery order (the order of `records`), and equal
/// loads by core id ascending, so the result is deterministic for identical
/// inputs.
pub fn assign_sort_indices(
    records: &mut [BitFieldRecord],
    core_loads: &BTreeMap<u8, u32>,
) -> u32 {
    // redundancy -> record indices, discovery order.
    let mut by_coverage: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    // core -> redundancy of each of its records.
    let mut per_core: BTreeMap<u8, Vec<u32>> = BTreeMap::new();
    for (idx, record) in records.iter().enumerate() {
        let redundancy = record.redundancy();
        by_coverage.entry(redundancy).or_default().push(idx);
        per_core
            .entry(record.processor_id)
            .or_default()
            .push(redundancy);
    }

    let mut cores: Vec<(u8, u32)> = core_loads.iter().map(|(&c, &l)| (c, l)).collect();
    cores.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut next_rank: u32 = 0;

    // Phase 1: level the most loaded cores down to their neighbours. The
    // eligible set accumulates, so later gaps may be covered by records
    // from any core already walked.
    let mut eligible: BTreeSet<u8> = BTreeSet::new();
    for window in cores.windows(2) {
        let (worst_core, worst_load) = window[0];
        let next_load = window[1].1;
        eligible.insert(worst_core);

        let gap = worst_load - next_load;
        if gap == 0 {
            continue;
        }

        let mut levels = per_core.get(&worst_core).cloned().unwrap_or_default();
        levels.sort_unstable_by(|a, b| b.cmp(a));
        levels.dedup();

        let mut covered: u32 = 0;
        'levels: for level in levels {
            let Some(bucket) = by_coverage.get(&level) else {
                continue;
            };
            for &idx in bucket {
                if covered >= gap {
                    break 'levels;
                }
                let record = &mut records[idx];
                if record.sort_index.is_none() && eligible.contains(&record.processor_id) {
                    record.sort_index = Some(next_rank);
                    next_rank += 1;
                    covered += 1;
                }
            }
        }
    }

    // Phase 2: leftovers by redundancy descending.
    for bucket in by_coverage.values().rev() {
        for &idx in bucket {
            if records[idx].sort_index.is_none() {
                records[idx].sort_index = Some(next_rank);
                next_rank += 1;
            }
        }
    }

    next_rank
}
