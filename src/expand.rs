//! Per-atom expansion of a routing table against a prefix of the ordered
//! filter records.
//!
//! Expansion turns one entry covering a whole key group into one entry per
//! addressed item, so the minimizer can drop or merge the items individual
//! cores have filtered out. Pure: re-run for every midpoint the search
//! probes.

use std::collections::BTreeMap;

use crate::filter::BitFieldRecord;
use crate::table::{ProcessorSet, RoutingEntry, RoutingTable};

/// Mask of an entry addressing exactly one item.
pub const ATOM_LEVEL_MASK: u32 = 0xFFFF_FFFF;

/// Expand `table` using every record ranked below `midpoint`.
///
/// Entries whose key no record carries are copied unchanged. For a covered
/// key, one entry per atom is emitted: `key + atom`, full mask, links
/// copied, not defaultable. A processor keeps an atom unless a record for
/// `(key, processor)` ranked below `midpoint` clears that atom's bit;
/// processors without such a record keep everything. Records for processors
/// absent from the original entry are ignored; when several eligible
/// records exist for one `(key, processor)`, the last in `records` order
/// wins.
///
/// At `midpoint` 0 no record is consulted and the result is observationally
/// equivalent to `table` (identical per-item forwarding decisions, split
/// per atom for covered keys).
pub fn expand(table: &RoutingTable, records: &[BitFieldRecord], midpoint: u32) -> RoutingTable {
    // key -> records for that key, in slice order.
    let mut by_key: BTreeMap<u32, Vec<&BitFieldRecord>> = BTreeMap::new();
    for record in records {
        by_key.entry(record.master_pop_key).or_default().push(record);
    }

    let mut expanded = RoutingTable::new(table.x, table.y);

    for entry in table.iter() {
        let Some(key_records) = by_key.get(&entry.key) else {
            expanded.push(entry.clone());
            continue;
        };

        let n_atoms = key_records
            .iter()
            .map(|r| r.n_atoms())
            .max()
            .unwrap_or(0);

        // processor -> deciding record below the midpoint, last one wins.
        let mut deciders: BTreeMap<u8, &BitFieldRecord> = BTreeMap::new();
        for record in key_records {
            if record.selected_below(midpoint) {
                deciders.insert(record.processor_id, record);
            }
        }

        for atom in 0..n_atoms {
            let processors: ProcessorSet = entry
                .processors
                .iter()
                .filter(|&p| deciders.get(&p).map_or(true, |r| r.bit(atom)))
                .collect();
            expanded.push(RoutingEntry::new(
                entry.key + atom,
                ATOM_LEVEL_MASK,
                processors,
                entry.links,
                false,
            ));
        }
    }

    expanded
}
