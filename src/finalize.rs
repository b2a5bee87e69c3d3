//! Merged-marker write-back.
//!
//! Once the best midpoint is decided, every record ranked below it has its
//! merged bit set on the device so the next run does not consider it again.
//! The batch is best-effort and non-transactional: the table decision has
//! already been made, and a record left unmarked is merely a candidate
//! again next time — a missed optimization, never a correctness problem.

use crate::filter::BitFieldRecord;
use crate::report::WriteBackFailure;
use crate::transport::MemoryTransport;

/// Set the merged marker on every record ranked below `best_midpoint`.
///
/// Each write replaces the record's flag/count word with a copy whose
/// merged bit is set; the atom count and all-ones bit are carried over
/// untouched. Failures are collected and returned, never propagated: one
/// record's failure must not abort the rest of the batch.
pub fn mark_merged<T: MemoryTransport + ?Sized>(
    transport: &T,
    x: u8,
    y: u8,
    records: &[BitFieldRecord],
    best_midpoint: u32,
) -> Vec<WriteBackFailure> {
    let mut failures = Vec::new();

    for record in records {
        if !record.selected_below(best_midpoint) {
            continue;
        }
        let word = record.flags.with_merged().raw();
        if let Err(e) = transport.write(x, y, record.write_back_address, &word.to_le_bytes()) {
            tracing::warn!(
                x,
                y,
                processor = record.processor_id,
                key = record.master_pop_key,
                address = record.write_back_address,
                error = %e,
                "merged marker write-back failed; filter stays a candidate"
            );
            failures.push(WriteBackFailure {
                processor_id: record.processor_id,
                master_pop_key: record.master_pop_key,
                address: record.write_back_address,
                error: e.to_string(),
            });
        }
    }

    failures
}
