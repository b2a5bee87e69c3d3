//! Per-router compression orchestration.
//!
//! One router's table and its bit-field records are one atomic unit of
//! work: read the filters, order them, search for the largest mergeable
//! prefix, adopt the winning table, mark the merged filters on the device,
//! and summarize. Different routers are independent; [`compress_routers`]
//! fans them out across a rayon pool.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::error::Result;
use crate::filter::read_filters;
use crate::finalize::mark_merged;
use crate::minimize::Minimizer;
use crate::order::assign_sort_indices;
use crate::report::{attempts_report, RouterSummary};
use crate::search::run_search;
use crate::table::RoutingTable;
use crate::transport::MemoryTransport;

/// Everything the caller supplies for one router.
///
/// `filter_bases` and `core_loads` carry the results of the caller's
/// placement lookups: the filter-region base address of each core that owns
/// one, and the number of incoming connections terminating at each core.
#[derive(Debug, Clone)]
pub struct RouterJob<'a> {
    /// The router's uncompressed table.
    pub table: &'a RoutingTable,
    /// Core id -> filter region base address.
    pub filter_bases: BTreeMap<u8, u32>,
    /// Core id -> incoming connection count.
    pub core_loads: BTreeMap<u8, u32>,
    /// Hardware capacity to compress under.
    pub target_length: usize,
}

/// Outcome of one router's compression run.
#[derive(Debug, Clone)]
pub struct RouterCompression {
    /// The adopted compressed table.
    pub table: RoutingTable,
    pub summary: RouterSummary,
}

/// Compress one router's table, merging as many bit-field filters as the
/// capacity allows.
///
/// Records are read fresh from the device every invocation — device state
/// may have changed since the last run — and dropped when the run ends;
/// the only state that persists is the merged marker written back for each
/// folded-in record.
pub fn compress_router<T, M>(
    transport: &T,
    minimizer: &M,
    job: &RouterJob<'_>,
) -> Result<RouterCompression>
where
    T: MemoryTransport + ?Sized,
    M: Minimizer + ?Sized,
{
    let table = job.table;
    let (x, y) = (table.x, table.y);

    let mut records = read_filters(transport, x, y, &job.filter_bases)?;
    let n_candidates = assign_sort_indices(&mut records, &job.core_loads);

    let search = run_search(table, &records, minimizer, job.target_length)?;

    let write_back_failures = mark_merged(transport, x, y, &records, search.best_midpoint);

    let merged = records
        .iter()
        .filter(|r| r.selected_below(search.best_midpoint));
    let n_merged = merged.clone().count() as u32;
    let redundant_packets_filtered = merged.map(|r| u64::from(r.redundancy())).sum();

    let summary = RouterSummary {
        x,
        y,
        n_merged,
        n_candidates,
        entries_before: table.len(),
        entries_after: search.best_table.len(),
        redundant_packets_filtered,
        attempts: attempts_report(&search),
        write_back_failures,
    };

    tracing::info!(
        x,
        y,
        n_merged,
        n_candidates,
        entries_before = summary.entries_before,
        entries_after = summary.entries_after,
        "router table compressed"
    );

    Ok(RouterCompression {
        table: search.best_table,
        summary,
    })
}

/// Compress many routers in parallel.
///
/// Routers share nothing but the transport, so they run on a rayon pool.
/// Results come back in job order; a fatal error on one router never
/// aborts the others.
pub fn compress_routers<T, M>(
    transport: &T,
    minimizer: &M,
    jobs: &[RouterJob<'_>],
) -> Vec<Result<RouterCompression>>
where
    T: MemoryTransport + ?Sized,
    M: Minimizer + ?Sized,
{
    jobs.par_iter()
        .map(|job| compress_router(transport, minimizer, job))
        .collect()
}
