//! External table minimizer interface.
//!
//! The minimizer collapses a routing table into a shorter equivalent one.
//! This crate treats it as a black box: the only contract is that it is
//! deterministic for a given input and that failure means "cannot reach
//! `target_length`", never silently dropped forwarding semantics.

use thiserror::Error;

use crate::table::RoutingTable;

/// Why a minimization attempt did not produce a usable table. Both variants
/// are feasibility outcomes for one search probe, not faults.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MinimizeError {
    #[error("minimized table still has {achieved} entries")]
    TooLarge { achieved: usize },

    #[error("table rejected: {0}")]
    Rejected(String),
}

/// Black-box routing table minimizer.
pub trait Minimizer: Send + Sync {
    /// Compress `table` to at most `target_length` entries.
    fn compress(
        &self,
        table: &RoutingTable,
        target_length: usize,
    ) -> Result<RoutingTable, MinimizeError>;
}

impl<F> Minimizer for F
where
    F: Fn(&RoutingTable, usize) -> Result<RoutingTable, MinimizeError> + Send + Sync,
{
    fn compress(
        &self,
        table: &RoutingTable,
        target_length: usize,
    ) -> Result<RoutingTable, MinimizeError> {
        self(table, target_length)
    }
}
