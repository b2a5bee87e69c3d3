//! Bit-field aware multicast routing table compressor.
//!
//! Many-core fabric chips carry a fixed-capacity multicast routing table.
//! Application cores attach per-destination bit-field filters (bitmaps
//! marking which addressed items they actually want) to cut traffic the
//! router would otherwise forward pointlessly. This crate takes one
//! router's uncompressed table plus the filters held by its cores and
//! produces the smallest table that fits the hardware capacity, folding in
//! as many filters as that capacity allows.
//!
//! The pipeline per router: [`filter::read_filters`] decodes the binary
//! filter regions from device memory, [`order::assign_sort_indices`] ranks
//! the records by merge priority, [`search::run_search`] binary-searches
//! how many of them fit (using [`expand::expand`] plus an external
//! [`minimize::Minimizer`] as the oracle), and [`finalize::mark_merged`]
//! writes merged markers back to the device. [`compressor::compress_router`]
//! ties it together; [`compressor::compress_routers`] runs a batch of
//! routers in parallel.

pub mod compressor;
pub mod error;
pub mod expand;
pub mod filter;
pub mod finalize;
pub mod minimize;
pub mod order;
pub mod report;
pub mod search;
pub mod table;
pub mod transport;

pub use compressor::{compress_router, compress_routers, RouterCompression, RouterJob};
pub use error::{CompressError, Result};
pub use expand::expand;
pub use filter::{read_filters, BitFieldRecord, FlagsWord};
pub use finalize::mark_merged;
pub use minimize::{MinimizeError, Minimizer};
pub use order::assign_sort_indices;
pub use report::{AttemptReport, RouterSummary, WriteBackFailure};
pub use search::{run_search, Attempt, SearchResult};
pub use table::{LinkSet, ProcessorSet, RoutingEntry, RoutingTable, MAX_TABLE_LENGTH};
pub use transport::{MemoryTransport, SparseMemory};
