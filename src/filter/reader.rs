//! Decoder for the on-device filter-region stream.
//!
//! Region layout, all words little-endian:
//!
//! ```text
//! offset 0   n_filters: u32
//! offset 4   n_filters records of 12 bytes each:
//!            +0  master_pop_key: u32
//!            +4  flags_and_atoms: u32   (merged:1; all_ones:1; n_atoms:30)
//!            +8  bit_array_pointer: u32
//! ```
//!
//! The bit array itself lives at `bit_array_pointer`: `ceil(n_atoms/32)`
//! words, bit 0 = LSB of word 0 = item 0, true = "forward this item".

use std::collections::BTreeMap;

use crate::error::{CompressError, Result};
use crate::filter::{BitFieldRecord, FlagsWord, BITS_PER_WORD};
use crate::transport::MemoryTransport;

/// Size of one filter info record.
const FILTER_INFO_SIZE: usize = 12;

/// Bytes per device word.
const BYTES_PER_WORD: usize = 4;

fn read_word<T: MemoryTransport + ?Sized>(
    transport: &T,
    x: u8,
    y: u8,
    address: u32,
) -> Result<u32> {
    let bytes = transport.read(x, y, address, BYTES_PER_WORD)?;
    if bytes.len() != BYTES_PER_WORD {
        return Err(CompressError::Decode {
            x,
            y,
            address,
            reason: format!("short read: {} of {} bytes", bytes.len(), BYTES_PER_WORD),
        });
    }
    Ok(u32::from_le_bytes(bytes[..4].try_into().unwrap()))
}

/// Read every eligible filter record on the router at `(x, y)`.
///
/// `filter_bases` maps core id to the base address of that core's filter
/// region; cores are visited in ascending id order, which fixes the
/// discovery order the priority orderer uses for tie-breaking.
///
/// Records already carrying the merged marker are skipped (their exclusions
/// are in the table from a previous run), as are all-ones records, which
/// keep every item and so can never remove traffic.
///
/// Any transport failure or malformed record fails the whole router read;
/// no partial record set is returned.
pub fn read_filters<T: MemoryTransport + ?Sized>(
    transport: &T,
    x: u8,
    y: u8,
    filter_bases: &BTreeMap<u8, u32>,
) -> Result<Vec<BitFieldRecord>> {
    let mut records = Vec::new();

    for (&processor_id, &base_address) in filter_bases {
        let n_filters = read_word(transport, x, y, base_address)?;

        let mut record_address = base_address + BYTES_PER_WORD as u32;
        for _ in 0..n_filters {
            let info = transport.read(x, y, record_address, FILTER_INFO_SIZE)?;
            if info.len() != FILTER_INFO_SIZE {
                return Err(CompressError::Decode {
                    x,
                    y,
                    address: record_address,
                    reason: format!("truncated filter info: {} bytes", info.len()),
                });
            }
            let master_pop_key = u32::from_le_bytes(info[0..4].try_into().unwrap());
            let flags = FlagsWord::from_raw(u32::from_le_bytes(info[4..8].try_into().unwrap()));
            let bit_array_pointer = u32::from_le_bytes(info[8..12].try_into().unwrap());
            let write_back_address = record_address + BYTES_PER_WORD as u32;
            record_address += FILTER_INFO_SIZE as u32;

            if flags.merged() || flags.all_ones() {
                continue;
            }

            let n_atoms = flags.n_atoms();
            if n_atoms > 0 && bit_array_pointer == 0 {
                return Err(CompressError::Decode {
                    x,
                    y,
                    address: write_back_address,
                    reason: format!(
                        "null bit array pointer for key {master_pop_key:#010x} \
                         ({n_atoms} atoms)"
                    ),
                });
            }

            let n_words = n_atoms.div_ceil(BITS_PER_WORD) as usize;
            let raw = transport.read(x, y, bit_array_pointer, n_words * BYTES_PER_WORD)?;
            if raw.len() != n_words * BYTES_PER_WORD {
                return Err(CompressError::Decode {
                    x,
                    y,
                    address: bit_array_pointer,
                    reason: format!(
                        "truncated bit array for key {master_pop_key:#010x}: \
                         {} of {} bytes",
                        raw.len(),
                        n_words * BYTES_PER_WORD
                    ),
                });
            }
            let bits: Vec<u32> = raw
                .chunks_exact(BYTES_PER_WORD)
                .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
                .collect();

            records.push(BitFieldRecord {
                processor_id,
                master_pop_key,
                flags,
                bits,
                write_back_address,
                sort_index: None,
            });
        }
    }

    Ok(records)
}
