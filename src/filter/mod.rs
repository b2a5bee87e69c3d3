//! Bit-field filter records and their on-device binary format.
//!
//! A core attaches one bit-field filter per multicast key group it receives
//! from. Each bit marks one addressed item: true = "wanted, keep", false =
//! "would be dropped on arrival". The compressor folds the false bits into
//! the routing table so the router stops forwarding those packets at all.

pub mod reader;
pub mod word;

pub use reader::read_filters;
pub use word::{FlagsWord, ALL_ONES_BIT, MERGED_BIT, N_ATOMS_MASK};

/// Bits per packed bitmap word.
pub const BITS_PER_WORD: u32 = 32;

/// One filter attached by one core, decoded from device memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitFieldRecord {
    /// Owning core on the router's chip.
    pub processor_id: u8,
    /// The multicast key group this filter restricts.
    pub master_pop_key: u32,
    /// Packed flag/count word as read from the device.
    pub flags: FlagsWord,
    /// Packed bitmap, bit 0 = LSB of word 0 = item 0.
    pub bits: Vec<u32>,
    /// Device address of the flag/count word, for the merged marker.
    pub write_back_address: u32,
    /// Dense merge-priority rank, lower = merge first. `None` until the
    /// orderer has run.
    pub sort_index: Option<u32>,
}

impl BitFieldRecord {
    /// Number of valid bits in the bitmap.
    pub fn n_atoms(&self) -> u32 {
        self.flags.n_atoms()
    }

    /// Whether the filter keeps item `atom`. Atoms at or beyond `n_atoms`
    /// read as kept.
    pub fn bit(&self, atom: u32) -> bool {
        if atom >= self.n_atoms() {
            return true;
        }
        let word = (atom / BITS_PER_WORD) as usize;
        let bit = atom % BITS_PER_WORD;
        self.bits[word] >> bit & 1 != 0
    }

    /// Count of wanted items (set bits within `n_atoms`).
    pub fn wanted(&self) -> u32 {
        let n_atoms = self.n_atoms();
        let full_words = (n_atoms / BITS_PER_WORD) as usize;
        let mut count: u32 = self.bits[..full_words].iter().map(|w| w.count_ones()).sum();
        let tail = n_atoms % BITS_PER_WORD;
        if tail != 0 {
            let mask = (1u32 << tail) - 1;
            count += (self.bits[full_words] & mask).count_ones();
        }
        count
    }

    /// Count of items this filter would suppress: `n_atoms - wanted`.
    ///
    /// The filtering benefit of merging this record; drives the priority
    /// order.
    pub fn redundancy(&self) -> u32 {
        self.n_atoms() - self.wanted()
    }

    /// True once the orderer has ranked this record below `midpoint`.
    pub fn selected_below(&self, midpoint: u32) -> bool {
        matches!(self.sort_index, Some(rank) if rank < midpoint)
    }
}
