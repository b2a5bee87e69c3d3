//! Packed flag/count word of a filter record.
//!
//! Device layout of the word (little-endian on the wire):
//!
//! ```text
//! bit 31      merged: 1     set once the filter is folded into the table
//! bit 30      all_ones: 1   filter keeps every item (filters nothing)
//! bits 0..29  n_atoms: 30   number of valid bits in the bit array
//! ```
//!
//! All reads and writes of the word go through this type so the write-back
//! path can never clobber the atom count or the `all_ones` bit.

/// Merged marker, bit 31.
pub const MERGED_BIT: u32 = 1 << 31;

/// All-ones marker, bit 30.
pub const ALL_ONES_BIT: u32 = 1 << 30;

/// Mask selecting the 30-bit atom count.
pub const N_ATOMS_MASK: u32 = 0x3FFF_FFFF;

/// Tagged view over the packed `merged:1; all_ones:1; n_atoms:30` word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagsWord(u32);

impl FlagsWord {
    pub const fn from_raw(word: u32) -> Self {
        Self(word)
    }

    /// Build a word with both flags clear.
    pub const fn from_n_atoms(n_atoms: u32) -> Self {
        Self(n_atoms & N_ATOMS_MASK)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn merged(self) -> bool {
        self.0 & MERGED_BIT != 0
    }

    pub const fn all_ones(self) -> bool {
        self.0 & ALL_ONES_BIT != 0
    }

    pub const fn n_atoms(self) -> u32 {
        self.0 & N_ATOMS_MASK
    }

    /// Copy of the word with the merged bit set and every other bit intact.
    pub const fn with_merged(self) -> Self {
        Self(self.0 | MERGED_BIT)
    }

    /// Copy of the word with the all-ones bit set and every other bit intact.
    pub const fn with_all_ones(self) -> Self {
        Self(self.0 | ALL_ONES_BIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_extraction() {
        let word = FlagsWord::from_raw(MERGED_BIT | ALL_ONES_BIT | 1234);
        assert!(word.merged());
        assert!(word.all_ones());
        assert_eq!(word.n_atoms(), 1234);
    }

    #[test]
    fn test_from_n_atoms_clears_flags() {
        let word = FlagsWord::from_n_atoms(0xFFFF_FFFF);
        assert!(!word.merged());
        assert!(!word.all_ones());
        assert_eq!(word.n_atoms(), N_ATOMS_MASK);
    }

    #[test]
    fn test_with_merged_preserves_other_bits() {
        let word = FlagsWord::from_n_atoms(777).with_all_ones();
        let marked = word.with_merged();
        assert!(marked.merged());
        assert!(marked.all_ones());
        assert_eq!(marked.n_atoms(), 777);
        assert_eq!(marked.raw(), word.raw() | MERGED_BIT);
    }

    #[test]
    fn test_with_merged_idempotent() {
        let word = FlagsWord::from_n_atoms(40).with_merged();
        assert_eq!(word.with_merged(), word);
    }

    #[test]
    fn test_max_atom_count() {
        let word = FlagsWord::from_raw(N_ATOMS_MASK);
        assert_eq!(word.n_atoms(), 0x3FFF_FFFF);
        assert!(!word.merged());
        assert!(!word.all_ones());
    }
}
