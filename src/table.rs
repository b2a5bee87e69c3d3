//! Multicast routing table model.
//!
//! A router forwards a multicast packet according to the first entry whose
//! `(key, mask)` matches the packet key. Each entry names the processors and
//! inter-chip links the packet is copied to. Hardware tables have a hard
//! capacity limit; everything in this crate exists to get under it.

use std::collections::HashSet;

/// Hardware routing table capacity usable by application tables.
pub const MAX_TABLE_LENGTH: usize = 1023;

// ── Destination sets ───────────────────────────────────────────────

/// Set of processor ids (0..=31) as a one-word bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ProcessorSet(u32);

impl ProcessorSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, processor: u8) {
        debug_assert!(processor < 32, "processor id out of range");
        self.0 |= 1 << processor;
    }

    pub fn remove(&mut self, processor: u8) {
        self.0 &= !(1u32 << processor);
    }

    pub fn contains(&self, processor: u8) -> bool {
        processor < 32 && self.0 & (1 << processor) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Processor ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        let bits = self.0;
        (0u8..32).filter(move |p| bits & (1 << p) != 0)
    }
}

impl FromIterator<u8> for ProcessorSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = Self::empty();
        for p in iter {
            set.insert(p);
        }
        set
    }
}

/// Set of link ids (0..=7) as a one-byte bitmask. Fabric chips populate
/// links 0..=5; ids 6 and 7 are representable but unused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LinkSet(u8);

impl LinkSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, link: u8) {
        debug_assert!(link < 8, "link id out of range");
        self.0 |= 1 << link;
    }

    pub fn contains(&self, link: u8) -> bool {
        link < 8 && self.0 & (1 << link) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        let bits = self.0;
        (0u8..8).filter(move |l| bits & (1 << l) != 0)
    }
}

impl FromIterator<u8> for LinkSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = Self::empty();
        for l in iter {
            set.insert(l);
        }
        set
    }
}

// ── Entries and tables ─────────────────────────────────────────────

/// One forwarding rule. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingEntry {
    pub key: u32,
    pub mask: u32,
    pub processors: ProcessorSet,
    pub links: LinkSet,
    pub defaultable: bool,
}

impl RoutingEntry {
    pub fn new(
        key: u32,
        mask: u32,
        processors: ProcessorSet,
        links: LinkSet,
        defaultable: bool,
    ) -> Self {
        Self {
            key,
            mask,
            processors,
            links,
            defaultable,
        }
    }

    /// True when `packet_key` matches this entry.
    pub fn matches(&self, packet_key: u32) -> bool {
        packet_key & self.mask == self.key
    }
}

/// Ordered sequence of entries belonging to the router at `(x, y)`.
///
/// Entries within one table must have mutually distinct `(key, mask)` pairs;
/// `has_distinct_keys` checks the invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    pub x: u8,
    pub y: u8,
    entries: Vec<RoutingEntry>,
}

impl RoutingTable {
    pub fn new(x: u8, y: u8) -> Self {
        Self {
            x,
            y,
            entries: Vec::new(),
        }
    }

    pub fn with_entries(x: u8, y: u8, entries: Vec<RoutingEntry>) -> Self {
        Self { x, y, entries }
    }

    pub fn push(&mut self, entry: RoutingEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RoutingEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RoutingEntry> {
        self.entries.iter()
    }

    /// Check the distinct `(key, mask)` invariant.
    pub fn has_distinct_keys(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.entries.len());
        self.entries.iter().all(|e| seen.insert((e.key, e.mask)))
    }

    /// First entry matching `packet_key`, in table order.
    pub fn lookup(&self, packet_key: u32) -> Option<&RoutingEntry> {
        self.entries.iter().find(|e| e.matches(packet_key))
    }
}
