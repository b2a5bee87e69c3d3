//! Remote memory transport.
//!
//! The compressor reads filter regions from, and writes merged markers back
//! to, live device memory it does not own. Both operations go through
//! [`MemoryTransport`]; timeout and retry policy belong to the implementor,
//! not to this crate.

use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

/// Synchronous byte-range access to one chip's memory, addressed by chip
/// coordinate.
///
/// `Send + Sync` required so batch compression can share one transport
/// across rayon workers.
pub trait MemoryTransport: Send + Sync {
    /// Read `length` bytes starting at `address` on chip `(x, y)`.
    fn read(&self, x: u8, y: u8, address: u32, length: usize) -> io::Result<Vec<u8>>;

    /// Write `data` starting at `address` on chip `(x, y)`.
    fn write(&self, x: u8, y: u8, address: u32, data: &[u8]) -> io::Result<()>;
}

impl<T: MemoryTransport + ?Sized> MemoryTransport for &T {
    fn read(&self, x: u8, y: u8, address: u32, length: usize) -> io::Result<Vec<u8>> {
        (**self).read(x, y, address, length)
    }

    fn write(&self, x: u8, y: u8, address: u32, data: &[u8]) -> io::Result<()> {
        (**self).write(x, y, address, data)
    }
}

/// In-memory transport holding sparse per-chip byte maps.
///
/// Used by this crate's tests and usable as a simulation double. Reads of
/// bytes that were never written fail with `InvalidInput`, which stands in
/// for a malformed pointer on real hardware.
#[derive(Debug, Default)]
pub struct SparseMemory {
    chips: Mutex<HashMap<(u8, u8), HashMap<u32, u8>>>,
}

impl SparseMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load `data` at `address` on chip `(x, y)`.
    pub fn load(&self, x: u8, y: u8, address: u32, data: &[u8]) {
        let mut chips = self.chips.lock().unwrap();
        let mem = chips.entry((x, y)).or_default();
        for (i, &b) in data.iter().enumerate() {
            mem.insert(address + i as u32, b);
        }
    }

    /// Snapshot `length` bytes for assertions; `None` if any byte is unmapped.
    pub fn snapshot(&self, x: u8, y: u8, address: u32, length: usize) -> Option<Vec<u8>> {
        let chips = self.chips.lock().unwrap();
        let mem = chips.get(&(x, y))?;
        (0..length as u32)
            .map(|i| mem.get(&(address + i)).copied())
            .collect()
    }
}

impl MemoryTransport for SparseMemory {
    fn read(&self, x: u8, y: u8, address: u32, length: usize) -> io::Result<Vec<u8>> {
        let chips = self.chips.lock().unwrap();
        let mem = chips.get(&(x, y)).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("no chip at ({x},{y})"))
        })?;
        let mut out = Vec::with_capacity(length);
        for i in 0..length as u32 {
            let addr = address.checked_add(i).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "address overflow")
            })?;
            match mem.get(&addr) {
                Some(&b) => out.push(b),
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("unmapped address {addr:#010x} on ({x},{y})"),
                    ))
                }
            }
        }
        Ok(out)
    }

    fn write(&self, x: u8, y: u8, address: u32, data: &[u8]) -> io::Result<()> {
        let mut chips = self.chips.lock().unwrap();
        let mem = chips.entry((x, y)).or_default();
        for (i, &b) in data.iter().enumerate() {
            mem.insert(address + i as u32, b);
        }
        Ok(())
    }
}
