//! Error types for the compressor

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompressError>;

#[derive(Error, Debug)]
pub enum CompressError {
    #[error("Transport I/O error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Malformed filter region on chip ({x},{y}) at {address:#010x}: {reason}")]
    Decode {
        x: u8,
        y: u8,
        address: u32,
        reason: String,
    },

    #[error(
        "Table on chip ({x},{y}) cannot compress to {target_length} entries even with \
         no bit-fields merged ({entries_before} entries uncompressed); the target \
         length is unreasonable for this router"
    )]
    InfeasibleAtZero {
        x: u8,
        y: u8,
        entries_before: usize,
        target_length: usize,
    },
}

impl CompressError {
    /// True when the error indicates a configuration problem rather than a
    /// device or transport fault.
    pub fn is_configuration(&self) -> bool {
        matches!(self, CompressError::InfeasibleAtZero { .. })
    }
}
