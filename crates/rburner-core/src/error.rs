//! Error types for rburner-core

use thiserror::Error;

/// Errors produced while parsing fuse-map files
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Invalid character in the fuse-map text
    #[error("invalid character {found:?} in fuse map at offset {offset}")]
    Parse {
        /// Byte offset of the offending character
        offset: usize,
        /// The character that broke the grammar
        found: char,
    },

    /// A fuse address past the end of the bitmap
    #[error("fuse address {address} exceeds bitmap capacity {capacity}")]
    FuseOverflow {
        /// Address of the rejected write
        address: usize,
        /// Capacity of the target bitmap
        capacity: usize,
    },

    /// Device type name not present in the catalog
    #[error("unknown GAL type: {0}")]
    UnknownDevice(String),
}

/// Result type for rburner-core operations
pub type Result<T> = core::result::Result<T, CoreError>;
