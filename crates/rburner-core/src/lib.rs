//! rburner-core - device catalog, fuse map parsing and checksums
//!
//! This crate holds everything that does not touch the serial line: the
//! static GAL/PLD device catalog, the capacity-checked fuse bitmap, the
//! JEDEC fuse-map parser and the bit-serial fuse checksum shared with the
//! programmer firmware.

pub mod bitmap;
pub mod catalog;
pub mod checksum;
pub mod error;
pub mod jedec;

pub use bitmap::FuseBitmap;
pub use catalog::{GalInfo, GalType, GALINFO};
pub use checksum::fuse_checksum;
pub use error::{CoreError, Result};
pub use jedec::{parse_fuse_map, JedecFile};

/// Upper bound on the fuse count of any supported device.
///
/// The largest catalog entry (ATF750C) has 14499 fuses; the headroom covers
/// fuse maps that carry trailing control fuses past the published count.
pub const MAX_FUSES: usize = 30_000;
