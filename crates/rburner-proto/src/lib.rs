//! rburner-proto - serial protocol driver for Afterburner-class programmers
//!
//! Implements the host side of the programmer's line protocol: the
//! prompt-terminated request/response session, the command vocabulary
//! (erase, upload, write, verify, PES, VPP utilities) and the device-paced
//! XSVF feed protocol used for JTAG parts.

pub mod commands;
pub mod error;
pub mod session;
pub mod transport;
pub mod xsvf;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{ProtoError, Result};
pub use session::{Capabilities, Session};
pub use transport::{guess_port, SerialTransport, Transport};
pub use xsvf::play_xsvf;

/// Progress sink for long-running transfers.
///
/// The CLI hangs an indicatif bar off this; the protocol code never talks
/// to a terminal directly.
pub trait Progress {
    /// `current` units out of `total` are done.
    fn update(&mut self, current: usize, total: usize);
}

/// No-op progress sink.
impl Progress for () {
    fn update(&mut self, _current: usize, _total: usize) {}
}
