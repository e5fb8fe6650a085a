//! Erase command implementation

use rburner_core::GalType;

use super::{configure_programmer, open_session, CmdResult};

/// Erase the chip; with `all` the PES is wiped too.
pub fn run(device: Option<&str>, gal: GalType, all: bool, type_check: bool) -> CmdResult {
    configure_programmer(device, Some(gal), type_check)?;

    let mut session = open_session(device)?;
    session.erase(gal, all)?;
    log::info!("erase OK");
    Ok(())
}
