//! PES write command implementation

use rburner_core::GalType;

use super::{configure_programmer, open_session, CmdResult};

/// Write a new Programmer Electronic Signature.
pub fn run(device: Option<&str>, gal: GalType, pes: &str, type_check: bool) -> CmdResult {
    configure_programmer(device, Some(gal), type_check)?;

    let mut session = open_session(device)?;
    session.write_pes(gal, pes)?;
    log::info!("PES written");
    Ok(())
}
