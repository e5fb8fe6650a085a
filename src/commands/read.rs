//! Read command implementation

use rburner_core::GalType;

use super::{configure_programmer, open_session, CmdResult};

/// Read the fuse map off the chip and print it.
pub fn run(device: Option<&str>, gal: GalType, type_check: bool) -> CmdResult {
    configure_programmer(device, Some(gal), type_check)?;

    let mut session = open_session(device)?;
    let fuse_map = session.read_fuses(gal)?;
    println!("{}", fuse_map);
    Ok(())
}
