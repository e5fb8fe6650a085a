//! Info command implementation

use rburner_core::GalType;

use super::{configure_programmer, open_session, CmdResult};

/// Read and print device info and the programming voltage.
pub fn run(device: Option<&str>, gal: GalType, type_check: bool) -> CmdResult {
    configure_programmer(device, Some(gal), type_check)?;

    let mut session = open_session(device)?;
    let info = session.read_info()?;
    println!("{}", info);
    Ok(())
}
