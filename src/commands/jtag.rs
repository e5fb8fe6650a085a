//! JTAG (XSVF) operation flows for the ATF150x parts
//!
//! These parts are not programmed row by row; the firmware replays an
//! XSVF boundary-scan stream fed to it over the wire. Info and erase use
//! conventionally named stream files next to the binary, write uses the
//! user's file.

use std::path::Path;

use rburner_core::GalType;
use rburner_proto::play_xsvf;

use super::{open_session, CmdResult, TransferBar};

/// Play the identification stream (high VPP, no progress bar).
pub fn run_info(device: Option<&str>, _gal: GalType) -> CmdResult {
    let data = std::fs::read("xsvf/id_ATF150X.xsvf")?;
    let mut session = open_session(device)?;
    play_xsvf(&mut session, &data, true, &mut ())?;
    Ok(())
}

/// Play the erase stream for this part (high VPP).
pub fn run_erase(device: Option<&str>, gal: GalType) -> CmdResult {
    let path = format!("xsvf/erase_{}.xsvf", gal.info().name);
    let data = std::fs::read(&path)?;
    let mut session = open_session(device)?;
    let mut bar = TransferBar::new("erase");
    play_xsvf(&mut session, &data, true, &mut bar)?;
    Ok(())
}

/// Play the user's XSVF file (low VPP).
pub fn run_write(device: Option<&str>, file: &Path) -> CmdResult {
    let data = std::fs::read(file)?;
    let mut session = open_session(device)?;
    let mut bar = TransferBar::new("write");
    play_xsvf(&mut session, &data, false, &mut bar)?;
    Ok(())
}
