//! VPP utility commands
//!
//! These run with no GAL inserted. The device streams its voltage
//! measurements while the command runs; the session echoes them live.

use super::{open_session, CmdResult};

/// Switch VPP on for ~20 seconds so the voltage can be checked or set.
pub fn run_test(device: Option<&str>) -> CmdResult {
    let mut session = open_session(device)?;
    if session.has_var_vpp() {
        println!("Turn the Pot on the MT3608 module to set the VPP to 16.5V (+/- 0.05V)");
    } else {
        println!("Turn the Pot on the MT3608 module to check / set the VPP");
    }
    session.test_vpp()?;
    Ok(())
}

/// Calibrate variable VPP with the given offset (hundredths of a volt).
pub fn run_calibrate(device: Option<&str>, offset: i16) -> CmdResult {
    let mut session = open_session(device)?;
    if !session.has_var_vpp() {
        return Err("this board does not support variable VPP".into());
    }
    println!("VPP voltages are scanned - this might take a while...");
    session.calibrate_vpp(offset)?;
    Ok(())
}

/// Measure the variable VPP voltages.
pub fn run_measure(device: Option<&str>) -> CmdResult {
    let mut session = open_session(device)?;
    if !session.has_var_vpp() {
        return Err("this board does not support variable VPP".into());
    }
    session.measure_vpp()?;
    Ok(())
}
