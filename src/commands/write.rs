//! Write and verify command implementation
//!
//! Both operations share the same shape: parse the fuse map, upload it to
//! the programmer, then issue `w` and/or `v`. The security fuse is set in
//! a separate session afterwards, once the main operation succeeded.

use std::path::Path;

use rburner_core::{parse_fuse_map, GalType};

use super::{configure_programmer, open_session, CmdResult, TransferBar};

#[allow(clippy::too_many_arguments)]
pub fn run(
    device: Option<&str>,
    gal: GalType,
    file: &Path,
    do_write: bool,
    do_verify: bool,
    secure: bool,
    pre_erase: bool,
    type_check: bool,
) -> CmdResult {
    configure_programmer(device, Some(gal), type_check)?;

    if pre_erase {
        let mut session = open_session(device)?;
        session.erase(gal, false)?;
    }

    log::debug!("opening file: {:?}", file);
    let bytes = std::fs::read(file)?;
    let text = String::from_utf8_lossy(&bytes);
    let jed = parse_fuse_map(&text, Some(gal))?;
    log::debug!(
        "parsed fuse map: QF={} QP={} checksum=0x{:04X}",
        jed.last_fuse,
        jed.pins,
        jed.checksum
    );

    let mut session = open_session(device)?;

    // Select the power-down fuse mode before the upload so the firmware
    // checksums the same fuse count the host does.
    let apd = jed.apd.unwrap_or(false);
    session.set_apd(apd)?;

    println!("Uploading fuse map...");
    let mut bar = TransferBar::new("upload");
    session.upload_fuse_map(gal, &jed.bitmap, jed.upload_fuse_count(gal), &mut bar)?;

    if do_write {
        session.write_fuses()?;
        log::info!("write OK");
    }
    if do_verify {
        session.verify_fuses()?;
        log::info!("verify OK");
    }
    drop(session);

    if jed.security && !secure {
        log::info!("fuse map requests the security fuse; pass --secure to set it");
    }
    if secure {
        let mut session = open_session(device)?;
        session.secure()?;
        log::info!("security fuse set");
    }
    Ok(())
}
