//! Programmer command vocabulary
//!
//! One method per firmware command, all built on [`Session::command`].
//! Timeouts are operation-specific: control commands answer within a few
//! seconds, the VPP scans take tens of seconds.

use rburner_core::{fuse_checksum, FuseBitmap, GalType};

use crate::error::{ProtoError, Result};
use crate::session::Session;
use crate::transport::Transport;
use crate::Progress;

/// Fuses per upload line
const FUSES_PER_LINE: usize = 32;

impl<T: Transport> Session<T> {
    /// Enable or disable the firmware's own device-type verification
    /// (`f` / `F`).
    pub fn set_type_check(&mut self, enabled: bool) -> Result<()> {
        self.command(if enabled { "f\r" } else { "F\r" }, 4000)?;
        Ok(())
    }

    /// Select the device type the firmware should operate on (`g`).
    pub fn select_type(&mut self, gal: GalType) -> Result<()> {
        log::debug!("selecting type {}", gal.info().name);
        self.command(&format!("g{}\r", gal.code()), 4000)?;
        Ok(())
    }

    /// Select the auto-power-down fuse mode (`z` / `Z`).
    ///
    /// Must happen before the upload so the firmware checksums the same
    /// fuse count the host does.
    pub fn set_apd(&mut self, enabled: bool) -> Result<()> {
        self.command(if enabled { "z\r" } else { "Z\r" }, 4000)?;
        Ok(())
    }

    /// Erase the chip (`c`), or everything including the PES (`~`).
    pub fn erase(&mut self, gal: GalType, all: bool) -> Result<()> {
        self.select_type_via_upload_mode(gal, 300)?;
        self.command(if all { "~\r" } else { "c\r" }, 4000)?;
        Ok(())
    }

    /// Read device info and programming voltage (`p`).
    pub fn read_info(&mut self) -> Result<String> {
        self.command("p\r", 4000)
    }

    /// Read the fuse map off the chip (`r`) and return it as text.
    pub fn read_fuses(&mut self, gal: GalType) -> Result<String> {
        self.select_type_via_upload_mode(gal, 100)?;
        let response = self.send_command("r\r", 12_000)?;
        // The dump itself is the response; an error is its first line.
        if response.starts_with("ER") {
            return Err(ProtoError::Device(response));
        }
        Ok(response)
    }

    /// Burn the uploaded fuse map into the chip (`w`).
    pub fn write_fuses(&mut self) -> Result<()> {
        self.command("w\r", 8000)?;
        Ok(())
    }

    /// Verify the chip against the uploaded fuse map (`v`).
    pub fn verify_fuses(&mut self) -> Result<()> {
        self.command("v\r", 8000)?;
        Ok(())
    }

    /// Set the security fuse, protecting the chip (`s`).
    pub fn secure(&mut self) -> Result<()> {
        self.command("s\r", 4000)?;
        Ok(())
    }

    /// Write a new Programmer Electronic Signature (`#p` + `P`).
    ///
    /// `pes` is the raw 8-hex-byte string as typed by the user; the
    /// firmware parses it itself.
    pub fn write_pes(&mut self, gal: GalType, pes: &str) -> Result<()> {
        self.send_command("u\r", 300)?;
        self.send_command(&format!("#t {}\r", gal.code()), 300)?;
        self.send_command(&format!("#p {}\r", pes), 300)?;
        self.send_command("#e\r", 100)?;
        self.command("P\r", 4000)?;
        Ok(())
    }

    /// Switch VPP on for about 20 seconds so the user can check or adjust
    /// the programming voltage (`t`).
    pub fn test_vpp(&mut self) -> Result<String> {
        self.with_echo(|session| session.command("t\r", 22_000))
    }

    /// Store a calibration offset and run the VPP calibration scan
    /// (`B` + `b`).
    ///
    /// `offset` is in hundredths of a volt, −32..=32, encoded as a single
    /// ASCII character on the wire.
    pub fn calibrate_vpp(&mut self, offset: i16) -> Result<String> {
        let value = (b'0' + (offset + 32) as u8) as char;
        log::debug!("sending calibration offset command B{}", value);
        self.command(&format!("B{}\r", value), 4000)?;
        self.with_echo(|session| session.command("b\r", 34_000))
    }

    /// Measure the variable VPP voltages (`m`).
    pub fn measure_vpp(&mut self) -> Result<String> {
        self.with_echo(|session| session.command("m\r", 40_000))
    }

    /// Upload a fuse map (`u`, `#t`, `#f` lines, `#c`, `#e`).
    ///
    /// Fuses go out in 32-fuse lines, 8 fuses per hex byte LSB-first.
    /// All-zero lines are skipped; the firmware starts from a cleared
    /// buffer. The checksum trailer covers `total` fuses, which includes
    /// the APD fuse when the parsed file carried one.
    pub fn upload_fuse_map(
        &mut self,
        gal: GalType,
        bitmap: &FuseBitmap,
        total: usize,
        progress: &mut dyn Progress,
    ) -> Result<()> {
        let info = gal.info();

        self.send_command("u\r", 20)?;
        self.send_command(&format!("#t {} {}\r", gal.code(), info.name), 300)?;

        let mut i = 0;
        while i < total {
            let mut line = format!("#f {:04} ", i);
            let mut any_set = false;
            let line_end = (i + FUSES_PER_LINE).min(total);
            while i < line_end {
                let mut byte = 0u8;
                for j in 0..8 {
                    if i >= line_end {
                        break;
                    }
                    if bitmap.get(i) {
                        byte |= 1 << j;
                        any_set = true;
                    }
                    i += 1;
                }
                line.push_str(&format!("{:02X}", byte));
            }
            if any_set {
                line.push('\r');
                self.send_command(&line, 100)?;
            }
            progress.update(i, total);
        }

        let csum = fuse_checksum(bitmap, total);
        log::debug!("sending checksum {:04X}", csum);
        self.send_command(&format!("#c {:04X}\r", csum), 300)?;

        self.command("#e\r", 300)?;
        Ok(())
    }

    /// Enter upload mode just to tell the firmware the device type, then
    /// leave again. The erase, read and PES paths all need this preamble.
    fn select_type_via_upload_mode(&mut self, gal: GalType, timeout_ms: u32) -> Result<()> {
        self.send_command("u\r", timeout_ms)?;
        self.send_command(&format!("#t {}\r", gal.code()), timeout_ms)?;
        // Wait a little longer here so leftover output is discarded.
        self.send_command("#e\r", 1000)?;
        Ok(())
    }

    fn with_echo<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        self.echo = true;
        let result = f(self);
        self.echo = false;
        result
    }
}
