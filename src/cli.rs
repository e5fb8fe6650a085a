//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate help text listing the catalog names
fn gal_type_help() -> String {
    format!(
        "GAL type [available: {}]",
        rburner_core::GalType::names().collect::<Vec<_>>().join(" ")
    )
}

/// Parse a calibration offset in hundredths of a volt
fn parse_cal_offset(s: &str) -> Result<i16, String> {
    let offset: i16 = s
        .parse()
        .map_err(|e| format!("invalid calibration offset: {}", e))?;
    if !(-32..=32).contains(&offset) {
        return Err("calibration offset out of range (-32..32 inclusive)".to_string());
    }
    Ok(offset)
}

/// Parse a PES string: 8 hex bytes with single-character delimiters,
/// e.g. `00:03:3A:A1:00:00:00:90`
fn parse_pes(s: &str) -> Result<String, String> {
    let bytes: Vec<&str> = s.split(|c: char| !c.is_ascii_hexdigit()).collect();
    if s.len() != 23
        || bytes.len() != 8
        || !bytes
            .iter()
            .all(|b| b.len() == 2 && b.chars().all(|c| c.is_ascii_hexdigit()))
    {
        return Err(format!(
            "invalid PES '{}': expected 8 hex bytes with a delimiter, e.g. 00:03:3A:A1:00:00:00:90",
            s
        ));
    }
    Ok(s.to_string())
}

#[derive(Parser)]
#[command(name = "rburner")]
#[command(author, version, about = "GAL chip programmer for Arduino based hardware", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Serial device name (guessed when omitted; parameters are 57600 8N1)
    #[arg(short, long, global = true)]
    pub device: Option<String>,

    /// Do not let the firmware check the GAL type before operating
    #[arg(long, global = true)]
    pub no_type_check: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read device info and programming voltage
    Info {
        /// GAL type
        #[arg(short = 't', long = "type", help = gal_type_help())]
        gal: String,
    },

    /// Read the fuse map from the chip and display it
    Read {
        /// GAL type
        #[arg(short = 't', long = "type", help = gal_type_help())]
        gal: String,
    },

    /// Write a fuse map to the chip
    Write {
        /// GAL type
        #[arg(short = 't', long = "type", help = gal_type_help())]
        gal: String,

        /// JEDEC fuse map file (XSVF stream for JTAG parts)
        #[arg(short, long)]
        file: PathBuf,

        /// Verify the fuse map after writing
        #[arg(long)]
        verify: bool,

        /// Set the security fuse after a successful write
        #[arg(long)]
        secure: bool,

        /// Erase the chip before writing
        #[arg(long)]
        erase: bool,
    },

    /// Verify the chip against a fuse map without writing
    Verify {
        /// GAL type
        #[arg(short = 't', long = "type", help = gal_type_help())]
        gal: String,

        /// JEDEC fuse map file
        #[arg(short, long)]
        file: PathBuf,

        /// Set the security fuse after a successful verify
        #[arg(long)]
        secure: bool,
    },

    /// Erase the GAL chip
    Erase {
        /// GAL type
        #[arg(short = 't', long = "type", help = gal_type_help())]
        gal: String,

        /// Erase everything including the PES
        #[arg(long)]
        all: bool,
    },

    /// Write a new Programmer Electronic Signature
    ///
    /// The GAL must have been erased with `erase --all` first. Does not
    /// work with Atmel chips.
    WritePes {
        /// GAL type
        #[arg(short = 't', long = "type", help = gal_type_help())]
        gal: String,

        /// New PES as 8 hex bytes with a delimiter, e.g. 00:03:3A:A1:00:00:00:90
        #[arg(long, value_parser = parse_pes)]
        pes: String,
    },

    /// Programming voltage utilities (ensure the GAL is NOT inserted)
    #[command(subcommand)]
    Vpp(VppCommands),
}

#[derive(Subcommand)]
pub enum VppCommands {
    /// Switch VPP on for ~20 seconds to check the programming voltage
    Test,

    /// Calibrate variable VPP on new board designs
    Calibrate {
        /// Calibration offset in hundredths of a volt (-32..32)
        #[arg(long, value_parser = parse_cal_offset, default_value = "0", allow_hyphen_values = true)]
        offset: i16,
    },

    /// Measure variable VPP
    Measure,
}
