//! rburner - a GAL chip programmer for Arduino based hardware
//!
//! The host side of the Afterburner serial protocol: parses JEDEC fuse
//! maps, uploads them to the programmer and drives the chip operations
//! (read, write, verify, erase, PES, VPP utilities). JTAG parts (ATF150x)
//! are handled by streaming an XSVF file through the firmware's player.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, VppCommands};
use rburner_core::GalType;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Map -v / -vv onto the default log filter
    let default_filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let device = cli.device.as_deref();
    let type_check = !cli.no_type_check;

    match cli.command {
        Commands::Info { gal } => {
            let gal = lookup_gal(&gal)?;
            if gal.is_jtag() {
                commands::jtag::run_info(device, gal)
            } else {
                commands::info::run(device, gal, type_check)
            }
        }
        Commands::Read { gal } => {
            let gal = lookup_gal(&gal)?;
            if gal.is_jtag() {
                Err("read is not supported for JTAG parts".into())
            } else {
                commands::read::run(device, gal, type_check)
            }
        }
        Commands::Write {
            gal,
            file,
            verify,
            secure,
            erase,
        } => {
            let gal = lookup_gal(&gal)?;
            if gal.is_jtag() {
                if erase {
                    commands::jtag::run_erase(device, gal)?;
                }
                commands::jtag::run_write(device, &file)
            } else {
                commands::write::run(
                    device, gal, &file, true, verify, secure, erase, type_check,
                )
            }
        }
        Commands::Verify { gal, file, secure } => {
            let gal = lookup_gal(&gal)?;
            if gal.is_jtag() {
                Err("verify is not supported for JTAG parts".into())
            } else {
                commands::write::run(
                    device, gal, &file, false, true, secure, false, type_check,
                )
            }
        }
        Commands::Erase { gal, all } => {
            let gal = lookup_gal(&gal)?;
            if gal.is_jtag() {
                commands::jtag::run_erase(device, gal)
            } else {
                commands::erase::run(device, gal, all, type_check)
            }
        }
        Commands::WritePes { gal, pes } => {
            let gal = lookup_gal(&gal)?;
            if gal.is_jtag() {
                Err("PES write is not supported for JTAG parts".into())
            } else {
                commands::pes::run(device, gal, &pes, type_check)
            }
        }
        Commands::Vpp(sub) => match sub {
            VppCommands::Test => commands::vpp::run_test(device),
            VppCommands::Calibrate { offset } => commands::vpp::run_calibrate(device, offset),
            VppCommands::Measure => commands::vpp::run_measure(device),
        },
    }
}

fn lookup_gal(name: &str) -> Result<GalType, Box<dyn std::error::Error>> {
    GalType::from_name(name).ok_or_else(|| {
        format!(
            "unknown GAL type '{}'. Types: {}",
            name,
            GalType::names().collect::<Vec<_>>().join(" ")
        )
        .into()
    })
}
