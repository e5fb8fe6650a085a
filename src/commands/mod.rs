//! Command implementations

pub mod erase;
pub mod info;
pub mod jtag;
pub mod pes;
pub mod read;
pub mod vpp;
pub mod write;

use indicatif::{ProgressBar, ProgressStyle};
use rburner_core::GalType;
use rburner_proto::{guess_port, Progress, SerialTransport, Session};

/// Result type shared by all command entry points
pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Open the serial device and run the identify handshake.
///
/// Without an explicit name the first USB serial port is used.
pub fn open_session(device: Option<&str>) -> Result<Session<SerialTransport>, Box<dyn std::error::Error>> {
    let name = match device {
        Some(name) => name.to_string(),
        None => guess_port().ok_or("no serial device found; use --device to name one")?,
    };
    log::debug!("opening serial: {}", name);
    let transport = SerialTransport::open(&name)?;
    Ok(Session::open(transport)?)
}

/// Configure the programmer before an operation.
///
/// The firmware keeps the type-check flag and the selected device type
/// across connections, so both are set up front, each over its own
/// session, before the operation opens the session it will work in.
pub fn configure_programmer(
    device: Option<&str>,
    gal: Option<GalType>,
    type_check: bool,
) -> CmdResult {
    let mut session = open_session(device)?;
    session.set_type_check(type_check)?;
    drop(session);

    if let Some(gal) = gal {
        let mut session = open_session(device)?;
        session.select_type(gal)?;
    }
    Ok(())
}

/// indicatif adapter for the protocol crate's transfer progress
pub struct TransferBar {
    bar: Option<ProgressBar>,
    label: &'static str,
}

impl TransferBar {
    pub fn new(label: &'static str) -> Self {
        Self { bar: None, label }
    }
}

impl Progress for TransferBar {
    fn update(&mut self, current: usize, total: usize) {
        let label = self.label;
        let bar = self.bar.get_or_insert_with(|| {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{msg:8} [{bar:40.cyan/blue}] {pos}/{len}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb.set_message(label);
            pb
        });
        bar.set_position(current as u64);
        if current >= total {
            bar.finish();
        }
    }
}
