//! Transport layer abstraction
//!
//! The protocol driver only needs a byte pipe with polled reads; the serial
//! port specifics live in the adapter below.

use crate::error::{ProtoError, Result};

/// Byte transport to the programmer
pub trait Transport {
    /// Write bytes, returning how many were accepted.
    ///
    /// Short writes are allowed; callers loop until everything is out.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Read up to `buf.len()` bytes, waiting at most `timeout_ms`.
    ///
    /// Returns the number of bytes read; 0 means "nothing yet", never
    /// end-of-stream.
    fn read_nonblock(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize>;
}

/// Serial port transport
///
/// The programmer talks 57600 8N1 with no flow control.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

/// Baud rate of the programmer firmware
pub const BAUD_RATE: u32 = 57_600;

impl SerialTransport {
    /// Open a serial device by name.
    pub fn open(device: &str) -> Result<Self> {
        use serialport::{DataBits, FlowControl, Parity, StopBits};

        let port = serialport::new(device, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(std::time::Duration::from_millis(10))
            .open()?;

        log::info!("opened serial port {} at {} baud", device, BAUD_RATE);

        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        match self.port.write(data) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(ProtoError::from(e)),
        }
    }

    fn read_nonblock(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize> {
        self.port
            .set_timeout(std::time::Duration::from_millis(u64::from(timeout_ms)))?;

        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(ProtoError::from(e)),
        }
    }
}

/// Guess a serial device name by picking the first USB serial port.
pub fn guess_port() -> Option<String> {
    let ports = serialport::available_ports().ok()?;
    for port in &ports {
        if matches!(port.port_type, serialport::SerialPortType::UsbPort(_)) {
            log::debug!("guessed serial device {}", port.port_name);
            return Some(port.port_name.clone());
        }
    }
    ports.first().map(|p| p.port_name.clone())
}
