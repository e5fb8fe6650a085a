//! Programmer session
//!
//! Line-oriented request/response over a [`Transport`]: commands are
//! CR-terminated ASCII, responses end with the device prompt `>` CR LF.
//! A session is created by the identify handshake and holds the capability
//! flags announced in the banner.

use std::io::Write as _;

use bitflags::bitflags;

use crate::error::{ProtoError, Result};
use crate::transport::Transport;

/// The device prompt terminating every response
pub const PROMPT: &[u8] = b">\r\n";

/// Product label the identification banner must contain
const BANNER: &str = "AFTerburner v.";

/// The banner label must appear near the start of the response
const BANNER_WINDOW: usize = 500;

/// Receive buffer cap; fuse-map dumps are the largest responses
const RECV_CAPACITY: usize = 256 * 1024;

/// Poll interval while waiting for the prompt
const POLL_INTERVAL_MS: u32 = 10;

/// Timeout for the identify handshake
const HANDSHAKE_TIMEOUT_MS: u32 = 3000;

bitflags! {
    /// Capabilities advertised by the identification banner
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        /// Board with software-controlled variable VPP
        const VAR_VPP = 1 << 0;
        /// MCU with a large fuse RAM
        const BIG_RAM = 1 << 1;
    }
}

/// An open connection to the programmer
pub struct Session<T: Transport> {
    pub(crate) transport: T,
    caps: Capabilities,
    /// Echo device output to stdout while waiting for the prompt
    /// (used by the long-running VPP operations)
    pub(crate) echo: bool,
}

impl<T: Transport> Session<T> {
    /// Perform the identify handshake and return an open session.
    ///
    /// Prods the programmer with a bare `*` command and checks the response
    /// for the product banner; anything else is not our device.
    pub fn open(transport: T) -> Result<Self> {
        let mut session = Self {
            transport,
            caps: Capabilities::empty(),
            echo: false,
        };

        session.send_raw(b"*\r")?;
        let raw = match session.wait_for_prompt(HANDSHAKE_TIMEOUT_MS) {
            Ok(raw) => raw,
            Err(ProtoError::Timeout(_)) => {
                return Err(ProtoError::NotRecognized("no response to identify".into()))
            }
            Err(e) => return Err(e),
        };

        let text = String::from_utf8_lossy(&raw);
        let label = match text.find(BANNER) {
            Some(pos) if pos < BANNER_WINDOW => &text[pos..],
            _ => {
                log::debug!("output from programmer not recognised: {}", text);
                return Err(ProtoError::NotRecognized(
                    "identification banner not found".into(),
                ));
            }
        };

        if label.contains(" varVpp ") {
            session.caps |= Capabilities::VAR_VPP;
            log::debug!("variable VPP board detected");
        }
        if label.contains(" RAM-BIG") {
            session.caps |= Capabilities::BIG_RAM;
            log::debug!("MCU big RAM detected");
        }

        Ok(session)
    }

    /// Capabilities parsed from the identification banner.
    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// Whether the board supports software-controlled VPP.
    pub fn has_var_vpp(&self) -> bool {
        self.caps.contains(Capabilities::VAR_VPP)
    }

    /// Write raw bytes, looping over short writes.
    pub fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        let mut sent = 0;
        while sent < data.len() {
            sent += self.transport.write(&data[sent..])?;
        }
        Ok(())
    }

    /// Send a CR-terminated command and wait for the prompt.
    ///
    /// Returns the response text with the prompt and surrounding newline
    /// characters stripped.
    pub fn send_command(&mut self, command: &str, timeout_ms: u32) -> Result<String> {
        self.send_raw(command.as_bytes())?;
        let raw = self.wait_for_prompt(timeout_ms)?;
        let response = strip_response(&raw);
        log::trace!("read: {} {:?}", raw.len(), response);
        Ok(response)
    }

    /// Send a command and classify the response.
    ///
    /// A response whose last non-empty line starts with `ER` is a
    /// device-reported failure; everything else is returned verbatim.
    pub fn command(&mut self, command: &str, timeout_ms: u32) -> Result<String> {
        let response = self.send_command(command, timeout_ms)?;
        if let Some(line) = last_line(&response) {
            if line.starts_with("ER") {
                return Err(ProtoError::Device(response));
            }
        }
        Ok(response)
    }

    /// Accumulate inbound bytes until the prompt marker appears.
    ///
    /// The budget is decremented every poll round whether or not data
    /// arrived, so a device that streams bytes without ever producing the
    /// prompt still times out. Exceeding the receive buffer before the
    /// marker is a protocol violation.
    pub(crate) fn wait_for_prompt(&mut self, timeout_ms: u32) -> Result<Vec<u8>> {
        let mut buf: Vec<u8> = Vec::new();
        let mut chunk = [0u8; 512];
        let mut budget = timeout_ms;
        let mut echoed = 0;

        loop {
            let n = self.transport.read_nonblock(&mut chunk, POLL_INTERVAL_MS)?;
            if n > 0 {
                if buf.len() + n > RECV_CAPACITY {
                    return Err(ProtoError::BufferOverflow(buf.len() + n));
                }
                buf.extend_from_slice(&chunk[..n]);
                if self.echo {
                    echoed = echo_pending(&buf, echoed);
                }
                if find_prompt(&buf).is_some() {
                    return Ok(buf);
                }
            }
            budget = budget.saturating_sub(POLL_INTERVAL_MS);
            if budget == 0 {
                log::debug!("wait for prompt timed out after {} ms", timeout_ms);
                return Err(ProtoError::Timeout(timeout_ms));
            }
        }
    }
}

/// Find the offset of the prompt marker, if present.
fn find_prompt(buf: &[u8]) -> Option<usize> {
    buf.windows(PROMPT.len()).position(|w| w == PROMPT)
}

/// Truncate at the prompt and trim newline characters from both ends.
fn strip_response(raw: &[u8]) -> String {
    let body = match find_prompt(raw) {
        Some(pos) => &raw[..pos],
        None => raw,
    };
    String::from_utf8_lossy(body)
        .trim_matches(|c| c == '\r' || c == '\n')
        .to_string()
}

/// Last non-empty line of a stripped response.
fn last_line(response: &str) -> Option<&str> {
    response.lines().rev().find(|line| !line.is_empty())
}

/// Print freshly received bytes, stopping at the prompt character.
fn echo_pending(buf: &[u8], from: usize) -> usize {
    let mut stdout = std::io::stdout();
    for (i, &b) in buf.iter().enumerate().skip(from) {
        if b == b'>' {
            return i;
        }
        print!("{}", b as char);
        if b == b'\n' || b == b'\r' {
            let _ = stdout.flush();
        }
    }
    buf.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockTransport;

    #[test]
    fn handshake_parses_banner_and_capabilities() {
        let mut mock = MockTransport::new();
        mock.push_response(b"AFTerburner v.0.6.3  varVpp RAM-BIG\r\n>\r\n");
        let session = Session::open(mock).unwrap();
        assert!(session.has_var_vpp());
        assert!(session.capabilities().contains(Capabilities::BIG_RAM));
    }

    #[test]
    fn handshake_without_capability_flags() {
        let mut mock = MockTransport::new();
        mock.push_response(b"AFTerburner v.0.6.3\r\n>\r\n");
        let session = Session::open(mock).unwrap();
        assert_eq!(session.capabilities(), Capabilities::empty());
    }

    #[test]
    fn handshake_rejects_foreign_devices() {
        let mut mock = MockTransport::new();
        mock.push_response(b"GRBL 1.1h ['$' for help]\r\n>\r\n");
        assert!(matches!(
            Session::open(mock),
            Err(ProtoError::NotRecognized(_))
        ));
    }

    #[test]
    fn handshake_times_out_on_silence() {
        let mock = MockTransport::new();
        assert!(matches!(
            Session::open(mock),
            Err(ProtoError::NotRecognized(_))
        ));
    }

    #[test]
    fn response_is_stripped_of_prompt_and_newlines() {
        let mut session = Session::open(MockTransport::banner()).unwrap();
        session
            .transport
            .push_response(b"\r\nVPP: 12.01V\r\n>\r\n");
        let response = session.send_command("p\r", 4000).unwrap();
        assert_eq!(response, "VPP: 12.01V");
        assert_eq!(session.transport.written_after_handshake(), b"p\r");
    }

    #[test]
    fn partial_reads_are_reassembled() {
        let mut session = Session::open(MockTransport::banner()).unwrap();
        session.transport.chunk_limit = 2;
        session.transport.push_response(b"OK done\r\n>\r\n");
        let response = session.send_command("c\r", 4000).unwrap();
        assert_eq!(response, "OK done");
    }

    #[test]
    fn marker_less_stream_times_out() {
        let mut session = Session::open(MockTransport::banner()).unwrap();
        session.transport.push_response(b"data with no prompt at all");
        assert!(matches!(
            session.send_command("r\r", 200),
            Err(ProtoError::Timeout(200))
        ));
    }

    #[test]
    fn oversized_response_is_a_protocol_violation() {
        let mut session = Session::open(MockTransport::banner()).unwrap();
        session.transport.chunk_limit = 4096;
        session.transport.push_response(&vec![b'x'; RECV_CAPACITY + 8]);
        assert!(matches!(
            session.send_command("r\r", 60_000),
            Err(ProtoError::BufferOverflow(_))
        ));
    }

    #[test]
    fn er_line_is_classified_as_device_error() {
        let mut session = Session::open(MockTransport::banner()).unwrap();
        session
            .transport
            .push_response(b"some detail\r\nER write failed\r\n>\r\n");
        match session.command("w\r", 8000) {
            Err(ProtoError::Device(text)) => assert!(text.ends_with("ER write failed")),
            other => panic!("expected device error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn non_er_response_is_success() {
        let mut session = Session::open(MockTransport::banner()).unwrap();
        session
            .transport
            .push_response(b"ERASED\r\nall good\r\n>\r\n");
        let response = session.command("c\r", 4000).unwrap();
        assert_eq!(response, "ERASED\r\nall good");
    }
}
