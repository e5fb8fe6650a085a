//! XSVF feed protocol
//!
//! JTAG parts are programmed by replaying an XSVF byte stream through the
//! firmware's player. The device paces the transfer: it asks for more
//! bytes with in-band `$NNN` feed requests, interleaved with status lines
//! (`D` debug, `Q<code>` quit, `RXSVF` ready, `!` banners). A debug line
//! may be cut in half by a feed request, in which case its remainder
//! arrives with the next read and is stitched back on.

use std::io::Write as _;

use crate::error::{ProtoError, Result};
use crate::session::Session;
use crate::transport::Transport;
use crate::Progress;

/// Leading sigil of a feed request
const FEED_SIGIL: u8 = b'$';

/// A feed request carries exactly this many ASCII decimal digits
const FEED_DIGITS: usize = 3;

/// Bounded retries while consuming feed-request framing bytes
const FEED_RETRY: u32 = 1000;

/// Longest status line the device may send
const MAX_LINE: usize = 16 * 1024;

/// Per-read timeout budget
const LINE_TIMEOUT_MS: u32 = 3000;

/// Poll interval while reading single bytes
const POLL_INTERVAL_MS: u32 = 10;

/// Consecutive empty reads before the whole playback is abandoned
const MAX_IDLE_READS: u32 = 10;

/// Progress is reported at least this often (in sent bytes)
const PROGRESS_STEP: usize = 1024;

/// One read off the wire: an optional feed request, an optional line of
/// text (possibly the fragment cut off by the feed request), and how many
/// bytes were consumed.
struct WireRead {
    feed_request: Option<usize>,
    line: String,
    read_bytes: usize,
}

struct FeedState<'a, T: Transport> {
    session: &'a mut Session<T>,
    data: &'a [u8],
    send_pos: usize,
    last_reported: usize,
    /// The device announced it is ready to receive stream data
    device_ready: bool,
    /// A printed line was interrupted by a feed request; the next line is
    /// its continuation, not a fresh message
    continuing_line: bool,
}

/// Play an XSVF byte stream through the firmware's JTAG player.
///
/// `high_vpp` selects the programming voltage the player applies. Returns
/// an error when the device reports a non-zero result code or goes silent
/// past the timeout ceiling.
pub fn play_xsvf<T: Transport>(
    session: &mut Session<T>,
    data: &[u8],
    high_vpp: bool,
    progress: &mut dyn Progress,
) -> Result<()> {
    // Byte sum for comparing against the device's own count in debug runs.
    let byte_sum: u32 = data.iter().map(|&b| u32::from(b)).sum();

    session.send_raw(format!("j{}\r", u8::from(high_vpp)).as_bytes())?;

    let mut state = FeedState {
        session,
        data,
        send_pos: 0,
        last_reported: 0,
        device_ready: false,
        continuing_line: false,
    };

    let mut idle_reads = 0;
    let result = loop {
        let read = state.read_line_or_feed(LINE_TIMEOUT_MS)?;

        if read.read_bytes == 0 && read.feed_request.is_none() {
            idle_reads += 1;
            if idle_reads >= MAX_IDLE_READS {
                return Err(ProtoError::Timeout(MAX_IDLE_READS * LINE_TIMEOUT_MS));
            }
        } else {
            idle_reads = 0;
        }

        if let Some(requested) = read.feed_request {
            state.feed(requested, progress)?;
            if read.read_bytes > 2 {
                // a line was in flight when the request arrived
                state.continuing_line = true;
            }
        }

        if !read.line.is_empty() {
            if read.feed_request.is_none() && state.continuing_line {
                // tail of the line the previous feed request interrupted
                state.continuing_line = false;
                println!("{}", read.line);
            } else if let Some(message) = read.line.strip_prefix('D') {
                if read.feed_request.is_some() {
                    // the rest of the message will follow
                    print!("{}", message);
                    let _ = std::io::stdout().flush();
                } else {
                    println!("{}", message);
                }
            }

            if let Some(code) = read.line.strip_prefix('Q') {
                break code.trim().parse::<i32>().unwrap_or(0);
            } else if read.line == "RXSVF" {
                state.device_ready = true;
            } else if let Some(message) = read.line.strip_prefix('!') {
                if read.line == "!Success" || read.line == "!Fail" {
                    println!("{}", message);
                } else {
                    log::debug!("{}", message);
                }
            }
        } else if read.read_bytes > 0 && state.continuing_line {
            // feed request with nothing pending: close the open line
            println!();
            state.continuing_line = false;
        }
    };

    // Drain whatever the player still prints after the quit line.
    let _ = state.read_line_or_feed(1000);

    log::debug!("host byte sum: 0x{:08X}", byte_sum);

    if result != 0 {
        return Err(ProtoError::PlaybackFailed(result));
    }
    Ok(())
}

impl<T: Transport> FeedState<'_, T> {
    /// Send the next chunk in response to a feed request.
    ///
    /// The chunk is `min(remaining, requested)`; the very first chunk is
    /// doubled (capped at the stream size) to pre-fill the host-side
    /// serial buffering.
    fn feed(&mut self, requested: usize, progress: &mut dyn Progress) -> Result<()> {
        if !self.device_ready {
            return Ok(());
        }
        let remaining = self.data.len() - self.send_pos;
        let mut chunk = remaining;
        if chunk > requested {
            chunk = requested;
            if self.send_pos == 0 {
                chunk = (requested * 2).min(self.data.len());
            }
        }
        if chunk > 0 {
            self.session
                .send_raw(&self.data[self.send_pos..self.send_pos + chunk])?;
            self.send_pos += chunk;
            if self.send_pos - self.last_reported >= PROGRESS_STEP || self.send_pos == self.data.len()
            {
                self.last_reported = self.send_pos;
                progress.update(self.send_pos, self.data.len());
            }
        }
        Ok(())
    }

    /// Read until a complete line, a feed request or budget expiry.
    fn read_line_or_feed(&mut self, timeout_ms: u32) -> Result<WireRead> {
        let mut line = Vec::new();
        let mut read_bytes = 0usize;
        let mut feed_request = None;
        let mut budget = timeout_ms;

        loop {
            let mut byte = [0u8; 1];
            let n = self
                .session
                .transport
                .read_nonblock(&mut byte, POLL_INTERVAL_MS)?;
            if n > 0 {
                read_bytes += 1;
                match byte[0] {
                    FEED_SIGIL => {
                        read_bytes -= 1;
                        feed_request = self.read_feed_size()?;
                        if feed_request.is_some() {
                            break;
                        }
                    }
                    b'\r' => {
                        // consume the LF that follows
                        read_bytes += self.session.transport.read_nonblock(&mut byte, POLL_INTERVAL_MS)?;
                        break;
                    }
                    b => {
                        line.push(b);
                        if line.len() >= MAX_LINE {
                            return Err(ProtoError::BufferOverflow(line.len()));
                        }
                    }
                }
            }
            budget = budget.saturating_sub(POLL_INTERVAL_MS);
            if budget == 0 {
                break;
            }
        }

        Ok(WireRead {
            feed_request,
            line: String::from_utf8_lossy(&line).into_owned(),
            read_bytes,
        })
    }

    /// Parse the body of a feed request: three decimal digits and CR LF.
    ///
    /// Malformed framing is logged as corruption but does not kill the
    /// session; the caller just keeps reading.
    fn read_feed_size(&mut self) -> Result<Option<usize>> {
        let mut digits = [0u8; FEED_DIGITS];
        if !self.read_exact_bounded(&mut digits)? {
            log::warn!("corrupted feed request: missing size digits");
            return Ok(None);
        }
        if !digits.iter().all(u8::is_ascii_digit) {
            log::warn!("corrupted feed request: non-numeric size {:?}", digits);
            return Ok(None);
        }
        let size = digits
            .iter()
            .fold(0usize, |acc, &d| acc * 10 + usize::from(d - b'0'));

        let mut terminator = [0u8; 2];
        if !self.read_exact_bounded(&mut terminator)? || terminator != [b'\r', b'\n'] {
            // The size itself already arrived; keep going with it.
            log::warn!("corrupted feed request: bad terminator {:?}", terminator);
        }
        Ok(Some(size))
    }

    /// Fill `buf` with bounded retries; false when the device stalls.
    fn read_exact_bounded(&mut self, buf: &mut [u8]) -> Result<bool> {
        let mut got = 0;
        let mut retry = FEED_RETRY;
        while got < buf.len() && retry > 0 {
            got += self.session.transport.read_nonblock(&mut buf[got..], 1)?;
            retry -= 1;
        }
        Ok(got == buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockTransport;

    fn open_session(stream: &[u8]) -> Session<MockTransport> {
        let mut session = Session::open(MockTransport::banner()).unwrap();
        session.transport.chunk_limit = 64;
        session.transport.push_incoming(stream);
        session
    }

    struct Recorder(Vec<(usize, usize)>);
    impl Progress for Recorder {
        fn update(&mut self, current: usize, total: usize) {
            self.0.push((current, total));
        }
    }

    #[test]
    fn feeds_every_byte_once_in_order() {
        // 32 bytes of payload; requests of 8 sum to the file size once the
        // doubled first chunk is accounted for.
        let data: Vec<u8> = (0u8..32).collect();
        let mut session = open_session(
            b"RXSVF\r\n$008\r\n$008\r\n$008\r\n!Success\r\nQ0\r\n",
        );

        let mut progress = Recorder(Vec::new());
        play_xsvf(&mut session, &data, true, &mut progress).unwrap();

        let written = session.transport.written_after_handshake();
        assert_eq!(&written[..3], b"j1\r");
        assert_eq!(&written[3..], &data[..]);
        // Completion is always reported.
        assert_eq!(progress.0.last(), Some(&(32, 32)));
    }

    #[test]
    fn first_chunk_is_doubled_but_capped() {
        // File smaller than twice the first request: the cap applies.
        let data = [0xAAu8; 10];
        let mut session = open_session(b"RXSVF\r\n$008\r\nQ0\r\n");
        play_xsvf(&mut session, &data, false, &mut ()).unwrap();

        let written = session.transport.written_after_handshake();
        assert_eq!(&written[..3], b"j0\r");
        assert_eq!(written.len() - 3, 10);
    }

    #[test]
    fn feed_requests_before_ready_are_ignored() {
        let data = [0x55u8; 8];
        let mut session = open_session(b"$008\r\nRXSVF\r\n$008\r\nQ0\r\n");
        play_xsvf(&mut session, &data, true, &mut ()).unwrap();

        // Only the post-RXSVF request is honored.
        let written = session.transport.written_after_handshake();
        assert_eq!(written.len() - 3, 8);
    }

    #[test]
    fn nonzero_result_code_is_a_failure() {
        let mut session = open_session(b"RXSVF\r\n!Fail\r\nQ5\r\n");
        assert!(matches!(
            play_xsvf(&mut session, &[], true, &mut ()),
            Err(ProtoError::PlaybackFailed(5))
        ));
    }

    #[test]
    fn corrupted_feed_request_does_not_abort() {
        // "$0x8" has a non-numeric digit; the session carries on and
        // terminates normally.
        let data = [1u8, 2, 3, 4];
        let mut session = open_session(b"RXSVF\r\n$0x8\r\n$004\r\nQ0\r\n");
        play_xsvf(&mut session, &data, true, &mut ()).unwrap();

        let written = session.transport.written_after_handshake();
        assert_eq!(&written[3..], &data[..]);
    }

    #[test]
    fn silent_device_hits_the_timeout_ceiling() {
        let mut session = open_session(b"RXSVF\r\n");
        assert!(matches!(
            play_xsvf(&mut session, &[0u8; 4], true, &mut ()),
            Err(ProtoError::Timeout(_))
        ));
    }
}
