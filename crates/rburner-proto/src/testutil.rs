//! Scripted in-memory transport for protocol tests

use std::collections::VecDeque;

use crate::error::Result;
use crate::session::PROMPT;
use crate::transport::Transport;

/// A fake programmer on the other end of the wire.
///
/// Outbound bytes are captured; inbound bytes come from a queue of canned
/// responses, the next one released whenever a CR-terminated command goes
/// out. `chunk_limit` caps how many bytes a single read returns, to
/// exercise partial-read reassembly.
pub struct MockTransport {
    pub incoming: VecDeque<u8>,
    pub written: Vec<u8>,
    pub responses: VecDeque<Vec<u8>>,
    pub chunk_limit: usize,
    /// Answer every command with a bare prompt once the response queue is
    /// drained.
    pub auto_prompt: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            incoming: VecDeque::new(),
            written: Vec::new(),
            responses: VecDeque::new(),
            chunk_limit: 3,
            auto_prompt: false,
        }
    }

    /// A mock that will pass the identify handshake.
    pub fn banner() -> Self {
        let mut mock = Self::new();
        mock.push_response(b"AFTerburner v.0.6.3  varVpp RAM-BIG\r\n>\r\n");
        mock
    }

    /// Queue a canned response for the next command.
    pub fn push_response(&mut self, bytes: &[u8]) {
        self.responses.push_back(bytes.to_vec());
    }

    /// Queue bytes directly, bypassing the command/response pairing.
    pub fn push_incoming(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes.iter().copied());
    }

    /// Everything written after the `*` identify command.
    pub fn written_after_handshake(&self) -> &[u8] {
        &self.written[2..]
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.written.extend_from_slice(data);
        if data.contains(&b'\r') {
            if let Some(response) = self.responses.pop_front() {
                self.incoming.extend(response);
            } else if self.auto_prompt {
                self.incoming.extend(PROMPT.iter().copied());
            }
        }
        Ok(data.len())
    }

    fn read_nonblock(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Result<usize> {
        let n = buf.len().min(self.chunk_limit).min(self.incoming.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.incoming.pop_front().unwrap();
        }
        Ok(n)
    }
}
