use std::{io, os::fd::RawFd};

use crate::{cutils::was_interrupted, system::read};

const CHUNK_SIZE: usize = 4096;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Input {
    Line(String),
    /// A signal arrived before a full line did. Bytes read so far are kept.
    Interrupted,
    Eof,
}

/// Reads newline-terminated lines straight from a descriptor.
pub(crate) struct LineReader {
    fd: RawFd,
    pending: Vec<u8>,
}

impl LineReader {
    pub(crate) fn new(fd: RawFd) -> Self {
        Self {
            fd,
            pending: Vec::new(),
        }
    }

    pub(crate) fn stdin() -> Self {
        Self::new(libc::STDIN_FILENO)
    }

    pub(crate) fn read_line(&mut self) -> io::Result<Input> {
        let mut chunk = [0u8; CHUNK_SIZE];

        loop {
            if let Some(end) = self.pending.iter().position(|&byte| byte == b'\n') {
                let line: Vec<u8> = self.pending.drain(..=end).collect();
                return Ok(Input::Line(decode(&line[..end])));
            }

            match read(self.fd, &mut chunk) {
                Ok(0) if self.pending.is_empty() => return Ok(Input::Eof),
                // the last line was not terminated
                Ok(0) => {
                    let line = std::mem::take(&mut self.pending);
                    return Ok(Input::Line(decode(&line)));
                }
                Ok(count) => self.pending.extend_from_slice(&chunk[..count]),
                Err(err) if was_interrupted(&err) => return Ok(Input::Interrupted),
                Err(err) => {
                    self.pending.clear();
                    return Err(err);
                }
            }
        }
    }
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
