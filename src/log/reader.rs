//! Log reader
//!
//! Reads framed records from any byte stream: the log file on open, or a
//! snapshot handed to `Store::load`.

use std::io::{self, Read};

use crate::error::{EmberError, Result};

use super::entry::FrameHeader;
use super::{LogEntry, HEADER_SIZE, MAX_RECORD_SIZE};

/// Outcome of reading one frame
#[derive(Debug)]
pub enum Frame {
    /// A complete, verified record
    Entry(LogEntry),

    /// The stream ended with an incomplete record (crash mid-append)
    Truncated,

    /// Clean end of stream
    End,
}

/// Reads records from a stream
pub struct LogReader<R> {
    reader: R,
    /// Bytes consumed by complete frames so far
    position: u64,
}

impl<R: Read> LogReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            position: 0,
        }
    }

    /// Read the next frame.
    ///
    /// A complete frame with a bad checksum or body is `CorruptLog`; a short
    /// header or body at the end of the stream is [`Frame::Truncated`].
    pub fn next_frame(&mut self) -> Result<Frame> {
        let mut header = [0u8; HEADER_SIZE];
        let read = read_full(&mut self.reader, &mut header)?;
        if read == 0 {
            return Ok(Frame::End);
        }
        if read < HEADER_SIZE {
            return Ok(Frame::Truncated);
        }

        let header = FrameHeader::parse(&header);
        if header.len > MAX_RECORD_SIZE {
            return Err(EmberError::CorruptLog(format!(
                "record length {} at offset {} exceeds the limit",
                header.len, self.position
            )));
        }

        let mut body = Vec::new();
        (&mut self.reader)
            .take(u64::from(header.len))
            .read_to_end(&mut body)?;
        if body.len() < header.len as usize {
            return Ok(Frame::Truncated);
        }

        let entry = header.decode(&body)?;
        self.position += (HEADER_SIZE + body.len()) as u64;
        Ok(Frame::Entry(entry))
    }

    /// Offset just past the last complete frame
    pub fn position(&self) -> u64 {
        self.position
    }
}

/// Fill `buf` as far as the stream allows, returning the bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
