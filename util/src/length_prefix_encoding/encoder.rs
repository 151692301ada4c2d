use std::{borrow::Borrow, io};

use super::HEADER_SIZE;

/// Outcome of a single [`LengthPrefixEncoder::write_to_stdio`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteToIoReturn {
    pub bytes_written: usize,
    pub done: bool,
}

/// Writes one length-prefixed record to a stream, possibly across many partial writes.
///
/// ```
/// use qtunnel_util::length_prefix_encoding::encoder::LengthPrefixEncoder;
///
/// let mut out = Vec::new();
/// LengthPrefixEncoder::from_message(&b"xor"[..])
///     .write_all_to_stdio(&mut out)
///     .unwrap();
/// assert_eq!(out, b"\x03\0\0\0\0\0\0\0xor");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct LengthPrefixEncoder<Buf: Borrow<[u8]>> {
    buf: Buf,
    header: [u8; HEADER_SIZE],
    pos: usize,
}

impl<Buf: Borrow<[u8]>> LengthPrefixEncoder<Buf> {
    /// Prepares the whole of `msg` for writing
    pub fn from_message(msg: Buf) -> Self {
        let header = (msg.borrow().len() as u64).to_le_bytes();
        Self {
            buf: msg,
            header,
            pos: 0,
        }
    }

    pub fn into_buffer(self) -> Buf {
        self.buf
    }

    pub fn message(&self) -> &[u8] {
        self.buf.borrow()
    }

    /// Total number of bytes on the wire, header included
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.message().len()
    }

    /// Number of bytes already handed to the writer
    pub fn writing_position(&self) -> usize {
        self.pos
    }

    pub fn next_slice_to_write(&self) -> &[u8] {
        if self.pos < HEADER_SIZE {
            &self.header[self.pos..]
        } else {
            &self.message()[self.pos - HEADER_SIZE..]
        }
    }

    pub fn exhausted(&self) -> bool {
        self.pos >= self.encoded_len()
    }

    pub fn restart_write(&mut self) {
        self.pos = 0;
    }

    /// Performs at most one call to [`io::Write::write`]
    pub fn write_to_stdio<W: io::Write>(&mut self, mut w: W) -> io::Result<WriteToIoReturn> {
        if self.exhausted() {
            return Ok(WriteToIoReturn {
                bytes_written: 0,
                done: true,
            });
        }

        let bytes_written = w.write(self.next_slice_to_write())?;
        if bytes_written == 0 {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "stream refused length-prefixed record",
            ));
        }
        self.pos += bytes_written;

        Ok(WriteToIoReturn {
            bytes_written,
            done: self.exhausted(),
        })
    }

    /// Writes the remainder of the record, retrying on interrupts
    pub fn write_all_to_stdio<W: io::Write>(&mut self, mut w: W) -> io::Result<()> {
        loop {
            match self.write_to_stdio(&mut w) {
                Ok(WriteToIoReturn { done: true, .. }) => break Ok(()),
                Ok(WriteToIoReturn { done: false, .. }) => continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => break Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writer accepting at most `limit` bytes per call
    struct Trickle {
        out: Vec<u8>,
        limit: usize,
    }

    impl io::Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.limit);
            self.out.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn survives_partial_writes() {
        let msg = b"evhash-96:02cc942de299f4b0d86ffd53".to_vec();
        let mut enc = LengthPrefixEncoder::from_message(msg.as_slice());
        let mut w = Trickle {
            out: Vec::new(),
            limit: 3,
        };

        let first = enc.write_to_stdio(&mut w).unwrap();
        assert_eq!(first.bytes_written, 3);
        assert!(!first.done);

        enc.write_all_to_stdio(&mut w).unwrap();
        assert!(enc.exhausted());
        assert_eq!(&w.out[..HEADER_SIZE], &(msg.len() as u64).to_le_bytes());
        assert_eq!(&w.out[HEADER_SIZE..], msg.as_slice());
        assert_eq!(enc.writing_position(), enc.encoded_len());
    }

    #[test]
    fn empty_message_is_just_a_header() {
        let mut out = Vec::new();
        LengthPrefixEncoder::from_message(Vec::new())
            .write_all_to_stdio(&mut out)
            .unwrap();
        assert_eq!(out, [0u8; HEADER_SIZE]);
    }
}
