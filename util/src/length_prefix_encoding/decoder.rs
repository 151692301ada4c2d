use std::{borrow::BorrowMut, io};

use thiserror::Error;
use zeroize::Zeroize;

use super::HEADER_SIZE;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Message too large ({msg_size} bytes) for buffer ({buf_size} bytes)")]
/// Error indicating that a record exceeds the available buffer space
pub struct MessageTooLargeError {
    msg_size: usize,
    buf_size: usize,
}

impl MessageTooLargeError {
    /// Ensures that the message size fits within the buffer size
    pub fn ensure(msg_size: usize, buf_size: usize) -> Result<(), Self> {
        match msg_size <= buf_size {
            true => Ok(()),
            false => Err(Self { msg_size, buf_size }),
        }
    }
}

#[derive(Debug, Error)]
/// Errors that can occur while reading a record from a stream
pub enum ReadFromIoError {
    #[error("Error reading from the underlying stream")]
    IoError(#[from] io::Error),
    #[error("Message size out of buffer bounds")]
    MessageTooLargeError(#[from] MessageTooLargeError),
}

/// Outcome of a single [`LengthPrefixDecoder::read_from_stdio`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadFromIoReturn {
    pub bytes_read: usize,
    /// The record is complete and available through [`LengthPrefixDecoder::message`]
    pub done: bool,
}

/// Reads one length-prefixed record from a stream into a caller supplied buffer.
///
/// The buffer bounds the size of records that are accepted; a larger length header is
/// reported as [`MessageTooLargeError`] before any of the record body is consumed.
///
/// ```
/// use qtunnel_util::length_prefix_encoding::decoder::LengthPrefixDecoder;
///
/// let wire = b"\x04\0\0\0\0\0\0\0null";
/// let mut dec = LengthPrefixDecoder::new(vec![0u8; 64]);
/// let msg = dec.read_all_from_stdio(&wire[..]).unwrap();
/// assert_eq!(msg, b"null");
/// ```
#[derive(Debug, Default, Clone)]
pub struct LengthPrefixDecoder<Buf: BorrowMut<[u8]>> {
    header: [u8; HEADER_SIZE],
    buf: Buf,
    off: usize,
}

impl<Buf: BorrowMut<[u8]>> LengthPrefixDecoder<Buf> {
    pub fn new(buf: Buf) -> Self {
        Self {
            header: [0u8; HEADER_SIZE],
            buf,
            off: 0,
        }
    }

    /// Clears and zeroes all internal state so the decoder can take the next record
    pub fn clear(&mut self) {
        self.header.zeroize();
        self.buf.borrow_mut().zeroize();
        self.off = 0;
    }

    pub fn into_buffer(self) -> Buf {
        self.buf
    }

    pub fn header_complete(&self) -> bool {
        self.off >= HEADER_SIZE
    }

    /// Length announced by the header, once the header has been read
    pub fn message_len(&self) -> Option<usize> {
        self.header_complete()
            .then(|| u64::from_le_bytes(self.header) as usize)
    }

    fn message_offset(&self) -> usize {
        self.off.saturating_sub(HEADER_SIZE)
    }

    /// The complete record, or `None` while it is still being read
    pub fn message(&self) -> Result<Option<&[u8]>, MessageTooLargeError> {
        let Some(len) = self.message_len() else {
            return Ok(None);
        };
        let buf = self.buf.borrow();
        MessageTooLargeError::ensure(len, buf.len())?;
        Ok((self.message_offset() == len).then(|| &buf[..len]))
    }

    /// The buffer slice the next read should fill; `None` once the record is complete
    pub fn next_slice_to_write_to(&mut self) -> Result<Option<&mut [u8]>, MessageTooLargeError> {
        if !self.header_complete() {
            return Ok(Some(&mut self.header[self.off..]));
        }

        let len = u64::from_le_bytes(self.header) as usize;
        let off = self.message_offset();
        let buf = self.buf.borrow_mut();
        MessageTooLargeError::ensure(len, buf.len())?;
        Ok((off < len).then(|| &mut buf[off..len]))
    }

    /// Performs at most one call to [`io::Read::read`]
    pub fn read_from_stdio<R: io::Read>(
        &mut self,
        mut r: R,
    ) -> Result<ReadFromIoReturn, ReadFromIoError> {
        let bytes_read = match self.next_slice_to_write_to()? {
            Some(dst) => r.read(dst)?,
            None => 0,
        };
        self.off += bytes_read;
        let done = self.message()?.is_some();

        if bytes_read == 0 && !done {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream ended inside a length-prefixed record",
            )
            .into());
        }

        Ok(ReadFromIoReturn { bytes_read, done })
    }

    /// Reads a complete record, retrying on interrupts
    pub fn read_all_from_stdio<R: io::Read>(&mut self, mut r: R) -> Result<&[u8], ReadFromIoError> {
        loop {
            match self.read_from_stdio(&mut r) {
                Ok(ReadFromIoReturn { done: true, .. }) => break,
                Ok(ReadFromIoReturn { done: false, .. }) => continue,
                Err(ReadFromIoError::IoError(e)) if e.kind() == io::ErrorKind::Interrupted => {
                    continue
                }
                Err(e) => return Err(e),
            }
        }

        // The loop only ends once the record is complete
        Ok(self.message()?.unwrap_or_default())
    }
}
