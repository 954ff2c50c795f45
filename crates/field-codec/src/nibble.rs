//! Nibble-granular bit streams.
//!
//! Two nibbles are packed per byte, high nibble first. A stream with an odd
//! number of nibbles is padded with a zero low nibble when finished.

use std::io::{self, Write};

use crate::error::{CodecError, Result};

/// Completed bytes are handed to the sink once this many have accumulated.
const FLUSH_THRESHOLD: usize = 8 * 1024;

/// Writes 4-bit values into any byte sink.
pub struct NibbleWriter<W: Write> {
    sink: W,
    buffer: Vec<u8>,
    pending: Option<u8>,
    bytes_written: usize,
}

impl<W: Write> NibbleWriter<W> {
    /// Create a writer over the given sink.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            buffer: Vec::with_capacity(FLUSH_THRESHOLD),
            pending: None,
            bytes_written: 0,
        }
    }

    /// Append one nibble. Only the low 4 bits of `nibble` are used.
    pub fn push(&mut self, nibble: u8) -> io::Result<()> {
        let nibble = nibble & 0x0F;
        match self.pending.take() {
            None => self.pending = Some(nibble << 4),
            Some(high) => {
                self.buffer.push(high | nibble);
                self.bytes_written += 1;
                if self.buffer.len() >= FLUSH_THRESHOLD {
                    self.flush_buffer()?;
                }
            }
        }
        Ok(())
    }

    /// Append the `count` low-order nibbles of `word`, most significant first.
    pub fn push_word(&mut self, word: u64, count: u32) -> io::Result<()> {
        for i in (0..count).rev() {
            self.push(((word >> (i * 4)) & 0x0F) as u8)?;
        }
        Ok(())
    }

    /// Number of bytes produced so far, counting a half-filled byte as one.
    pub fn len(&self) -> usize {
        self.bytes_written + usize::from(self.pending.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pad the final byte, flush everything and return the sink.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(high) = self.pending.take() {
            self.buffer.push(high);
            self.bytes_written += 1;
        }
        self.flush_buffer()?;
        self.sink.flush()?;
        Ok(self.sink)
    }

    fn flush_buffer(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            self.sink.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        Ok(())
    }
}

/// Reads 4-bit values back out of a byte slice.
pub struct NibbleReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> NibbleReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Read the next nibble, or `None` once the slice is exhausted.
    pub fn next_nibble(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.position / 2)?;
        let nibble = if self.position % 2 == 0 {
            byte >> 4
        } else {
            byte & 0x0F
        };
        self.position += 1;
        Some(nibble)
    }

    /// Read `count` nibbles into the low bits of a word, most significant first.
    ///
    /// `decoded` and `expected` only feed the error message.
    pub fn read_word(&mut self, count: u32, decoded: usize, expected: usize) -> Result<u64> {
        let mut word = 0u64;
        for _ in 0..count {
            let nibble = self
                .next_nibble()
                .ok_or(CodecError::Truncated { decoded, expected })?;
            word = (word << 4) | u64::from(nibble);
        }
        Ok(word)
    }

    /// Nibbles consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packs_two_nibbles_per_byte() {
        let mut writer = NibbleWriter::new(Vec::new());
        writer.push(0xA).unwrap();
        writer.push(0x5).unwrap();
        writer.push(0xF).unwrap();
        assert_eq!(writer.len(), 2);

        let bytes = writer.finish().unwrap();
        assert_eq!(bytes, vec![0xA5, 0xF0]);
    }

    #[test]
    fn test_push_ignores_high_bits() {
        let mut writer = NibbleWriter::new(Vec::new());
        writer.push(0xF3).unwrap();
        writer.push(0x21).unwrap();
        assert_eq!(writer.finish().unwrap(), vec![0x31]);
    }

    #[test]
    fn test_word_order_is_most_significant_first() {
        let mut writer = NibbleWriter::new(Vec::new());
        writer.push_word(0x1234, 4).unwrap();
        writer.push_word(0xABC, 3).unwrap();
        let bytes = writer.finish().unwrap();
        assert_eq!(bytes, vec![0x12, 0x34, 0xAB, 0xC0]);

        let mut reader = NibbleReader::new(&bytes);
        assert_eq!(reader.read_word(4, 0, 2).unwrap(), 0x1234);
        assert_eq!(reader.read_word(3, 1, 2).unwrap(), 0xABC);
        assert_eq!(reader.position(), 7);
    }

    #[test]
    fn test_reader_reports_truncation() {
        let bytes = [0x12];
        let mut reader = NibbleReader::new(&bytes);
        let err = reader.read_word(3, 4, 10).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Truncated {
                decoded: 4,
                expected: 10
            }
        ));
    }

    #[test]
    fn test_large_stream_flushes_through_sink() {
        let mut writer = NibbleWriter::new(Vec::new());
        for i in 0..(FLUSH_THRESHOLD * 4 + 1) {
            writer.push((i % 16) as u8).unwrap();
        }
        let bytes = writer.finish().unwrap();
        assert_eq!(bytes.len(), FLUSH_THRESHOLD * 2 + 1);
        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes[bytes.len() - 1], 0x00);
    }
}
