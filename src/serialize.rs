//! Segment-tagged stream protocol for bit vectors.
//!
//! # Format
//!
//! A stream is a sequence of segments, each introduced by a one-byte tag:
//!
//! ```text
//! tag  name         payload
//! 0    START        -
//! 1    INVERTED     u8 flag (0 or 1)
//! 2    EMPTY_BLOCK  u32 length (little-endian); the bytes are implied zero
//! 3    BLOCK        u32 length (little-endian), then `length` literal bytes
//! 255  END          -
//! ```
//!
//! A valid stream is `START [INVERTED] (EMPTY_BLOCK | BLOCK)* END`. Segment
//! boundaries carry no meaning for the payload: a decoder sees one continuous
//! byte stream, so vectors with different block sizes can exchange data.

use std::io::{Read, Write};

use tracing::debug;

use crate::error::{Error, Result};

/// Segment tags of the stream protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SegmentType {
    /// First byte of every stream.
    Start = 0,
    /// Carries the inverted flag.
    Inverted = 1,
    /// A run of zero bytes, length only.
    EmptyBlock = 2,
    /// A run of literal bytes.
    Block = 3,
    /// Last byte of every stream.
    End = 255,
}

impl SegmentType {
    /// Decode a tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Start),
            1 => Some(Self::Inverted),
            2 => Some(Self::EmptyBlock),
            3 => Some(Self::Block),
            255 => Some(Self::End),
            _ => None,
        }
    }

    /// The tag byte.
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Sink for a serialized bit vector.
pub trait Serializer {
    /// Begin a stream.
    fn start(&mut self) -> Result<()>;
    /// Finish the stream.
    fn end(&mut self) -> Result<()>;
    /// Whether any earlier step failed.
    fn failed(&self) -> bool;
    /// Record the inverted flag.
    fn set_inverted(&mut self, inverted: bool) -> Result<()>;
    /// Append literal bytes. `on_bits` is the popcount of `data`, a hint an
    /// encoder may use to pick a representation.
    fn add_bytes(&mut self, data: &[u8], on_bits: usize) -> Result<()>;
    /// Append `len` zero bytes.
    fn add_empty_bytes(&mut self, len: usize) -> Result<()>;
}

/// What a [`Deserializer::get_bytes`] call delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// The stream is finished; nothing was written to the buffer.
    Nothing,
    /// Bytes were delivered, all from empty segments (the buffer was zeroed).
    Empty,
    /// Bytes were delivered and at least some came from a literal segment.
    Literal,
}

/// Source of a serialized bit vector.
pub trait Deserializer {
    /// Begin reading a stream.
    fn start(&mut self) -> Result<()>;
    /// The inverted flag. Only meaningful once the INVERTED segment has been
    /// read or the stream is finished; `false` if the stream has none.
    fn is_inverted(&self) -> bool;
    /// Fill `buf` from the payload, crossing segment boundaries as needed.
    ///
    /// A buffer may be only partly filled when the stream ends; the rest is
    /// left untouched.
    fn get_bytes(&mut self, buf: &mut [u8]) -> Result<Fill>;
    /// Whether any earlier step failed.
    fn failed(&self) -> bool;
    /// Whether the END segment was reached (or forced by a failure).
    fn finished(&self) -> bool;
}

/// [`Serializer`] writing the stream protocol to any [`Write`].
///
/// Every `add_bytes` or `add_empty_bytes` call becomes exactly one segment.
#[derive(Debug)]
pub struct StreamSerializer<W: Write> {
    writer: W,
    failed: bool,
}

impl<W: Write> StreamSerializer<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            failed: false,
        }
    }

    /// Borrow the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.failed {
            return Err(Error::CodecFailed);
        }
        self.writer.write_all(bytes).map_err(|e| {
            self.failed = true;
            Error::Io(e)
        })
    }

    fn write_segment_head(&mut self, segment: SegmentType, len: usize) -> Result<()> {
        let Ok(len32) = u32::try_from(len) else {
            self.failed = true;
            return Err(Error::SegmentTooLarge(len));
        };
        let mut head = [segment.tag(), 0, 0, 0, 0];
        head[1..].copy_from_slice(&len32.to_le_bytes());
        self.write(&head)
    }
}

impl<W: Write> Serializer for StreamSerializer<W> {
    fn start(&mut self) -> Result<()> {
        self.write(&[SegmentType::Start.tag()])
    }

    fn end(&mut self) -> Result<()> {
        self.write(&[SegmentType::End.tag()])?;
        self.writer.flush().map_err(|e| {
            self.failed = true;
            Error::Io(e)
        })
    }

    fn failed(&self) -> bool {
        self.failed
    }

    fn set_inverted(&mut self, inverted: bool) -> Result<()> {
        self.write(&[SegmentType::Inverted.tag(), u8::from(inverted)])
    }

    fn add_bytes(&mut self, data: &[u8], _on_bits: usize) -> Result<()> {
        self.write_segment_head(SegmentType::Block, data.len())?;
        self.write(data)
    }

    fn add_empty_bytes(&mut self, len: usize) -> Result<()> {
        self.write_segment_head(SegmentType::EmptyBlock, len)
    }
}

/// [`Deserializer`] reading the stream protocol from any [`Read`].
#[derive(Debug)]
pub struct StreamDeserializer<R: Read> {
    reader: R,
    failed: bool,
    inverted: bool,
    segment: SegmentType,
    segment_left: usize,
}

impl<R: Read> StreamDeserializer<R> {
    /// Wrap a reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            failed: false,
            inverted: false,
            segment: SegmentType::Start,
            segment_left: 0,
        }
    }

    /// Recover the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn fail(&mut self, err: Error) -> Error {
        debug!(error = %err, "stream deserializer failed");
        self.failed = true;
        self.segment = SegmentType::End;
        self.segment_left = 0;
        err
    }

    fn read_input(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.reader.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(Error::Io(e))),
        }
    }

    fn read_segment_head(&mut self) -> Result<()> {
        let mut tag = [0u8; 1];
        self.read_input(&mut tag)?;
        let segment = match SegmentType::from_tag(tag[0]) {
            Some(SegmentType::Start) | None => {
                return Err(self.fail(Error::UnexpectedSegment(tag[0])));
            }
            Some(segment) => segment,
        };
        self.segment = segment;
        self.segment_left = 0;
        match segment {
            SegmentType::Inverted => {
                let mut flag = [0u8; 1];
                self.read_input(&mut flag)?;
                self.inverted = flag[0] != 0;
            }
            SegmentType::EmptyBlock | SegmentType::Block => {
                let mut len = [0u8; 4];
                self.read_input(&mut len)?;
                self.segment_left = u32::from_le_bytes(len) as usize;
            }
            SegmentType::Start | SegmentType::End => {}
        }
        Ok(())
    }
}

impl<R: Read> Deserializer for StreamDeserializer<R> {
    fn start(&mut self) -> Result<()> {
        self.failed = false;
        self.inverted = false;
        self.segment_left = 0;
        let mut tag = [0u8; 1];
        self.read_input(&mut tag)?;
        if tag[0] != SegmentType::Start.tag() {
            return Err(self.fail(Error::MissingStart(tag[0])));
        }
        self.segment = SegmentType::Start;
        Ok(())
    }

    fn is_inverted(&self) -> bool {
        self.inverted
    }

    fn get_bytes(&mut self, buf: &mut [u8]) -> Result<Fill> {
        if self.failed {
            return Err(Error::CodecFailed);
        }

        let mut filled = 0;
        let mut delivered = false;
        let mut literal = false;
        while self.segment != SegmentType::End {
            if self.segment_left == 0 {
                self.read_segment_head()?;
                continue;
            }
            if filled == buf.len() {
                break;
            }
            let take = self.segment_left.min(buf.len() - filled);
            let dst = &mut buf[filled..filled + take];
            if self.segment == SegmentType::Block {
                self.read_input(dst)?;
                literal = true;
            } else {
                dst.fill(0);
            }
            filled += take;
            self.segment_left -= take;
            delivered = true;
        }

        Ok(match (delivered, literal) {
            (false, _) => Fill::Nothing,
            (true, false) => Fill::Empty,
            (true, true) => Fill::Literal,
        })
    }

    fn failed(&self) -> bool {
        self.failed
    }

    fn finished(&self) -> bool {
        self.segment == SegmentType::End
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(f: impl FnOnce(&mut StreamSerializer<&mut Vec<u8>>) -> Result<()>) -> Vec<u8> {
        let mut out = Vec::new();
        let mut s = StreamSerializer::new(&mut out);
        f(&mut s).unwrap();
        assert!(!s.failed());
        out
    }

    #[test]
    fn test_wire_layout() {
        let bytes = encode(|s| {
            s.start()?;
            s.set_inverted(true)?;
            s.add_bytes(&[0xAB, 0xCD], 9)?;
            s.add_empty_bytes(8)?;
            s.end()
        });
        assert_eq!(
            bytes,
            vec![0, 1, 1, 3, 2, 0, 0, 0, 0xAB, 0xCD, 2, 8, 0, 0, 0, 255]
        );
    }

    #[test]
    fn test_one_segment_per_empty_run() {
        let bytes = encode(|s| {
            s.start()?;
            s.add_empty_bytes(8)?;
            s.add_empty_bytes(16)?;
            s.add_bytes(&[1], 1)?;
            s.add_empty_bytes(4)?;
            s.end()
        });
        assert_eq!(
            bytes,
            vec![0, 2, 8, 0, 0, 0, 2, 16, 0, 0, 0, 3, 1, 0, 0, 0, 1, 2, 4, 0, 0, 0, 255]
        );
    }

    #[test]
    fn test_get_bytes_crosses_segments() {
        let bytes = encode(|s| {
            s.start()?;
            s.add_bytes(&[1, 2, 3], 4)?;
            s.add_empty_bytes(2)?;
            s.add_bytes(&[9], 2)?;
            s.end()
        });
        let mut d = StreamDeserializer::new(&bytes[..]);
        d.start().unwrap();
        assert!(!d.is_inverted());

        let mut buf = [0xEEu8; 4];
        assert_eq!(d.get_bytes(&mut buf).unwrap(), Fill::Literal);
        assert_eq!(buf, [1, 2, 3, 0]);

        let mut buf = [0xEEu8; 1];
        assert_eq!(d.get_bytes(&mut buf).unwrap(), Fill::Empty);
        assert_eq!(buf, [0]);

        let mut buf = [0xEEu8; 4];
        assert_eq!(d.get_bytes(&mut buf).unwrap(), Fill::Literal);
        assert_eq!(buf[0], 9);
        assert!(d.finished());

        assert_eq!(d.get_bytes(&mut buf).unwrap(), Fill::Nothing);
        assert!(!d.failed());
    }

    #[test]
    fn test_inverted_flag_read_lazily() {
        let bytes = [0u8, 1, 1, 255];
        let mut d = StreamDeserializer::new(&bytes[..]);
        d.start().unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(d.get_bytes(&mut buf).unwrap(), Fill::Nothing);
        assert!(d.finished());
        assert!(d.is_inverted());
    }

    #[test]
    fn test_missing_start_fails() {
        let bytes = [3u8, 1, 0, 0, 0, 7, 255];
        let mut d = StreamDeserializer::new(&bytes[..]);
        assert!(matches!(d.start(), Err(Error::MissingStart(3))));
        assert!(d.failed());
        assert!(d.finished());
        let mut buf = [0u8; 1];
        assert!(matches!(d.get_bytes(&mut buf), Err(Error::CodecFailed)));
    }

    #[test]
    fn test_unknown_tag_fails() {
        let bytes = [0u8, 7, 255];
        let mut d = StreamDeserializer::new(&bytes[..]);
        d.start().unwrap();
        let mut buf = [0u8; 1];
        assert!(matches!(d.get_bytes(&mut buf), Err(Error::UnexpectedSegment(7))));
        assert!(d.failed());
        assert!(d.finished());
    }

    #[test]
    fn test_truncated_stream_is_io_error() {
        let bytes = [0u8, 3, 8, 0, 0, 0, 1, 2];
        let mut d = StreamDeserializer::new(&bytes[..]);
        d.start().unwrap();
        let mut buf = [0u8; 8];
        assert!(matches!(d.get_bytes(&mut buf), Err(Error::Io(_))));
        assert!(d.failed());
    }

    #[test]
    fn test_write_failure_is_sticky() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "broken"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut s = StreamSerializer::new(Broken);
        assert!(matches!(s.start(), Err(Error::Io(_))));
        assert!(s.failed());
        assert!(matches!(s.add_empty_bytes(8), Err(Error::CodecFailed)));
        assert!(matches!(s.end(), Err(Error::CodecFailed)));
    }
}
