//! Seekable byte source abstraction.
//!
//! The parser owns exactly one cursor over the input for the duration of a
//! parse call. Files are opened read-shared through a small `BufReader`,
//! since access is dominated by seeks rather than long sequential reads.

use crate::error::Result;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Read-ahead buffer for file-backed sources.
const FILE_BUFFER: usize = 8 * 1024;

/// Object-safe combination of [`Read`] and [`Seek`].
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// A positioned, bounded byte source.
pub struct Source {
    inner: Box<dyn ReadSeek>,
    pos: u64,
    len: u64,
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("pos", &self.pos)
            .field("len", &self.len)
            .finish()
    }
}

impl Source {
    /// Wrap an arbitrary seekable reader.
    ///
    /// The total length is established once via a seek to the end; the
    /// cursor is then rewound to the start.
    pub fn new<R: Read + Seek + 'static>(mut inner: R) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner: Box::new(inner),
            pos: 0,
            len,
        })
    }

    /// Open a file with a small read-ahead buffer.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::with_capacity(FILE_BUFFER, file))
    }

    /// Current absolute cursor position.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Total length of the source in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the source is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes remaining past the cursor.
    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.pos)
    }

    /// Move the cursor to an absolute offset.
    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        if offset != self.pos {
            self.inner.seek(SeekFrom::Start(offset))?;
            self.pos = offset;
        }
        Ok(())
    }

    /// Advance the cursor without reading.
    pub fn skip(&mut self, count: u64) -> Result<()> {
        self.seek_to(self.pos + count)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf)?;
        self.pos += 1;
        Ok(buf[0])
    }

    /// Fill the given buffer exactly.
    pub fn read_exact_buf(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    /// Read `count` bytes into a fresh vector.
    pub fn read_vec(&mut self, count: u64) -> Result<Vec<u8>> {
        let mut data = vec![0u8; count as usize];
        self.read_exact_buf(&mut data)?;
        Ok(data)
    }

    /// Recover the underlying reader, e.g. for `keep_stream_open`.
    pub fn into_inner(self) -> Box<dyn ReadSeek> {
        self.inner
    }
}
