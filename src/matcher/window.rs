//! Bounded views of a byte source.
//!
//! A [`Window`] keeps at most `bof` bytes from the start of the stream and
//! `eof` bytes from its end. Streams no longer than `bof + eof` are held
//! whole, in which case every signature sees the complete content.

use std::collections::VecDeque;
use std::io::{self, Read, Seek, SeekFrom};

const STREAM_CHUNK: usize = 8192;

/// Number of bytes to keep at each end of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowSpec {
    pub bof: usize,
    pub eof: usize,
}

impl WindowSpec {
    pub fn new(bof: usize, eof: usize) -> Self {
        Self { bof, eof }
    }

    #[inline]
    fn whole(&self, len: u64) -> bool {
        len <= self.bof.saturating_add(self.eof) as u64
    }
}

/// Buffered start and end of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    head: Vec<u8>,
    tail: Vec<u8>,
    len: u64,
}

impl Window {
    /// Window over an in-memory buffer.
    pub fn from_slice(data: &[u8], spec: WindowSpec) -> Self {
        let len = data.len() as u64;
        if spec.whole(len) {
            return Self::from_vec(data.to_vec());
        }
        Self {
            head: data[..spec.bof].to_vec(),
            tail: data[data.len() - spec.eof..].to_vec(),
            len,
        }
    }

    /// Read the window from a seekable source.
    ///
    /// The length is taken from the end position; only the two windows are
    /// read. The reader is left at an unspecified position.
    pub fn read_seekable<R: Read + Seek + ?Sized>(
        reader: &mut R,
        spec: WindowSpec,
    ) -> io::Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        if spec.whole(len) {
            let mut data = Vec::with_capacity(len as usize);
            Read::take(&mut *reader, len).read_to_end(&mut data)?;
            return Ok(Self::from_vec(data));
        }

        let mut head = vec![0u8; spec.bof];
        reader.read_exact(&mut head)?;
        let mut tail = vec![0u8; spec.eof];
        reader.seek(SeekFrom::Start(len - spec.eof as u64))?;
        reader.read_exact(&mut tail)?;
        Ok(Self { head, tail, len })
    }

    /// Read the window from a forward-only source.
    ///
    /// The whole stream is consumed; only the head and a rolling trailing
    /// window are retained.
    pub fn read_stream<R: Read + ?Sized>(reader: &mut R, spec: WindowSpec) -> io::Result<Self> {
        let mut head = Vec::with_capacity(spec.bof.min(STREAM_CHUNK));
        Read::take(&mut *reader, spec.bof as u64).read_to_end(&mut head)?;
        let mut len = head.len() as u64;

        let mut tail: VecDeque<u8> = VecDeque::with_capacity(spec.eof.min(STREAM_CHUNK));
        if head.len() == spec.bof {
            let mut chunk = [0u8; STREAM_CHUNK];
            loop {
                let n = match reader.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                };
                len += n as u64;
                tail.extend(&chunk[..n]);
                if tail.len() > spec.eof {
                    let excess = tail.len() - spec.eof;
                    tail.drain(..excess);
                }
            }
        }

        if spec.whole(len) {
            head.extend(tail);
            return Ok(Self::from_vec(head));
        }
        Ok(Self {
            head,
            tail: tail.into(),
            len,
        })
    }

    /// Window holding an entire in-memory stream.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            len: data.len() as u64,
            head: data,
            tail: Vec::new(),
        }
    }

    /// Total stream length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True if the window holds the entire stream.
    pub fn is_complete(&self) -> bool {
        self.head.len() as u64 == self.len
    }

    /// Bytes from offset zero.
    pub fn head(&self) -> &[u8] {
        &self.head
    }

    /// Trailing bytes and the absolute offset of their first byte.
    pub fn tail(&self) -> (&[u8], u64) {
        if self.is_complete() {
            (&self.head, 0)
        } else {
            (&self.tail, self.len - self.tail.len() as u64)
        }
    }

    /// The full content, if it was small enough to buffer.
    pub fn contents(&self) -> Option<&[u8]> {
        self.is_complete().then_some(self.head.as_slice())
    }
}
