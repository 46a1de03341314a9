use std::io::Read;

use crate::buffer::BufferHandle;
use crate::error::{ParseError, ParseErrorKind};

/// Failures specific to a reader itself — its configuration or its
/// underlying I/O — kept distinct from [`ParseErrorKind`] because they are
/// detected before (or outside of) any attempt to interpret template
/// content. Converts into [`ParseError`] at the point a reader is driven by
/// the scanner.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReaderError {
    #[error("reader chunk_size ({chunk_size}) must be strictly greater than delimiter_max_size ({delimiter_max_size})")]
    ChunkTooSmall { chunk_size: usize, delimiter_max_size: usize },
    #[error("input/output failure while reading the template source: {0}")]
    Io(String),
}

impl From<ReaderError> for ParseError {
    fn from(err: ReaderError) -> Self {
        let detail = err.to_string();
        match err {
            ReaderError::ChunkTooSmall { .. } => ParseError::new(ParseErrorKind::InvalidReaderConfig, 0, 0).with_detail(detail),
            ReaderError::Io(_) => ParseError::new(ParseErrorKind::Io, 0, 0).with_detail(detail),
        }
    }
}

/// Default size of a single bounded read, chosen per the design's
/// suggestion (4 KiB), large enough that ordinary templates rarely need a
/// second read.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Configuration for a bounded-buffer [`FileReader`]. Validated eagerly so
/// that an unusable `chunk_size` (one the scanner could outrun while
/// matching a single delimiter) is rejected at construction rather than
/// corrupting a scan partway through a template.
#[derive(Debug, Clone, Copy)]
pub struct ReaderConfig {
    pub chunk_size: usize,
}

impl ReaderConfig {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    /// Check that `chunk_size` is strictly greater than `delimiter_max_size`,
    /// as required by the design so the scanner never has to span three
    /// buffers to match one delimiter.
    pub fn validate(&self, delimiter_max_size: usize) -> Result<(), ReaderError> {
        if self.chunk_size <= delimiter_max_size {
            return Err(ReaderError::ChunkTooSmall {
                chunk_size: self.chunk_size,
                delimiter_max_size,
            });
        }
        Ok(())
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE }
    }
}

/// The result of a single bounded read: the freshly allocated buffer
/// (`prepend` copied to the front, followed by newly read bytes, shrunk to
/// actual size on a short read) and whether the underlying source is now
/// exhausted.
pub struct ReadResult {
    pub buffer: BufferHandle,
    pub eof: bool,
}

/// The reader contract from the design: produce successive buffers,
/// carrying forward any unconsumed `prepend` bytes from the previous
/// buffer. Implementations never interpret template content.
pub trait Reader {
    fn read(&mut self, prepend: &[u8]) -> Result<ReadResult, ReaderError>;
}

/// A no-op reader for string-sourced templates: the whole template is
/// presented once, and `eof` is immediately true, matching the design's
/// "When `source = string`, the whole template is presented once" rule. In
/// this mode the ref-counted buffer discipline is trivially a no-op, since
/// there is exactly one buffer and it is never compacted.
pub struct StringReader {
    buffer: Option<BufferHandle>,
}

impl StringReader {
    pub fn new(content: &str) -> Self {
        Self {
            buffer: Some(BufferHandle::new(content.as_bytes().to_vec())),
        }
    }
}

impl Reader for StringReader {
    fn read(&mut self, prepend: &[u8]) -> Result<ReadResult, ReaderError> {
        debug_assert!(
            prepend.is_empty(),
            "string reader should never be asked to carry forward unconsumed bytes"
        );
        match self.buffer.take() {
            Some(buffer) => Ok(ReadResult { buffer, eof: true }),
            // Only reachable if `read` is called again after EOF, which the
            // scanner never does once it has observed `eof = true`.
            None => Ok(ReadResult { buffer: BufferHandle::from_static(b""), eof: true }),
        }
    }
}

/// A bounded-buffer reader over any `std::io::Read` source. Deliberately
/// generic over `Read` rather than tied to `std::fs::File`: the design
/// specifies only the bounded-buffer reader contract, leaving the
/// file-system open operation itself to an external collaborator.
pub struct FileReader<R: Read> {
    source: R,
    chunk_size: usize,
    source_eof: bool,
}

impl<R: Read> FileReader<R> {
    pub fn new(source: R, config: ReaderConfig) -> Self {
        Self {
            source,
            chunk_size: config.chunk_size,
            source_eof: false,
        }
    }
}

impl<R: Read> Reader for FileReader<R> {
    fn read(&mut self, prepend: &[u8]) -> Result<ReadResult, ReaderError> {
        if self.source_eof {
            return Ok(ReadResult { buffer: BufferHandle::from_static(prepend), eof: true });
        }

        let mut data = vec![0u8; prepend.len() + self.chunk_size];
        data[..prepend.len()].copy_from_slice(prepend);

        let mut filled = prepend.len();
        // A single `read` call is permitted to return fewer bytes than
        // requested without signaling EOF, so loop until either the
        // requested chunk is full or the source reports exhaustion.
        while filled < data.len() {
            let n = self
                .source
                .read(&mut data[filled..])
                .map_err(|e| ReaderError::Io(e.to_string()))?;
            if n == 0 {
                self.source_eof = true;
                break;
            }
            filled += n;
        }

        data.truncate(filled);
        Ok(ReadResult { buffer: BufferHandle::new(data), eof: self.source_eof })
    }
}
