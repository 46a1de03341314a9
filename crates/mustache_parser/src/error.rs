/// The kind of failure the parser encountered. See each variant for the
/// condition that produces it; every variant is paired with the (line, col)
/// at which the condition was detected.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("delimiters must be non-empty")]
    InvalidDelimiters,
    #[error("tag identifier must be a single token")]
    InvalidIdentifier,
    /// Reserved for scanners that match delimiters byte-by-byte and can
    /// observe a partial match break mid-sequence; this crate locates
    /// delimiters with a substring search instead, so a broken partial
    /// match is never distinguishable from "delimiter not here yet" and
    /// this variant is not currently raised.
    #[error("expected the starting delimiter")]
    StartingDelimiterMismatch,
    /// Raised when a triple-mustache tag's `}}` is not immediately followed
    /// by the third `}`. An ending delimiter that is never found at all
    /// before end-of-input is reported as `UnexpectedEof` instead (spec.md
    /// §8 scenario 6).
    #[error("expected the ending delimiter")]
    EndingDelimiterMismatch,
    #[error("reached end of input with an unclosed tag or section")]
    UnexpectedEof,
    #[error("encountered a close tag with no matching open section")]
    UnexpectedCloseSection,
    #[error("close tag identifier does not match its opening tag")]
    ClosingTagMismatch,
    #[error("input/output failure while reading the template source")]
    Io,
    /// Reserved for an allocation failure while growing the read buffer.
    /// Rust's global allocator aborts the process on exhaustion rather than
    /// returning an error here, so this is not currently raised; kept for
    /// parity with a hosting environment that surfaces allocation failure
    /// as a recoverable error.
    #[error("allocation failure while growing the read buffer")]
    Allocation,
    #[error("reader configuration is invalid for the configured delimiters")]
    InvalidReaderConfig,
}

/// A structured, positioned parse failure. Carries the detection site so
/// that callers can report precise diagnostics without re-scanning the
/// template themselves.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} at {line}:{col}{}", detail.as_ref().map(|d| format!(" ({d})")).unwrap_or_default())]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: u32,
    pub col: u32,
    pub detail: Option<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, line: u32, col: u32) -> Self {
        Self {
            kind,
            line,
            col,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn io(line: u32, col: u32, source: std::io::Error) -> Self {
        Self::new(ParseErrorKind::Io, line, col).with_detail(source.to_string())
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
