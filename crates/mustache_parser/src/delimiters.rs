use crate::error::{ParseError, ParseErrorKind};

/// A start/end delimiter pair in force within a parsing level. Defaults to
/// `{{` / `}}`. Triple-mustache (`{{{ ... }}}`) is *not* represented here —
/// per the design's preferred resolution of the triple-mustache ambiguity,
/// it is always the literal `{{{`/`}}}` sequence regardless of the
/// configured pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    start: Box<str>,
    end: Box<str>,
}

impl Delimiters {
    pub fn new(start: impl Into<Box<str>>, end: impl Into<Box<str>>) -> Result<Self, ParseErrorKind> {
        let start = start.into();
        let end = end.into();
        if start.is_empty() || end.is_empty() {
            return Err(ParseErrorKind::InvalidDelimiters);
        }
        Ok(Self { start, end })
    }

    pub fn default_pair() -> Self {
        Self {
            start: Box::from("{{"),
            end: Box::from("}}"),
        }
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    pub fn is_default(&self) -> bool {
        self.start.as_ref() == "{{" && self.end.as_ref() == "}}"
    }

    /// `max(len(start), len(end)) + 1`. The `+1` accounts for the extra
    /// `{`/`}` that completes a triple-mustache tag.
    pub fn max_size(&self) -> usize {
        self.start.len().max(self.end.len()) + 1
    }

    pub fn set(&mut self, start: impl Into<Box<str>>, end: impl Into<Box<str>>) -> Result<(), ParseErrorKind> {
        *self = Self::new(start, end)?;
        Ok(())
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::default_pair()
    }
}

/// Parse the body of a `{{=A B=}}` tag into its two whitespace-separated
/// tokens. The body must end with `=`; the two tokens before it become the
/// new start/end delimiters.
///
/// Template content is otherwise-opaque bytes, and a delimiter pair is only
/// required to be non-empty, not valid UTF-8 — so the body is decoded here,
/// fallibly, rather than by a caller reaching for `BufferSlice::as_str()`
/// (which assumes valid UTF-8 and panics otherwise).
pub fn parse_delimiter_body(body: &[u8], line: u32, col: u32) -> Result<(Box<str>, Box<str>), ParseError> {
    let body = std::str::from_utf8(body).map_err(|_| {
        ParseError::new(ParseErrorKind::InvalidDelimiters, line, col)
            .with_detail("delimiter change tag body must be valid UTF-8")
    })?;
    let body = body.trim();
    let body = body.strip_suffix('=').ok_or_else(|| {
        ParseError::new(ParseErrorKind::InvalidDelimiters, line, col)
            .with_detail("delimiter change tag must end with '='")
    })?;
    let mut tokens = body.split_whitespace();
    let start = tokens.next().ok_or_else(|| {
        ParseError::new(ParseErrorKind::InvalidDelimiters, line, col)
            .with_detail("missing starting delimiter")
    })?;
    let end = tokens.next().ok_or_else(|| {
        ParseError::new(ParseErrorKind::InvalidDelimiters, line, col)
            .with_detail("missing ending delimiter")
    })?;
    if tokens.next().is_some() {
        return Err(ParseError::new(ParseErrorKind::InvalidDelimiters, line, col)
            .with_detail("expected exactly two tokens"));
    }
    if start.is_empty() || end.is_empty() {
        return Err(ParseError::new(ParseErrorKind::InvalidDelimiters, line, col));
    }
    Ok((Box::from(start), Box::from(end)))
}
