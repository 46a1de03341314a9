use crate::buffer::BufferHandle;
use crate::delimiters::Delimiters;
use crate::error::{ParseError, ParseErrorKind};
use crate::part::{PartType, TextPart, TrimIndex};
use crate::reader::Reader;
use crate::trimmer::Trimmer;

/// The scanner's own state, simplified from the per-byte automaton in the
/// design down to its two observable phases: either it is still looking
/// for the next tag, or it has already located one and is ready to resolve
/// and emit its body. Both the `matching_open`/`produce_open` states and
/// the `matching_close`/`produce_close` states collapse into `TagFound`,
/// since nothing outside the scanner can observe the difference between
/// "just matched the open delimiter" and "about to match the close
/// delimiter" — only the parts that come out of `next` are observable.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum ScanState {
    Scanning,
    TagFound,
    Eos,
}

/// Streaming tokenizer producing coarse [`TextPart`]s separated by tag
/// delimiters, with source-position tracking and a pull-driven protocol
/// suitable for sources larger than memory (see [`crate::reader::Reader`]).
pub struct Scanner {
    reader: Box<dyn Reader>,
    delimiters: Delimiters,
    buffer: BufferHandle,
    /// True once the reader itself has reported end-of-source; the scanner
    /// may still have unconsumed bytes in `buffer` after this is set.
    reader_eof: bool,
    state: ScanState,
    /// Index into `buffer` marking the start of the pending part.
    block_index: usize,
    /// Index into `buffer` where the most recently matched starting
    /// delimiter began; doubles as the end boundary of the static text
    /// preceding it and, for lambda capture, the end of an enclosing
    /// section's inner text.
    last_starting_mark: usize,
    /// Current scan position into `buffer`.
    position: usize,
    /// Source position (line, col) corresponding to `block_index`.
    block_line: u32,
    block_col: u32,
    /// Tag start located by the `Scanning` phase, consumed by `TagFound`.
    pending_tag_start: usize,
    pending_tag_is_raw: bool,
    /// Stack of lambda-capture bookmarks, pushed/popped by the tree builder
    /// on section/block/parent open and close. Kept here (rather than in
    /// the tree builder) so that compaction can rebase every open
    /// bookmark's `text_index` the same way it rebases `block_index` and
    /// `last_starting_mark` — a bookmark may span many read buffers.
    bookmarks: Vec<Bookmark>,
}

/// A single lambda-capture bookmark. `text_index` is the buffer offset
/// where the bookmarked span begins; `prev_node_index` is the arena index
/// of the node the tree builder had just pushed when it opened the
/// bookmark (the section/inverted-section/parent/block's own open node),
/// checked against the level stack when the bookmark is popped to catch
/// the two stacks drifting out of sync with each other.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Bookmark {
    pub prev_node_index: Option<u32>,
    pub text_index: usize,
}

impl Scanner {
    pub fn new(reader: Box<dyn Reader>, delimiters: Delimiters) -> Result<Self, ParseError> {
        let mut scanner = Self {
            reader,
            delimiters,
            buffer: BufferHandle::from_static(b""),
            reader_eof: false,
            state: ScanState::Scanning,
            block_index: 0,
            last_starting_mark: 0,
            position: 0,
            block_line: 1,
            block_col: 1,
            pending_tag_start: 0,
            pending_tag_is_raw: false,
            bookmarks: Vec::new(),
        };
        scanner.fill(b"")?;
        Ok(scanner)
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    /// The scanner's current source position, used by callers to position
    /// an error detected after the scanner itself has been exhausted (e.g.
    /// an unclosed section discovered only once `next` returns `None`).
    pub fn position(&self) -> (u32, u32) {
        (self.block_line, self.block_col)
    }

    pub fn set_delimiters(&mut self, start: &str, end: &str) -> Result<(), ParseErrorKind> {
        self.delimiters.set(start, end)
    }

    /// Push a lambda-capture bookmark at the start of the content that
    /// follows the tag just emitted (i.e. `block_index`). Called by the
    /// tree builder when it opens a section/inverted-section/parent/block
    /// node, passing that node's own arena index as `prev_node_index`.
    pub fn push_bookmark(&mut self, prev_node_index: Option<u32>) {
        self.bookmarks.push(Bookmark {
            prev_node_index,
            text_index: self.block_index,
        });
    }

    /// Pop the innermost open bookmark and return it alongside the
    /// inner-text slice `[text_index, tag_start)`, where `tag_start` is the
    /// start of the close tag currently being processed. Called by the tree
    /// builder when it resolves a `close_section` node.
    pub fn pop_bookmark(&mut self) -> (Bookmark, crate::buffer::BufferSlice) {
        let bookmark = self.bookmarks.pop().expect("close_section without a matching open bookmark");
        let slice = self.buffer.slice(bookmark.text_index..self.last_starting_mark);
        (bookmark, slice)
    }

    fn fill(&mut self, prepend: &[u8]) -> Result<(), ParseError> {
        let result = self.reader.read(prepend)?;
        self.buffer = result.buffer;
        self.reader_eof = result.eof;
        Ok(())
    }

    /// Relocate still-needed bytes to the front of a fresh buffer and pull
    /// more bytes from the reader, rebasing every live index by the amount
    /// dropped from the front. Mirrors the design's `preserve_offset =
    /// min(block_index, last_starting_mark)` rule, additionally bounded by
    /// any open lambda bookmark.
    fn compact_and_fill(&mut self) -> Result<(), ParseError> {
        if self.reader_eof {
            return Ok(());
        }
        let mut preserve_offset = self.block_index.min(self.last_starting_mark);
        if let Some(oldest) = self.bookmarks.first() {
            preserve_offset = preserve_offset.min(oldest.text_index);
        }
        let prepend = self.buffer.as_bytes()[preserve_offset..].to_vec();
        self.fill(&prepend)?;

        self.position -= preserve_offset;
        self.block_index -= preserve_offset;
        self.last_starting_mark -= preserve_offset;
        self.pending_tag_start -= preserve_offset;
        for bookmark in self.bookmarks.iter_mut() {
            bookmark.text_index -= preserve_offset;
        }
        Ok(())
    }

    fn content(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    /// Find the next occurrence of `needle` at or after `from`, pulling
    /// more input as needed. Returns `None` only once the reader is
    /// exhausted and no occurrence exists in the remaining buffer.
    fn find_from(&mut self, needle: &[u8], from: usize) -> Result<Option<usize>, ParseError> {
        loop {
            if let Some(idx) = memchr::memmem::find(&self.content()[from..], needle) {
                return Ok(Some(from + idx));
            }
            if self.reader_eof {
                return Ok(None);
            }
            self.compact_and_fill()?;
        }
    }

    /// Ensure at least one more byte is available after `at`, growing the
    /// buffer if necessary. Returns the byte, or `None` at true EOF.
    fn byte_after(&mut self, at: usize) -> Result<Option<u8>, ParseError> {
        loop {
            if at < self.content().len() {
                return Ok(Some(self.content()[at]));
            }
            if self.reader_eof {
                return Ok(None);
            }
            self.compact_and_fill()?;
        }
    }

    /// Advance `(line, col)` across `content[from..to]`.
    fn advance_position(&mut self, from: usize, to: usize) {
        for &b in &self.content()[from..to] {
            if b == b'\n' {
                self.block_line += 1;
                self.block_col = 1;
            } else {
                self.block_col += 1;
            }
        }
    }

    fn build_static_text_part(&mut self, start: usize, end: usize) -> TextPart {
        let start_line = self.block_line;
        let start_col = self.block_col;

        let mut trimmer = Trimmer::new();
        for (i, &b) in self.content()[start..end].iter().enumerate() {
            trimmer.consume(b, i);
        }
        self.advance_position(start, end);

        let mut part = TextPart::new(
            PartType::StaticText,
            self.buffer.slice(start..end),
            start_line,
            start_col,
        );
        part.left_trim = trimmer.left_trim();
        part.right_trim = trimmer.right_trim();
        part.is_stand_alone = false;
        part
    }

    fn build_trailing_static_text(&mut self) -> Option<TextPart> {
        let end = self.content().len();
        if self.block_index >= end {
            return None;
        }
        let part = self.build_static_text_part(self.block_index, end);
        self.block_index = end;
        Some(part)
    }

    /// Locate the next tag by searching for the current starting
    /// delimiter. Returns the buffer index at which the delimiter begins.
    fn find_next_tag_start(&mut self) -> Result<Option<usize>, ParseError> {
        let needle = self.delimiters.start().as_bytes().to_vec();
        self.find_from(&needle, self.position)
    }

    /// Resolve and emit the tag whose start was already located by
    /// `find_next_tag_start` (recorded in `pending_tag_start`).
    fn scan_tag_body(&mut self) -> Result<TextPart, ParseError> {
        let tag_line = self.block_line;
        let tag_col = self.block_col;
        let start_len = self.delimiters.start().len();
        let mut body_start = self.pending_tag_start + start_len;

        let indicator = self.byte_after(body_start)?;
        let part_type = match indicator {
            Some(b'!') => {
                body_start += 1;
                PartType::Comment
            }
            Some(b'#') => {
                body_start += 1;
                PartType::Section
            }
            Some(b'^') => {
                body_start += 1;
                PartType::InvertedSection
            }
            Some(b'/') => {
                body_start += 1;
                PartType::CloseSection
            }
            Some(b'>') => {
                body_start += 1;
                PartType::Partial
            }
            Some(b'<') => {
                body_start += 1;
                PartType::Parent
            }
            Some(b'$') => {
                body_start += 1;
                PartType::Block
            }
            Some(b'&') => {
                body_start += 1;
                PartType::Unescaped
            }
            Some(b'=') => {
                body_start += 1;
                PartType::Delimiters
            }
            // Per the design's preferred resolution of the triple-mustache
            // ambiguity (spec.md §9), the extension is always the literal
            // `{{{`/`}}}` sequence, never derived from custom delimiters —
            // so an extra `{` only introduces a raw tag while the active
            // start delimiter is still the literal default `{{`. Under a
            // custom pair, a leading `{` is just an ordinary identifier
            // character.
            Some(b'{') if self.delimiters.start() == "{{" => {
                body_start += 1;
                self.pending_tag_is_raw = true;
                PartType::Raw
            }
            _ => PartType::Interpolation,
        };

        // A delimiter-change tag's body must end with `=` immediately
        // before the ending delimiter (spec.md §4.4: "body must end with
        // '='"). Searching for the combined `=}}`-style needle, rather than
        // the bare ending delimiter, avoids mistaking an embedded copy of
        // the ending delimiter inside the new delimiter values themselves
        // for the tag's actual close — which is otherwise unavoidable when
        // a template resets delimiters to the value they already have.
        let is_delimiters_tag = part_type == PartType::Delimiters;
        let end_needle = if is_delimiters_tag {
            let mut needle = vec![b'='];
            needle.extend_from_slice(self.delimiters.end().as_bytes());
            needle
        } else {
            self.delimiters.end().as_bytes().to_vec()
        };
        // Reaching true EOF without ever finding the ending delimiter means
        // the template ended mid-tag; that is an unclosed tag, not a
        // mismatch (spec.md §8 scenario 6: `"{{tag1"` surfaces
        // `UnexpectedEof`, not `EndingDelimiterMismatch`).
        let match_start = self
            .find_from(&end_needle, body_start)?
            .ok_or_else(|| ParseError::new(ParseErrorKind::UnexpectedEof, tag_line, tag_col)
                .with_detail("reached end of input before the tag's ending delimiter"))?;
        // For delimiter-change tags the body includes the `=` the needle
        // starts with, but not the ending delimiter that follows it.
        let close_idx = if is_delimiters_tag { match_start + 1 } else { match_start };

        let mut tag_end = match_start + end_needle.len();
        if self.pending_tag_is_raw {
            match self.byte_after(tag_end)? {
                Some(b'}') => tag_end += 1,
                _ => {
                    return Err(ParseError::new(ParseErrorKind::EndingDelimiterMismatch, tag_line, tag_col)
                        .with_detail("triple-mustache tag missing its closing brace"));
                }
            }
        }

        let body = self.buffer.slice(body_start..close_idx);
        self.advance_position(self.block_index, tag_end);
        self.block_index = tag_end;
        self.position = tag_end;
        self.pending_tag_is_raw = false;

        let mut part = TextPart::new(part_type, body, tag_line, tag_col);
        part.is_stand_alone = part_type.can_stand_alone();
        Ok(part)
    }

    /// Pull the next part from the template. Returns `None` once the
    /// scanner reaches end of input; every call after that also returns
    /// `None`.
    pub fn next(&mut self) -> Result<Option<TextPart>, ParseError> {
        loop {
            match self.state {
                ScanState::Eos => return Ok(None),
                ScanState::Scanning => match self.find_next_tag_start()? {
                    None => {
                        let part = self.build_trailing_static_text();
                        self.state = ScanState::Eos;
                        return Ok(part);
                    }
                    Some(tag_start) => {
                        self.pending_tag_start = tag_start;
                        self.state = ScanState::TagFound;
                        if tag_start > self.block_index {
                            let part = self.build_static_text_part(self.block_index, tag_start);
                            self.last_starting_mark = tag_start;
                            self.block_index = tag_start;
                            self.position = tag_start;
                            return Ok(Some(part));
                        }
                        self.last_starting_mark = tag_start;
                    }
                },
                ScanState::TagFound => {
                    let part = self.scan_tag_body()?;
                    self.state = ScanState::Scanning;
                    return Ok(Some(part));
                }
            }
        }
    }
}

/// Applies `trimLeft`/`trimRight` to a collected static-text part, used by
/// the tree builder's standalone-trim resolution. Kept separate from
/// `Scanner` because trimming happens after the part has already been
/// handed to the tree builder and possibly compared against its siblings.
pub fn trim_left(part: &mut TextPart) {
    let TrimIndex::Allow { index, .. } = part.left_trim else {
        return;
    };
    let dropped_len = index + 1;
    let content = std::mem::replace(&mut part.content, crate::buffer::BufferSlice::empty());
    part.content = content.trim_front(dropped_len);
    part.left_trim = TrimIndex::Trimmed;
    if let TrimIndex::Allow { index: right_index, is_standalone } = part.right_trim {
        part.right_trim = TrimIndex::Allow {
            index: right_index.saturating_sub(dropped_len),
            is_standalone,
        };
    }
}

/// Truncates a static-text part's content to its right-trim index,
/// returning the trimmed tail as an indentation slice for the *next*
/// sibling, per the design's `trimRight`.
pub fn trim_right(part: &mut TextPart) -> Option<crate::buffer::BufferSlice> {
    let TrimIndex::Allow { index, .. } = part.right_trim else {
        return None;
    };
    let content = std::mem::replace(&mut part.content, crate::buffer::BufferSlice::empty());
    let (head, tail) = content.split_at(index);
    part.content = head;
    part.right_trim = TrimIndex::Trimmed;
    if tail.is_empty() {
        None
    } else {
        Some(tail)
    }
}
