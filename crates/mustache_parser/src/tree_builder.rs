use crate::buffer::BufferSlice;
use crate::delimiters::{parse_delimiter_body, Delimiters};
use crate::error::{ParseError, ParseErrorKind};
use crate::node::Node;
use crate::part::{PartType, TextPart, TrimIndex};
use crate::scanner::{trim_left, trim_right, Scanner};

/// A single frame of the level stack, pushed on `section`/`inverted_section`
/// /`parent`/`block` and popped on the matching `close_section`. The root
/// frame (`node_index = None`) is created once, at construction, and is
/// never popped.
struct Level {
    delimiters: Delimiters,
    node_index: Option<usize>,
    part_type: Option<PartType>,
    identifier: Option<BufferSlice>,
}

impl Level {
    fn root(delimiters: Delimiters) -> Self {
        Self {
            delimiters,
            node_index: None,
            part_type: None,
            identifier: None,
        }
    }
}

/// Consumes [`TextPart`]s from a [`Scanner`] and assembles them into the
/// flat, arena-indexed [`Node`] list described in the design: no parent
/// pointers, a node's subtree is the `children_count` nodes immediately
/// following it.
pub struct TreeBuilder {
    arena: Vec<Node>,
    levels: Vec<Level>,
    capture_lambda_inner_text: bool,
    trim_standalone_lines: bool,
    next_index: usize,
}

/// What a single pull from the builder produced, so the parser can decide
/// whether to keep pulling (cached mode) or hand a batch back to the caller
/// (streamed mode).
pub enum BuilderStep {
    /// A node was appended (and possibly a predecessor's right edge was
    /// just trimmed); nothing to flush yet.
    Continue,
    /// The scanner reached end of input with the root level intact. The
    /// caller should apply `trim_last` and finish.
    Eos,
    /// A standalone static-text node at the root triggered a streamed-mode
    /// flush. The returned nodes are the completed batch; the builder has
    /// already reset its arena with the triggering node as the sole
    /// survivor.
    Flush(Vec<Node>),
}

impl TreeBuilder {
    pub fn new(delimiters: Delimiters, capture_lambda_inner_text: bool, trim_standalone_lines: bool) -> Self {
        Self {
            arena: Vec::new(),
            levels: vec![Level::root(delimiters)],
            capture_lambda_inner_text,
            trim_standalone_lines,
            next_index: 0,
        }
    }

    pub fn is_at_root(&self) -> bool {
        self.levels.len() == 1
    }

    fn current_level(&self) -> &Level {
        self.levels.last().expect("root level is never popped")
    }

    fn alloc_index(&mut self) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    fn push_node(&mut self, part_type: PartType, text_part: TextPart) -> usize {
        let index = self.alloc_index();
        self.arena.push(Node::new(index, part_type, text_part));
        index
    }

    /// Pull one part from `scanner` and fold it into the arena. Returns
    /// `Ok(BuilderStep::Eos)` once the scanner is exhausted with the level
    /// stack back at the root.
    ///
    /// `streaming` gates the early-flush behavior in
    /// [`Self::handle_static_text`]: per the design, "in cached mode the
    /// whole node list is returned when end-of-input is reached; in
    /// streamed mode, any standalone static-text node at the root level
    /// flushes the preceding nodes as a batch". The split only happens
    /// when the caller asked for it — `Parser::parse` always passes
    /// `false` so the arena accumulates the whole tree in one piece, while
    /// `Parser::next_batch` passes `true`.
    pub fn step(&mut self, scanner: &mut Scanner, streaming: bool) -> Result<BuilderStep, ParseError> {
        let Some(part) = scanner.next()? else {
            if !self.is_at_root() {
                let (line, col) = scanner.position();
                return Err(ParseError::new(ParseErrorKind::UnexpectedEof, line, col)
                    .with_detail("reached end of input with an unclosed section"));
            }
            return Ok(BuilderStep::Eos);
        };

        match part.part_type {
            PartType::StaticText => self.handle_static_text(part, streaming),
            PartType::Delimiters => self.handle_delimiters(scanner, part).map(|()| BuilderStep::Continue),
            PartType::Comment => {
                self.push_node(PartType::Comment, part);
                Ok(BuilderStep::Continue)
            }
            part_type if part_type.opens_level() => self.handle_open(scanner, part),
            PartType::CloseSection => self.handle_close(scanner, part),
            part_type => {
                debug_assert!(part_type.requires_identifier(), "leaf tag dispatch only handles identifier-bearing parts");
                let identifier = extract_identifier(&part)?;
                let index = self.push_node(part_type, part);
                self.arena[index].identifier = Some(identifier);
                Ok(BuilderStep::Continue)
            }
        }
    }

    fn handle_static_text(&mut self, part: TextPart, streaming: bool) -> Result<BuilderStep, ParseError> {
        // Stray text directly inside a `parent` tag (not inside a nested
        // `block`) carries no meaning; only block overrides matter there.
        if self.current_level().part_type == Some(PartType::Parent) {
            return Ok(BuilderStep::Continue);
        }

        let index = self.push_node(PartType::StaticText, part);
        if self.trim_standalone_lines {
            self.trim_stand_alone(index);
        }

        if streaming && self.is_at_root() {
            let left_trim = self.arena[index].text_part.left_trim;
            if !left_trim.is_preserve() {
                let mut popped = self.arena.pop().expect("just pushed");
                let batch = std::mem::take(&mut self.arena);
                self.next_index = 0;
                popped.index = self.alloc_index();
                self.arena.push(popped);
                return Ok(BuilderStep::Flush(batch));
            }
        }
        Ok(BuilderStep::Continue)
    }

    fn handle_delimiters(&mut self, scanner: &mut Scanner, part: TextPart) -> Result<(), ParseError> {
        let (start, end) = parse_delimiter_body(part.content.as_bytes(), part.line, part.col)?;
        scanner
            .set_delimiters(&start, &end)
            .map_err(|kind| ParseError::new(kind, part.line, part.col))?;
        self.levels
            .last_mut()
            .expect("root level is never popped")
            .delimiters
            .set(start, end)
            .map_err(|kind| ParseError::new(kind, part.line, part.col))?;

        let mut node_part = part;
        node_part.is_stand_alone = PartType::Delimiters.can_stand_alone();
        let delimiters = self.current_level().delimiters.clone();
        let index = self.push_node(PartType::Delimiters, node_part);
        self.arena[index].optional_delimiters = Some(delimiters);
        Ok(())
    }

    fn handle_open(&mut self, scanner: &mut Scanner, part: TextPart) -> Result<BuilderStep, ParseError> {
        let part_type = part.part_type;
        let identifier = extract_identifier(&part)?;
        let index = self.push_node(part_type, part);
        self.arena[index].identifier = Some(identifier.clone());

        if self.capture_lambda_inner_text {
            scanner.push_bookmark(Some(index as u32));
        }

        self.levels.push(Level {
            delimiters: self.current_level().delimiters.clone(),
            node_index: Some(index),
            part_type: Some(part_type),
            identifier: Some(identifier),
        });
        Ok(BuilderStep::Continue)
    }

    fn handle_close(&mut self, scanner: &mut Scanner, part: TextPart) -> Result<BuilderStep, ParseError> {
        if self.is_at_root() {
            return Err(ParseError::new(ParseErrorKind::UnexpectedCloseSection, part.line, part.col));
        }
        let identifier = extract_identifier(&part)?;

        let level = self.levels.pop().expect("checked not at root");
        let opener_identifier = level.identifier.expect("non-root level always has an identifier");
        if opener_identifier.as_bytes() != identifier.as_bytes() {
            return Err(ParseError::new(ParseErrorKind::ClosingTagMismatch, part.line, part.col).with_detail(
                format!(
                    "expected closing tag for '{}'",
                    String::from_utf8_lossy(opener_identifier.as_bytes())
                ),
            ));
        }

        let open_index = level.node_index.expect("non-root level always has a node");
        let close_index = self.push_node(PartType::CloseSection, part);
        self.arena[open_index].children_count = close_index - open_index;

        if self.capture_lambda_inner_text {
            let (bookmark, inner_text) = scanner.pop_bookmark();
            debug_assert_eq!(
                bookmark.prev_node_index,
                Some(open_index as u32),
                "bookmark stack desynchronized from the level stack"
            );
            self.arena[open_index].optional_inner_text = Some(inner_text);
        }

        // Restore the parent level's delimiters, in case a `delimiters` tag
        // changed them while this level was open.
        let parent = self.current_level();
        scanner
            .set_delimiters(parent.delimiters.start(), parent.delimiters.end())
            .expect("delimiters already validated when they were first set");

        Ok(BuilderStep::Continue)
    }

    /// Resolve `node.text_part.left_trim` by walking backward through
    /// standalone-eligible predecessors until it finds a static-text node
    /// (or the start of input) that permits trimming, per the design's
    /// `trimStandAlone`.
    fn trim_stand_alone(&mut self, index: usize) {
        if !matches!(self.arena[index].text_part.left_trim, TrimIndex::Allow { .. }) {
            return;
        }
        if self.permits_trim_before(index) {
            trim_left(&mut self.arena[index].text_part);
        } else {
            self.arena[index].text_part.left_trim = TrimIndex::Preserve;
        }
    }

    fn permits_trim_before(&mut self, index: usize) -> bool {
        if index == 0 {
            return true;
        }
        let prev_index = index - 1;
        match self.arena[prev_index].part_type {
            PartType::StaticText => match self.arena[prev_index].text_part.right_trim {
                TrimIndex::Trimmed => true,
                TrimIndex::Allow { is_standalone: true, .. } => {
                    if let Some(tail) = trim_right(&mut self.arena[prev_index].text_part) {
                        self.arena[index].text_part.indentation = Some(tail);
                    }
                    true
                }
                // A pure-whitespace part with no internal LF doesn't yet
                // know whether it sits on a standalone line; that depends
                // on whatever precedes *it*, exactly like a can-stand-alone
                // tag. Recurse rather than blocking outright.
                TrimIndex::Allow { is_standalone: false, .. } => {
                    if self.permits_trim_before(prev_index) {
                        if let Some(tail) = trim_right(&mut self.arena[prev_index].text_part) {
                            self.arena[index].text_part.indentation = Some(tail);
                        }
                        true
                    } else {
                        false
                    }
                }
                TrimIndex::Preserve => false,
            },
            part_type if part_type.can_stand_alone() => {
                let permitted = self.permits_trim_before(prev_index);
                // `prev_index` may itself be a bridge (e.g. a second
                // standalone tag chained directly after a partial with no
                // static text between them); forward whatever indentation
                // it just picked up so the whole chain shares it, not just
                // the tag immediately after the indentation whitespace.
                if permitted {
                    if let Some(indentation) = self.arena[prev_index].text_part.indentation.clone() {
                        self.arena[index].text_part.indentation = Some(indentation);
                    }
                }
                permitted
            }
            _ => false,
        }
    }

    /// End-of-input cleanup: if the last static-text node is followed only
    /// by standalone-eligible tags (or nothing), its trailing whitespace is
    /// eligible for trimming even though no later static-text node will
    /// ever arrive to trigger it via `permits_trim_before`.
    pub fn trim_last(&mut self) {
        if !self.trim_standalone_lines {
            return;
        }
        let Some(last_static) = self.arena.iter().rposition(|n| n.part_type == PartType::StaticText) else {
            return;
        };
        let trailing = &self.arena[last_static + 1..];
        // A node with nothing after it at all has no tag to be standalone
        // with; its trailing whitespace is left untouched (spec.md §8:
        // "Template with only whitespace: ... preserve on both sides").
        let trailing_all_standalone = !trailing.is_empty() && trailing.iter().all(|n| n.part_type.can_stand_alone());
        if trailing_all_standalone {
            trim_right(&mut self.arena[last_static].text_part);
        }
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.arena
    }

    pub fn nodes(&self) -> &[Node] {
        &self.arena
    }
}

/// Whitespace/tab-tokenize a tag body into exactly one identifier token.
fn extract_identifier(part: &TextPart) -> Result<BufferSlice, ParseError> {
    let bytes = part.content.as_bytes();
    let is_sep = |b: u8| b == b' ' || b == b'\t';

    let mut start = 0;
    while start < bytes.len() && is_sep(bytes[start]) {
        start += 1;
    }
    let mut end = bytes.len();
    while end > start && is_sep(bytes[end - 1]) {
        end -= 1;
    }
    if start >= end {
        return Err(ParseError::new(ParseErrorKind::InvalidIdentifier, part.line, part.col));
    }
    for &b in &bytes[start..end] {
        if is_sep(b) {
            return Err(ParseError::new(ParseErrorKind::InvalidIdentifier, part.line, part.col)
                .with_detail("identifier must be a single whitespace-free token"));
        }
    }
    Ok(part.content.clone().split_at(end).0.split_at(start).1)
}
