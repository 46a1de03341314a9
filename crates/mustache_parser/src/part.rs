use crate::buffer::BufferSlice;

/// The tag classification assigned to a scanned [`TextPart`]. Identifier
/// parsing, standalone-eligibility, and rendering hints are total functions
/// over this sum (see `PartType::can_stand_alone`).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum PartType {
    StaticText,
    Interpolation,
    /// Triple-mustache, `{{{x}}}`.
    Raw,
    /// `{{&x}}`, unescaped via the alternate syntax.
    Unescaped,
    Comment,
    Section,
    InvertedSection,
    CloseSection,
    Partial,
    Parent,
    Block,
    Delimiters,
}

impl PartType {
    /// Whether a tag of this type is allowed to be the sole non-whitespace
    /// content on its line and thereby trigger the standalone-trim rule.
    /// Static text can "stand alone" too in the sense that it never blocks
    /// trimming the way a leaf expression tag does; see
    /// `TreeBuilder::trim_stand_alone`, which treats static text with
    /// `preserve` right-trim as a blocking predecessor directly rather than
    /// going through this function.
    pub fn can_stand_alone(self) -> bool {
        matches!(
            self,
            PartType::Comment
                | PartType::Section
                | PartType::InvertedSection
                | PartType::CloseSection
                | PartType::Partial
                | PartType::Parent
                | PartType::Block
                | PartType::Delimiters
        )
    }

    /// Whether this tag opens a new nesting level that the tree builder
    /// must push, matched by a corresponding `CloseSection`.
    pub fn opens_level(self) -> bool {
        matches!(
            self,
            PartType::Section | PartType::InvertedSection | PartType::Parent | PartType::Block
        )
    }

    /// Whether this tag requires exactly one identifier token in its body.
    pub fn requires_identifier(self) -> bool {
        !matches!(self, PartType::StaticText | PartType::Comment | PartType::Delimiters)
    }
}

/// The trimming state attached to the left and right edges of a
/// static-text part, computed by the [`crate::trimmer::Trimmer`] and
/// resolved by the tree builder's standalone-trim pass.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TrimIndex {
    /// This edge can never be trimmed (non-whitespace content reaches it).
    Preserve,
    /// This edge may be trimmed at `index` within the part's content,
    /// pending confirmation from a neighboring tag that the surrounding
    /// line is truly standalone.
    Allow { index: usize, is_standalone: bool },
    /// This edge has already been trimmed.
    Trimmed,
}

impl TrimIndex {
    pub fn is_preserve(self) -> bool {
        matches!(self, TrimIndex::Preserve)
    }

    pub fn is_trimmed(self) -> bool {
        matches!(self, TrimIndex::Trimmed)
    }

    /// An `Allow` value whose standalone flag is set, used when checking
    /// whether a predecessor permits trimming.
    pub fn allows_standalone(self) -> bool {
        matches!(self, TrimIndex::Allow { is_standalone: true, .. })
    }
}

/// One coarse fragment produced by the scanner: either the literal text
/// between two tags, or the body of a single tag. `content` never includes
/// the delimiters themselves.
#[derive(Debug, Clone)]
pub struct TextPart {
    pub part_type: PartType,
    pub is_stand_alone: bool,
    pub content: BufferSlice,
    /// Indentation captured from a trimmed predecessor, attached to
    /// `partial`/`parent` tags so renderers can re-indent every inserted
    /// line.
    pub indentation: Option<BufferSlice>,
    pub line: u32,
    pub col: u32,
    pub left_trim: TrimIndex,
    pub right_trim: TrimIndex,
}

impl TextPart {
    pub fn new(part_type: PartType, content: BufferSlice, line: u32, col: u32) -> Self {
        Self {
            part_type,
            is_stand_alone: false,
            content,
            indentation: None,
            line,
            col,
            left_trim: TrimIndex::Preserve,
            right_trim: TrimIndex::Preserve,
        }
    }
}
