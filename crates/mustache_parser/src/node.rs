use crate::buffer::BufferSlice;
use crate::delimiters::Delimiters;
use crate::part::{PartType, TextPart};

/// One entry in the arena-indexed output tree. There are no parent
/// pointers: a node's children are the `children_count` nodes immediately
/// following it in the arena, so the tree is a flat `Vec<Node>` with an
/// implicit structure recoverable by walking `children_count` recursively.
/// This avoids the `Rc`-cycle hazard a parent-pointer tree would invite and
/// matches the arena layout the design specifies for the output.
#[derive(Debug, Clone)]
pub struct Node {
    pub index: usize,
    pub part_type: PartType,
    /// The tag's identifier, absent for `StaticText`, `Comment`, and
    /// `Delimiters` nodes.
    pub identifier: Option<BufferSlice>,
    pub text_part: TextPart,
    /// Number of nodes in the arena, immediately following this one, that
    /// form this node's subtree. Zero for leaves.
    pub children_count: usize,
    /// The delimiter pair that was in force when a `Delimiters` tag was
    /// parsed, so a renderer (or a debugging consumer) can see exactly what
    /// changed without re-deriving it from sibling state.
    pub optional_delimiters: Option<Delimiters>,
    /// Captured source text between a section's open tag and its matching
    /// close tag, present only when lambda inner-text capture is enabled
    /// and the node is a `Section`/`InvertedSection`/`Block`/`Parent`.
    pub optional_inner_text: Option<BufferSlice>,
}

impl Node {
    pub fn new(index: usize, part_type: PartType, text_part: TextPart) -> Self {
        Self {
            index,
            part_type,
            identifier: None,
            text_part,
            children_count: 0,
            optional_delimiters: None,
            optional_inner_text: None,
        }
    }
}
