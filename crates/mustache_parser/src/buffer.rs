//! The reference-counted buffer discipline described in the design: a
//! buffer is allocated once by the reader and shared, without copying, by
//! every slice that outlives the `next` call that produced it.
//!
//! `Rc<[u8]>` plays the role of the hand-rolled `{ counter, buffer }` pair
//! from the design: cloning a [`BufferHandle`] is the `ref` operation,
//! dropping one is `unref`, and `Rc::strong_count` exposes the live count
//! for diagnostics and tests without maintaining a separate counter by
//! hand. A buffer's last handle going out of scope frees it exactly once,
//! the same guarantee a manual counter would provide, for free.

use std::ops::Range;
use std::rc::Rc;

/// A shared, immutable read buffer. Cloning is O(1) and increments the
/// live reference count; see the module docs.
#[derive(Debug, Clone)]
pub struct BufferHandle {
    bytes: Rc<[u8]>,
}

impl BufferHandle {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Rc::from(bytes.into_boxed_slice()),
        }
    }

    /// A buffer that owns nothing and is shared by no one; used as the
    /// backing for string-mode text where ref counting is a no-op.
    pub fn from_static(bytes: &[u8]) -> Self {
        Self {
            bytes: Rc::from(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of live handles sharing this buffer, including this one.
    /// Equivalent to the design's `counter` field.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.bytes)
    }

    /// A slice borrowed from this buffer, holding its own handle so the
    /// buffer cannot be freed while the slice is alive.
    pub fn slice(&self, range: Range<usize>) -> BufferSlice {
        debug_assert!(
            range.end <= self.bytes.len(),
            "buffer slice {:?} out of bounds for buffer of length {}",
            range,
            self.bytes.len()
        );
        BufferSlice {
            handle: self.clone(),
            range,
        }
    }
}

/// A borrowed, ref-counted view into a [`BufferHandle`]. This is what
/// `TextPart` and `Node` actually store: it keeps the owning buffer alive
/// (the `ref` in the design) for as long as the slice itself is alive (the
/// `unref` happens on `Drop`).
#[derive(Debug, Clone)]
pub struct BufferSlice {
    handle: BufferHandle,
    range: Range<usize>,
}

impl BufferSlice {
    pub fn empty() -> Self {
        Self {
            handle: BufferHandle::from_static(b""),
            range: 0..0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.handle.as_bytes()[self.range.clone()]
    }

    /// The template's tag delimiters and identifiers are specified as ASCII
    /// subsequences of an otherwise-opaque byte stream (spec: "template
    /// contents are otherwise opaque bytes"), but downstream consumers want
    /// `&str` for the parts that matter. This performs a lossless
    /// conversion and panics on malformed UTF-8, which can only happen if
    /// the caller fed in a non-UTF-8 source — never as a result of where
    /// the scanner chose to split a slice, since splits only ever occur at
    /// ASCII delimiter bytes or already-validated line endings.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.as_bytes()).expect("template source must be valid UTF-8")
    }

    pub fn len(&self) -> usize {
        self.range.end - self.range.start
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn start(&self) -> usize {
        self.range.start
    }

    pub fn end(&self) -> usize {
        self.range.end
    }

    /// The number of handles (including this one) sharing the underlying
    /// buffer. Exposed for the ref-counting invariant in the design's
    /// testable properties.
    pub fn buffer_ref_count(&self) -> usize {
        self.handle.ref_count()
    }

    /// Drop the first `n` bytes from the front of this slice, used by
    /// `trimLeft` to remove the whitespace/newline prefix of a
    /// standalone-trimmed static-text part.
    #[must_use = "BufferSlice is immutable; the trimmed slice must replace the original"]
    pub fn trim_front(mut self, n: usize) -> Self {
        debug_assert!(n <= self.len(), "cannot trim {n} bytes from a {}-byte slice", self.len());
        self.range.start += n;
        self
    }

    /// Truncate this slice to its first `len` bytes, returning the
    /// trimmed-off tail as a second slice sharing the same buffer. Used by
    /// `trimRight` to split off the indentation tail for the next sibling.
    #[must_use = "BufferSlice is immutable; both halves of the split must be used"]
    pub fn split_at(self, len: usize) -> (Self, Self) {
        debug_assert!(len <= self.len());
        let split_point = self.range.start + len;
        let head = Self {
            handle: self.handle.clone(),
            range: self.range.start..split_point,
        };
        let tail = Self {
            handle: self.handle,
            range: split_point..self.range.end,
        };
        (head, tail)
    }
}

impl PartialEq for BufferSlice {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for BufferSlice {}
