use crate::part::TrimIndex;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum LeftState {
    Scanning,
    NotFound,
    Found(usize),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum RightState {
    Waiting,
    NotFound,
    Found(usize),
}

/// A single-pass state machine attached to the scanner for the duration of
/// scanning one static-text part. It computes, as the part's bytes are
/// consumed one at a time, whether the part's left and right edges are
/// eligible for standalone-line trimming.
///
/// The scanner calls [`Trimmer::consume`] once per byte of the part (in
/// source order) and reads the result back via [`Trimmer::left_trim`] /
/// [`Trimmer::right_trim`] once the part is fully collected.
#[derive(Debug, Clone, Copy)]
pub struct Trimmer {
    left_lf: LeftState,
    right_lf: RightState,
}

impl Trimmer {
    pub fn new() -> Self {
        Self {
            left_lf: LeftState::Scanning,
            right_lf: RightState::Waiting,
        }
    }

    /// Feed the next byte of the part, at `index` bytes into the part's
    /// content (0-based).
    pub fn consume(&mut self, byte: u8, index: usize) {
        match byte {
            b'\n' => {
                if self.left_lf == LeftState::Scanning {
                    self.left_lf = LeftState::Found(index);
                }
                self.right_lf = RightState::Found(index);
            }
            b'\r' => {
                // CR alone never blocks trimming and never itself counts as
                // the line break; only the paired/following LF does.
            }
            b'\t' | b' ' | 0 => {
                // Inline whitespace does not block trimming on either edge.
            }
            _ => {
                if self.left_lf == LeftState::Scanning {
                    self.left_lf = LeftState::NotFound;
                }
                self.right_lf = RightState::NotFound;
            }
        }
    }

    pub fn left_trim(&self) -> TrimIndex {
        match self.left_lf {
            LeftState::Found(i) => TrimIndex::Allow { index: i, is_standalone: true },
            LeftState::NotFound | LeftState::Scanning => TrimIndex::Preserve,
        }
    }

    pub fn right_trim(&self) -> TrimIndex {
        if self.left_lf == LeftState::Scanning {
            // The part contains only whitespace (no LF seen at all, and no
            // non-whitespace byte either); it may still be trimmed if a
            // later tag turns out to make the line standalone.
            return TrimIndex::Allow { index: 0, is_standalone: false };
        }
        match self.right_lf {
            RightState::Found(j) => TrimIndex::Allow { index: j + 1, is_standalone: true },
            RightState::Waiting | RightState::NotFound => TrimIndex::Preserve,
        }
    }
}

impl Default for Trimmer {
    fn default() -> Self {
        Self::new()
    }
}
