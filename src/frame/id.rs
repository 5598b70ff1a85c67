//! Frame token handed to the presentation layer.

use std::fmt;

/// Identifies the frame currently held in the slot.
///
/// The only contract is that the value changes if and only if a new frame
/// became current, so a presenter can skip re-fetching an unchanged frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FrameId(u64);

impl FrameId {
    /// Token in effect before any frame has been received.
    pub const PLACEHOLDER: FrameId = FrameId(0);

    /// Returns the token for the next frame.
    #[must_use]
    pub fn next(self) -> Self {
        FrameId(self.0 + 1)
    }

    /// Number of frames applied to the slot so far.
    pub fn count(self) -> u64 {
        self.0
    }

    /// True before any frame has been applied.
    pub fn is_placeholder(self) -> bool {
        self == Self::PLACEHOLDER
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_placeholder() {
            f.write_str("placeholder")
        } else {
            write!(f, "frame_{}", self.0)
        }
    }
}
