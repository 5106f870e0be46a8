/// One scheduling turn of the host event loop.
///
/// Work requested during turn `n` (tile draws, redraws after a selection
/// change) runs when the host advances to the next turn, so a burst of
/// updates inside one turn coalesces into a single paint.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Turn {
    /// 0-based turn index.
    pub index: u64,
}

impl Turn {
    pub fn new(index: u64) -> Self {
        Self { index }
    }

    pub fn next(self) -> Self {
        Self::new(self.index.wrapping_add(1))
    }
}
