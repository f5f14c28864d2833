use serde::{Deserialize, Serialize};

/// Selection over document positions, spanning `[from, to)`
///
/// `anchor` is where the selection started, `head` where it ends; either may
/// be the larger one. `anchor == head` is a plain cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn cursor(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Keep both ends within `[0, max]`
    pub fn clamp(self, max: usize) -> Self {
        Self::new(self.anchor.min(max), self.head.min(max))
    }
}
