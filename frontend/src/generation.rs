/// Tags async work with the state it was started for. Bumping the counter
/// makes every earlier tag stale, so late responses can be dropped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

impl Generation {
    /// Invalidates outstanding work and returns the new current tag.
    pub fn bump(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    pub fn current(self) -> u64 {
        self.0
    }

    pub fn is_current(self, tag: u64) -> bool {
        self.0 == tag
    }
}
