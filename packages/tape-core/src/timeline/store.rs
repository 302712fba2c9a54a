//! Shared timeline snapshot.

use std::sync::Arc;

use parking_lot::RwLock;

use super::Timeline;

/// Holds the timeline currently used for resolution.
///
/// Readers take an `Arc` snapshot and resolve against it without holding the
/// lock; [`install`](Self::install) swaps in a fully built timeline in one
/// step, so a sample never sees a half-built timeline.
#[derive(Debug, Default)]
pub struct TimelineStore {
    current: RwLock<Arc<Timeline>>,
}

impl TimelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<Timeline> {
        self.current.read().clone()
    }

    /// Replaces the current timeline, returning the previous one.
    pub fn install(&self, timeline: Timeline) -> Arc<Timeline> {
        std::mem::replace(&mut *self.current.write(), Arc::new(timeline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::test_support::album;

    #[test]
    fn starts_empty() {
        assert!(TimelineStore::new().snapshot().is_empty());
    }

    #[test]
    fn old_snapshot_survives_install() {
        let store = TimelineStore::new();
        store.install(Timeline::new(vec![album("a", 0, 2)]));
        let before = store.snapshot();

        let previous = store.install(Timeline::new(vec![album("b", 10, 1)]));

        assert_eq!(before.albums()[0].id, "a");
        assert!(Arc::ptr_eq(&before, &previous));
        assert_eq!(store.snapshot().albums()[0].id, "b");
    }
}
