use crate::shared_types::DrawingEvent;

/// Ordered history of everything drawn in the session.
///
/// Not synchronized on its own: the relay keeps it behind the same lock as the
/// session registry, so a snapshot can never observe half of an update.
#[derive(Debug, Default)]
pub struct DrawingLog {
    events: Vec<DrawingEvent>,
}

impl DrawingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: DrawingEvent) {
        self.events.push(event);
    }

    /// Drop the whole history.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Apply an inbound event: a clear truncates, anything else is appended.
    pub fn apply(&mut self, event: DrawingEvent) {
        if event.is_clear() {
            self.clear();
        } else {
            self.append(event);
        }
    }

    pub fn snapshot(&self) -> Vec<DrawingEvent> {
        self.events.clone()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_preserves_append_order() {
        let mut log = DrawingLog::new();
        let a = DrawingEvent::line((0, 0), (1, 1), "black", 2);
        let b = DrawingEvent::line((1, 1), (2, 2), "black", 2);
        log.apply(a.clone());
        log.apply(b.clone());
        assert_eq!(log.snapshot(), vec![a, b]);
    }

    #[test]
    fn clear_truncates_and_is_not_recorded() {
        let mut log = DrawingLog::new();
        for i in 0..5 {
            log.apply(DrawingEvent::line((i, i), (i + 1, i + 1), "red", 1));
        }
        assert_eq!(log.len(), 5);

        log.apply(DrawingEvent::Clear);
        assert!(log.is_empty());

        let after = DrawingEvent::line((7, 7), (8, 8), "green", 4);
        log.apply(after.clone());
        assert_eq!(log.snapshot(), vec![after]);
    }

    #[test]
    fn snapshot_is_detached_from_later_appends() {
        let mut log = DrawingLog::new();
        log.append(DrawingEvent::line((0, 0), (1, 0), "black", 1));
        let snap = log.snapshot();
        log.append(DrawingEvent::line((1, 0), (2, 0), "black", 1));
        assert_eq!(snap.len(), 1);
        assert_eq!(log.len(), 2);
    }
}
