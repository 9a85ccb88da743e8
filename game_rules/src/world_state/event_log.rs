//! Capped, ordered log of recent events.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::GameEvent;

/// Default number of events kept before the oldest is evicted.
pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// FIFO log of events. Insertion order is preserved and the oldest entry is
/// dropped once `capacity` is exceeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    events: VecDeque<GameEvent>,
    capacity: usize,
    /// Every event ever appended, including evicted ones.
    total_appended: u64,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            total_appended: 0,
        }
    }

    /// Append an event, returning the evicted one if the log was full.
    pub fn push(&mut self, event: GameEvent) -> Option<GameEvent> {
        self.events.push_back(event);
        self.total_appended += 1;
        if self.events.len() > self.capacity {
            self.events.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &GameEvent> + ExactSizeIterator {
        self.events.iter()
    }

    /// The last `n` entries, oldest first.
    pub fn last_n(&self, n: usize) -> impl Iterator<Item = &GameEvent> {
        self.events.iter().skip(self.events.len().saturating_sub(n))
    }

    /// The last `limit` entries matching `filter`, oldest first.
    pub fn matching<F>(&self, limit: usize, filter: F) -> Vec<&GameEvent>
    where
        F: Fn(&GameEvent) -> bool,
    {
        let mut found: Vec<_> = self
            .events
            .iter()
            .rev()
            .filter(|e| filter(e))
            .take(limit)
            .collect();
        found.reverse();
        found
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world_state::EventKind;

    fn event(action: &str) -> GameEvent {
        GameEvent::new(EventKind::PlayerAction, "player", action, "square")
    }

    #[test]
    fn test_eviction_keeps_newest_in_order() {
        let capacity = 5;
        let extra = 3;
        let mut log = EventLog::new(capacity);

        let mut evicted = Vec::new();
        for i in 0..capacity + extra {
            if let Some(old) = log.push(event(&format!("a{}", i))) {
                evicted.push(old.action);
            }
        }

        assert_eq!(log.len(), capacity);
        assert_eq!(evicted, vec!["a0", "a1", "a2"]);
        let survivors: Vec<_> = log.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(survivors, vec!["a3", "a4", "a5", "a6", "a7"]);
        assert_eq!(log.total_appended(), (capacity + extra) as u64);
    }

    #[test]
    fn test_last_n_and_matching() {
        let mut log = EventLog::new(10);
        for action in ["speak", "shout", "speak", "wave"] {
            log.push(event(action));
        }

        let last: Vec<_> = log.last_n(2).map(|e| e.action.as_str()).collect();
        assert_eq!(last, vec!["speak", "wave"]);
        assert_eq!(log.last_n(100).count(), 4);

        let speeches = log.matching(1, |e| e.action == "speak");
        assert_eq!(speeches.len(), 1);
        assert!(std::ptr::eq(speeches[0], log.iter().nth(2).unwrap()));
    }

    #[test]
    fn test_zero_capacity_is_bumped_to_one() {
        let mut log = EventLog::new(0);
        log.push(event("a"));
        log.push(event("b"));
        assert_eq!(log.len(), 1);
        assert_eq!(log.iter().next().unwrap().action, "b");
    }
}
