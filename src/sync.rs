use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_MOVE_DEBOUNCE: Duration = Duration::from_millis(150);

/// Coalesces rapid writes of the same record into one.
///
/// Every touch restarts the quiet period for that id; an id becomes due once
/// it has gone `window` without a touch. Time is passed in so callers (and
/// tests) control the clock.
#[derive(Debug, Clone)]
pub struct MoveDebouncer {
    window: Duration,
    pending: HashMap<String, Instant>,
}

impl Default for MoveDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_MOVE_DEBOUNCE)
    }
}

impl MoveDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    pub fn touch(&mut self, id: &str, now: Instant) {
        self.pending.insert(id.to_string(), now);
    }

    /// Remove and return the ids whose quiet period has elapsed
    pub fn due(&mut self, now: Instant) -> Vec<String> {
        let window = self.window;
        let mut ready: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, last)| now.saturating_duration_since(**last) >= window)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &ready {
            self.pending.remove(id);
        }
        ready.sort();
        ready
    }

    /// Remove and return every pending id regardless of timing
    pub fn drain_all(&mut self) -> Vec<String> {
        let mut ids: Vec<String> = self.pending.drain().map(|(id, _)| id).collect();
        ids.sort();
        ids
    }

    /// Forget an id, e.g. after it was written through by other means
    pub fn cancel(&mut self, id: &str) -> bool {
        self.pending.remove(id).is_some()
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
