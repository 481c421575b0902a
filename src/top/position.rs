// src/top/position.rs
//
// One slow operation retained by a top tracker.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A slow operation: when it happened, how long it took and what it was.
///
/// Immutable once built. The description is shared, so cloning a position
/// (for snapshots and merges) never copies the text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    timestamp_ms: u64,
    latency_nanos: u64,
    description: Arc<str>,
}

impl Position {
    pub fn new(timestamp_ms: u64, latency_nanos: u64, description: impl Into<Arc<str>>) -> Self {
        Self {
            timestamp_ms,
            latency_nanos,
            description: description.into(),
        }
    }

    /// Build a position, cutting the description to `max_chars` characters.
    pub fn truncated(timestamp_ms: u64, latency_nanos: u64, description: String, max_chars: usize) -> Self {
        Self::new(timestamp_ms, latency_nanos, truncate_chars(description, max_chars))
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn latency_nanos(&self) -> u64 {
        self.latency_nanos
    }

    pub fn latency(&self) -> Duration {
        Duration::from_nanos(self.latency_nanos)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {} ms: {}", self.latency(), self.timestamp_ms, self.description)
    }
}

fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((cut, _)) = text.char_indices().nth(max_chars) {
        text.truncate(cut);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncation_counts_characters() {
        let position = Position::truncated(1, 2, "SELECT * FROM DUAL".to_string(), 6);
        assert_eq!(position.description(), "SELECT");

        // multi-byte characters are never split
        let position = Position::truncated(1, 2, "żółw żółw".to_string(), 3);
        assert_eq!(position.description(), "żół");
        assert_eq!(position.description().chars().count(), 3);
    }

    #[test]
    fn test_short_description_untouched() {
        let position = Position::truncated(1, 2, "abc".to_string(), 3);
        assert_eq!(position.description(), "abc");
        let position = Position::truncated(1, 2, String::new(), 0);
        assert_eq!(position.description(), "");
    }

    #[test]
    fn test_accessors() {
        let position = Position::new(1_000, 1_500_000, "query");
        assert_eq!(position.timestamp_ms(), 1_000);
        assert_eq!(position.latency(), Duration::from_micros(1_500));
        assert_eq!(position.to_string(), "1.5ms @ 1000 ms: query");
    }
}
