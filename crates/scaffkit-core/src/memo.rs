//! Free-floating memo annotations.

use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Unique identifier for memos.
pub type MemoId = Uuid;

/// Default memo size when created without explicit dimensions.
pub const DEFAULT_MEMO_SIZE: Size = Size::new(160.0, 80.0);

/// A free-floating text annotation, independent of any part or group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memo {
    pub id: MemoId,
    /// Top-left corner in drawing-space units.
    pub position: Point,
    /// Stored dimensions of the memo box.
    pub size: Size,
    pub text: String,
    /// Creation time, epoch milliseconds.
    pub created_at_ms: u64,
    /// Last modification time, epoch milliseconds.
    pub updated_at_ms: u64,
}

impl Memo {
    /// Create a new memo at a position with default size.
    pub fn new(position: Point, text: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            id: Uuid::new_v4(),
            position,
            size: DEFAULT_MEMO_SIZE,
            text: text.into(),
            created_at_ms: now,
            updated_at_ms: now,
        }
    }

    /// Set the size.
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    /// Record a modification, bumping `updated_at_ms`.
    pub fn touch(&mut self) {
        self.updated_at_ms = now_ms();
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memo_creation() {
        let memo = Memo::new(Point::new(10.0, 20.0), "check joint spacing");
        assert_eq!(memo.text, "check joint spacing");
        assert_eq!(memo.created_at_ms, memo.updated_at_ms);
        assert_eq!(memo.size, DEFAULT_MEMO_SIZE);
    }

    #[test]
    fn test_touch_bumps_updated() {
        let mut memo = Memo::new(Point::ZERO, "m");
        let created = memo.created_at_ms;
        memo.touch();
        assert!(memo.updated_at_ms >= created);
    }
}
