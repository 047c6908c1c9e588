use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Order, OrderStatus, TimelineEntry};

pub const INITIAL_NOTE: &str = "Order created";
pub const DEFAULT_UPDATE_NOTE: &str = "Status updated";

/// Appends audit entries to an order's timeline.
///
/// Timestamps never go backwards: an entry recorded "before" the last one
/// (clock skew, coarse clocks) is clamped to the last timestamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimelineRecorder;

impl TimelineRecorder {
    pub fn new() -> Self {
        Self
    }

    pub fn initial(
        &self,
        status: OrderStatus,
        note: Option<String>,
        at: DateTime<Utc>,
    ) -> TimelineEntry {
        TimelineEntry {
            id: Uuid::new_v4(),
            status,
            note: note.unwrap_or_else(|| INITIAL_NOTE.to_string()),
            timestamp: at,
        }
    }

    /// Records a status change on `order` and returns the appended entry.
    pub fn record(
        &self,
        order: &mut Order,
        status: OrderStatus,
        note: Option<String>,
        at: DateTime<Utc>,
    ) -> TimelineEntry {
        let timestamp = match order.timeline.last() {
            Some(last) if last.timestamp > at => last.timestamp,
            _ => at,
        };

        let entry = TimelineEntry {
            id: Uuid::new_v4(),
            status,
            note: note.unwrap_or_else(|| DEFAULT_UPDATE_NOTE.to_string()),
            timestamp,
        };
        order.timeline.push(entry.clone());
        entry
    }
}
