//! Cache Events Module
//!
//! Notifications emitted by the [`Cache`](super::Cache) decorator after each
//! operation.

use serde_json::Value;

use crate::cache::Ttl;

// == Cache Event ==
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    Hit {
        store: String,
        key: String,
        value: Value,
    },
    Missed {
        store: String,
        key: String,
    },
    Written {
        store: String,
        key: String,
        value: Value,
        ttl: Option<Ttl>,
    },
    WriteMissed {
        store: String,
        key: String,
        value: Value,
        ttl: Option<Ttl>,
    },
    Deleted {
        store: String,
        key: String,
    },
    DeleteMissed {
        store: String,
        key: String,
    },
    Cleared {
        store: String,
    },
    ClearMissed {
        store: String,
    },
    MultipleHit {
        store: String,
        values: Vec<(String, Value)>,
    },
    MultipleMissed {
        store: String,
        keys: Vec<String>,
    },
    MultipleWritten {
        store: String,
        values: Vec<(String, Value)>,
        ttl: Option<Ttl>,
    },
    MultipleWriteMissed {
        store: String,
        values: Vec<(String, Value)>,
        ttl: Option<Ttl>,
    },
    MultipleDeleted {
        store: String,
        keys: Vec<String>,
    },
    MultipleDeleteMissed {
        store: String,
        keys: Vec<String>,
    },
    Has {
        store: String,
        key: String,
    },
    HasMissed {
        store: String,
        key: String,
    },
}

impl CacheEvent {
    /// Name of the store that emitted the event.
    pub fn store(&self) -> &str {
        match self {
            CacheEvent::Hit { store, .. }
            | CacheEvent::Missed { store, .. }
            | CacheEvent::Written { store, .. }
            | CacheEvent::WriteMissed { store, .. }
            | CacheEvent::Deleted { store, .. }
            | CacheEvent::DeleteMissed { store, .. }
            | CacheEvent::Cleared { store }
            | CacheEvent::ClearMissed { store }
            | CacheEvent::MultipleHit { store, .. }
            | CacheEvent::MultipleMissed { store, .. }
            | CacheEvent::MultipleWritten { store, .. }
            | CacheEvent::MultipleWriteMissed { store, .. }
            | CacheEvent::MultipleDeleted { store, .. }
            | CacheEvent::MultipleDeleteMissed { store, .. }
            | CacheEvent::Has { store, .. }
            | CacheEvent::HasMissed { store, .. } => store,
        }
    }

    /// Short snake_case label, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "hit",
            CacheEvent::Missed { .. } => "missed",
            CacheEvent::Written { .. } => "written",
            CacheEvent::WriteMissed { .. } => "write_missed",
            CacheEvent::Deleted { .. } => "deleted",
            CacheEvent::DeleteMissed { .. } => "delete_missed",
            CacheEvent::Cleared { .. } => "cleared",
            CacheEvent::ClearMissed { .. } => "clear_missed",
            CacheEvent::MultipleHit { .. } => "multiple_hit",
            CacheEvent::MultipleMissed { .. } => "multiple_missed",
            CacheEvent::MultipleWritten { .. } => "multiple_written",
            CacheEvent::MultipleWriteMissed { .. } => "multiple_write_missed",
            CacheEvent::MultipleDeleted { .. } => "multiple_deleted",
            CacheEvent::MultipleDeleteMissed { .. } => "multiple_delete_missed",
            CacheEvent::Has { .. } => "has",
            CacheEvent::HasMissed { .. } => "has_missed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_store_and_kind() {
        let event = CacheEvent::Hit {
            store: "array".into(),
            key: "k".into(),
            value: json!(1),
        };
        assert_eq!(event.store(), "array");
        assert_eq!(event.kind(), "hit");

        let event = CacheEvent::MultipleDeleteMissed {
            store: "file".into(),
            keys: vec!["a".into()],
        };
        assert_eq!(event.store(), "file");
        assert_eq!(event.kind(), "multiple_delete_missed");
    }
}
