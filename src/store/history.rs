//! Alert history — a bounded, manually reorderable list of generated alerts.
//!
//! Newest alerts go to the head.  The list holds at most `capacity` records
//! (30 by default); inserting past the cap evicts from the tail.  Every
//! mutation writes the complete list as one JSON document, and the in-memory
//! list only changes once that write succeeded, so memory and storage never
//! disagree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::kv::{SharedStore, StoreError};

/// Storage key of the history record.
pub const HISTORY_KEY: &str = "alert_history";

/// Default number of alerts kept.
pub const DEFAULT_HISTORY_CAPACITY: usize = 30;

// ---------------------------------------------------------------------------
// AlertRecord
// ---------------------------------------------------------------------------

/// A generated press alert.  Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    id: String,
    created_at: DateTime<Utc>,
    content: String,
    source_name: String,
}

impl AlertRecord {
    /// New record with a fresh id, stamped now.
    pub fn new(content: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self::from_parts(Uuid::new_v4().to_string(), Utc::now(), content, source_name)
    }

    pub fn from_parts(
        id: impl Into<String>,
        created_at: DateTime<Utc>,
        content: impl Into<String>,
        source_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            created_at,
            content: content.into(),
            source_name: source_name.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// List title: the source name, or `"Comunicado"` when it is blank.
    pub fn title(&self) -> &str {
        if self.source_name.trim().is_empty() {
            "Comunicado"
        } else {
            &self.source_name
        }
    }
}

// ---------------------------------------------------------------------------
// HistoryStore
// ---------------------------------------------------------------------------

pub struct HistoryStore {
    kv: SharedStore,
    records: Vec<AlertRecord>,
    capacity: usize,
}

impl HistoryStore {
    /// Read the persisted history.
    ///
    /// A missing record is an empty history.  An unreadable or corrupt
    /// record is logged and also starts empty; it is overwritten by the next
    /// mutation.  Duplicate ids keep their first occurrence and the list is
    /// cut to `capacity`.
    pub fn load(kv: SharedStore, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut records: Vec<AlertRecord> = match kv.get(HISTORY_KEY) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::warn!("history: stored history is corrupt ({e}); starting empty");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("history: cannot read stored history ({e}); starting empty");
                Vec::new()
            }
        };

        let mut seen = std::collections::HashSet::new();
        records.retain(|r| seen.insert(r.id.clone()));
        records.truncate(capacity);

        log::debug!("history: loaded {} alerts", records.len());
        Self {
            kv,
            records,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Read-only ordered view, head first.
    pub fn all(&self) -> &[AlertRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&AlertRecord> {
        self.records.get(index)
    }

    pub fn find(&self, id: &str) -> Option<&AlertRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert at the head, evicting from the tail past capacity.
    ///
    /// A record whose id is already present replaces the old entry, so ids
    /// stay unique.
    pub fn append(&mut self, record: AlertRecord) -> Result<(), StoreError> {
        let mut next = Vec::with_capacity(self.records.len() + 1);
        next.extend(
            self.records
                .iter()
                .filter(|r| r.id != record.id)
                .cloned(),
        );
        next.insert(0, record);
        next.truncate(self.capacity);
        self.commit(next)
    }

    /// Move the element at `from` to `to`, keeping the relative order of all
    /// others.
    ///
    /// Returns `Ok(false)` and changes nothing when the indices are equal or
    /// either is out of bounds.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<bool, StoreError> {
        let len = self.records.len();
        if from == to || from >= len || to >= len {
            return Ok(false);
        }

        let mut next = self.records.clone();
        let moved = next.remove(from);
        next.insert(to, moved);
        self.commit(next)?;
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.commit(Vec::new())
    }

    fn commit(&mut self, next: Vec<AlertRecord>) -> Result<(), StoreError> {
        let json = serde_json::to_string(&next).map_err(|e| StoreError::Encode {
            key: HISTORY_KEY.to_string(),
            reason: e.to_string(),
        })?;
        self.kv.set(HISTORY_KEY, &json)?;
        self.records = next;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
