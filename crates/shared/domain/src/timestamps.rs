//! Creation and modification timestamps shared by persisted records.
//!
//! Records embed a [`Timestamps`] value and implement [`Timestamped`].
//! Both fields stay empty until the persistence layer writes the record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp pair managed by the persistence layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Timestamps {
    /// Timestamps of a record that has already been written.
    pub fn persisted(created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        Self {
            created_at: Some(created_at),
            updated_at: Some(updated_at),
        }
    }

    /// Record a write at `now`.
    ///
    /// `created_at` is only filled on the first write; `updated_at` moves on every write.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if self.created_at.is_none() {
            self.created_at = Some(now);
        }
        self.updated_at = Some(now);
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Check if the record has been written at least once
    pub fn is_persisted(&self) -> bool {
        self.created_at.is_some()
    }
}

/// Records carrying a [`Timestamps`] group.
pub trait Timestamped {
    fn timestamps(&self) -> &Timestamps;

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.timestamps().created_at()
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.timestamps().updated_at()
    }
}
