//! Active-set bookkeeping.
//!
//! The active set is the ordered, duplicate-free list of node ids currently
//! "in context". Callers own and mutate it between engine invocations; the
//! engine itself only reads id slices and returns new lists. `ActiveSetLog`
//! keeps an append-only version history of the set for undo/inspection UIs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::ids::ordered_unique;

/// Ordered, duplicate-free list of node ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveSet {
    ids: Vec<String>,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an id sequence, deduplicating on first occurrence.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            ids: ordered_unique(ids),
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn into_ids(self) -> Vec<String> {
        self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|x| x == id)
    }

    /// Append ids not already active, preserving the given order.
    /// Returns how many ids were added.
    pub fn activate(&mut self, ids: &[String]) -> usize {
        let mut added = 0;
        for id in ids {
            if id.is_empty() || self.contains(id) {
                continue;
            }
            self.ids.push(id.clone());
            added += 1;
        }
        added
    }

    /// Remove every listed id. Returns how many ids were removed.
    pub fn deactivate(&mut self, ids: &[String]) -> usize {
        let remove: HashSet<&str> = ids.iter().map(|s| s.as_str()).collect();
        let before = self.ids.len();
        self.ids.retain(|id| !remove.contains(id.as_str()));
        before - self.ids.len()
    }

    /// Move the requested, currently-active ids to the front in the requested
    /// order; all remaining ids keep their relative order. Membership never
    /// changes.
    pub fn reorder(&mut self, requested: &[String]) {
        let current: HashSet<&str> = self.ids.iter().map(|s| s.as_str()).collect();
        let mut seen: HashSet<String> = HashSet::new();
        let mut reordered: Vec<String> = Vec::with_capacity(self.ids.len());

        for id in requested {
            if current.contains(id.as_str()) && !seen.contains(id.as_str()) {
                seen.insert(id.clone());
                reordered.push(id.clone());
            }
        }
        for id in &self.ids {
            if !seen.contains(id.as_str()) {
                seen.insert(id.clone());
                reordered.push(id.clone());
            }
        }

        self.ids = reordered;
    }

    /// Replace a fold id with its member nodes: the fold is removed and
    /// members not already active are appended in the given order.
    pub fn unfold_fold(&mut self, fold_id: &str, member_ids: &[String]) {
        self.ids.retain(|id| id != fold_id);
        self.activate(member_ids);
    }
}

/// One recorded snapshot of an active set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSetVersion {
    pub version: u64,
    pub reason: String,
    pub active_ids: Vec<String>,
    pub changed_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Append-only version history for one active set.
///
/// Versions start at 0 and increment by 1 per snapshot. The log is a pure
/// in-memory ledger; durable storage stays with the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveSetLog {
    versions: Vec<ActiveSetVersion>,
}

impl ActiveSetLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a snapshot after the caller mutated the active set.
    /// Ids are normalized with `ordered_unique`. Returns the version number.
    pub fn snapshot(
        &mut self,
        reason: impl Into<String>,
        active_ids: &[String],
        changed_ids: &[String],
        meta: Option<serde_json::Value>,
    ) -> u64 {
        let version = match self.versions.last() {
            Some(v) => v.version + 1,
            None => 0,
        };
        self.versions.push(ActiveSetVersion {
            version,
            reason: reason.into(),
            active_ids: ordered_unique(active_ids),
            changed_ids: ordered_unique(changed_ids),
            meta,
            created_at: Utc::now(),
        });
        version
    }

    pub fn latest(&self) -> Option<&ActiveSetVersion> {
        self.versions.last()
    }

    pub fn versions(&self) -> &[ActiveSetVersion] {
        &self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
