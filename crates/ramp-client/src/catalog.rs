// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Stand catalog assembly for the assignment menu.
//!
//! The menu must open instantly, so it is built entirely from cached
//! data: the per-airport stand list (refreshed in the background) and the
//! latest occupancy snapshot. The first open for an unseen airport may
//! show an empty catalog; the next open has data.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::api::OccupancySnapshot;
use crate::ordering::compare_stand_names;

/// Availability of one stand, derived at assembly time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandStatus {
    /// Free for assignment.
    Available,
    /// Assigned to an aircraft by a controller.
    Assigned,
    /// Detected as physically occupied.
    Occupied,
    /// Administratively blocked.
    Blocked,
}

/// One row of the assignment menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandEntry {
    /// Stand designator.
    pub name: String,
    /// Availability when the catalog was assembled.
    pub status: StandStatus,
}

/// Annotated, ordered stand list for one airport. Derived on demand,
/// never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandCatalog {
    /// Airport the catalog belongs to.
    pub icao: String,
    /// Stands in natural display order.
    pub entries: Vec<StandEntry>,
}

impl StandCatalog {
    /// Assemble a catalog from an airport's stand names and the current
    /// snapshot.
    ///
    /// A stand listed in several snapshot lists takes the first matching
    /// status in the order assigned, occupied, blocked.
    #[must_use]
    pub fn assemble(icao: &str, names: &[String], snapshot: &OccupancySnapshot) -> Self {
        let assigned: HashSet<&str> = snapshot
            .assigned_stands
            .iter()
            .map(|b| b.name.as_str())
            .collect();
        let occupied: HashSet<&str> = snapshot
            .occupied_stands
            .iter()
            .map(|b| b.name.as_str())
            .collect();
        let blocked: HashSet<&str> = snapshot
            .blocked_stands
            .iter()
            .map(|b| b.name.as_str())
            .collect();

        let mut entries: Vec<StandEntry> = names
            .iter()
            .map(|name| {
                let status = if assigned.contains(name.as_str()) {
                    StandStatus::Assigned
                } else if occupied.contains(name.as_str()) {
                    StandStatus::Occupied
                } else if blocked.contains(name.as_str()) {
                    StandStatus::Blocked
                } else {
                    StandStatus::Available
                };
                StandEntry {
                    name: name.clone(),
                    status,
                }
            })
            .collect();
        entries.sort_by(|a, b| compare_stand_names(&a.name, &b.name));

        Self {
            icao: icao.to_string(),
            entries,
        }
    }

    /// Names free for assignment, in display order.
    #[must_use]
    pub fn available(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.status == StandStatus::Available)
            .map(|entry| entry.name.as_str())
            .collect()
    }

    /// True when no stands are known for the airport.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache of stand-name lists keyed by airport.
#[derive(Debug, Default)]
pub struct CatalogCache {
    inner: Mutex<HashMap<String, Vec<String>>>,
}

impl CatalogCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stand list for an airport.
    pub fn store(&self, icao: &str, names: Vec<String>) {
        if let Ok(mut cache) = self.inner.lock() {
            cache.insert(icao.trim().to_ascii_uppercase(), names);
        }
    }

    /// Cached stand list for an airport, empty when never fetched.
    #[must_use]
    pub fn names_for(&self, icao: &str) -> Vec<String> {
        self.inner
            .lock()
            .map(|cache| {
                cache
                    .get(&icao.trim().to_ascii_uppercase())
                    .cloned()
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }
}

/// A snapshot plus when it was fetched.
#[derive(Debug, Clone, Default)]
pub struct CachedSnapshot {
    /// The snapshot; empty until the first successful poll.
    pub snapshot: OccupancySnapshot,
    /// Fetch time of the current contents, `None` before the first poll.
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Latest occupancy snapshot, replaced wholesale on every poll (including
/// failed ones, when it becomes empty).
#[derive(Debug, Default)]
pub struct SnapshotCache {
    inner: Mutex<CachedSnapshot>,
}

impl SnapshotCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached snapshot.
    pub fn store(&self, snapshot: OccupancySnapshot) {
        if let Ok(mut cached) = self.inner.lock() {
            cached.snapshot = snapshot;
            cached.fetched_at = Some(Utc::now());
        }
    }

    /// Copy of the cached snapshot and its fetch time.
    #[must_use]
    pub fn get(&self) -> CachedSnapshot {
        self.inner
            .lock()
            .map(|cached| cached.clone())
            .unwrap_or_default()
    }
}
