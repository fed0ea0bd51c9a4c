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

//! Tag reconciliation.
//!
//! The engine owns everything shown on aircraft tags: the published map
//! of callsign to [`TagState`], and the one-shot manual overrides waiting
//! for their confirming poll. Both live under a single mutex, so every
//! reconciliation pass is one atomic publish and readers never see a
//! half-merged picture.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use log::debug;
use tokio::sync::broadcast;

use crate::api::OccupancySnapshot;

/// Whether a tag should draw the controller's eye.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Highlight {
    /// Steady display.
    #[default]
    Unchanged,
    /// The stand differs from what was last shown; draw in the attention
    /// color until a pass confirms it.
    Changed,
}

/// Which tag field a host is rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagField {
    /// The stand designator.
    Stand,
    /// The free-text remark.
    Remark,
}

/// Display state for one aircraft's tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagState {
    /// Stand designator, empty when none.
    pub stand: String,
    /// Remark text, empty when none.
    pub remark: String,
    /// Highlight for the stand field.
    pub highlight: Highlight,
}

/// One externally visible tag change, returned by engine operations and
/// broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagEvent {
    /// A tag now shows this state.
    Updated {
        /// Affected callsign.
        callsign: String,
        /// New state. An empty stand with the attention highlight is a
        /// freed stand the server still lists.
        state: TagState,
    },
    /// A tag was removed entirely.
    Cleared {
        /// Affected callsign.
        callsign: String,
    },
}

impl TagEvent {
    /// The callsign the event applies to.
    #[must_use]
    pub fn callsign(&self) -> &str {
        match self {
            Self::Updated { callsign, .. } | Self::Cleared { callsign } => callsign,
        }
    }
}

#[derive(Debug, Default)]
struct EngineState {
    published: HashMap<String, TagState>,
    overrides: HashMap<String, String>,
}

/// Owner of all published tag state.
pub struct ReconciliationEngine {
    state: Mutex<EngineState>,
    event_tx: broadcast::Sender<TagEvent>,
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine").finish_non_exhaustive()
    }
}

impl ReconciliationEngine {
    /// Create an engine with the given event channel capacity.
    #[must_use]
    pub fn new(event_channel_capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(event_channel_capacity);
        Self {
            state: Mutex::new(EngineState::default()),
            event_tx,
        }
    }

    /// Subscribe to tag change events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TagEvent> {
        self.event_tx.subscribe()
    }

    /// Merge a fresh snapshot with the visible traffic and any pending
    /// manual overrides, and publish the result.
    ///
    /// An empty snapshot clears every published tag but keeps the
    /// overrides for the next pass that actually has data; a server hiccup
    /// must not eat a manual assignment. Otherwise the desired picture is
    /// built from the assigned-then-occupied bindings restricted to
    /// visible callsigns, overrides win over snapshot stands, a stand that
    /// differs from the published one gets the attention highlight, and
    /// whatever vanished is cleared. Overrides are consumed by exactly one
    /// such pass.
    ///
    /// Returns every emitted change, already broadcast to subscribers.
    pub fn reconcile(
        &self,
        snapshot: &OccupancySnapshot,
        visible: &HashSet<String>,
    ) -> Vec<TagEvent> {
        let mut events = Vec::new();
        {
            let Ok(mut state) = self.state.lock() else {
                return events;
            };

            if snapshot.is_empty() {
                for callsign in state.published.keys() {
                    events.push(TagEvent::Cleared {
                        callsign: callsign.clone(),
                    });
                }
                state.published.clear();
            } else {
                let bindings = snapshot
                    .assigned_stands
                    .iter()
                    .chain(snapshot.occupied_stands.iter());

                let mut next: HashMap<String, TagState> = HashMap::new();
                for binding in bindings {
                    let callsign = normalize_callsign(&binding.callsign);
                    if callsign.is_empty() || !visible.contains(&callsign) {
                        continue;
                    }
                    // Occupied entries iterate last and win duplicate callsigns.
                    let stand = state
                        .overrides
                        .get(&callsign)
                        .cloned()
                        .unwrap_or_else(|| binding.name.clone());
                    let highlight = match state.published.get(&callsign) {
                        Some(previous) if previous.stand == stand => Highlight::Unchanged,
                        _ => Highlight::Changed,
                    };
                    next.insert(
                        callsign,
                        TagState {
                            stand,
                            remark: binding.remark.clone(),
                            highlight,
                        },
                    );
                }

                for callsign in state.published.keys() {
                    if !next.contains_key(callsign) {
                        events.push(TagEvent::Cleared {
                            callsign: callsign.clone(),
                        });
                    }
                }
                for (callsign, tag) in &next {
                    events.push(TagEvent::Updated {
                        callsign: callsign.clone(),
                        state: tag.clone(),
                    });
                }

                state.overrides.clear();
                state.published = next;
            }
        }

        debug!("Reconciliation pass produced {} tag changes", events.len());
        for event in &events {
            let _ = self.event_tx.send(event.clone());
        }
        events
    }

    /// Record a server-confirmed manual action and update the display
    /// optimistically.
    ///
    /// A non-empty `stand` publishes immediately with a steady highlight
    /// (the controller just did this themselves) and re-baselines the
    /// diff, so the confirming poll does not flash. An empty `stand`
    /// clears the tag; if the next poll still lists the old stand, the
    /// freed override re-publishes an empty tag with the attention
    /// highlight instead.
    pub fn apply_manual(&self, callsign: &str, stand: &str) -> Option<TagEvent> {
        let callsign = normalize_callsign(callsign);
        if callsign.is_empty() {
            return None;
        }

        let event;
        {
            let Ok(mut state) = self.state.lock() else {
                return None;
            };
            state.overrides.insert(callsign.clone(), stand.to_string());
            if stand.is_empty() {
                state.published.remove(&callsign);
                event = TagEvent::Cleared { callsign };
            } else {
                let tag = TagState {
                    stand: stand.to_string(),
                    remark: String::new(),
                    highlight: Highlight::Unchanged,
                };
                state.published.insert(callsign.clone(), tag.clone());
                event = TagEvent::Updated {
                    callsign,
                    state: tag,
                };
            }
        }

        let _ = self.event_tx.send(event.clone());
        Some(event)
    }

    /// Drop all state, emitting a clear for every published tag.
    ///
    /// Used when the session ends; tags with no session left to refresh
    /// them would otherwise linger indefinitely.
    pub fn reset(&self) -> Vec<TagEvent> {
        let mut events = Vec::new();
        {
            let Ok(mut state) = self.state.lock() else {
                return events;
            };
            for callsign in state.published.keys() {
                events.push(TagEvent::Cleared {
                    callsign: callsign.clone(),
                });
            }
            state.published.clear();
            state.overrides.clear();
        }

        for event in &events {
            let _ = self.event_tx.send(event.clone());
        }
        events
    }

    /// Published tag for one callsign.
    #[must_use]
    pub fn tag_for(&self, callsign: &str) -> Option<TagState> {
        let callsign = normalize_callsign(callsign);
        self.state
            .lock()
            .ok()
            .and_then(|state| state.published.get(&callsign).cloned())
    }

    /// Text and highlight for one tag field, `None` when nothing is
    /// published for the callsign. Pure read, cheap enough for every
    /// redraw.
    #[must_use]
    pub fn tag_item(&self, callsign: &str, field: TagField) -> Option<(String, Highlight)> {
        self.tag_for(callsign).map(|tag| {
            let text = match field {
                TagField::Stand => tag.stand,
                TagField::Remark => tag.remark,
            };
            (text, tag.highlight)
        })
    }

    /// Copy of the full published map.
    #[must_use]
    pub fn published_tags(&self) -> HashMap<String, TagState> {
        self.state
            .lock()
            .map(|state| state.published.clone())
            .unwrap_or_default()
    }

    /// Number of published tags.
    #[must_use]
    pub fn published_count(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.published.len())
            .unwrap_or(0)
    }

    #[cfg(test)]
    fn pending_override(&self, callsign: &str) -> Option<String> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.overrides.get(callsign).cloned())
    }
}

/// Uppercased, trimmed callsign; the canonical key everywhere in the
/// client.
#[must_use]
pub fn normalize_callsign(callsign: &str) -> String {
    callsign.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StandBinding;

    fn binding(callsign: &str, name: &str, remark: &str) -> StandBinding {
        StandBinding {
            callsign: callsign.to_string(),
            name: name.to_string(),
            remark: remark.to_string(),
        }
    }

    fn snapshot(assigned: Vec<StandBinding>, occupied: Vec<StandBinding>) -> OccupancySnapshot {
        OccupancySnapshot {
            assigned_stands: assigned,
            occupied_stands: occupied,
            blocked_stands: Vec::new(),
        }
    }

    fn visible(callsigns: &[&str]) -> HashSet<String> {
        callsigns.iter().map(|c| (*c).to_string()).collect()
    }

    fn engine() -> ReconciliationEngine {
        ReconciliationEngine::new(16)
    }

    #[test]
    fn test_first_sighting_gets_attention_highlight() {
        let engine = engine();
        let snap = snapshot(vec![binding("AFR123", "12A", "")], Vec::new());

        engine.reconcile(&snap, &visible(&["AFR123"]));

        let tag = engine.tag_for("AFR123").unwrap();
        assert_eq!(tag.stand, "12A");
        assert_eq!(tag.highlight, Highlight::Changed);
    }

    #[test]
    fn test_second_pass_settles_to_steady() {
        let engine = engine();
        let snap = snapshot(vec![binding("AFR123", "12A", "")], Vec::new());
        let who = visible(&["AFR123"]);

        engine.reconcile(&snap, &who);
        let events = engine.reconcile(&snap, &who);

        assert_eq!(events.len(), 1);
        let tag = engine.tag_for("AFR123").unwrap();
        assert_eq!(tag.stand, "12A");
        assert_eq!(tag.highlight, Highlight::Unchanged);
    }

    #[test]
    fn test_remark_change_does_not_flash() {
        let engine = engine();
        let who = visible(&["AFR123"]);

        engine.reconcile(&snapshot(vec![binding("AFR123", "12A", "")], Vec::new()), &who);
        engine.reconcile(
            &snapshot(vec![binding("AFR123", "12A", "via N loop")], Vec::new()),
            &who,
        );

        let tag = engine.tag_for("AFR123").unwrap();
        assert_eq!(tag.remark, "via N loop");
        assert_eq!(tag.highlight, Highlight::Unchanged);
    }

    #[test]
    fn test_vanished_callsign_cleared_exactly_once() {
        let engine = engine();
        engine.reconcile(
            &snapshot(vec![binding("AFR123", "12A", "")], Vec::new()),
            &visible(&["AFR123", "BAW22"]),
        );

        let later = snapshot(vec![binding("BAW22", "7", "")], Vec::new());
        let events = engine.reconcile(&later, &visible(&["AFR123", "BAW22"]));
        assert!(events.contains(&TagEvent::Cleared {
            callsign: "AFR123".to_string()
        }));
        assert!(engine.tag_for("AFR123").is_none());

        // Monotonic: the clear is not re-emitted on the next pass.
        let events = engine.reconcile(&later, &visible(&["AFR123", "BAW22"]));
        assert!(!events
            .iter()
            .any(|e| matches!(e, TagEvent::Cleared { callsign } if callsign == "AFR123")));
    }

    #[test]
    fn test_invisible_callsign_not_published() {
        let engine = engine();
        engine.reconcile(
            &snapshot(vec![binding("AFR123", "12A", "")], Vec::new()),
            &visible(&["BAW22"]),
        );
        assert!(engine.tag_for("AFR123").is_none());
        assert_eq!(engine.published_count(), 0);
    }

    #[test]
    fn test_aircraft_leaving_coverage_is_pruned() {
        let engine = engine();
        let snap = snapshot(vec![binding("AFR123", "12A", "")], Vec::new());

        engine.reconcile(&snap, &visible(&["AFR123"]));
        assert_eq!(engine.published_count(), 1);

        let events = engine.reconcile(&snap, &visible(&[]));
        assert_eq!(
            events,
            vec![TagEvent::Cleared {
                callsign: "AFR123".to_string()
            }]
        );
        assert_eq!(engine.published_count(), 0);
    }

    #[test]
    fn test_empty_snapshot_clears_everything() {
        let engine = engine();
        let who = visible(&["AFR123", "BAW22"]);
        engine.reconcile(
            &snapshot(
                vec![binding("AFR123", "12A", ""), binding("BAW22", "7", "")],
                Vec::new(),
            ),
            &who,
        );
        assert_eq!(engine.published_count(), 2);

        let events = engine.reconcile(&OccupancySnapshot::default(), &who);
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| matches!(e, TagEvent::Cleared { .. })));
        assert_eq!(engine.published_count(), 0);
    }

    #[test]
    fn test_empty_snapshot_keeps_override_for_next_pass() {
        let engine = engine();
        engine.apply_manual("AFR123", "7");

        engine.reconcile(&OccupancySnapshot::default(), &visible(&["AFR123"]));
        assert_eq!(engine.pending_override("AFR123"), Some("7".to_string()));

        // The next pass with data applies it.
        engine.reconcile(
            &snapshot(vec![binding("AFR123", "12A", "")], Vec::new()),
            &visible(&["AFR123"]),
        );
        let tag = engine.tag_for("AFR123").unwrap();
        assert_eq!(tag.stand, "7");
        assert!(engine.pending_override("AFR123").is_none());
    }

    #[test]
    fn test_override_consumed_by_exactly_one_pass() {
        let engine = engine();
        let snap = snapshot(vec![binding("AFR123", "12A", "")], Vec::new());
        let who = visible(&["AFR123"]);

        engine.apply_manual("AFR123", "7");

        // First pass: the override wins and matches the optimistic baseline.
        engine.reconcile(&snap, &who);
        let tag = engine.tag_for("AFR123").unwrap();
        assert_eq!(tag.stand, "7");
        assert_eq!(tag.highlight, Highlight::Unchanged);

        // Second pass: the override is gone, the server value shows again
        // and the difference flashes.
        engine.reconcile(&snap, &who);
        let tag = engine.tag_for("AFR123").unwrap();
        assert_eq!(tag.stand, "12A");
        assert_eq!(tag.highlight, Highlight::Changed);
    }

    #[test]
    fn test_duplicate_callsign_occupied_wins() {
        let engine = engine();
        engine.reconcile(
            &snapshot(
                vec![binding("AFR123", "5", "")],
                vec![binding("AFR123", "7", "towed")],
            ),
            &visible(&["AFR123"]),
        );

        let tag = engine.tag_for("AFR123").unwrap();
        assert_eq!(tag.stand, "7");
        assert_eq!(tag.remark, "towed");
    }

    #[test]
    fn test_freed_override_publishes_empty_attention_tag() {
        let engine = engine();
        let snap = snapshot(vec![binding("AFR123", "12A", "")], Vec::new());
        let who = visible(&["AFR123"]);
        engine.reconcile(&snap, &who);

        let event = engine.apply_manual("AFR123", "").unwrap();
        assert_eq!(
            event,
            TagEvent::Cleared {
                callsign: "AFR123".to_string()
            }
        );
        assert!(engine.tag_for("AFR123").is_none());

        // The server has not processed the free yet and still lists 12A:
        // the freed override keeps the stand empty and demands attention.
        engine.reconcile(&snap, &who);
        let tag = engine.tag_for("AFR123").unwrap();
        assert_eq!(tag.stand, "");
        assert_eq!(tag.highlight, Highlight::Changed);
    }

    #[test]
    fn test_apply_manual_publishes_immediately_and_normalizes() {
        let engine = engine();
        engine.apply_manual(" afr123 ", "12A");

        let tag = engine.tag_for("AFR123").unwrap();
        assert_eq!(tag.stand, "12A");
        assert_eq!(tag.highlight, Highlight::Unchanged);
        assert!(engine.tag_for("nonexistent").is_none());
    }

    #[test]
    fn test_empty_callsign_binding_is_dropped() {
        let engine = engine();
        engine.reconcile(
            &snapshot(vec![binding("", "4", "")], Vec::new()),
            &visible(&[""]),
        );
        assert_eq!(engine.published_count(), 0);
    }

    #[test]
    fn test_reset_clears_tags_and_overrides() {
        let engine = engine();
        let snap = snapshot(vec![binding("AFR123", "12A", "")], Vec::new());
        let who = visible(&["AFR123"]);
        engine.reconcile(&snap, &who);
        engine.apply_manual("BAW22", "3");

        let events = engine.reset();
        assert_eq!(events.len(), 2);
        assert_eq!(engine.published_count(), 0);
        assert!(engine.pending_override("BAW22").is_none());

        // The baseline is gone, so the same snapshot flashes again.
        engine.reconcile(&snap, &who);
        assert_eq!(
            engine.tag_for("AFR123").unwrap().highlight,
            Highlight::Changed
        );
    }

    #[test]
    fn test_tag_item_selects_field() {
        let engine = engine();
        engine.reconcile(
            &snapshot(vec![binding("AFR123", "12A", "via N")], Vec::new()),
            &visible(&["AFR123"]),
        );

        assert_eq!(
            engine.tag_item("AFR123", TagField::Stand),
            Some(("12A".to_string(), Highlight::Changed))
        );
        assert_eq!(
            engine.tag_item("AFR123", TagField::Remark),
            Some(("via N".to_string(), Highlight::Changed))
        );
        assert_eq!(engine.tag_item("BAW22", TagField::Stand), None);
    }

    #[test]
    fn test_events_are_broadcast() {
        let engine = engine();
        let mut events = engine.subscribe();

        engine.apply_manual("AFR123", "12A");

        let event = events.try_recv().unwrap();
        assert_eq!(event.callsign(), "AFR123");
        assert!(matches!(event, TagEvent::Updated { .. }));
    }
}
