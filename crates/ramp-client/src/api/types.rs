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

//! Wire types for the Rampdesk HTTP API.

use serde::{Deserialize, Serialize};

/// One remote callsign/stand binding.
///
/// Every field tolerates absence; a partially filled binding is still
/// usable (an empty callsign is dropped during reconciliation, an empty
/// name only matters for catalog annotation).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandBinding {
    /// Aircraft callsign the stand is bound to.
    pub callsign: String,
    /// Stand designator (e.g. "12A").
    pub name: String,
    /// Free-text remark shown next to the stand.
    pub remark: String,
}

/// Full occupancy state for the controlled area.
///
/// Superseded wholesale on every poll; the client never diffs one snapshot
/// against the previous one, only against its own published tag state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OccupancySnapshot {
    /// Stands assigned to an aircraft by a controller.
    pub assigned_stands: Vec<StandBinding>,
    /// Stands detected as physically occupied.
    pub occupied_stands: Vec<StandBinding>,
    /// Stands administratively blocked (no callsign).
    pub blocked_stands: Vec<StandBinding>,
}

impl OccupancySnapshot {
    /// True when the snapshot carries no bindings at all.
    ///
    /// An empty snapshot is what a failed fetch degrades to, and it makes
    /// the engine clear everything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assigned_stands.is_empty()
            && self.occupied_stands.is_empty()
            && self.blocked_stands.is_empty()
    }
}

/// Outcome of a manual assignment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentOutcome {
    /// Server recorded the assignment.
    Assigned,
    /// Server released the aircraft's stand.
    Freed,
    /// Server refused the request; the reason is shown to the controller.
    Rejected(String),
    /// Reply parsed but did not match the expected shape.
    Malformed,
    /// No usable HTTP response (network error, timeout, or non-2xx status).
    TransportFailure,
}

/// Version information published by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    /// Latest released client version.
    pub version: String,
    /// Where to get it.
    #[serde(default)]
    pub url: String,
}

// Reply envelope for /api/assign: {"message": {"action": ..., "message": ...}}
#[derive(Debug, Deserialize)]
pub(crate) struct AssignmentReply {
    pub(crate) message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReplyMessage {
    #[serde(default)]
    pub(crate) action: String,
    #[serde(default)]
    pub(crate) message: Option<String>,
}

impl AssignmentReply {
    /// Map the reply envelope onto an outcome the workflow can branch on.
    ///
    /// Any action other than "assign" or "free" is a rejection, with the
    /// server's text (or the action itself) as the reason.
    pub(crate) fn into_outcome(self) -> AssignmentOutcome {
        let Some(reply) = self.message else {
            return AssignmentOutcome::Malformed;
        };
        match reply.action.as_str() {
            "assign" => AssignmentOutcome::Assigned,
            "free" => AssignmentOutcome::Freed,
            "" => AssignmentOutcome::Malformed,
            other => {
                let reason = reply
                    .message
                    .unwrap_or_else(|| format!("server replied \"{other}\""));
                AssignmentOutcome::Rejected(reason)
            }
        }
    }
}
