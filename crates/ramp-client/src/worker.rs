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

//! Background sync worker and tick scheduling.
//!
//! One long-lived task consumes a bounded job queue; polls, manual
//! assignments, catalog refreshes, and the version probe all run through
//! it, one at a time, so "at most one request in flight" is a property of
//! the channel rather than a convention. Ticks only enqueue work and
//! drain messages; they never touch the network.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::api::{AssignmentOutcome, RampApi};
use crate::auth;
use crate::catalog::{CatalogCache, SnapshotCache};
use crate::engine::{normalize_callsign, ReconciliationEngine};
use crate::host::RadarHost;
use crate::messages::MessageQueue;
use crate::session::SessionState;

/// Work item for the sync worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Job {
    /// Fetch the occupancy snapshot and reconcile.
    Poll,
    /// Submit a manual assignment (empty `stand` frees).
    Assign {
        callsign: String,
        stand: String,
        icao: String,
    },
    /// Refresh the cached stand list for an airport.
    FetchCatalog { icao: String },
    /// One-shot advisory check for a newer client release.
    CheckVersion,
}

/// Everything the worker needs, cloned into the task at spawn.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub(crate) api: Arc<RampApi>,
    pub(crate) engine: Arc<ReconciliationEngine>,
    pub(crate) session: Arc<SessionState>,
    pub(crate) host: Arc<dyn RadarHost>,
    pub(crate) messages: Arc<MessageQueue>,
    pub(crate) snapshot: Arc<SnapshotCache>,
    pub(crate) catalogs: Arc<CatalogCache>,
}

impl std::fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerContext").finish_non_exhaustive()
    }
}

/// Run jobs until the queue closes or shutdown is requested.
pub(crate) async fn worker_loop(
    mut jobs: mpsc::Receiver<Job>,
    ctx: WorkerContext,
    cancel: CancellationToken,
) {
    info!("Sync worker started");
    loop {
        tokio::select! {
            job = jobs.recv() => {
                match job {
                    Some(job) => run_job(job, &ctx).await,
                    None => break,
                }
            }
            () = cancel.cancelled() => break,
        }
    }
    info!("Sync worker stopped");
}

async fn run_job(job: Job, ctx: &WorkerContext) {
    match job {
        Job::Poll => run_poll(ctx).await,
        Job::Assign {
            callsign,
            stand,
            icao,
        } => run_assign(ctx, &callsign, &stand, &icao).await,
        Job::FetchCatalog { icao } => run_fetch_catalog(ctx, &icao).await,
        Job::CheckVersion => run_check_version(ctx).await,
    }
}

async fn run_poll(ctx: &WorkerContext) {
    if !ctx.session.is_connected() {
        debug!("Skipping poll: no session");
        return;
    }

    let snapshot = ctx.api.fetch_occupancy().await;
    ctx.snapshot.store(snapshot.clone());

    let visible: HashSet<String> = ctx
        .host
        .visible_aircraft()
        .iter()
        .map(|aircraft| normalize_callsign(&aircraft.callsign))
        .filter(|callsign| !callsign.is_empty())
        .collect();

    let events = ctx.engine.reconcile(&snapshot, &visible);
    debug!(
        "Poll reconciled {} visible aircraft into {} tag changes",
        visible.len(),
        events.len()
    );
}

async fn run_assign(ctx: &WorkerContext, callsign: &str, stand: &str, icao: &str) {
    // Re-checked here: the session may have changed since the job was queued.
    if !ctx.session.can_assign() {
        debug!("Dropping assignment for {}: session cannot assign", callsign);
        return;
    }
    let client_callsign = ctx.session.callsign();
    if client_callsign.is_empty() {
        return;
    }

    let token = auth::issue_token(&client_callsign);
    let outcome = ctx
        .api
        .submit_assignment(callsign, stand, icao, &token, &client_callsign)
        .await;

    match outcome {
        AssignmentOutcome::Assigned => {
            info!("Server confirmed {} at stand {}", callsign, stand);
            ctx.engine.apply_manual(callsign, stand);
        }
        AssignmentOutcome::Freed => {
            info!("Server freed the stand for {}", callsign);
            ctx.engine.apply_manual(callsign, "");
        }
        AssignmentOutcome::Rejected(reason) => {
            ctx.messages
                .push(format!("Stand assignment for {callsign} rejected: {reason}"));
        }
        AssignmentOutcome::Malformed => {
            ctx.messages.push(format!(
                "Stand assignment for {callsign} failed: unexpected server reply."
            ));
        }
        AssignmentOutcome::TransportFailure => {
            ctx.messages.push(format!(
                "Stand assignment for {callsign} failed: could not reach the server."
            ));
        }
    }
}

async fn run_fetch_catalog(ctx: &WorkerContext, icao: &str) {
    let names = ctx.api.fetch_stand_names(icao).await;
    if names.is_empty() {
        debug!("No stands returned for {}", icao);
        return;
    }
    ctx.catalogs.store(icao, names);
}

async fn run_check_version(ctx: &WorkerContext) {
    let Some(latest) = ctx.api.fetch_latest_version().await else {
        return;
    };
    let current = env!("CARGO_PKG_VERSION");
    if latest.version == current {
        debug!("Client is up to date ({})", current);
        return;
    }

    let mut notice = format!(
        "Rampdesk client {} is available (you are on {}).",
        latest.version, current
    );
    if !latest.url.is_empty() {
        notice.push_str(&format!(" Get it at {}", latest.url));
    }
    ctx.messages.push(notice);
}

/// One scheduler tick: maybe enqueue a poll, then drain pending messages
/// to the host.
///
/// Called from the host's timer or from the client's own ticker. A full
/// queue defers the poll; the already-queued one covers this tick and the
/// next tick re-arms.
pub(crate) fn scheduler_tick(
    counter: u64,
    poll_every_ticks: u64,
    jobs: &mpsc::Sender<Job>,
    session: &SessionState,
    messages: &MessageQueue,
    host: &dyn RadarHost,
) {
    if poll_every_ticks > 0 && counter % poll_every_ticks == 0 && session.is_connected() {
        match jobs.try_send(Job::Poll) {
            Ok(()) => debug!("Tick {}: poll queued", counter),
            Err(TrySendError::Full(_)) => debug!("Tick {}: sync busy, poll deferred", counter),
            Err(TrySendError::Closed(_)) => warn!("Tick {}: sync worker is gone", counter),
        }
    }

    for message in messages.drain() {
        host.display_message(&message.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::host::AircraftInfo;

    #[derive(Debug, Default)]
    struct StubHost {
        shown: Mutex<Vec<String>>,
    }

    impl RadarHost for StubHost {
        fn visible_aircraft(&self) -> Vec<AircraftInfo> {
            Vec::new()
        }

        fn display_message(&self, message: &str) {
            if let Ok(mut shown) = self.shown.lock() {
                shown.push(message.to_string());
            }
        }
    }

    #[test]
    fn test_tick_polls_only_on_cadence_multiples() {
        let (jobs, mut queue) = mpsc::channel(4);
        let session = SessionState::new();
        session.connect("LFPG_GND", true);
        let messages = MessageQueue::new();
        let host = StubHost::default();

        scheduler_tick(7, 10, &jobs, &session, &messages, &host);
        assert!(queue.try_recv().is_err());

        scheduler_tick(10, 10, &jobs, &session, &messages, &host);
        assert_eq!(queue.try_recv().unwrap(), Job::Poll);
    }

    #[test]
    fn test_tick_does_not_poll_without_session() {
        let (jobs, mut queue) = mpsc::channel(4);
        let session = SessionState::new();
        let messages = MessageQueue::new();
        let host = StubHost::default();

        scheduler_tick(10, 10, &jobs, &session, &messages, &host);
        assert!(queue.try_recv().is_err());
    }

    #[test]
    fn test_full_queue_defers_instead_of_stacking() {
        let (jobs, mut queue) = mpsc::channel(1);
        let session = SessionState::new();
        session.connect("LFPG_GND", true);
        let messages = MessageQueue::new();
        let host = StubHost::default();

        scheduler_tick(10, 10, &jobs, &session, &messages, &host);
        scheduler_tick(20, 10, &jobs, &session, &messages, &host);

        assert_eq!(queue.try_recv().unwrap(), Job::Poll);
        assert!(queue.try_recv().is_err());
    }

    #[test]
    fn test_tick_drains_messages_in_order() {
        let (jobs, _queue) = mpsc::channel(4);
        let session = SessionState::new();
        let messages = MessageQueue::new();
        let host = StubHost::default();

        messages.push("first".to_string());
        messages.push("second".to_string());

        scheduler_tick(1, 10, &jobs, &session, &messages, &host);

        let shown = host.shown.lock().unwrap();
        assert_eq!(*shown, vec!["first".to_string(), "second".to_string()]);
        assert!(messages.is_empty());
    }

    #[test]
    fn test_zero_cadence_disables_polling() {
        let (jobs, mut queue) = mpsc::channel(4);
        let session = SessionState::new();
        session.connect("LFPG_GND", true);
        let messages = MessageQueue::new();
        let host = StubHost::default();

        scheduler_tick(10, 0, &jobs, &session, &messages, &host);
        assert!(queue.try_recv().is_err());
    }
}
