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

//! Client library for the Rampdesk airport stand assignment service.
//!
//! Rampdesk tracks which aircraft is parked (or expected) at which stand.
//! This crate is the radar-display side of that service: it polls the
//! server for the authoritative occupancy picture, reconciles it with the
//! aircraft the controller can actually see and with manual assignments
//! just issued locally, and publishes per-aircraft tag state (stand,
//! remark, highlight) that the display reads back cheaply on every
//! redraw.
//!
//! The layers can be used independently or composed:
//!
//! - **API layer** ([`api`]): HTTP/JSON transport with fail-soft fetches
//! - **Engine layer** ([`engine`]): tag state ownership and reconciliation
//! - **Worker layer**: one background task that serializes every remote
//!   request through a single queue
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ramp_client::{AircraftInfo, ClientConfig, RadarHost, RampClient};
//!
//! struct MyScope;
//!
//! impl RadarHost for MyScope {
//!     fn visible_aircraft(&self) -> Vec<AircraftInfo> {
//!         vec![AircraftInfo {
//!             callsign: "AFR123".to_string(),
//!             destination: Some("LFPG".to_string()),
//!             ..Default::default()
//!         }]
//!     }
//!
//!     fn display_message(&self, message: &str) {
//!         println!("{message}");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = RampClient::spawn(ClientConfig::default(), Arc::new(MyScope));
//!     client.connect("LFPG_GND", true);
//!
//!     // The host's 1 Hz timer drives polling and message delivery.
//!     for counter in 1..=60 {
//!         client.on_timer_tick(counter);
//!         tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//!     }
//!
//!     client.shutdown().await;
//! }
//! ```

pub mod api;
pub mod auth;
pub mod catalog;
pub mod commands;
pub mod engine;
pub mod host;
pub mod messages;
pub mod ordering;
pub mod session;
mod worker;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use api::{
    ApiConfig, AssignmentOutcome, OccupancySnapshot, RampApi, StandBinding, VersionInfo,
};
pub use catalog::{CachedSnapshot, StandCatalog, StandEntry, StandStatus};
pub use commands::{ScopeCommand, USAGE};
pub use engine::{Highlight, TagEvent, TagField, TagState};
pub use host::{AircraftInfo, RadarHost};
pub use messages::PendingMessage;

use catalog::{CatalogCache, SnapshotCache};
use engine::ReconciliationEngine;
use messages::MessageQueue;
use session::SessionState;
use worker::{scheduler_tick, worker_loop, Job, WorkerContext};

/// Client library version, reported by `.ramp version` and compared
/// against the server's advertised latest release.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for the full client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API transport configuration.
    pub api: ApiConfig,
    /// Poll the server every N scheduler ticks. Zero disables polling.
    pub poll_every_ticks: u64,
    /// Tick period for the client's own scheduler (only used with
    /// `drive_ticks`).
    pub tick_interval: Duration,
    /// Drive ticks internally. Hosts with their own 1 Hz timer (radar
    /// plugins) leave this off and call [`RampClient::on_timer_tick`], so
    /// messages surface on the host's thread.
    pub drive_ticks: bool,
    /// Restrict assignment to airports whose ICAO starts with this prefix
    /// (e.g. "LF"). `None` allows any airport.
    pub airport_filter: Option<String>,
    /// Bound on queued background jobs.
    pub job_queue_capacity: usize,
    /// Broadcast capacity for tag events.
    pub event_channel_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            poll_every_ticks: 10,
            tick_interval: Duration::from_secs(1),
            drive_ticks: false,
            airport_filter: None,
            job_queue_capacity: 32,
            event_channel_capacity: 256,
        }
    }
}

/// Handle to a running sync client.
///
/// Spawning starts the background worker (and, when configured, an
/// internal ticker). Every method is cheap and callable from the host
/// thread; remote work always goes through the worker queue.
pub struct RampClient {
    api: Arc<RampApi>,
    engine: Arc<ReconciliationEngine>,
    session: Arc<SessionState>,
    messages: Arc<MessageQueue>,
    snapshot: Arc<SnapshotCache>,
    catalogs: Arc<CatalogCache>,
    host: Arc<dyn RadarHost>,
    jobs: mpsc::Sender<Job>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    poll_every_ticks: u64,
    airport_filter: Option<String>,
}

impl std::fmt::Debug for RampClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RampClient")
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}

impl RampClient {
    /// Spawn the client with the given configuration and host.
    ///
    /// Starts the background worker and queues a one-shot version check.
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn spawn(config: ClientConfig, host: Arc<dyn RadarHost>) -> Self {
        let messages = Arc::new(MessageQueue::new());
        let api = Arc::new(RampApi::new(&config.api, Arc::clone(&messages)));
        let engine = Arc::new(ReconciliationEngine::new(config.event_channel_capacity));
        let session = Arc::new(SessionState::new());
        let snapshot = Arc::new(SnapshotCache::new());
        let catalogs = Arc::new(CatalogCache::new());

        let (jobs_tx, jobs_rx) = mpsc::channel(config.job_queue_capacity);
        let cancel = CancellationToken::new();

        let ctx = WorkerContext {
            api: Arc::clone(&api),
            engine: Arc::clone(&engine),
            session: Arc::clone(&session),
            host: Arc::clone(&host),
            messages: Arc::clone(&messages),
            snapshot: Arc::clone(&snapshot),
            catalogs: Arc::clone(&catalogs),
        };
        let worker_cancel = cancel.clone();
        let worker = tokio::spawn(async move {
            worker_loop(jobs_rx, ctx, worker_cancel).await;
        });

        let ticker = config.drive_ticks.then(|| {
            let jobs = jobs_tx.clone();
            let session = Arc::clone(&session);
            let messages = Arc::clone(&messages);
            let host = Arc::clone(&host);
            let cancel = cancel.clone();
            let tick_interval = config.tick_interval;
            let poll_every_ticks = config.poll_every_ticks;
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(tick_interval);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                let mut counter: u64 = 0;
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            counter += 1;
                            scheduler_tick(
                                counter,
                                poll_every_ticks,
                                &jobs,
                                &session,
                                &messages,
                                host.as_ref(),
                            );
                        }
                        () = cancel.cancelled() => break,
                    }
                }
            })
        });

        if let Err(e) = jobs_tx.try_send(Job::CheckVersion) {
            debug!("Could not queue the version check: {}", e);
        }

        info!(
            "Ramp client {} started (server: {})",
            VERSION,
            api.current_domain()
        );

        Self {
            api,
            engine,
            session,
            messages,
            snapshot,
            catalogs,
            host,
            jobs: jobs_tx,
            cancel,
            worker: Mutex::new(Some(worker)),
            ticker: Mutex::new(ticker),
            poll_every_ticks: config.poll_every_ticks,
            airport_filter: config
                .airport_filter
                .map(|prefix| prefix.trim().to_ascii_uppercase()),
        }
    }

    /// One scheduler tick from the host's timer.
    ///
    /// Queues a poll on the configured cadence (a busy worker defers to
    /// the next tick) and drains pending messages to the host. Never
    /// blocks.
    pub fn on_timer_tick(&self, counter: u64) {
        scheduler_tick(
            counter,
            self.poll_every_ticks,
            &self.jobs,
            &self.session,
            &self.messages,
            self.host.as_ref(),
        );
    }

    /// Record the controller's logon and start syncing.
    ///
    /// Observers (`is_controller == false`) get tags but cannot assign.
    /// Queues an immediate poll so the first picture does not wait a full
    /// poll period.
    pub fn connect(&self, callsign: &str, is_controller: bool) {
        self.session.connect(callsign, is_controller);
        if let Err(e) = self.jobs.try_send(Job::Poll) {
            debug!("Could not queue the initial poll: {}", e);
        }
    }

    /// End the session and clear every published tag.
    pub fn disconnect(&self) {
        self.session.disconnect();
        self.engine.reset();
    }

    /// Whether a session is active.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Open the assignment menu for an aircraft.
    ///
    /// Returns the catalog assembled from cached data (possibly empty on
    /// the first open for an airport) and queues a background refresh.
    /// `None` when the session cannot assign or the aircraft's
    /// destination is missing or outside the configured airport filter.
    #[must_use]
    pub fn open_assign_menu(&self, aircraft: &AircraftInfo) -> Option<StandCatalog> {
        if !self.session.can_assign() {
            debug!("Assignment menu unavailable: session cannot assign");
            return None;
        }
        let icao = self.assignment_airport(aircraft)?;

        if let Err(e) = self.jobs.try_send(Job::FetchCatalog { icao: icao.clone() }) {
            debug!("Could not queue a catalog refresh for {}: {}", icao, e);
        }

        let names = self.catalogs.names_for(&icao);
        let cached = self.snapshot.get();
        Some(StandCatalog::assemble(&icao, &names, &cached.snapshot))
    }

    /// Request a stand for an aircraft, or free its current stand with
    /// `None`.
    ///
    /// Validation happens here on the caller's thread; the request itself
    /// runs on the worker, and the result surfaces as tag state and
    /// queued messages.
    pub fn assign_stand(&self, aircraft: &AircraftInfo, stand: Option<&str>) {
        if !self.session.can_assign() {
            debug!("Dropping assignment request: session cannot assign");
            return;
        }
        let Some(icao) = self.assignment_airport(aircraft) else {
            return;
        };
        let callsign = engine::normalize_callsign(&aircraft.callsign);
        if callsign.is_empty() {
            return;
        }

        let job = Job::Assign {
            callsign,
            stand: stand.unwrap_or_default().trim().to_string(),
            icao,
        };
        if self.jobs.try_send(job).is_err() {
            self.host
                .display_message("Rampdesk is busy; try the assignment again in a moment.");
        }
    }

    /// Tag state for one callsign, if any.
    #[must_use]
    pub fn tag_for(&self, callsign: &str) -> Option<TagState> {
        self.engine.tag_for(callsign)
    }

    /// Text and highlight for one tag field. Cheap enough for every tag
    /// redraw; never blocks on the network.
    #[must_use]
    pub fn tag_item(&self, callsign: &str, field: TagField) -> Option<(String, Highlight)> {
        self.engine.tag_item(callsign, field)
    }

    /// Copy of every published tag.
    #[must_use]
    pub fn published_tags(&self) -> std::collections::HashMap<String, TagState> {
        self.engine.published_tags()
    }

    /// Subscribe to tag change events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TagEvent> {
        self.engine.subscribe()
    }

    /// The latest fetched snapshot and when it was fetched.
    #[must_use]
    pub fn latest_snapshot(&self) -> CachedSnapshot {
        self.snapshot.get()
    }

    /// Handle a scope command line (`.ramp …`).
    ///
    /// Returns `true` when the line was consumed.
    pub fn on_scope_command(&self, line: &str) -> bool {
        let Some(command) = commands::parse(line) else {
            return false;
        };
        match command {
            ScopeCommand::Version => {
                self.host
                    .display_message(&format!("Rampdesk client version {VERSION}."));
            }
            ScopeCommand::SetServer(domain) => {
                self.api.set_domain(&domain);
                self.host.display_message(&format!(
                    "Rampdesk server set to {}.",
                    self.api.current_domain()
                ));
            }
            ScopeCommand::Disconnect => {
                self.disconnect();
                self.host.display_message("Disconnected from Rampdesk.");
            }
            ScopeCommand::Usage => {
                self.host.display_message(USAGE);
            }
        }
        true
    }

    /// Current server domain.
    #[must_use]
    pub fn server_domain(&self) -> String {
        self.api.current_domain()
    }

    /// Stop the background tasks and wait for them to finish.
    ///
    /// The wait is bounded by the HTTP timeouts; an in-flight request is
    /// not cancelled mid-call.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let worker = self.worker.lock().ok().and_then(|mut handle| handle.take());
        if let Some(handle) = worker {
            if let Err(e) = handle.await {
                warn!("Sync worker ended abnormally: {}", e);
            }
        }
        let ticker = self.ticker.lock().ok().and_then(|mut handle| handle.take());
        if let Some(handle) = ticker {
            if let Err(e) = handle.await {
                warn!("Ticker ended abnormally: {}", e);
            }
        }
        info!("Ramp client stopped");
    }

    // Destination airport an assignment for this aircraft applies to.
    fn assignment_airport(&self, aircraft: &AircraftInfo) -> Option<String> {
        let destination = aircraft
            .destination
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();
        if destination.is_empty() {
            self.host.display_message(&format!(
                "{}: no destination airport on file, cannot assign a stand.",
                aircraft.callsign
            ));
            return None;
        }

        let icao = destination.to_ascii_uppercase();
        if let Some(prefix) = &self.airport_filter {
            if !icao.starts_with(prefix.as_str()) {
                self.host
                    .display_message(&format!("Stand assignment is not available for {icao}."));
                return None;
            }
        }
        Some(icao)
    }
}

impl Drop for RampClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
