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

//! HTTP transport for the Rampdesk API.
//!
//! One [`RampApi`] lives for the whole session; every call runs on the
//! background worker, never on the host thread. Fetches fail soft: a dead
//! server degrades to empty results plus a single queued controller
//! message, so to the rest of the client an outage just looks like an
//! empty ramp.

mod types;

pub use types::{AssignmentOutcome, OccupancySnapshot, StandBinding, VersionInfo};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;

use crate::messages::MessageQueue;
use types::AssignmentReply;

const API_PREFIX: &str = "/api";
const USER_AGENT: &str = concat!("ramp-client/", env!("CARGO_PKG_VERSION"));

/// Errors from a single API call. These never escape the client; they are
/// absorbed into empty results and queued messages.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned HTTP {0}")]
    Http(reqwest::StatusCode),

    #[error("malformed response: {0}")]
    Parse(String),
}

/// Configuration for the API transport.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server domain, no scheme (e.g. "rampdesk.aero").
    pub domain: String,
    /// TCP connect timeout. Short: a slow server must not stall the sync
    /// cadence.
    pub connect_timeout: Duration,
    /// Overall per-request timeout, connect included.
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            domain: "rampdesk.aero".to_string(),
            connect_timeout: Duration::from_millis(700),
            request_timeout: Duration::from_secs(2),
        }
    }
}

/// HTTP client for the Rampdesk service.
pub struct RampApi {
    http: reqwest::Client,
    domain: RwLock<String>,
    messages: Arc<MessageQueue>,
    // Set after a reported fetch failure, cleared (with a recovery notice)
    // by the next success. One message per outage, not one per poll.
    fetch_fault: AtomicBool,
}

impl std::fmt::Debug for RampApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RampApi")
            .field("domain", &self.current_domain())
            .finish_non_exhaustive()
    }
}

impl RampApi {
    /// Build the transport. `messages` receives failure and recovery
    /// notices.
    #[must_use]
    pub fn new(config: &ApiConfig, messages: Arc<MessageQueue>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to a default HTTP client: {}", e);
                reqwest::Client::new()
            });

        Self {
            http,
            domain: RwLock::new(normalize_domain(&config.domain)),
            messages,
            fetch_fault: AtomicBool::new(false),
        }
    }

    /// Point the transport at a different server domain (scheme-less).
    pub fn set_domain(&self, domain: &str) {
        if let Ok(mut current) = self.domain.write() {
            *current = normalize_domain(domain);
        }
    }

    /// Current server domain.
    #[must_use]
    pub fn current_domain(&self) -> String {
        self.domain.read().map(|d| d.clone()).unwrap_or_default()
    }

    /// Fetch the full occupancy snapshot.
    ///
    /// Failure is not an error to the caller: it returns an empty snapshot,
    /// which the engine treats as "clear everything", and queues a message
    /// on the first consecutive failure only.
    pub async fn fetch_occupancy(&self) -> OccupancySnapshot {
        let url = format!("{}/occupancy", self.base_url());
        match self.get_json::<OccupancySnapshot>(&url).await {
            Ok(snapshot) => {
                self.note_fetch_success();
                snapshot
            }
            Err(e) => {
                self.note_fetch_failure("fetch the stand occupancy picture", &e);
                OccupancySnapshot::default()
            }
        }
    }

    /// Fetch the stand names published for an airport, unordered.
    ///
    /// The server returns a JSON object keyed by stand name; only the keys
    /// matter here. Empty on failure, with the same one-shot reporting as
    /// [`Self::fetch_occupancy`].
    pub async fn fetch_stand_names(&self, icao: &str) -> Vec<String> {
        let url = format!("{}/airports/{}/stands", self.base_url(), icao);
        match self
            .get_json::<serde_json::Map<String, serde_json::Value>>(&url)
            .await
        {
            Ok(stands) => {
                self.note_fetch_success();
                stands.into_iter().map(|(name, _)| name).collect()
            }
            Err(e) => {
                self.note_fetch_failure(&format!("fetch the stand list for {icao}"), &e);
                Vec::new()
            }
        }
    }

    /// Submit a manual assignment. An empty `stand` asks the server to
    /// free the aircraft's current stand.
    ///
    /// Never suppressed: this answers an explicit controller action, so
    /// the caller always gets a classified outcome to report.
    pub async fn submit_assignment(
        &self,
        callsign: &str,
        stand: &str,
        icao: &str,
        token: &str,
        client_callsign: &str,
    ) -> AssignmentOutcome {
        let url = format!("{}/assign", self.base_url());
        debug!("GET {} (callsign: {}, stand: \"{}\")", url, callsign, stand);

        let response = match self
            .http
            .get(&url)
            .query(&[
                ("stand", stand),
                ("icao", icao),
                ("callsign", callsign),
                ("token", token),
                ("client", client_callsign),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Assignment request for {} failed: {}", callsign, e);
                return AssignmentOutcome::TransportFailure;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Assignment request for {} returned HTTP {}", callsign, status);
            return AssignmentOutcome::TransportFailure;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Assignment reply for {} could not be read: {}", callsign, e);
                return AssignmentOutcome::TransportFailure;
            }
        };

        match serde_json::from_str::<AssignmentReply>(&body) {
            Ok(reply) => reply.into_outcome(),
            Err(e) => {
                warn!("Assignment reply for {} did not parse: {}", callsign, e);
                AssignmentOutcome::Malformed
            }
        }
    }

    /// Ask the server for the latest released client version.
    ///
    /// Quiet on any failure; version checking is advisory.
    pub async fn fetch_latest_version(&self) -> Option<VersionInfo> {
        let url = format!("{}/version", self.base_url());
        match self.get_json::<VersionInfo>(&url).await {
            Ok(info) => Some(info),
            Err(e) => {
                debug!("Version check failed: {}", e);
                None
            }
        }
    }

    fn base_url(&self) -> String {
        format!("https://{}{}", self.current_domain(), API_PREFIX)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        debug!("GET {}", url);
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Http(status));
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Parse(e.to_string()))
    }

    fn note_fetch_failure(&self, context: &str, error: &ApiError) {
        warn!("Failed to {}: {}", context, error);
        if !self.fetch_fault.swap(true, Ordering::Relaxed) {
            self.messages.push(format!(
                "Could not {context}: {error}. Further failures will not be repeated."
            ));
        }
    }

    fn note_fetch_success(&self) {
        if self.fetch_fault.swap(false, Ordering::Relaxed) {
            self.messages
                .push("Rampdesk server connection restored.".to_string());
        }
    }
}

fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> (RampApi, Arc<MessageQueue>) {
        let messages = Arc::new(MessageQueue::new());
        let api = RampApi::new(&ApiConfig::default(), Arc::clone(&messages));
        (api, messages)
    }

    #[test]
    fn test_base_url_uses_configured_domain() {
        let (api, _messages) = api();
        assert_eq!(api.base_url(), "https://rampdesk.aero/api");
    }

    #[test]
    fn test_set_domain_normalizes() {
        let (api, _messages) = api();
        api.set_domain(" ramp.example.org/ ");
        assert_eq!(api.current_domain(), "ramp.example.org");
        assert_eq!(api.base_url(), "https://ramp.example.org/api");
    }

    #[test]
    fn test_fetch_failures_reported_once_until_recovery() {
        let (api, messages) = api();
        let error = ApiError::Http(reqwest::StatusCode::BAD_GATEWAY);

        api.note_fetch_failure("fetch the stand occupancy picture", &error);
        assert_eq!(messages.len(), 1);

        api.note_fetch_failure("fetch the stand occupancy picture", &error);
        api.note_fetch_failure("fetch the stand list for LFPG", &error);
        assert_eq!(messages.len(), 1);

        api.note_fetch_success();
        assert_eq!(messages.len(), 2);
        let drained = messages.drain();
        assert!(drained[1].text.contains("restored"));

        // A quiet period over, the next outage is reported again.
        api.note_fetch_failure("fetch the stand occupancy picture", &error);
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_success_without_prior_failure_stays_quiet() {
        let (api, messages) = api();
        api.note_fetch_success();
        assert!(messages.is_empty());
    }
}
