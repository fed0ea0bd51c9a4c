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

//! Controller session state.
//!
//! The host tells the client when the controller logs on and off. Polling
//! requires a session; issuing assignments additionally requires
//! controller privileges (observers watch, they do not move aircraft).

use std::sync::RwLock;

use log::info;

#[derive(Debug, Default)]
struct Inner {
    connected: bool,
    controller: bool,
    callsign: String,
}

/// Shared session state, read on every tick and every gate check.
#[derive(Debug, Default)]
pub struct SessionState {
    inner: RwLock<Inner>,
}

impl SessionState {
    /// Create a disconnected session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a logon.
    ///
    /// The callsign is normalized (trimmed, uppercased) and used for auth
    /// tokens and the `client` request parameter.
    pub fn connect(&self, callsign: &str, is_controller: bool) {
        if let Ok(mut inner) = self.inner.write() {
            inner.connected = true;
            inner.controller = is_controller;
            inner.callsign = callsign.trim().to_ascii_uppercase();
            info!(
                "Session connected as {} (controller: {})",
                inner.callsign, is_controller
            );
        }
    }

    /// Record a logoff.
    pub fn disconnect(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.connected = false;
            inner.controller = false;
            inner.callsign.clear();
        }
        info!("Session disconnected");
    }

    /// Whether a session is active. Gates polling.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.read().map(|inner| inner.connected).unwrap_or(false)
    }

    /// Whether manual assignments are allowed (connected, not an observer).
    #[must_use]
    pub fn can_assign(&self) -> bool {
        self.inner
            .read()
            .map(|inner| inner.connected && inner.controller)
            .unwrap_or(false)
    }

    /// The session callsign, empty when disconnected.
    #[must_use]
    pub fn callsign(&self) -> String {
        self.inner
            .read()
            .map(|inner| inner.callsign.clone())
            .unwrap_or_default()
    }
}
