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

//! Application configuration management.
//!
//! Persistent configuration in TOML format via confy. Command-line
//! arguments override whatever is stored here; `--save-config` writes the
//! merged result back.

use serde::{Deserialize, Serialize};

const APP_NAME: &str = "rampscope";
const CONFIG_NAME: &str = "config";

/// Application configuration stored in TOML format.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Configuration schema version for migrations.
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Rampdesk server domain, no scheme.
    #[serde(default = "default_server_domain")]
    pub server_domain: String,

    /// Controller callsign to connect as on startup (empty: start
    /// disconnected).
    #[serde(default)]
    pub callsign: String,

    /// Connect as observer (tags only, no assignment rights).
    #[serde(default)]
    pub observer: bool,

    /// Poll the server every N seconds.
    #[serde(default = "default_poll_every_secs")]
    pub poll_every_secs: u64,

    /// Restrict assignment to airports with this ICAO prefix (empty: any
    /// airport).
    #[serde(default)]
    pub airport_filter: String,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_server_domain() -> String {
    "rampdesk.aero".to_string()
}

fn default_poll_every_secs() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            server_domain: default_server_domain(),
            callsign: String::new(),
            observer: false,
            poll_every_secs: default_poll_every_secs(),
            airport_filter: String::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults on error.
    pub fn load() -> Self {
        match confy::load(APP_NAME, CONFIG_NAME) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Could not load configuration, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to the user.
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }
}
