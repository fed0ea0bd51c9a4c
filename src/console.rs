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

//! Console stand-in for the radar display.
//!
//! Holds a mutable simulated traffic picture and uses stdout as the
//! message area, which is all the sync client needs from a host.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Mutex;

use ramp_client::{AircraftInfo, Highlight, RadarHost, TagState};

/// Simulated radar host.
#[derive(Debug, Default)]
pub struct ConsoleHost {
    traffic: Mutex<Vec<AircraftInfo>>,
}

impl ConsoleHost {
    /// Create a host with an initial traffic picture.
    pub fn new(traffic: Vec<AircraftInfo>) -> Self {
        Self {
            traffic: Mutex::new(traffic),
        }
    }

    /// Replace the visible traffic.
    pub fn set_traffic(&self, traffic: Vec<AircraftInfo>) {
        if let Ok(mut current) = self.traffic.lock() {
            *current = traffic;
        }
    }

    /// Find a visible aircraft by callsign.
    pub fn find(&self, callsign: &str) -> Option<AircraftInfo> {
        let callsign = callsign.trim().to_ascii_uppercase();
        self.traffic
            .lock()
            .ok()?
            .iter()
            .find(|aircraft| aircraft.callsign == callsign)
            .cloned()
    }
}

impl RadarHost for ConsoleHost {
    fn visible_aircraft(&self) -> Vec<AircraftInfo> {
        self.traffic
            .lock()
            .map(|traffic| traffic.clone())
            .unwrap_or_default()
    }

    fn display_message(&self, message: &str) {
        println!(
            "[{}] RAMPDESK: {}",
            chrono::Local::now().format("%H:%M:%S"),
            message
        );
    }
}

/// Parse one traffic spec: "AFR123@LFPG" or "AFR123@LFPG/A320".
///
/// The part before `@` is the callsign, the part after is the flight-plan
/// destination, and an optional `/TYPE` tail is the aircraft type. All
/// uppercased.
pub fn parse_traffic_spec(spec: &str) -> Option<AircraftInfo> {
    let spec = spec.trim();
    if spec.is_empty() {
        return None;
    }

    let (callsign, rest) = match spec.split_once('@') {
        Some((callsign, rest)) => (callsign, Some(rest)),
        None => (spec, None),
    };
    let callsign = callsign.trim().to_ascii_uppercase();
    if callsign.is_empty() {
        return None;
    }

    let mut info = AircraftInfo {
        callsign,
        ..Default::default()
    };
    if let Some(rest) = rest {
        let (destination, aircraft_type) = match rest.split_once('/') {
            Some((destination, aircraft_type)) => (destination, Some(aircraft_type)),
            None => (rest, None),
        };
        let destination = destination.trim().to_ascii_uppercase();
        if !destination.is_empty() {
            info.destination = Some(destination);
        }
        info.aircraft_type = aircraft_type
            .map(|t| t.trim().to_ascii_uppercase())
            .filter(|t| !t.is_empty());
    }
    Some(info)
}

/// Render the published tags as a fixed-width table.
pub fn render_tags(tags: &HashMap<String, TagState>) -> String {
    if tags.is_empty() {
        return "No published tags.\n".to_string();
    }

    let mut callsigns: Vec<&String> = tags.keys().collect();
    callsigns.sort();

    let mut out = String::new();
    let _ = writeln!(out, "{:<10} {:<8} {:<5} REMARK", "CALLSIGN", "STAND", "FLASH");
    for callsign in callsigns {
        if let Some(tag) = tags.get(callsign) {
            let flash = match tag.highlight {
                Highlight::Changed => "*",
                Highlight::Unchanged => "",
            };
            let _ = writeln!(
                out,
                "{:<10} {:<8} {:<5} {}",
                callsign, tag.stand, flash, tag.remark
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spec_with_destination() {
        let info = parse_traffic_spec("afr123@lfpg").unwrap();
        assert_eq!(info.callsign, "AFR123");
        assert_eq!(info.destination.as_deref(), Some("LFPG"));
        assert!(info.aircraft_type.is_none());
    }

    #[test]
    fn test_parse_spec_with_type() {
        let info = parse_traffic_spec("BAW22@EGLL/A320").unwrap();
        assert_eq!(info.callsign, "BAW22");
        assert_eq!(info.destination.as_deref(), Some("EGLL"));
        assert_eq!(info.aircraft_type.as_deref(), Some("A320"));
    }

    #[test]
    fn test_parse_spec_callsign_only() {
        let info = parse_traffic_spec("DLH9X").unwrap();
        assert_eq!(info.callsign, "DLH9X");
        assert!(info.destination.is_none());
    }

    #[test]
    fn test_parse_spec_rejects_empty() {
        assert!(parse_traffic_spec("").is_none());
        assert!(parse_traffic_spec("   ").is_none());
        assert!(parse_traffic_spec("@LFPG").is_none());
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let host = ConsoleHost::new(vec![parse_traffic_spec("AFR123@LFPG").unwrap()]);
        assert!(host.find("afr123").is_some());
        assert!(host.find("BAW22").is_none());
    }

    #[test]
    fn test_render_tags_sorted_with_flash_marker() {
        let mut tags = HashMap::new();
        tags.insert(
            "BAW22".to_string(),
            TagState {
                stand: "7".to_string(),
                remark: String::new(),
                highlight: Highlight::Changed,
            },
        );
        tags.insert(
            "AFR123".to_string(),
            TagState {
                stand: "12A".to_string(),
                remark: "heavy".to_string(),
                highlight: Highlight::Unchanged,
            },
        );

        let rendered = render_tags(&tags);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("AFR123"));
        assert!(lines[1].contains("12A"));
        assert!(lines[1].contains("heavy"));
        assert!(lines[2].starts_with("BAW22"));
        assert!(lines[2].contains('*'));
    }
}
