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

//! Host integration seam.
//!
//! The radar display owns the traffic picture and the message area; the
//! client only needs a narrow view of both. Hosts implement [`RadarHost`]
//! and keep their own marshalling (fixed tag buffers, color encodings) on
//! their side of the trait.

/// What the client needs to know about one visible aircraft.
///
/// Only `callsign` and `destination` drive behavior (visibility pruning
/// and the assignment airport); the rest rides along for hosts that share
/// this type with their own UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AircraftInfo {
    /// Radio callsign as shown on the tag.
    pub callsign: String,
    /// Flight-plan departure airport (ICAO).
    pub origin: Option<String>,
    /// Flight-plan destination airport (ICAO). Stand assignments apply
    /// here.
    pub destination: Option<String>,
    /// Flight-plan aircraft type designator.
    pub aircraft_type: Option<String>,
    /// Ground speed in knots, if the host tracks it.
    pub ground_speed: Option<f64>,
    /// Position in degrees (lat, lon), if the host tracks it.
    pub position: Option<(f64, f64)>,
}

/// Capabilities the client borrows from the radar display.
///
/// `visible_aircraft` is called from the background worker on every poll
/// and must be cheap, non-blocking, and callable from any thread.
/// `display_message` is called from whichever thread drives the scheduler
/// ticks: the host's own timer thread when the host ticks, or the
/// client's runtime when it ticks itself. Hosts that need thread affinity
/// for their message area should drive the ticks themselves.
pub trait RadarHost: Send + Sync {
    /// Every aircraft currently visible to the controller.
    fn visible_aircraft(&self) -> Vec<AircraftInfo>;

    /// Show a message in the host's message area.
    fn display_message(&self, message: &str);
}
