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

//! Request token generation.
//!
//! Mutating requests carry a token derived from a shared secret and the
//! controller's own callsign; the server recomputes the digest to check
//! that the request came from a build of this client rather than a browser
//! poking at the API. This is deliberately weak authentication: no expiry,
//! no nonce, no replay protection. It raises the bar for casual forgery
//! and nothing more.

use sha2::{Digest, Sha256};

// Baked into the binary; rotating it is a coordinated release.
const SHARED_SECRET: &str = "rd-7c41f3b8a92e5d06";

/// Issue the request token for the given session callsign.
///
/// Deterministic: the same callsign always yields the same 64-character
/// lowercase hex string. Tokens are regenerated from current session state
/// on every request, never cached.
#[must_use]
pub fn issue_token(session_callsign: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(SHARED_SECRET.as_bytes());
    hasher.update(session_callsign.as_bytes());
    format!("{:x}", hasher.finalize())
}
