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

//! Pending controller messages.
//!
//! Background work never talks to the host directly. Anything worth
//! telling the controller is pushed here and drained by the scheduler
//! tick, so messages always surface on the ticking thread, in the order
//! they were produced.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::warn;

// Drained every tick; the cap only matters if the host stops ticking.
const MAX_PENDING: usize = 64;

/// One message waiting to be shown to the controller.
#[derive(Debug, Clone)]
pub struct PendingMessage {
    /// Text to display.
    pub text: String,
    /// When the message was queued.
    pub timestamp: DateTime<Utc>,
}

/// FIFO queue of messages bound for the host's message area.
#[derive(Debug, Default)]
pub struct MessageQueue {
    inner: Mutex<VecDeque<PendingMessage>>,
}

impl MessageQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message for the next tick.
    pub fn push(&self, text: String) {
        if let Ok(mut queue) = self.inner.lock() {
            if queue.len() >= MAX_PENDING {
                queue.pop_front();
                warn!("Pending message queue full, dropping the oldest entry");
            }
            queue.push_back(PendingMessage {
                text,
                timestamp: Utc::now(),
            });
        }
    }

    /// Take every pending message, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<PendingMessage> {
        self.inner
            .lock()
            .map(|mut queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    /// Number of messages waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    /// True when nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_fifo_order() {
        let queue = MessageQueue::new();
        queue.push("first".to_string());
        queue.push("second".to_string());
        queue.push("third".to_string());

        let drained = queue.drain();
        let texts: Vec<&str> = drained.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_on_empty_queue() {
        let queue = MessageQueue::new();
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_cap_drops_oldest() {
        let queue = MessageQueue::new();
        for i in 0..MAX_PENDING + 5 {
            queue.push(format!("message {i}"));
        }
        assert_eq!(queue.len(), MAX_PENDING);

        let drained = queue.drain();
        assert_eq!(drained[0].text, "message 5");
    }
}
