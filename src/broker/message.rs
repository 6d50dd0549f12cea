//! Message definitions for the broker
//!
//! A `Message` is immutable once created. It is cached by its topic under
//! `name` (last write wins) and fanned out to subscribers as an
//! `Arc<Message>`, so a publish never copies the payload per subscriber.
//!
//! Expiry is lazy: `is_expired` compares the clock against an absolute
//! deadline and nothing is ever scheduled per message.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::broker::ids::UniqueId;

#[derive(Debug, Clone)]
pub struct Message {
    pub name: String,
    pub payload: String,
    pub id: UniqueId,
    pub published_at: DateTime<Utc>,
    expires_at: Instant,
}

impl Message {
    pub fn new(id: UniqueId, name: impl Into<String>, payload: impl Into<String>, ttl: Duration) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
            id,
            published_at: Utc::now(),
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// True once the clock has passed the message's deadline.
    pub fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}
