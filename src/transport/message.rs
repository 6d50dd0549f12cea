use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::broker::Message;

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "subscribe")]
    Subscribe {
        topic: String,
        id: String,
        ttl_ms: Option<u64>,
    },

    #[serde(rename = "publish")]
    Publish {
        topic: String,
        name: String,
        payload: String,
        ttl_ms: Option<u64>,
    },
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "message")]
    Message {
        topic: String,
        name: String,
        payload: String,
        published_at: DateTime<Utc>,
    },

    /// Nothing arrived before the session timeout. Not an error.
    #[serde(rename = "empty")]
    Empty { topic: String },

    #[serde(rename = "published")]
    Published {
        topic: String,
        name: String,
        enqueued: usize,
        deferred: usize,
        dropped: usize,
    },

    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerMessage {
    pub fn from_message(topic: &str, message: &Message) -> Self {
        ServerMessage::Message {
            topic: topic.to_string(),
            name: message.name.clone(),
            payload: message.payload.clone(),
            published_at: message.published_at,
        }
    }
}
