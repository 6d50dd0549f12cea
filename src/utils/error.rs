//! The `error` module defines the error type returned by broker operations.
//!
//! Absence is never an error here: topics and subscriptions are get-or-create.
//! What remains are the conditions a caller can act on.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// The subscription is no longer active on its topic. Obtain a new one.
    #[error("subscription '{name}' is expired")]
    SubscriptionExpired { name: String },

    /// The topic was reclaimed by the sweep. Fetch it again from the registry.
    #[error("topic '{topic}' has been removed from the registry")]
    TopicRetired { topic: String },

    /// The identifier source could not mint a unique id.
    #[error("failed to generate a unique id: {0}")]
    IdSource(String),
}
