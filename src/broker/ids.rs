//! Unique identifiers for messages and subscription activations.
//!
//! The broker only ever compares ids for equality. The source sits behind a
//! trait so tests and embedders can supply their own.

use std::fmt::Debug;

use uuid::Uuid;

use crate::utils::error::BrokerError;

pub type UniqueId = Uuid;

/// Mints identifiers that are collision-free with overwhelming probability.
pub trait IdSource: Send + Sync + Debug {
    fn new_unique_id(&self) -> Result<UniqueId, BrokerError>;
}

/// Random (v4) UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn new_unique_id(&self) -> Result<UniqueId, BrokerError> {
        Ok(Uuid::new_v4())
    }
}
