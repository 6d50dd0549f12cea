//! The broker core: registry, topics, subscriptions and messages.
//!
//! `Registry` → `Topic` → `Subscription`, each level owning the next.
//! Messages are shared as `Arc<Message>` between a topic's cache and the
//! inboxes it fans out to.

pub mod ids;
pub mod message;
pub mod registry;
pub mod subscription;
pub mod topic;

pub use ids::{IdSource, RandomIds, UniqueId};
pub use message::Message;
pub use registry::{CleanReport, Registry};
pub use subscription::{Delivery, Subscription};
pub use topic::{PublishReport, Topic};
