//! Topic registry
//!
//! The `Registry` is the directory of topics for one broker instance. Topics
//! are created on first use and reclaimed by `clean` once they have no
//! subscriptions left. `run_sweeper` drives `clean` on a fixed interval; it
//! only bounds memory, since expiry is always checked lazily on access.
//!
//! The registry is an explicit value. The server, the `Client` facade and
//! tests each hold an `Arc<Registry>`; nothing is process-global.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::broker::ids::{IdSource, RandomIds};
use crate::broker::message::Message;
use crate::broker::subscription::Subscription;
use crate::broker::topic::{PublishReport, Topic, TopicContext};
use crate::config::BrokerSettings;
use crate::utils::error::BrokerError;
use crate::utils::lock;

/// What one cleanup pass reclaimed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanReport {
    pub topics_removed: usize,
    pub subscriptions_removed: usize,
    pub messages_removed: usize,
}

#[derive(Debug)]
pub struct Registry {
    topics: Mutex<HashMap<String, Arc<Topic>>>,
    ctx: TopicContext,
    sweep_interval: Duration,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(&BrokerSettings::default())
    }
}

impl Registry {
    pub fn new(settings: &BrokerSettings) -> Self {
        Self::with_id_source(settings, Arc::new(RandomIds))
    }

    pub fn with_id_source(settings: &BrokerSettings, ids: Arc<dyn IdSource>) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            ctx: TopicContext::new(settings, ids),
            sweep_interval: settings.sweep_interval(),
        }
    }

    /// Returns the topic registered under `name`, creating it if needed.
    /// Concurrent callers always observe the same instance.
    pub fn get_topic(&self, name: &str) -> Arc<Topic> {
        let mut topics = lock(&self.topics);
        Arc::clone(
            topics
                .entry(name.to_string())
                .or_insert_with(|| Topic::new(name, self.ctx.clone())),
        )
    }

    pub fn contains_topic(&self, name: &str) -> bool {
        lock(&self.topics).contains_key(name)
    }

    pub fn topic_count(&self) -> usize {
        lock(&self.topics).len()
    }

    /// Builds a message with an id from this registry's id source.
    pub fn new_message(&self, name: &str, payload: &str, ttl: Duration) -> Result<Message, BrokerError> {
        let id = self.ctx.ids.new_unique_id()?;
        Ok(Message::new(id, name, payload, ttl))
    }

    /// Records and fans out a new message on `topic`.
    ///
    /// If the sweep reclaims the topic between lookup and record, the
    /// publish is retried on the topic that replaces it.
    pub fn publish(&self, topic: &str, name: &str, payload: &str, ttl: Duration) -> Result<PublishReport, BrokerError> {
        let message = Arc::new(self.new_message(name, payload, ttl)?);
        loop {
            match self.get_topic(topic).record_and_publish(Arc::clone(&message)) {
                Err(BrokerError::TopicRetired { .. }) => continue,
                result => return result,
            }
        }
    }

    /// Gets or creates the subscription `name` on `topic`, retrying on a
    /// fresh topic if the sweep reclaims the one it found.
    pub fn subscribe(&self, topic: &str, name: &str, ttl: Duration) -> Result<Arc<Subscription>, BrokerError> {
        loop {
            match self.get_topic(topic).get_subscription(name, ttl) {
                Err(BrokerError::TopicRetired { .. }) => continue,
                result => return result,
            }
        }
    }

    /// Reconciles every topic and drops the ones left without subscriptions.
    ///
    /// The registry lock is only held for the snapshot and for each removal;
    /// topics reconcile under their own locks.
    pub fn clean(&self) -> CleanReport {
        let topics: Vec<Arc<Topic>> = lock(&self.topics).values().cloned().collect();

        let mut report = CleanReport::default();
        for topic in topics {
            report.subscriptions_removed += topic.clean_expired_subscriptions();
            report.messages_removed += topic.clean_expired_cached_messages();

            if topic.subscription_count() > 0 {
                continue;
            }

            let mut registered = lock(&self.topics);
            let same_instance = registered
                .get(topic.name())
                .is_some_and(|current| Arc::ptr_eq(current, &topic));
            if same_instance && topic.retire_if_idle() {
                registered.remove(topic.name());
                report.topics_removed += 1;
            }
        }

        report
    }

    /// Spawns `run_sweeper` on the current runtime with the configured interval.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(Self::run_sweeper(Arc::downgrade(self), self.sweep_interval))
    }

    /// Calls `clean` every `interval` until the registry is dropped.
    pub async fn run_sweeper(registry: Weak<Registry>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        info!("Sweeper running every {interval:?}");
        loop {
            ticker.tick().await;
            let Some(live) = registry.upgrade() else {
                debug!("Registry dropped, sweeper exiting");
                break;
            };

            let report = live.clean();
            debug!(
                "Sweep removed {} topics, {} subscriptions, {} messages",
                report.topics_removed, report.subscriptions_removed, report.messages_removed
            );
        }
    }
}
