//! Topic management
//!
//! A `Topic` owns the live subscriptions for one topic name and a cache
//! holding the last message recorded under each message name. The two maps
//! have separate locks so publish fan-out and cache reads never wait on
//! subscription churn.
//!
//! Lock order, when more than one is held: registry map, then subscriptions,
//! then cache. No lock is held while delivering to an inbox.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::debug;

use crate::broker::ids::IdSource;
use crate::broker::message::Message;
use crate::broker::subscription::{Delivery, Subscription};
use crate::config::BrokerSettings;
use crate::utils::error::BrokerError;
use crate::utils::lock;

/// Settings and shared resources every topic of a registry delivers with.
#[derive(Debug, Clone)]
pub(crate) struct TopicContext {
    pub(crate) inbox_capacity: usize,
    pub(crate) publish_timeout: Duration,
    pub(crate) in_flight: Arc<Semaphore>,
    pub(crate) ids: Arc<dyn IdSource>,
}

impl TopicContext {
    pub(crate) fn new(settings: &BrokerSettings, ids: Arc<dyn IdSource>) -> Self {
        Self {
            inbox_capacity: settings.inbox_capacity,
            publish_timeout: settings.publish_timeout(),
            in_flight: Arc::new(Semaphore::new(settings.max_in_flight_deliveries.max(1))),
            ids,
        }
    }
}

/// What a single publish did for each active subscriber.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    pub enqueued: usize,
    pub deferred: usize,
    pub dropped: usize,
}

impl PublishReport {
    fn tally(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Enqueued => self.enqueued += 1,
            Delivery::Deferred => self.deferred += 1,
            Delivery::Dropped => self.dropped += 1,
        }
    }

    /// Number of subscribers the message was handed to.
    pub fn subscribers(&self) -> usize {
        self.enqueued + self.deferred + self.dropped
    }
}

#[derive(Debug)]
pub struct Topic {
    name: String,
    subscriptions: Mutex<HashMap<String, Arc<Subscription>>>,
    cache: Mutex<HashMap<String, Arc<Message>>>,
    // Written with both map locks held, so either lock is enough to read it.
    retired: AtomicBool,
    ctx: TopicContext,
    this: Weak<Topic>,
}

impl Topic {
    pub(crate) fn new(name: &str, ctx: TopicContext) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            name: name.to_string(),
            subscriptions: Mutex::new(HashMap::new()),
            cache: Mutex::new(HashMap::new()),
            retired: AtomicBool::new(false),
            ctx,
            this: this.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once the registry has dropped this topic.
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Stores `message` as the latest value for its name, replacing any
    /// previous one.
    pub fn record(&self, message: Arc<Message>) -> Result<(), BrokerError> {
        let mut cache = lock(&self.cache);
        if self.is_retired() {
            return Err(self.retired_error());
        }
        cache.insert(message.name.clone(), message);
        Ok(())
    }

    /// Snapshot of the cached messages that have not expired yet.
    pub fn cached_messages(&self) -> Vec<Arc<Message>> {
        lock(&self.cache)
            .values()
            .filter(|message| !message.is_expired())
            .cloned()
            .collect()
    }

    /// Drops expired messages from the cache and returns how many went.
    pub fn clean_expired_cached_messages(&self) -> usize {
        let mut cache = lock(&self.cache);
        let before = cache.len();
        cache.retain(|_, message| !message.is_expired());
        before - cache.len()
    }

    /// Hands `message` to every active subscriber.
    ///
    /// The subscriber list is copied under the lock and deliveries happen
    /// after it is released. A full inbox never delays the others.
    pub fn publish(&self, message: Arc<Message>) -> PublishReport {
        let active: Vec<Arc<Subscription>> = lock(&self.subscriptions)
            .values()
            .filter(|subscription| !subscription.is_expired())
            .cloned()
            .collect();

        let mut report = PublishReport::default();
        for subscription in &active {
            report.tally(subscription.deliver(Arc::clone(&message), &self.ctx));
        }
        report
    }

    /// Caches `message`, then publishes it. A subscriber created concurrently
    /// sees it at least once, through the cache replay or live.
    pub fn record_and_publish(&self, message: Arc<Message>) -> Result<PublishReport, BrokerError> {
        self.record(Arc::clone(&message))?;
        Ok(self.publish(message))
    }

    /// Returns the live subscription registered under `name`, pushing its
    /// deadline to `now + ttl`, or registers a new one.
    ///
    /// A new subscription gets a fresh id and is seeded with the unexpired
    /// cached messages once the lock is released.
    pub fn get_subscription(&self, name: &str, ttl: Duration) -> Result<Arc<Subscription>, BrokerError> {
        let subscription = {
            let mut subscriptions = lock(&self.subscriptions);
            if self.is_retired() {
                return Err(self.retired_error());
            }

            if let Some(existing) = subscriptions.get(name) {
                if !existing.is_expired() {
                    existing.set_expiration(ttl);
                    return Ok(Arc::clone(existing));
                }
            }

            let id = self.ctx.ids.new_unique_id()?;
            let subscription = Arc::new(Subscription::new(
                name,
                id,
                self.this.clone(),
                &self.name,
                ttl,
                self.ctx.inbox_capacity,
            ));
            subscriptions.insert(name.to_string(), Arc::clone(&subscription));
            subscription
        };

        let replay = self.cached_messages();
        debug!(
            "New subscription {} on {} ({} cached messages to replay)",
            name,
            self.name,
            replay.len()
        );
        for message in replay {
            subscription.deliver(message, &self.ctx);
        }

        Ok(subscription)
    }

    /// Removes expired subscriptions and returns how many went.
    pub fn clean_expired_subscriptions(&self) -> usize {
        let mut subscriptions = lock(&self.subscriptions);
        let before = subscriptions.len();
        subscriptions.retain(|_, subscription| !subscription.is_expired());
        before - subscriptions.len()
    }

    pub fn subscription_count(&self) -> usize {
        lock(&self.subscriptions).len()
    }

    pub(crate) fn is_current(&self, subscription: &Subscription) -> bool {
        let subscriptions = lock(&self.subscriptions);
        subscriptions
            .get(&subscription.name)
            .is_some_and(|registered| registered.id() == subscription.id())
            && !subscription.is_expired()
    }

    pub(crate) fn extend_subscription(&self, subscription: &Subscription, ttl: Duration) -> Result<(), BrokerError> {
        let subscriptions = lock(&self.subscriptions);
        let current = subscriptions
            .get(&subscription.name)
            .is_some_and(|registered| registered.id() == subscription.id());
        if !current || subscription.is_expired() {
            return Err(subscription.expired_error());
        }
        subscription.set_expiration(ttl);
        Ok(())
    }

    /// Marks the topic retired if it has no subscriptions. Called by the
    /// registry with its own map locked, right before removing the topic.
    pub(crate) fn retire_if_idle(&self) -> bool {
        let subscriptions = lock(&self.subscriptions);
        if !subscriptions.is_empty() {
            return false;
        }
        let _cache = lock(&self.cache);
        self.retired.store(true, Ordering::Release);
        true
    }

    fn retired_error(&self) -> BrokerError {
        BrokerError::TopicRetired {
            topic: self.name.clone(),
        }
    }
}
