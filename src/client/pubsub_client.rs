use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::broker::{Message, PublishReport, Registry, Subscription};
use crate::config::BrokerSettings;
use crate::utils::error::BrokerError;

/// Handle used by producers and consumers.
///
/// Each call resolves its topic through the registry, so a client never
/// holds on to a topic the sweep has reclaimed.
#[derive(Debug, Clone)]
pub struct Client {
    registry: Arc<Registry>,
    /// Lifetime given to subscriptions when the caller does not pick one.
    subscription_ttl: Duration,
    /// Lifetime given to messages when the caller does not pick one.
    message_ttl: Duration,
}

impl Client {
    pub fn new(registry: Arc<Registry>, settings: &BrokerSettings) -> Self {
        Self {
            registry,
            subscription_ttl: settings.subscription_ttl(),
            message_ttl: settings.message_ttl(),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Records `payload` under `name` on `topic` and fans it out.
    /// Delivery is best-effort; see `PublishReport`.
    pub fn publish(
        &self,
        topic: &str,
        name: &str,
        payload: &str,
        ttl: Option<Duration>,
    ) -> Result<PublishReport, BrokerError> {
        let report = self
            .registry
            .publish(topic, name, payload, ttl.unwrap_or(self.message_ttl))?;
        debug!(
            "Published {name} to {topic}: {} enqueued, {} deferred, {} dropped",
            report.enqueued, report.deferred, report.dropped
        );
        Ok(report)
    }

    /// Opens or refreshes the session `session` on `topic` and returns its inbox.
    pub fn subscribe(
        &self,
        topic: &str,
        session: &str,
        ttl: Option<Duration>,
    ) -> Result<Arc<Subscription>, BrokerError> {
        self.registry
            .subscribe(topic, session, ttl.unwrap_or(self.subscription_ttl))
    }

    /// One receive cycle: subscribe (refreshing the session), then wait up
    /// to `wait` for a message. `Ok(None)` means nothing arrived in time.
    pub async fn poll(
        &self,
        topic: &str,
        session: &str,
        ttl: Option<Duration>,
        wait: Duration,
    ) -> Result<Option<Arc<Message>>, BrokerError> {
        let subscription = self.subscribe(topic, session, ttl)?;
        Ok(subscription.recv_timeout(wait).await)
    }
}
