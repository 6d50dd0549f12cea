//! Subscriptions
//!
//! A `Subscription` is one activation of a named consumer session on a topic.
//! It owns a bounded inbox and an absolute deadline. Re-subscribing under the
//! same name after the deadline passes produces a new `Subscription` with a
//! new id; the old object stays inactive forever.
//!
//! Liveness is decided by `is_active`: the topic's map must still hold this
//! exact id under `name`, and the deadline must not have passed. Anything
//! acting on behalf of a subscription later (deferred deliveries, extensions)
//! re-checks it first.
//!
//! Every message reaches the inbox through one ordered path: once a message
//! has been deferred, later ones queue behind it rather than racing it for
//! free slots.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::OwnedSemaphorePermit;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace, warn};

use crate::broker::ids::UniqueId;
use crate::broker::message::Message;
use crate::broker::topic::{Topic, TopicContext};
use crate::utils::error::BrokerError;
use crate::utils::lock;

/// Outcome of handing one message to one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Placed in the inbox immediately.
    Enqueued,
    /// Queued behind a full inbox; delivered in order once room frees up,
    /// or dropped after the publish timeout.
    Deferred,
    /// Inbox full and no runtime to wait on, or the deferral limit is reached.
    Dropped,
}

#[derive(Debug)]
pub struct Subscription {
    pub name: String,
    id: UniqueId,
    topic_name: String,
    topic: Weak<Topic>,
    expires_at: Mutex<Instant>,
    sender: mpsc::Sender<Arc<Message>>,
    inbox: AsyncMutex<mpsc::Receiver<Arc<Message>>>,
    backlog: Mutex<Backlog>,
}

impl Subscription {
    pub(crate) fn new(
        name: &str,
        id: UniqueId,
        topic: Weak<Topic>,
        topic_name: &str,
        ttl: Duration,
        inbox_capacity: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(inbox_capacity.max(1));
        Self {
            name: name.to_string(),
            id,
            topic_name: topic_name.to_string(),
            topic,
            expires_at: Mutex::new(Instant::now() + ttl),
            sender,
            inbox: AsyncMutex::new(receiver),
            backlog: Mutex::new(Backlog::default()),
        }
    }

    pub fn id(&self) -> UniqueId {
        self.id
    }

    pub fn topic_name(&self) -> &str {
        &self.topic_name
    }

    pub fn expires_at(&self) -> Instant {
        *lock(&self.expires_at)
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at()
    }

    /// True while this exact activation is the one registered on its topic
    /// and its deadline has not passed.
    pub fn is_active(&self) -> bool {
        if self.is_expired() {
            return false;
        }
        self.topic
            .upgrade()
            .is_some_and(|topic| topic.is_current(self))
    }

    /// Moves the deadline to `now + ttl`.
    ///
    /// Fails with `SubscriptionExpired` if the subscription is no longer
    /// active; callers must subscribe again to get a fresh activation.
    pub fn extend_expiration(&self, ttl: Duration) -> Result<(), BrokerError> {
        match self.topic.upgrade() {
            Some(topic) => topic.extend_subscription(self, ttl),
            None => Err(self.expired_error()),
        }
    }

    /// Number of messages waiting in the inbox.
    pub fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Waits for the next message.
    pub async fn recv(&self) -> Option<Arc<Message>> {
        self.inbox.lock().await.recv().await
    }

    /// Waits up to `wait` for the next message. `None` means nothing arrived.
    pub async fn recv_timeout(&self, wait: Duration) -> Option<Arc<Message>> {
        tokio::time::timeout(wait, self.recv()).await.ok().flatten()
    }

    /// Takes the next message if one is already queued.
    pub fn try_recv(&self) -> Option<Arc<Message>> {
        self.inbox.try_lock().ok()?.try_recv().ok()
    }

    pub(crate) fn set_expiration(&self, ttl: Duration) {
        *lock(&self.expires_at) = Instant::now() + ttl;
    }

    pub(crate) fn expired_error(&self) -> BrokerError {
        BrokerError::SubscriptionExpired {
            name: self.name.clone(),
        }
    }

    /// Hands `message` to this subscriber without ever blocking the caller.
    ///
    /// A message goes straight into the inbox only when nothing is waiting
    /// ahead of it. Otherwise it joins the backlog, which a single drain task
    /// moves into the inbox in order as room frees up. Each backlogged message
    /// holds one of the registry's deferral permits and is dropped once it has
    /// waited the publish timeout.
    pub(crate) fn deliver(self: &Arc<Self>, message: Arc<Message>, ctx: &TopicContext) -> Delivery {
        let mut backlog = lock(&self.backlog);
        let message = if backlog.draining {
            message
        } else {
            match self.sender.try_send(message) {
                Ok(()) => return Delivery::Enqueued,
                Err(TrySendError::Full(message)) => message,
                Err(TrySendError::Closed(_)) => return Delivery::Dropped,
            }
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                "Inbox of {} on {} is full and no runtime is available; dropping {}",
                self.name, self.topic_name, message.name
            );
            return Delivery::Dropped;
        };
        let Ok(permit) = Arc::clone(&ctx.in_flight).try_acquire_owned() else {
            warn!(
                "Deferral limit reached; dropping {} for {} on {}",
                message.name, self.name, self.topic_name
            );
            return Delivery::Dropped;
        };

        backlog.queue.push_back(Waiting {
            message,
            deadline: Instant::now() + ctx.publish_timeout,
            _permit: permit,
        });
        if !backlog.draining {
            backlog.draining = true;
            runtime.spawn(Arc::clone(self).drain());
        }
        Delivery::Deferred
    }

    /// Moves the backlog into the inbox, head first, until it is empty.
    ///
    /// Wakes for room in the inbox, for the head's timeout, and for this
    /// subscription's deadline. An inactive subscription loses its whole
    /// backlog at once.
    async fn drain(self: Arc<Self>) {
        loop {
            if !self.is_active() {
                let abandoned = self.abandon_backlog();
                debug!(
                    "Dropped {abandoned} deferred messages: {} is no longer active on {}",
                    self.name, self.topic_name
                );
                return;
            }

            let head_deadline = {
                let mut backlog = lock(&self.backlog);
                let timed_out = backlog.drop_timed_out(Instant::now());
                if timed_out > 0 {
                    debug!(
                        "Dropped {timed_out} deferred messages for {} on {} after waiting for room",
                        self.name, self.topic_name
                    );
                }
                match backlog.queue.front() {
                    Some(head) => head.deadline,
                    None => {
                        backlog.draining = false;
                        return;
                    }
                }
            };
            // Past the deadline, so `is_active` sees the expiry on wake-up.
            let wake = head_deadline.min(self.expires_at() + Duration::from_millis(1));

            tokio::select! {
                reserved = self.sender.reserve() => {
                    let Ok(slot) = reserved else {
                        self.abandon_backlog();
                        return;
                    };
                    if !self.is_active() {
                        continue;
                    }
                    if let Some(head) = lock(&self.backlog).queue.pop_front() {
                        trace!("Deferred delivery of {} to {}", head.message.name, self.name);
                        slot.send(head.message);
                    }
                }
                () = tokio::time::sleep_until(wake.into()) => {}
            }
        }
    }

    fn abandon_backlog(&self) -> usize {
        let mut backlog = lock(&self.backlog);
        backlog.draining = false;
        backlog.queue.drain(..).count()
    }
}

/// A message waiting for room in a full inbox.
#[derive(Debug)]
struct Waiting {
    message: Arc<Message>,
    deadline: Instant,
    _permit: OwnedSemaphorePermit,
}

/// Messages queued behind a full inbox. `draining` is set while a drain task
/// owns the queue; no message bypasses the queue while it is set.
#[derive(Debug, Default)]
struct Backlog {
    queue: VecDeque<Waiting>,
    draining: bool,
}

impl Backlog {
    fn drop_timed_out(&mut self, now: Instant) -> usize {
        let before = self.queue.len();
        while self.queue.front().is_some_and(|head| head.deadline <= now) {
            self.queue.pop_front();
        }
        before - self.queue.len()
    }
}
