use crate::{
    CapacityTable, ChannelLayer, Delivery, Extension, GroupDelivery, LayerError, LayerMetrics,
    Result, non_local_name, validate_channel_name, validate_group_name,
};

use cl_config::LayerConfig;
use cl_core::{Message, RESERVED_CHANNEL_KEY};

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, warn};
use rand::Rng;
use tokio::sync::Notify;
use tokio::time::Instant;

const EXTENSIONS: &[Extension] = &[Extension::Groups, Extension::Flush];

const MAILBOX_MARKER: &str = "inmemory";
const MAILBOX_RANDOM_LEN: usize = 12;
const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

struct ChannelQueue {
    /// `(expires_at, message)`, oldest first
    entries: VecDeque<(Instant, Message)>,
    notify: Arc<Notify>,
    /// Receivers currently parked on this channel
    waiters: usize,
}

impl ChannelQueue {
    fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            notify: Arc::new(Notify::new()),
            waiters: 0,
        }
    }

    fn is_idle(&self) -> bool {
        self.entries.is_empty() && self.waiters == 0
    }

    /// Pop expired entries off the head, returning how many were dropped.
    /// Expiry is a fixed offset from send time so the queue is ordered by it.
    fn drop_expired(&mut self, now: Instant) -> usize {
        let mut dropped = 0;
        while self
            .entries
            .front()
            .is_some_and(|(expires_at, _)| *expires_at <= now)
        {
            self.entries.pop_front();
            dropped += 1;
        }
        dropped
    }
}

#[derive(Default)]
struct LayerState {
    channels: HashMap<String, ChannelQueue>,
    /// group -> member channel -> last join
    groups: HashMap<String, HashMap<String, Instant>>,
}

impl LayerState {
    /// A channel that let a message expire is treated as abandoned.
    fn remove_from_groups(&mut self, channel: &str) {
        self.groups.retain(|_, members| {
            members.remove(channel);
            !members.is_empty()
        });
    }

    fn queue(&mut self, channel: &str) -> &mut ChannelQueue {
        if !self.channels.contains_key(channel) {
            debug!("Created channel {}", channel);
        }
        self.channels
            .entry(channel.to_string())
            .or_insert_with(ChannelQueue::new)
    }

    fn remove_if_idle(&mut self, channel: &str) {
        if self.channels.get(channel).is_some_and(ChannelQueue::is_idle) {
            self.channels.remove(channel);
            debug!("Removed drained channel {}", channel);
        }
    }
}

/// Single-process channel layer with bounded, expiring queues and groups.
///
/// All state sits behind one mutex that is never held across an `.await`,
/// so every check-then-mutate (capacity check and enqueue, sweep, group
/// update) happens as one uninterrupted step. Receivers park on a per-channel
/// [`Notify`]; parked receivers are woken in the order they parked.
pub struct InMemoryChannelLayer {
    expiry: Duration,
    group_expiry: Duration,
    capacities: CapacityTable,
    state: Mutex<LayerState>,
    sequence: AtomicU64,
    metrics: LayerMetrics,
}

impl InMemoryChannelLayer {
    pub fn new(expiry: Duration, group_expiry: Duration, capacities: CapacityTable) -> Self {
        Self {
            expiry,
            group_expiry,
            capacities,
            state: Mutex::new(LayerState::default()),
            sequence: AtomicU64::new(0),
            metrics: LayerMetrics::new(),
        }
    }

    pub fn from_config(config: &LayerConfig) -> Result<Self> {
        let capacities = CapacityTable::from_overrides(config.capacity, &config.channel_capacity)?;
        Ok(Self::new(config.expiry(), config.group_expiry(), capacities))
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    pub fn group_expiry(&self) -> Duration {
        self.group_expiry
    }

    pub fn capacity_for(&self, channel: &str) -> usize {
        self.capacities.capacity_for(channel)
    }

    /// Channels currently holding messages or parked receivers
    pub fn channel_count(&self) -> usize {
        self.lock().channels.len()
    }

    /// Messages stored on `channel`, expired ones included until swept
    pub fn queued(&self, channel: &str) -> usize {
        self.lock()
            .channels
            .get(channel)
            .map(|queue| queue.entries.len())
            .unwrap_or(0)
    }

    /// Current members of `group`, sorted
    pub fn group_members(&self, group: &str) -> Vec<String> {
        let state = self.lock();
        let mut members: Vec<String> = state
            .groups
            .get(group)
            .map(|members| members.keys().cloned().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    fn lock(&self) -> MutexGuard<'_, LayerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop expired messages on every channel and stale group memberships.
    fn sweep(&self, state: &mut LayerState, now: Instant) {
        let mut expired_channels = Vec::new();
        let mut expired_messages = 0;

        for (name, queue) in state.channels.iter_mut() {
            let dropped = queue.drop_expired(now);
            if dropped > 0 {
                expired_messages += dropped;
                expired_channels.push(name.clone());
            }
        }

        for name in &expired_channels {
            state.remove_from_groups(name);
            state.remove_if_idle(name);
        }

        if expired_messages > 0 {
            debug!(
                "Expired {} messages across {} channels",
                expired_messages,
                expired_channels.len()
            );
            self.metrics.messages_expired(expired_messages);
        }

        let group_expiry = self.group_expiry;
        state.groups.retain(|group, members| {
            members.retain(|channel, joined| {
                let live = now.saturating_duration_since(*joined) < group_expiry;
                if !live {
                    debug!("Membership of {} in group {} expired", channel, group);
                }
                live
            });
            !members.is_empty()
        });
    }

    fn enqueue(&self, channel: &str, message: Message) -> Result<()> {
        if message.contains_key(RESERVED_CHANNEL_KEY) {
            return Err(LayerError::reserved_key());
        }
        validate_channel_name(channel)?;

        let capacity = self.capacities.capacity_for(channel);
        let now = Instant::now();
        let mut state = self.lock();

        let (expired, accepted) = {
            let queue = state.queue(channel);
            let expired = queue.drop_expired(now);
            if queue.entries.len() >= capacity {
                (expired, false)
            } else {
                queue.entries.push_back((now + self.expiry, message));
                queue.notify.notify_one();
                (expired, true)
            }
        };

        if expired > 0 {
            state.remove_from_groups(channel);
            self.metrics.messages_expired(expired);
        }

        if !accepted {
            state.remove_if_idle(channel);
            self.metrics.channel_full();
            debug!("Channel {} full ({} messages)", channel, capacity);
            return Err(LayerError::channel_full(channel));
        }

        self.metrics.channels_active(state.channels.len());
        self.metrics.message_sent();
        Ok(())
    }
}

impl Default for InMemoryChannelLayer {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(cl_config::DEFAULT_EXPIRY_SECS),
            Duration::from_secs(cl_config::DEFAULT_GROUP_EXPIRY_SECS),
            CapacityTable::default(),
        )
    }
}

/// Keeps a channel alive while a receiver is parked on it.
struct WaiterGuard<'a> {
    layer: &'a InMemoryChannelLayer,
    channel: &'a str,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.layer.lock();
        if let Some(queue) = state.channels.get_mut(self.channel) {
            queue.waiters = queue.waiters.saturating_sub(1);
            // A cancelled receiver may have swallowed a wakeup meant for a message
            // that is still queued.
            if queue.waiters > 0 && !queue.entries.is_empty() {
                queue.notify.notify_one();
            }
        }
        state.remove_if_idle(self.channel);
    }
}

#[async_trait]
impl ChannelLayer for InMemoryChannelLayer {
    fn extensions(&self) -> &'static [Extension] {
        EXTENSIONS
    }

    async fn send(&self, channel: &str, message: Message) -> Result<()> {
        self.enqueue(channel, message)
    }

    async fn receive(&self, channel: &str) -> Result<Message> {
        validate_channel_name(channel)?;

        let notify = {
            let mut state = self.lock();
            self.sweep(&mut state, Instant::now());
            let queue = state.queue(channel);
            queue.waiters += 1;
            Arc::clone(&queue.notify)
        };
        let _waiter = WaiterGuard {
            layer: self,
            channel,
        };

        loop {
            let notified = notify.notified();
            tokio::pin!(notified);

            {
                let mut state = self.lock();
                if let Some(queue) = state.channels.get_mut(channel) {
                    let expired = queue.drop_expired(Instant::now());
                    let next = queue.entries.pop_front();
                    if expired > 0 {
                        state.remove_from_groups(channel);
                        self.metrics.messages_expired(expired);
                    }
                    if let Some((_, message)) = next {
                        self.metrics.message_received();
                        return Ok(message);
                    }
                }
                // Registered while the lock is held so a send cannot slip in
                // between the empty check and the wait.
                notified.as_mut().enable();
            }

            notified.await;
        }
    }

    async fn new_channel(&self, prefix: &str) -> Result<String> {
        let random: String = {
            let mut rng = rand::rng();
            (0..MAILBOX_RANDOM_LEN)
                .map(|_| LETTERS[rng.random_range(0..LETTERS.len())] as char)
                .collect()
        };
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let name = format!("{prefix}.{MAILBOX_MARKER}!{random}{sequence}");
        validate_channel_name(&name)?;

        debug!("Allocated mailbox under {}", non_local_name(&name));
        Ok(name)
    }

    async fn group_add(&self, group: &str, channel: &str) -> Result<()> {
        validate_group_name(group)?;
        validate_channel_name(channel)?;

        let mut state = self.lock();
        state
            .groups
            .entry(group.to_string())
            .or_default()
            .insert(channel.to_string(), Instant::now());
        Ok(())
    }

    async fn group_discard(&self, group: &str, channel: &str) -> Result<()> {
        validate_channel_name(channel)?;
        validate_group_name(group)?;

        let mut state = self.lock();
        if let Some(members) = state.groups.get_mut(group) {
            members.remove(channel);
            if members.is_empty() {
                state.groups.remove(group);
            }
        }
        Ok(())
    }

    async fn group_send(&self, group: &str, message: Message) -> Result<GroupDelivery> {
        validate_group_name(group)?;
        if message.contains_key(RESERVED_CHANNEL_KEY) {
            return Err(LayerError::reserved_key());
        }

        let members = {
            let mut state = self.lock();
            self.sweep(&mut state, Instant::now());
            let mut members: Vec<String> = state
                .groups
                .get(group)
                .map(|members| members.keys().cloned().collect())
                .unwrap_or_default();
            members.sort();
            members
        };

        let message = &message;
        let outcomes = join_all(members.into_iter().map(|channel| async move {
            let delivery = Delivery::from(self.send(&channel, message.clone()).await);
            (channel, delivery)
        }))
        .await;

        let delivery = GroupDelivery::new(outcomes);
        for (channel, outcome) in delivery.outcomes() {
            match outcome {
                Delivery::Delivered => {}
                Delivery::Full => {
                    warn!("Group {} message dropped for full channel {}", group, channel)
                }
                Delivery::Failed(e) => {
                    warn!("Group {} message to {} failed: {}", group, channel, e)
                }
            }
        }
        self.metrics.group_send(delivery.delivered(), delivery.full());

        Ok(delivery)
    }

    async fn flush(&self) -> Result<()> {
        let mut state = self.lock();
        state.groups.clear();
        // Parked receivers keep their queue (and its Notify) so later sends reach them.
        state.channels.retain(|_, queue| {
            queue.entries.clear();
            queue.waiters > 0
        });
        debug!("Flushed channel layer");
        Ok(())
    }
}
