use crate::{
    Application, ConsumerContext, Flow, HandlerTable, Inbound, Outbound, Result, Transport,
    WsError, WsMetrics,
};

use cl_config::DispatchConfig;
use cl_core::{Message, Scope, event, message_type};
use cl_layer::{ChannelLayer, DEFAULT_CHANNEL_PREFIX, non_local_name};

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinSet;

/// Lifecycle of a [`DispatchCore`]; `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    New,
    Running,
    Stopped,
}

enum Step {
    Finished(Result<Flow>),
    Preempted(Message),
}

/// Drives one connection: races its input sources and hands messages, one at
/// a time, to the consumer's handlers.
///
/// Inputs are the transport's inbound stream and, when a channel layer is
/// attached, a private mailbox allocated for this run. Each source is drained
/// by its own pump task into either the priority queue or the normal queue;
/// the loop prefers the priority queue, and a priority message arriving while
/// a normal handler is in flight drops that handler's future before the
/// priority handler runs.
pub struct DispatchCore<C> {
    consumer: C,
    handlers: Arc<HandlerTable<C>>,
    context: ConsumerContext,
    priority_types: Arc<HashSet<String>>,
    state: DispatchState,
    metrics: WsMetrics,
}

impl<C: Send + 'static> DispatchCore<C> {
    pub fn new(
        consumer: C,
        handlers: Arc<HandlerTable<C>>,
        scope: Scope,
        outbound: Arc<dyn Outbound>,
    ) -> Self {
        Self {
            consumer,
            handlers,
            context: ConsumerContext::new(scope, outbound, None),
            priority_types: Arc::new(HashSet::from([event::DISCONNECT.to_string()])),
            state: DispatchState::New,
            metrics: WsMetrics::new(),
        }
    }

    /// Attach a channel layer; a mailbox is allocated on it when the loop starts.
    pub fn with_layer(mut self, layer: Arc<dyn ChannelLayer>) -> Self {
        self.context.set_layer(layer);
        self
    }

    pub fn with_priority_types(mut self, priority_types: Arc<HashSet<String>>) -> Self {
        self.priority_types = priority_types;
        self
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    pub fn context(&self) -> &ConsumerContext {
        &self.context
    }

    pub fn into_consumer(self) -> C {
        self.consumer
    }

    /// Run until a handler stops the loop, a handler fails, or every input
    /// source is exhausted. Can only be called once.
    pub async fn run(&mut self, inbound: Inbound) -> Result<()> {
        if self.state != DispatchState::New {
            return Err(WsError::already_started());
        }
        self.state = DispatchState::Running;
        self.metrics.consumer_started();
        debug!("Consumer {} running", self.context.label());

        let mut pumps = JoinSet::new();
        let result = self.run_loop(inbound, &mut pumps).await;

        // The mailbox is released once its pump has actually been dropped.
        pumps.abort_all();
        while pumps.join_next().await.is_some() {}

        self.state = DispatchState::Stopped;
        match &result {
            Ok(()) => {
                debug!("Consumer {} stopped", self.context.label());
                self.metrics.consumer_stopped("stopped");
            }
            Err(e) => {
                error!(
                    "Consumer {} failed [{}]: {}",
                    self.context.label(),
                    e.error_code(),
                    e
                );
                self.metrics.consumer_stopped(e.error_code());
            }
        }
        result
    }

    async fn run_loop(&mut self, mut inbound: Inbound, pumps: &mut JoinSet<()>) -> Result<()> {
        let (priority_tx, mut priority) = mpsc::unbounded_channel();
        let (normal_tx, mut normal) = mpsc::unbounded_channel();

        if let Some(layer) = self.context.layer().cloned() {
            let channel = layer.new_channel(DEFAULT_CHANNEL_PREFIX).await?;
            debug!(
                "Consumer {} listening on {}",
                self.context.label(),
                non_local_name(&channel)
            );
            self.context.set_channel_name(channel.clone());

            // Weak senders: the queues close once the transport is gone even
            // though the mailbox never ends on its own.
            let router = Router {
                priority_types: self.priority_types.clone(),
                priority: priority_tx.downgrade(),
                normal: normal_tx.downgrade(),
            };
            pumps.spawn(async move {
                loop {
                    match layer.receive(&channel).await {
                        Ok(message) => {
                            if !router.forward(message) {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Mailbox {} receive failed: {}", channel, e);
                            break;
                        }
                    }
                }
            });
        }

        let priority_types = self.priority_types.clone();
        pumps.spawn(async move {
            while let Some(message) = inbound.recv().await {
                let target = if is_priority(&priority_types, &message) {
                    &priority_tx
                } else {
                    &normal_tx
                };
                if target.send(message).is_err() {
                    break;
                }
            }
        });

        let mut priority_seen = false;
        loop {
            let (message, is_priority) = tokio::select! {
                biased;
                Some(message) = priority.recv() => (message, true),
                Some(message) = normal.recv() => (message, false),
                else => return Ok(()),
            };

            let flow = if is_priority {
                priority_seen = true;
                self.dispatch(message).await?
            } else if priority_seen {
                debug!(
                    "Consumer {} ignoring {:?} after priority message",
                    self.context.label(),
                    message_type(&message)
                );
                self.metrics.message_ignored();
                continue;
            } else {
                let (flow, preempted) = self.dispatch_preemptible(message, &mut priority).await?;
                priority_seen |= preempted;
                flow
            };

            if flow == Flow::Stop {
                return Ok(());
            }
        }
    }

    /// Run a normal handler, cancelling it if a priority message shows up
    /// first. The flag reports whether that happened.
    async fn dispatch_preemptible(
        &mut self,
        message: Message,
        priority: &mut UnboundedReceiver<Message>,
    ) -> Result<(Flow, bool)> {
        let step = {
            let handler = self.handlers.resolve(&message)?;
            self.record(&message);
            let mut running = handler(&mut self.consumer, &self.context, message);

            tokio::select! {
                biased;
                result = &mut running => Step::Finished(result),
                Some(message) = priority.recv() => Step::Preempted(message),
            }
        };

        match step {
            Step::Finished(result) => Ok((result?, false)),
            Step::Preempted(message) => {
                info!(
                    "Consumer {} preempted by {:?}",
                    self.context.label(),
                    message_type(&message)
                );
                self.metrics.handler_preempted();
                Ok((self.dispatch(message).await?, true))
            }
        }
    }

    async fn dispatch(&mut self, message: Message) -> Result<Flow> {
        let handler = self.handlers.resolve(&message)?;
        self.record(&message);
        handler(&mut self.consumer, &self.context, message).await
    }

    fn record(&self, message: &Message) {
        if let Some(message_type) = message_type(message) {
            debug!(
                "Consumer {} dispatching {}",
                self.context.label(),
                message_type
            );
            self.metrics.message_dispatched(message_type);
        }
    }
}

struct Router {
    priority_types: Arc<HashSet<String>>,
    priority: mpsc::WeakUnboundedSender<Message>,
    normal: mpsc::WeakUnboundedSender<Message>,
}

impl Router {
    /// Returns false once the dispatch loop can no longer take messages.
    fn forward(&self, message: Message) -> bool {
        let target = if is_priority(&self.priority_types, &message) {
            &self.priority
        } else {
            &self.normal
        };
        target
            .upgrade()
            .is_some_and(|sender| sender.send(message).is_ok())
    }
}

fn is_priority(priority_types: &HashSet<String>, message: &Message) -> bool {
    message_type(message).is_some_and(|t| priority_types.contains(t))
}

type ConsumerFactory<C> = Box<dyn Fn(&Scope) -> C + Send + Sync>;

/// An [`Application`] that builds a fresh consumer per connection and runs
/// it through a [`DispatchCore`].
pub struct ConsumerApp<C> {
    factory: ConsumerFactory<C>,
    handlers: Arc<HandlerTable<C>>,
    layer: Option<Arc<dyn ChannelLayer>>,
    priority_types: Arc<HashSet<String>>,
}

impl<C: Send + 'static> ConsumerApp<C> {
    pub fn new<F>(factory: F, handlers: HandlerTable<C>) -> Self
    where
        F: Fn(&Scope) -> C + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            handlers: Arc::new(handlers),
            layer: None,
            priority_types: Arc::new(HashSet::from([event::DISCONNECT.to_string()])),
        }
    }

    pub fn with_layer(mut self, layer: Arc<dyn ChannelLayer>) -> Self {
        self.layer = Some(layer);
        self
    }

    pub fn with_dispatch_config(mut self, config: &DispatchConfig) -> Self {
        self.priority_types = Arc::new(config.priority_types.iter().cloned().collect());
        self
    }
}

#[async_trait]
impl<C: Send + 'static> Application for ConsumerApp<C> {
    async fn run(&self, scope: Scope, transport: Transport) -> Result<()> {
        let consumer = (self.factory)(&scope);
        let mut core = DispatchCore::new(
            consumer,
            self.handlers.clone(),
            scope,
            transport.outbound,
        )
        .with_priority_types(self.priority_types.clone());
        if let Some(layer) = &self.layer {
            core = core.with_layer(layer.clone());
        }
        core.run(transport.inbound).await
    }
}
