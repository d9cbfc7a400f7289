use crate::{
    Application, CONNECTION_ID_KEY, Inbound, Outbound, Result, Transport, WsError, WsMetrics,
};

use cl_config::MultiplexConfig;
use cl_core::{Message, Scope, close_code, event, message_type};

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use log::{debug, error, info, warn};
use serde_json::{Map, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinSet};
use tokio::time::timeout;

/// Scope key telling a child application which stream it serves
pub const STREAM_SCOPE_KEY: &str = "multiplexer_stream";

const STREAM_KEY: &str = "stream";
const PAYLOAD_KEY: &str = "payload";

/// Split a peer `websocket.receive` into its stream tag and payload.
///
/// Frames are text JSON objects `{"stream": <name>, "payload": <json>}`.
pub(crate) fn parse_frame(message: &Message) -> Result<(String, Value)> {
    let text = event::text(message)
        .ok_or_else(|| WsError::protocol("multiplexed frames must be text"))?;
    let frame: Value = serde_json::from_str(text)
        .map_err(|e| WsError::protocol(format!("frame is not valid JSON: {e}")))?;
    let Value::Object(mut frame) = frame else {
        return Err(WsError::protocol("frame is not a JSON object"));
    };

    let stream = match frame.remove(STREAM_KEY) {
        Some(Value::String(stream)) => stream,
        _ => return Err(WsError::protocol("frame has no string 'stream'")),
    };
    let payload = frame
        .remove(PAYLOAD_KEY)
        .ok_or_else(|| WsError::protocol(format!("frame for stream {stream} has no 'payload'")))?;

    Ok((stream, payload))
}

/// Wrap a child's payload for the peer.
pub(crate) fn encode_frame(stream: &str, payload: Value) -> String {
    let mut frame = Map::new();
    frame.insert(STREAM_KEY.to_string(), Value::String(stream.to_string()));
    frame.insert(PAYLOAD_KEY.to_string(), payload);
    Value::Object(frame).to_string()
}

/// Presents one transport connection as several independently running
/// child applications, one per named stream.
///
/// The peer sees a single accept (on the first child accept) and a single
/// close (once no accepted stream is left, once every child has finished, or
/// when the connection itself goes away). A stream closing before anything
/// accepted only denies that stream. Children never see each other's traffic.
pub struct Multiplexer {
    streams: BTreeMap<String, Arc<dyn Application>>,
    close_timeout: Duration,
    metrics: WsMetrics,
}

impl Multiplexer {
    pub fn new(close_timeout: Duration) -> Self {
        Self {
            streams: BTreeMap::new(),
            close_timeout,
            metrics: WsMetrics::new(),
        }
    }

    pub fn from_config(config: &MultiplexConfig) -> Self {
        Self::new(config.close_timeout())
    }

    /// Register `application` under `name`; a later registration replaces it.
    pub fn stream(mut self, name: &str, application: Arc<dyn Application>) -> Self {
        self.streams.insert(name.to_string(), application);
        self
    }

    pub fn stream_names(&self) -> Vec<&str> {
        self.streams.keys().map(String::as_str).collect()
    }

    pub fn close_timeout(&self) -> Duration {
        self.close_timeout
    }
}

#[async_trait]
impl Application for Multiplexer {
    async fn run(&self, scope: Scope, transport: Transport) -> Result<()> {
        let Transport { inbound, outbound } = transport;
        Session::start(self, scope, outbound).run(inbound).await
    }
}

/// Outbound handed to a child: tags everything with its stream name.
struct StreamOutbound {
    stream: String,
    sender: UnboundedSender<(String, Message)>,
}

#[async_trait]
impl Outbound for StreamOutbound {
    async fn send(&self, message: Message) -> Result<()> {
        self.sender
            .send((self.stream.clone(), message))
            .map_err(|_| WsError::transport_closed())
    }
}

struct StreamChild {
    inbound: UnboundedSender<Message>,
    accepting: bool,
    closed: bool,
    /// Frames that arrived before the child accepted, in arrival order
    buffer: Vec<Message>,
}

impl StreamChild {
    fn deliver(&self, stream: &str, message: Message) {
        if self.inbound.send(message).is_err() {
            debug!("Stream {} no longer reading, frame dropped", stream);
        }
    }
}

struct Session<'a> {
    multiplexer: &'a Multiplexer,
    label: String,
    outbound: Arc<dyn Outbound>,
    children: BTreeMap<String, StreamChild>,
    tasks: JoinSet<(String, Result<()>)>,
    downstream: UnboundedReceiver<(String, Message)>,
    accepted: bool,
    outward_closed: bool,
    closing: bool,
}

impl<'a> Session<'a> {
    fn start(multiplexer: &'a Multiplexer, scope: Scope, outbound: Arc<dyn Outbound>) -> Self {
        let label = scope.str_value(CONNECTION_ID_KEY).unwrap_or("-").to_string();
        let (downstream_tx, downstream) = mpsc::unbounded_channel();
        let mut children = BTreeMap::new();
        let mut tasks = JoinSet::new();

        for (name, application) in &multiplexer.streams {
            let (inbound_tx, inbound) = mpsc::unbounded_channel();
            let child_outbound = StreamOutbound {
                stream: name.clone(),
                sender: downstream_tx.clone(),
            };
            let child_scope = scope
                .clone()
                .with_value(STREAM_SCOPE_KEY, Value::String(name.clone()));
            let transport = Transport::new(inbound, Arc::new(child_outbound));
            let application = application.clone();
            let task_name = name.clone();

            tasks.spawn(async move {
                let result = AssertUnwindSafe(application.run(child_scope, transport))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| Err(WsError::handler("stream application panicked")));
                (task_name, result)
            });

            children.insert(
                name.clone(),
                StreamChild {
                    inbound: inbound_tx,
                    accepting: false,
                    closed: false,
                    buffer: Vec::new(),
                },
            );
        }

        debug!(
            "Connection {} multiplexing {} streams",
            label,
            children.len()
        );

        Self {
            multiplexer,
            label,
            outbound,
            children,
            tasks,
            downstream,
            accepted: false,
            outward_closed: false,
            closing: false,
        }
    }

    async fn run(mut self, mut inbound: Inbound) -> Result<()> {
        if self.tasks.is_empty() {
            self.close_outward(Some(close_code::NORMAL)).await;
            return Ok(());
        }

        loop {
            tokio::select! {
                biased;
                Some((stream, message)) = self.downstream.recv() => {
                    if let Err(e) = self.route_downstream(&stream, message).await {
                        return self.fail(Some(close_code::SERVER_ERROR), e).await;
                    }
                }
                Some(joined) = self.tasks.join_next() => {
                    if let Err(e) = self.child_finished(joined) {
                        return self.fail(Some(close_code::SERVER_ERROR), e).await;
                    }
                    if self.tasks.is_empty() {
                        return self.finish().await;
                    }
                }
                message = inbound.recv() => {
                    let message = match message {
                        Some(message) => message,
                        None => event::disconnect(close_code::ABNORMAL),
                    };
                    if message_type(&message) == Some(event::DISCONNECT) {
                        return self.shutdown(message).await;
                    }
                    if let Err(e) = self.route_upstream(message) {
                        self.multiplexer.metrics.protocol_violation();
                        return self.fail(None, e).await;
                    }
                }
            }
        }
    }

    /// Peer to child.
    fn route_upstream(&mut self, message: Message) -> Result<()> {
        match message_type(&message) {
            Some(event::CONNECT) => {
                for (stream, child) in &self.children {
                    child.deliver(stream, message.clone());
                }
                Ok(())
            }
            Some(event::RECEIVE) => {
                let (stream, payload) = parse_frame(&message)?;
                let child = self
                    .children
                    .get_mut(&stream)
                    .ok_or_else(|| WsError::protocol(format!("unknown stream '{stream}'")))?;
                let inner = event::receive_text(payload.to_string());

                if child.closed {
                    warn!(
                        "Connection {} dropped frame for closed stream {}",
                        self.label, stream
                    );
                    self.multiplexer.metrics.frame_dropped();
                } else if child.accepting {
                    child.deliver(&stream, inner);
                } else {
                    child.buffer.push(inner);
                }
                Ok(())
            }
            other => {
                debug!(
                    "Connection {} passing {:?} to every stream",
                    self.label, other
                );
                for (stream, child) in &self.children {
                    child.deliver(stream, message.clone());
                }
                Ok(())
            }
        }
    }

    /// Child to peer.
    async fn route_downstream(&mut self, stream: &str, message: Message) -> Result<()> {
        let Some(child) = self.children.get_mut(stream) else {
            return Ok(());
        };

        match message_type(&message) {
            Some(event::ACCEPT) => {
                if !child.accepting && !child.closed {
                    child.accepting = true;
                    for frame in child.buffer.drain(..) {
                        if child.inbound.send(frame).is_err() {
                            break;
                        }
                    }
                    self.multiplexer.metrics.stream_accepted(stream);
                    debug!("Connection {} stream {} accepted", self.label, stream);
                }
                if !self.accepted && !self.outward_closed {
                    self.accepted = true;
                    info!("Connection {} accepted", self.label);
                    self.outbound.send(message).await?;
                }
                Ok(())
            }
            Some(event::CLOSE) => {
                child.accepting = false;
                child.closed = true;
                let unread = std::mem::take(&mut child.buffer);
                warn_unread(&self.label, stream, unread.len());
                // Closing before any accept denies only this stream.
                if !self.closing && self.accepted && !self.any_accepting() {
                    self.close_outward(event::code(&message)).await;
                }
                Ok(())
            }
            Some(event::SEND) => {
                let text = event::text(&message).ok_or_else(|| {
                    WsError::child_failed(stream, "multiplexed streams can only send text")
                })?;
                let payload: Value = serde_json::from_str(text).map_err(|e| {
                    WsError::child_failed(stream, format!("sent text that is not JSON: {e}"))
                })?;
                if self.outward_closed {
                    debug!(
                        "Connection {} closed, dropping send from stream {}",
                        self.label, stream
                    );
                    return Ok(());
                }
                self.outbound
                    .send(event::send_text(encode_frame(stream, payload)))
                    .await
            }
            _ => self.outbound.send(message).await,
        }
    }

    /// Drop every pre-accept buffer, reporting what was never read.
    fn discard_buffers(&mut self) {
        for (stream, child) in &mut self.children {
            let unread = std::mem::take(&mut child.buffer);
            warn_unread(&self.label, stream, unread.len());
        }
    }

    fn any_accepting(&self) -> bool {
        self.children.values().any(|child| child.accepting)
    }

    fn child_finished(
        &mut self,
        joined: std::result::Result<(String, Result<()>), JoinError>,
    ) -> Result<()> {
        let (stream, result) = match joined {
            Ok(finished) => finished,
            // Only cancelled by us
            Err(_) => return Ok(()),
        };

        if let Some(child) = self.children.get_mut(&stream) {
            child.accepting = false;
            child.closed = true;
        }

        match result {
            Ok(()) => {
                debug!("Connection {} stream {} finished", self.label, stream);
                Ok(())
            }
            Err(e) if self.closing => {
                debug!(
                    "Connection {} stream {} failed while closing: {}",
                    self.label, stream, e
                );
                Ok(())
            }
            Err(e) => {
                self.multiplexer.metrics.child_failed(&stream);
                Err(WsError::child_failed(&stream, e.to_string()))
            }
        }
    }

    /// Every child is done on its own.
    async fn finish(mut self) -> Result<()> {
        while let Ok((stream, message)) = self.downstream.try_recv() {
            if let Err(e) = self.route_downstream(&stream, message).await {
                return self.fail(Some(close_code::SERVER_ERROR), e).await;
            }
        }
        self.close_outward(Some(close_code::NORMAL)).await;
        debug!("Connection {} all streams finished", self.label);
        Ok(())
    }

    /// The peer went away: tell every child, give them the close timeout,
    /// then cancel whatever is left.
    async fn shutdown(mut self, disconnect: Message) -> Result<()> {
        self.closing = true;
        debug!("Connection {} disconnecting streams", self.label);
        self.discard_buffers();
        for (stream, child) in &self.children {
            child.deliver(stream, disconnect.clone());
        }

        let label = self.label.clone();
        let tasks = &mut self.tasks;
        let drained = timeout(self.multiplexer.close_timeout, async {
            while let Some(joined) = tasks.join_next().await {
                if let Ok((stream, Err(e))) = joined {
                    debug!(
                        "Connection {} stream {} failed while closing: {}",
                        label, stream, e
                    );
                }
            }
        })
        .await;

        if drained.is_err() {
            let remaining = self.tasks.len();
            warn!(
                "Connection {} cancelling {} streams after {:?}",
                self.label, remaining, self.multiplexer.close_timeout
            );
            self.multiplexer.metrics.forced_shutdown(remaining);
            self.tasks.abort_all();
            while self.tasks.join_next().await.is_some() {}
        }

        self.downstream.close();
        let mut discarded = 0;
        while self.downstream.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!(
                "Connection {} discarded {} messages raised after disconnect",
                self.label, discarded
            );
        }
        Ok(())
    }

    /// Tear everything down after a connection-level failure.
    async fn fail(mut self, code: Option<u16>, error: WsError) -> Result<()> {
        error!(
            "Connection {} failed [{}]: {}",
            self.label,
            error.error_code(),
            error
        );

        // Route what children raised before the failure.
        while let Ok((stream, message)) = self.downstream.try_recv() {
            if let Err(e) = self.route_downstream(&stream, message).await {
                debug!("Connection {} stopped draining: {}", self.label, e);
                break;
            }
        }

        self.close_outward(code).await;
        self.closing = true;
        self.discard_buffers();
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}
        Err(error)
    }

    /// Close the peer connection at most once.
    async fn close_outward(&mut self, code: Option<u16>) {
        if self.outward_closed {
            return;
        }
        self.outward_closed = true;
        info!("Connection {} closing with {:?}", self.label, code);
        if let Err(e) = self.outbound.send(event::close(code, None)).await {
            debug!("Connection {} close not delivered: {}", self.label, e);
        }
    }
}

fn warn_unread(label: &str, stream: &str, unread: usize) {
    if unread > 0 {
        warn!(
            "Connection {} stream {} never read {} buffered frames",
            label, stream, unread
        );
    }
}
