use metrics::{counter, gauge};

/// Metrics collector for dispatch loops and multiplexed connections
#[derive(Clone)]
pub struct WsMetrics {
    prefix: &'static str,
}

impl WsMetrics {
    pub fn new() -> Self {
        Self { prefix: "cl_ws" }
    }

    /// Record a dispatch loop starting
    pub fn consumer_started(&self) {
        counter!(format!("{}.consumers.started", self.prefix)).increment(1);
        gauge!(format!("{}.consumers.active", self.prefix)).increment(1.0);
    }

    /// Record a dispatch loop ending, `reason` being `stopped`, `closed` or an error code
    pub fn consumer_stopped(&self, reason: &str) {
        counter!(format!("{}.consumers.stopped.{}", self.prefix, reason)).increment(1);
        gauge!(format!("{}.consumers.active", self.prefix)).decrement(1.0);
    }

    pub fn message_dispatched(&self, message_type: &str) {
        counter!(format!("{}.messages.dispatched", self.prefix)).increment(1);
        counter!(format!(
            "{}.messages.dispatched.{}",
            self.prefix, message_type
        ))
        .increment(1);
    }

    pub fn handler_preempted(&self) {
        counter!(format!("{}.handlers.preempted", self.prefix)).increment(1);
    }

    pub fn message_ignored(&self) {
        counter!(format!("{}.messages.ignored", self.prefix)).increment(1);
    }

    pub fn stream_accepted(&self, stream: &str) {
        counter!(format!("{}.streams.accepted.{}", self.prefix, stream)).increment(1);
    }

    pub fn frame_dropped(&self) {
        counter!(format!("{}.streams.frames_dropped", self.prefix)).increment(1);
    }

    pub fn child_failed(&self, stream: &str) {
        counter!(format!("{}.streams.failed.{}", self.prefix, stream)).increment(1);
    }

    /// Record children cancelled after the close timeout elapsed
    pub fn forced_shutdown(&self, cancelled: usize) {
        counter!(format!("{}.shutdown.forced", self.prefix)).increment(1);
        counter!(format!("{}.shutdown.cancelled_children", self.prefix))
            .increment(cancelled as u64);
    }

    pub fn protocol_violation(&self) {
        counter!(format!("{}.errors.protocol", self.prefix)).increment(1);
    }
}

impl Default for WsMetrics {
    fn default() -> Self {
        Self::new()
    }
}
