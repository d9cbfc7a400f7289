use metrics::{counter, gauge};

/// Metrics collector for channel layer traffic
#[derive(Clone)]
pub struct LayerMetrics {
    prefix: &'static str,
}

impl LayerMetrics {
    pub fn new() -> Self {
        Self { prefix: "cl_layer" }
    }

    pub fn message_sent(&self) {
        counter!(format!("{}.messages.sent", self.prefix)).increment(1);
    }

    pub fn message_received(&self) {
        counter!(format!("{}.messages.received", self.prefix)).increment(1);
    }

    pub fn channel_full(&self) {
        counter!(format!("{}.messages.rejected_full", self.prefix)).increment(1);
    }

    pub fn messages_expired(&self, count: usize) {
        counter!(format!("{}.messages.expired", self.prefix)).increment(count as u64);
    }

    pub fn channels_active(&self, count: usize) {
        gauge!(format!("{}.channels.active", self.prefix)).set(count as f64);
    }

    pub fn group_send(&self, delivered: usize, full: usize) {
        counter!(format!("{}.groups.sent", self.prefix)).increment(1);
        counter!(format!("{}.groups.delivered", self.prefix)).increment(delivered as u64);
        counter!(format!("{}.groups.dropped_full", self.prefix)).increment(full as u64);
    }
}

impl Default for LayerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
