use crate::LayerError;

/// Outcome of delivering one group message to one member channel.
#[derive(Debug)]
pub enum Delivery {
    Delivered,
    Full,
    Failed(LayerError),
}

impl From<crate::Result<()>> for Delivery {
    fn from(result: crate::Result<()>) -> Self {
        match result {
            Ok(()) => Self::Delivered,
            Err(e) if e.is_channel_full() => Self::Full,
            Err(e) => Self::Failed(e),
        }
    }
}

/// Per-member results of a `group_send`.
#[derive(Debug, Default)]
pub struct GroupDelivery {
    outcomes: Vec<(String, Delivery)>,
}

impl GroupDelivery {
    pub fn new(outcomes: Vec<(String, Delivery)>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[(String, Delivery)] {
        &self.outcomes
    }

    pub fn members(&self) -> usize {
        self.outcomes.len()
    }

    pub fn delivered(&self) -> usize {
        self.count(|d| matches!(d, Delivery::Delivered))
    }

    pub fn full(&self) -> usize {
        self.count(|d| matches!(d, Delivery::Full))
    }

    pub fn failed(&self) -> usize {
        self.count(|d| matches!(d, Delivery::Failed(_)))
    }

    /// Channels that received the message
    pub fn delivered_to(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, d)| matches!(d, Delivery::Delivered))
            .map(|(channel, _)| channel.as_str())
            .collect()
    }

    fn count(&self, predicate: impl Fn(&Delivery) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, d)| predicate(d)).count()
    }
}
