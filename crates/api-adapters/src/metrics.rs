//! Prometheus counters for board activity, exposed at `/metrics`.

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::registry::Registry;

pub struct BoardMetrics {
    registry: Registry,
    pub threads_created: Counter,
    pub posts_created: Counter,
    pub attachments_stored: Counter,
}

impl BoardMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("rusty_board");

        let threads_created = Counter::default();
        registry.register(
            "threads_created",
            "Threads created",
            threads_created.clone(),
        );
        let posts_created = Counter::default();
        registry.register("posts_created", "Posts created", posts_created.clone());
        let attachments_stored = Counter::default();
        registry.register(
            "attachments_stored",
            "Attachments written to the attachment store",
            attachments_stored.clone(),
        );

        Self {
            registry,
            threads_created,
            posts_created,
            attachments_stored,
        }
    }

    /// OpenMetrics text exposition.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}

impl Default for BoardMetrics {
    fn default() -> Self {
        Self::new()
    }
}
