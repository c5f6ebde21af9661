use std::sync::Arc;
use std::time::Duration;

use super::{config::Config, dispatcher::Dispatcher};

/// Builder for constructing a Dispatcher.
///
/// ```rust
/// use std::time::Duration;
/// use eventvisor::{Dispatcher, DispatcherConfig};
///
/// let dispatcher = Dispatcher::builder(DispatcherConfig::default())
///     .with_async_timeout(Duration::from_millis(250))
///     .build();
/// assert_eq!(dispatcher.config().async_timeout, Duration::from_millis(250));
/// ```
#[derive(Clone, Debug, Default)]
pub struct DispatcherBuilder {
    cfg: Config,
}

impl DispatcherBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self { cfg }
    }

    /// Overrides the per-listener async timeout (`0s` disables it).
    pub fn with_async_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.async_timeout = timeout;
        self
    }

    /// Overrides the buffer size hint.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.cfg.buffer_size = size;
        self
    }

    /// Builds the shared Dispatcher instance.
    ///
    /// The returned `Arc` is meant to be cloned into every publisher and subscriber.
    pub fn build(self) -> Arc<Dispatcher> {
        Arc::new(Dispatcher::new(self.cfg))
    }
}
