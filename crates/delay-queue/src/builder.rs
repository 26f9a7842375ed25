use crate::config::QueueSettings;
use crate::metrics::{MetricsConfig, NoopObserver, PrometheusObserver, QueueObserver};
use crate::queue::DelayPriorityQueue;
use delay_queue_core::{natural, Comparator, Equals, QueueError, Result};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default sleep between empty polls of the consuming iterator
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Builder for [`DelayPriorityQueue`]; `build` validates the configuration
pub struct QueueBuilder<T> {
    comparator: Option<Comparator<T>>,
    equals: Option<Equals<T>>,
    dedupe: bool,
    metrics: MetricsConfig<T>,
    observer: Option<Arc<dyn QueueObserver<T>>>,
    poll_interval: Duration,
}

impl<T: Send + Sync + 'static> QueueBuilder<T> {
    pub fn new() -> Self {
        QueueBuilder {
            comparator: None,
            equals: None,
            dedupe: false,
            metrics: MetricsConfig::new(),
            observer: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn comparator<F>(self, cmp: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.with_comparator(Arc::new(cmp))
    }

    pub fn with_comparator(mut self, comparator: Comparator<T>) -> Self {
        self.comparator = Some(comparator);
        self
    }

    pub fn equals<F>(self, eq: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.with_equals(Arc::new(eq))
    }

    pub fn with_equals(mut self, equals: Equals<T>) -> Self {
        self.equals = Some(equals);
        self
    }

    /// Discard items equal to a dequeued item that sit right behind it
    pub fn dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn metrics(mut self, metrics: MetricsConfig<T>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Send events to a custom sink instead of Prometheus
    pub fn observer(mut self, observer: Arc<dyn QueueObserver<T>>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Apply file-based settings. Labellers already configured are kept.
    pub fn settings(mut self, settings: &QueueSettings) -> Self {
        self.dedupe = settings.dedupe;
        self.poll_interval = Duration::from_millis(settings.poll_interval_ms);
        self.metrics = settings.metrics.apply(self.metrics);
        self
    }

    pub fn build(self) -> Result<DelayPriorityQueue<T>> {
        let comparator = self.comparator.ok_or(QueueError::MissingComparator)?;
        if self.dedupe && self.equals.is_none() {
            return Err(QueueError::MissingEquals);
        }

        let observer: Arc<dyn QueueObserver<T>> = match self.observer {
            Some(observer) => observer,
            None if self.metrics.disable => Arc::new(NoopObserver),
            None => Arc::new(PrometheusObserver::new(&self.metrics)?),
        };

        debug!(
            "Created queue (metrics: {}, dedupe: {}, metrics disabled: {})",
            self.metrics.name, self.dedupe, self.metrics.disable
        );

        Ok(DelayPriorityQueue::from_parts(
            comparator,
            self.equals,
            self.dedupe,
            observer,
            self.poll_interval,
        ))
    }
}

impl<T: Ord + Send + Sync + 'static> QueueBuilder<T> {
    /// A builder ordered by `T`'s natural ascending order
    pub fn ordered() -> Self {
        Self::new().with_comparator(natural())
    }
}

impl<T: PartialEq + Send + Sync + 'static> QueueBuilder<T> {
    /// Enable deduplication using `T`'s own equality
    pub fn dedupe_eq(self) -> Self {
        self.dedupe(true).equals(|a: &T, b: &T| a == b)
    }
}

impl<T: Send + Sync + 'static> Default for QueueBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
