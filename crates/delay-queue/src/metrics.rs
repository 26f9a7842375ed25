//! Prometheus instrumentation for delay queues.
//!
//! Metric families are shared process-wide by name, so any number of queues
//! may report under the same prefix without tripping duplicate
//! registration.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use delay_queue_core::{QueueError, Result};
use once_cell::sync::Lazy;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, TextEncoder};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{trace, warn};

/// Default metric name prefix
pub const DEFAULT_METRICS_NAME: &str = "priority_queue";

/// Residency histogram buckets in milliseconds (1ms to 5 minutes)
pub const DEFAULT_DURATION_BUCKETS: [f64; 15] = [
    1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1_000.0, 2_500.0, 5_000.0, 10_000.0,
    30_000.0, 60_000.0, 300_000.0,
];

/// Derives a label value from a queued item
pub type Labeller<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// Receives queue events. All callbacks run while the queue lock is held,
/// so implementations must be quick and must not call back into the queue.
pub trait QueueObserver<T>: Send + Sync {
    /// An item was inserted; `size` is the count after insertion
    fn on_enqueue(&self, item: &T, size: usize);

    /// An item was removed by dequeue after spending `residency` queued
    fn on_dequeue(&self, item: &T, residency: Duration, size: usize);

    /// A duplicate adjacent to a dequeued item was discarded
    fn on_dedupe(&self, item: &T, size: usize);

    /// The queue was emptied without per-item events
    fn on_clear(&self);
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl<T> QueueObserver<T> for NoopObserver {
    fn on_enqueue(&self, _item: &T, _size: usize) {}
    fn on_dequeue(&self, _item: &T, _residency: Duration, _size: usize) {}
    fn on_dedupe(&self, _item: &T, _size: usize) {}
    fn on_clear(&self) {}
}

/// Metrics options for a queue
pub struct MetricsConfig<T> {
    /// Metric name prefix
    pub name: String,
    /// Static labels attached to every metric
    pub labels: BTreeMap<String, String>,
    /// Per-item label extractors, keyed by label name
    pub labeller: BTreeMap<String, Labeller<T>>,
    /// Residency histogram buckets (milliseconds)
    pub duration_buckets: Vec<f64>,
    /// Suppress all metrics
    pub disable: bool,
}

impl<T> MetricsConfig<T> {
    pub fn new() -> Self {
        MetricsConfig {
            name: DEFAULT_METRICS_NAME.to_string(),
            labels: BTreeMap::new(),
            labeller: BTreeMap::new(),
            duration_buckets: DEFAULT_DURATION_BUCKETS.to_vec(),
            disable: false,
        }
    }

    /// A config that emits nothing
    pub fn disabled() -> Self {
        Self::new().disable(true)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn label(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.labels.insert(key.into(), value.to_string());
        self
    }

    pub fn labeller<F>(mut self, key: impl Into<String>, extract: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.labeller.insert(key.into(), Arc::new(extract));
        self
    }

    pub fn duration_buckets(mut self, buckets: Vec<f64>) -> Self {
        self.duration_buckets = buckets;
        self
    }

    pub fn disable(mut self, disable: bool) -> Self {
        self.disable = disable;
        self
    }
}

impl<T> Default for MetricsConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for MetricsConfig<T> {
    fn clone(&self) -> Self {
        MetricsConfig {
            name: self.name.clone(),
            labels: self.labels.clone(),
            labeller: self.labeller.clone(),
            duration_buckets: self.duration_buckets.clone(),
            disable: self.disable,
        }
    }
}

impl<T> fmt::Debug for MetricsConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsConfig")
            .field("name", &self.name)
            .field("labels", &self.labels)
            .field("labeller", &self.labeller.keys().collect::<Vec<_>>())
            .field("duration_buckets", &self.duration_buckets)
            .field("disable", &self.disable)
            .finish()
    }
}

/// The metric families backing every queue that shares a name
struct QueueFamilies {
    /// Label names of the counters and the histogram
    item_labels: Vec<String>,
    /// Label names of the size gauge
    static_labels: Vec<String>,
    enqueued: IntCounterVec,
    dequeued: IntCounterVec,
    deduped: IntCounterVec,
    size: IntGaugeVec,
    duration: HistogramVec,
}

static FAMILIES: Lazy<DashMap<String, Arc<QueueFamilies>>> = Lazy::new(DashMap::new);

impl QueueFamilies {
    fn new(
        name: &str,
        item_labels: Vec<String>,
        static_labels: Vec<String>,
        buckets: Vec<f64>,
    ) -> std::result::Result<Self, prometheus::Error> {
        let item_names: Vec<&str> = item_labels.iter().map(String::as_str).collect();
        let static_names: Vec<&str> = static_labels.iter().map(String::as_str).collect();

        let enqueued = IntCounterVec::new(
            Opts::new(format!("{}_enqueued_total", name), "Total number of items enqueued"),
            &item_names,
        )?;

        let dequeued = IntCounterVec::new(
            Opts::new(format!("{}_dequeued_total", name), "Total number of items dequeued"),
            &item_names,
        )?;

        let deduped = IntCounterVec::new(
            Opts::new(
                format!("{}_deduped_total", name),
                "Total number of duplicate items discarded on dequeue",
            ),
            &item_names,
        )?;

        let size = IntGaugeVec::new(
            Opts::new(format!("{}_size", name), "Number of items currently queued"),
            &static_names,
        )?;

        let duration = HistogramVec::new(
            HistogramOpts::new(
                format!("{}_duration_milliseconds", name),
                "Time items spent queued before dequeue in milliseconds",
            )
            .buckets(buckets),
            &item_names,
        )?;

        Ok(QueueFamilies {
            item_labels,
            static_labels,
            enqueued,
            dequeued,
            deduped,
            size,
            duration,
        })
    }

    fn register(&self, registry: &prometheus::Registry) -> std::result::Result<(), prometheus::Error> {
        let collectors: [Box<dyn prometheus::core::Collector>; 5] = [
            Box::new(self.enqueued.clone()),
            Box::new(self.dequeued.clone()),
            Box::new(self.deduped.clone()),
            Box::new(self.size.clone()),
            Box::new(self.duration.clone()),
        ];

        for collector in collectors {
            match registry.register(collector) {
                Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Get or create the families registered under `config.name`
fn families_for<T>(config: &MetricsConfig<T>) -> Result<Arc<QueueFamilies>> {
    // Histogram children are built lazily, so bad buckets would otherwise
    // only surface on the first dequeue.
    if config.duration_buckets.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(QueueError::InvalidMetrics(format!(
            "duration buckets must be strictly increasing: {:?}",
            config.duration_buckets
        )));
    }

    let static_labels: Vec<String> = config.labels.keys().cloned().collect();
    let mut item_labels: Vec<String> = static_labels
        .iter()
        .chain(config.labeller.keys())
        .cloned()
        .collect();
    item_labels.sort();
    item_labels.dedup();

    let families = match FAMILIES.entry(config.name.clone()) {
        Entry::Occupied(entry) => entry.get().clone(),
        Entry::Vacant(entry) => {
            let families = QueueFamilies::new(
                &config.name,
                item_labels.clone(),
                static_labels.clone(),
                config.duration_buckets.clone(),
            )
            .map_err(|e| QueueError::InvalidMetrics(e.to_string()))?;
            families
                .register(prometheus::default_registry())
                .map_err(|e| QueueError::InvalidMetrics(e.to_string()))?;

            let families = Arc::new(families);
            entry.insert(families.clone());
            families
        }
    };

    if families.item_labels != item_labels || families.static_labels != static_labels {
        warn!(
            "Metrics {} already registered with labels {:?}; requested {:?}",
            config.name, families.item_labels, item_labels
        );
    }

    Ok(families)
}

/// Reports queue events to the process-wide Prometheus registry
pub struct PrometheusObserver<T> {
    families: Arc<QueueFamilies>,
    labels: BTreeMap<String, String>,
    labeller: BTreeMap<String, Labeller<T>>,
    size_values: Vec<String>,
}

impl<T> PrometheusObserver<T> {
    pub fn new(config: &MetricsConfig<T>) -> Result<Self> {
        let families = families_for(config)?;
        let size_values = families
            .static_labels
            .iter()
            .map(|name| config.labels.get(name).cloned().unwrap_or_default())
            .collect();

        Ok(PrometheusObserver {
            families,
            labels: config.labels.clone(),
            labeller: config.labeller.clone(),
            size_values,
        })
    }

    /// Label values in the order of the shared families. Names this queue
    /// does not know about get an empty value.
    fn item_values(&self, item: &T) -> Vec<String> {
        self.families
            .item_labels
            .iter()
            .map(|name| {
                if let Some(extract) = self.labeller.get(name) {
                    extract(item)
                } else {
                    self.labels.get(name).cloned().unwrap_or_default()
                }
            })
            .collect()
    }

    fn set_size(&self, size: usize) {
        let values: Vec<&str> = self.size_values.iter().map(String::as_str).collect();
        match self.families.size.get_metric_with_label_values(&values) {
            Ok(gauge) => gauge.set(size as i64),
            Err(e) => trace!("Skipping size gauge: {}", e),
        }
    }

    fn inc(&self, counter: &IntCounterVec, values: &[String]) {
        let values: Vec<&str> = values.iter().map(String::as_str).collect();
        match counter.get_metric_with_label_values(&values) {
            Ok(counter) => counter.inc(),
            Err(e) => trace!("Skipping counter: {}", e),
        }
    }
}

impl<T> QueueObserver<T> for PrometheusObserver<T> {
    fn on_enqueue(&self, item: &T, size: usize) {
        self.inc(&self.families.enqueued, &self.item_values(item));
        self.set_size(size);
    }

    fn on_dequeue(&self, item: &T, residency: Duration, size: usize) {
        let values = self.item_values(item);
        self.inc(&self.families.dequeued, &values);

        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        match self.families.duration.get_metric_with_label_values(&refs) {
            Ok(histogram) => histogram.observe(residency.as_secs_f64() * 1_000.0),
            Err(e) => trace!("Skipping duration histogram: {}", e),
        }
        self.set_size(size);
    }

    fn on_dedupe(&self, item: &T, size: usize) {
        self.inc(&self.families.deduped, &self.item_values(item));
        self.set_size(size);
    }

    fn on_clear(&self) {
        self.set_size(0);
    }
}

/// Render the default registry in Prometheus text format
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
