//! Thread-safe, in-memory priority queue with delayed scheduling,
//! dequeue-time deduplication, and Prometheus instrumentation.
//!
//! ```rust,no_run
//! use delay_queue::QueueBuilder;
//! use std::time::Duration;
//!
//! let queue = QueueBuilder::<String>::ordered().dedupe_eq().build()?;
//! queue.enqueue("reindex".to_string());
//! queue.enqueue_with_delay("retry".to_string(), Duration::from_secs(5));
//!
//! assert_eq!(queue.dequeue().as_deref(), Some("reindex"));
//! assert_eq!(queue.dequeue(), None);
//! # Ok::<(), delay_queue::QueueError>(())
//! ```

pub mod builder;
pub mod config;
pub mod consume;
pub mod metrics;
pub mod queue;

pub use builder::{QueueBuilder, DEFAULT_POLL_INTERVAL};
pub use config::{MetricsSettings, QueueSettings};
pub use consume::Consume;
pub use metrics::{MetricsConfig, NoopObserver, PrometheusObserver, QueueObserver};
pub use queue::DelayPriorityQueue;

pub use delay_queue_core::{
    by_key, natural, reversed, Comparator, Equals, QueueError, QueueItem, Result,
};
