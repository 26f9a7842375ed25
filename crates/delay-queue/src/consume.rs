//! Continuous consumption of a queue.
//!
//! Both helpers poll `dequeue` and sleep for the queue's poll interval when
//! nothing is ready. They only stop when their cancellation token fires.

use crate::queue::DelayPriorityQueue;
use futures::Stream;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Blocking iterator over a queue. `next` sleeps the calling thread while
/// the queue is empty or gated, and returns `None` once cancelled.
pub struct Consume<'a, T> {
    queue: &'a DelayPriorityQueue<T>,
    token: CancellationToken,
    interval: Duration,
}

impl<'a, T> Iterator for Consume<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            if self.token.is_cancelled() {
                debug!("Consumer cancelled");
                return None;
            }
            if let Some(item) = self.queue.dequeue() {
                return Some(item);
            }
            std::thread::sleep(self.interval);
        }
    }
}

impl<T> DelayPriorityQueue<T> {
    /// Consume items on the current thread until `token` is cancelled
    pub fn consume(&self, token: CancellationToken) -> Consume<'_, T> {
        Consume {
            queue: self,
            token,
            interval: self.poll_interval,
        }
    }

    /// Async counterpart of [`consume`](Self::consume). Cancellation ends
    /// the stream without waiting out the current poll interval.
    pub fn stream(&self, token: CancellationToken) -> impl Stream<Item = T> + '_ {
        let interval = self.poll_interval;
        futures::stream::unfold(token, move |token| async move {
            loop {
                if token.is_cancelled() {
                    debug!("Stream consumer cancelled");
                    return None;
                }
                if let Some(item) = self.dequeue() {
                    return Some((item, token));
                }
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Stream consumer cancelled");
                        return None;
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        })
    }
}
