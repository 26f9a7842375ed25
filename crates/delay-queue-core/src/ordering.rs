use crate::QueueItem;
use std::cmp::Ordering;
use std::sync::Arc;

/// Total order over payloads. `Less` means "dequeue first".
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Payload equality used to collapse duplicates on dequeue.
pub type Equals<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Order by delay gate: ungated items first, then earlier gates first.
/// Two ungated items compare equal so the payload comparator decides.
pub fn compare_delay<T>(a: &QueueItem<T>, b: &QueueItem<T>) -> Ordering {
    match (a.not_before(), b.not_before()) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(left), Some(right)) => left.cmp(&right),
    }
}

/// Heap order: delay gate first, then the caller's comparator.
pub fn composite<T>(
    comparator: &Comparator<T>,
) -> impl Fn(&QueueItem<T>, &QueueItem<T>) -> Ordering + '_ {
    move |a, b| compare_delay(a, b).then_with(|| comparator(a.item(), b.item()))
}

/// Natural ascending order of `T`
pub fn natural<T: Ord + 'static>() -> Comparator<T> {
    Arc::new(|a: &T, b: &T| a.cmp(b))
}

/// Invert a comparator (e.g. to dequeue the largest value first)
pub fn reversed<T: 'static>(comparator: Comparator<T>) -> Comparator<T> {
    Arc::new(move |a: &T, b: &T| comparator(b, a))
}

/// Order by an extracted key
pub fn by_key<T, K, F>(key: F) -> Comparator<T>
where
    T: 'static,
    K: Ord,
    F: Fn(&T) -> K + Send + Sync + 'static,
{
    Arc::new(move |a: &T, b: &T| key(a).cmp(&key(b)))
}
