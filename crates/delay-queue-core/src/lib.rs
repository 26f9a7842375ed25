mod error;
mod heap;
mod item;
mod ordering;

pub use error::{QueueError, Result};
pub use heap::Heap;
pub use item::QueueItem;
pub use ordering::{by_key, compare_delay, composite, natural, reversed, Comparator, Equals};
