use delay_queue::{MetricsConfig, QueueBuilder};
use std::thread::sleep;
use std::time::Duration;

#[test]
fn test_delayed_items_release_in_gate_order() {
    let queue = QueueBuilder::<&str>::ordered()
        .metrics(MetricsConfig::disabled())
        .build()
        .unwrap();

    queue.enqueue_with_delay("three-seconds", Duration::from_secs(3));
    queue.enqueue_with_delay("half-second", Duration::from_millis(500));
    queue.enqueue_with_delay("immediate", Duration::ZERO);
    assert_eq!(queue.size(), 3);

    assert_eq!(queue.dequeue(), Some("immediate"));
    assert_eq!(queue.dequeue(), None);

    sleep(Duration::from_millis(600));
    assert_eq!(queue.dequeue(), Some("half-second"));
    assert_eq!(queue.dequeue(), None);

    sleep(Duration::from_millis(2_900));
    assert_eq!(queue.dequeue(), Some("three-seconds"));
    assert_eq!(queue.size(), 0);
}

#[test]
fn test_ready_delayed_item_precedes_later_gates() {
    let queue = QueueBuilder::<u32>::ordered()
        .metrics(MetricsConfig::disabled())
        .build()
        .unwrap();

    // Payload order would put 1 first; the earlier gate wins
    queue.enqueue_with_delay(5, Duration::from_millis(20));
    queue.enqueue_with_delay(1, Duration::from_secs(60));

    sleep(Duration::from_millis(40));
    assert_eq!(queue.peek(), Some(5));
    assert_eq!(queue.dequeue(), Some(5));
    assert_eq!(queue.dequeue(), None);
    assert_eq!(queue.size(), 1);
}

#[test]
fn test_ungated_items_precede_elapsed_gates() {
    let queue = QueueBuilder::<u32>::ordered()
        .metrics(MetricsConfig::disabled())
        .build()
        .unwrap();

    queue.enqueue_with_delay(1, Duration::from_millis(10));
    sleep(Duration::from_millis(20));
    queue.enqueue(9);

    assert_eq!(queue.drain_ready(), vec![9, 1]);
}
