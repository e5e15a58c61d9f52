use melody_core::input::events::TapEvent;
use melody_core::input::InputQueue;
use std::thread;

#[test]
fn test_input_queue_transmission() {
    let queue = InputQueue::new();
    let sender = queue.sender();

    let handle = thread::spawn(move || {
        sender.send(TapEvent::new(1, 1000.0)).unwrap();
        sender.send(TapEvent::new(2, 1500.0)).unwrap();
    });
    handle.join().unwrap();

    let first = queue.pop().expect("Should receive first tap");
    assert_eq!(first.lane, 1);
    assert_eq!(first.timestamp_ms, 1000.0);

    let second = queue.pop().expect("Should receive second tap");
    assert_eq!(second.lane, 2);

    assert!(queue.pop().is_none());
}

#[test]
fn test_drain_keeps_arrival_order() {
    let queue = InputQueue::new();
    queue.push(TapEvent::new(0, 10.0));
    queue.push(TapEvent::new(3, 11.0));
    queue.push(TapEvent::new(1, 9.0));
    assert_eq!(queue.len(), 3);

    let lanes: Vec<u8> = queue.drain().map(|tap| tap.lane).collect();
    assert_eq!(lanes, vec![0, 3, 1]);
    assert!(queue.is_empty());
}
