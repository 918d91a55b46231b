use std::sync::Arc;
use std::time::Instant;

use super::*;

#[test]
fn waiter_receives_matching_reply() {
    let rz = Arc::new(Rendezvous::<u32>::new());
    let guard = rz.lock();
    let worker = {
        let rz = Arc::clone(&rz);
        std::thread::spawn(move || {
            // Publishing blocks until the waiter parks and releases the lock.
            rz.publish(1, Ok(7));
        })
    };
    assert_eq!(rz.wait(guard, 1, Some(Duration::from_secs(10))).unwrap(), 7);
    worker.join().unwrap();
}

#[test]
fn stale_replies_are_ignored() {
    let rz = Rendezvous::<u32>::new();
    rz.publish(1, Ok(1));
    let guard = rz.lock();
    let err = rz
        .wait(guard, 2, Some(Duration::from_millis(20)))
        .unwrap_err();
    assert!(matches!(err, OffsceneError::Timeout(_)));
}

#[test]
fn timeout_is_bounded() {
    let rz = Rendezvous::<()>::new();
    let started = Instant::now();
    let err = rz
        .wait(rz.lock(), 1, Some(Duration::from_millis(30)))
        .unwrap_err();
    assert!(matches!(err, OffsceneError::Timeout(d) if d == Duration::from_millis(30)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn errors_are_delivered_as_replies() {
    let rz = Rendezvous::<()>::new();
    rz.publish(3, Err(OffsceneError::context_acquire("lost")));
    let err = rz.wait(rz.lock(), 3, None).unwrap_err();
    assert!(matches!(err, OffsceneError::ContextAcquire(_)));
}
