// tests/common/mod.rs
//
// Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use hdrwin::api::MockClock;

/// Mock clock starting at an arbitrary non-zero wall time.
pub fn mock_clock() -> Arc<MockClock> {
    Arc::new(MockClock::new(1_700_000_000_000))
}

/// Run `work` on `threads` threads until `duration` elapses, then join them.
///
/// Each thread gets its index. Panics inside a worker fail the test.
pub fn run_in_parallel<F>(threads: usize, duration: Duration, work: F)
where
    F: Fn(usize) + Send + Sync + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let work = Arc::new(work);
    let handles: Vec<_> = (0..threads)
        .map(|id| {
            let stop = Arc::clone(&stop);
            let work = Arc::clone(&work);
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    work(id);
                }
            })
        })
        .collect();

    let started = Instant::now();
    while started.elapsed() < duration {
        thread::sleep(Duration::from_millis(10));
    }
    stop.store(true, Ordering::Relaxed);

    for handle in handles {
        handle.join().expect("worker thread panicked");
    }
}

/// Print test header with formatting
pub fn print_test_header(test_name: &str) {
    println!("\n{}", "=".repeat(60));
    println!("TEST: {}", test_name);
    println!("{}", "=".repeat(60));
}
