use super::*;
use std::sync::atomic::{AtomicBool, AtomicUsize};

#[derive(Default)]
struct Counter {
    ticks: AtomicUsize,
}

impl Counter {
    fn count(&self) -> usize {
        self.ticks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PollHandler for Counter {
    async fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }
}

/// Takes longer than the interval and records overlapping ticks.
#[derive(Default)]
struct Slow {
    in_flight: AtomicBool,
    overlaps: AtomicUsize,
    completed: AtomicUsize,
}

#[async_trait]
impl PollHandler for Slow {
    async fn tick(&self) {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        tokio::time::sleep(Duration::from_millis(2500)).await;
        self.in_flight.store(false, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn counting(interval_ms: u64) -> (Arc<Counter>, PollLoop<Counter>) {
    let counter = Arc::new(Counter::default());
    let config = PollConfig {
        interval_ms,
        pause_when_hidden: true,
    };
    let poll = PollLoop::new(counter.clone(), config).unwrap();
    (counter, poll)
}

#[test]
fn test_zero_interval_rejected() {
    let config = PollConfig {
        interval_ms: 0,
        pause_when_hidden: true,
    };
    assert!(matches!(
        PollLoop::new(Arc::new(Counter::default()), config),
        Err(PollError::InvalidInterval)
    ));
}

#[test]
fn test_start_requires_runtime() {
    let (_, poll) = counting(1000);
    assert!(matches!(poll.start(), Err(PollError::NoRuntime)));
    assert_eq!(poll.status(), PollStatus::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_first_tick_is_immediate() {
    let (counter, poll) = counting(1000);
    assert!(poll.start().unwrap());

    tokio::time::sleep(ms(10)).await;
    assert_eq!(counter.count(), 1);

    tokio::time::sleep(ms(1000)).await;
    assert_eq!(counter.count(), 2);

    tokio::time::sleep(ms(3000)).await;
    assert_eq!(counter.count(), 5);
    assert_eq!(poll.tick_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent() {
    let (counter, poll) = counting(1000);
    assert!(poll.start().unwrap());
    assert!(!poll.start().unwrap());

    tokio::time::sleep(ms(2010)).await;
    assert_eq!(counter.count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_and_is_repeatable() {
    let (counter, poll) = counting(1000);
    poll.start().unwrap();
    tokio::time::sleep(ms(10)).await;

    assert!(poll.stop());
    assert!(!poll.stop());
    assert_eq!(poll.status(), PollStatus::Stopped);

    tokio::time::sleep(ms(5000)).await;
    assert_eq!(counter.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop() {
    let (counter, poll) = counting(1000);
    poll.start().unwrap();
    tokio::time::sleep(ms(10)).await;
    poll.stop();

    assert!(poll.start().unwrap());
    tokio::time::sleep(ms(10)).await;
    assert_eq!(counter.count(), 2);

    tokio::time::sleep(ms(1000)).await;
    assert_eq!(counter.count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_pause_and_resume_catches_up() {
    let (counter, poll) = counting(1000);
    poll.start().unwrap();
    tokio::time::sleep(ms(10)).await;

    assert!(poll.pause());
    assert!(!poll.pause());
    assert_eq!(poll.status(), PollStatus::Paused);

    tokio::time::sleep(ms(5000)).await;
    assert_eq!(counter.count(), 1);

    assert!(poll.resume().unwrap());
    assert!(!poll.resume().unwrap());
    tokio::time::sleep(ms(10)).await;
    assert_eq!(counter.count(), 2);

    tokio::time::sleep(ms(1000)).await;
    assert_eq!(counter.count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_resume_requires_pause() {
    let (counter, poll) = counting(1000);
    assert!(!poll.resume().unwrap());
    assert!(!poll.pause());

    tokio::time::sleep(ms(5000)).await;
    assert_eq!(counter.count(), 0);
    assert_eq!(poll.status(), PollStatus::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_paused() {
    let (counter, poll) = counting(1000);
    poll.start().unwrap();
    tokio::time::sleep(ms(10)).await;
    poll.pause();

    assert!(poll.stop());
    assert!(!poll.resume().unwrap());
    tokio::time::sleep(ms(3000)).await;
    assert_eq!(counter.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hidden_page_pauses() {
    let (counter, poll) = counting(1000);
    poll.start().unwrap();
    tokio::time::sleep(ms(10)).await;

    assert!(poll.set_hidden(true).unwrap());
    tokio::time::sleep(ms(4000)).await;
    assert_eq!(counter.count(), 1);

    assert!(poll.set_hidden(false).unwrap());
    tokio::time::sleep(ms(10)).await;
    assert_eq!(counter.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_hidden_ignored_when_disabled() {
    let counter = Arc::new(Counter::default());
    let config = PollConfig {
        interval_ms: 1000,
        pause_when_hidden: false,
    };
    let poll = PollLoop::new(counter.clone(), config).unwrap();
    poll.start().unwrap();

    assert!(!poll.set_hidden(true).unwrap());
    tokio::time::sleep(ms(2010)).await;
    assert_eq!(counter.count(), 3);
    assert!(poll.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_ticks_never_overlap() {
    let slow = Arc::new(Slow::default());
    let poll = PollLoop::new(slow.clone(), PollConfig::every(ms(1000))).unwrap();
    poll.start().unwrap();

    // Ticks finish at 2500, 5000 and 7500; the fourth is still running.
    tokio::time::sleep(ms(9000)).await;
    poll.stop();

    assert_eq!(slow.overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(slow.completed.load(Ordering::SeqCst), 3);
    assert_eq!(poll.tick_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_drop_cancels_task() {
    let (counter, poll) = counting(1000);
    poll.start().unwrap();
    tokio::time::sleep(ms(10)).await;
    drop(poll);

    tokio::time::sleep(ms(3000)).await;
    assert_eq!(counter.count(), 1);
}
