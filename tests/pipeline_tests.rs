//! Stage-network engine tests: ordering, worker bounds, predicate routing,
//! fan-out, fan-in completion, rejection, backpressure, fault surfacing.

use fetchsum::pipeline::{Pipeline, QueueCap, Rejected, Stage, StageOpts, StageState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Terminal stage collecting everything it receives.
fn collecting_sink(pl: &Pipeline, name: &str) -> (Stage<i32, ()>, Arc<Mutex<Vec<i32>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    let stage = Stage::consume(pl, name, StageOpts::default(), move |n: i32| {
        sink_seen.lock().unwrap().push(n);
    });
    (stage, seen)
}

fn wait_for(cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("condition not reached within 2s");
}

// --- ordering ---

#[test]
fn test_single_worker_preserves_submission_order() {
    let pl = Pipeline::new();
    let double = Stage::transform(&pl, "double", StageOpts::default(), |n: i32| n * 2);
    let (sink, seen) = collecting_sink(&pl, "collect");
    double.link_to(&sink);
    pl.run(&double, 0..100).unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        (0..100).map(|n| n * 2).collect::<Vec<_>>()
    );
}

#[test]
fn test_multi_worker_delivers_every_item() {
    let pl = Pipeline::new();
    let jitter = Stage::transform(
        &pl,
        "jitter",
        StageOpts {
            workers: 8,
            queue: QueueCap::Unbounded,
        },
        |n: i32| {
            thread::sleep(Duration::from_millis((n % 4) as u64));
            n
        },
    );
    let (sink, seen) = collecting_sink(&pl, "collect");
    jitter.link_to(&sink);
    pl.run(&jitter, 0..64).unwrap();
    // Order across lanes is not guaranteed, delivery is.
    let mut got = seen.lock().unwrap().clone();
    got.sort_unstable();
    assert_eq!(got, (0..64).collect::<Vec<_>>());
}

// --- worker bound ---

#[test]
fn test_worker_count_bounds_concurrency() {
    let pl = Pipeline::new();
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (active_w, peak_w) = (Arc::clone(&active), Arc::clone(&peak));
    let slow = Stage::transform(
        &pl,
        "slow",
        StageOpts {
            workers: 4,
            queue: QueueCap::Unbounded,
        },
        move |n: i32| {
            let now = active_w.fetch_add(1, Ordering::SeqCst) + 1;
            peak_w.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(100));
            active_w.fetch_sub(1, Ordering::SeqCst);
            n
        },
    );
    let (sink, seen) = collecting_sink(&pl, "collect");
    slow.link_to(&sink);
    pl.run(&slow, 0..12).unwrap();
    assert_eq!(seen.lock().unwrap().len(), 12);
    let peak = peak.load(Ordering::SeqCst);
    assert!(peak <= 4, "peak concurrency {peak} exceeded worker count");
    assert!(peak >= 2, "expected overlapping lanes, saw peak {peak}");
}

// --- predicate routing ---

#[test]
fn test_predicate_routes_rejects_to_discard_sink() {
    let pl = Pipeline::new();
    let id = Stage::transform(&pl, "id", StageOpts::default(), |n: i32| n);
    let (sink, seen) = collecting_sink(&pl, "even");
    let discarded = id.link_when(&sink, |n: &i32| n % 2 == 0);
    pl.run(&id, 0..10).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![0, 2, 4, 6, 8]);
    assert_eq!(discarded.count(), 5);
}

#[test]
fn test_item_offered_to_every_link() {
    let pl = Pipeline::new();
    let src = Stage::transform(&pl, "src", StageOpts::default(), |n: i32| n);
    let (one, seen_one) = collecting_sink(&pl, "one");
    let (two, seen_two) = collecting_sink(&pl, "two");
    src.link_to(&one);
    src.link_to(&two);
    pl.run(&src, 0..5).unwrap();
    assert_eq!(*seen_one.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    assert_eq!(*seen_two.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_filtered_counts_never_increase_downstream() {
    let pl = Pipeline::new();
    let opts = StageOpts {
        workers: 4,
        queue: QueueCap::Unbounded,
    };
    let first = Stage::transform(&pl, "first", opts, |n: i32| n);
    let second = Stage::transform(&pl, "second", opts, |n: i32| n);
    let (sink, seen) = collecting_sink(&pl, "sink");
    let small_misses = first.link_when(&second, |n: &i32| *n < 50);
    let even_misses = second.link_when(&sink, |n: &i32| n % 2 == 0);
    pl.run(&first, 0..100).unwrap();

    assert_eq!(first.emitted(), 100);
    assert_eq!(small_misses.count(), 50);
    assert_eq!(second.processed(), 50);
    assert_eq!(even_misses.count(), 25);
    assert_eq!(seen.lock().unwrap().len(), 25);
    assert!(second.processed() <= first.emitted());
    assert!(seen.lock().unwrap().len() <= second.emitted());
}

// --- fan-out ---

#[test]
fn test_fan_out_zero_or_more_outputs() {
    let pl = Pipeline::new();
    let expand = Stage::transform_many(&pl, "expand", StageOpts::default(), |n: i32| match n % 3 {
        0 => vec![],
        1 => vec![n],
        _ => vec![n, n],
    });
    let (sink, seen) = collecting_sink(&pl, "collect");
    expand.link_to(&sink);
    pl.run(&expand, 0..9).unwrap();
    // 0,3,6 -> nothing; 1,4,7 -> one copy; 2,5,8 -> two copies, in order
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 2, 4, 5, 5, 7, 8, 8]);
    assert_eq!(expand.processed(), 9);
    assert_eq!(expand.emitted(), 9);
}

// --- completion ---

#[test]
fn test_completion_waits_for_all_sources() {
    let pl = Pipeline::new();
    let left = Stage::transform(&pl, "left", StageOpts::default(), |n: i32| n);
    let right = Stage::transform(&pl, "right", StageOpts::default(), |n: i32| n + 100);
    let (merge, seen) = collecting_sink(&pl, "merge");
    left.link_to(&merge);
    right.link_to(&merge);

    pl.start();
    left.submit(1).unwrap();
    right.submit(2).unwrap();
    left.complete();

    // One source finishing must not complete the merge stage.
    wait_for(|| left.state() == StageState::Completed);
    assert_ne!(merge.state(), StageState::Completed);

    right.complete();
    pl.join().unwrap();
    assert_eq!(merge.state(), StageState::Completed);
    let mut got = seen.lock().unwrap().clone();
    got.sort_unstable();
    assert_eq!(got, vec![1, 102]);
}

#[test]
fn test_submit_after_complete_is_rejected() {
    let pl = Pipeline::new();
    let solo = Stage::transform(&pl, "solo", StageOpts::default(), |n: i32| n);
    pl.start();
    solo.submit(1).unwrap();
    solo.complete();
    assert_eq!(solo.submit(2), Err(Rejected));
    pl.join().unwrap();
    assert_eq!(solo.state(), StageState::Completed);
    assert_eq!(solo.processed(), 1);
}

// --- backpressure ---

#[test]
fn test_bounded_queue_drains_under_backpressure() {
    let pl = Pipeline::new();
    let slow = Stage::transform(
        &pl,
        "slow",
        StageOpts {
            workers: 1,
            queue: QueueCap::Bounded(1),
        },
        |n: i32| {
            thread::sleep(Duration::from_millis(5));
            n
        },
    );
    let (sink, seen) = collecting_sink(&pl, "collect");
    slow.link_to(&sink);
    // 20 items through a 1-slot queue: submit blocks and drains, never fails.
    pl.run(&slow, 0..20).unwrap();
    assert_eq!(*seen.lock().unwrap(), (0..20).collect::<Vec<_>>());
}

// --- faults ---

#[test]
fn test_transform_panic_fails_the_run() {
    let pl = Pipeline::new();
    let explode = Stage::transform(&pl, "explode", StageOpts::default(), |n: i32| {
        if n == 3 {
            panic!("boom on {n}");
        }
        n
    });
    let (sink, _seen) = collecting_sink(&pl, "collect");
    explode.link_to(&sink);
    let err = pl.run(&explode, 0..10).unwrap_err();
    assert!(err.to_string().contains("panicked"), "unexpected error: {err}");
}

#[test]
fn test_trip_aborts_and_surfaces_reason() {
    let pl = Pipeline::new();
    let work = Stage::transform(&pl, "work", StageOpts::default(), |n: i32| n);
    let (sink, _seen) = collecting_sink(&pl, "collect");
    work.link_to(&sink);
    pl.start();
    work.submit(1).unwrap();
    pl.trip("cancelled for testing");
    work.complete();
    let err = pl.join().unwrap_err();
    assert!(err.to_string().contains("cancelled for testing"));
}
