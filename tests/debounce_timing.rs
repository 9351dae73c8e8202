// tests/debounce_timing.rs

mod common;
use crate::common::fakes::{modified, ChannelSource};
use crate::common::init_tracing;

use std::error::Error;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use watchrun::engine::ShutdownFlag;
use watchrun::watch::{Collected, DebounceSettings, Debouncer};

type TestResult = Result<(), Box<dyn Error>>;

fn debouncer() -> Debouncer {
    Debouncer::new(DebounceSettings {
        debounce: Duration::from_millis(1_600),
        step: Duration::from_millis(50),
    })
}

fn expect_batch(collected: Collected) -> watchrun::types::ChangeBatch {
    match collected {
        Collected::Batch(batch) => batch,
        Collected::Interrupted => panic!("unexpected interruption"),
    }
}

#[test]
fn changes_closer_than_a_step_share_one_batch() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel();
    let mut source = ChannelSource::new(rx);
    let sender = thread::spawn(move || {
        for name in ["a.py", "b.py", "c.py"] {
            tx.send(modified(name)).unwrap();
            thread::sleep(Duration::from_millis(10));
        }
        // Keep the channel open past the end of the window.
        thread::sleep(Duration::from_millis(300));
    });

    let batch = expect_batch(debouncer().collect(
        &mut source,
        Duration::from_secs(5),
        &ShutdownFlag::new(),
    )?);
    assert_eq!(batch.len(), 3);

    sender.join().unwrap();
    Ok(())
}

#[test]
fn changes_further_apart_than_a_step_split() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel();
    let mut source = ChannelSource::new(rx);
    let sender = thread::spawn(move || {
        tx.send(modified("a.py")).unwrap();
        thread::sleep(Duration::from_millis(200));
        tx.send(modified("b.py")).unwrap();
        thread::sleep(Duration::from_millis(300));
    });

    let debouncer = debouncer();
    let shutdown = ShutdownFlag::new();
    let first = expect_batch(debouncer.collect(&mut source, Duration::from_secs(5), &shutdown)?);
    let second = expect_batch(debouncer.collect(&mut source, Duration::from_secs(5), &shutdown)?);

    assert_eq!(first.len(), 1);
    assert!(first.contains(&modified("a.py")));
    assert_eq!(second.len(), 1);
    assert!(second.contains(&modified("b.py")));

    sender.join().unwrap();
    Ok(())
}

#[test]
fn quiet_source_yields_empty_batch_after_timeout() -> TestResult {
    init_tracing();

    let (_tx, rx) = mpsc::channel();
    let mut source = ChannelSource::new(rx);

    let started = Instant::now();
    let batch = expect_batch(debouncer().collect(
        &mut source,
        Duration::from_millis(150),
        &ShutdownFlag::new(),
    )?);

    assert!(batch.is_empty());
    assert!(started.elapsed() >= Duration::from_millis(150));
    Ok(())
}

#[tokio::test]
async fn async_collect_merges_a_burst() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel();
    let mut source = ChannelSource::new(rx);
    tx.send(modified("a.py"))?;
    tx.send(modified("a.py"))?;
    tx.send(modified("b.py"))?;

    let batch = expect_batch(
        debouncer()
            .collect_async(&mut source, Duration::from_secs(5), &ShutdownFlag::new())
            .await?,
    );
    // Duplicate (kind, path) pairs collapse.
    assert_eq!(batch.len(), 2);
    Ok(())
}

#[tokio::test]
async fn async_collect_merges_changes_closer_than_a_step() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel();
    let mut source = ChannelSource::new(rx);
    let sender = thread::spawn(move || {
        for name in ["a.py", "b.py", "c.py"] {
            tx.send(modified(name)).unwrap();
            thread::sleep(Duration::from_millis(10));
        }
        thread::sleep(Duration::from_millis(300));
    });

    let batch = expect_batch(
        debouncer()
            .collect_async(&mut source, Duration::from_secs(5), &ShutdownFlag::new())
            .await?,
    );
    assert_eq!(batch.len(), 3);

    sender.join().unwrap();
    Ok(())
}

#[tokio::test]
async fn async_collect_splits_changes_further_apart_than_a_step() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel();
    let mut source = ChannelSource::new(rx);
    let sender = thread::spawn(move || {
        tx.send(modified("a.py")).unwrap();
        thread::sleep(Duration::from_millis(200));
        tx.send(modified("b.py")).unwrap();
        thread::sleep(Duration::from_millis(300));
    });

    let debouncer = debouncer();
    let shutdown = ShutdownFlag::new();
    let first = expect_batch(
        debouncer
            .collect_async(&mut source, Duration::from_secs(5), &shutdown)
            .await?,
    );
    let second = expect_batch(
        debouncer
            .collect_async(&mut source, Duration::from_secs(5), &shutdown)
            .await?,
    );

    assert_eq!(first.len(), 1);
    assert!(first.contains(&modified("a.py")));
    assert_eq!(second.len(), 1);
    assert!(second.contains(&modified("b.py")));

    sender.join().unwrap();
    Ok(())
}
