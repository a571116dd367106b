//! Timed reset specs
//!
//! Verify a timed reset only happens when its handle is being awaited.

use crate::prelude::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn awaited_reset_releases_blocked_participants() {
    let ensemble = Ensemble::new(5, &[1, 1, 1]);
    let x = ensemble.march(0, 7);
    let y = ensemble.march(1, 7);

    sleep(SETTLE).await;
    assert!(x.is_blocked(), "progress should have been limited (x)");
    assert!(y.is_blocked(), "progress should have been limited (y)");

    let reset = ensemble.dl.reset_after(Duration::from_millis(10)).unwrap();
    timeout(DEADLINE, reset.fired()).await.unwrap();

    assert_eq!(x.finish().await.last(), Some(&Advance::Reset));
    assert_eq!(y.finish().await.last(), Some(&Advance::Reset));
    ensemble.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unread_reset_changes_nothing() {
    let ensemble = Ensemble::new(3, &[1, 1]);
    let x = ensemble.march(0, 10);
    sleep(SETTLE).await;
    let before = ensemble.dl.stats();

    let reset = ensemble.dl.reset_after(Duration::from_millis(10)).unwrap();
    sleep(SETTLE).await;

    assert!(!reset.has_fired());
    assert!(x.is_blocked());
    assert_eq!(ensemble.dl.stats(), before);

    x.abort();
    ensemble.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dropped_handle_cancels_the_reset() {
    let ensemble = Ensemble::new(3, &[1, 1]);
    let x = ensemble.march(0, 10);
    sleep(SETTLE).await;

    drop(ensemble.dl.reset_after(Duration::ZERO));
    sleep(SETTLE).await;

    assert!(x.is_blocked());
    assert_eq!(ensemble.dl.stats().participant(0).unwrap().pending, 3);

    x.abort();
    ensemble.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn late_listener_misses_the_reset() {
    let ensemble = Ensemble::new(3, &[1, 1]);
    let reset = ensemble.dl.reset_after(Duration::from_millis(10)).unwrap();
    sleep(SETTLE).await;

    assert!(timeout(SETTLE, reset.fired()).await.is_err());
    ensemble.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn configured_timeout_drives_schedule_reset() {
    let config = DrumlineConfig::new("timed").with_reset_timeout(Duration::from_millis(20));
    let dl = Drumline::with_config(config);
    dl.register(0).unwrap();

    let reset = dl.schedule_reset().unwrap();
    timeout(DEADLINE, reset.fired()).await.unwrap();
    assert!(reset.has_fired());
    dl.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn closed_drumline_returns_no_handle() {
    let ensemble = Ensemble::new(3, &[1]);
    ensemble.dl.close().await.unwrap();
    assert!(ensemble.dl.reset_after(Duration::ZERO).is_none());
}
