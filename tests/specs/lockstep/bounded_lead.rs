//! Bounded lead specs
//!
//! Verify no participant gets more than `buffer` beats ahead of the slowest,
//! plus the one credit the coordinator may already have drained.

use crate::prelude::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn leaders_block_until_the_laggard_advances() {
    let ensemble = Ensemble::new(5, &[1, 1, 1]);
    let x = ensemble.march(0, 7);
    let y = ensemble.march(1, 7);

    sleep(SETTLE).await;
    assert!(x.is_blocked(), "progress should have been limited (x)");
    assert!(y.is_blocked(), "progress should have been limited (y)");

    ensemble.step(2, 2).await;

    assert_eq!(beats(&x.finish().await), 7);
    assert_eq!(beats(&y.finish().await), 7);
    ensemble.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn equal_pace_never_blocks_for_long() {
    let ensemble = Ensemble::new(2, &[1, 1, 1]);
    let marchers: Vec<_> = (0..3).map(|id| ensemble.march(id, 50)).collect();

    for marcher in marchers {
        assert_eq!(beats(&marcher.finish().await), 50);
    }
    assert!(ensemble.dl.rounds() >= 48);
    ensemble.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lone_leader_stops_one_past_the_buffer() {
    let buffer = 4;
    let ensemble = Ensemble::new(buffer, &[1, 1, 1]);

    assert_eq!(ensemble.calls_before_blocking(0).await, buffer + 1);
    let stats = ensemble.dl.stats();
    assert_eq!(stats.participant(0).unwrap().pending, buffer);
    assert_eq!(stats.rounds, 0);

    ensemble.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn leader_behind_a_blocked_laggard_stops_at_the_buffer() {
    let buffer = 4;
    let ensemble = Ensemble::new(buffer, &[1, 1, 1]);

    // The coordinator is still waiting on id 0, so nothing of id 2 is drained
    assert_eq!(ensemble.calls_before_blocking(2).await, buffer);
    assert_eq!(ensemble.dl.stats().participant(2).unwrap().pending, buffer);

    ensemble.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn each_laggard_step_frees_one_more_call() {
    let buffer = 3;
    let ensemble = Ensemble::new(buffer, &[1, 1]);
    assert_eq!(ensemble.calls_before_blocking(0).await, buffer + 1);

    ensemble.step(1, 1).await;
    assert_eq!(ensemble.calls_before_blocking(0).await, 1);

    ensemble.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn late_registration_joins_the_current_round() {
    let buffer = 2;
    let ensemble = Ensemble::new(buffer, &[1]);
    sleep(SETTLE).await;

    ensemble.dl.register(1).unwrap();
    assert_eq!(ensemble.calls_before_blocking(0).await, buffer + 1);
    assert_eq!(ensemble.dl.rounds(), 0);

    ensemble.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rounds_follow_the_slowest_participant() {
    let ensemble = Ensemble::new(3, &[1, 1]);
    let fast = ensemble.march(0, 100);

    for expected in 1..=5u64 {
        ensemble.step(1, 1).await;
        timeout(DEADLINE, ensemble.dl.checkpoint(expected))
            .await
            .unwrap()
            .unwrap();
    }
    sleep(SETTLE).await;
    assert_eq!(ensemble.dl.rounds(), 5);

    fast.abort();
    ensemble.close().await;
}
