//! Teardown specs

use crate::prelude::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_releases_waiting_participants() {
    let ensemble = Ensemble::new(2, &[1, 1]);
    let dl = Arc::clone(&ensemble.dl);
    let waiter = tokio::spawn(async move {
        loop {
            if let Err(e) = dl.advance(0).await {
                return e;
            }
        }
    });
    sleep(SETTLE).await;

    ensemble.dl.close().await.unwrap();

    let err = timeout(DEADLINE, waiter).await.unwrap().unwrap();
    assert!(matches!(err, DrumlineError::Closed));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn second_close_is_rejected() {
    let ensemble = Ensemble::new(2, &[1]);
    ensemble.dl.close().await.unwrap();
    assert!(matches!(
        ensemble.dl.close().await,
        Err(DrumlineError::AlreadyClosed)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn closed_drumline_refuses_registration() {
    let ensemble = Ensemble::new(2, &[1]);
    ensemble.dl.close().await.unwrap();
    assert!(matches!(
        ensemble.dl.register(1),
        Err(DrumlineError::Closed)
    ));
    assert!(ensemble.dl.stats().closed);
}
