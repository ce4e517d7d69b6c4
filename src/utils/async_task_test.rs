use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;

use crate::utils::async_task::run_periodic;
use crate::utils::async_task::spawn_task;
use crate::Error;

#[tokio::test]
async fn test_spawn_task() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let task_fn = move || {
        let counter = counter_clone.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    };

    let mut handles = Vec::new();
    spawn_task("test_task", task_fn, Some(&mut handles));

    join_all(handles).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_spawn_task_with_error() {
    let task_fn = move || async move { Err::<(), _>(Error::Fatal("Task error".to_string())) };

    let mut handles = Vec::new();
    spawn_task("error_task", task_fn, Some(&mut handles));

    assert_eq!(handles.len(), 1);
    for r in join_all(handles).await {
        assert!(r.is_ok());
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_periodic_ticks_until_shutdown() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let handle = tokio::spawn(run_periodic(
        "count",
        Duration::from_secs(5),
        shutdown_rx,
        move || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        },
    ));

    tokio::time::sleep(Duration::from_millis(15_500)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 3);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_run_periodic_survives_failing_and_panicking_cycles() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let handle = tokio::spawn(run_periodic(
        "flaky",
        Duration::from_secs(1),
        shutdown_rx,
        move || {
            let counter = counter_clone.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                match n {
                    0 => Err(Error::Fatal("first cycle fails".to_string())),
                    1 => panic!("second cycle panics"),
                    _ => Ok(()),
                }
            }
        },
    ));

    tokio::time::sleep(Duration::from_millis(4_500)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 4);

    shutdown_tx.send(()).unwrap();
    assert!(handle.await.is_ok());
}
