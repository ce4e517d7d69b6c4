use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_test::traced_test;

use super::*;
use crate::BranchSeed;
use crate::Error;
use crate::HubConfig;
use crate::MemStore;
use crate::MockMetricsSource;

fn seeded_config(names: &[&str]) -> HubConfig {
    let mut config = HubConfig::default();
    config.cluster.branches = names
        .iter()
        .enumerate()
        .map(|(i, name)| BranchSeed {
            name: name.to_string(),
            host: "10.0.0.1".to_string(),
            port: 7000 + i as u16,
        })
        .collect();
    config
}

fn idle_metrics() -> Arc<MockMetricsSource> {
    let mut source = MockMetricsSource::new();
    source.expect_sample().returning(|_| Ok(Default::default()));
    Arc::new(source)
}

#[tokio::test]
#[traced_test]
async fn test_build_seeds_branches_and_spawns_workers() {
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let hub = HubBuilder::new(seeded_config(&["north", "south"]), shutdown_rx)
        .with_backend(Arc::new(MemStore::new()))
        .with_metrics_source(idle_metrics())
        .build()
        .unwrap();

    let names: Vec<String> = hub.list_all().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["north", "south"]);
    assert_eq!(hub.worker_count(), 4);
    assert!(logs_contain("branch hub started"));

    shutdown_tx.send(()).unwrap();
    assert!(hub.shutdown().await);
    assert_eq!(hub.worker_count(), 0);
}

#[tokio::test]
async fn test_build_rejects_blank_seed() {
    let (_shutdown_tx, shutdown_rx) = watch::channel(());
    let result = HubBuilder::new(seeded_config(&[" "]), shutdown_rx)
        .with_backend(Arc::new(MemStore::new()))
        .with_metrics_source(idle_metrics())
        .build();

    assert!(matches!(result, Err(Error::Validation(_))));
}

#[tokio::test]
async fn test_build_defaults_to_sled_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = HubConfig::default();
    config.storage.db_path = dir.path().join("db");

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let hub = HubBuilder::new(config, shutdown_rx)
        .with_metrics_source(idle_metrics())
        .build()
        .unwrap();

    let stored = hub
        .send("u1", crate::test_utils::order_event("persisted on disk"))
        .await
        .unwrap();
    assert_eq!(hub.list_recent("u1", 5).unwrap(), vec![stored]);

    shutdown_tx.send(()).unwrap();
    hub.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_aborts_workers_after_grace_period() {
    let mut config = HubConfig::default();
    config.shutdown_grace_ms = 100;
    let (_shutdown_tx, shutdown_rx) = watch::channel(());
    let hub = HubBuilder::new(config, shutdown_rx)
        .with_backend(Arc::new(MemStore::new()))
        .with_metrics_source(idle_metrics())
        .build()
        .unwrap();

    // signal never sent: workers keep running until aborted
    let started = tokio::time::Instant::now();
    assert!(!hub.shutdown().await);
    assert!(started.elapsed() < Duration::from_secs(1));
}
