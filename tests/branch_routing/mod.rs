use std::time::Duration;

use branch_hub::BranchRecord;
use branch_hub::BranchSeed;
use branch_hub::HealthStatus;
use branch_hub::HubConfig;
use branch_hub::LoadStats;

use crate::commons::TestHub;

fn branch(name: &str) -> BranchRecord {
    BranchRecord::new(name, "10.1.0.1", 8080)
}

/// # Case: fleet lifecycle
///
/// ## Setup:
/// 1. A, B, C register; A re-registers with a new address
/// 2. only C keeps sending heartbeats
///
/// ## Criterias:
/// 1. listAll has exactly three records, A carries the new address
/// 2. after the fast heartbeat window A and B are offline and every
///    selection returns C
#[tokio::test(start_paused = true)]
async fn test_fleet_lifecycle_with_simulated_time() {
    let t = TestHub::start(HubConfig::default());
    for name in ["A", "B", "C"] {
        t.hub.register(branch(name)).unwrap();
    }
    t.hub
        .register(BranchRecord::new("A", "10.9.9.9", 9090))
        .unwrap();

    let all = t.hub.list_all();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].address(), "10.9.9.9:9090");

    for _ in 0..16 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        t.hub.heartbeat("C");
    }

    let health = t.hub.health_status();
    assert_eq!(health["A"], HealthStatus::Offline);
    assert_eq!(health["B"], HealthStatus::Offline);
    for _ in 0..4 {
        assert_eq!(t.hub.best_available().unwrap().name, "C");
    }

    // a heartbeat brings B back
    t.hub.heartbeat("B");
    assert!(t.hub.list_all()[1].active);

    t.stop().await;
}

/// Round robin over name-sorted active branches when nobody reports stats.
#[tokio::test]
async fn test_round_robin_without_stats() {
    let t = TestHub::start(HubConfig::default());
    for name in ["C", "A", "B"] {
        t.hub.register(branch(name)).unwrap();
    }

    let picks: Vec<String> = (0..4)
        .map(|_| t.hub.best_available().unwrap().name)
        .collect();
    assert_eq!(picks, vec!["A", "B", "C", "A"]);

    t.stop().await;
}

/// Stats refreshed in the background switch selection to load ranking.
#[tokio::test(start_paused = true)]
async fn test_background_refresh_enables_load_ranking() {
    let mut config = HubConfig::default();
    config.monitor.stats_refresh_interval_ms = 1_000;
    config.monitor.fast_check_timeout_ms = 60_000;
    let t = TestHub::start(config);
    t.hub.register(branch("A")).unwrap();
    t.hub.register(branch("B")).unwrap();
    for _ in 0..30 {
        t.store.record_order("A").unwrap();
    }

    tokio::time::sleep(Duration::from_millis(1_500)).await;

    let distribution = t.hub.load_distribution();
    assert!(distribution["A"] > distribution["B"]);
    assert_eq!(t.hub.best_available().unwrap().name, "B");
    assert!(t.hub.summary().average_load.is_some());

    t.stop().await;
}

#[tokio::test]
async fn test_demand_routing_skips_removed_and_short_branches() {
    let mut config = HubConfig::default();
    config.cluster.branches = vec![
        BranchSeed {
            name: "A".into(),
            host: "10.1.0.1".into(),
            port: 8080,
        },
        BranchSeed {
            name: "C".into(),
            host: "10.1.0.3".into(),
            port: 8080,
        },
    ];
    let t = TestHub::start(config);
    t.store.set_stock("A", "itemX", 10).unwrap();
    t.store.set_stock("C", "itemX", 100).unwrap();
    t.hub.unregister("C");

    assert!(t.hub.best_for_demand("itemX", 50).unwrap().is_none());
    assert_eq!(
        t.hub.best_for_demand("itemX", 5).unwrap().unwrap().name,
        "A"
    );
    assert!(t.hub.best_for_demand("", 5).is_err());

    t.stop().await;
}

#[tokio::test]
async fn test_critical_branch_classification() {
    let t = TestHub::start(HubConfig::default());
    t.hub.register(branch("busy")).unwrap();
    t.hub.update_stats(
        "busy",
        LoadStats {
            cpu_usage: 100.0,
            memory_usage: 100.0,
            active_connections: 5_000,
            pending_orders: 2_000,
            response_time_ms: 10_000.0,
            orders_processed_today: 50_000,
            ..Default::default()
        },
    );

    assert_eq!(t.hub.health_status()["busy"], HealthStatus::Critical);
    assert_eq!(t.hub.summary().critical, 1);

    t.stop().await;
}
