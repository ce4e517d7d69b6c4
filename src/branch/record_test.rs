use super::*;

fn stats(
    cpu: f64,
    mem: f64,
    conns: u32,
    pending: u32,
) -> LoadStats {
    LoadStats {
        cpu_usage: cpu,
        memory_usage: mem,
        active_connections: conns,
        pending_orders: pending,
        ..Default::default()
    }
    .recompute()
}

#[test]
fn test_idle_branch_scores_zero() {
    assert_eq!(LoadStats::default().recompute().load_score, 0.0);
}

#[test]
fn test_score_is_bounded() {
    let saturated = LoadStats {
        cpu_usage: 500.0,
        memory_usage: 500.0,
        active_connections: u32::MAX,
        pending_orders: u32::MAX,
        orders_processed_today: u64::MAX,
        total_stock_items: u64::MAX,
        response_time_ms: f64::MAX,
        load_score: 0.0,
    }
    .recompute();

    assert!(saturated.load_score <= 1.0);
    assert!(saturated.load_score > 0.95);
}

#[test]
fn test_score_is_monotonic_in_each_input() {
    let base = stats(20.0, 30.0, 5, 2);

    assert!(stats(40.0, 30.0, 5, 2).load_score > base.load_score);
    assert!(stats(20.0, 60.0, 5, 2).load_score > base.load_score);
    assert!(stats(20.0, 30.0, 50, 2).load_score > base.load_score);
    assert!(stats(20.0, 30.0, 5, 20).load_score > base.load_score);

    let slower = LoadStats {
        response_time_ms: 800.0,
        ..base
    }
    .recompute();
    assert!(slower.load_score > base.load_score);

    let busier = LoadStats {
        orders_processed_today: 1000,
        ..base
    }
    .recompute();
    assert!(busier.load_score > base.load_score);

    let more_stock = LoadStats {
        total_stock_items: 1_000_000,
        ..base
    }
    .recompute();
    assert_eq!(more_stock.load_score, base.load_score);
}

#[test]
fn test_nan_inputs_do_not_poison_score() {
    let s = LoadStats {
        cpu_usage: f64::NAN,
        response_time_ms: f64::NAN,
        ..Default::default()
    }
    .recompute();
    assert_eq!(s.load_score, 0.0);
}

#[test]
fn test_merge_sample_keeps_unsampled_fields() {
    let previous = LoadStats {
        cpu_usage: 10.0,
        memory_usage: 20.0,
        active_connections: 7,
        pending_orders: 3,
        response_time_ms: 12.0,
        ..Default::default()
    }
    .recompute();
    let sample = MetricsSample {
        cpu_usage: Some(55.0),
        ..Default::default()
    };

    let merged = LoadStats::merge_sample(Some(&previous), &sample, 42, 900);

    assert_eq!(merged.cpu_usage, 55.0);
    assert_eq!(merged.memory_usage, 20.0);
    assert_eq!(merged.active_connections, 7);
    assert_eq!(merged.pending_orders, 3);
    assert_eq!(merged.response_time_ms, 12.0);
    assert_eq!(merged.orders_processed_today, 42);
    assert_eq!(merged.total_stock_items, 900);
    assert_eq!(merged.load_score, compute_load_score(&merged));
}

#[test]
fn test_merge_sample_without_previous_defaults_to_zero() {
    let merged = LoadStats::merge_sample(None, &MetricsSample::default(), 0, 0);
    assert_eq!(merged, LoadStats::default());
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_age_saturates() {
    let before = tokio::time::Instant::now();
    tokio::time::advance(std::time::Duration::from_secs(1)).await;
    let record = BranchRecord::new("a", "127.0.0.1", 7000);

    tokio::time::advance(std::time::Duration::from_secs(3)).await;
    assert_eq!(
        record.heartbeat_age(tokio::time::Instant::now()),
        std::time::Duration::from_secs(3)
    );
    assert_eq!(record.heartbeat_age(before), std::time::Duration::ZERO);
}

#[test]
fn test_health_status_display() {
    assert_eq!(HealthStatus::Healthy.to_string(), "HEALTHY");
    assert_eq!(HealthStatus::Offline.to_string(), "OFFLINE");
}
