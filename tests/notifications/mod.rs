use std::time::Duration;

use branch_hub::GroupSelector;
use branch_hub::HubConfig;
use branch_hub::NotificationKind;
use branch_hub::NotificationRecord;
use branch_hub::Priority;
use branch_hub::SubscriberProfile;

use crate::commons::TestHub;

fn low_stock(item: &str) -> NotificationRecord {
    NotificationRecord::new("Low stock", format!("{item} below threshold"), NotificationKind::Stock)
        .with_priority(Priority::High)
        .with_action_url(format!("/stock/{item}"))
}

/// # Case: subscriber reconnect cycle
///
/// ## Criterias:
/// 1. offline sends are kept and readable through history
/// 2. subscribing adds exactly one "connected" record and streams live events
/// 3. a dropped stream is evicted by the janitor; sends keep persisting
#[tokio::test(start_paused = true)]
async fn test_subscriber_reconnect_cycle() {
    let t = TestHub::start(HubConfig::default());

    t.hub.send("clerk-1", low_stock("sku-9")).await.unwrap();
    assert_eq!(t.hub.unread_count("clerk-1").unwrap(), 1);

    let mut events = t.hub.subscribe("clerk-1").await.unwrap();
    assert_eq!(t.hub.unread_count("clerk-1").unwrap(), 2);
    assert_eq!(events.recv().await.unwrap().title, "Connected");

    t.hub.send("clerk-1", low_stock("sku-3")).await.unwrap();
    let live = events.recv().await.unwrap();
    assert_eq!(live.action_url.as_deref(), Some("/stock/sku-3"));

    drop(events);
    // janitor runs every 30s by default
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(!t.hub.is_connected("clerk-1"));

    t.hub.send("clerk-1", low_stock("sku-4")).await.unwrap();
    let history = t.hub.list_recent("clerk-1", 50).unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].message, "sku-4 below threshold");

    t.stop().await;
}

#[tokio::test]
async fn test_mark_read_and_unread_count() {
    let t = TestHub::start(HubConfig::default());
    let first = t.hub.send("mgr", low_stock("a")).await.unwrap();
    t.hub.send("mgr", low_stock("b")).await.unwrap();
    t.hub.send("mgr", low_stock("c")).await.unwrap();

    assert_eq!(t.hub.mark_read("mgr", &[first.id, 424_242]).unwrap(), 1);
    assert_eq!(t.hub.unread_count("mgr").unwrap(), 2);

    let read: Vec<bool> = t
        .hub
        .list_recent("mgr", 10)
        .unwrap()
        .iter()
        .map(|r| r.read)
        .collect();
    assert_eq!(read, vec![false, false, true]);

    t.stop().await;
}

#[tokio::test]
async fn test_role_broadcast_reaches_live_and_offline_members() {
    let t = TestHub::start(HubConfig::default());
    for (id, role) in [("m1", "manager"), ("m2", "manager"), ("c1", "clerk")] {
        t.store
            .upsert_subscriber(id, &SubscriberProfile::new(role, Some("north")))
            .unwrap();
    }
    let mut live = t.hub.subscribe("m1").await.unwrap();
    live.recv().await.unwrap();

    let sent = t
        .hub
        .send_to_group(&GroupSelector::Role("manager".into()), low_stock("sku-1"))
        .await
        .unwrap();

    assert_eq!(sent.len(), 2);
    assert_eq!(live.recv().await.unwrap().title, "Low stock");
    assert_eq!(t.hub.unread_count("m2").unwrap(), 1);
    assert_eq!(t.hub.unread_count("c1").unwrap(), 0);

    t.stop().await;
}

#[tokio::test]
async fn test_unregister_then_send_still_persists() {
    let t = TestHub::start(HubConfig::default());
    let _events = t.hub.subscribe("u1").await.unwrap();

    assert!(t.hub.unregister_callback("u1"));
    t.hub.send("u1", low_stock("x")).await.unwrap();

    assert_eq!(t.hub.connected_count(), 0);
    assert_eq!(t.hub.list_recent("u1", 0).unwrap().len(), 1);

    t.stop().await;
}
