use tempfile::tempdir;

use super::*;
use crate::Directory;
use crate::NotificationKind;
use crate::NotificationRecord;
use crate::StockLookup;
use crate::SubscriberProfile;

fn note(
    target: &str,
    title: &str,
) -> NotificationRecord {
    NotificationRecord::new(title, "body", NotificationKind::Order).addressed_to(target)
}

#[test]
fn test_notifications_survive_reopen() {
    let dir = tempdir().unwrap();
    let first_id;
    {
        let store = SledStore::open(dir.path()).unwrap();
        first_id = store.append_notification(note("u1", "a")).unwrap().id;
        store.append_notification(note("u1", "b")).unwrap();
        store.flush().unwrap();
    }

    let store = SledStore::open(dir.path()).unwrap();
    let records = store.list_by_subscriber("u1", 10).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].title, "b");
    assert_eq!(records[1].id, first_id);

    let next = store.append_notification(note("u1", "c")).unwrap();
    assert!(next.id > records[0].id);
}

#[test]
fn test_prefix_scan_does_not_leak_between_subscribers() {
    let dir = tempdir().unwrap();
    let store = SledStore::open(dir.path()).unwrap();
    store.append_notification(note("u1", "short")).unwrap();
    store.append_notification(note("u10", "long")).unwrap();

    let records = store.list_by_subscriber("u1", 10).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "short");
    assert_eq!(store.count_unread("u10").unwrap(), 1);
}

#[test]
fn test_mark_read_flips_only_owned_ids() {
    let dir = tempdir().unwrap();
    let store = SledStore::open(dir.path()).unwrap();
    let a = store.append_notification(note("u1", "a")).unwrap();
    let b = store.append_notification(note("u1", "b")).unwrap();
    let foreign = store.append_notification(note("u2", "x")).unwrap();

    assert_eq!(store.count_unread("u1").unwrap(), 2);
    assert_eq!(store.mark_read("u1", &[a.id, foreign.id]).unwrap(), 1);
    assert_eq!(store.count_unread("u1").unwrap(), 1);
    assert_eq!(store.count_unread("u2").unwrap(), 1);

    let records = store.list_by_subscriber("u1", 10).unwrap();
    let b_stored = records.iter().find(|r| r.id == b.id).unwrap();
    assert!(!b_stored.read);
}

#[test]
fn test_concurrent_mark_read_counts_each_flip_once() {
    let dir = tempdir().unwrap();
    let store = SledStore::open(dir.path()).unwrap();
    let ids: Vec<u64> = (0..16)
        .map(|i| store.append_notification(note("u1", &format!("n{i}"))).unwrap().id)
        .collect();

    let changed: usize = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| store.mark_read("u1", &ids).unwrap()))
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).sum()
    });

    assert_eq!(changed, ids.len());
    assert_eq!(store.count_unread("u1").unwrap(), 0);
}

#[test]
fn test_counters_stock_and_directory() {
    let dir = tempdir().unwrap();
    let store = SledStore::open(dir.path()).unwrap();

    assert_eq!(store.orders_today("north").unwrap(), 0);
    store.record_order("north").unwrap();
    assert_eq!(store.record_order("north").unwrap(), 2);
    assert_eq!(store.orders_today("north").unwrap(), 2);

    store.set_stock("north", "sku-1", 40).unwrap();
    store.set_stock("north", "sku-2", 2).unwrap();
    assert_eq!(store.stock_item_count("north").unwrap(), 42);
    assert!(store.has_quantity("north", "sku-1", 40).unwrap());
    assert!(!store.has_quantity("north", "sku-2", 3).unwrap());
    assert!(!store.has_quantity("north", "missing", 1).unwrap());

    store
        .upsert_subscriber("alice", &SubscriberProfile::new("manager", Some("north")))
        .unwrap();
    store
        .upsert_subscriber("bob", &SubscriberProfile::new("clerk", Some("south")))
        .unwrap();
    assert_eq!(store.resolve_by_role("manager").unwrap(), vec!["alice"]);
    assert_eq!(store.resolve_by_branch("south").unwrap(), vec!["bob"]);
}

#[test]
fn test_corrupted_counter_is_reported() {
    let dir = tempdir().unwrap();
    let db = std::sync::Arc::new(sled::open(dir.path()).unwrap());
    let store = SledStore::from_db(db.clone()).unwrap();
    db.open_tree("stock")
        .unwrap()
        .insert(super::composite_key("north", b"sku-1"), &[1u8, 2, 3][..])
        .unwrap();

    let err = store.stock_item_count("north").unwrap_err();
    assert!(matches!(
        err,
        crate::Error::Storage(crate::StorageError::Corrupted { .. })
    ));
}
