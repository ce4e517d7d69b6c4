use std::thread::sleep;

use crate::utils::time::current_day;
use crate::utils::time::get_duration_since_epoch;
use crate::utils::time::get_now_as_u128;
use crate::utils::time::get_now_as_u64;
use crate::utils::time::timestamp_millis;

#[test]
fn test_timestamp_millis() {
    let t1 = timestamp_millis();
    sleep(std::time::Duration::from_millis(10));
    let t2 = timestamp_millis();

    assert!(t2 > t1);
}

#[test]
fn test_get_duration_since_epoch() {
    let duration = get_duration_since_epoch();
    assert!(duration.as_secs() > 1609459200); // Greater than 2021-01-01
}

#[test]
fn test_millis_and_secs_agree() {
    let ms = get_now_as_u128();
    let secs = get_now_as_u64();
    assert!((ms / 1000) as u64 <= secs);
    assert!(secs - (ms / 1000) as u64 <= 1);
}

#[test]
fn test_current_day_matches_seconds() {
    let day = current_day();
    assert_eq!(day, get_now_as_u64() / 86_400);
}
