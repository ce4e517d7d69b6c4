use std::time::SystemTime;
use std::time::UNIX_EPOCH;

const SECS_PER_DAY: u64 = 86_400;

/// return millisecond
pub(crate) fn get_now_as_u128() -> u128 {
    get_duration_since_epoch().as_millis()
}

/// return second
pub(crate) fn get_now_as_u64() -> u64 {
    get_duration_since_epoch().as_secs()
}

/// wall-clock milliseconds since epoch, used for persisted timestamps
pub(crate) fn timestamp_millis() -> u64 {
    get_now_as_u128() as u64
}

/// UTC day number since epoch; keys the per-day order counters
pub(crate) fn current_day() -> u64 {
    get_now_as_u64() / SECS_PER_DAY
}

pub(crate) fn get_duration_since_epoch() -> std::time::Duration {
    // A clock before 1970 is treated as the epoch itself
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default()
}
