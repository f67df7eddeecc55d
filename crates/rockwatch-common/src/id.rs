use chrono::{DateTime, Utc};
use snowflake::SnowflakeIdBucket;
use std::sync::Mutex;

static ID_GENERATOR: Mutex<Option<SnowflakeIdBucket>> = Mutex::new(None);

/// Initialize the snowflake generator.
///
/// `machine_id` and `node_id` must each be in `0..=31`.
pub fn init(machine_id: i32, node_id: i32) {
    let mut gen = ID_GENERATOR.lock().unwrap_or_else(|p| p.into_inner());
    *gen = Some(SnowflakeIdBucket::new(machine_id, node_id));
}

/// Next snowflake ID as a decimal string.
pub fn next_id() -> String {
    let mut gen = ID_GENERATOR.lock().unwrap_or_else(|p| p.into_inner());
    let bucket = gen.get_or_insert_with(|| SnowflakeIdBucket::new(1, 1));
    bucket.get_id().to_string()
}

/// Alert ID derived from the facility and send time.
///
/// A snowflake suffix keeps two sends for the same facility within one
/// second distinct.
pub fn alert_id(facility_id: &str, at: DateTime<Utc>) -> String {
    format!(
        "alert_{}_{}_{}",
        facility_id,
        at.format("%Y%m%d_%H%M%S"),
        next_id()
    )
}
