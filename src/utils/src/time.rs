use chrono::format::StrftimeItems;
use chrono::{DateTime, NaiveDateTime};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// unix_nano_to_time converts a `realtime_ns` value into a calendar time.
/// Values past chrono's representable range clamp to `NaiveDateTime::MAX`.
pub fn unix_nano_to_time(unix_nano: u64) -> NaiveDateTime {
    let secs = (unix_nano / NANOS_PER_SEC) as i64;
    let nsecs = (unix_nano % NANOS_PER_SEC) as u32;
    DateTime::from_timestamp(secs, nsecs)
        .map(|dt| dt.naive_utc())
        .unwrap_or(NaiveDateTime::MAX)
}

pub fn time_format(dt: NaiveDateTime) -> String {
    let fmt = StrftimeItems::new("%Y-%m-%d %H:%M:%S%.9f");
    format!("{}", dt.format_with_items(fmt))
}
