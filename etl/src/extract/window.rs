use chrono::{DateTime, Duration, Utc};

/// Hourly partitions covering `[now - (horizon_hours - 1)h, now]`, oldest
/// first, rendered as `<year>-<month>/<day>/<hour>`. The day carries no
/// leading zero, matching how terminals lay out their uploads.
pub fn window_partitions(now: DateTime<Utc>, horizon_hours: u32) -> Vec<String> {
    if horizon_hours == 0 {
        return Vec::new();
    }

    let mut cursor = now - Duration::hours(i64::from(horizon_hours) - 1);
    let mut partitions = Vec::with_capacity(horizon_hours as usize);

    while cursor <= now {
        partitions.push(cursor.format("%Y-%m/%-d/%H").to_string());
        cursor += Duration::hours(1);
    }

    partitions
}

/// Turns partitions into bucket key prefixes under `key_root`.
pub fn key_prefixes(key_root: &str, partitions: &[String]) -> Vec<String> {
    let root = key_root.trim_end_matches('/');
    partitions
        .iter()
        .map(|partition| {
            if root.is_empty() {
                format!("{partition}/")
            } else {
                format!("{root}/{partition}/")
            }
        })
        .collect()
}
