pub const MILLIS_PER_SECOND: i64 = 1_000;
pub const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
pub const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;

pub fn current_time_millis() -> i64 {
    i64::try_from(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis(),
    )
    .unwrap_or(i64::MAX)
}

#[inline]
pub const fn secs_to_millis(secs: u64) -> i64 {
    (secs as i64).saturating_mul(MILLIS_PER_SECOND)
}

#[inline]
pub const fn mins_to_millis(mins: u64) -> i64 {
    (mins as i64).saturating_mul(MILLIS_PER_MINUTE)
}

#[inline]
pub const fn hours_to_millis(hours: u64) -> i64 {
    (hours as i64).saturating_mul(MILLIS_PER_HOUR)
}

/// Human readable remaining time, e.g. `4h 59m` or `35s`.
pub fn format_duration_millis(millis: i64) -> String {
    let total_secs = millis.max(0) / MILLIS_PER_SECOND;
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    if hours > 0 {
        format!("{hours}h {mins}m")
    } else if mins > 0 {
        format!("{mins}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::{format_duration_millis, hours_to_millis, mins_to_millis, MILLIS_PER_MINUTE};

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration_millis(hours_to_millis(4) + mins_to_millis(59)), "4h 59m");
        assert_eq!(format_duration_millis(MILLIS_PER_MINUTE + 5_000), "1m 5s");
        assert_eq!(format_duration_millis(-10), "0s");
    }
}
