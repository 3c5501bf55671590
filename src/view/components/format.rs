use std::time::Duration;

use chrono::{DateTime, Utc};

/// Format elapsed seconds as human-readable string.
/// - < 60s: "Xs"
/// - < 3600s: "XmYs"
/// - >= 3600s: "XhYm"
pub fn format_elapsed(secs: i64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// Format duration as human-readable string, or "—" if None.
pub fn format_duration(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => {
            let secs = d.as_secs();
            let mins = secs / 60;
            let hours = mins / 60;
            if hours > 0 {
                format!("{}h {}m", hours, mins % 60)
            } else if mins > 0 {
                format!("{}m {}s", mins, secs % 60)
            } else {
                format!("{}s", secs)
            }
        }
        None => "—".to_string(),
    }
}

/// Local-time-free timestamp display, or "—" if None.
pub fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "—".to_string(),
    }
}

/// Run time between `started` and `finished`, or until `now` while running.
pub fn run_time(
    started: Option<DateTime<Utc>>,
    finished: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<Duration> {
    let start = started?;
    let end = finished.unwrap_or(now);
    (end - start).to_std().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_elapsed_seconds() {
        assert_eq!(format_elapsed(0), "0s");
        assert_eq!(format_elapsed(59), "59s");
    }

    #[test]
    fn format_elapsed_minutes_and_hours() {
        assert_eq!(format_elapsed(125), "2m5s");
        assert_eq!(format_elapsed(3661), "1h1m");
    }

    #[test]
    fn format_duration_variants() {
        assert_eq!(format_duration(None), "—");
        assert_eq!(format_duration(Some(Duration::from_secs(42))), "42s");
        assert_eq!(format_duration(Some(Duration::from_secs(754))), "12m 34s");
        assert_eq!(format_duration(Some(Duration::from_secs(7380))), "2h 3m");
    }

    #[test]
    fn format_timestamp_variants() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 0).unwrap();
        assert_eq!(format_timestamp(Some(ts)), "2024-03-01 09:05:00 UTC");
        assert_eq!(format_timestamp(None), "—");
    }

    #[test]
    fn run_time_uses_now_while_running() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 1, 30).unwrap();
        assert_eq!(run_time(Some(start), None, now), Some(Duration::from_secs(90)));
        assert_eq!(run_time(None, None, now), None);
    }

    #[test]
    fn run_time_negative_is_none() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        assert_eq!(run_time(Some(start), Some(earlier), earlier), None);
    }
}
