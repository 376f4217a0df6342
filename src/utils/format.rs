//! Human-readable formatting for CLI output.

use chrono::{DateTime, Utc};

const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Format a byte count using 1024-based units (`"1.5 MB"`).
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Relative age of a timestamp ("just now", "5 min ago", "3 days ago").
pub fn format_age(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(timestamp);
    if elapsed.num_minutes() < 1 {
        "just now".to_string()
    } else if elapsed.num_hours() < 1 {
        format!("{} min ago", elapsed.num_minutes())
    } else if elapsed.num_days() < 1 {
        format!("{} h ago", elapsed.num_hours())
    } else if elapsed.num_days() == 1 {
        "yesterday".to_string()
    } else {
        format!("{} days ago", elapsed.num_days())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(6 * 1024 * 1024), "6.0 MB");
    }

    #[test]
    fn test_format_age() {
        let now = Utc::now();
        assert_eq!(format_age(now, now), "just now");
        assert_eq!(format_age(now - Duration::minutes(5), now), "5 min ago");
        assert_eq!(format_age(now - Duration::hours(30), now), "yesterday");
        assert_eq!(format_age(now - Duration::days(4), now), "4 days ago");
    }
}
