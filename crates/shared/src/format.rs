//! Compact rendering of follower / star counters.

/// Renders `count` as `1K`, `12M` and so on. Truncates rather than rounds.
pub fn format_count(count: u64) -> String {
    match count {
        1_000_000.. => format!("{}M", count / 1_000_000),
        1_000.. => format!("{}K", count / 1_000),
        _ => count.to_string(),
    }
}

/// Like [`format_count`], but renders an unknown value as `-`.
pub fn format_optional_count(count: Option<u32>) -> String {
    count
        .map(|value| format_count(u64::from(value)))
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_counts_are_unchanged() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
    }

    #[test]
    fn thousands_and_millions_truncate() {
        assert_eq!(format_count(1_000), "1K");
        assert_eq!(format_count(1_999), "1K");
        assert_eq!(format_count(999_999), "999K");
        assert_eq!(format_count(1_000_000), "1M");
        assert_eq!(format_count(25_400_000), "25M");
    }

    #[test]
    fn unknown_counts_render_as_dash() {
        assert_eq!(format_optional_count(None), "-");
        assert_eq!(format_optional_count(Some(1500)), "1K");
    }
}
