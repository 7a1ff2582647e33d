//! Display formatting helpers.

use chrono::{DateTime, Local, Utc};

/// Formats a USD amount with precision scaled to its magnitude.
///
/// Negative amounts are clamped to zero. Amounts below one dollar get four
/// decimals, below ten get three, everything else two.
pub fn format_usd(value: f64) -> String {
    let value = if value < 0.0 { 0.0 } else { value };
    if value < 1.0 {
        format!("${value:.4}")
    } else if value < 10.0 {
        format!("${value:.3}")
    } else {
        format!("${value:.2}")
    }
}

/// Formats a timestamp in local time as `YYYY-MM-DD HH:MM`, or `never`.
pub fn format_time(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        None => "never".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_usd_precision() {
        assert_eq!(format_usd(0.0), "$0.0000");
        assert_eq!(format_usd(0.12344), "$0.1234");
        assert_eq!(format_usd(1.2344), "$1.234");
        assert_eq!(format_usd(9.999), "$9.999");
        assert_eq!(format_usd(12.346), "$12.35");
        assert_eq!(format_usd(1234.5), "$1234.50");
    }

    #[test]
    fn test_format_usd_clamps_negative() {
        assert_eq!(format_usd(-5.0), "$0.0000");
    }

    #[test]
    fn test_format_time_never() {
        assert_eq!(format_time(None), "never");
    }

    #[test]
    fn test_format_time_local() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let expected = at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string();
        assert_eq!(format_time(Some(at)), expected);
        assert_eq!(expected.len(), 16);
    }
}
