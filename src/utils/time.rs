//! Time formatting utilities

/// Format seconds for an ffmpeg `-ss`/`-t` argument
pub fn format_seconds_arg(seconds: f64) -> String {
    format!("{:.3}", seconds.max(0.0))
}

/// Format seconds as `H:MM:SS.mmm`, or `MM:SS.mmm` below one hour
pub fn format_hms(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;

    if hours > 0 {
        format!("{}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, secs, millis)
    }
}

/// Convert a timestamp in `time_base` units to seconds
pub fn ts_to_seconds(ts: i64, time_base: (i32, i32)) -> f64 {
    let (num, den) = time_base;
    if den == 0 {
        return 0.0;
    }
    ts as f64 * num as f64 / den as f64
}

/// Convert seconds to a timestamp in `time_base` units, rounding down
pub fn seconds_to_ts(seconds: f64, time_base: (i32, i32)) -> i64 {
    let (num, den) = time_base;
    if num == 0 {
        return 0;
    }
    (seconds * den as f64 / num as f64).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_seconds_arg() {
        assert_eq!(format_seconds_arg(0.0), "0.000");
        assert_eq!(format_seconds_arg(6.0), "6.000");
        assert_eq!(format_seconds_arg(2.5), "2.500");
        assert_eq!(format_seconds_arg(-1.0), "0.000");
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0.0), "00:00.000");
        assert_eq!(format_hms(61.5), "01:01.500");
        assert_eq!(format_hms(3725.25), "1:02:05.250");
    }

    #[test]
    fn test_timestamp_conversions() {
        assert_eq!(ts_to_seconds(90_000, (1, 90_000)), 1.0);
        assert_eq!(seconds_to_ts(2.0, (1, 1000)), 2000);
        assert_eq!(seconds_to_ts(1.0, (1, 0)), 0);
        assert_eq!(ts_to_seconds(5, (1, 0)), 0.0);
    }
}
