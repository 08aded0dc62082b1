//! Time utility functions

use chrono::{DateTime, SecondsFormat, Utc};

/// Wall-clock milliseconds between two instants.
pub fn duration_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    end.signed_duration_since(start).num_milliseconds()
}

/// RFC 3339 with microsecond precision, UTC designator `Z`.
pub fn to_rfc3339_micros(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_duration_ms() {
        let start = Utc.timestamp_opt(1_704_067_200, 0).unwrap();
        let end = Utc.timestamp_opt(1_704_067_201, 500_000_000).unwrap();
        assert_eq!(duration_ms(start, end), 1500);
        assert_eq!(duration_ms(end, start), -1500);
    }

    #[test]
    fn test_to_rfc3339_micros() {
        let dt = Utc.timestamp_opt(1_704_067_200, 123_456_789).unwrap();
        assert_eq!(to_rfc3339_micros(dt), "2024-01-01T00:00:00.123456Z");
    }
}
