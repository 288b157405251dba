use std::convert::TryFrom;

use chrono::{DateTime, Duration, TimeZone, Utc};

pub const EMPTY_VALUE: &str = "---";

/// Convert an ASN (4 byte) as dotted if it exceeds the 2-byte limit
/// E.g. 4259840100 -> "65000.100"
pub fn asn_to_dotted(asn: u32) -> String {
    if asn <= u32::from(u16::MAX) {
        format!("{}", asn)
    } else {
        format!("{}.{}", asn >> 16, asn & 0xffff)
    }
}

fn fit_with_remainder(dividend: u64, divisor: u64) -> (u64, u64) {
    let fit = dividend / divisor;
    let remainder = dividend % divisor;
    (fit, remainder)
}

/// Given a duration, format like "00:00:00"
pub fn format_elapsed_time(elapsed: Duration) -> String {
    let elapsed = elapsed.num_seconds().unsigned_abs();
    let (hours, remainder) = fit_with_remainder(elapsed, 3600);
    let (minutes, seconds) = fit_with_remainder(remainder, 60);
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Given a timestamp, get the elapsed time and return formatted string
pub fn format_time_as_elapsed<Tz>(time: DateTime<Tz>) -> String
where
    Tz: TimeZone,
{
    format_elapsed_time(Utc::now().signed_duration_since(time))
}

/// Backend log timestamps are Unix nanoseconds
pub fn nanos_to_datetime(nanos: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(nanos / 1_000_000_000).ok()?;
    let subsec = (nanos % 1_000_000_000) as u32;
    Utc.timestamp_opt(secs, subsec).single()
}

pub fn maybe_string<T>(item: Option<&T>) -> String
where
    T: ToString,
{
    item.map(std::string::ToString::to_string)
        .unwrap_or_else(|| String::from(EMPTY_VALUE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asn_to_dotted() {
        assert_eq!(asn_to_dotted(100), "100".to_string());
        assert_eq!(asn_to_dotted(65535), "65535".to_string());
        assert_eq!(asn_to_dotted(4259840100), "65000.100".to_string());
    }

    #[test]
    fn test_format_elapsed_time() {
        assert_eq!(
            format_elapsed_time(Duration::seconds(30)),
            "00:00:30".to_string()
        );
        assert_eq!(
            format_elapsed_time(Duration::seconds(301)),
            "00:05:01".to_string()
        );
        assert_eq!(
            format_elapsed_time(Duration::seconds(32768)),
            "09:06:08".to_string()
        );
    }

    #[test]
    fn test_nanos_to_datetime() {
        let time = nanos_to_datetime(1_650_000_000_500_000_000).unwrap();
        assert_eq!(time.timestamp(), 1_650_000_000);
        assert_eq!(time.timestamp_subsec_millis(), 500);
        assert_eq!(nanos_to_datetime(0).unwrap().timestamp(), 0);
        assert!(nanos_to_datetime(u64::MAX).is_some());
    }

    #[test]
    fn test_maybe_string() {
        let value: Option<u64> = Some(5);
        assert_eq!(maybe_string(value.as_ref()), String::from("5"));
        let value: Option<&str> = None;
        assert_eq!(maybe_string(value.as_ref()), String::from("---"));
    }
}
