//! Timestamp encoding.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings with microsecond
//! precision, so SQL `ORDER BY`, `MIN` and `<` comparisons on the text column
//! agree with chronological order.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

use super::ChatResult;

/// Current time truncated to the stored precision.
pub fn now_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub fn epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

pub fn encode_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_timestamp(value: &str) -> ChatResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn encoding_is_fixed_width_and_sortable() {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let later = base + Duration::microseconds(1);

        let a = encode_timestamp(&base);
        let b = encode_timestamp(&later);

        assert_eq!(a, "2024-05-01T09:30:00.000000Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }

    #[test]
    fn decode_reverses_encode() {
        let now = now_timestamp();
        assert_eq!(decode_timestamp(&encode_timestamp(&now)).unwrap(), now);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_timestamp("yesterday").is_err());
    }
}
