//! Read status derived from member watermarks.

use chrono::{DateTime, Utc};
use courier_database::types::epoch;
use courier_database::{Message, MessageStatus};

/// Derives the conversation-wide status of listed messages.
///
/// A message is `read` once every member's watermark has reached its
/// timestamp. The status is never stored.
pub struct StatusResolver;

impl StatusResolver {
    /// Oldest watermark among the members.
    ///
    /// A member without a watermark, or a conversation without members, pins
    /// the floor to the epoch.
    pub fn floor(watermarks: &[Option<DateTime<Utc>>]) -> DateTime<Utc> {
        let mut floor: Option<DateTime<Utc>> = None;
        for watermark in watermarks {
            let Some(watermark) = *watermark else {
                return epoch();
            };
            floor = Some(floor.map_or(watermark, |f| f.min(watermark)));
        }
        floor.unwrap_or_else(epoch)
    }

    pub fn status_for(timestamp: DateTime<Utc>, floor: DateTime<Utc>) -> MessageStatus {
        if timestamp <= floor {
            MessageStatus::Read
        } else {
            MessageStatus::Received
        }
    }

    /// Overwrite the status of every message from the given watermarks.
    pub fn apply(messages: &mut [Message], watermarks: &[Option<DateTime<Utc>>]) {
        let floor = Self::floor(watermarks);
        for message in messages {
            message.status = Self::status_for(message.timestamp, floor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap()
    }

    #[test]
    fn floor_is_minimum_watermark() {
        assert_eq!(StatusResolver::floor(&[Some(at(5)), Some(at(2)), Some(at(9))]), at(2));
    }

    #[test]
    fn missing_watermark_pins_floor_to_epoch() {
        assert_eq!(StatusResolver::floor(&[Some(at(5)), None]), epoch());
        assert_eq!(StatusResolver::floor(&[None, Some(at(5))]), epoch());
    }

    #[test]
    fn no_members_pins_floor_to_epoch() {
        assert_eq!(StatusResolver::floor(&[]), epoch());
    }

    #[test]
    fn boundary_counts_as_read() {
        let floor = at(10);
        assert_eq!(StatusResolver::status_for(floor, floor), MessageStatus::Read);
        assert_eq!(
            StatusResolver::status_for(floor - Duration::seconds(1), floor),
            MessageStatus::Read
        );
        assert_eq!(
            StatusResolver::status_for(floor + Duration::microseconds(1), floor),
            MessageStatus::Received
        );
    }
}
