//! Subscription Entity
//!
//! A callback URL listening for one event kind, optionally scoped to one country.

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::event::EventKind;

/// Wire format of delivery timestamps (`YYYYMMDD HH:MM`). Subscribers may parse it.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d %H:%M";

/// The empty country, matching every triggering country
pub const WILDCARD_COUNTRY: &str = "";

pub fn format_timestamp<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Current local time in [`TIMESTAMP_FORMAT`]
pub fn timestamp_now() -> String {
    format_timestamp(&Local::now())
}

/// Subscription entity. Immutable once created; only deletion is supported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(rename = "_id")]
    pub id: String,

    /// Absolute callback URL
    pub url: String,

    pub event: EventKind,

    /// Upper-case two letter code, or empty for any country
    #[serde(default)]
    pub country: String,
}

impl Subscription {
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        event: EventKind,
        country: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            event,
            country: country.into(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.country == WILDCARD_COUNTRY
    }

    /// Selected iff the event is equal and the country is equal or the wildcard.
    pub fn matches(&self, event: EventKind, country: &str) -> bool {
        self.event == event && (self.country == country || self.is_wildcard())
    }
}

/// Body POSTed to a subscriber. Built per delivery, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPayload {
    pub id: String,
    pub url: String,
    pub country: String,
    pub event: EventKind,
    pub time: String,
}

impl DeliveryPayload {
    pub fn new(subscription: &Subscription, time: String) -> Self {
        Self {
            id: subscription.id.clone(),
            url: subscription.url.clone(),
            country: subscription.country.clone(),
            event: subscription.event,
            time,
        }
    }

    /// Payload stamped with the current local time
    pub fn stamped(subscription: &Subscription) -> Self {
        Self::new(subscription, timestamp_now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, Utc};

    #[test]
    fn test_timestamp_format() {
        let time = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 59).unwrap();
        assert_eq!(format_timestamp(&time), "20240307 09:05");
    }

    #[test]
    fn test_timestamp_now_parses_back() {
        let now = timestamp_now();
        assert_eq!(now.len(), 14);
        let parsed = NaiveDateTime::parse_from_str(&now, TIMESTAMP_FORMAT).unwrap();
        let drift = Local::now().naive_local() - parsed;
        assert!(drift.num_seconds() >= 0 && drift.num_seconds() < 120);
    }

    #[test]
    fn test_matching_rule() {
        let scoped = Subscription::new("a", "http://localhost:8080/hook", EventKind::Change, "NO");
        let wildcard = Subscription::new("b", "http://localhost:8080/hook", EventKind::Change, "");

        assert!(scoped.matches(EventKind::Change, "NO"));
        assert!(!scoped.matches(EventKind::Change, "SE"));
        assert!(!scoped.matches(EventKind::Delete, "NO"));
        assert!(!scoped.matches(EventKind::Change, "no"));

        assert!(wildcard.matches(EventKind::Change, "SE"));
        assert!(wildcard.matches(EventKind::Change, ""));
        assert!(!wildcard.matches(EventKind::Invoke, "SE"));
    }

    #[test]
    fn test_payload_wire_shape() {
        let sub = Subscription::new("Ab3dE", "http://localhost:8080/hook", EventKind::Register, "");
        let payload = DeliveryPayload::new(&sub, "20240307 09:05".to_string());

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "Ab3dE",
                "url": "http://localhost:8080/hook",
                "country": "",
                "event": "REGISTER",
                "time": "20240307 09:05"
            })
        );
    }

    #[test]
    fn test_entity_uses_document_key() {
        let sub = Subscription::new("Ab3dE", "http://localhost:8080/hook", EventKind::Delete, "SE");
        let json = serde_json::to_value(&sub).unwrap();
        assert_eq!(json["_id"], "Ab3dE");
        assert_eq!(json["event"], "DELETE");
    }
}
