use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PulseError;

/// Shopper interactions the analytics store knows how to aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    ProductView,
    AddToCart,
    RemoveFromCart,
    WishlistAdd,
    Checkout,
    Purchase,
}

impl EventAction {
    pub const ALL: [EventAction; 6] = [
        EventAction::ProductView,
        EventAction::AddToCart,
        EventAction::RemoveFromCart,
        EventAction::WishlistAdd,
        EventAction::Checkout,
        EventAction::Purchase,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::ProductView => "product_view",
            EventAction::AddToCart => "add_to_cart",
            EventAction::RemoveFromCart => "remove_from_cart",
            EventAction::WishlistAdd => "wishlist_add",
            EventAction::Checkout => "checkout",
            EventAction::Purchase => "purchase",
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventAction {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| PulseError::UnknownAction(s.to_string()))
    }
}

/// Event as delivered by the bus
///
/// Expected format from producers:
/// ```json
/// {
///   "action": "add_to_cart",
///   "userId": "u-123",
///   "productId": "p-456",
///   "shopId": "s-789",
///   "country": "DE",
///   "city": "Berlin",
///   "device": "mobile",
///   "occurredAt": "2024-05-01T10:15:00Z"
/// }
/// ```
///
/// `action` stays a plain string here; it is checked when the batch is
/// processed, not when the message arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub action: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub shop_id: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    /// Defaults to arrival time when the producer omits it
    #[serde(default = "Utc::now")]
    pub occurred_at: DateTime<Utc>,
}

impl RawEvent {
    pub fn with_action(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            user_id: None,
            product_id: None,
            shop_id: None,
            country: None,
            city: None,
            device: None,
            occurred_at: Utc::now(),
        }
    }
}

/// Event whose action has been validated
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub action: EventAction,
    pub user_id: Option<String>,
    pub product_id: Option<String>,
    pub shop_id: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub device: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl TryFrom<RawEvent> for Event {
    type Error = PulseError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let action = raw.action.parse()?;

        Ok(Event {
            action,
            user_id: raw.user_id,
            product_id: raw.product_id,
            shop_id: raw.shop_id,
            country: raw.country,
            city: raw.city,
            device: raw.device,
            occurred_at: raw.occurred_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trips_through_str() {
        for action in EventAction::ALL {
            assert_eq!(action.as_str().parse::<EventAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let err = "bogus".parse::<EventAction>().unwrap_err();
        assert!(matches!(err, PulseError::UnknownAction(ref a) if a == "bogus"));

        // Matching is exact
        assert!("Add_To_Cart".parse::<EventAction>().is_err());
    }

    #[test]
    fn test_raw_event_deserialization() {
        let json = r#"{
            "action": "purchase",
            "userId": "u-1",
            "productId": "p-1",
            "shopId": "s-1",
            "country": "FR",
            "city": "Lyon",
            "device": "desktop",
            "occurredAt": "2024-05-01T10:15:00Z"
        }"#;

        let raw: RawEvent = serde_json::from_str(json).unwrap();
        assert_eq!(raw.action, "purchase");
        assert_eq!(raw.product_id.as_deref(), Some("p-1"));
        assert_eq!(raw.city.as_deref(), Some("Lyon"));
        assert_eq!(raw.occurred_at.to_rfc3339(), "2024-05-01T10:15:00+00:00");

        let event = Event::try_from(raw).unwrap();
        assert_eq!(event.action, EventAction::Purchase);
    }

    #[test]
    fn test_raw_event_with_only_action() {
        let before = Utc::now();
        let raw: RawEvent = serde_json::from_str(r#"{"action": "bogus"}"#).unwrap();

        assert_eq!(raw.action, "bogus");
        assert_eq!(raw.user_id, None);
        assert!(raw.occurred_at >= before);
        assert!(Event::try_from(raw).is_err());
    }

    #[test]
    fn test_raw_event_requires_action() {
        assert!(serde_json::from_str::<RawEvent>(r#"{"productId": "p-1"}"#).is_err());
    }
}
