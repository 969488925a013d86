use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Opaque user identifier. Ids arrive as strings or integers and are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Monetary amount: the text as received plus its parsed value.
#[derive(Debug, Clone, PartialEq)]
pub struct Amount {
    raw: String,
    value: f64,
}

impl Amount {
    /// Returns `None` for text that is not a finite decimal number.
    pub fn parse(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let value = raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
        Some(Self { raw, value })
    }

    pub fn from_value(value: f64) -> Self {
        Self {
            raw: value.to_string(),
            value,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FriendshipEvent {
    pub id1: UserId,
    pub id2: UserId,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseEvent {
    pub id: UserId,
    pub amount: Amount,
    pub timestamp: String,
}

impl PurchaseEvent {
    pub fn new(id: impl Into<UserId>, amount: Amount, timestamp: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            amount,
            timestamp: timestamp.into(),
        }
    }
}

/// A parsed log event, in the order it arrived.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Befriend(FriendshipEvent),
    Unfriend(FriendshipEvent),
    Purchase(PurchaseEvent),
}

impl Event {
    pub fn befriend(id1: impl Into<UserId>, id2: impl Into<UserId>, timestamp: impl Into<String>) -> Self {
        Event::Befriend(FriendshipEvent {
            id1: id1.into(),
            id2: id2.into(),
            timestamp: timestamp.into(),
        })
    }

    pub fn unfriend(id1: impl Into<UserId>, id2: impl Into<UserId>, timestamp: impl Into<String>) -> Self {
        Event::Unfriend(FriendshipEvent {
            id1: id1.into(),
            id2: id2.into(),
            timestamp: timestamp.into(),
        })
    }

    pub fn purchase(id: impl Into<UserId>, amount: Amount, timestamp: impl Into<String>) -> Self {
        Event::Purchase(PurchaseEvent::new(id, amount, timestamp))
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::Befriend(_) => EventKind::Befriend,
            Event::Unfriend(_) => EventKind::Unfriend,
            Event::Purchase(_) => EventKind::Purchase,
        }
    }

    pub fn timestamp(&self) -> &str {
        match self {
            Event::Befriend(e) | Event::Unfriend(e) => &e.timestamp,
            Event::Purchase(e) => &e.timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Befriend,
    Unfriend,
    Purchase,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Befriend => "befriend",
            EventKind::Unfriend => "unfriend",
            EventKind::Purchase => "purchase",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "befriend" => Some(EventKind::Befriend),
            "unfriend" => Some(EventKind::Unfriend),
            "purchase" => Some(EventKind::Purchase),
            _ => None,
        }
    }
}

/// Output record for a purchase exceeding `mean + 3 * sd` of its network.
///
/// Field order is the serialized order. `mean` and `sd` keep full precision in
/// memory and are written with two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedPurchase {
    pub event_type: EventKind,
    pub timestamp: String,
    pub id: UserId,
    pub amount: String,
    #[serde(serialize_with = "two_decimals")]
    pub mean: f64,
    #[serde(serialize_with = "two_decimals")]
    pub sd: f64,
}

impl FlaggedPurchase {
    pub fn new(purchase: &PurchaseEvent, mean: f64, sd: f64) -> Self {
        Self {
            event_type: EventKind::Purchase,
            timestamp: purchase.timestamp.clone(),
            id: purchase.id.clone(),
            amount: purchase.amount.raw().to_string(),
            mean,
            sd,
        }
    }
}

fn two_decimals<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:.2}", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_keeps_raw_text() {
        let amount = Amount::parse("16.830").unwrap();
        assert_eq!(amount.raw(), "16.830");
        assert!((amount.value() - 16.83).abs() < f64::EPSILON);
    }

    #[test]
    fn amount_rejects_non_numeric_and_non_finite() {
        assert!(Amount::parse("abc").is_none());
        assert!(Amount::parse("").is_none());
        assert!(Amount::parse("NaN").is_none());
        assert!(Amount::parse("inf").is_none());
    }

    #[test]
    fn flagged_purchase_serializes_in_stable_order() {
        let purchase = PurchaseEvent::new(
            "2",
            Amount::parse("1601.83").unwrap(),
            "2017-06-13 11:33:02",
        );
        let flagged = FlaggedPurchase::new(&purchase, 29.1, 21.4567);

        let json = serde_json::to_string(&flagged).unwrap();
        assert_eq!(
            json,
            r#"{"event_type":"purchase","timestamp":"2017-06-13 11:33:02","id":"2","amount":"1601.83","mean":"29.10","sd":"21.46"}"#
        );
    }

    #[test]
    fn event_kind_round_trips_through_text() {
        for kind in [EventKind::Befriend, EventKind::Unfriend, EventKind::Purchase] {
            assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::parse("refund"), None);
    }
}
