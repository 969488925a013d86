use serde::Deserialize;
use serde_json::Value;
use spendgraph_core::error::{ErrorCode, SpendgraphError};
use spendgraph_core::model::{Amount, Event, EventKind, UserId};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("blank line")]
    Blank,
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("field {field} has unsupported value {value}")]
    InvalidField { field: &'static str, value: String },
    #[error("unknown event type: {0}")]
    UnknownEventType(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("line is not valid UTF-8: {0}")]
    InvalidEncoding(String),
}

impl SpendgraphError for ParseError {
    fn error_code(&self) -> ErrorCode {
        ErrorCode::MalformedEvent
    }
}

/// One log line as written by upstream producers. Ids, amounts and timestamps
/// may be JSON strings or numbers.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    pub event_type: Option<Value>,
    pub timestamp: Option<Value>,
    pub id: Option<Value>,
    pub id1: Option<Value>,
    pub id2: Option<Value>,
    pub amount: Option<Value>,
}

impl RawEvent {
    pub fn try_into_event(self) -> Result<Event, ParseError> {
        let event_type = required_text(self.event_type, "event_type")?;
        let kind = EventKind::parse(event_type.trim())
            .ok_or(ParseError::UnknownEventType(event_type))?;
        let timestamp = required_text(self.timestamp, "timestamp")?;

        match kind {
            EventKind::Befriend | EventKind::Unfriend => {
                let id1 = required_id(self.id1, "id1")?;
                let id2 = required_id(self.id2, "id2")?;
                Ok(match kind {
                    EventKind::Befriend => Event::befriend(id1, id2, timestamp),
                    _ => Event::unfriend(id1, id2, timestamp),
                })
            }
            EventKind::Purchase => {
                let id = required_id(self.id, "id")?;
                let raw_amount = required_text(self.amount, "amount")?;
                let amount = Amount::parse(raw_amount.clone())
                    .ok_or(ParseError::InvalidAmount(raw_amount))?;
                Ok(Event::purchase(id, amount, timestamp))
            }
        }
    }
}

/// Parse a single JSON log line into a typed event.
pub fn parse_event_line(line: &str) -> Result<Event, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Blank);
    }
    let raw: RawEvent =
        serde_json::from_str(line).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    raw.try_into_event()
}

/// Decode one raw log line. Lines that are not UTF-8 are malformed events.
pub fn decode_line(bytes: &[u8]) -> Result<&str, ParseError> {
    std::str::from_utf8(bytes).map_err(|e| ParseError::InvalidEncoding(e.to_string()))
}

fn required_text(value: Option<Value>, field: &'static str) -> Result<String, ParseError> {
    match value {
        None | Some(Value::Null) => Err(ParseError::MissingField(field)),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(ParseError::InvalidField {
            field,
            value: other.to_string(),
        }),
    }
}

fn required_id(value: Option<Value>, field: &'static str) -> Result<UserId, ParseError> {
    let text = required_text(value, field)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::InvalidField {
            field,
            value: text.clone(),
        });
    }
    Ok(UserId::new(trimmed))
}
