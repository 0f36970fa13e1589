//! Internal module translating wire records into [`Message`]s.
//!
//! Translation is resilient: a malformed field is logged and treated as absent,
//! and only a record that cannot be identified at all is skipped. One bad
//! record never fails the whole batch.

use crate::error::{Error, Result};
use crate::message::Message;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;

/// Wire field holding the receive time in epoch milliseconds.
pub(crate) const TIMESTAMP_FIELD: &str = "posix-millis";

/// Translates one wire record into a message addressed to `recipient`.
///
/// # Errors
///
/// Returns [`Error::MalformedRecord`] if the record is not an object or has no id.
pub(crate) fn parse_record(record: &Value, recipient: &str) -> Result<Message> {
    let Some(fields) = record.as_object() else {
        return Err(Error::MalformedRecord {
            field: "record",
            message: format!("expected an object, got {}", kind(record)),
        });
    };

    let id = match fields.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        other => {
            return Err(Error::MalformedRecord {
                field: "id",
                message: format!("expected a non-empty id, got {}", other.map_or("nothing", kind)),
            })
        }
    };

    let mut message = Message::new(id.as_str())
        .with_subject(string_field(fields, "subject"))
        .with_sender(sender(fields.get("from")))
        .with_recipient(recipient)
        .with_text(string_field(fields, "text"))
        .with_html(string_field(fields, "html"));

    match received_at(fields.get(TIMESTAMP_FIELD)) {
        Ok(Some(at)) => message = message.with_received_at(at),
        Ok(None) => {}
        Err(e) => warn!(message_id = %id, error = %e, "Ignoring malformed timestamp"),
    }

    if let Some(headers) = fields.get("headers") {
        match headers {
            Value::Object(map) => {
                for (name, value) in map {
                    message = message.with_header(name.as_str(), header_value(value));
                }
            }
            Value::Null => {}
            other => warn!(
                message_id = %id,
                kind = kind(other),
                "Ignoring malformed headers"
            ),
        }
    }

    Ok(message)
}

/// Reads the receive timestamp. Missing, null or zero means "unknown".
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn received_at(value: Option<&Value>) -> Result<Option<DateTime<Utc>>> {
    let millis = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    let malformed = |message: String| Error::MalformedRecord {
        field: TIMESTAMP_FIELD,
        message,
    };

    match millis {
        Some(0) => Ok(None),
        Some(ms) => DateTime::from_timestamp_millis(ms)
            .map(Some)
            .ok_or_else(|| malformed(format!("{ms} is out of range"))),
        None => Err(malformed(format!(
            "expected epoch milliseconds, got {}",
            value.map_or("nothing", kind)
        ))),
    }
}

/// `from` is either a bare address or an object with an `address` member.
fn sender(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(address)) => address.clone(),
        Some(Value::Object(from)) => from
            .get("address")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Some(Value::Array(list)) => sender(list.first()),
        _ => String::new(),
    }
}

fn string_field(fields: &Map<String, Value>, name: &str) -> String {
    fields
        .get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn header_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(header_value).collect::<Vec<_>>().join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
