use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::model::{
    BashExecutionRecord, MessageRecord, MessageRole, Record, SessionMeta, SkippedLine, Timestamp,
    Transcript,
};

/// Epoch values above this are taken to be milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

struct Links {
    id: Option<String>,
    parent_id: Option<String>,
    timestamp: Option<Timestamp>,
}

enum PayloadRole {
    Message(MessageRole),
    BashExecution,
}

/// Malformed lines never abort the run: they are recorded in
/// [`Transcript::skipped`] and parsing carries on with the next line.
pub fn parse_lines<I, S>(lines: I) -> Transcript
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut transcript = Transcript::default();

    for (line_idx, line) in lines.into_iter().enumerate() {
        let line_no = line_idx + 1;
        let mut trimmed = line.as_ref().trim();
        if line_idx == 0 {
            trimmed = trimmed.trim_start_matches('\u{feff}');
        }
        if trimmed.is_empty() {
            continue;
        }

        let value = match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => value,
            Err(err) => {
                debug!(line = line_no, error = %err, "skipping malformed jsonl line");
                transcript.skipped.push(SkippedLine {
                    line: line_no,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        if !value.is_object() {
            debug!(line = line_no, "skipping non-object jsonl line");
            transcript.skipped.push(SkippedLine {
                line: line_no,
                reason: "expected a JSON object".to_string(),
            });
            continue;
        }

        if value.get("type").and_then(Value::as_str) == Some("session") {
            absorb_session_header(&mut transcript.session, &value);
            continue;
        }

        transcript.records.push(classify_record(&value));
    }

    transcript
}

fn absorb_session_header(meta: &mut SessionMeta, value: &Value) {
    if meta.session_id.is_none() {
        meta.session_id = value.get("id").and_then(json_id);
    }
    if meta.started_at.is_none() {
        meta.started_at = value.get("timestamp").and_then(parse_timestamp);
    }
    if meta.cwd.is_none() {
        meta.cwd = value
            .get("cwd")
            .and_then(Value::as_str)
            .filter(|cwd| !cwd.is_empty())
            .map(ToString::to_string);
    }
}

pub fn classify_record(value: &Value) -> Record {
    let record_type = value.get("type").and_then(Value::as_str).unwrap_or("unknown");
    let nested = value.get("message").filter(|message| message.is_object());
    let payload = nested.unwrap_or(value);

    let links = Links {
        id: value.get("id").and_then(json_id),
        parent_id: value.get("parentId").and_then(json_id),
        timestamp: value
            .get("timestamp")
            .and_then(parse_timestamp)
            .or_else(|| nested.and_then(|message| message.get("timestamp")).and_then(parse_timestamp)),
    };

    let role = match record_type {
        "message" => payload
            .get("role")
            .and_then(Value::as_str)
            .and_then(parse_payload_role),
        "bashExecution" => Some(PayloadRole::BashExecution),
        "user" | "assistant" | "system" => payload
            .get("role")
            .and_then(Value::as_str)
            .or(Some(record_type))
            .and_then(parse_payload_role),
        _ => None,
    };

    match role {
        Some(PayloadRole::Message(role)) => Record::Message(message_record(role, payload, links)),
        Some(PayloadRole::BashExecution) => {
            Record::BashExecution(bash_execution_record(payload, links))
        }
        None => Record::Ignored {
            kind: record_type.to_string(),
            id: links.id,
            parent_id: links.parent_id,
            timestamp: links.timestamp,
        },
    }
}

fn parse_payload_role(role: &str) -> Option<PayloadRole> {
    match role {
        "user" => Some(PayloadRole::Message(MessageRole::User)),
        "assistant" => Some(PayloadRole::Message(MessageRole::Assistant)),
        "system" => Some(PayloadRole::Message(MessageRole::System)),
        "bashExecution" => Some(PayloadRole::BashExecution),
        _ => None,
    }
}

fn message_record(role: MessageRole, payload: &Value, links: Links) -> MessageRecord {
    let (text, thinking) = extract_text_and_thinking(payload.get("content"));
    let thinking = (role == MessageRole::Assistant && !thinking.is_empty()).then_some(thinking);

    MessageRecord {
        id: links.id,
        parent_id: links.parent_id,
        timestamp: links.timestamp,
        role,
        text,
        thinking,
    }
}

fn bash_execution_record(payload: &Value, links: Links) -> BashExecutionRecord {
    let field = |key: &str| {
        payload
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    BashExecutionRecord {
        id: links.id,
        parent_id: links.parent_id,
        timestamp: links.timestamp,
        command: field("command"),
        output: field("output"),
    }
}

/// Splits message content into `(text, thinking)`, each part trimmed and
/// joined by a blank line. Tool calls, images and unknown items are dropped.
pub fn extract_text_and_thinking(content: Option<&Value>) -> (String, String) {
    let Some(content) = content else {
        return (String::new(), String::new());
    };

    if let Some(text) = content.as_str() {
        return (text.trim().to_string(), String::new());
    }

    let Some(items) = content.as_array() else {
        return (String::new(), String::new());
    };

    let mut text_parts = Vec::new();
    let mut thinking_parts = Vec::new();

    for item in items {
        if let Some(text) = item.as_str()
            && !text.trim().is_empty()
        {
            text_parts.push(text.trim());
            continue;
        }

        match item.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(text) = item.get("text").and_then(Value::as_str)
                    && !text.trim().is_empty()
                {
                    text_parts.push(text.trim());
                }
            }
            Some("thinking") => {
                if let Some(thinking) = item.get("thinking").and_then(Value::as_str)
                    && !thinking.trim().is_empty()
                {
                    thinking_parts.push(thinking.trim());
                }
            }
            _ => {}
        }
    }

    (text_parts.join("\n\n"), thinking_parts.join("\n\n"))
}

fn json_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

pub fn parse_timestamp(value: &Value) -> Option<Timestamp> {
    match value {
        Value::String(raw) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            if let Ok(instant) = raw.parse::<DateTime<Utc>>() {
                return Some(Timestamp::Instant(instant));
            }
            if let Ok(naive) = raw.parse::<NaiveDateTime>() {
                return Some(Timestamp::Instant(naive.and_utc()));
            }
            Some(Timestamp::Verbatim(raw.to_string()))
        }
        Value::Number(number) => {
            let instant = if let Some(epoch) = number.as_i64() {
                if epoch.unsigned_abs() > EPOCH_MILLIS_THRESHOLD.unsigned_abs() {
                    DateTime::from_timestamp_millis(epoch)
                } else {
                    DateTime::from_timestamp(epoch, 0)
                }
            } else {
                number.as_f64().and_then(float_epoch)
            };
            instant.map(Timestamp::Instant)
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_epoch(epoch: f64) -> Option<DateTime<Utc>> {
    if !epoch.is_finite() {
        return None;
    }
    let millis = if epoch.abs() > EPOCH_MILLIS_THRESHOLD as f64 {
        epoch
    } else {
        epoch * 1000.0
    };
    // Saturating cast; out-of-range values are rejected by chrono.
    DateTime::from_timestamp_millis(millis as i64)
}
