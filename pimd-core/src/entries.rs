use std::collections::BTreeSet;

use crate::error::{PimdError, Result};
use crate::model::{EntryListItem, EntryListView, Record, Transcript};

const PREVIEW_CHARS: usize = 96;

/// Indexes every entry that carries an id, flagging the ones no other entry
/// points at as leaves.
pub fn list_entries(transcript: &Transcript, source: Option<&str>) -> EntryListView {
    let parent_ids = transcript
        .records
        .iter()
        .filter_map(Record::parent_id)
        .collect::<BTreeSet<_>>();

    let entries = transcript
        .records
        .iter()
        .filter_map(|record| {
            let entry_id = record.id()?;
            Some(EntryListItem {
                entry_id: entry_id.to_string(),
                entry_type: record.kind().to_string(),
                parent_id: record.parent_id().map(ToString::to_string),
                timestamp: record.timestamp().map(ToString::to_string),
                is_leaf: !parent_ids.contains(entry_id),
                preview: preview(record),
            })
        })
        .collect();

    let warnings = transcript
        .skipped
        .iter()
        .map(|skipped| format!("skipped line {}: {}", skipped.line, skipped.reason))
        .collect();

    EntryListView {
        session_id: transcript.session.session_id.clone(),
        source: source.map(ToString::to_string),
        entries,
        warnings,
    }
}

fn preview(record: &Record) -> Option<String> {
    let text = match record {
        Record::Message(message) if !message.text.is_empty() => message.text.clone(),
        Record::Message(message) => message.thinking.clone()?,
        Record::BashExecution(bash) => format!("$ {}", bash.command),
        Record::Ignored { .. } => return None,
    };

    Some(truncate_preview(&text, PREVIEW_CHARS)).filter(|text| !text.is_empty())
}

fn truncate_preview(input: &str, max_chars: usize) -> String {
    let normalized = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.char_indices().nth(max_chars).is_none() {
        return normalized;
    }

    let cut = normalized
        .char_indices()
        .nth(max_chars.saturating_sub(1))
        .map_or(normalized.len(), |(idx, _)| idx);
    format!("{}…", &normalized[..cut])
}

pub fn render_entry_list_markdown(view: &EntryListView) -> String {
    let mut lines = vec!["# Pi Session Entries".to_string(), String::new()];
    lines.extend(view.session_id.iter().map(|id| format!("- Session: `{id}`")));
    lines.extend(view.source.iter().map(|source| format!("- Source: `{source}`")));
    if lines.len() > 2 {
        lines.push(String::new());
    }

    if view.entries.is_empty() {
        lines.push("_No entries found in this session._".to_string());
    }

    for (index, entry) in view.entries.iter().enumerate() {
        let parent = entry.parent_id.as_deref().unwrap_or("root");
        let timestamp = entry.timestamp.as_deref().unwrap_or("unknown");
        let leaf = if entry.is_leaf { "yes" } else { "no" };

        lines.push(format!("## {}. `{}`", index + 1, entry.entry_id));
        lines.push(String::new());
        lines.push(format!("- Type: `{}`", entry.entry_type));
        lines.push(format!("- Parent: `{parent}`"));
        lines.push(format!("- Timestamp: `{timestamp}`"));
        lines.push(format!("- Leaf: `{leaf}`"));
        lines.extend(entry.preview.iter().map(|preview| format!("- Preview: {preview}")));
        lines.push(String::new());
    }

    let mut output = lines.join("\n");
    if !output.ends_with('\n') {
        output.push('\n');
    }
    output
}

pub fn entry_list_view_to_raw_json(view: &EntryListView) -> Result<String> {
    let mut json = serde_json::to_string_pretty(view)
        .map_err(|err| PimdError::Serialization(err.to_string()))?;
    json.push('\n');
    Ok(json)
}
