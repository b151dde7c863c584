use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn heading_label(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Assistant => "ASSISTANT",
            Self::System => "SYSTEM",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// A record creation time. Unparseable values are kept as written so they can
/// still be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timestamp {
    Instant(DateTime<Utc>),
    Verbatim(String),
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instant(instant) => {
                write!(f, "{}", instant.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Self::Verbatim(raw) => write!(f, "{raw}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub timestamp: Option<Timestamp>,
    pub role: MessageRole,
    pub text: String,
    /// Only ever set for assistant records.
    pub thinking: Option<String>,
}

impl MessageRecord {
    pub fn has_content(&self) -> bool {
        !self.text.is_empty() || self.thinking.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BashExecutionRecord {
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub timestamp: Option<Timestamp>,
    pub command: String,
    pub output: String,
}

/// `Ignored` entries are never rendered, but keep their links so a branch
/// walk can pass through them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Message(MessageRecord),
    BashExecution(BashExecutionRecord),
    Ignored {
        kind: String,
        id: Option<String>,
        parent_id: Option<String>,
        timestamp: Option<Timestamp>,
    },
}

impl Record {
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Message(message) => message.id.as_deref(),
            Self::BashExecution(bash) => bash.id.as_deref(),
            Self::Ignored { id, .. } => id.as_deref(),
        }
    }

    pub fn parent_id(&self) -> Option<&str> {
        match self {
            Self::Message(message) => message.parent_id.as_deref(),
            Self::BashExecution(bash) => bash.parent_id.as_deref(),
            Self::Ignored { parent_id, .. } => parent_id.as_deref(),
        }
    }

    pub fn timestamp(&self) -> Option<&Timestamp> {
        match self {
            Self::Message(message) => message.timestamp.as_ref(),
            Self::BashExecution(bash) => bash.timestamp.as_ref(),
            Self::Ignored { timestamp, .. } => timestamp.as_ref(),
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::Message(_) => "message",
            Self::BashExecution(_) => "bashExecution",
            Self::Ignored { kind, .. } => kind,
        }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMeta {
    pub session_id: Option<String>,
    pub started_at: Option<Timestamp>,
    pub cwd: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    pub session: SessionMeta,
    pub records: Vec<Record>,
    pub skipped: Vec<SkippedLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversion {
    pub markdown: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionMeta {
    pub source: String,
    pub candidate_count: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub session_id: String,
    pub path: PathBuf,
    pub metadata: ResolutionMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryListItem {
    pub entry_id: String,
    pub entry_type: String,
    pub parent_id: Option<String>,
    pub timestamp: Option<String>,
    pub is_leaf: bool,
    pub preview: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryListView {
    pub session_id: Option<String>,
    pub source: Option<String>,
    pub entries: Vec<EntryListItem>,
    #[serde(skip_serializing)]
    pub warnings: Vec<String>,
}
