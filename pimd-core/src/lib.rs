pub mod entries;
pub mod error;
pub mod graph;
pub mod model;
pub mod options;
pub mod parser;
pub mod provider;
pub mod render;
pub mod service;
pub mod turns;
pub mod uri;

pub use entries::{entry_list_view_to_raw_json, list_entries, render_entry_list_markdown};
pub use error::{PimdError, Result};
pub use model::{
    BashExecutionRecord, Conversion, EntryListItem, EntryListView, MessageRecord, MessageRole,
    Record, ResolvedSession, SessionMeta, Timestamp, Transcript,
};
pub use options::{ConvertOptions, ExtractionMode};
pub use parser::parse_lines;
pub use provider::SessionRoots;
pub use service::{
    convert, convert_transcript, convert_with_report, read_session_file, resolve_session,
};
pub use uri::SessionUri;
