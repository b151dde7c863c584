use std::fs;
use std::path::Path;

use crate::error::{PimdError, Result};
use crate::graph::select_records;
use crate::model::{Conversion, ResolvedSession, Transcript};
use crate::options::ConvertOptions;
use crate::parser::parse_lines;
use crate::provider::SessionRoots;
use crate::provider::pi::PiProvider;
use crate::render::render_markdown;
use crate::turns::{group_turns, is_renderable};
use crate::uri::SessionUri;

/// Fails only when `options.leaf_id` names an entry that does not exist in
/// branch mode; malformed content is skipped.
pub fn convert<I, S>(lines: I, options: &ConvertOptions) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    convert_with_report(lines, options).map(|conversion| conversion.markdown)
}

pub fn convert_with_report<I, S>(lines: I, options: &ConvertOptions) -> Result<Conversion>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    convert_transcript(&parse_lines(lines), options)
}

pub fn convert_transcript(transcript: &Transcript, options: &ConvertOptions) -> Result<Conversion> {
    let selection = select_records(
        &transcript.records,
        options.mode,
        options.leaf_id.as_deref(),
    )?;

    let renderable = selection
        .records
        .into_iter()
        .filter(|record| is_renderable(record, options.include_bash))
        .collect::<Vec<_>>();
    let turns = group_turns(&renderable, options.group_turns);
    let markdown = render_markdown(
        &transcript.session,
        selection.leaf_id.as_deref(),
        &turns,
        options,
    );

    let mut warnings = transcript
        .skipped
        .iter()
        .map(|skipped| format!("skipped line {}: {}", skipped.line, skipped.reason))
        .collect::<Vec<_>>();
    warnings.extend(selection.warnings);

    Ok(Conversion { markdown, warnings })
}

pub fn read_session_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| PimdError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    String::from_utf8(bytes).map_err(|_| PimdError::NonUtf8SessionFile {
        path: path.to_path_buf(),
    })
}

pub fn resolve_session(uri: &SessionUri, roots: &SessionRoots) -> Result<ResolvedSession> {
    PiProvider::new(&roots.pi_root).resolve(&uri.session_id)
}
