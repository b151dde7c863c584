use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::SessionMeta;
use crate::options::{ConvertOptions, ExtractionMode};
use crate::turns::{Block, Turn, TurnKind};

const EMPTY_PLACEHOLDER: &str = "_No conversation messages found._";
const MIN_FENCE_LEN: usize = 3;

static TURN_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ {0,3}(?:#{1,6}[ \t]+(?:USER|ASSISTANT|SYSTEM|Pi session)\b|-{3,}[ \t]*$)")
        .expect("valid regex")
});

/// Output ends with exactly one newline and depends only on the arguments.
pub fn render_markdown(
    session: &SessionMeta,
    leaf_id: Option<&str>,
    turns: &[Turn],
    options: &ConvertOptions,
) -> String {
    let mut output = String::new();
    render_header(&mut output, session, leaf_id, options);

    if turns.is_empty() {
        output.push_str(EMPTY_PLACEHOLDER);
        output.push('\n');
        return output;
    }

    let sections = turns
        .iter()
        .map(|turn| render_turn(turn, options))
        .collect::<Vec<_>>();
    output.push_str(&sections.join("\n\n"));
    output.push('\n');
    output
}

fn render_header(
    output: &mut String,
    session: &SessionMeta,
    leaf_id: Option<&str>,
    options: &ConvertOptions,
) {
    match options.source.as_deref() {
        Some(source) => {
            let title = Path::new(source)
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or(source);
            output.push_str(&format!("# Pi session: {title}\n\n"));
        }
        None => output.push_str("# Pi session\n\n"),
    }

    if let Some(session_id) = &session.session_id {
        output.push_str(&format!("- id: {}\n", inline_code(session_id)));
    }
    if let Some(started_at) = &session.started_at {
        output.push_str(&format!(
            "- started: {}\n",
            inline_code(&started_at.to_string())
        ));
    }
    if let Some(cwd) = &session.cwd {
        output.push_str(&format!("- cwd: {}\n", inline_code(cwd)));
    }
    if let Some(source) = &options.source {
        output.push_str(&format!("- source: {}\n", inline_code(source)));
    }
    output.push_str(&format!(
        "- mode: {}\n",
        inline_code(&options.mode.to_string())
    ));
    if options.mode == ExtractionMode::Branch
        && let Some(leaf_id) = leaf_id
    {
        output.push_str(&format!("- leaf: {}\n", inline_code(leaf_id)));
    }

    output.push_str("\n---\n\n");
}

fn render_turn(turn: &Turn, options: &ConvertOptions) -> String {
    let heading = match turn.kind {
        TurnKind::Message(role) => format!("### {}", role.heading_label()),
        TurnKind::BashExecution => "### SYSTEM (bashExecution)".to_string(),
    };

    let mut sections = vec![heading];

    if options.include_timestamps
        && let (Some(first), Some(last)) = (turn.first_timestamp(), turn.last_timestamp())
    {
        if first == last {
            sections.push(format!("_timestamp: {first}_"));
        } else {
            sections.push(format!("_timestamps: {first} … {last}_"));
        }
    }

    let mut thinking_parts = Vec::new();
    for block in &turn.blocks {
        if let Block::Thinking(thinking) = block {
            if options.include_thinking {
                thinking_parts.push(thinking.as_str());
            }
            continue;
        }

        flush_thinking(&mut sections, &mut thinking_parts);
        match block {
            Block::Text(text) => {
                sections.push(balance_fences(&escape_turn_markers(text.trim_end())));
            }
            Block::Bash { command, output } => sections.extend(render_bash(command, output)),
            Block::Thinking(_) => {}
        }
    }
    flush_thinking(&mut sections, &mut thinking_parts);

    sections.join("\n\n")
}

fn flush_thinking(sections: &mut Vec<String>, parts: &mut Vec<&str>) {
    if parts.is_empty() {
        return;
    }

    let body = parts
        .iter()
        .map(|part| blockquote(part.trim_end()))
        .collect::<Vec<_>>()
        .join("\n\n");
    sections.push(format!(
        "<details>\n<summary>thinking</summary>\n\n{body}\n\n</details>"
    ));
    parts.clear();
}

fn render_bash(command: &str, output: &str) -> Vec<String> {
    let mut sections = Vec::new();

    if !command.trim().is_empty() {
        sections.push(format!("Command:\n{}", fenced(command.trim_end(), "bash")));
    }

    let output = output.trim_end_matches(['\n', '\r']);
    if !output.trim().is_empty() {
        sections.push(format!("Output:\n{}", fenced(output, "text")));
    }

    sections
}

pub fn blockquote(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wraps `content` in a backtick fence longer than any backtick run inside it.
pub fn fenced(content: &str, info: &str) -> String {
    let fence = "`".repeat(longest_run(content, '`').max(MIN_FENCE_LEN - 1) + 1);
    format!("{fence}{info}\n{content}\n{fence}")
}

fn inline_code(value: &str) -> String {
    let ticks = "`".repeat(longest_run(value, '`') + 1);
    if value.starts_with('`') || value.ends_with('`') {
        format!("{ticks} {value} {ticks}")
    } else {
        format!("{ticks}{value}{ticks}")
    }
}

fn longest_run(text: &str, target: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in text.chars() {
        if ch == target {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn fence_marker(line: &str) -> Option<(char, usize, &str)> {
    let indent = line
        .chars()
        .take_while(|ch| *ch == ' ' || *ch == '\t')
        .map(|ch| if ch == '\t' { 4 } else { 1 })
        .sum::<usize>();
    if indent > 3 {
        return None;
    }

    let trimmed = line.trim_start();
    let marker = trimmed.chars().next().filter(|ch| *ch == '`' || *ch == '~')?;
    let run = trimmed.chars().take_while(|ch| *ch == marker).count();
    (run >= MIN_FENCE_LEN).then(|| (marker, run, &trimmed[run * marker.len_utf8()..]))
}

fn closes(open: (char, usize), line: &str) -> bool {
    fence_marker(line).is_some_and(|(marker, run, rest)| {
        marker == open.0 && run >= open.1 && rest.trim().is_empty()
    })
}

/// Backslash-escapes body lines that would read as a turn heading or the
/// header rule. Fenced code is left alone.
pub fn escape_turn_markers(text: &str) -> String {
    let mut open: Option<(char, usize)> = None;
    let mut lines = Vec::new();

    for line in text.lines() {
        match open {
            Some(fence) => {
                if closes(fence, line) {
                    open = None;
                }
                lines.push(line.to_string());
            }
            None => {
                if let Some((marker, run, _)) = fence_marker(line) {
                    open = Some((marker, run));
                    lines.push(line.to_string());
                } else if TURN_MARKER_RE.is_match(line) {
                    lines.push(format!("\\{}", line.trim_start()));
                } else {
                    lines.push(line.to_string());
                }
            }
        }
    }

    lines.join("\n")
}

pub fn balance_fences(text: &str) -> String {
    let mut open: Option<(char, usize)> = None;

    for line in text.lines() {
        match open {
            None => open = fence_marker(line).map(|(marker, run, _)| (marker, run)),
            Some(fence) if closes(fence, line) => open = None,
            Some(_) => {}
        }
    }

    match open {
        Some((marker, run)) => format!("{text}\n{}", marker.to_string().repeat(run)),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{MessageRole, SessionMeta, Timestamp};
    use crate::options::{ConvertOptions, ExtractionMode};
    use crate::render::{
        balance_fences, blockquote, escape_turn_markers, fenced, render_markdown,
    };
    use crate::turns::{Block, Turn, TurnKind};

    fn assistant_turn() -> Turn {
        Turn {
            kind: TurnKind::Message(MessageRole::Assistant),
            blocks: vec![
                Block::Text("answer".to_string()),
                Block::Thinking("first thought\n\nsecond line".to_string()),
            ],
            timestamps: vec![
                Timestamp::Verbatim("t1".to_string()),
                Timestamp::Verbatim("t2".to_string()),
            ],
        }
    }

    #[test]
    fn renders_header_and_thinking_details() {
        let session = SessionMeta {
            session_id: Some("12cb4c19-2774-4de4-a0d0-9fa32fbae29f".to_string()),
            started_at: None,
            cwd: Some("/tmp/project".to_string()),
        };
        let options = ConvertOptions {
            source: Some("/tmp/sessions/run.jsonl".to_string()),
            ..ConvertOptions::default()
        };

        let output = render_markdown(&session, None, &[assistant_turn()], &options);
        assert_eq!(
            output,
            "# Pi session: run.jsonl\n\n- id: `12cb4c19-2774-4de4-a0d0-9fa32fbae29f`\n- cwd: `/tmp/project`\n- source: `/tmp/sessions/run.jsonl`\n- mode: `all`\n\n---\n\n### ASSISTANT\n\nanswer\n\n<details>\n<summary>thinking</summary>\n\n> first thought\n>\n> second line\n\n</details>\n"
        );
    }

    #[test]
    fn thinking_can_be_omitted() {
        let options = ConvertOptions {
            include_thinking: false,
            ..ConvertOptions::default()
        };

        let output = render_markdown(&SessionMeta::default(), None, &[assistant_turn()], &options);
        assert!(output.ends_with("### ASSISTANT\n\nanswer\n"));
        assert!(!output.contains("thinking"));
    }

    #[test]
    fn timestamps_show_range_for_grouped_turns() {
        let options = ConvertOptions {
            include_timestamps: true,
            ..ConvertOptions::default()
        };

        let output = render_markdown(&SessionMeta::default(), None, &[assistant_turn()], &options);
        assert!(output.contains("### ASSISTANT\n\n_timestamps: t1 … t2_\n\nanswer"));
    }

    #[test]
    fn bash_turn_renders_command_and_output() {
        let turn = Turn {
            kind: TurnKind::BashExecution,
            blocks: vec![Block::Bash {
                command: "echo '```'".to_string(),
                output: "```\n".to_string(),
            }],
            timestamps: Vec::new(),
        };

        let output = render_markdown(
            &SessionMeta::default(),
            None,
            &[turn],
            &ConvertOptions::default(),
        );
        assert!(output.contains(
            "### SYSTEM (bashExecution)\n\nCommand:\n````bash\necho '```'\n````\n\nOutput:\n````text\n```\n````\n"
        ));
    }

    #[test]
    fn branch_header_names_the_leaf() {
        let options = ConvertOptions::branch(None);

        let output = render_markdown(&SessionMeta::default(), Some("d1b2c3d4"), &[], &options);
        assert_eq!(
            output,
            "# Pi session\n\n- mode: `branch`\n- leaf: `d1b2c3d4`\n\n---\n\n_No conversation messages found._\n"
        );
        assert_eq!(options.mode, ExtractionMode::Branch);
    }

    #[test]
    fn open_code_fences_are_closed() {
        assert_eq!(
            balance_fences("see:\n```rust\nfn main() {}"),
            "see:\n```rust\nfn main() {}\n```"
        );
        assert_eq!(
            balance_fences("```\nclosed\n```\ntail"),
            "```\nclosed\n```\ntail"
        );
        assert_eq!(balance_fences("~~~~\nx\n~~~"), "~~~~\nx\n~~~\n~~~~");
    }

    #[test]
    fn indented_backticks_are_code_not_fences() {
        let text = "Indented code:\n\n    ```\n    not a fence\n\nend";
        assert_eq!(balance_fences(text), text);
        assert_eq!(
            balance_fences("```\n    ```\nstill open"),
            "```\n    ```\nstill open\n```"
        );
    }

    #[test]
    fn body_lines_that_mimic_document_structure_are_escaped() {
        assert_eq!(
            escape_turn_markers("before\n### ASSISTANT\n---\n# Pi session: x\n### Notes"),
            "before\n\\### ASSISTANT\n\\---\n\\# Pi session: x\n### Notes"
        );
        let fenced_text = "```\n### USER\n---\n```";
        assert_eq!(escape_turn_markers(fenced_text), fenced_text);
    }

    #[test]
    fn blockquote_keeps_blank_lines_inside_quote() {
        assert_eq!(blockquote("a\n\nb"), "> a\n>\n> b");
    }

    #[test]
    fn fence_grows_past_inner_backticks() {
        assert_eq!(fenced("plain", "text"), "```text\nplain\n```");
        assert_eq!(fenced("a ```` b", "text"), "`````text\na ```` b\n`````");
    }
}
