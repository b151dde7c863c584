use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use pimd_core::{
    ConvertOptions, ExtractionMode, PimdError, SessionRoots, SessionUri, convert_with_report,
    entry_list_view_to_raw_json, list_entries, parse_lines, read_session_file,
    render_entry_list_markdown, resolve_session,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    All,
    Branch,
}

impl From<ModeArg> for ExtractionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::All => Self::All,
            ModeArg::Branch => Self::Branch,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "pimd",
    version,
    about = "Convert a Pi session JSONL file to conversation-first Markdown"
)]
struct Cli {
    /// Path to a session .jsonl file, or pi://<session_id> / pi://<session_id>/<entry_id>
    input: String,

    /// Output file path (default: stdout). Use '-' for stdout
    #[arg(short, long, default_value = "-")]
    output: String,

    /// Export the full file or a single parentId chain
    #[arg(long, value_enum, default_value_t = ModeArg::All)]
    mode: ModeArg,

    /// Leaf id for branch mode (defaults to the last entry id)
    #[arg(long)]
    leaf: Option<String>,

    /// Do not include assistant thinking blocks
    #[arg(long)]
    no_thinking: bool,

    /// Include bashExecution entries as SYSTEM blocks
    #[arg(long)]
    include_bash: bool,

    /// Include timestamps
    #[arg(long)]
    timestamps: bool,

    /// Do not merge consecutive messages by role
    #[arg(long)]
    no_group_turns: bool,

    /// List session entries with their parent links instead of converting
    #[arg(long)]
    list: bool,

    /// Output raw JSON for --list, or the raw session file otherwise
    #[arg(long)]
    raw: bool,
}

struct LoadedInput {
    raw: String,
    source: String,
    entry_id: Option<String>,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PIMD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: Cli) -> pimd_core::Result<()> {
    let input = load_input(&cli.input)?;

    if cli.list {
        let view = list_entries(&parse_lines(input.raw.lines()), Some(input.source.as_str()));
        for warning in &view.warnings {
            warn!("{warning}");
        }
        let rendered = if cli.raw {
            entry_list_view_to_raw_json(&view)?
        } else {
            render_entry_list_markdown(&view)
        };
        return write_output(&cli.output, &rendered);
    }

    if cli.raw {
        return write_output(&cli.output, &input.raw);
    }

    let mode = if input.entry_id.is_some() {
        ExtractionMode::Branch
    } else {
        cli.mode.into()
    };
    if mode == ExtractionMode::All && cli.leaf.is_some() {
        warn!("--leaf is ignored unless --mode branch is selected");
    }

    let options = ConvertOptions {
        mode,
        leaf_id: cli.leaf.or(input.entry_id),
        include_thinking: !cli.no_thinking,
        include_bash: cli.include_bash,
        include_timestamps: cli.timestamps,
        group_turns: !cli.no_group_turns,
        source: Some(input.source),
    };

    let conversion = convert_with_report(input.raw.lines(), &options)?;
    for warning in &conversion.warnings {
        warn!("{warning}");
    }

    write_output(&cli.output, &conversion.markdown)
}

fn load_input(input: &str) -> pimd_core::Result<LoadedInput> {
    if !SessionUri::looks_like_uri(input) {
        let path = Path::new(input);
        return Ok(LoadedInput {
            raw: read_session_file(path)?,
            source: input.to_string(),
            entry_id: None,
        });
    }

    let uri = SessionUri::parse(input)?;
    let roots = SessionRoots::from_env_or_home()?;
    let resolved = resolve_session(&uri, &roots)?;
    for warning in &resolved.metadata.warnings {
        warn!("{warning}");
    }

    Ok(LoadedInput {
        raw: read_session_file(&resolved.path)?,
        source: resolved.path.display().to_string(),
        entry_id: uri.entry_id,
    })
}

fn write_output(destination: &str, content: &str) -> pimd_core::Result<()> {
    if destination == "-" {
        let mut stdout = io::stdout().lock();
        return stdout
            .write_all(content.as_bytes())
            .and_then(|()| stdout.flush())
            .map_err(|source| PimdError::Io {
                path: PathBuf::from("<stdout>"),
                source,
            });
    }

    let path = Path::new(destination);
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PimdError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(path, content).map_err(|source| PimdError::Io {
        path: path.to_path_buf(),
        source,
    })
}
