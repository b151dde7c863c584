use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{PimdError, Result};
use crate::model::{ResolutionMeta, ResolvedSession};
use crate::parser::parse_lines;

/// Lines read from the top of a file while looking for its session header.
const HEADER_SCAN_LINES: usize = 20;

/// Finds session files under `<root>/sessions` by the id in their header line.
#[derive(Debug, Clone)]
pub struct PiProvider {
    root: PathBuf,
}

#[derive(Debug)]
struct Candidate {
    path: PathBuf,
    modified: SystemTime,
}

impl PiProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn sessions_root(&self) -> PathBuf {
        self.root.join("sessions")
    }

    fn header_session_id(path: &Path) -> Option<String> {
        let file = fs::File::open(path).ok()?;
        let head = BufReader::new(file)
            .lines()
            .take(HEADER_SCAN_LINES)
            .map_while(std::result::Result::ok);
        parse_lines(head).session.session_id
    }

    fn is_session_file(path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "jsonl")
    }

    fn find_candidates(sessions_root: &Path, session_id: &str) -> Vec<Candidate> {
        if !sessions_root.is_dir() {
            debug!(root = %sessions_root.display(), "sessions directory missing");
            return Vec::new();
        }

        WalkDir::new(sessions_root)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file() && Self::is_session_file(entry.path()))
            .filter(|entry| {
                Self::header_session_id(entry.path())
                    .is_some_and(|id| id.eq_ignore_ascii_case(session_id))
            })
            .map(|entry| Candidate {
                modified: entry
                    .metadata()
                    .ok()
                    .and_then(|meta| meta.modified().ok())
                    .unwrap_or(SystemTime::UNIX_EPOCH),
                path: entry.into_path(),
            })
            .collect()
    }

    pub fn resolve(&self, session_id: &str) -> Result<ResolvedSession> {
        let sessions_root = self.sessions_root();
        let candidates = Self::find_candidates(&sessions_root, session_id);
        let candidate_count = candidates.len();

        let Some(selected) = candidates
            .into_iter()
            .max_by_key(|candidate| candidate.modified)
            .map(|candidate| candidate.path)
        else {
            return Err(PimdError::SessionNotFound {
                session_id: session_id.to_string(),
                searched_roots: vec![sessions_root],
            });
        };
        debug!(session_id, path = %selected.display(), candidate_count, "resolved session");

        let mut warnings = Vec::new();
        if candidate_count > 1 {
            warnings.push(format!(
                "multiple matches found ({candidate_count}) for session_id={session_id}; selected latest: {}",
                selected.display()
            ));
        }

        Ok(ResolvedSession {
            session_id: session_id.to_string(),
            path: selected,
            metadata: ResolutionMeta {
                source: "pi:sessions".to_string(),
                candidate_count,
                warnings,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::thread;
    use std::time::Duration;

    use tempfile::tempdir;

    use super::PiProvider;

    const SESSION_ID: &str = "12cb4c19-2774-4de4-a0d0-9fa32fbae29f";

    fn header(session_id: &str) -> String {
        format!(
            r#"{{"type":"session","version":3,"id":"{session_id}","timestamp":"2026-02-23T13:00:12.780Z","cwd":"/tmp/project"}}"#
        )
    }

    fn write_file(root: &Path, relative: &str, body: &str) -> PathBuf {
        let path = root.join("sessions").join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, body).expect("write");
        path
    }

    #[test]
    fn matches_on_header_id_not_file_name() {
        let temp = tempdir().expect("tempdir");
        let wanted = write_file(
            temp.path(),
            "--tmp-project--/renamed.jsonl",
            &format!("\n{}\n", header(SESSION_ID)),
        );
        write_file(
            temp.path(),
            &format!("--tmp-project--/2026-02-23T14-00-00-000Z_{SESSION_ID}.jsonl"),
            &header("0f0f0f0f-2774-4de4-a0d0-9fa32fbae29f"),
        );

        let resolved = PiProvider::new(temp.path())
            .resolve(SESSION_ID)
            .expect("resolve should succeed");

        assert_eq!(resolved.path, wanted);
        assert_eq!(resolved.session_id, SESSION_ID);
        assert_eq!(resolved.metadata.source, "pi:sessions");
        assert_eq!(resolved.metadata.candidate_count, 1);
        assert!(resolved.metadata.warnings.is_empty());
    }

    #[test]
    fn id_comparison_ignores_case_and_skips_other_extensions() {
        let temp = tempdir().expect("tempdir");
        write_file(temp.path(), "a/session.json", &header(SESSION_ID));
        let wanted = write_file(
            temp.path(),
            "b/session.jsonl",
            &header(&SESSION_ID.to_ascii_uppercase()),
        );

        let resolved = PiProvider::new(temp.path())
            .resolve(SESSION_ID)
            .expect("resolve should succeed");
        assert_eq!(resolved.path, wanted);
    }

    #[test]
    fn newest_duplicate_wins_with_warning() {
        let temp = tempdir().expect("tempdir");
        let older = write_file(temp.path(), "a/first.jsonl", &header(SESSION_ID));
        thread::sleep(Duration::from_millis(15));
        let newer = write_file(temp.path(), "b/second.jsonl", &header(SESSION_ID));

        let resolved = PiProvider::new(temp.path())
            .resolve(SESSION_ID)
            .expect("resolve should succeed");

        assert_eq!(resolved.path, newer);
        assert_eq!(resolved.metadata.candidate_count, 2);
        assert_eq!(resolved.metadata.warnings.len(), 1);
        assert!(resolved.metadata.warnings[0].contains("multiple matches found (2)"));
        assert!(older.exists());
    }

    #[test]
    fn headerless_files_are_not_candidates() {
        let temp = tempdir().expect("tempdir");
        write_file(
            temp.path(),
            "a/messages.jsonl",
            &format!(r#"{{"type":"message","id":"{SESSION_ID}"}}"#),
        );

        let err = PiProvider::new(temp.path())
            .resolve(SESSION_ID)
            .expect_err("must fail");
        assert!(err.to_string().contains("session not found"));
    }

    #[test]
    fn missing_sessions_directory_returns_not_found() {
        let temp = tempdir().expect("tempdir");
        let err = PiProvider::new(temp.path().join("nowhere"))
            .resolve(SESSION_ID)
            .expect_err("must fail");
        assert!(err.to_string().contains(SESSION_ID));
    }
}
