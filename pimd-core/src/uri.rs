use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{PimdError, Result};

static SESSION_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("valid regex")
});
static SHORT_ENTRY_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[0-9a-f]{8}$").expect("valid regex"));

/// `pi://<session_id>` or `pi://<session_id>/<entry_id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUri {
    pub session_id: String,
    pub entry_id: Option<String>,
}

impl SessionUri {
    pub fn parse(input: &str) -> Result<Self> {
        input.parse()
    }

    pub fn looks_like_uri(input: &str) -> bool {
        input.contains("://")
    }
}

impl fmt::Display for SessionUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entry_id {
            Some(entry_id) => write!(f, "pi://{}/{entry_id}", self.session_id),
            None => write!(f, "pi://{}", self.session_id),
        }
    }
}

impl FromStr for SessionUri {
    type Err = PimdError;

    fn from_str(input: &str) -> Result<Self> {
        let (scheme, target) = input
            .split_once("://")
            .ok_or_else(|| PimdError::InvalidUri(input.to_string()))?;

        if scheme != "pi" {
            return Err(PimdError::UnsupportedScheme(scheme.to_string()));
        }

        let mut segments = target.split('/');
        let session_id = segments.next().unwrap_or_default();
        let entry_id = segments.next();

        if segments.next().is_some() || entry_id.is_some_and(str::is_empty) {
            return Err(PimdError::InvalidUri(input.to_string()));
        }

        if !SESSION_ID_RE.is_match(session_id) {
            return Err(PimdError::InvalidSessionId(session_id.to_string()));
        }

        let entry_id = entry_id.map(|entry_id| {
            if SESSION_ID_RE.is_match(entry_id) || SHORT_ENTRY_ID_RE.is_match(entry_id) {
                entry_id.to_ascii_lowercase()
            } else {
                entry_id.to_string()
            }
        });

        Ok(Self {
            session_id: session_id.to_ascii_lowercase(),
            entry_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::SessionUri;

    #[test]
    fn parse_session_uri() {
        let uri = SessionUri::parse("pi://12CB4C19-2774-4DE4-A0D0-9FA32FBAE29F")
            .expect("parse should succeed");
        assert_eq!(uri.session_id, "12cb4c19-2774-4de4-a0d0-9fa32fbae29f");
        assert_eq!(uri.entry_id, None);
        assert_eq!(uri.to_string(), "pi://12cb4c19-2774-4de4-a0d0-9fa32fbae29f");
    }

    #[test]
    fn parse_entry_uri() {
        let uri = SessionUri::parse("pi://12cb4c19-2774-4de4-a0d0-9fa32fbae29f/D1B2C3D4")
            .expect("parse should succeed");
        assert_eq!(uri.entry_id.as_deref(), Some("d1b2c3d4"));
    }

    #[test]
    fn rejects_other_schemes() {
        let err = SessionUri::parse("codex://12cb4c19-2774-4de4-a0d0-9fa32fbae29f")
            .expect_err("must fail");
        assert!(format!("{err}").contains("unsupported scheme"));
    }

    #[test]
    fn rejects_malformed_targets() {
        assert!(SessionUri::parse("pi://not-a-session").is_err());
        assert!(SessionUri::parse("pi://12cb4c19-2774-4de4-a0d0-9fa32fbae29f/").is_err());
        assert!(SessionUri::parse("pi://12cb4c19-2774-4de4-a0d0-9fa32fbae29f/a/b").is_err());
        assert!(SessionUri::parse("12cb4c19-2774-4de4-a0d0-9fa32fbae29f").is_err());
    }

    #[test]
    fn detects_uri_inputs() {
        assert!(SessionUri::looks_like_uri("pi://x"));
        assert!(!SessionUri::looks_like_uri("./session.jsonl"));
    }
}
