use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PimdError {
    #[error("leaf not found: {leaf_id}")]
    LeafNotFound { leaf_id: String },

    #[error("invalid uri: {0}")]
    InvalidUri(String),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("invalid mode: {0}")]
    InvalidMode(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("cannot determine home directory")]
    HomeDirectoryNotFound,

    #[error("session not found for session_id={session_id}")]
    SessionNotFound {
        session_id: String,
        searched_roots: Vec<PathBuf>,
    },

    #[error("session file is not valid UTF-8: {path}")]
    NonUtf8SessionFile { path: PathBuf },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PimdError>;
