use std::fmt;
use std::str::FromStr;

use crate::error::PimdError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractionMode {
    #[default]
    All,
    Branch,
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Branch => write!(f, "branch"),
        }
    }
}

impl FromStr for ExtractionMode {
    type Err = PimdError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "all" => Ok(Self::All),
            "branch" => Ok(Self::Branch),
            _ => Err(PimdError::InvalidMode(input.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub mode: ExtractionMode,
    /// Branch endpoint. Defaults to the last record with an id.
    pub leaf_id: Option<String>,
    pub include_thinking: bool,
    pub include_bash: bool,
    pub include_timestamps: bool,
    pub group_turns: bool,
    pub source: Option<String>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::All,
            leaf_id: None,
            include_thinking: true,
            include_bash: false,
            include_timestamps: false,
            group_turns: true,
            source: None,
        }
    }
}

impl ConvertOptions {
    pub fn branch(leaf_id: Option<String>) -> Self {
        Self {
            mode: ExtractionMode::Branch,
            leaf_id,
            ..Self::default()
        }
    }
}
