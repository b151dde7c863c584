use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use dirs::home_dir;

use crate::error::{PimdError, Result};

pub mod pi;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRoots {
    pub pi_root: PathBuf,
}

impl SessionRoots {
    pub fn from_env_or_home() -> Result<Self> {
        Self::from_parts(env::var_os("PI_CODING_AGENT_DIR"), home_dir())
    }

    fn from_parts(agent_dir: Option<OsString>, home: Option<PathBuf>) -> Result<Self> {
        // Precedence:
        // 1) PI_CODING_AGENT_DIR (official pi coding agent root env)
        // 2) ~/.pi/agent (pi default)
        if let Some(agent_dir) = agent_dir.filter(|path| !path.is_empty()) {
            return Ok(Self {
                pi_root: PathBuf::from(agent_dir),
            });
        }

        let home = home.ok_or(PimdError::HomeDirectoryNotFound)?;
        Ok(Self {
            pi_root: home.join(".pi/agent"),
        })
    }
}
