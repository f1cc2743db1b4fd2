//! Spawn requests loaded from JSON
//!
//! ```json
//! {
//!   "command": ["/bin/sh", "-c", "echo hi"],
//!   "env": ["PATH=/usr/bin:/bin", "TERM=xterm-256color"],
//!   "working_dir": "/tmp",
//!   "mode": { "echo": false, "control_chars": { "erase": 8 } }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mode::{ControlChar, TerminalMode};
use crate::spawn::PtyCommand;

/// Everything needed to spawn one child
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// `command[0]` is the program, resolved through PATH
    pub command: Vec<String>,
    /// Exact environment as `KEY=VALUE`; inherit the parent's when absent
    #[serde(default)]
    pub env: Option<Vec<String>>,
    #[serde(default = "default_working_dir")]
    pub working_dir: String,
    #[serde(default)]
    pub mode: ModeOverrides,
}

fn default_working_dir() -> String {
    "/".to_string()
}

/// Changes on top of the default terminal mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeOverrides {
    #[serde(default)]
    pub echo: Option<bool>,
    #[serde(default)]
    pub canonical: Option<bool>,
    /// Slot name (`intr`, `erase`, `eof`, `min`, ...) to byte value
    #[serde(default)]
    pub control_chars: BTreeMap<String, u8>,
}

impl ModeOverrides {
    pub fn apply(&self, mut mode: TerminalMode) -> Result<TerminalMode> {
        if let Some(echo) = self.echo {
            mode = mode.with_echo(echo);
        }
        if let Some(canonical) = self.canonical {
            mode = mode.with_canonical(canonical);
        }
        for (name, &value) in &self.control_chars {
            let cc = ControlChar::from_name(name).ok_or_else(|| {
                Error::Config(serde::de::Error::custom(format!(
                    "unknown control character `{}`",
                    name
                )))
            })?;
            mode = mode.with_control_char(cc, value);
        }
        Ok(mode)
    }
}

impl SpawnRequest {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Build the command this request describes
    pub fn to_command(&self) -> Result<PtyCommand> {
        let (program, args) = self.command.split_first().ok_or(Error::EmptyCommand)?;
        let mut cmd = PtyCommand::new(program)
            .args(args)
            .current_dir(&self.working_dir)
            .mode(self.mode.apply(TerminalMode::default())?);

        if let Some(env) = &self.env {
            cmd = cmd.env_entries(env);
        }
        Ok(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[test]
    fn test_minimal_request() {
        let req = SpawnRequest::from_json_str(r#"{ "command": ["/bin/echo", "hi"] }"#).unwrap();
        assert_eq!(req.command, vec!["/bin/echo", "hi"]);
        assert_eq!(req.working_dir, "/");
        assert_eq!(req.env, None);
        assert_eq!(req.mode, ModeOverrides::default());
    }

    #[test]
    fn test_full_request_to_command() {
        let req = SpawnRequest::from_json_str(
            r#"{
                "command": ["/bin/sh", "-c", "exit 3"],
                "env": ["PATH=/bin", "EMPTY"],
                "working_dir": "/tmp",
                "mode": { "echo": false, "canonical": false, "control_chars": { "erase": 8 } }
            }"#,
        )
        .unwrap();

        let cmd = req.to_command().unwrap();
        assert_eq!(cmd.get_argv().len(), 3);
        assert_eq!(cmd.get_current_dir(), "/tmp");
        assert_eq!(
            cmd.get_env(),
            &[OsString::from("PATH=/bin"), OsString::from("EMPTY")]
        );

        let mode = req.mode.apply(TerminalMode::default()).unwrap();
        assert!(!mode.echo());
        assert!(!mode.canonical());
        assert_eq!(mode.control_char(ControlChar::Erase), 8);
    }

    #[test]
    fn test_env_passed_verbatim() {
        let req = SpawnRequest::from_json_str(
            r#"{ "command": ["/bin/true"], "env": ["A=1", "A=2", "EMPTY"] }"#,
        )
        .unwrap();
        let cmd = req.to_command().unwrap();
        assert_eq!(
            cmd.get_env(),
            &[
                OsString::from("A=1"),
                OsString::from("A=2"),
                OsString::from("EMPTY")
            ]
        );
    }

    #[test]
    fn test_unknown_control_char() {
        let overrides = ModeOverrides {
            control_chars: BTreeMap::from([("bogus".to_string(), 1)]),
            ..Default::default()
        };
        let err = overrides.apply(TerminalMode::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_empty_command() {
        let req = SpawnRequest::from_json_str(r#"{ "command": [] }"#).unwrap();
        assert!(matches!(req.to_command().unwrap_err(), Error::EmptyCommand));
    }

    #[test]
    fn test_malformed_json() {
        let err = SpawnRequest::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request.json");
        fs::write(&path, r#"{ "command": ["true"], "working_dir": "/var" }"#).unwrap();
        let req = SpawnRequest::from_path(&path).unwrap();
        assert_eq!(req.working_dir, "/var");
    }
}
