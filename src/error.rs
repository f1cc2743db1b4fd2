//! Error types for PTY spawning

use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

/// Error type for spawn and reap operations
#[derive(Error, Debug)]
pub enum Error {
    /// Allocation failed while marshalling argv/envp
    #[error("Out of memory while marshalling arguments: {0}")]
    ResourceExhausted(#[from] TryReserveError),

    /// A string handed to exec contains a nul byte
    #[error("Entry {index} contains an interior nul byte")]
    InteriorNul { index: usize },

    /// The working directory path contains a nul byte
    #[error("Working directory contains an interior nul byte")]
    InvalidWorkingDir,

    /// The argument vector has no program
    #[error("Command is empty")]
    EmptyCommand,

    /// PTY allocation or fork failed; no child exists
    #[error("Failed to spawn child on PTY: {0}")]
    SpawnFailed(#[source] nix::Error),

    /// waitpid rejected the process identifier
    #[error("Failed to wait for child: {0}")]
    Wait(#[source] nix::Error),

    /// Malformed spawn request
    #[error("Invalid spawn request: {0}")]
    Config(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for PTY spawning
pub type Result<T> = std::result::Result<T, Error>;
