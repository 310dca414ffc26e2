//! Error types shared by the sampler, the stop controller and the CLI.

use std::path::PathBuf;
use thiserror::Error;

/// Metric a provider call was trying to read when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Cpu,
    Memory,
    DiskUsage,
    DiskIo,
    NetIo,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Cpu => write!(f, "cpu"),
            Field::Memory => write!(f, "memory"),
            Field::DiskUsage => write!(f, "disk usage"),
            Field::DiskIo => write!(f, "disk I/O counters"),
            Field::NetIo => write!(f, "network I/O counters"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MonitorError {
    /// No positional arguments at all; the caller prints usage.
    #[error("no arguments given")]
    MissingArguments,

    /// Bad command line; nothing has been written yet.
    #[error("{0}")]
    Config(String),

    /// The metrics provider could not produce a value.
    #[error("failed to read {field}: {source}")]
    Provider {
        field: Field,
        #[source]
        source: anyhow::Error,
    },

    /// The manual stop strategy could not start its input reader.
    #[error("failed to start the stop input reader: {0}")]
    StopInput(#[source] std::io::Error),

    /// The output log could not be opened or appended to.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MonitorError {
    pub fn provider(field: Field, source: impl Into<anyhow::Error>) -> Self {
        MonitorError::Provider {
            field,
            source: source.into(),
        }
    }
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
