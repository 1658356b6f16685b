//! Error types for OVS command invocations
//!
//! Every library operation returns [`OvsError`] instead of a boolean or an
//! aborted process, so callers can tell a missing binary apart from a tool that
//! ran and reported failure.

use std::time::Duration;
use thiserror::Error;

/// OVS command errors
#[derive(Error, Debug)]
pub enum OvsError {
    // ========================================================================
    // Process Errors
    // ========================================================================
    #[error("Executable '{program}' not found - is Open vSwitch installed?")]
    ExecutableNotFound { program: String },

    #[error("{program} exited with {}: {}", exit_label(.code), .stderr.trim())]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{program} did not finish within {}s and was killed", .timeout.as_secs_f64())]
    Timeout { program: String, timeout: Duration },

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    // ========================================================================
    // Caller Errors
    // ========================================================================
    #[error("Operation not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using [`OvsError`]
pub type Result<T> = std::result::Result<T, OvsError>;

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

impl OvsError {
    /// Get a helpful suggestion for resolving this error
    pub fn suggestion(&self) -> &'static str {
        match self {
            OvsError::ExecutableNotFound { .. } => {
                "Install Open vSwitch (apt install openvswitch-switch) or point OP_OVS_* at the binaries"
            }
            OvsError::NonZeroExit { .. } => "Inspect the tool's stderr; ovs-vswitchd may not be running",
            OvsError::Timeout { .. } => "Increase the timeout or check whether ovsdb-server is responsive",
            OvsError::NotImplemented(_) => "Run the ovs-ofctl command interactively instead",
            OvsError::Config(_) => "Check the configuration file and OP_OVS_* environment variables",
            _ => "Check system logs for more details",
        }
    }

    /// Returns true if OVS binaries need to be installed or configured
    pub fn needs_ovs(&self) -> bool {
        matches!(self, OvsError::ExecutableNotFound { .. })
    }

    /// Captured stderr of a failed tool run
    pub fn stderr(&self) -> Option<&str> {
        match self {
            OvsError::NonZeroExit { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}
