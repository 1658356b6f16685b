//! Installed-tool detection
//!
//! Runs `--version` against each configured binary. A missing executable marks
//! the tool unavailable; any other failure still proves the binary exists.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::OvsClient;
use crate::error::{OvsError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStatus {
    pub program: String,
    pub available: bool,
    /// First non-empty line of `--version`
    pub version: Option<String>,
    pub error: Option<String>,
}

impl ToolStatus {
    fn from_probe(program: &str, probe: Result<String>) -> Self {
        match probe {
            Ok(stdout) => Self {
                program: program.to_string(),
                available: true,
                version: stdout
                    .lines()
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .map(str::to_string),
                error: None,
            },
            Err(e) => Self {
                program: program.to_string(),
                available: !matches!(e, OvsError::ExecutableNotFound { .. }),
                version: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Runtime-detected OVS tooling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvsCapabilities {
    pub vsctl: ToolStatus,
    pub ofctl: ToolStatus,
    pub dpctl: ToolStatus,
}

impl OvsCapabilities {
    pub async fn detect(client: &OvsClient) -> Self {
        let caps = Self {
            vsctl: ToolStatus::from_probe(client.vsctl.program(), client.vsctl.version().await),
            ofctl: ToolStatus::from_probe(client.ofctl.program(), client.ofctl.version().await),
            dpctl: ToolStatus::from_probe(client.dpctl.program(), client.dpctl.version().await),
        };
        debug!("Detected OVS capabilities: {:?}", caps);
        caps
    }

    pub fn tools(&self) -> [&ToolStatus; 3] {
        [&self.vsctl, &self.ofctl, &self.dpctl]
    }

    pub fn all_available(&self) -> bool {
        self.tools().iter().all(|tool| tool.available)
    }

    /// Human-readable report
    pub fn summary(&self) -> String {
        let mut out = String::from("## OVS Tools\n\n");
        for tool in self.tools() {
            let mark = if tool.available { "✅" } else { "❌" };
            let detail = tool
                .version
                .as_deref()
                .or(tool.error.as_deref())
                .unwrap_or("no output");
            out.push_str(&format!("- {} {}: {}\n", mark, tool.program, detail));
        }
        out
    }
}
