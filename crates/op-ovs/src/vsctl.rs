//! Bridge and port management through `ovs-vsctl`
//!
//! Mutating calls use `--may-exist` / `--if-exists` so that repeating them is
//! not an error, matching what `ovs-vsctl` documents for idempotent scripts.

use std::sync::Arc;
use tracing::info;

use crate::config::OvsConfig;
use crate::error::{OvsError, Result};
use crate::runner::{CommandInvocation, CommandRunner, ToolBinary};

/// Exit status `ovs-vsctl br-exists` uses for "no such bridge"
const BR_EXISTS_MISSING: i32 = 2;

/// A port to attach to a bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    pub bridge: String,
    pub port: String,
    /// Access VLAN; written as `tag=N` after the port name
    pub tag: Option<u16>,
}

impl PortSpec {
    pub fn new(bridge: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            bridge: bridge.into(),
            port: port.into(),
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: u16) -> Self {
        self.tag = Some(tag);
        self
    }

    fn to_args(&self) -> Vec<String> {
        let mut args = vec![self.bridge.clone(), self.port.clone()];
        if let Some(tag) = self.tag {
            args.push(format!("tag={}", tag));
        }
        args
    }
}

/// Client for `ovs-vsctl`
#[derive(Clone)]
pub struct VsctlClient {
    bin: ToolBinary,
}

impl VsctlClient {
    pub fn new(config: &OvsConfig) -> Self {
        Self::with_runner(config.vsctl.clone(), Arc::new(config.runner()))
    }

    pub fn with_runner(program: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            bin: ToolBinary::new(program, runner),
        }
    }

    pub fn program(&self) -> &str {
        self.bin.program()
    }

    // --may-exist / --if-exists are global options and must precede the subcommand
    fn may_exist(&self, subcommand: &str) -> CommandInvocation {
        self.bin.command("--may-exist").arg(subcommand)
    }

    fn if_exists(&self, subcommand: &str) -> CommandInvocation {
        self.bin.command("--if-exists").arg(subcommand)
    }

    // ========================================================================
    // Bridges
    // ========================================================================

    /// Names of all configured bridges
    pub async fn list_bridges(&self) -> Result<Vec<String>> {
        info!("Getting all bridges");
        self.bin.lines(self.bin.command("list-br")).await
    }

    pub async fn add_bridge(&self, bridge: &str) -> Result<()> {
        info!("Adding bridge: {}", bridge);
        let cmd = self.may_exist("add-br").arg(bridge);
        self.bin.status(cmd).await?;
        info!("Bridge {} added", bridge);
        Ok(())
    }

    pub async fn delete_bridge(&self, bridge: &str) -> Result<()> {
        info!("Deleting bridge: {}", bridge);
        let cmd = self.if_exists("del-br").arg(bridge);
        self.bin.status(cmd).await?;
        info!("Bridge {} deleted", bridge);
        Ok(())
    }

    /// `br-exists`: exit 0 means present, exit 2 means absent
    pub async fn bridge_exists(&self, bridge: &str) -> Result<bool> {
        match self.bin.status(self.bin.command("br-exists").arg(bridge)).await {
            Ok(()) => Ok(true),
            Err(OvsError::NonZeroExit {
                code: Some(BR_EXISTS_MISSING),
                ..
            }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// VLAN of a fake bridge, `0` for a real one
    pub async fn bridge_to_vlan(&self, bridge: &str) -> Result<String> {
        self.bin.trimmed(self.bin.command("br-to-vlan").arg(bridge)).await
    }

    /// Parent of a fake bridge, the bridge itself for a real one
    pub async fn bridge_to_parent(&self, bridge: &str) -> Result<String> {
        self.bin.trimmed(self.bin.command("br-to-parent").arg(bridge)).await
    }

    // ========================================================================
    // Ports
    // ========================================================================

    pub async fn list_ports(&self, bridge: &str) -> Result<Vec<String>> {
        info!("Listing ports on {}", bridge);
        self.bin.lines(self.bin.command("list-ports").arg(bridge)).await
    }

    pub async fn add_port(&self, spec: &PortSpec) -> Result<()> {
        info!("Adding port {} on {}", spec.port, spec.bridge);
        let cmd = self.may_exist("add-port").args(spec.to_args());
        self.bin.status(cmd).await
    }

    /// Delete `port` from `bridge`, or from whichever bridge holds it
    pub async fn delete_port(&self, port: &str, bridge: Option<&str>) -> Result<()> {
        info!("Deleting port: {}", port);
        let cmd = self.if_exists("del-port").opt_arg(bridge).arg(port);
        self.bin.status(cmd).await
    }

    /// Bridge that contains `port`
    pub async fn port_to_bridge(&self, port: &str) -> Result<String> {
        self.bin.trimmed(self.bin.command("port-to-br").arg(port)).await
    }

    // ========================================================================
    // Misc
    // ========================================================================

    /// Overview of the whole database
    pub async fn show(&self) -> Result<String> {
        self.bin.stdout(self.bin.command("show")).await
    }

    pub async fn version(&self) -> Result<String> {
        self.bin.stdout(self.bin.command("--version")).await
    }
}
