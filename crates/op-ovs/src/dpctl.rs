//! Kernel datapath management through `ovs-dpctl`

use std::sync::Arc;
use tracing::info;

use crate::config::OvsConfig;
use crate::error::{OvsError, Result};
use crate::runner::{CommandRunner, ToolBinary};

/// A network device to attach to a datapath.
///
/// Serialized the way `ovs-dpctl add-if` expects: `NETDEV[,type=TYPE][,KEY=VALUE...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpec {
    pub datapath: String,
    pub netdev: String,
    /// Vport type such as `internal`, `gre` or `vxlan`
    pub if_type: Option<String>,
    /// Extra `key=value` options, kept in insertion order
    pub options: Vec<(String, String)>,
}

impl InterfaceSpec {
    pub fn new(datapath: impl Into<String>, netdev: impl Into<String>) -> Self {
        Self {
            datapath: datapath.into(),
            netdev: netdev.into(),
            if_type: None,
            options: Vec::new(),
        }
    }

    pub fn with_type(mut self, if_type: impl Into<String>) -> Self {
        self.if_type = Some(if_type.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    fn netdev_arg(&self) -> String {
        let mut arg = self.netdev.clone();
        if let Some(if_type) = &self.if_type {
            arg.push_str(",type=");
            arg.push_str(if_type);
        }
        for (key, value) in &self.options {
            arg.push(',');
            arg.push_str(key);
            arg.push('=');
            arg.push_str(value);
        }
        arg
    }
}

/// Client for `ovs-dpctl`
#[derive(Clone)]
pub struct DpctlClient {
    bin: ToolBinary,
}

impl DpctlClient {
    pub fn new(config: &OvsConfig) -> Self {
        Self::with_runner(config.dpctl.clone(), Arc::new(config.runner()))
    }

    pub fn with_runner(program: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            bin: ToolBinary::new(program, runner),
        }
    }

    pub fn program(&self) -> &str {
        self.bin.program()
    }

    /// Create `datapath`, optionally attaching `netdevs` right away
    pub async fn add_dp(&self, datapath: &str, netdevs: &[&str]) -> Result<()> {
        info!("Creating datapath: {}", datapath);
        let cmd = self
            .bin
            .command("add-dp")
            .arg(datapath)
            .args(netdevs.iter().copied());
        self.bin.status(cmd).await?;
        info!("Datapath {} created", datapath);
        Ok(())
    }

    pub async fn del_dp(&self, datapath: &str) -> Result<()> {
        info!("Deleting datapath: {}", datapath);
        self.bin
            .status(self.bin.command("del-dp").arg(datapath))
            .await
    }

    pub async fn add_if(&self, spec: &InterfaceSpec) -> Result<()> {
        info!("Adding interface {} to {}", spec.netdev, spec.datapath);
        let cmd = self
            .bin
            .command("add-if")
            .arg(spec.datapath.as_str())
            .arg(spec.netdev_arg());
        self.bin.status(cmd).await
    }

    /// Detach `netdevs` from `datapath` in a single `del-if` call
    pub async fn del_if(&self, datapath: &str, netdevs: &[&str]) -> Result<()> {
        if netdevs.is_empty() {
            return Err(OvsError::InvalidArgument(
                "del-if needs at least one network device".to_string(),
            ));
        }
        info!("Deleting interface(s) {:?} from {}", netdevs, datapath);
        let cmd = self
            .bin
            .command("del-if")
            .arg(datapath)
            .args(netdevs.iter().copied());
        self.bin.status(cmd).await
    }

    /// Names of all datapaths
    pub async fn dump_dps(&self) -> Result<Vec<String>> {
        info!("Dumping datapaths");
        self.bin.lines(self.bin.command("dump-dps")).await
    }

    /// Summary of `datapath`, or of every datapath when absent
    pub async fn show(&self, datapath: Option<&str>) -> Result<String> {
        self.bin
            .stdout(self.bin.command("show").opt_arg(datapath))
            .await
    }

    pub async fn dump_flows(&self, datapath: Option<&str>) -> Result<String> {
        info!("Dumping flows for {}", datapath.unwrap_or("default datapath"));
        self.bin
            .stdout(self.bin.command("dump-flows").opt_arg(datapath))
            .await
    }

    pub async fn del_flows(&self, datapath: Option<&str>) -> Result<()> {
        info!("Deleting flows from {}", datapath.unwrap_or("default datapath"));
        self.bin
            .status(self.bin.command("del-flows").opt_arg(datapath))
            .await
    }

    pub async fn version(&self) -> Result<String> {
        self.bin.stdout(self.bin.command("--version")).await
    }
}
