//! OpenFlow switch monitoring and administration through `ovs-ofctl`
//!
//! `switch` arguments accept anything `ovs-ofctl` does: a bridge name, a
//! `unix:` socket or a `tcp:host[:port]` target. Flow strings are passed
//! through untouched.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::OvsConfig;
use crate::error::{OvsError, Result};
use crate::runner::{CommandRunner, ToolBinary};

/// Actions accepted by `ovs-ofctl mod-port`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortAction {
    Up,
    Down,
    Stp,
    NoStp,
    Receive,
    NoReceive,
    ReceiveStp,
    NoReceiveStp,
    Forward,
    NoForward,
    Flood,
    NoFlood,
    PacketIn,
    NoPacketIn,
}

impl PortAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PortAction::Up => "up",
            PortAction::Down => "down",
            PortAction::Stp => "stp",
            PortAction::NoStp => "no-stp",
            PortAction::Receive => "receive",
            PortAction::NoReceive => "no-receive",
            PortAction::ReceiveStp => "receive-stp",
            PortAction::NoReceiveStp => "no-receive-stp",
            PortAction::Forward => "forward",
            PortAction::NoForward => "no-forward",
            PortAction::Flood => "flood",
            PortAction::NoFlood => "no-flood",
            PortAction::PacketIn => "packet-in",
            PortAction::NoPacketIn => "no-packet-in",
        }
    }

    pub const ALL: [PortAction; 14] = [
        PortAction::Up,
        PortAction::Down,
        PortAction::Stp,
        PortAction::NoStp,
        PortAction::Receive,
        PortAction::NoReceive,
        PortAction::ReceiveStp,
        PortAction::NoReceiveStp,
        PortAction::Forward,
        PortAction::NoForward,
        PortAction::Flood,
        PortAction::NoFlood,
        PortAction::PacketIn,
        PortAction::NoPacketIn,
    ];
}

impl fmt::Display for PortAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PortAction {
    type Err = OvsError;

    fn from_str(s: &str) -> Result<Self> {
        PortAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| OvsError::InvalidArgument(format!("unknown mod-port action '{}'", s)))
    }
}

/// Which queues `queue-stats` reports on. A queue can only be named together
/// with its port, so the port-less queue case is unrepresentable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum QueueSelector {
    #[default]
    All,
    Port(String),
    Queue { port: String, queue: String },
}

impl QueueSelector {
    fn to_args(&self) -> Vec<String> {
        match self {
            QueueSelector::All => Vec::new(),
            QueueSelector::Port(port) => vec![port.clone()],
            QueueSelector::Queue { port, queue } => vec![port.clone(), queue.clone()],
        }
    }
}

/// Client for `ovs-ofctl`
#[derive(Clone)]
pub struct OfctlClient {
    bin: ToolBinary,
}

impl OfctlClient {
    pub fn new(config: &OvsConfig) -> Self {
        Self::with_runner(config.ofctl.clone(), Arc::new(config.runner()))
    }

    pub fn with_runner(program: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            bin: ToolBinary::new(program, runner),
        }
    }

    pub fn program(&self) -> &str {
        self.bin.program()
    }

    // ========================================================================
    // Switch management
    // ========================================================================

    /// Features and port descriptions of `switch`
    pub async fn show(&self, switch: &str) -> Result<String> {
        info!("Showing details for {}", switch);
        self.bin.stdout(self.bin.command("show").arg(switch)).await
    }

    /// Status key/value pairs, limited to `key` when given
    pub async fn status(&self, switch: &str, key: Option<&str>) -> Result<String> {
        info!("Printing status for switch {}", switch);
        let cmd = self.bin.command("status").arg(switch).opt_arg(key);
        self.bin.stdout(cmd).await
    }

    pub async fn dump_tables(&self, switch: &str) -> Result<String> {
        info!("Showing table statistics for switch {}", switch);
        self.bin.stdout(self.bin.command("dump-tables").arg(switch)).await
    }

    /// Port statistics, limited to `netdev` when given
    pub async fn dump_ports(&self, switch: &str, netdev: Option<&str>) -> Result<String> {
        info!("Showing port statistics for switch {}", switch);
        let cmd = self.bin.command("dump-ports").arg(switch).opt_arg(netdev);
        self.bin.stdout(cmd).await
    }

    pub async fn mod_port(&self, switch: &str, netdev: &str, action: PortAction) -> Result<()> {
        info!("Modifying device {} on {}: {}", netdev, switch, action);
        let cmd = self
            .bin
            .command("mod-port")
            .arg(switch)
            .arg(netdev)
            .arg(action.as_str());
        self.bin.status(cmd).await
    }

    pub async fn dump_flows(&self, switch: &str, flows: Option<&str>) -> Result<String> {
        info!("Dumping flows for {}", switch);
        let cmd = self.bin.command("dump-flows").arg(switch).opt_arg(flows);
        self.bin.stdout(cmd).await
    }

    pub async fn dump_aggregate(&self, switch: &str, flows: Option<&str>) -> Result<String> {
        info!("Dumping aggregate statistics for {}", switch);
        let cmd = self.bin.command("dump-aggregate").arg(switch).opt_arg(flows);
        self.bin.stdout(cmd).await
    }

    pub async fn queue_stats(&self, switch: &str, selector: &QueueSelector) -> Result<String> {
        info!("Printing queue statistics for {}", switch);
        let cmd = self
            .bin
            .command("queue-stats")
            .arg(switch)
            .args(selector.to_args());
        self.bin.stdout(cmd).await
    }

    // ========================================================================
    // Flow table
    // ========================================================================

    pub async fn add_flow(&self, switch: &str, flow: &str) -> Result<()> {
        info!("Adding flow to {}: {}", switch, flow);
        self.bin
            .status(self.bin.command("add-flow").arg(switch).arg(flow))
            .await
    }

    /// Add every flow listed in `file`, one per line
    pub async fn add_flows(&self, switch: &str, file: &Path) -> Result<()> {
        info!("Adding flows to {} from {}", switch, file.display());
        let cmd = self
            .bin
            .command("add-flows")
            .arg(switch)
            .arg(file.to_string_lossy());
        self.bin.status(cmd).await
    }

    /// Replace the actions of every flow matching `flow`
    pub async fn mod_flows(&self, switch: &str, flow: &str) -> Result<()> {
        info!("Modifying flows on {}: {}", switch, flow);
        self.bin
            .status(self.bin.command("mod-flows").arg(switch).arg(flow))
            .await
    }

    /// Delete flows matching `flow`, or every flow when absent
    pub async fn del_flows(&self, switch: &str, flow: Option<&str>) -> Result<()> {
        info!("Deleting flows on {}", switch);
        self.bin
            .status(self.bin.command("del-flows").arg(switch).opt_arg(flow))
            .await
    }

    /// Streaming OpenFlow trace; not offered by this library
    pub async fn snoop(&self, _switch: &str) -> Result<String> {
        Err(OvsError::NotImplemented("ovs-ofctl snoop"))
    }

    /// Streaming switch monitor; not offered by this library
    pub async fn monitor(&self, _switch: &str, _miss_len: Option<u32>) -> Result<String> {
        Err(OvsError::NotImplemented("ovs-ofctl monitor"))
    }

    // ========================================================================
    // Switch and controller connectivity
    // ========================================================================

    /// Single echo request to `target`
    pub async fn probe(&self, target: &str) -> Result<String> {
        info!("Probing {}", target);
        self.bin.stdout(self.bin.command("probe").arg(target)).await
    }

    /// Ten timed echo requests, each with `packet_size` payload bytes
    pub async fn ping(&self, target: &str, packet_size: Option<u32>) -> Result<String> {
        info!("Pinging {}", target);
        let cmd = self
            .bin
            .command("ping")
            .arg(target)
            .opt_arg(packet_size.map(|n| n.to_string()));
        self.bin.stdout(cmd).await
    }

    pub async fn benchmark(&self, target: &str, packet_size: u32, count: u32) -> Result<String> {
        info!("Benchmarking {} ({} x {} bytes)", target, count, packet_size);
        let cmd = self
            .bin
            .command("benchmark")
            .arg(target)
            .arg(packet_size.to_string())
            .arg(count.to_string());
        self.bin.stdout(cmd).await
    }

    pub async fn version(&self) -> Result<String> {
        self.bin.stdout(self.bin.command("--version")).await
    }
}
