//! Subcommand definitions and dispatch onto the op-ovs clients

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use std::path::PathBuf;

use op_ovs::{InterfaceSpec, OvsCapabilities, OvsClient, PortAction, PortSpec, QueueSelector};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bridge and port management (ovs-vsctl)
    #[command(subcommand)]
    Vsctl(VsctlCommand),

    /// OpenFlow switch management (ovs-ofctl)
    #[command(subcommand)]
    Ofctl(OfctlCommand),

    /// Kernel datapath management (ovs-dpctl)
    #[command(subcommand)]
    Dpctl(DpctlCommand),

    /// Report which OVS tools are installed
    Capabilities,
}

#[derive(Subcommand, Debug)]
pub enum VsctlCommand {
    /// List all bridges
    ListBr,
    /// Create a bridge (no error if it exists)
    AddBr { bridge: String },
    /// Delete a bridge (no error if it is absent)
    DelBr { bridge: String },
    /// Test whether a bridge exists
    BrExists { bridge: String },
    /// Print the VLAN of a fake bridge
    BrToVlan { bridge: String },
    /// Print the parent of a fake bridge
    BrToParent { bridge: String },
    /// List ports on a bridge
    ListPorts { bridge: String },
    /// Add a port to a bridge
    AddPort {
        bridge: String,
        port: String,
        /// Access VLAN tag
        #[arg(long)]
        tag: Option<u16>,
    },
    /// Delete a port
    DelPort {
        port: String,
        /// Only delete it from this bridge
        #[arg(long)]
        bridge: Option<String>,
    },
    /// Print the bridge a port belongs to
    PortToBr { port: String },
    /// Overview of the OVS database
    Show,
}

#[derive(Subcommand, Debug)]
pub enum OfctlCommand {
    /// Switch features and ports
    Show { switch: String },
    /// Switch status key/value pairs
    Status { switch: String, key: Option<String> },
    /// Flow table statistics
    DumpTables { switch: String },
    /// Port statistics
    DumpPorts { switch: String, netdev: Option<String> },
    /// Change port behaviour (up, down, no-flood, ...)
    ModPort {
        switch: String,
        netdev: String,
        action: PortAction,
    },
    /// Print flows, optionally only those matching FLOWS
    DumpFlows { switch: String, flows: Option<String> },
    /// Aggregate flow statistics
    DumpAggregate { switch: String, flows: Option<String> },
    /// Queue statistics
    QueueStats {
        switch: String,
        port: Option<String>,
        #[arg(requires = "port")]
        queue: Option<String>,
    },
    /// Add one flow
    AddFlow { switch: String, flow: String },
    /// Add flows listed in a file
    AddFlows { switch: String, file: PathBuf },
    /// Modify actions of matching flows
    ModFlows { switch: String, flow: String },
    /// Delete matching flows, or all flows
    DelFlows { switch: String, flow: Option<String> },
    /// Not supported
    Snoop { switch: String },
    /// Not supported
    Monitor {
        switch: String,
        miss_len: Option<u32>,
    },
    /// Send one echo request
    Probe { target: String },
    /// Time ten echo requests
    Ping {
        target: String,
        packet_size: Option<u32>,
    },
    /// Time COUNT echo requests of SIZE payload bytes
    Benchmark {
        target: String,
        packet_size: u32,
        count: u32,
    },
}

#[derive(Subcommand, Debug)]
pub enum DpctlCommand {
    /// Create a datapath
    AddDp { datapath: String, netdevs: Vec<String> },
    /// Delete a datapath
    DelDp { datapath: String },
    /// Attach a network device
    AddIf {
        datapath: String,
        netdev: String,
        /// Vport type (internal, gre, vxlan, ...)
        #[arg(long = "type")]
        if_type: Option<String>,
        /// Extra KEY=VALUE option, repeatable
        #[arg(long = "option", value_parser = parse_key_val)]
        options: Vec<(String, String)>,
    },
    /// Detach network devices
    DelIf {
        datapath: String,
        #[arg(required = true)]
        netdevs: Vec<String>,
    },
    /// List datapaths
    DumpDps,
    /// Summarize datapaths
    Show { datapath: Option<String> },
    /// Print datapath flows
    DumpFlows { datapath: Option<String> },
    /// Delete datapath flows
    DelFlows { datapath: Option<String> },
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

/// What an operation produced, ready for printing
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Output {
    Text(String),
    Lines(Vec<String>),
    Flag(bool),
    Capabilities(OvsCapabilities),
    Done,
}

impl From<String> for Output {
    fn from(text: String) -> Self {
        Output::Text(text)
    }
}

impl From<Vec<String>> for Output {
    fn from(lines: Vec<String>) -> Self {
        Output::Lines(lines)
    }
}

impl From<bool> for Output {
    fn from(flag: bool) -> Self {
        Output::Flag(flag)
    }
}

impl From<()> for Output {
    fn from(_: ()) -> Self {
        Output::Done
    }
}

impl Output {
    pub fn print(&self, json: bool) -> Result<()> {
        if json {
            let value = match self {
                Output::Done => serde_json::json!({ "success": true }),
                other => serde_json::to_value(other)?,
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }

        match self {
            Output::Text(text) => print!("{}", text),
            Output::Lines(lines) => {
                for line in lines {
                    println!("{}", line);
                }
            }
            Output::Flag(flag) => println!("{}", flag),
            Output::Capabilities(caps) => print!("{}", caps.summary()),
            Output::Done => {}
        }
        Ok(())
    }
}

pub async fn dispatch(client: &OvsClient, command: Commands) -> op_ovs::Result<Output> {
    match command {
        Commands::Vsctl(cmd) => vsctl(client, cmd).await,
        Commands::Ofctl(cmd) => ofctl(client, cmd).await,
        Commands::Dpctl(cmd) => dpctl(client, cmd).await,
        Commands::Capabilities => Ok(Output::Capabilities(client.capabilities().await)),
    }
}

async fn vsctl(client: &OvsClient, command: VsctlCommand) -> op_ovs::Result<Output> {
    let vsctl = &client.vsctl;
    Ok(match command {
        VsctlCommand::ListBr => vsctl.list_bridges().await?.into(),
        VsctlCommand::AddBr { bridge } => vsctl.add_bridge(&bridge).await?.into(),
        VsctlCommand::DelBr { bridge } => vsctl.delete_bridge(&bridge).await?.into(),
        VsctlCommand::BrExists { bridge } => vsctl.bridge_exists(&bridge).await?.into(),
        VsctlCommand::BrToVlan { bridge } => vsctl.bridge_to_vlan(&bridge).await?.into(),
        VsctlCommand::BrToParent { bridge } => vsctl.bridge_to_parent(&bridge).await?.into(),
        VsctlCommand::ListPorts { bridge } => vsctl.list_ports(&bridge).await?.into(),
        VsctlCommand::AddPort { bridge, port, tag } => {
            let mut spec = PortSpec::new(bridge, port);
            spec.tag = tag;
            vsctl.add_port(&spec).await?.into()
        }
        VsctlCommand::DelPort { port, bridge } => {
            vsctl.delete_port(&port, bridge.as_deref()).await?.into()
        }
        VsctlCommand::PortToBr { port } => vsctl.port_to_bridge(&port).await?.into(),
        VsctlCommand::Show => vsctl.show().await?.into(),
    })
}

async fn ofctl(client: &OvsClient, command: OfctlCommand) -> op_ovs::Result<Output> {
    let ofctl = &client.ofctl;
    Ok(match command {
        OfctlCommand::Show { switch } => ofctl.show(&switch).await?.into(),
        OfctlCommand::Status { switch, key } => ofctl.status(&switch, key.as_deref()).await?.into(),
        OfctlCommand::DumpTables { switch } => ofctl.dump_tables(&switch).await?.into(),
        OfctlCommand::DumpPorts { switch, netdev } => {
            ofctl.dump_ports(&switch, netdev.as_deref()).await?.into()
        }
        OfctlCommand::ModPort {
            switch,
            netdev,
            action,
        } => ofctl.mod_port(&switch, &netdev, action).await?.into(),
        OfctlCommand::DumpFlows { switch, flows } => {
            ofctl.dump_flows(&switch, flows.as_deref()).await?.into()
        }
        OfctlCommand::DumpAggregate { switch, flows } => {
            ofctl.dump_aggregate(&switch, flows.as_deref()).await?.into()
        }
        OfctlCommand::QueueStats {
            switch,
            port,
            queue,
        } => {
            let selector = match (port, queue) {
                (Some(port), Some(queue)) => QueueSelector::Queue { port, queue },
                (Some(port), None) => QueueSelector::Port(port),
                _ => QueueSelector::All,
            };
            ofctl.queue_stats(&switch, &selector).await?.into()
        }
        OfctlCommand::AddFlow { switch, flow } => ofctl.add_flow(&switch, &flow).await?.into(),
        OfctlCommand::AddFlows { switch, file } => ofctl.add_flows(&switch, &file).await?.into(),
        OfctlCommand::ModFlows { switch, flow } => ofctl.mod_flows(&switch, &flow).await?.into(),
        OfctlCommand::DelFlows { switch, flow } => {
            ofctl.del_flows(&switch, flow.as_deref()).await?.into()
        }
        OfctlCommand::Snoop { switch } => ofctl.snoop(&switch).await?.into(),
        OfctlCommand::Monitor { switch, miss_len } => {
            ofctl.monitor(&switch, miss_len).await?.into()
        }
        OfctlCommand::Probe { target } => ofctl.probe(&target).await?.into(),
        OfctlCommand::Ping {
            target,
            packet_size,
        } => ofctl.ping(&target, packet_size).await?.into(),
        OfctlCommand::Benchmark {
            target,
            packet_size,
            count,
        } => ofctl.benchmark(&target, packet_size, count).await?.into(),
    })
}

async fn dpctl(client: &OvsClient, command: DpctlCommand) -> op_ovs::Result<Output> {
    let dpctl = &client.dpctl;
    Ok(match command {
        DpctlCommand::AddDp { datapath, netdevs } => {
            let netdevs: Vec<&str> = netdevs.iter().map(String::as_str).collect();
            dpctl.add_dp(&datapath, &netdevs).await?.into()
        }
        DpctlCommand::DelDp { datapath } => dpctl.del_dp(&datapath).await?.into(),
        DpctlCommand::AddIf {
            datapath,
            netdev,
            if_type,
            options,
        } => {
            let spec = InterfaceSpec {
                datapath,
                netdev,
                if_type,
                options,
            };
            dpctl.add_if(&spec).await?.into()
        }
        DpctlCommand::DelIf { datapath, netdevs } => {
            let netdevs: Vec<&str> = netdevs.iter().map(String::as_str).collect();
            dpctl.del_if(&datapath, &netdevs).await?.into()
        }
        DpctlCommand::DumpDps => dpctl.dump_dps().await?.into(),
        DpctlCommand::Show { datapath } => dpctl.show(datapath.as_deref()).await?.into(),
        DpctlCommand::DumpFlows { datapath } => dpctl.dump_flows(datapath.as_deref()).await?.into(),
        DpctlCommand::DelFlows { datapath } => dpctl.del_flows(datapath.as_deref()).await?.into(),
    })
}
