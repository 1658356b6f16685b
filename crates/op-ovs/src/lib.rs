//! op-ovs: Open vSwitch administration through the OVS command-line tools
//!
//! This crate provides:
//! - A uniform command runner with exit-code checking and optional timeouts
//! - `ovs-vsctl` bridge and port management
//! - `ovs-ofctl` OpenFlow switch management
//! - `ovs-dpctl` kernel datapath management
//! - Installed-tool detection
//!
//! Output is relayed as text; nothing here parses OpenFlow or OVSDB.

pub mod capabilities;
pub mod client;
pub mod config;
pub mod dpctl;
pub mod error;
pub mod ofctl;
pub mod runner;
pub mod vsctl;

pub use capabilities::{OvsCapabilities, ToolStatus};
pub use client::OvsClient;
pub use config::OvsConfig;
pub use dpctl::{DpctlClient, InterfaceSpec};
pub use error::{OvsError, Result};
pub use ofctl::{OfctlClient, PortAction, QueueSelector};
pub use runner::{CommandInvocation, CommandOutput, CommandRunner, ProcessRunner};
pub use vsctl::{PortSpec, VsctlClient};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::client::OvsClient;
    pub use super::config::OvsConfig;
    pub use super::dpctl::InterfaceSpec;
    pub use super::error::{OvsError, Result};
    pub use super::ofctl::{PortAction, QueueSelector};
    pub use super::vsctl::PortSpec;
}
