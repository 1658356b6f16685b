//! All three OVS tools behind one handle

use std::sync::Arc;

use crate::capabilities::OvsCapabilities;
use crate::config::OvsConfig;
use crate::dpctl::DpctlClient;
use crate::ofctl::OfctlClient;
use crate::runner::CommandRunner;
use crate::vsctl::VsctlClient;

/// One client per tool, sharing a single runner
#[derive(Clone)]
pub struct OvsClient {
    pub vsctl: VsctlClient,
    pub ofctl: OfctlClient,
    pub dpctl: DpctlClient,
}

impl OvsClient {
    /// Real processes, with the configured programs and timeout
    pub fn new(config: &OvsConfig) -> Self {
        Self::with_runner(config, Arc::new(config.runner()))
    }

    /// Configured programs executed through `runner`
    pub fn with_runner(config: &OvsConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            vsctl: VsctlClient::with_runner(config.vsctl.clone(), runner.clone()),
            ofctl: OfctlClient::with_runner(config.ofctl.clone(), runner.clone()),
            dpctl: DpctlClient::with_runner(config.dpctl.clone(), runner),
        }
    }

    pub async fn capabilities(&self) -> OvsCapabilities {
        OvsCapabilities::detect(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::RecordingRunner;

    #[tokio::test]
    async fn test_programs_come_from_config() {
        let config = OvsConfig {
            vsctl: "/opt/ovs/bin/ovs-vsctl".to_string(),
            ..OvsConfig::default()
        };
        let runner = RecordingRunner::new();
        let client = OvsClient::with_runner(&config, runner.clone());

        assert_eq!(client.vsctl.program(), "/opt/ovs/bin/ovs-vsctl");
        assert_eq!(client.ofctl.program(), "ovs-ofctl");

        client.vsctl.list_bridges().await.unwrap();
        client.dpctl.dump_dps().await.unwrap();
        let programs: Vec<String> = runner.calls().into_iter().map(|c| c.program).collect();
        assert_eq!(programs, vec!["/opt/ovs/bin/ovs-vsctl", "ovs-dpctl"]);
    }
}
