//! End-to-end tests running stand-in OVS binaries through the real process runner

#![cfg(unix)]

use op_ovs::prelude::*;
use op_ovs::OvsCapabilities;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::TempDir;

const FAKE_VSCTL: &str = r#"#!/bin/sh
case "$1" in
    --version) echo "ovs-vsctl (Open vSwitch) 3.1.0" ;;
    list-br) printf 'br0\n\nbr1\n' ;;
    list-ports) echo "ovs-vsctl: no bridge named $2" >&2; exit 1 ;;
    port-to-br) echo br0 ;;
    *) echo "$@" ;;
esac
"#;

const FAKE_OFCTL: &str = r#"#!/bin/sh
echo "$@"
"#;

const HUNG_PID_FILE: &str = "hung.pid";

/// Stand-in binaries shared by every test in this file.
///
/// Scripts are all written before any test spawns a process. Writing an
/// executable while another thread forks can leave a write descriptor open in
/// the child, and exec then fails with "text file busy".
struct FakeInstall {
    dir: TempDir,
    vsctl: PathBuf,
    ofctl: PathBuf,
    hung: PathBuf,
}

static INSTALL: OnceLock<FakeInstall> = OnceLock::new();

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn install() -> &'static FakeInstall {
    INSTALL.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join(HUNG_PID_FILE);
        FakeInstall {
            vsctl: write_script(dir.path(), "ovs-vsctl", FAKE_VSCTL),
            ofctl: write_script(dir.path(), "ovs-ofctl", FAKE_OFCTL),
            hung: write_script(
                dir.path(),
                "ovs-vsctl-hung",
                &format!("#!/bin/sh\necho $$ > {}\nexec sleep 30\n", pid_file.display()),
            ),
            dir,
        }
    })
}

fn fake_config() -> OvsConfig {
    let install = install();
    OvsConfig {
        vsctl: install.vsctl.to_string_lossy().into_owned(),
        ofctl: install.ofctl.to_string_lossy().into_owned(),
        dpctl: install.dir.path().join("ovs-dpctl").to_string_lossy().into_owned(),
        timeout_secs: Some(10.0),
    }
}

#[tokio::test]
async fn test_list_bridges_through_process() {
    let config = fake_config();
    let client = OvsClient::new(&config);

    let bridges = client.vsctl.list_bridges().await.unwrap();
    assert_eq!(bridges, vec!["br0", "br1"]);
    assert_eq!(client.vsctl.port_to_bridge("eth1").await.unwrap(), "br0");
}

#[tokio::test]
async fn test_argv_reaches_the_tool_in_order() {
    let config = fake_config();
    let client = OvsClient::new(&config);

    let echoed = client
        .ofctl
        .queue_stats(
            "br0",
            &QueueSelector::Queue {
                port: "1".to_string(),
                queue: "5".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(echoed.trim(), "queue-stats br0 1 5");

    let echoed = client.ofctl.dump_flows("br0", None).await.unwrap();
    assert_eq!(echoed.trim(), "dump-flows br0");
}

#[tokio::test]
async fn test_tool_failure_carries_stderr() {
    let config = fake_config();
    let client = OvsClient::new(&config);

    match client.vsctl.list_ports("br9").await {
        Err(OvsError::NonZeroExit { code, stderr, .. }) => {
            assert_eq!(code, Some(1));
            assert_eq!(stderr.trim(), "ovs-vsctl: no bridge named br9");
        }
        other => panic!("expected NonZeroExit, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_binary_is_reported() {
    let config = fake_config();
    let client = OvsClient::new(&config);

    let err = client.dpctl.dump_dps().await.unwrap_err();
    assert!(matches!(err, OvsError::ExecutableNotFound { .. }));
    assert!(err.needs_ovs());

    let caps = OvsCapabilities::detect(&client).await;
    assert!(caps.vsctl.available);
    assert_eq!(caps.vsctl.version.as_deref(), Some("ovs-vsctl (Open vSwitch) 3.1.0"));
    assert!(caps.ofctl.available);
    assert!(!caps.dpctl.available);
}

#[tokio::test]
async fn test_timeout_kills_and_reaps_child() {
    let install = install();
    let config = OvsConfig {
        vsctl: install.hung.to_string_lossy().into_owned(),
        ..fake_config()
    }
    .with_timeout(Duration::from_millis(500));
    let client = OvsClient::new(&config);

    let err = client.vsctl.list_bridges().await.unwrap_err();
    assert!(matches!(err, OvsError::Timeout { .. }));

    let pid = fs::read_to_string(install.dir.path().join(HUNG_PID_FILE)).unwrap();
    let proc_entry = PathBuf::from(format!("/proc/{}", pid.trim()));
    if Path::new("/proc/self").exists() {
        assert!(!proc_entry.exists(), "child {} was not reaped", pid.trim());
    }
}

#[tokio::test]
async fn test_not_implemented_operations() {
    let config = fake_config();
    let client = OvsClient::new(&config);

    assert!(matches!(
        client.ofctl.snoop("br0").await,
        Err(OvsError::NotImplemented(_))
    ));
    assert!(matches!(
        client.ofctl.monitor("br0", None).await,
        Err(OvsError::NotImplemented(_))
    ));
}
