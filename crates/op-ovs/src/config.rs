//! Binary locations and execution limits
//!
//! [`OvsConfig`] replaces hard-coded program names: every client is built from
//! one, so tests and unusual installs can point at other executables.
//!
//! Precedence, lowest first:
//! 1. [`OvsConfig::default`] (`ovs-vsctl`, `ovs-ofctl`, `ovs-dpctl`, no timeout)
//! 2. a TOML file ([`OvsConfig::from_file`])
//! 3. `OP_OVS_*` environment variables ([`OvsConfig::apply_env`])
//!
//! The environment file loader lets the CLI pick up `/etc/op-ovs/environment`
//! before reading the variables.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{OvsError, Result};
use crate::runner::ProcessRunner;

/// Default path for the environment file
pub const DEFAULT_ENV_FILE: &str = "/etc/op-ovs/environment";

pub const ENV_VSCTL: &str = "OP_OVS_VSCTL";
pub const ENV_OFCTL: &str = "OP_OVS_OFCTL";
pub const ENV_DPCTL: &str = "OP_OVS_DPCTL";
pub const ENV_TIMEOUT_SECS: &str = "OP_OVS_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OvsConfig {
    /// Program used for bridge and port management
    pub vsctl: String,
    /// Program used for OpenFlow switch management
    pub ofctl: String,
    /// Program used for kernel datapath management
    pub dpctl: String,
    /// Kill a tool that runs longer than this; unset waits forever
    pub timeout_secs: Option<f64>,
}

impl Default for OvsConfig {
    fn default() -> Self {
        Self {
            vsctl: "ovs-vsctl".to_string(),
            ofctl: "ovs-ofctl".to_string(),
            dpctl: "ovs-dpctl".to_string(),
            timeout_secs: None,
        }
    }
}

impl OvsConfig {
    /// Defaults overridden by `OP_OVS_*` variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| OvsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| OvsError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded OVS configuration from {}", path.display());
        Ok(config)
    }

    /// Override fields from `OP_OVS_*` variables that are set and non-empty
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = get_config_opt(ENV_VSCTL) {
            self.vsctl = v;
        }
        if let Some(v) = get_config_opt(ENV_OFCTL) {
            self.ofctl = v;
        }
        if let Some(v) = get_config_opt(ENV_DPCTL) {
            self.dpctl = v;
        }
        if let Some(v) = get_config_opt(ENV_TIMEOUT_SECS) {
            let secs = v.parse::<f64>().map_err(|_| {
                OvsError::Config(format!("{} must be a number of seconds, got '{}'", ENV_TIMEOUT_SECS, v))
            })?;
            self.timeout_secs = Some(secs);
        }
        self.validate()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs_f64());
        self
    }

    /// Configured timeout; a value that is not a valid duration counts as unset
    pub fn timeout(&self) -> Option<Duration> {
        let secs = self.timeout_secs?;
        match Duration::try_from_secs_f64(secs) {
            Ok(timeout) => Some(timeout),
            Err(e) => {
                warn!("Ignoring timeout_secs {}: {}", secs, e);
                None
            }
        }
    }

    /// Process runner honouring the configured timeout
    pub fn runner(&self) -> ProcessRunner {
        match self.timeout() {
            Some(timeout) => ProcessRunner::with_timeout(timeout),
            None => ProcessRunner::new(),
        }
    }

    fn validate(&self) -> Result<()> {
        for (key, value) in [("vsctl", &self.vsctl), ("ofctl", &self.ofctl), ("dpctl", &self.dpctl)] {
            if value.trim().is_empty() {
                return Err(OvsError::Config(format!("{} program must not be empty", key)));
            }
        }
        if let Some(secs) = self.timeout_secs {
            let timeout = Duration::try_from_secs_f64(secs)
                .map_err(|e| OvsError::Config(format!("timeout_secs {}: {}", secs, e)))?;
            if timeout.is_zero() {
                return Err(OvsError::Config(format!(
                    "timeout_secs must be positive, got {}",
                    secs
                )));
            }
        }
        Ok(())
    }
}

/// Get an optional configuration value.
pub fn get_config_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Load variables from the environment file.
///
/// Checks `OP_OVS_ENV_FILE` first, then [`DEFAULT_ENV_FILE`]. Variables that
/// are already set are never overridden. Returns the path that was loaded.
pub fn load_environment() -> Option<String> {
    let candidates = get_config_opt("OP_OVS_ENV_FILE")
        .into_iter()
        .chain(std::iter::once(DEFAULT_ENV_FILE.to_string()));

    for path in candidates {
        if let Some(loaded) = try_load_env_file(&path) {
            return Some(loaded);
        }
    }

    debug!("No environment file found, using existing environment");
    None
}

fn try_load_env_file(path: &str) -> Option<String> {
    if !Path::new(path).exists() {
        return None;
    }

    match fs::read_to_string(path) {
        Ok(content) => {
            let mut loaded = 0;
            for (key, value) in content.lines().filter_map(parse_env_line) {
                if std::env::var(&key).is_err() {
                    std::env::set_var(&key, &value);
                    loaded += 1;
                } else {
                    debug!("Skipped (already set): {}", key);
                }
            }
            info!("Loaded {} environment variables from {}", loaded, path);
            Some(path.to_string())
        }
        Err(e) => {
            warn!("Failed to read environment file {}: {}", path, e);
            None
        }
    }
}

/// Parse `KEY=VALUE`, `KEY="VALUE"` or `KEY='VALUE'`; comments and blanks yield None
fn parse_env_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() {
        return None;
    }

    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Some((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OvsConfig::default();
        assert_eq!(config.vsctl, "ovs-vsctl");
        assert_eq!(config.ofctl, "ovs-ofctl");
        assert_eq!(config.dpctl, "ovs-dpctl");
        assert!(config.timeout().is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = OvsConfig::from_toml_str(
            r#"
            vsctl = "/usr/local/bin/ovs-vsctl"
            timeout_secs = 2.5
            "#,
        )
        .unwrap();
        assert_eq!(config.vsctl, "/usr/local/bin/ovs-vsctl");
        assert_eq!(config.ofctl, "ovs-ofctl");
        assert_eq!(config.timeout(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            OvsConfig::from_toml_str("timeout_secs = 0"),
            Err(OvsError::Config(_))
        ));
        assert!(matches!(
            OvsConfig::from_toml_str("dpctl = \"\""),
            Err(OvsError::Config(_))
        ));
        assert!(matches!(
            OvsConfig::from_toml_str("vsctl = 3"),
            Err(OvsError::Config(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ovs.toml");
        fs::write(&path, "ofctl = \"/opt/ovs/bin/ovs-ofctl\"\n").unwrap();
        let config = OvsConfig::from_file(&path).unwrap();
        assert_eq!(config.ofctl, "/opt/ovs/bin/ovs-ofctl");

        let missing = OvsConfig::from_file(dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(OvsError::Config(_))));
    }

    #[test]
    fn test_with_timeout() {
        let config = OvsConfig::default().with_timeout(Duration::from_secs(3));
        assert_eq!(config.timeout_secs, Some(3.0));
        assert_eq!(config.runner().timeout(), Some(Duration::from_secs(3)));
        assert_eq!(OvsConfig::default().runner().timeout(), None);
    }

    #[test]
    fn test_parse_env_line() {
        assert_eq!(
            parse_env_line("OP_OVS_VSCTL=/usr/bin/ovs-vsctl"),
            Some(("OP_OVS_VSCTL".to_string(), "/usr/bin/ovs-vsctl".to_string()))
        );
        assert_eq!(
            parse_env_line("OP_OVS_TIMEOUT_SECS=\"5\""),
            Some(("OP_OVS_TIMEOUT_SECS".to_string(), "5".to_string()))
        );
        assert_eq!(
            parse_env_line("  KEY='a b'  "),
            Some(("KEY".to_string(), "a b".to_string()))
        );
        assert_eq!(parse_env_line("# comment"), None);
        assert_eq!(parse_env_line(""), None);
        assert_eq!(parse_env_line("=value"), None);
        assert_eq!(parse_env_line("no_equals"), None);
    }

    #[test]
    fn test_oversized_timeout_is_a_config_error() {
        for doc in ["timeout_secs = 1e20", "timeout_secs = -1.0", "timeout_secs = nan"] {
            assert!(
                matches!(OvsConfig::from_toml_str(doc), Err(OvsError::Config(_))),
                "{} was accepted",
                doc
            );
        }

        // Fields set directly skip validation but must not take the runner down
        let config = OvsConfig {
            timeout_secs: Some(1e20),
            ..OvsConfig::default()
        };
        assert_eq!(config.timeout(), None);
        assert_eq!(config.runner().timeout(), None);
    }

    // Tests below touch process-wide OP_OVS_* variables
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        let result = f();
        for (key, _) in vars {
            std::env::remove_var(key);
        }
        result
    }

    #[test]
    fn test_env_overrides_toml() {
        let config = with_env(
            &[
                (ENV_OFCTL, "/opt/ovs/bin/ovs-ofctl"),
                (ENV_TIMEOUT_SECS, "7"),
                (ENV_DPCTL, ""),
            ],
            || {
                let mut config = OvsConfig::from_toml_str(
                    r#"
                    vsctl = "/usr/local/bin/ovs-vsctl"
                    ofctl = "/usr/local/bin/ovs-ofctl"
                    timeout_secs = 2.0
                    "#,
                )
                .unwrap();
                config.apply_env().unwrap();
                config
            },
        );

        assert_eq!(config.vsctl, "/usr/local/bin/ovs-vsctl");
        assert_eq!(config.ofctl, "/opt/ovs/bin/ovs-ofctl");
        // Empty variables are treated as unset
        assert_eq!(config.dpctl, "ovs-dpctl");
        assert_eq!(config.timeout(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_from_env() {
        let config = with_env(&[(ENV_VSCTL, "/sbin/ovs-vsctl")], OvsConfig::from_env).unwrap();
        assert_eq!(config.vsctl, "/sbin/ovs-vsctl");
        assert_eq!(config.ofctl, "ovs-ofctl");
        assert!(config.timeout().is_none());
    }

    #[test]
    fn test_bad_env_timeout_is_a_config_error() {
        for value in ["soon", "0", "1e20"] {
            let result = with_env(&[(ENV_TIMEOUT_SECS, value)], OvsConfig::from_env);
            assert!(
                matches!(result, Err(OvsError::Config(_))),
                "{}={} was accepted",
                ENV_TIMEOUT_SECS,
                value
            );
        }
    }

    #[test]
    fn test_env_file_keeps_existing_variables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("environment");
        fs::write(
            &path,
            "# op-ovs\nOP_OVS_TEST_PRESET=from_file\nOP_OVS_TEST_FRESH=\"loaded\"\n",
        )
        .unwrap();
        let path = path.to_string_lossy().into_owned();

        let (loaded, preset, fresh) = with_env(&[("OP_OVS_TEST_PRESET", "from_env")], || {
            let loaded = try_load_env_file(&path);
            let fresh = std::env::var("OP_OVS_TEST_FRESH").ok();
            std::env::remove_var("OP_OVS_TEST_FRESH");
            (loaded, std::env::var("OP_OVS_TEST_PRESET").ok(), fresh)
        });

        assert_eq!(loaded.as_deref(), Some(path.as_str()));
        assert_eq!(preset.as_deref(), Some("from_env"));
        assert_eq!(fresh.as_deref(), Some("loaded"));
        assert_eq!(try_load_env_file(&dir.path().join("absent").to_string_lossy()), None);
    }

    #[test]
    fn test_load_environment_prefers_env_file_variable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("op-ovs.env");
        fs::write(&path, "OP_OVS_TEST_FROM_ENV_FILE=yes\n").unwrap();
        let path = path.to_string_lossy().into_owned();

        let (loaded, value) = with_env(&[("OP_OVS_ENV_FILE", path.as_str())], || {
            let loaded = load_environment();
            let value = std::env::var("OP_OVS_TEST_FROM_ENV_FILE").ok();
            std::env::remove_var("OP_OVS_TEST_FROM_ENV_FILE");
            (loaded, value)
        });

        assert_eq!(loaded.as_deref(), Some(path.as_str()));
        assert_eq!(value.as_deref(), Some("yes"));
    }
}
