//! Configuration applied when mocking is activated.

use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::Path;

/// Environment variable that, when set to any non-empty value, turns every
/// activation and deactivation into a no-op.
pub const DISABLE_ENV_VAR: &str = "RIFT_NO_MOCKS";

/// Returns true if mocking is disabled through [`DISABLE_ENV_VAR`].
pub fn disabled() -> bool {
    is_disabled_value(std::env::var_os(DISABLE_ENV_VAR).as_deref())
}

fn is_disabled_value(value: Option<&OsStr>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

/// Options for [`activate`](crate::activate) and
/// [`activate_for_client`](crate::activate_for_client).
///
/// ```yaml
/// allowedHosts:
///   - localhost
///   - api.internal
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MockConfig {
    /// Hostnames (no scheme, no port) whose unmatched requests may reach the
    /// real network while mocking is active.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_hosts: Vec<String>,
}

impl MockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add hostnames exempt from mocking.
    pub fn allowed_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_hosts.extend(hosts.into_iter().map(Into::into));
        self
    }

    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: MockConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        for host in &self.allowed_hosts {
            if host.is_empty() {
                anyhow::bail!("allowedHosts entries must not be empty");
            }
            if host.contains("://") || host.contains('/') {
                anyhow::bail!(
                    "allowedHosts entry '{host}' must be a bare hostname without scheme or path"
                );
            }
        }
        Ok(())
    }
}
