//! Config structs grouped by concern, loaded from the environment.

use super::env_keys::{observability as obv_keys, space as space_keys};
use super::loader::{env_bool, env_optional, env_or, env_u64};
use std::path::PathBuf;
use std::time::Duration;

/// Default bound on the `git init` run during provisioning.
pub const DEFAULT_VCS_INIT_TIMEOUT_SECS: u64 = 3;

/// Workspace provisioning defaults
#[derive(Debug, Clone)]
pub struct SpaceConfig {
    /// Parent directory for generated workspace paths
    pub root: PathBuf,
    /// Run `git init` inside each new workspace
    pub init_vcs: bool,
    pub vcs_init_timeout: Duration,
}

impl SpaceConfig {
    pub fn from_env() -> Self {
        let root = env_optional(space_keys::TESTSPACE_ROOT, &[])
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        let init_vcs = env_bool(space_keys::TESTSPACE_INIT_VCS, &[], true);
        let timeout_secs = env_u64(
            space_keys::TESTSPACE_VCS_INIT_TIMEOUT_SECS,
            &[],
            DEFAULT_VCS_INIT_TIMEOUT_SECS,
        );
        Self {
            root,
            init_vcs,
            vcs_init_timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            root: std::env::temp_dir(),
            init_vcs: true,
            vcs_init_timeout: Duration::from_secs(DEFAULT_VCS_INIT_TIMEOUT_SECS),
        }
    }
}

/// Observability: quiet, log_level, log_json, audit_log
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub audit_log: Option<String>,
}

impl ObservabilityConfig {
    /// Read once per process; later env changes are not observed.
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| Self {
            quiet: env_bool(obv_keys::TESTSPACE_QUIET, &[], false),
            log_level: env_or(obv_keys::TESTSPACE_LOG_LEVEL, &[], || {
                "testspace=info".to_string()
            }),
            log_json: env_bool(obv_keys::TESTSPACE_LOG_JSON, &[], false),
            audit_log: env_optional(obv_keys::TESTSPACE_AUDIT_LOG, &[]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_config_default_matches_unset_env() {
        let cfg = SpaceConfig::default();
        assert!(cfg.init_vcs);
        assert_eq!(cfg.vcs_init_timeout, Duration::from_secs(3));
        assert_eq!(cfg.root, std::env::temp_dir());
    }
}
