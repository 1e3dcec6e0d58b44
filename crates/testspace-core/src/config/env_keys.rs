//! Environment variable key constants.

/// Workspace provisioning
pub mod space {
    /// Base directory for generated workspace paths. Defaults to the system temp dir.
    pub const TESTSPACE_ROOT: &str = "TESTSPACE_ROOT";

    /// Whether provisioning runs `git init` in the workspace (default on).
    pub const TESTSPACE_INIT_VCS: &str = "TESTSPACE_INIT_VCS";

    pub const TESTSPACE_VCS_INIT_TIMEOUT_SECS: &str = "TESTSPACE_VCS_INIT_TIMEOUT_SECS";
}

/// Observability and logging
pub mod observability {
    pub const TESTSPACE_QUIET: &str = "TESTSPACE_QUIET";

    pub const TESTSPACE_LOG_LEVEL: &str = "TESTSPACE_LOG_LEVEL";

    pub const TESTSPACE_LOG_JSON: &str = "TESTSPACE_LOG_JSON";

    /// JSONL file receiving one record per execution start/completion.
    pub const TESTSPACE_AUDIT_LOG: &str = "TESTSPACE_AUDIT_LOG";
}
