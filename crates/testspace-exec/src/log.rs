//! Quiet-mode aware logging. When TESTSPACE_QUIET=1 lifecycle `[INFO]` lines are dropped.
//! Goes through `tracing::info!` so the installed subscriber still decides the format.

#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {{
        if !$crate::log::is_quiet() {
            tracing::info!($($arg)*);
        }
    }};
}

pub fn is_quiet() -> bool {
    testspace_core::config::ObservabilityConfig::from_env().quiet
}
