//! Log output for binaries and tests.
//!
//! The library only emits `tracing` events; it never installs a
//! subscriber on its own. Call [`init`] or [`try_init`] from a binary (or
//! a test that wants to see output) to print them.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "DISTSIM_LOG";

/// Filter used when `DISTSIM_LOG` is unset or unparsable.
pub const FALLBACK_FILTER: &str = "warn";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER))
}

/// Install a formatted subscriber filtered by `DISTSIM_LOG`.
///
/// # Panics
///
/// Panics when a global subscriber is already installed.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_target(false)
        .init();
}

/// Like [`init`], but returns `false` instead of panicking when a
/// subscriber is already installed.
pub fn try_init() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_init_is_idempotent() {
        let _ = try_init();
        assert!(!try_init());
    }
}
