// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI.

use fab_recipe::Overrides;
use std::path::PathBuf;
use std::time::Duration;

/// CLI version with the build's git hash
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("FAB_GIT_HASH"));

/// Deploy directory override (`FAB_DEPLOY_DIR`)
pub fn deploy_dir() -> Option<PathBuf> {
    std::env::var("FAB_DEPLOY_DIR").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// Image poll interval override (`FAB_POLL_INTERVAL_MS`)
pub fn poll_interval() -> Option<Duration> {
    std::env::var("FAB_POLL_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

/// Poll budget override (`FAB_MAX_POLLS`)
pub fn max_polls() -> Option<u32> {
    std::env::var("FAB_MAX_POLLS").ok().and_then(|s| s.parse::<u32>().ok()).filter(|n| *n > 0)
}

/// Log filter directive (`FAB_LOG`), default `info`
pub fn log_filter() -> String {
    std::env::var("FAB_LOG").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "info".to_string())
}

/// Recipe overrides gathered from the environment; `--deploy-dir` wins over
/// `FAB_DEPLOY_DIR`.
pub fn overrides(deploy_dir_flag: Option<PathBuf>) -> Overrides {
    Overrides {
        deploy_dir: deploy_dir_flag.or_else(deploy_dir),
        poll_interval: poll_interval(),
        max_polls: max_polls(),
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
