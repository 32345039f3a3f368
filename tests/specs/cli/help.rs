// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Help and version output

use crate::prelude::*;

#[test]
fn no_args_shows_usage_and_fails() {
    cli().exits_with(2).stderr_has("Usage:");
}

#[test]
fn help_lists_commands() {
    cli().args(["--help"]).passes().stdout_has("Usage:").stdout_has("build").stdout_has("check");
}

#[test]
fn build_help_shows_bypass() {
    cli().args(["build", "--help"]).passes().stdout_has("--bypass").stdout_has("<RECIPE>");
}

#[test]
fn version_shows_package_version() {
    cli().args(["--version"]).passes().stdout_has(env!("CARGO_PKG_VERSION"));
}
