// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fab build` against a stubbed provider client

use crate::prelude::*;

#[cfg(unix)]
fn with_fake_aws(project: &Project) -> (std::ffi::OsString, std::path::PathBuf) {
    let log = project.path().join("aws.log");
    project.script("bin/aws", &format!("#!/bin/sh\necho \"$@\" >> {}\necho '{{}}'\n", log.display()));
    let path = std::env::var_os("PATH").unwrap_or_default();
    let mut paths = vec![project.path().join("bin")];
    paths.extend(std::env::split_paths(&path));
    (std::env::join_paths(paths).unwrap(), log)
}

#[cfg(unix)]
#[test]
fn bypass_only_terminates_hosts() {
    let project = Project::empty();
    let recipe = project.file("deploy/build.toml", ONE_BUILD);
    let (path, log) = with_fake_aws(&project);

    cli().arg("build").arg(&recipe).arg("--bypass").env("PATH", path).passes().stdout_has("bypassed");

    let calls = std::fs::read_to_string(log).unwrap();
    assert_eq!(calls.lines().count(), 1, "{}", calls);
    assert!(calls.contains("ec2 terminate-instances"));
    assert!(calls.contains("i-0abc"));
    assert!(!project.path().join("deploy/built-hwdb-entries").exists());
}

#[cfg(unix)]
#[test]
fn bypass_json_report_lists_jobs() {
    let project = Project::empty();
    let recipe = project.file("deploy/build.toml", ONE_BUILD);
    let (path, _) = with_fake_aws(&project);

    let run = cli().arg("build").arg(&recipe).args(["--bypass", "-o", "json"]).env("PATH", path).passes();
    let report: serde_json::Value = serde_json::from_str(&run.stdout).unwrap();
    assert_eq!(report["jobs"][0]["name"], "rocket");
    assert_eq!(report["jobs"][0]["outcome"]["outcome"], "bypassed");
    assert_eq!(report["run_id"].as_str().map(str::len), Some(36));
}

#[test]
fn invalid_recipe_does_not_start() {
    let project = Project::empty();
    let recipe = project.file("deploy/build.toml", "bucket = \"b\"\n");
    cli().arg("build").arg(&recipe).exits_with(2).stderr_has("invalid recipe");
}
