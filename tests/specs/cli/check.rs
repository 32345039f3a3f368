// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fab check` validates recipes without touching hosts

use crate::prelude::*;

#[test]
fn valid_recipe_prints_plan() {
    let project = Project::empty();
    let recipe = project.file("deploy/build.toml", ONE_BUILD);

    cli()
        .arg("check")
        .arg(&recipe)
        .passes()
        .stdout_has("Single rocket build")
        .stdout_has("firesim-images")
        .stdout_has("rocket on 10.0.0.1")
        .stdout_has("FireSim-FireSimRocketConfig-BaseF1Config");
}

#[test]
fn json_plan_resolves_results_against_deploy_dir() {
    let project = Project::empty();
    let recipe = project.file("deploy/build.toml", ONE_BUILD);

    let run = cli().arg("check").arg(&recipe).args(["-o", "json"]).passes();
    let plan: serde_json::Value = serde_json::from_str(&run.stdout).unwrap();
    let results = project.path().join("deploy/results-build/rocket");
    assert_eq!(plan["jobs"][0]["results_dir"], results.display().to_string());
    assert_eq!(plan["elaboration"], "local");
}

#[test]
fn deploy_dir_flag_overrides_recipe_location() {
    let project = Project::empty();
    let recipe = project.file("recipes/build.toml", ONE_BUILD);
    let deploy = project.path().join("elsewhere/deploy");

    let run = cli().arg("check").arg(&recipe).arg("--deploy-dir").arg(&deploy).args(["-o", "json"]).passes();
    let plan: serde_json::Value = serde_json::from_str(&run.stdout).unwrap();
    assert_eq!(plan["deploy_dir"], deploy.display().to_string());
}

#[test]
fn env_poll_overrides_apply() {
    let project = Project::empty();
    let recipe = project.file("deploy/build.toml", ONE_BUILD);

    let run = cli()
        .arg("check")
        .arg(&recipe)
        .args(["-o", "json"])
        .env("FAB_POLL_INTERVAL_MS", "2000")
        .env("FAB_MAX_POLLS", "3")
        .passes();
    let plan: serde_json::Value = serde_json::from_str(&run.stdout).unwrap();
    assert_eq!(plan["poll_interval_secs"], 2);
    assert_eq!(plan["max_polls"], 3);
}

#[test]
fn missing_recipe_is_invalid() {
    let project = Project::empty();
    cli()
        .arg("check")
        .arg(project.path().join("nope.toml"))
        .exits_with(2)
        .stderr_has("invalid recipe");
}

#[test]
fn duplicate_host_is_rejected() {
    let project = Project::empty();
    let second = ONE_BUILD.replace("# Single rocket build\n", "") + r#"
[[build]]
name = "boom"
design = "FireSim"
target_config = "FireSimBoomConfig"
platform_config = "BaseF1Config"
host = "10.0.0.1"
"#;
    let recipe = project.file("deploy/build.toml", &second);
    cli().arg("check").arg(&recipe).exits_with(2).stderr_has("10.0.0.1");
}

#[test]
fn unknown_field_is_rejected() {
    let project = Project::empty();
    let recipe = project.file("deploy/build.toml", &format!("bucket_name = \"x\"\n{}", ONE_BUILD));
    cli().arg("check").arg(&recipe).exits_with(2).stderr_has("invalid recipe");
}

#[test]
fn unresolved_variable_is_rejected() {
    let project = Project::empty();
    let recipe = project.file(
        "deploy/build.toml",
        &ONE_BUILD.replace("\"firesim-images\"", "\"${FAB_SPEC_UNSET_BUCKET}\""),
    );
    cli()
        .arg("check")
        .arg(&recipe)
        .env_remove("FAB_SPEC_UNSET_BUCKET")
        .exits_with(2)
        .stderr_has("FAB_SPEC_UNSET_BUCKET");
}
