// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fab_core::{BuildOutcome, HostAddr, HostKeyPolicy, Stage};
use fab_engine::{FleetRunError, JobReport, RunId};
use fab_recipe::{parse_recipe, Overrides};
use serial_test::serial;
use std::path::Path;

fn recipe(extra: &str) -> Recipe {
    let content = format!(
        r#"
bucket = "b"
host_key_policy = "strict"
{}

[[build]]
name = "rocket"
design = "FireSim"
target_config = "FireSimRocketConfig"
platform_config = "BaseF1Config"
host = "10.0.0.1"
"#,
        extra
    );
    parse_recipe(&content, Path::new("/work/deploy"), &Overrides::default()).unwrap()
}

#[test]
fn ssh_options_carry_recipe_settings() {
    let options = ssh_options(&recipe("[ssh]\nuser = \"centos\"\nidentity = \"/keys/f1.pem\""));
    assert_eq!(options.host_key_policy, HostKeyPolicy::Strict);
    assert_eq!(options.user.as_deref(), Some("centos"));
    assert_eq!(options.identity.as_deref(), Some(Path::new("/keys/f1.pem")));
}

#[yare::parameterized(
    desktop = { "" },
    sns     = { "[notify]\nkind = \"sns\"\ntopic_arn = \"arn:t\"" },
    silent  = { "[notify]\nkind = \"silent\"" },
)]
fn notifier_matches_target(section: &str) {
    let recipe = recipe(section);
    let chosen = notifier(&recipe.notify);
    match (&recipe.notify, chosen) {
        (NotifyTarget::Desktop, Notifier::Desktop(_))
        | (NotifyTarget::Sns { .. }, Notifier::Sns(_))
        | (NotifyTarget::Silent, Notifier::Silent) => {}
        (target, notifier) => panic!("{:?} mapped to {:?}", target, notifier),
    }
}

#[test]
#[serial]
fn render_lists_each_job_outcome() {
    let report = FleetReport {
        run_id: RunId::new(),
        jobs: vec![
            JobReport {
                name: "rocket".into(),
                host: HostAddr::new("10.0.0.1"),
                build_dir: "rocket".into(),
                outcome: BuildOutcome::Succeeded { global_image_id: "agfi-1".into() },
            },
            JobReport {
                name: "boom".into(),
                host: HostAddr::new("10.0.0.2"),
                build_dir: "boom".into(),
                outcome: BuildOutcome::Failed { stage: Stage::SyncSource, reason: "rsync exited 23".into() },
            },
        ],
        aborted: None,
    };
    std::env::set_var("NO_COLOR", "1");
    let text = render(&report);
    std::env::remove_var("NO_COLOR");

    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines[0], format!("Run {}", report.run_id));
    assert!(lines[1].starts_with("  rocket "));
    assert!(lines[1].ends_with("succeeded (agfi-1)"));
    assert!(lines[2].ends_with("failed at sync-source: rsync exited 23"));
    assert_eq!(lines.len(), 3);
}

#[test]
#[serial]
fn render_names_an_aborted_task() {
    let report = FleetReport {
        run_id: RunId::new(),
        jobs: vec![JobReport {
            name: "rocket".into(),
            host: HostAddr::new("10.0.0.1"),
            build_dir: "rocket".into(),
            outcome: BuildOutcome::Failed { stage: Stage::Failure, reason: "boom".into() },
        }],
        aborted: Some(FleetRunError::TaskPanicked { host: HostAddr::new("10.0.0.1"), message: "boom".into() }),
    };
    std::env::set_var("NO_COLOR", "1");
    let text = render(&report);
    std::env::remove_var("NO_COLOR");

    assert_eq!(text.lines().last(), Some("build task for 10.0.0.1 panicked: boom"));
}
