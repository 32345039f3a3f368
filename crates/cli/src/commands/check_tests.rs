// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fab_recipe::{parse_recipe, Overrides};
use serial_test::serial;
use std::path::Path;

const RECIPE: &str = r#"
bucket = "firesim-images"
distributed_elaboration = true

[notify]
kind = "sns"
topic_arn = "arn:aws:sns:us-east-1:1:builds"

[[build]]
name = "rocket"
design = "FireSim"
target_config = "FireSimRocketConfig"
platform_config = "BaseF1Config"
host = "10.0.0.1"

[[build]]
name = "boom"
design = "FireSim"
target_config = "FireSimBoomConfig"
platform_config = "BaseF1Config"
deploy_triplet = "FireSim-FireSimBoomConfig-F90MHz_BaseF1Config"
host = "10.0.0.2"
"#;

fn recipe() -> Recipe {
    parse_recipe(RECIPE, Path::new("/work/deploy"), &Overrides::default()).unwrap()
}

#[test]
fn plan_lists_every_job_with_its_paths() {
    let plan = plan(&recipe());

    assert_eq!(plan.bucket, "firesim-images");
    assert_eq!(plan.elaboration, "distributed");
    assert_eq!(plan.notify, "sns (arn:aws:sns:us-east-1:1:builds)");
    assert_eq!(plan.poll_interval_secs, 10);
    assert_eq!(plan.max_polls, 720);
    assert_eq!(plan.jobs.len(), 2);

    let rocket = &plan.jobs[0];
    assert_eq!(rocket.triplet, "FireSim-FireSimRocketConfig-BaseF1Config");
    assert_eq!(rocket.deploy_triplet, rocket.triplet);
    assert_eq!(rocket.results_dir, PathBuf::from("/work/deploy/results-build/rocket"));
    assert_eq!(rocket.hwdb_entry, PathBuf::from("/work/deploy/built-hwdb-entries/rocket"));
}

#[test]
#[serial]
fn render_shows_deploy_override_only_when_it_differs() {
    std::env::set_var("NO_COLOR", "1");
    let text = render(&plan(&recipe()));
    std::env::remove_var("NO_COLOR");

    assert!(text.contains("  bucket       firesim-images\n"));
    assert!(text.contains("Jobs: (2)"));
    assert!(text.contains("  rocket on 10.0.0.1\n"));
    assert!(text.contains("    deploy   FireSim-FireSimBoomConfig-F90MHz_BaseF1Config\n"));
    assert_eq!(text.matches("    deploy ").count(), 1);
}

#[test]
fn plan_serializes_to_json() {
    let json = serde_json::to_value(plan(&recipe())).unwrap();
    assert_eq!(json["jobs"][1]["host"], "10.0.0.2");
    assert_eq!(json["elaboration"], "distributed");
}
