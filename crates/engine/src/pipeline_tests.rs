// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_harness::Harness;
use fab_adapters::{CloudCall, FakeCloud, SyncDirection};
use fab_core::notification::{BUILD_COMPLETED_TITLE, BUILD_FAILED_TITLE};
use fab_core::{HostAddr, ImageState, PollConfig};
use std::time::Duration;

fn describes(cloud: &FakeCloud) -> usize {
    cloud.count(|c| matches!(c, CloudCall::DescribeImage { .. }))
}

#[tokio::test]
async fn local_build_succeeds_after_pending_polls() {
    let h = Harness::new();
    h.cloud.script_states([ImageState::Pending, ImageState::Pending, ImageState::Available]);

    let (job, outcome) = h.run_local(Some("./post.sh")).await;

    assert_eq!(outcome, BuildOutcome::Succeeded { global_image_id: "agfi-1".into() });
    assert_eq!(describes(&h.cloud), 3);

    let record = std::fs::read_to_string(h.layout.hwdb_entry_path(&job)).unwrap();
    assert!(record.starts_with("[rocket]\nagfi=agfi-1\n"));

    let results = h.layout.results_dir(&job);
    let hooks: Vec<_> = h.shell.commands().into_iter().filter(|c| c.starts_with("./post.sh")).collect();
    assert_eq!(hooks, vec![format!("./post.sh {}", results.display())]);

    let sent = h.notifier.calls();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, BUILD_COMPLETED_TITLE);
    assert_eq!(h.cloud.terminated(), vec![HostAddr::new("10.0.0.1")]);

    assert!(results.join(fab_core::artifact::GENERATED_VERILOG).exists());
    assert!(results.join("AGFI_INFO").exists());
    assert!(results.join("build.log").exists());
    let outcome_json = std::fs::read_to_string(results.join("outcome.json")).unwrap();
    assert!(outcome_json.contains("\"succeeded\""));
}

#[tokio::test]
async fn local_build_pushes_design_tree_without_checkpoints() {
    let h = Harness::new();
    let (job, _) = h.run_local(None).await;

    let pushes: Vec<_> =
        h.sync.calls().into_iter().filter(|r| r.direction == SyncDirection::Push).collect();
    assert_eq!(pushes.len(), 2);
    assert_eq!(pushes[0].local, h.layout.platform_root());
    assert_eq!(pushes[0].excludes, vec![PLATFORM_EXCLUDE.to_string()]);
    assert_eq!(pushes[1].local, h.layout.fpga_build_dir(&job));
    assert_eq!(pushes[1].excludes, vec![CHECKPOINTS_EXCLUDE.to_string()]);

    let commands = h.shell.commands();
    assert!(commands.iter().any(|c| c.ends_with("replace-rtl")));
    assert!(commands.iter().any(|c| c.ends_with(" f1")));
    assert!(!commands.iter().any(|c| c.contains("gen-replace-rtl-script")));
}

#[tokio::test]
async fn synthesis_failure_skips_registration_and_polling() {
    let h = Harness::new();
    h.remote.exit_with("aws_build_dcp_from_cl.sh", 2);

    let (job, outcome) = h.run_local(None).await;

    assert_eq!(
        outcome,
        BuildOutcome::Failed { stage: Stage::RemoteBuild, reason: "synthesis exited with code 2".into() }
    );
    assert_eq!(h.cloud.count(|c| !matches!(c, CloudCall::Terminate { .. })), 0);
    assert_eq!(h.cloud.terminated().len(), 1);
    assert!(h.layout.results_dir(&job).join("cl_firesim/build").exists());
    assert!(!h.layout.hwdb_entry_path(&job).exists());

    let sent = h.notifier.calls();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, BUILD_FAILED_TITLE);
    assert!(sent[0].body.contains("10.0.0.1"));
}

fn fail_replace_rtl(h: &Harness) {
    h.shell.fail("replace-rtl", 2);
}

fn fail_platform_push(h: &Harness) {
    h.sync.fail_on(SyncDirection::Push, "aws-fpga");
}

fn fail_results_pull(h: &Harness) {
    h.sync.fail_on(SyncDirection::Pull, "developer_designs");
}

fn fail_commit_tag(h: &Harness) {
    h.shell.fail("git rev-parse", 128);
}

fn fail_image_creation(h: &Harness) {
    h.cloud.fail_create();
}

fn fail_upload(h: &Harness) {
    h.cloud.fail_put();
}

fn image_enters_failed(h: &Harness) {
    h.cloud.script_states([ImageState::Pending, ImageState::Failed("failed".into())]);
}

fn image_never_finishes(h: &Harness) {
    h.cloud.script_states(std::iter::repeat_n(ImageState::Pending, 10));
}

fn fail_hwdb_write(h: &Harness) {
    let dir = h.layout.hwdb_entries_dir();
    std::fs::create_dir_all(dir.parent().unwrap()).unwrap();
    std::fs::write(&dir, "not a directory").unwrap();
}

#[yare::parameterized(
    generate_rtl    = { fail_replace_rtl,     Stage::GenerateRtl },
    sync_source     = { fail_platform_push,   Stage::SyncSource },
    sync_results    = { fail_results_pull,    Stage::SyncResults },
    commit_tag      = { fail_commit_tag,      Stage::RegisterImage },
    image_creation  = { fail_image_creation,  Stage::RegisterImage },
    upload          = { fail_upload,          Stage::RegisterImage },
    image_failed    = { image_enters_failed,  Stage::PollCompletion },
    poll_timeout    = { image_never_finishes, Stage::PollCompletion },
    hwdb_write      = { fail_hwdb_write,      Stage::Success },
)]
fn each_failure_notifies_once_and_terminates_once(inject: fn(&Harness), expected: Stage) {
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    rt.block_on(async {
        let h = Harness::new();
        inject(&h);

        let (_, outcome) = h.run_local(None).await;

        match outcome {
            BuildOutcome::Failed { stage, .. } => assert_eq!(stage, expected),
            other => panic!("expected failure, got {}", other),
        }
        let sent = h.notifier.calls();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, BUILD_FAILED_TITLE);
        assert_eq!(h.cloud.terminated(), vec![HostAddr::new("10.0.0.1")]);
    });
}

#[tokio::test]
async fn notification_failure_still_terminates() {
    let h = Harness::new();
    h.notifier.fail();
    h.cloud.fail_create();

    let (_, outcome) = h.run_local(None).await;

    assert!(matches!(outcome, BuildOutcome::Failed { stage: Stage::RegisterImage, .. }));
    assert_eq!(h.cloud.terminated().len(), 1);
}

#[tokio::test]
async fn bypass_only_releases_host() {
    let h = Harness::new();
    let job = h.job("rocket", "10.0.0.1");
    let fleet = h.fleet(std::slice::from_ref(&job), false, None);

    let outcome = h.pipeline(&fleet, &job, CancellationToken::new()).run(true).await;

    assert_eq!(outcome, BuildOutcome::Bypassed);
    assert!(h.shell.calls().is_empty());
    assert!(h.sync.calls().is_empty());
    assert!(h.remote.calls().is_empty());
    assert!(h.notifier.calls().is_empty());
    assert_eq!(h.cloud.calls(), vec![CloudCall::Terminate { host: HostAddr::new("10.0.0.1") }]);
}

#[tokio::test]
async fn cancelled_before_start_runs_nothing_but_teardown() {
    let h = Harness::new();
    let job = h.job("rocket", "10.0.0.1");
    let fleet = h.fleet(std::slice::from_ref(&job), false, None);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = h.pipeline(&fleet, &job, cancel).run(false).await;

    assert_eq!(outcome, BuildOutcome::Failed { stage: Stage::GenerateRtl, reason: "cancelled".into() });
    assert!(h.shell.calls().is_empty());
    assert_eq!(h.notifier.calls().len(), 1);
    assert_eq!(h.cloud.terminated().len(), 1);
}

#[tokio::test]
async fn cancelled_while_polling_stops_at_poll_stage() {
    let h = Harness::new();
    h.cloud.script_states(std::iter::repeat_n(ImageState::Pending, 100));
    let job = h.job("rocket", "10.0.0.1");
    h.seed_local_design(&job);
    h.seed_host(&job);
    let fleet = Arc::new(
        FleetConfig::builder("test-bucket", h.layout.clone())
            .poll(PollConfig::new(Duration::from_secs(60), 100))
            .job(job.clone())
            .build()
            .unwrap(),
    );
    let cancel = CancellationToken::new();
    let pipeline = h.pipeline(&fleet, &job, cancel.clone());
    let handle = tokio::spawn(pipeline.run(false));

    while describes(&h.cloud) == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cancel.cancel();
    let outcome = handle.await.unwrap();

    assert_eq!(outcome, BuildOutcome::Failed { stage: Stage::PollCompletion, reason: "cancelled".into() });
    assert_eq!(describes(&h.cloud), 1);
    assert_eq!(h.cloud.terminated().len(), 1);
    assert!(!h.layout.hwdb_entry_path(&job).exists());
}

#[tokio::test]
async fn distributed_same_name_jobs_stay_isolated() {
    let h = Harness::new();
    let a1 = h.job("A", "10.0.0.1");
    let a2 = h.job("A", "10.0.0.2");
    h.seed_host(&a1);
    h.seed_host(&a2);
    let fleet = h.fleet(&[a1.clone(), a2.clone()], true, None);

    let (o1, o2) = tokio::join!(
        h.pipeline(&fleet, &a1, CancellationToken::new()).run(false),
        h.pipeline(&fleet, &a2, CancellationToken::new()).run(false),
    );
    assert!(o1.is_success(), "{}", o1);
    assert!(o2.is_success(), "{}", o2);

    let keys = h.cloud.uploads();
    assert_eq!(keys.len(), 2);
    assert_ne!(keys[0], keys[1]);

    let r1 = h.layout.results_dir(&a1);
    let r2 = h.layout.results_dir(&a2);
    assert_ne!(r1, r2);
    for results in [&r1, &r2] {
        assert!(results.join(fab_core::artifact::GENERATED_VERILOG).exists());
        assert!(results.join("generated-src/replace-rtl.sh").exists());
    }
    assert!(h.layout.hwdb_entry_path(&a1).exists());
    assert!(h.layout.hwdb_entry_path(&a2).exists());

    let commands = h.shell.commands();
    assert!(commands.iter().any(|c| c.contains("gen-replace-rtl-script")));
    assert!(!commands.iter().any(|c| c.ends_with(" replace-rtl")));
    for results in [&r1, &r2] {
        let driver = format!("GENERATED_DIR={}", results.join("generated-src").display());
        assert!(commands.iter().any(|c| c.contains(&driver)), "no driver build with {}", driver);
    }
}

#[tokio::test]
async fn distributed_elaboration_failure_fails_remote_build() {
    let h = Harness::new();
    h.remote.exit_with_on("10.0.0.2", "bash -xe", 1);
    let a1 = h.job("A", "10.0.0.1");
    let a2 = h.job("A", "10.0.0.2");
    h.seed_host(&a1);
    h.seed_host(&a2);
    let fleet = h.fleet(&[a1.clone(), a2.clone()], true, None);

    let (o1, o2) = tokio::join!(
        h.pipeline(&fleet, &a1, CancellationToken::new()).run(false),
        h.pipeline(&fleet, &a2, CancellationToken::new()).run(false),
    );

    assert!(o1.is_success());
    assert_eq!(o2, BuildOutcome::Failed { stage: Stage::RemoteBuild, reason: "elaboration exited with code 1".into() });
    assert_eq!(h.remote.commands_on("10.0.0.2").iter().filter(|c| c.contains("aws_build_dcp")).count(), 0);
    assert_eq!(h.cloud.terminated().len(), 2);
    assert_eq!(h.notifier.calls().len(), 2);
}

#[test]
fn host_dirs_cover_every_push_target() {
    let h = Harness::new();
    let job = h.job("rocket", "10.0.0.1");
    let fleet = h.fleet(std::slice::from_ref(&job), true, None);
    let artifacts = h.layout.artifacts(&job, h.root.join("gen"), h.root.join("jar/fat.jar"));

    let dirs = host_dirs(&fleet, &artifacts);
    assert!(dirs.contains(&h.layout.deploy_dir().to_path_buf()));
    assert!(dirs.contains(&h.root.join("gen")));
    assert!(dirs.contains(&h.root.join("jar")));
    assert!(dirs.contains(&h.layout.template_dir()));
    assert!(dirs.contains(&h.layout.fpga_build_dir(&job)));
    assert!(dirs.iter().all(|d| d.is_absolute()));
}
