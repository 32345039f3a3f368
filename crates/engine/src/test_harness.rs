// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake-backed fixture for pipeline and fleet tests.

use crate::deps::PipelineDeps;
use crate::pipeline::Pipeline;
use async_trait::async_trait;
use fab_adapters::{
    CommandEnv, CommandOutput, FakeCloud, FakeNotifyAdapter, FakeRemote, FakeShell, FakeSyncAdapter, ShellAdapter,
    ShellError,
};
use fab_core::test_support::test_triplet;
use fab_core::{BuildJob, BuildOutcome, DeployLayout, FleetConfig, PollConfig};
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub(crate) type FakeDeps = PipelineDeps<FakeShell, FakeRemote, FakeSyncAdapter, FakeCloud, FakeNotifyAdapter>;
pub(crate) type FakePipeline = Pipeline<FakeShell, FakeRemote, FakeSyncAdapter, FakeCloud, FakeNotifyAdapter>;

pub(crate) struct Harness {
    _tmp: tempfile::TempDir,
    pub(crate) root: PathBuf,
    pub(crate) layout: DeployLayout,
    pub(crate) shell: FakeShell,
    pub(crate) remote: FakeRemote,
    pub(crate) sync: FakeSyncAdapter,
    pub(crate) cloud: FakeCloud,
    pub(crate) notifier: FakeNotifyAdapter,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        let layout = DeployLayout::new(root.join("firesim/deploy"));
        std::fs::create_dir_all(layout.template_dir().join("build/scripts")).unwrap();
        std::fs::write(layout.template_dir().join("build/scripts/aws_build_dcp_from_cl.sh"), "").unwrap();

        let generated = root.join("gen");
        std::fs::create_dir_all(&generated).unwrap();
        std::fs::write(generated.join("replace-rtl.sh"), "make replace-rtl").unwrap();
        std::fs::create_dir_all(root.join("jar")).unwrap();
        std::fs::write(root.join("jar/fat.jar"), "jar").unwrap();

        let shell = FakeShell::new();
        shell.respond_stdout("ECHOVAR=\"GENERATED_DIR\"", &format!("GENERATED_DIR := {}", generated.display()));
        shell.respond_stdout("ECHOVAR=\"FAT_JAR\"", &format!("FAT_JAR := {}", root.join("jar/fat.jar").display()));

        Self {
            sync: FakeSyncAdapter::with_mirror(root.join("mirror")),
            _tmp: tmp,
            root,
            layout,
            shell,
            remote: FakeRemote::new(),
            cloud: FakeCloud::new(),
            notifier: FakeNotifyAdapter::new(),
        }
    }

    pub(crate) fn job(&self, name: &str, host: &str) -> BuildJob {
        BuildJob::builder(name, test_triplet(), host)
            .build_dir_name(format!("{}-{}", name, host))
            .build()
            .unwrap()
    }

    /// Local mode: the elaborated vendor tree exists on the manager.
    pub(crate) fn seed_local_design(&self, job: &BuildJob) {
        let design = self.layout.fpga_build_dir(job).join("design");
        std::fs::create_dir_all(&design).unwrap();
        std::fs::write(design.join(fab_core::artifact::GENERATED_VERILOG), "module top;").unwrap();
    }

    /// What elaboration and synthesis leave behind on the host.
    pub(crate) fn seed_host(&self, job: &BuildJob) {
        let tree = self.sync.mirror_path(job.host().as_str(), &self.layout.fpga_build_dir(job)).unwrap();
        std::fs::create_dir_all(tree.join("design")).unwrap();
        std::fs::write(tree.join("design").join(fab_core::artifact::GENERATED_VERILOG), "module top;").unwrap();
        let checkpoints = tree.join("build/checkpoints/to_aws");
        std::fs::create_dir_all(&checkpoints).unwrap();
        std::fs::write(checkpoints.join("top.Developer_CL.tar"), "dcp").unwrap();
    }

    pub(crate) fn fleet(&self, jobs: &[BuildJob], distributed: bool, hook: Option<&str>) -> Arc<FleetConfig> {
        Arc::new(self.fleet_config(jobs, distributed, hook))
    }

    pub(crate) fn fleet_config(&self, jobs: &[BuildJob], distributed: bool, hook: Option<&str>) -> FleetConfig {
        let mut builder = FleetConfig::builder("test-bucket", self.layout.clone())
            .distributed_elaboration(distributed)
            .poll(PollConfig::new(Duration::from_millis(1), 10))
            .jobs(jobs.iter().cloned());
        if let Some(hook) = hook {
            builder = builder.post_build_hook(hook.to_string());
        }
        builder.build().unwrap()
    }

    pub(crate) fn deps(&self) -> FakeDeps {
        PipelineDeps::new(
            self.shell.clone(),
            self.remote.clone(),
            self.sync.clone(),
            self.cloud.clone(),
            self.notifier.clone(),
        )
    }

    pub(crate) fn pipeline(&self, fleet: &Arc<FleetConfig>, job: &BuildJob, cancel: CancellationToken) -> FakePipeline {
        Pipeline::new(self.deps(), Arc::clone(fleet), job.clone(), cancel)
    }

    /// Single local-mode job with everything seeded for success.
    pub(crate) async fn run_local(&self, hook: Option<&str>) -> (BuildJob, BuildOutcome) {
        let job = self.job("rocket", "10.0.0.1");
        self.seed_local_design(&job);
        self.seed_host(&job);
        let fleet = self.fleet(std::slice::from_ref(&job), false, hook);
        let outcome = self.pipeline(&fleet, &job, CancellationToken::new()).run(false).await;
        (job, outcome)
    }
}

/// Delegates to a [`FakeShell`] and records the peak number of make
/// invocations in flight at once. Each make call takes a few milliseconds.
#[derive(Clone)]
pub(crate) struct CountingShell {
    pub(crate) inner: FakeShell,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl CountingShell {
    pub(crate) fn new(inner: FakeShell) -> Self {
        Self { inner, in_flight: Arc::default(), peak: Arc::default() }
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn track<T>(&self, command: &str, call: impl Future<Output = T>) -> T {
        if !command.contains("DESIGN=") {
            return call.await;
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        let result = call.await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl ShellAdapter for CountingShell {
    async fn run(&self, command: &str, env: &CommandEnv) -> Result<i32, ShellError> {
        self.track(command, self.inner.run(command, env)).await
    }

    async fn capture(&self, command: &str, env: &CommandEnv) -> Result<CommandOutput, ShellError> {
        self.track(command, self.inner.capture(command, env)).await
    }
}
