// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure handling and host release.
//!
//! A [`Teardown`] is bound to one job. Whatever path a job takes, it sends at
//! most one notification and terminates the job's host at most once.

use fab_adapters::{CloudAdapter, NotifyAdapter};
use fab_core::{BuildJob, Notification, Stage};
use std::sync::atomic::{AtomicBool, Ordering};

pub struct Teardown<C, N> {
    cloud: C,
    notifier: N,
    job: BuildJob,
    notified: AtomicBool,
    released: AtomicBool,
}

impl<C: CloudAdapter, N: NotifyAdapter> Teardown<C, N> {
    pub fn new(cloud: C, notifier: N, job: BuildJob) -> Self {
        Self { cloud, notifier, job, notified: AtomicBool::new(false), released: AtomicBool::new(false) }
    }

    /// Send `notification` unless one was already sent for this job.
    /// Delivery errors are logged, never retried.
    pub async fn notify_once(&self, notification: Notification) -> bool {
        if self.notified.swap(true, Ordering::SeqCst) {
            tracing::debug!(title = %notification.title, "notification already sent; skipping");
            return false;
        }
        tracing::info!(title = %notification.title, "{}", notification.body);
        if let Err(e) = self.notifier.notify(&notification).await {
            tracing::warn!(error = %e, "notification delivery failed");
        }
        true
    }

    /// The failure path: notify with the triplet and host, then release the host.
    pub async fn fail(&self, stage: Stage, reason: &str) {
        tracing::error!(
            %stage,
            triplet = %self.job.triplet(),
            host = %self.job.host(),
            reason,
            "build failed"
        );
        self.notify_once(Notification::build_failed(&self.job, reason)).await;
        self.terminate().await;
    }

    /// Terminate the job's host. Only the first call reaches the provider.
    pub async fn terminate(&self) -> bool {
        if self.released.swap(true, Ordering::SeqCst) {
            return false;
        }
        tracing::info!(host = %self.job.host(), "terminating build host");
        if let Err(e) = self.cloud.terminate_instance(self.job.host(), self.job.instance_id()).await {
            tracing::error!(host = %self.job.host(), error = %e, "failed to terminate build host");
        }
        true
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "teardown_tests.rs"]
mod tests;
