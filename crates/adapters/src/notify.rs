// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use fab_core::Notification;
use std::path::PathBuf;
use thiserror::Error;

use crate::subprocess::{run_with_timeout, stderr_summary, SubprocessError, NOTIFY_TIMEOUT};

/// Errors from notify operations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error(transparent)]
    Subprocess(#[from] SubprocessError),
}

/// Adapter for sending build notifications
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Desktop notification adapter using notify-rust.
///
/// On macOS the first notification would otherwise run an AppleScript
/// bundle lookup that blocks forever without Automation permissions, so the
/// bundle identifier is set at construction.
#[derive(Clone, Copy, Debug, Default)]
pub struct DesktopNotifyAdapter;

impl DesktopNotifyAdapter {
    pub fn new() -> Self {
        #[cfg(target_os = "macos")]
        {
            let _ = mac_notification_sys::set_application("com.apple.Terminal");
        }
        Self
    }
}

#[async_trait]
impl NotifyAdapter for DesktopNotifyAdapter {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let title = notification.title.clone();
        let body = notification.body.clone();
        // show() is synchronous; fire-and-forget on the blocking pool
        tokio::task::spawn_blocking(move || {
            match notify_rust::Notification::new().summary(&title).body(&body).show() {
                Ok(_) => tracing::info!(%title, "desktop notification sent"),
                Err(e) => tracing::warn!(%title, error = %e, "desktop notification failed"),
            }
        });
        Ok(())
    }
}

/// Publishes to an SNS topic through the `aws` CLI.
#[derive(Clone, Debug)]
pub struct SnsNotifyAdapter {
    topic_arn: String,
    program: PathBuf,
}

impl SnsNotifyAdapter {
    pub fn new(topic_arn: impl Into<String>) -> Self {
        Self { topic_arn: topic_arn.into(), program: PathBuf::from("aws") }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn publish_args(&self, notification: &Notification) -> Vec<String> {
        vec![
            "sns".into(),
            "publish".into(),
            "--topic-arn".into(),
            self.topic_arn.clone(),
            "--subject".into(),
            notification.title.clone(),
            "--message".into(),
            notification.body.clone(),
        ]
    }
}

#[async_trait]
impl NotifyAdapter for SnsNotifyAdapter {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(self.publish_args(notification));
        let output = run_with_timeout(cmd, NOTIFY_TIMEOUT, "sns publish").await?;
        if !output.status.success() {
            return Err(NotifyError::SendFailed(stderr_summary(&output)));
        }
        tracing::info!(title = %notification.title, topic = %self.topic_arn, "notification published");
        Ok(())
    }
}

/// Notification sink chosen from configuration.
#[derive(Clone, Debug)]
pub enum Notifier {
    Desktop(DesktopNotifyAdapter),
    Sns(SnsNotifyAdapter),
    /// Log only
    Silent,
}

#[async_trait]
impl NotifyAdapter for Notifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        match self {
            Notifier::Desktop(n) => n.notify(notification).await,
            Notifier::Sns(n) => n.notify(notification).await,
            Notifier::Silent => {
                tracing::info!(title = %notification.title, body = %notification.body, "notification");
                Ok(())
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{NotifyAdapter, NotifyError};
    use async_trait::async_trait;
    use fab_core::Notification;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeNotifyState {
        calls: Vec<Notification>,
        fail: bool,
    }

    /// Fake notification adapter for testing
    #[derive(Clone, Default)]
    pub struct FakeNotifyAdapter {
        inner: Arc<Mutex<FakeNotifyState>>,
    }

    impl FakeNotifyAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        /// Record, then fail every send.
        pub fn fail(&self) {
            self.inner.lock().fail = true;
        }

        pub fn calls(&self) -> Vec<Notification> {
            self.inner.lock().calls.clone()
        }
    }

    #[async_trait]
    impl NotifyAdapter for FakeNotifyAdapter {
        async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
            let mut state = self.inner.lock();
            state.calls.push(notification.clone());
            if state.fail {
                return Err(NotifyError::SendFailed("injected failure".to_string()));
            }
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeNotifyAdapter;

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
