// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator notifications sent at a job's terminal transition.

use crate::hwdb::HwdbEntry;
use crate::job::BuildJob;

pub const BUILD_FAILED_TITLE: &str = "FPGA Build Failed";
pub const BUILD_COMPLETED_TITLE: &str = "FPGA Build Completed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    /// Names the triplet and the host whose logs hold the details.
    pub fn build_failed(job: &BuildJob, reason: &str) -> Self {
        Self {
            title: BUILD_FAILED_TITLE.to_string(),
            body: format!(
                "Your FPGA build failed for triplet: {}.\nInspect the log output from IP address {} for more information.\nReason: {}",
                job.triplet(),
                job.host(),
                reason
            ),
        }
    }

    pub fn build_completed(entry: &HwdbEntry) -> Self {
        Self {
            title: BUILD_COMPLETED_TITLE.to_string(),
            body: format!(
                "Your AGFI has been created!\nAdd\n{}\nto your config_hwdb.ini to use this hardware configuration.",
                entry
            ),
        }
    }
}
