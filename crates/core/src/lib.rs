// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(feature = "test-support", allow(clippy::panic))]

//! fab-core: data model for the FPGA image build orchestrator

pub mod macros;

pub mod artifact;
pub mod fleet;
pub mod hwdb;
pub mod image;
pub mod job;
pub mod notification;
pub mod stage;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use artifact::{ArtifactSet, DeployLayout};
pub use fleet::{FleetConfig, FleetConfigBuilder, FleetError, HostKeyPolicy, PollConfig};
pub use hwdb::HwdbEntry;
pub use image::{
    CloudImage, ImageDescription, ImageIds, ImageState, StorageKey, TagError, MAX_TAG_LEN,
};
pub use job::{BuildJob, BuildJobBuilder, HostAddr, Triplet};
pub use notification::Notification;
pub use stage::{BuildOutcome, Stage};
