// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cloud FPGA image registration types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::job::HostAddr;

/// Provider limit on each descriptive tag.
pub const MAX_TAG_LEN: usize = 255;

/// Length of the random part of an upload key.
pub const KEY_SUFFIX_LEN: usize = 10;

const KEY_SUFFIX_ALPHABET: [char; 36] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S',
    'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Lifecycle state reported by the provider for an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageState {
    Pending,
    Available,
    /// Any other terminal code (`failed`, `unavailable`, ...).
    Failed(String),
}

impl ImageState {
    pub fn from_code(code: &str) -> Self {
        match code {
            "pending" => ImageState::Pending,
            "available" => ImageState::Available,
            other => ImageState::Failed(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ImageState::Pending)
    }

    /// The provider's state code.
    pub fn code(&self) -> &str {
        match self {
            ImageState::Pending => "pending",
            ImageState::Available => "available",
            ImageState::Failed(code) => code,
        }
    }
}

impl fmt::Display for ImageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A descriptive tag exceeded [`MAX_TAG_LEN`].
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{tag} tag is {len} characters, limit is {MAX_TAG_LEN}")]
pub struct TagError {
    pub tag: &'static str,
    pub len: usize,
}

/// Image description built from the build, deploy and commit tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescription {
    build_triplet: String,
    deploy_triplet: String,
    commit: String,
}

impl ImageDescription {
    pub fn new(
        build_triplet: impl Into<String>,
        deploy_triplet: impl Into<String>,
        commit: impl Into<String>,
    ) -> Result<Self, TagError> {
        let desc = Self {
            build_triplet: build_triplet.into(),
            deploy_triplet: deploy_triplet.into(),
            commit: commit.into(),
        };
        for (tag, value) in [
            ("buildtriplet", &desc.build_triplet),
            ("deploytriplet", &desc.deploy_triplet),
            ("commit", &desc.commit),
        ] {
            let len = value.chars().count();
            if len > MAX_TAG_LEN {
                return Err(TagError { tag, len });
            }
        }
        Ok(desc)
    }

    pub fn build_triplet(&self) -> &str {
        &self.build_triplet
    }

    pub fn deploy_triplet(&self) -> &str {
        &self.deploy_triplet
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }
}

impl fmt::Display for ImageDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "firesim-buildtriplet:{},firesim-deploytriplet:{},firesim-commit:{}",
            self.build_triplet, self.deploy_triplet, self.commit
        )
    }
}

/// Object-storage key for an uploaded synthesis archive.
///
/// Two hosts may build identically named jobs at the same moment, so the
/// key carries the host address and a random suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    pub const PREFIX: &'static str = "dcp/";

    /// `dcp/<archive>-<host>-<SUFFIX>.tar`
    pub fn generate(archive_name: &str, host: &HostAddr) -> Self {
        Self::with_suffix(archive_name, host, &random_suffix())
    }

    pub fn with_suffix(archive_name: &str, host: &HostAddr, suffix: &str) -> Self {
        Self(format!("{}{}-{}-{}.tar", Self::PREFIX, archive_name, host, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Uppercase alphanumeric suffix from the OS random source.
pub fn random_suffix() -> String {
    nanoid::nanoid!(KEY_SUFFIX_LEN, &KEY_SUFFIX_ALPHABET)
}

/// Identifiers returned by a successful image creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageIds {
    pub image_id: String,
    pub global_image_id: String,
}

/// A registered image and its last observed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudImage {
    pub archive: PathBuf,
    pub key: StorageKey,
    pub ids: ImageIds,
    pub description: ImageDescription,
    state: ImageState,
}

impl CloudImage {
    pub fn new(
        archive: PathBuf,
        key: StorageKey,
        ids: ImageIds,
        description: ImageDescription,
    ) -> Self {
        Self { archive, key, ids, description, state: ImageState::Pending }
    }

    pub fn state(&self) -> &ImageState {
        &self.state
    }

    /// Record a polled state. Terminal states are final; later observations
    /// are ignored and `false` is returned.
    pub fn observe(&mut self, state: ImageState) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = state;
        true
    }
}

#[cfg(test)]
#[path = "image_tests.rs"]
mod tests;
