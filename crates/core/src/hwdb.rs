// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployable hardware-config (hwdb) records.

use std::fmt;

/// An INI fragment mapping a job name to its global image id.
///
/// Downstream deploy tooling concatenates these into its hardware database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HwdbEntry {
    pub name: String,
    pub global_image_id: String,
}

impl HwdbEntry {
    pub fn new(name: impl Into<String>, global_image_id: impl Into<String>) -> Self {
        Self { name: name.into(), global_image_id: global_image_id.into() }
    }
}

impl fmt::Display for HwdbEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]\nagfi={}\ndeploytripletoverride=None\ncustomruntimeconfig=None\n\n",
            self.name, self.global_image_id
        )
    }
}
