// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Custom error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to flush logs before the process ends.

use std::fmt;

/// At least one job finished in failure.
pub const BUILD_FAILED: i32 = 1;
/// The recipe could not be loaded or is invalid.
pub const INVALID_RECIPE: i32 = 2;
/// The run was interrupted (SIGINT).
pub const INTERRUPTED: i32 = 130;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn invalid_recipe(err: impl fmt::Display) -> Self {
        Self::new(INVALID_RECIPE, format!("invalid recipe: {}", err))
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

/// Process exit code for a command result.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<ExitError>().map_or(1, |e| e.code)
}
