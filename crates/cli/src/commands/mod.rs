// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod build;
pub mod check;

use anyhow::{Context, Result};
use fab_recipe::Recipe;
use std::path::{Path, PathBuf};

use crate::exit_error::ExitError;

/// Load the recipe at `path` with environment and flag overrides applied.
/// Recipe errors exit with the invalid-recipe code.
pub fn load(path: &Path, deploy_dir: Option<PathBuf>) -> Result<Recipe> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().context("resolving current directory")?.join(path)
    };
    let recipe = fab_recipe::load_recipe(&path, &crate::env::overrides(deploy_dir))
        .map_err(ExitError::invalid_recipe)?;
    tracing::debug!(recipe = %path.display(), jobs = recipe.fleet.jobs().len(), "recipe loaded");
    Ok(recipe)
}
