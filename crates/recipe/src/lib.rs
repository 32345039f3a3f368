// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fab-recipe: build recipe loading

pub mod parser;
pub mod template;

pub use parser::{
    leading_comment, load_recipe, parse_recipe, NotifyTarget, Overrides, Recipe, RecipeError,
    SshSettings,
};
