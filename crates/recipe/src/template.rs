// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment expansion in recipe string values

use regex::Regex;
use std::sync::LazyLock;

// ${VAR} or ${VAR:-default}
#[allow(clippy::expect_used)]
static ENV_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("constant regex pattern is valid")
});

/// Expand `${VAR}` and `${VAR:-default}` using `lookup`.
///
/// An unset variable without a default is left as written so the recipe
/// error names it.
pub fn expand_with(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    ENV_PATTERN
        .replace_all(value, |caps: &regex::Captures| {
            match (lookup(&caps[1]), caps.get(2)) {
                (Some(v), _) => v,
                (None, Some(default)) => default.as_str().to_string(),
                (None, None) => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// [`expand_with`] against the process environment.
pub fn expand_env(value: &str) -> String {
    expand_with(value, |name| std::env::var(name).ok())
}

/// First `${VAR}` reference still present after expansion.
pub fn unresolved(value: &str) -> Option<String> {
    ENV_PATTERN.captures(value).map(|caps| caps[1].to_string())
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
