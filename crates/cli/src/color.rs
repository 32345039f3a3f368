// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::builder::styling::{Ansi256Color, Color, Style, Styles};
use fab_core::BuildOutcome;
use std::io::IsTerminal;

pub mod codes {
    /// Section headers: steel blue
    pub const HEADER: u8 = 74;
    /// Commands, hosts and image ids: light grey
    pub const LITERAL: u8 = 250;
    /// Descriptions and paths: medium grey
    pub const CONTEXT: u8 = 245;
    /// Succeeded jobs: soft green
    pub const SUCCESS: u8 = 114;
    /// Failed jobs: soft red
    pub const FAILURE: u8 = 167;
}

/// Determine if color output should be enabled.
///
/// Priority: `NO_COLOR=1` disables → `COLOR=1` forces → TTY check.
pub fn should_colorize() -> bool {
    if std::env::var("NO_COLOR").is_ok_and(|v| v == "1") {
        return false;
    }
    if std::env::var("COLOR").is_ok_and(|v| v == "1") {
        return true;
    }
    std::io::stdout().is_terminal()
}

/// Build clap `Styles` using the project palette.
pub fn styles() -> Styles {
    if !should_colorize() {
        return Styles::plain();
    }
    Styles::styled()
        .header(Style::new().fg_color(Some(Color::Ansi256(Ansi256Color(codes::HEADER)))))
        .literal(Style::new().fg_color(Some(Color::Ansi256(Ansi256Color(codes::LITERAL)))))
        .placeholder(Style::new().fg_color(Some(Color::Ansi256(Ansi256Color(codes::CONTEXT)))))
}

fn paint(code: u8, text: &str) -> String {
    if should_colorize() {
        format!("\x1b[38;5;{code}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

pub fn header(text: &str) -> String {
    paint(codes::HEADER, text)
}

pub fn literal(text: &str) -> String {
    paint(codes::LITERAL, text)
}

pub fn context(text: &str) -> String {
    paint(codes::CONTEXT, text)
}

/// Outcome text colored by result.
pub fn outcome(outcome: &BuildOutcome) -> String {
    let code = match outcome {
        BuildOutcome::Failed { .. } => codes::FAILURE,
        BuildOutcome::Succeeded { .. } | BuildOutcome::Bypassed => codes::SUCCESS,
    };
    paint(code, &outcome.to_string())
}

#[cfg(test)]
#[path = "color_tests.rs"]
mod tests;
