//! Command program parsing.
//!
//! A program is UTF-8 text: `//` line comments followed by a JSON array
//! of command-name strings. Unknown tokens fail the parse outright.

use crate::Command;

pub const DEFAULT_PROGRAM_SOURCE: &str =
    "// robot program\n[\"FORWARD\", \"FORWARD\", \"TURN_LEFT\", \"WAIT\", \"FORWARD\"]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramError {
    pub message: String,
}

impl std::fmt::Display for ProgramError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid command program: {}", self.message)
    }
}

impl std::error::Error for ProgramError {}

/// Cuts each line at the first `//`, matching the reference editor's
/// comment convention (command arrays never contain `//` in data).
pub fn strip_line_comments(source: &str) -> String {
    source
        .lines()
        .map(|line| line.find("//").map_or(line, |at| &line[..at]))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn parse_program(source: &str) -> Result<Vec<Command>, ProgramError> {
    let stripped = strip_line_comments(source);
    serde_json::from_str(stripped.trim()).map_err(|err| ProgramError {
        message: err.to_string(),
    })
}
