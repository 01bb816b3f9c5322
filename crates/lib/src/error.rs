//! Broker error taxonomy.
//!
//! These messages are part of the wire contract: the gateway forwards them to
//! clients verbatim and tooling pattern-matches on them, so the wording must
//! stay stable. A nonzero exit from a normally-run script is NOT an error —
//! it is reported inside [`crate::exec::ExecutionResult`].

use std::path::PathBuf;

use thiserror::Error;

use crate::skills::SKILL_MARKDOWN;

#[derive(Debug, Error)]
pub enum SkillError {
    /// The skill directory does not exist (or is not a directory).
    #[error("Skill not found: {0}")]
    NotFound(String),

    /// The directory exists but lacks the descriptor file.
    #[error("Skill missing {marker}: {0}", marker = SKILL_MARKDOWN)]
    MissingDescriptor(String),

    /// The descriptor exists but is empty after trimming.
    #[error("{0}/{marker} is empty", marker = SKILL_MARKDOWN)]
    EmptyDescriptor(String),

    /// The descriptor has content but its first line is blank.
    #[error("First line of {0}/{marker} must be a description", marker = SKILL_MARKDOWN)]
    EmptySummary(String),

    /// The named script file does not exist under the skill directory.
    #[error("Script not found in skill {skill}: {script}")]
    ScriptNotFound { skill: String, script: String },

    /// The introspection subprocess exited nonzero; carries its stderr.
    #[error("Failed to extract argument schema from {script}: {stderr}")]
    SchemaExtraction { script: String, stderr: String },

    /// The subprocess did not finish within the configured deadline.
    #[error("Script {script} timed out after {timeout_secs}s")]
    Timeout { script: String, timeout_secs: u64 },

    /// The subprocess could not be started at all (e.g. uv is not installed).
    /// Distinct from a normal nonzero exit, which is returned as data.
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading the skill tree or subprocess pipes failed.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SkillError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
