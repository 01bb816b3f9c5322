//! Argument-schema introspection: run an entry point with the schema flag set
//! and parse whatever it prints.

use std::path::Path;

use crate::error::SkillError;
use crate::exec::{RunSpec, ScriptRunner};

/// What an entry point declared about its arguments. Scripts are expected to
/// print JSON, but plain text degrades gracefully instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentSchema {
    Structured(serde_json::Value),
    Raw(String),
}

impl ArgumentSchema {
    /// Form used in rendered documents: pretty JSON for structured schemas,
    /// the literal text otherwise.
    pub fn to_pretty(&self) -> String {
        match self {
            Self::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            Self::Raw(text) => text.clone(),
        }
    }
}

/// Run `script` in introspection mode and parse its output.
///
/// Stdin is closed for this call, so introspection can never block on input.
/// `Ok(None)` means the script declared no schema (empty stdout). Only a
/// nonzero exit is an error; non-JSON output falls back to raw text.
pub async fn extract_schema(
    runner: &dyn ScriptRunner,
    script: &Path,
    skill_dir: &Path,
) -> Result<Option<ArgumentSchema>, SkillError> {
    let result = runner
        .run(RunSpec {
            project_dir: skill_dir.to_path_buf(),
            script: script.to_path_buf(),
            argv: Vec::new(),
            stdin: None,
            emit_schema: true,
        })
        .await?;

    if result.returncode != 0 {
        let script_name = script
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("script")
            .to_string();
        return Err(SkillError::SchemaExtraction {
            script: script_name,
            stderr: result.stderr.trim().to_string(),
        });
    }

    let output = result.stdout.trim();
    if output.is_empty() {
        return Ok(None);
    }
    match serde_json::from_str(output) {
        Ok(value) => Ok(Some(ArgumentSchema::Structured(value))),
        Err(_) => Ok(Some(ArgumentSchema::Raw(output.to_string()))),
    }
}
