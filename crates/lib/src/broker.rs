//! The broker facade: list, describe, and run operations over a skills root.
//!
//! Callers never invoke skill code directly; the gateway and CLI go through
//! these three operations. Every call re-reads the filesystem — there is no
//! cache, so concurrent requests share nothing but the read-only skill tree.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::error::SkillError;
use crate::exec::{ExecutionResult, RunSpec, ScriptRunner};
use crate::skills::{render_skill, SkillStore, SCRIPT_EXTENSION};

/// One row of the skill index: directory name + descriptor first line.
#[derive(Debug, Clone, Serialize)]
pub struct SkillSummary {
    pub name: String,
    pub description: String,
}

pub struct SkillBroker {
    store: SkillStore,
    runner: Arc<dyn ScriptRunner>,
}

impl SkillBroker {
    /// The root is explicit; there is no default derived from the install
    /// location. See [`crate::config::resolve_skills_dir`].
    pub fn new(root: impl Into<PathBuf>, runner: Arc<dyn ScriptRunner>) -> Self {
        Self {
            store: SkillStore::new(root),
            runner,
        }
    }

    pub fn store(&self) -> &SkillStore {
        &self.store
    }

    /// Name and one-line description for every valid unit under the root.
    pub fn list_skills_summary(&self) -> Result<Vec<SkillSummary>, SkillError> {
        self.store
            .list_units()
            .into_iter()
            .map(|unit| {
                Ok(SkillSummary {
                    description: self.store.summary(&unit.name)?,
                    name: unit.name,
                })
            })
            .collect()
    }

    /// Markdown index of all skills, used by the gateway and the CLI.
    pub fn skills_index(&self) -> Result<String, SkillError> {
        let summaries = self.list_skills_summary()?;
        if summaries.is_empty() {
            return Ok("No skills found.".to_string());
        }
        let mut lines = vec!["# Skills".to_string(), String::new()];
        for s in &summaries {
            lines.push(format!("- {}: {}", s.name, s.description));
        }
        Ok(lines.join("\n"))
    }

    /// Full client-facing document for one skill, schemas included.
    pub async fn render_skill_for_client(&self, name: &str) -> Result<String, SkillError> {
        render_skill(&self.store, self.runner.as_ref(), name).await
    }

    /// Run one script inside a skill with the given argv and optional stdin.
    ///
    /// Resolution is a direct existence check, independent of the enumeration
    /// filter: a `_`-prefixed script that never shows up in a rendered
    /// document can still be run by exact name. A nonzero exit is returned
    /// inside the result, never as an error.
    pub async fn run_skill_script(
        &self,
        skill_name: &str,
        script_name: &str,
        argv: Vec<String>,
        stdin: Option<String>,
    ) -> Result<ExecutionResult, SkillError> {
        let skill_dir = self.store.resolve(skill_name)?;
        let script_file = normalize_script_name(script_name);
        let script_path = skill_dir.join(&script_file);
        if has_path_components(script_name) || !script_path.is_file() {
            return Err(SkillError::ScriptNotFound {
                skill: skill_name.to_string(),
                script: script_file,
            });
        }
        log::debug!(
            "running {}/{} with {} arg(s)",
            skill_name,
            script_file,
            argv.len()
        );
        self.runner
            .run(RunSpec {
                project_dir: skill_dir,
                script: script_path,
                argv,
                stdin,
                emit_schema: false,
            })
            .await
    }
}

/// Append the script extension when the caller passed a bare stem.
fn normalize_script_name(script_name: &str) -> String {
    let suffix = format!(".{}", SCRIPT_EXTENSION);
    if script_name.ends_with(&suffix) {
        script_name.to_string()
    } else {
        format!("{}{}", script_name, suffix)
    }
}

/// Script names are plain filenames; reject anything that could escape the
/// skill directory.
fn has_path_components(script_name: &str) -> bool {
    script_name.contains('/') || script_name.contains('\\') || script_name.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Succeeds with exit 0 and echoes the invocation back as the command.
    struct RecordingRunner {
        last_spec: Mutex<Option<RunSpec>>,
    }

    impl RecordingRunner {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                last_spec: Mutex::new(None),
            })
        }

        fn last_spec(&self) -> RunSpec {
            self.last_spec.lock().unwrap().clone().unwrap()
        }
    }

    #[async_trait]
    impl ScriptRunner for RecordingRunner {
        async fn run(&self, spec: RunSpec) -> Result<ExecutionResult, SkillError> {
            let mut command = vec![spec.script.display().to_string()];
            command.extend(spec.argv.iter().cloned());
            *self.last_spec.lock().unwrap() = Some(spec);
            Ok(ExecutionResult {
                command,
                returncode: 0,
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    fn write_skill(root: &Path, name: &str, scripts: &[&str]) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("SKILL.md"), format!("The {} skill.", name)).unwrap();
        for s in scripts {
            fs::write(dir.join(s), "").unwrap();
        }
    }

    #[test]
    fn list_skills_summary_is_sorted() {
        let tmp = TempDir::new().unwrap();
        write_skill(tmp.path(), "notes", &[]);
        write_skill(tmp.path(), "cal", &[]);

        let broker = SkillBroker::new(tmp.path(), RecordingRunner::new());
        let summaries = broker.list_skills_summary().unwrap();
        let names: Vec<&str> = summaries.iter().map(|s| s.name.as_str()).collect();

        assert_eq!(names, vec!["cal", "notes"]);
        assert_eq!(summaries[0].description, "The cal skill.");
    }

    #[test]
    fn skills_index_renders_list_or_notice() {
        let tmp = TempDir::new().unwrap();
        let broker = SkillBroker::new(tmp.path(), RecordingRunner::new());
        assert_eq!(broker.skills_index().unwrap(), "No skills found.");

        write_skill(tmp.path(), "cal", &[]);
        let index = broker.skills_index().unwrap();
        assert!(index.starts_with("# Skills"));
        assert!(index.contains("- cal: The cal skill."));
    }

    #[tokio::test]
    async fn run_missing_script_fails() {
        let tmp = TempDir::new().unwrap();
        write_skill(tmp.path(), "cal", &["main.py"]);

        let broker = SkillBroker::new(tmp.path(), RecordingRunner::new());
        let err = broker
            .run_skill_script("cal", "nope", Vec::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, SkillError::ScriptNotFound { .. }));
        assert_eq!(err.to_string(), "Script not found in skill cal: nope.py");
    }

    #[tokio::test]
    async fn run_appends_extension_and_passes_argv_verbatim() {
        let tmp = TempDir::new().unwrap();
        write_skill(tmp.path(), "cal", &["main.py"]);

        let runner = RecordingRunner::new();
        let broker = SkillBroker::new(tmp.path(), runner.clone());
        let argv = vec!["--a".to_string(), "3".to_string(), "a b $HOME".to_string()];
        let result = broker
            .run_skill_script("cal", "main", argv.clone(), None)
            .await
            .unwrap();

        assert!(result.command[0].ends_with("main.py"));
        assert_eq!(&result.command[1..], argv.as_slice());

        let spec = runner.last_spec();
        assert!(!spec.emit_schema);
        assert!(spec.stdin.is_none());
        assert!(spec.project_dir.ends_with("cal"));
    }

    #[tokio::test]
    async fn run_pipes_stdin_through() {
        let tmp = TempDir::new().unwrap();
        write_skill(tmp.path(), "notes", &["save.py"]);

        let runner = RecordingRunner::new();
        let broker = SkillBroker::new(tmp.path(), runner.clone());
        broker
            .run_skill_script("notes", "save.py", Vec::new(), Some("note body".to_string()))
            .await
            .unwrap();

        assert_eq!(runner.last_spec().stdin.as_deref(), Some("note body"));
    }

    #[tokio::test]
    async fn private_scripts_are_runnable_but_not_listed() {
        let tmp = TempDir::new().unwrap();
        write_skill(tmp.path(), "cal", &["main.py", "_helper.py"]);

        let runner = RecordingRunner::new();
        let broker = SkillBroker::new(tmp.path(), runner);

        let listed = broker.store().list_scripts("cal").unwrap();
        assert_eq!(listed.len(), 1);

        // Run resolution checks existence directly, not the listing filter.
        assert!(broker
            .run_skill_script("cal", "_helper", Vec::new(), None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn run_rejects_script_names_with_path_components() {
        let tmp = TempDir::new().unwrap();
        write_skill(tmp.path(), "cal", &["main.py"]);
        fs::write(tmp.path().join("stray.py"), "").unwrap();

        let broker = SkillBroker::new(tmp.path(), RecordingRunner::new());
        let err = broker
            .run_skill_script("cal", "../stray", Vec::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SkillError::ScriptNotFound { .. }));
    }
}
