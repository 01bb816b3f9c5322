//! Compose a skill's client-facing document: descriptor body, invocation
//! instructions, and one subsection per entry point with its argument schema.

use crate::error::SkillError;
use crate::exec::ScriptRunner;
use crate::skills::schema::extract_schema;
use crate::skills::store::SkillStore;

/// Shown instead of the per-script sections when a unit has no entry points.
const NO_SCRIPTS_NOTICE: &str = "No runnable python scripts found in this skill.";

/// Render the full document for one skill. Schemas are extracted fresh on
/// every call; nothing is cached.
pub async fn render_skill(
    store: &SkillStore,
    runner: &dyn ScriptRunner,
    name: &str,
) -> Result<String, SkillError> {
    let skill_dir = store.resolve(name)?;
    let descriptor = store.read_descriptor(name)?;
    let scripts = store.list_scripts(name)?;

    let mut lines: Vec<String> = vec![
        descriptor,
        String::new(),
        "## Tool Invocation".to_string(),
        String::new(),
    ];

    if scripts.is_empty() {
        lines.push(NO_SCRIPTS_NOTICE.to_string());
        return Ok(lines.join("\n").trim().to_string());
    }

    lines.push("Use `skills.run(skill_name, script_name, argv)` to execute a script.".to_string());
    lines.push(String::new());

    for script in &scripts {
        let schema = extract_schema(runner, script, &skill_dir).await?;
        let file_name = script
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let stem = script
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        lines.push(format!("### {}", file_name));
        lines.push(String::new());
        lines.push(format!("- skill_name: `{}`", name));
        lines.push(format!("- script_name: `{}`", stem));
        lines.push("- argv: list of CLI arguments".to_string());
        lines.push("- stdin: optional text passed to process stdin".to_string());
        lines.push(String::new());
        if let Some(schema) = schema {
            lines.push("Argument schema:".to_string());
            lines.push("```json".to_string());
            lines.push(schema.to_pretty());
            lines.push("```".to_string());
            lines.push(String::new());
        }
    }

    Ok(lines.join("\n").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{ExecutionResult, RunSpec};
    use async_trait::async_trait;
    use std::fs;
    use tempfile::TempDir;

    /// Emits the same schema output for every script.
    struct FixedOutputRunner {
        stdout: String,
    }

    #[async_trait]
    impl ScriptRunner for FixedOutputRunner {
        async fn run(&self, _spec: RunSpec) -> Result<ExecutionResult, SkillError> {
            Ok(ExecutionResult {
                command: vec!["fake".to_string()],
                returncode: 0,
                stdout: self.stdout.clone(),
                stderr: String::new(),
            })
        }
    }

    fn make_skill(tmp: &TempDir, scripts: &[&str]) -> SkillStore {
        let dir = tmp.path().join("demo");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("SKILL.md"), "desc line\nmore body").unwrap();
        for s in scripts {
            fs::write(dir.join(s), "").unwrap();
        }
        SkillStore::new(tmp.path())
    }

    #[tokio::test]
    async fn renders_script_sections_with_pretty_schema() {
        let tmp = TempDir::new().unwrap();
        let store = make_skill(&tmp, &["main.py"]);
        let runner = FixedOutputRunner {
            stdout: "{\"type\": \"object\"}".to_string(),
        };

        let text = render_skill(&store, &runner, "demo").await.unwrap();

        assert!(text.starts_with("desc line\nmore body"));
        assert!(text.contains("## Tool Invocation"));
        assert!(text.contains("### main.py"));
        assert!(text.contains("- skill_name: `demo`"));
        assert!(text.contains("- script_name: `main`"));
        assert!(text.contains("Argument schema:"));
        // Structured schemas are pretty-printed, not left on one line.
        assert!(text.contains("{\n  \"type\": \"object\"\n}"));
    }

    #[tokio::test]
    async fn raw_schema_is_included_literally() {
        let tmp = TempDir::new().unwrap();
        let store = make_skill(&tmp, &["main.py"]);
        let runner = FixedOutputRunner {
            stdout: "usage: main.py [--a A]".to_string(),
        };

        let text = render_skill(&store, &runner, "demo").await.unwrap();
        assert!(text.contains("usage: main.py [--a A]"));
    }

    #[tokio::test]
    async fn absent_schema_omits_the_section() {
        let tmp = TempDir::new().unwrap();
        let store = make_skill(&tmp, &["main.py"]);
        let runner = FixedOutputRunner {
            stdout: String::new(),
        };

        let text = render_skill(&store, &runner, "demo").await.unwrap();
        assert!(text.contains("### main.py"));
        assert!(!text.contains("Argument schema:"));
    }

    #[tokio::test]
    async fn no_scripts_notice() {
        let tmp = TempDir::new().unwrap();
        let store = make_skill(&tmp, &[]);
        let runner = FixedOutputRunner {
            stdout: String::new(),
        };

        let text = render_skill(&store, &runner, "demo").await.unwrap();
        assert!(text.contains(NO_SCRIPTS_NOTICE));
        assert!(!text.contains("###"));
    }
}
