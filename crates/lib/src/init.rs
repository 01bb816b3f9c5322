//! Initialize the configuration directory: create ~/.satchel, the default
//! config, and the skills root seeded with the bundled sample skills.
//!
//! Layout mirrors `crates/lib/config/`: `config/skills/` → `~/.satchel/skills/`.

use anyhow::{Context, Result};
use include_dir::{include_dir, Dir};
use std::path::{Path, PathBuf};

use crate::config;

static BUNDLED_SKILLS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/config/skills");

/// Ensure the configuration directory has been initialized (config file and
/// skills root exist). Uses the skills root from config (or default).
pub fn require_initialized(config_path: &Path, config: &config::Config) -> Result<()> {
    if !config_path.exists() {
        anyhow::bail!(
            "configuration not initialized; run `satchel init` first (config file not found: {})",
            config_path.display()
        );
    }
    let skills_dir = config::resolve_skills_dir(config, config_path);
    if !skills_dir.exists() {
        anyhow::bail!(
            "configuration not initialized; run `satchel init` first (skills directory not found: {})",
            skills_dir.display()
        );
    }
    Ok(())
}

/// Create the config directory and default files if they do not exist.
/// - Creates the config directory (parent of config file path).
/// - Writes `config.json` with `{}` if missing.
/// - Extracts the bundled sample skills into the `skills` subdirectory if it does not exist.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        let default_config = b"{}";
        std::fs::write(config_path, default_config)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    }

    let skills_dir = config_dir.join("skills");
    if !skills_dir.exists() {
        std::fs::create_dir_all(&skills_dir)
            .with_context(|| format!("creating skills directory {}", skills_dir.display()))?;
        if let Err(e) = BUNDLED_SKILLS.extract(&skills_dir) {
            anyhow::bail!(
                "extracting bundled skills to {}: {}",
                skills_dir.display(),
                e
            );
        }
        log::info!("extracted bundled skills to {}", skills_dir.display());
    } else {
        log::debug!(
            "skills directory already exists at {}, skipping",
            skills_dir.display()
        );
    }

    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::SkillStore;
    use tempfile::TempDir;

    #[test]
    fn init_seeds_bundled_skills() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.json");

        init_config_dir(&config_path).unwrap();

        assert!(config_path.exists());
        let store = SkillStore::new(tmp.path().join("skills"));
        let names: Vec<String> = store.list_units().into_iter().map(|u| u.name).collect();
        assert_eq!(names, vec!["cal", "simple-memory"]);

        // Seeded units pass validation end to end.
        assert_eq!(store.summary("cal").unwrap(), "A simple calculator.");
        assert!(!store.list_scripts("simple-memory").unwrap().is_empty());
    }

    #[test]
    fn require_initialized_wants_config_and_skills() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.json");
        let config = crate::config::Config::default();

        assert!(require_initialized(&config_path, &config).is_err());

        init_config_dir(&config_path).unwrap();
        assert!(require_initialized(&config_path, &config).is_ok());
    }
}
