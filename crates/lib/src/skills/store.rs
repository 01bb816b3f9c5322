//! Skill unit discovery: scan a root directory for subdirectories containing
//! a SKILL.md descriptor, read descriptors, and enumerate runnable scripts.

use std::path::{Path, PathBuf};

use crate::error::SkillError;

/// Marker descriptor file; a directory without it is not a skill unit.
pub const SKILL_MARKDOWN: &str = "SKILL.md";

/// Extension of runnable entry points.
pub const SCRIPT_EXTENSION: &str = "py";

/// Package-init file, never listed as an entry point.
const INIT_FILE: &str = "__init__.py";

/// Files starting with this prefix are internal to the skill and excluded
/// from enumeration (but still runnable by exact name, see the broker).
const PRIVATE_PREFIX: char = '_';

/// A discovered skill unit: directory basename + path.
#[derive(Debug, Clone)]
pub struct SkillUnit {
    pub name: String,
    pub path: PathBuf,
}

/// Read-only view over a skills root directory. The root is provided at
/// construction (from config); the store never creates or deletes units.
#[derive(Debug, Clone)]
pub struct SkillStore {
    root: PathBuf,
}

impl SkillStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All valid skill units directly under the root, sorted by name.
    /// A missing root yields an empty list, not an error. No recursion.
    pub fn list_units(&self) -> Vec<SkillUnit> {
        let read_dir = match std::fs::read_dir(&self.root) {
            Ok(d) => d,
            Err(_) => return Vec::new(),
        };
        let mut units: Vec<SkillUnit> = read_dir
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if !path.is_dir() || !path.join(SKILL_MARKDOWN).exists() {
                    return None;
                }
                let name = path.file_name()?.to_str()?.to_string();
                Some(SkillUnit { name, path })
            })
            .collect();
        units.sort_by(|a, b| a.name.cmp(&b.name));
        units
    }

    /// Resolve a skill name to its directory. Names are plain directory
    /// basenames; anything with path separators or `..` is rejected.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, SkillError> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(SkillError::NotFound(name.to_string()));
        }
        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Err(SkillError::NotFound(name.to_string()));
        }
        if !dir.join(SKILL_MARKDOWN).exists() {
            return Err(SkillError::MissingDescriptor(name.to_string()));
        }
        Ok(dir)
    }

    /// Full descriptor text, trimmed. Fails when empty after trimming.
    pub fn read_descriptor(&self, name: &str) -> Result<String, SkillError> {
        let raw = self.read_descriptor_raw(name)?;
        Ok(raw.trim().to_string())
    }

    /// One-line summary: the first line of the descriptor. A descriptor whose
    /// first line is blank fails even when later lines have content.
    pub fn summary(&self, name: &str) -> Result<String, SkillError> {
        let raw = self.read_descriptor_raw(name)?;
        let first = raw.lines().next().unwrap_or("").trim();
        if first.is_empty() {
            return Err(SkillError::EmptySummary(name.to_string()));
        }
        Ok(first.to_string())
    }

    fn read_descriptor_raw(&self, name: &str) -> Result<String, SkillError> {
        let dir = self.resolve(name)?;
        let path = dir.join(SKILL_MARKDOWN);
        let raw = std::fs::read_to_string(&path).map_err(|e| SkillError::io(&path, e))?;
        if raw.trim().is_empty() {
            return Err(SkillError::EmptyDescriptor(name.to_string()));
        }
        Ok(raw)
    }

    /// Runnable entry points directly inside the unit directory, sorted by
    /// filename. Excludes the package-init file and `_`-prefixed internals.
    pub fn list_scripts(&self, name: &str) -> Result<Vec<PathBuf>, SkillError> {
        let dir = self.resolve(name)?;
        let read_dir = std::fs::read_dir(&dir).map_err(|e| SkillError::io(&dir, e))?;
        let mut scripts: Vec<PathBuf> = read_dir
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if !path.is_file() {
                    return None;
                }
                if path.extension().and_then(|e| e.to_str()) != Some(SCRIPT_EXTENSION) {
                    return None;
                }
                let file_name = path.file_name()?.to_str()?;
                if file_name == INIT_FILE || file_name.starts_with(PRIVATE_PREFIX) {
                    return None;
                }
                Some(path)
            })
            .collect();
        scripts.sort();
        Ok(scripts)
    }
}
