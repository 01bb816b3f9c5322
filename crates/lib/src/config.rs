//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.satchel/config.json`) and
//! environment. The skills root and subprocess limits live here so nothing
//! in the broker depends on the install location.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Skills root override.
    #[serde(default)]
    pub skills: SkillsConfig,

    /// Subprocess runner settings.
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Gateway bind, port, and auth settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP and WebSocket (default 15252).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// Auth settings. When absent, defaults to no auth for loopback bind.
    #[serde(default)]
    pub auth: GatewayAuthConfig,
}

/// Gateway auth: token or none (loopback-only when none).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayAuthConfig {
    /// "none" = no shared secret (only safe when bind is loopback). "token" = require connect.auth.token.
    #[serde(default)]
    pub mode: GatewayAuthMode,

    /// Shared secret for WebSocket connect. Overridden by SATCHEL_GATEWAY_TOKEN env.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayAuthMode {
    /// No auth; allow only when bind is loopback.
    #[default]
    None,

    /// Require connect.auth.token to match configured token.
    Token,
}

fn default_gateway_port() -> u16 {
    15252
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            auth: GatewayAuthConfig::default(),
        }
    }
}

/// Skills root config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillsConfig {
    /// Override the default skills root. If set, skills are discovered in this
    /// directory instead of the config directory's `skills` subdirectory.
    /// Relative paths are resolved against the config file's parent.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

/// Subprocess runner config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerConfig {
    /// The uv binary used to run scripts in each skill's own environment.
    #[serde(default = "default_uv_bin")]
    pub uv_bin: String,

    /// Deadline for a single script run or schema extraction, in seconds.
    /// A hung script is killed when this expires. 0 disables the deadline.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_uv_bin() -> String {
    "uv".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            uv_bin: default_uv_bin(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RunnerConfig {
    /// Deadline as a Duration; None when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }
}

/// Resolve the gateway token: env SATCHEL_GATEWAY_TOKEN overrides config.
pub fn resolve_gateway_token(config: &Config) -> Option<String> {
    std::env::var("SATCHEL_GATEWAY_TOKEN")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .gateway
                .auth
                .token
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "127.0.0.1" || b == "::1" || b == "localhost"
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("SATCHEL_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".satchel").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or SATCHEL_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used (for resolving the config directory).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Default skills root when no override is set: `skills` subdirectory of the config file's parent.
pub fn skills_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join("skills")
}

/// Resolve the skills root: uses `config.skills.directory` if set (relative paths resolved against the config file's parent), otherwise the default `skills` subdirectory.
pub fn resolve_skills_dir(config: &Config, config_path: &Path) -> PathBuf {
    let config_parent = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    match &config.skills.directory {
        Some(d) if !d.as_os_str().is_empty() => {
            if d.is_absolute() {
                d.clone()
            } else {
                config_parent.join(d)
            }
        }
        _ => skills_dir(config_path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gateway_port_and_bind() {
        let g = GatewayConfig::default();
        assert_eq!(g.port, 15252);
        assert_eq!(g.bind, "127.0.0.1");
    }

    #[test]
    fn default_runner_has_a_deadline() {
        let r = RunnerConfig::default();
        assert_eq!(r.uv_bin, "uv");
        assert_eq!(r.timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn zero_timeout_disables_the_deadline() {
        let r: RunnerConfig = serde_json::from_str(r#"{"timeoutSecs": 0}"#).unwrap();
        assert_eq!(r.timeout(), None);
    }

    #[test]
    fn resolve_skills_dir_default() {
        let config = Config::default();
        let path = Path::new("/home/user/.satchel/config.json");
        assert_eq!(
            resolve_skills_dir(&config, path),
            PathBuf::from("/home/user/.satchel/skills")
        );
    }

    #[test]
    fn resolve_skills_dir_override_relative() {
        let mut config = Config::default();
        config.skills.directory = Some(PathBuf::from("custom/skills"));
        let path = Path::new("/home/user/.satchel/config.json");
        assert_eq!(
            resolve_skills_dir(&config, path),
            PathBuf::from("/home/user/.satchel/custom/skills")
        );
    }

    #[test]
    fn resolve_skills_dir_override_absolute() {
        let mut config = Config::default();
        config.skills.directory = Some(PathBuf::from("/repo/skills"));
        let path = Path::new("/home/user/.satchel/config.json");
        assert_eq!(
            resolve_skills_dir(&config, path),
            PathBuf::from("/repo/skills")
        );
    }
}
