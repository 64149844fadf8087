use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::notify::desktop;
use crate::settings::NotificationSettings;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub sinks: SinksConfig,
}

#[derive(Debug, Deserialize)]
pub struct TasksConfig {
    /// JSON task list maintained by the task application.
    #[serde(default = "default_tasks_path")]
    pub path: String,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            path: default_tasks_path(),
        }
    }
}

fn default_tasks_path() -> String {
    "~/.duebell/tasks.json".to_string()
}

impl TasksConfig {
    pub fn resolved_path(&self) -> PathBuf {
        expand_tilde(&self.path)
    }
}

#[derive(Debug, Deserialize)]
pub struct SinksConfig {
    #[serde(default = "default_true")]
    pub console: bool,
    #[serde(default)]
    pub desktop: bool,
    #[serde(default = "default_desktop_program")]
    pub desktop_program: String,
}

impl Default for SinksConfig {
    fn default() -> Self {
        Self {
            console: true,
            desktop: false,
            desktop_program: default_desktop_program(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_desktop_program() -> String {
    desktop::DEFAULT_PROGRAM.to_string()
}

fn default_base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".duebell")
}

pub fn load(path: &str) -> Result<Config> {
    let path = expand_tilde(path);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

const DEFAULT_CONFIG: &str = r#"[notifications]
enabled = true
# Minutes before the due time: 30 min, 1 hour, 1 day
lead_minutes = [30, 60, 1440]
digest_enabled = true
# Local time of the morning summary (HH:MM)
digest_time = "09:30"
sound_enabled = true

[tasks]
path = "~/.duebell/tasks.json"

[sinks]
console = true
# Desktop notifications through notify-send (or a compatible program)
desktop = false
desktop_program = "notify-send"
"#;

/// Create `~/.duebell/` with a default config and an empty task list.
/// Existing files are left alone.
pub async fn init_config_dir() -> Result<PathBuf> {
    let base = default_base_dir();
    tokio::fs::create_dir_all(&base).await?;

    let config_path = base.join("config.toml");
    if !config_path.exists() {
        tokio::fs::write(&config_path, DEFAULT_CONFIG).await?;
    }

    let tasks_path = base.join("tasks.json");
    if !tasks_path.exists() {
        tokio::fs::write(&tasks_path, "[]\n").await?;
    }

    Ok(base)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
