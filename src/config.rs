use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::theme::ThemeMode;

pub const DEFAULT_TICK_MS: u64 = 1000;
const MIN_TICK_MS: u64 = 50;
const MAX_TICK_MS: u64 = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Runtime settings for the overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Shown above the splits (the `# heading` of the config file).
    pub title: Option<String>,
    pub ledger_path: PathBuf,
    /// Free-form personal best shown on the separator row, e.g. `35:22`.
    pub personal_best: Option<String>,
    pub tick_ms: u64,
    /// Wayland output to place the overlay on.
    pub screen: Option<String>,
    pub theme: ThemeMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: None,
            ledger_path: default_ledger_path(),
            personal_best: None,
            tick_ms: DEFAULT_TICK_MS,
            screen: None,
            theme: ThemeMode::Dark,
        }
    }
}

impl Config {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Read the config file (if present) and apply environment overrides.
    /// An unreadable file is reported and defaults are used instead.
    pub fn load() -> Self {
        let path = config_file_path();
        let mut config = match read_config(&path) {
            Ok(Some(config)) => {
                tracing::info!(path = %path.display(), "loaded config");
                config
            }
            Ok(None) => Config::default(),
            Err(e) => {
                tracing::warn!("{e}, using defaults");
                Config::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// `SPLIT_HUD_LEDGER` and `SPLIT_HUD_SCREEN` win over the file.
    pub fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = var("SPLIT_HUD_LEDGER").filter(|s| !s.is_empty()) {
            tracing::info!("ledger: {path} (from SPLIT_HUD_LEDGER)");
            self.ledger_path = expand_home(&path);
        }
        if let Some(name) = var("SPLIT_HUD_SCREEN").filter(|s| !s.is_empty()) {
            tracing::info!("target screen: {name} (from SPLIT_HUD_SCREEN)");
            self.screen = Some(name);
        }
    }
}

/// Return the path to the config file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("split-hud/config.md")
}

/// Where the splits file lives when nothing else is configured.
pub fn default_ledger_path() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join("split-hud/splits.json"),
        None => PathBuf::from("splits.json"),
    }
}

fn read_config(path: &Path) -> Result<Option<Config>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(parse_config(&content))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Parse the config file.
///
/// Format:
/// ```markdown
/// # Mega Man 2 Any% (Normal, Zipless)
/// - ledger: ~/splits/mm2.json
/// - pb: 35:22
/// - tick: 1000
/// - screen: DP-1
/// - theme: dark
/// ```
///
/// Every line is optional. The first `# heading` is the run title; keys
/// before or after it are accepted. Unknown keys and bad values are ignored.
pub fn parse_config(content: &str) -> Config {
    let mut config = Config::default();

    for line in content.lines() {
        let trimmed = line.trim();

        if let Some(heading) = trimmed.strip_prefix("# ") {
            let heading = heading.trim();
            if config.title.is_none() && !heading.is_empty() {
                config.title = Some(heading.to_string());
            }
            continue;
        }

        let Some((key, value)) = trimmed
            .strip_prefix("- ")
            .and_then(|rest| rest.split_once(':'))
        else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        match key.trim().to_lowercase().as_str() {
            "ledger" => config.ledger_path = expand_home(value),
            "pb" => config.personal_best = Some(value.to_string()),
            "tick" => {
                if let Ok(ms) = value.parse::<u64>() {
                    config.tick_ms = ms.clamp(MIN_TICK_MS, MAX_TICK_MS);
                }
            }
            "screen" => config.screen = Some(value.to_string()),
            "theme" => {
                if let Some(mode) = ThemeMode::from_name(value) {
                    config.theme = mode;
                }
            }
            other => tracing::debug!("ignoring unknown config key {other:?}"),
        }
    }

    config
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}
