use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    #[serde(default = "default_audio_feedback")]
    pub audio_feedback: bool,

    #[serde(default = "default_capture_sound")]
    pub capture_sound_path: String,

    #[serde(default = "default_pair_sound")]
    pub pair_sound_path: String,

    /// Shell command run after each successful export
    #[serde(default)]
    pub post_export_hook: Option<String>,
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_audio_feedback() -> bool {
    true
}

fn default_capture_sound() -> String {
    "beep.wav".to_string()
}

fn default_pair_sound() -> String {
    "beep-double.wav".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            export_dir: default_export_dir(),
            audio_feedback: default_audio_feedback(),
            capture_sound_path: default_capture_sound(),
            pair_sound_path: default_pair_sound(),
            post_export_hook: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.config/pairscan/config.json)
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!(
                "Config file not found at {:?}, creating default config",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config = Self::from_json(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        tracing::info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Saved config to {:?}", config_path);
        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(dir)
        } else {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        };

        Ok(config_dir.join("pairscan").join("config.json"))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.export_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("export_dir cannot be empty"));
        }

        if self.audio_feedback
            && (self.capture_sound_path.is_empty() || self.pair_sound_path.is_empty())
        {
            return Err(anyhow::anyhow!(
                "sound paths cannot be empty while audio_feedback is enabled"
            ));
        }

        if let Some(hook) = &self.post_export_hook {
            if hook.trim().is_empty() {
                return Err(anyhow::anyhow!("post_export_hook cannot be blank"));
            }
        }

        Ok(())
    }
}
