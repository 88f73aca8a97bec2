use crate::error::{CourseError, Result};
use crate::pipeline::EnhanceFailure;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILENAME: &str = "config.json";

pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENHANCE_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_CACHE_HIT_PAUSE_MS: u64 = 50;

/// Configuration for courseforge, stored as `config.json` in the data directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CourseConfig {
    /// Model for outlines, lesson drafts and diagrams
    #[serde(default = "default_text_model")]
    pub text_model: String,

    #[serde(default = "default_enhance_model")]
    pub enhance_model: String,

    #[serde(default = "default_image_model")]
    pub image_model: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Pause after each cached lesson during bulk jobs, in milliseconds
    #[serde(default = "default_cache_hit_pause_ms")]
    pub cache_hit_pause_ms: u64,

    #[serde(default)]
    pub enhance_failure: EnhanceFailure,

    /// Default author printed on ebook covers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

fn default_text_model() -> String {
    DEFAULT_TEXT_MODEL.to_string()
}

fn default_enhance_model() -> String {
    DEFAULT_ENHANCE_MODEL.to_string()
}

fn default_image_model() -> String {
    DEFAULT_IMAGE_MODEL.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_cache_hit_pause_ms() -> u64 {
    DEFAULT_CACHE_HIT_PAUSE_MS
}

impl Default for CourseConfig {
    fn default() -> Self {
        Self {
            text_model: default_text_model(),
            enhance_model: default_enhance_model(),
            image_model: default_image_model(),
            api_base: default_api_base(),
            cache_hit_pause_ms: DEFAULT_CACHE_HIT_PAUSE_MS,
            enhance_failure: EnhanceFailure::default(),
            author: None,
        }
    }
}

/// Keys accepted by `config <key> [value]`.
pub const CONFIG_KEYS: &[&str] = &[
    "text_model",
    "enhance_model",
    "image_model",
    "api_base",
    "cache_hit_pause_ms",
    "enhance_failure",
    "author",
];

impl CourseConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(CourseError::Io)?;
        let config: CourseConfig =
            serde_json::from_str(&content).map_err(CourseError::Serialization)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).map_err(CourseError::Io)?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(self).map_err(CourseError::Serialization)?;
        fs::write(config_path, content).map_err(CourseError::Io)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "text_model" => self.text_model.clone(),
            "enhance_model" => self.enhance_model.clone(),
            "image_model" => self.image_model.clone(),
            "api_base" => self.api_base.clone(),
            "cache_hit_pause_ms" => self.cache_hit_pause_ms.to_string(),
            "enhance_failure" => self.enhance_failure.to_string(),
            "author" => self.author.clone().unwrap_or_default(),
            other => return Err(unknown_key(other)),
        };
        Ok(value)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "text_model" => self.text_model = required(key, value)?,
            "enhance_model" => self.enhance_model = required(key, value)?,
            "image_model" => self.image_model = required(key, value)?,
            "api_base" => self.api_base = required(key, value)?,
            "cache_hit_pause_ms" => {
                self.cache_hit_pause_ms = value.parse().map_err(|_| {
                    CourseError::validation(format!(
                        "cache_hit_pause_ms must be a whole number of milliseconds, got '{}'",
                        value
                    ))
                })?
            }
            "enhance_failure" => self.enhance_failure = value.parse()?,
            "author" => self.author = (!value.is_empty()).then(|| value.to_string()),
            other => return Err(unknown_key(other)),
        }
        Ok(())
    }
}

fn required(key: &str, value: &str) -> Result<String> {
    if value.is_empty() {
        return Err(CourseError::validation(format!("{} cannot be empty", key)));
    }
    Ok(value.to_string())
}

fn unknown_key(key: &str) -> CourseError {
    CourseError::validation(format!(
        "Unknown config key '{}'. Available keys: {}",
        key,
        CONFIG_KEYS.join(", ")
    ))
}
