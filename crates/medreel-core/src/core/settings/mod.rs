//! Settings Persistence System
//!
//! Provides persistent pipeline settings with:
//! - Atomic file writes (temp file + rename)
//! - Per-field defaults so partial files stay valid
//! - Normalization of out-of-range values instead of hard failures
//!
//! Storage location: {config_dir}/medreel/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::core::{CoreError, CoreResult};

/// Settings schema version for migration support
pub const SETTINGS_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE: &str = "settings.json";

/// Application directory name under the platform config dir
pub const APP_DIR_NAME: &str = "medreel";

/// Pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSettings {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    /// Text-generation service settings
    #[serde(default)]
    pub text_generation: TextGenerationSettings,

    /// Video-synthesis service settings
    #[serde(default)]
    pub video_render: VideoRenderSettings,

    /// Completion polling settings
    #[serde(default)]
    pub polling: PollingSettings,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            text_generation: TextGenerationSettings::default(),
            video_render: VideoRenderSettings::default(),
            polling: PollingSettings::default(),
        }
    }
}

impl PipelineSettings {
    /// Normalizes and clamps settings so persisted state is always valid.
    pub fn normalize(&mut self) {
        self.version = SETTINGS_VERSION;

        let text = &mut self.text_generation;
        if text.base_url.trim().is_empty() {
            text.base_url = default_text_base_url();
        }
        if text.model.trim().is_empty() {
            text.model = default_text_model();
        }
        text.script_max_tokens = text.script_max_tokens.clamp(16, 4096);
        text.visuals_max_tokens = text.visuals_max_tokens.clamp(16, 1024);
        text.timeout_secs = text.timeout_secs.clamp(5, 600);

        let video = &mut self.video_render;
        if video.base_url.trim().is_empty() {
            video.base_url = default_video_base_url();
        }
        if video.avatar_id.trim().is_empty() {
            video.avatar_id = default_avatar_id();
        }
        if video.voice_id.trim().is_empty() {
            video.voice_id = default_voice_id();
        }
        if !is_hex_color(&video.background_color) {
            warn!(
                "Invalid background color '{}', using default",
                video.background_color
            );
            video.background_color = default_background_color();
        }
        video.width = video.width.clamp(128, 3840);
        video.height = video.height.clamp(128, 3840);
        video.timeout_secs = video.timeout_secs.clamp(5, 600);

        self.polling.interval_secs = self.polling.interval_secs.clamp(1, 300);
        self.polling.max_attempts = self.polling.max_attempts.clamp(1, 10_000);
    }
}

// =============================================================================
// Text Generation
// =============================================================================

#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextGenerationSettings {
    /// Chat-completions API base URL
    #[serde(default = "default_text_base_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_text_model")]
    pub model: String,

    /// Token cap for the narration script (300 chars + buffer)
    #[serde(default = "default_script_max_tokens")]
    pub script_max_tokens: u32,

    /// Token cap for the visual label suggestions
    #[serde(default = "default_visuals_max_tokens")]
    pub visuals_max_tokens: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,

    /// Fallback API key when OPENROUTER_API_KEY is not set
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_text_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}
fn default_text_model() -> String {
    "mistralai/mistral-7b-instruct".to_string()
}
fn default_script_max_tokens() -> u32 {
    350
}
fn default_visuals_max_tokens() -> u32 {
    100
}
fn default_request_timeout() -> u64 {
    60
}

impl Default for TextGenerationSettings {
    fn default() -> Self {
        Self {
            base_url: default_text_base_url(),
            model: default_text_model(),
            script_max_tokens: default_script_max_tokens(),
            visuals_max_tokens: default_visuals_max_tokens(),
            timeout_secs: default_request_timeout(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for TextGenerationSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextGenerationSettings")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("script_max_tokens", &self.script_max_tokens)
            .field("visuals_max_tokens", &self.visuals_max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

// =============================================================================
// Video Render
// =============================================================================

#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoRenderSettings {
    /// Video-synthesis API base URL
    #[serde(default = "default_video_base_url")]
    pub base_url: String,

    /// Avatar speaking the narration
    #[serde(default = "default_avatar_id")]
    pub avatar_id: String,

    #[serde(default = "default_avatar_style")]
    pub avatar_style: String,

    /// Narration voice
    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    /// Solid background color (#RRGGBB)
    #[serde(default = "default_background_color")]
    pub background_color: String,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,

    /// Fallback API key when HEYGEN_API_KEY is not set
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_video_base_url() -> String {
    "https://api.heygen.com".to_string()
}
fn default_avatar_id() -> String {
    "Daisy-inskirt-20220818".to_string()
}
fn default_avatar_style() -> String {
    "normal".to_string()
}
fn default_voice_id() -> String {
    "2d5b0e6cf36f460aa7fc47e3eee4ba54".to_string()
}
fn default_background_color() -> String {
    "#008000".to_string()
}
fn default_width() -> u32 {
    1280
}
fn default_height() -> u32 {
    720
}

impl Default for VideoRenderSettings {
    fn default() -> Self {
        Self {
            base_url: default_video_base_url(),
            avatar_id: default_avatar_id(),
            avatar_style: default_avatar_style(),
            voice_id: default_voice_id(),
            background_color: default_background_color(),
            width: default_width(),
            height: default_height(),
            timeout_secs: default_request_timeout(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for VideoRenderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoRenderSettings")
            .field("base_url", &self.base_url)
            .field("avatar_id", &self.avatar_id)
            .field("avatar_style", &self.avatar_style)
            .field("voice_id", &self.voice_id)
            .field("background_color", &self.background_color)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("timeout_secs", &self.timeout_secs)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

// =============================================================================
// Polling
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PollingSettings {
    /// Delay between status checks
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,

    /// Status checks before the run is reported as timed out
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_poll_interval() -> u64 {
    5
}
fn default_max_attempts() -> u32 {
    180
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn is_hex_color(value: &str) -> bool {
    let Some(hex) = value.strip_prefix('#') else {
        return false;
    };
    hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

// =============================================================================
// Settings Manager
// =============================================================================

/// Loads and saves [`PipelineSettings`] as JSON
#[derive(Debug, Clone)]
pub struct SettingsManager {
    settings_path: PathBuf,
}

impl SettingsManager {
    /// Creates a manager rooted at `config_dir`
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self {
            settings_path: config_dir.as_ref().join(SETTINGS_FILE),
        }
    }

    /// Creates a manager at an explicit settings file path
    pub fn at_path(settings_path: impl Into<PathBuf>) -> Self {
        Self {
            settings_path: settings_path.into(),
        }
    }

    /// Creates a manager in the platform config directory
    pub fn default_location() -> CoreResult<Self> {
        let base = dirs::config_dir().ok_or_else(|| {
            CoreError::Internal("Could not determine platform config directory".to_string())
        })?;
        Ok(Self::new(base.join(APP_DIR_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    /// Loads settings, falling back to defaults when the file is missing or
    /// unreadable.
    pub fn load(&self) -> PipelineSettings {
        match self.try_load() {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                PipelineSettings::default()
            }
        }
    }

    /// Loads settings, surfacing parse errors to the caller.
    pub fn try_load(&self) -> CoreResult<PipelineSettings> {
        if !self.settings_path.exists() {
            info!("Settings file not found, using defaults");
            return Ok(PipelineSettings::default());
        }

        let content = fs::read_to_string(&self.settings_path)?;
        let mut settings: PipelineSettings = serde_json::from_str(&content)?;

        if settings.version < SETTINGS_VERSION {
            info!(
                "Migrating settings from version {} to {}",
                settings.version, SETTINGS_VERSION
            );
        }

        settings.normalize();
        Ok(settings)
    }

    /// Saves settings atomically and returns the normalized copy.
    pub fn save(&self, settings: &PipelineSettings) -> CoreResult<PipelineSettings> {
        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut normalized = settings.clone();
        normalized.normalize();

        let content = serde_json::to_string_pretty(&normalized)?;

        let temp_path = self.settings_path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        // std::fs::rename does not overwrite on Windows
        if cfg!(windows) && self.settings_path.exists() {
            fs::remove_file(&self.settings_path)?;
        }
        fs::rename(&temp_path, &self.settings_path)?;

        info!("Settings saved to {}", self.settings_path.display());
        Ok(normalized)
    }
}
