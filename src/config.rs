//! Configuration system for stile
//!
//! Loads configuration from TOML file at `~/.config/stile/config.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub decorations: DecorationConfig,
    pub behavior: BehaviorConfig,
    pub keys: Vec<KeyConfig>,
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::with_default_keys());
        }

        let content = fs::read_to_string(&config_path)
            .context("Failed to read config file")?;

        let config = Self::parse(&content)?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)
            .context("Failed to parse config file")?;
        if config.keys.is_empty() {
            config.keys = KeyConfig::defaults();
        }
        Ok(config)
    }

    pub fn with_default_keys() -> Self {
        Self {
            keys: KeyConfig::defaults(),
            ..Self::default()
        }
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("stile");

        Ok(config_dir.join("config.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::with_default_keys())
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string)
            .context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// Frame geometry and colour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecorationConfig {
    /// Border width in pixels
    pub border_width: u32,
    /// Titlebar height in pixels
    pub title_height: u32,
    /// Frame background color (hex: 0xRRGGBB)
    pub background: u32,
}

impl Default for DecorationConfig {
    fn default() -> Self {
        Self {
            border_width: 4,
            title_height: 20,
            background: 0x3b4252,
        }
    }
}

/// Window behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Focus model: "click" or "sloppy"
    pub focus_model: String,
    /// Number of virtual desktops
    pub desktop_count: u32,
    /// Maximum time between the presses of a double click, in milliseconds
    pub double_click_speed: u32,
    /// Maximum pointer travel between the presses of a double click, in pixels
    pub double_click_delta: u32,
    /// Distance moved per key press during keyboard move/resize
    pub move_step: u32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            focus_model: "click".to_string(),
            desktop_count: 4,
            double_click_speed: 400,
            double_click_delta: 2,
            move_step: 10,
        }
    }
}

/// A key binding: `mask` letters (A = Alt, C = Control, S = Shift, 4 = Super),
/// a keysym name and an action string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyConfig {
    #[serde(default)]
    pub mask: String,
    pub key: String,
    pub action: String,
}

impl KeyConfig {
    fn new(mask: &str, key: &str, action: &str) -> Self {
        Self {
            mask: mask.to_string(),
            key: key.to_string(),
            action: action.to_string(),
        }
    }

    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("", "Up", "up"),
            Self::new("", "Down", "down"),
            Self::new("", "Right", "right"),
            Self::new("", "Left", "left"),
            Self::new("", "Escape", "escape"),
            Self::new("", "Return", "select"),
            Self::new("A", "Tab", "nextstacked"),
            Self::new("A", "F4", "close"),
            Self::new("A", "#", "desktop#"),
            Self::new("A", "F1", "root"),
            Self::new("A", "F2", "window"),
            Self::new("A", "F7", "move"),
            Self::new("A", "F8", "resize"),
            Self::new("A", "F9", "min"),
            Self::new("A", "F10", "max"),
            Self::new("A", "F11", "shade"),
            Self::new("CA", "Right", "desktop"),
            Self::new("CA", "Return", "exec:xterm"),
        ]
    }
}
