use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use draftcad_core::dimension::DimStyle;
use draftcad_core::document::DEFAULT_LAYER;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "DRAFTCAD_CONFIG";

/// Root of the application configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub dimension: DimStyle,
    #[serde(default)]
    pub frontend: FrontendConfig,
}

impl AppConfig {
    /// Loads configuration from an explicit path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate(path)?;
        Ok(config)
    }

    /// Resolves the configuration file: `explicit`, then `DRAFTCAD_CONFIG`, then
    /// `./config/default.toml`. Falls back to defaults when none exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        Self::discover()
    }

    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "failed to read the current directory".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: &'static str| ConfigError::Invalid {
            path: path.to_path_buf(),
            field,
            reason,
        };
        if !(self.editor.pick_tolerance > 0.0) {
            return Err(invalid("editor.pick_tolerance", "must be positive"));
        }
        if !(self.editor.zoom_padding >= 0.0) {
            return Err(invalid("editor.zoom_padding", "must not be negative"));
        }
        if self.editor.default_layer.trim().is_empty() {
            return Err(invalid("editor.default_layer", "must not be empty"));
        }
        if !(self.dimension.arrow_size > 0.0) || !(self.dimension.text_height > 0.0) {
            return Err(invalid("dimension", "arrow_size and text_height must be positive"));
        }
        if self.frontend.view_width == 0 || self.frontend.view_height == 0 {
            return Err(invalid("frontend", "view size must be nonzero"));
        }
        Ok(())
    }
}

/// Logging settings; `level` is an `EnvFilter` directive such as `info` or `draftcad_io=debug`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// World-space pick radius.
    pub pick_tolerance: f64,
    /// Fraction of the extents added around a zoom-to-fit.
    pub zoom_padding: f64,
    /// Layer receiving newly drawn entities.
    pub default_layer: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            pick_tolerance: 0.5,
            zoom_padding: 0.2,
            default_layer: DEFAULT_LAYER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    /// Echo each prompt line to stdout.
    pub echo_prompts: bool,
    /// Viewport size in pixels, used to turn fitted extents into a zoom factor.
    pub view_width: u32,
    pub view_height: u32,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            echo_prompts: true,
            view_width: 1280,
            view_height: 800,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {field} in {path:?}: {reason}")]
    Invalid {
        path: PathBuf,
        field: &'static str,
        reason: &'static str,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
