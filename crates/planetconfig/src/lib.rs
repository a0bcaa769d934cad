//! TOML configuration for the Lis planet viewer.
//!
//! Every section is optional; missing keys fall back to the values the viewer
//! has always shipped with (800x600 window, 40x40 sphere of radius 0.7,
//! 16x MSAA, console logging at `info`).

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use logger::LogLevel;
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LisConfig {
    pub version: u32,
    pub window: WindowConfig,
    pub planet: PlanetConfig,
    pub shaders: ShaderConfig,
    pub logging: LoggingConfig,
    pub gpu: GpuConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// Redraw continuously at the display refresh rate.
    pub animate: bool,
    pub antialias: AntialiasSetting,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlanetConfig {
    pub lat_lines: u32,
    pub long_lines: u32,
    pub radius: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShaderConfig {
    /// Directory holding `vertex.shader` and `fragment.shader`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub console: LogLevel,
    pub file: LogLevel,
    /// Truncate an existing log file instead of appending to it.
    pub overwrite: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpuConfig {
    /// Request validation layers and forward GPU diagnostics to the log.
    pub debug_context: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AntialiasRaw", into = "String")]
pub enum AntialiasSetting {
    Auto,
    Off,
    Samples(u32),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AntialiasRaw {
    Str(String),
    Num(i64),
}

impl Default for LisConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            window: WindowConfig::default(),
            planet: PlanetConfig::default(),
            shaders: ShaderConfig::default(),
            logging: LoggingConfig::default(),
            gpu: GpuConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "Lis".to_string(),
            animate: true,
            antialias: AntialiasSetting::Samples(16),
        }
    }
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            lat_lines: 40,
            long_lines: 40,
            radius: 0.7,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console: LogLevel::Info,
            file: LogLevel::None,
            overwrite: true,
            dir: None,
        }
    }
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            debug_context: true,
        }
    }
}

impl fmt::Display for AntialiasSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AntialiasSetting::Auto => f.write_str("auto"),
            AntialiasSetting::Off => f.write_str("off"),
            AntialiasSetting::Samples(count) => write!(f, "{count}"),
        }
    }
}

impl From<AntialiasSetting> for String {
    fn from(value: AntialiasSetting) -> Self {
        value.to_string()
    }
}

impl FromStr for AntialiasSetting {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "auto" | "max" | "default" => Ok(AntialiasSetting::Auto),
            "off" | "none" | "disable" | "disabled" | "0" | "1" => Ok(AntialiasSetting::Off),
            "2" | "4" | "8" | "16" => normalized
                .parse()
                .map(AntialiasSetting::Samples)
                .map_err(|err| format!("invalid antialias setting '{normalized}': {err}")),
            other => Err(format!("invalid antialias setting '{other}'")),
        }
    }
}

impl TryFrom<AntialiasRaw> for AntialiasSetting {
    type Error = String;

    fn try_from(raw: AntialiasRaw) -> Result<Self, Self::Error> {
        match raw {
            AntialiasRaw::Str(value) => value.parse(),
            AntialiasRaw::Num(value) if value < 0 => {
                Err("antialias value must be non-negative".to_string())
            }
            AntialiasRaw::Num(value) => value.to_string().parse(),
        }
    }
}

impl LisConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: LisConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads and validates the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Like [`LisConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }

        if self.window.title.trim().is_empty() {
            return Err(ConfigError::Invalid("window title may not be empty".into()));
        }

        if self.planet.lat_lines == 0 || self.planet.long_lines == 0 {
            return Err(ConfigError::Invalid(format!(
                "planet needs at least one latitude and longitude line, got {}x{}",
                self.planet.lat_lines, self.planet.long_lines
            )));
        }

        if !self.planet.radius.is_finite() || self.planet.radius <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "planet radius must be a positive number, got {}",
                self.planet.radius
            )));
        }

        Ok(())
    }
}
