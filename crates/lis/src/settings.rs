//! Merges the configuration file with command-line overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use logger::LogLevel;
use planetconfig::{AntialiasSetting, LisConfig};
use renderer::compile::VERTEX_SHADER_FILE;
use renderer::{Antialiasing, PlanetSettings, RendererConfig, BUNDLED_SHADER_DIR};

use crate::cli::RunArgs;
use crate::paths::AppPaths;

/// Configuration file that was (or would have been) read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub explicit: bool,
}

impl ConfigSource {
    pub fn locate(args: &RunArgs) -> Result<Self> {
        match &args.config {
            Some(path) => Ok(Self {
                path: path.clone(),
                explicit: true,
            }),
            None => Ok(Self {
                path: AppPaths::discover()?.config_file(),
                explicit: false,
            }),
        }
    }

    /// An explicit `--config` file must exist; a missing default file means defaults.
    pub fn load(&self) -> Result<LisConfig> {
        let loaded = if self.explicit {
            LisConfig::load(&self.path)
        } else {
            LisConfig::load_or_default(&self.path)
        };
        loaded.with_context(|| format!("failed to load configuration {}", self.path.display()))
    }
}

/// Loads the configuration and applies the command-line overrides on top of it.
pub fn resolve_config(args: &RunArgs) -> Result<LisConfig> {
    let source = ConfigSource::locate(args)?;
    let mut config = source.load()?;
    apply_overrides(&mut config, args);
    config
        .validate()
        .context("invalid configuration after applying command-line overrides")?;
    Ok(config)
}

pub fn apply_overrides(config: &mut LisConfig, args: &RunArgs) {
    if let Some((width, height)) = args.size {
        config.window.width = width;
        config.window.height = height;
    }
    if let Some(lat_lines) = args.lat_lines {
        config.planet.lat_lines = lat_lines;
    }
    if let Some(long_lines) = args.long_lines {
        config.planet.long_lines = long_lines;
    }
    if let Some(radius) = args.radius {
        config.planet.radius = radius;
    }
    if let Some(antialias) = args.antialias {
        config.window.antialias = antialias;
    }
    if args.no_animate {
        config.window.animate = false;
    }
    if let Some(dir) = &args.shader_dir {
        config.shaders.dir = Some(dir.clone());
    }
    if let Some(level) = args.console_level {
        config.logging.console = level;
    }
    if let Some(level) = args.file_level {
        config.logging.file = level;
    }
    if args.append_log {
        config.logging.overwrite = false;
    }
}

pub fn renderer_config(config: &LisConfig, exe_dir: Option<&Path>) -> RendererConfig {
    RendererConfig {
        surface_size: (config.window.width, config.window.height),
        title: config.window.title.clone(),
        animate: config.window.animate,
        antialiasing: antialiasing(config.window.antialias),
        planet: PlanetSettings {
            lat_lines: config.planet.lat_lines,
            long_lines: config.planet.long_lines,
            radius: config.planet.radius as f32,
        },
        shader_dir: resolve_shader_dir(config.shaders.dir.as_deref(), exe_dir),
        debug_context: config.gpu.debug_context,
    }
}

/// Explicit directory, else the executable's directory when it ships the
/// shaders, else the shaders bundled with the source tree.
pub fn resolve_shader_dir(explicit: Option<&Path>, exe_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    match exe_dir {
        Some(dir) if dir.join(VERTEX_SHADER_FILE).is_file() => dir.to_path_buf(),
        _ => PathBuf::from(BUNDLED_SHADER_DIR),
    }
}

fn antialiasing(setting: AntialiasSetting) -> Antialiasing {
    match setting {
        AntialiasSetting::Auto => Antialiasing::Auto,
        AntialiasSetting::Off => Antialiasing::Off,
        AntialiasSetting::Samples(count) => Antialiasing::Samples(count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn cli_values_override_file_values() {
        let mut config = LisConfig::from_toml_str(
            r#"
[planet]
lat_lines = 10
long_lines = 12
radius = 0.4

[logging]
console = "error"
"#,
        )
        .unwrap();
        let args = RunArgs {
            lat_lines: Some(30),
            radius: Some(0.9),
            no_animate: true,
            file_level: Some(LogLevel::Debug),
            append_log: true,
            ..RunArgs::default()
        };

        apply_overrides(&mut config, &args);

        assert_eq!(config.planet.lat_lines, 30);
        assert_eq!(config.planet.long_lines, 12);
        assert_eq!(config.planet.radius, 0.9);
        assert!(!config.window.animate);
        assert_eq!(config.logging.console, LogLevel::Error);
        assert_eq!(config.logging.file, LogLevel::Debug);
        assert!(!config.logging.overwrite);
    }

    #[test]
    fn no_overrides_keep_the_file() {
        let mut config = LisConfig::default();
        apply_overrides(&mut config, &RunArgs::default());
        assert_eq!(config, LisConfig::default());
    }

    #[test]
    fn renderer_config_follows_the_file() {
        let mut config = LisConfig::default();
        config.window.width = 1024;
        config.window.height = 768;
        config.window.antialias = AntialiasSetting::Samples(4);
        config.gpu.debug_context = false;

        let renderer = renderer_config(&config, None);

        assert_eq!(renderer.surface_size, (1024, 768));
        assert_eq!(renderer.title, "Lis");
        assert_eq!(renderer.antialiasing, Antialiasing::Samples(4));
        assert_eq!(renderer.planet.lat_lines, 40);
        assert_eq!(renderer.planet.long_lines, 40);
        assert_eq!(renderer.planet.radius, 0.7);
        assert!(!renderer.debug_context);
    }

    #[test]
    fn explicit_shader_dir_wins() {
        let exe = TempDir::new().unwrap();
        fs::write(exe.path().join(VERTEX_SHADER_FILE), "").unwrap();
        let dir = resolve_shader_dir(Some(Path::new("/opt/shaders")), Some(exe.path()));
        assert_eq!(dir, PathBuf::from("/opt/shaders"));
    }

    #[test]
    fn executable_dir_used_when_it_ships_shaders() {
        let exe = TempDir::new().unwrap();
        fs::write(exe.path().join(VERTEX_SHADER_FILE), "").unwrap();
        assert_eq!(resolve_shader_dir(None, Some(exe.path())), exe.path());
    }

    #[test]
    fn falls_back_to_bundled_shaders() {
        let exe = TempDir::new().unwrap();
        assert_eq!(
            resolve_shader_dir(None, Some(exe.path())),
            PathBuf::from(BUNDLED_SHADER_DIR)
        );
        assert_eq!(resolve_shader_dir(None, None), PathBuf::from(BUNDLED_SHADER_DIR));
    }

    #[test]
    fn explicit_config_must_exist() {
        let root = TempDir::new().unwrap();
        let source = ConfigSource {
            path: root.path().join("missing.toml"),
            explicit: true,
        };
        assert!(source.load().is_err());

        let default_source = ConfigSource {
            explicit: false,
            ..source
        };
        assert_eq!(default_source.load().unwrap(), LisConfig::default());
    }

    #[test]
    fn invalid_config_file_is_rejected() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("lis.toml");
        fs::write(&path, "[window]\ntitle = \"\"\n").unwrap();
        let args = RunArgs {
            config: Some(path),
            ..RunArgs::default()
        };
        assert!(resolve_config(&args).is_err());
    }
}
