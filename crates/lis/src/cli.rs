use std::path::PathBuf;

use clap::{Parser, Subcommand};
use logger::LogLevel;
use planetconfig::AntialiasSetting;

#[derive(Parser, Debug)]
#[command(
    name = "lis",
    author,
    version,
    about = "Rotating textured planet viewer",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Flags shared by the viewer and the `config` subcommands. Each one overrides
/// the matching value from the configuration file.
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Configuration file to read instead of the default `lis.toml`.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Initial window size in logical pixels (e.g. `1024x768`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size, global = true)]
    pub size: Option<(u32, u32)>,

    /// Number of parallels between the poles.
    #[arg(
        long,
        value_name = "COUNT",
        value_parser = clap::value_parser!(u32).range(1..),
        global = true
    )]
    pub lat_lines: Option<u32>,

    /// Number of meridians around the axis.
    #[arg(
        long,
        value_name = "COUNT",
        value_parser = clap::value_parser!(u32).range(1..),
        global = true
    )]
    pub long_lines: Option<u32>,

    /// Sphere radius in model units.
    #[arg(long, value_name = "RADIUS", value_parser = parse_radius, global = true)]
    pub radius: Option<f64>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias, global = true)]
    pub antialias: Option<AntialiasSetting>,

    /// Draw a single frame and redraw only when the window asks for it.
    #[arg(long, global = true)]
    pub no_animate: bool,

    /// Directory containing `vertex.shader` and `fragment.shader`.
    #[arg(long, value_name = "DIR", global = true)]
    pub shader_dir: Option<PathBuf>,

    /// Console threshold: `debug`, `info`, `error` or `none`.
    #[arg(long, value_name = "LEVEL", value_parser = parse_level, global = true)]
    pub console_level: Option<LogLevel>,

    /// Log file threshold: `debug`, `info`, `error` or `none`.
    #[arg(long, value_name = "LEVEL", value_parser = parse_level, global = true)]
    pub file_level: Option<LogLevel>,

    /// Append to an existing log file instead of truncating it.
    #[arg(long, global = true)]
    pub append_log: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect the configuration without opening a window.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the resolved configuration, command-line overrides included, as TOML.
    Show,
    /// Print the configuration file path that is read.
    Path,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{w}'"))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{h}'"))?;
    if width == 0 || height == 0 {
        return Err("window size must be greater than zero".into());
    }
    Ok((width, height))
}

pub fn parse_radius(value: &str) -> Result<f64, String> {
    let radius: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid radius '{value}'"))?;
    if !radius.is_finite() || radius <= 0.0 {
        return Err(format!("radius must be a positive number, got {radius}"));
    }
    Ok(radius)
}

pub fn parse_antialias(value: &str) -> Result<AntialiasSetting, String> {
    if value.trim().is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }
    value
        .parse()
        .map_err(|err| format!("{err}; use auto/off or 2/4/8/16"))
}

fn parse_level(value: &str) -> Result<LogLevel, String> {
    value.parse().map_err(|err: logger::ParseLevelError| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_window_sizes() {
        assert_eq!(parse_size("1024x768").unwrap(), (1024, 768));
        assert_eq!(parse_size(" 640X480 ").unwrap(), (640, 480));
        assert!(parse_size("1024").is_err());
        assert!(parse_size("0x768").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn rejects_non_positive_radius() {
        assert_eq!(parse_radius("0.5").unwrap(), 0.5);
        assert!(parse_radius("0").is_err());
        assert!(parse_radius("-1").is_err());
        assert!(parse_radius("inf").is_err());
    }

    #[test]
    fn parses_antialias_modes() {
        assert_eq!(parse_antialias("auto").unwrap(), AntialiasSetting::Auto);
        assert_eq!(parse_antialias("1").unwrap(), AntialiasSetting::Off);
        assert_eq!(parse_antialias("8").unwrap(), AntialiasSetting::Samples(8));
        assert!(parse_antialias("3").is_err());
        assert!(parse_antialias("").is_err());
    }

    #[test]
    fn flags_work_after_the_subcommand() {
        let cli = Cli::try_parse_from(["lis", "config", "show", "--lat-lines", "12"]).unwrap();
        assert_eq!(cli.run.lat_lines, Some(12));
        match cli.command {
            Some(Command::Config(cmd)) => assert_eq!(cmd.action, ConfigAction::Show),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_line_counts() {
        assert!(Cli::try_parse_from(["lis", "--long-lines", "0"]).is_err());
    }

    #[test]
    fn parses_log_levels() {
        let cli = Cli::try_parse_from(["lis", "--console-level", "debug", "--file-level", "off"])
            .unwrap();
        assert_eq!(cli.run.console_level, Some(LogLevel::Debug));
        assert_eq!(cli.run.file_level, Some(LogLevel::None));
    }
}
