mod cli;
mod paths;
mod run;
mod settings;

use std::process::ExitCode;

use anyhow::Result;
use cli::{Cli, Command, ConfigAction, RunArgs};
use logger::Logger;
use settings::ConfigSource;

fn main() -> ExitCode {
    let cli = cli::parse();
    let logger = Logger::new();

    match dispatch(cli, &logger) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            logger.error(format!("terminated: {err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli, logger: &Logger) -> Result<()> {
    match cli.command {
        Some(Command::Config(config_cmd)) => handle_config_command(config_cmd.action, &cli.run),
        None => {
            let config = settings::resolve_config(&cli.run)?;
            run::run(config, logger.clone())
        }
    }
}

fn handle_config_command(action: ConfigAction, args: &RunArgs) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = settings::resolve_config(args)?;
            print!("{}", config.to_toml_string()?);
        }
        ConfigAction::Path => {
            let source = ConfigSource::locate(args)?;
            let status = if source.path.is_file() {
                "present"
            } else if source.explicit {
                "missing"
            } else {
                "missing, defaults apply"
            };
            println!("{} ({status})", source.path.display());
        }
    }
    Ok(())
}
