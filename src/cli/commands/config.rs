//! Config command - show configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::Config;
use crate::error::FlatterResult;
use std::path::Path;

/// Execute the config command
pub fn execute(args: ConfigArgs, config: &Config, path: Option<&Path>) -> FlatterResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => print!("{}", config.to_toml()?),
        Some(ConfigAction::Path) => match path {
            Some(path) => println!("{}", path.display()),
            None => println!("(action inputs)"),
        },
    }
    Ok(())
}
