use std::path::PathBuf;

use clap::Parser;

/// Driver queue server: public registration, admin queue operations and SMS calls.
#[derive(Parser, Debug, Clone)]
#[command(name = "driverqueue-backend", version)]
pub struct CliArgs {
    /// Path to a TOML, YAML or JSON configuration file
    #[arg(short = 'c', long = "config-path", env = "DRIVERQUEUE_CONFIG_PATH")]
    pub config_path: Option<PathBuf>,

    /// Load and validate the configuration, then exit
    #[arg(long)]
    pub check_config: bool,
}
