mod config_cmd;
mod vault_cmd;

pub use config_cmd::ConfigCommand;
pub use vault_cmd::VaultCommand;

use clap::ValueEnum;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
