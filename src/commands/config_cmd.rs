use clap::{Args, Subcommand};

use super::OutputFormat;
use ravn_realmsync::{Config, MODULE_ID};

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        let mut value = serde_json::to_value(config)?;
                        value["api_token"]["value"] = config.masked_token().into();
                        value["version"] = ravn_realmsync::version().into();
                        println!("{}", serde_json::to_string_pretty(&value)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "Configuration ({} {})",
                            MODULE_ID,
                            ravn_realmsync::version()
                        );
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        let token = if config.api_token.value.is_empty() {
                            "(not set)".to_string()
                        } else {
                            config.masked_token()
                        };
                        println!("api_token: {}", token);
                        println!("  source: {}", config.api_token.source);
                        println!();

                        println!("api_base_url: {}", config.api_base_url.value);
                        println!("  source: {}", config.api_base_url.source);
                        println!();

                        println!("data_dir: {}", config.data_dir.value.display());
                        println!("  source: {}", config.data_dir.source);
                        println!();

                        println!("world:");
                        println!("  id: {}", config.world.id);
                        println!(
                            "  system: {}",
                            if config.world.system.is_empty() {
                                "(unknown)"
                            } else {
                                &config.world.system
                            }
                        );
                        if let Some(user) = &config.world.user_id {
                            println!("  user_id: {}", user);
                        }
                        println!("  is_gm: {}", config.world.is_gm);
                    }
                }
                Ok(())
            }
        }
    }
}
