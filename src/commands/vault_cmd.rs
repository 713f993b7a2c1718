//! Hero Vault commands: list, import, export and browse.

use clap::{Args, Subcommand};

use super::OutputFormat;
use ravn_realmsync::vault::normalize::UNKNOWN_SYSTEM;
use ravn_realmsync::{
    ActorRef, DocumentStore, ExportOptions, ImportResult, ListOptions, Notifier, PanelState,
    RealmsyncApi, RemoteCharacterSummary,
};

#[derive(Args)]
pub struct VaultCommand {
    #[command(subcommand)]
    pub command: VaultSubcommand,
}

#[derive(Subcommand)]
pub enum VaultSubcommand {
    /// List characters stored in the Hero Vault
    List {
        /// Game system filter (defaults to the world's system)
        #[arg(long)]
        system: Option<String>,

        /// Sort key
        #[arg(long, default_value = "updated")]
        sort: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Import a vault character as a new actor, or onto an existing one
    Import {
        /// Hero Vault character id
        remote_id: String,

        /// Overwrite this local actor instead of creating a new one
        #[arg(long, value_name = "ACTOR_ID")]
        into: Option<String>,

        /// Allow importing a character from a different game system
        #[arg(long)]
        skip_system_check: bool,
    },

    /// Send a local actor to the vault
    Export {
        /// Actor id, or a document UUID such as Actor.<id>
        actor: String,

        /// Label stored with the upload (defaults to the world id)
        #[arg(long)]
        label: Option<String>,

        /// Keep an existing vault copy instead of replacing it
        #[arg(long)]
        no_overwrite: bool,
    },

    /// List local actors and whether they can be exported
    Actors,

    /// Open the vault browser, optionally bound to a local actor
    Browse {
        /// Local actor to bind for export
        #[arg(long, value_name = "ACTOR_ID")]
        actor: Option<String>,

        /// Import this vault character as a new actor after refreshing
        #[arg(long, value_name = "REMOTE_ID")]
        import: Option<String>,

        /// Export the bound actor
        #[arg(long)]
        export: bool,
    },
}

/// Prints notifications to the terminal.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn info(&self, message: &str) {
        println!("✓ {}", message);
    }

    fn warn(&self, message: &str) {
        eprintln!("Warning: {}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }
}

impl VaultCommand {
    pub async fn run(&self, api: &RealmsyncApi<'_>) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            VaultSubcommand::List {
                system,
                sort,
                format,
            } => {
                let options = ListOptions {
                    system: system
                        .clone()
                        .or_else(|| api.environment().system_id.clone())
                        .unwrap_or_default(),
                    sort: sort.clone(),
                };
                let characters = api.list_characters(&options).await?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&characters)?);
                    }
                    OutputFormat::Text => print_characters(&characters),
                }
                Ok(())
            }
            VaultSubcommand::Import {
                remote_id,
                into,
                skip_system_check,
            } => {
                let result = api
                    .import_character(remote_id, into.as_deref(), !skip_system_check)
                    .await?;
                print_import(&result);
                Ok(())
            }
            VaultSubcommand::Export {
                actor,
                label,
                no_overwrite,
            } => {
                let options = ExportOptions {
                    label: label.clone(),
                    overwrite: !no_overwrite,
                };

                let document = api.find_actor(actor).await?;
                let name = document.name().to_string();
                let record = api
                    .export_actor(ActorRef::Document(document), &options)
                    .await?;

                println!("✓ Sent \"{}\" to Hero Vault (id={}).", name, record.id);
                Ok(())
            }
            VaultSubcommand::Actors => {
                let actors = api.store().list().await?;
                if actors.is_empty() {
                    println!("No local actors.");
                    return Ok(());
                }

                for actor in &actors {
                    let marker = if api.is_export_candidate(actor) {
                        "*"
                    } else {
                        " "
                    };
                    println!(
                        "{} {}  {} ({})",
                        marker,
                        actor.id().unwrap_or("?"),
                        actor.name(),
                        actor.actor_type().unwrap_or("unknown")
                    );
                }
                println!();
                println!("* can be sent to the Hero Vault");
                Ok(())
            }
            VaultSubcommand::Browse {
                actor,
                import,
                export,
            } => {
                let notifier = ConsoleNotifier;
                let mut panel = api.open_panel(actor.as_deref(), &notifier).await;

                if panel.has_token() {
                    panel.refresh().await;
                } else {
                    println!(
                        "No API token configured for {}. Set api_token in the config file.",
                        panel.api_base_url()
                    );
                }

                if let Some(remote_id) = import {
                    panel.select(Some(remote_id.as_str()));
                    panel.import(None).await;
                }
                if *export {
                    panel.export_current().await;
                }

                print_panel(panel.state());
                Ok(())
            }
        }
    }
}

fn print_characters(characters: &[RemoteCharacterSummary]) {
    if characters.is_empty() {
        println!("No characters in the Hero Vault.");
        return;
    }

    for character in characters {
        let updated = if character.updated_at.is_empty() {
            "-"
        } else {
            character.updated_at.as_str()
        };
        print!("{}  {} [{}]", character.id, character.name, character.system);
        if !character.label.is_empty() {
            print!(" ({})", character.label);
        }
        println!("  updated {}", updated);
    }
}

fn print_import(result: &ImportResult) {
    match result {
        ImportResult::Created { id, name } => {
            println!("✓ Imported \"{}\" as new actor {}", name, id);
        }
        ImportResult::Overwritten {
            id,
            name,
            items,
            effects,
        } => {
            println!("✓ Overwrote actor {} with \"{}\"", id, name);
            println!("  items:   -{} +{}", items.removed, items.added);
            println!("  effects: -{} +{}", effects.removed, effects.added);
        }
    }
}

fn print_panel(state: &PanelState) {
    println!();
    println!("R.A.V.N. Hero Vault");
    println!("===================");
    if let Some(name) = &state.actor_name {
        println!("Bound actor: {}", name);
    }
    println!(
        "System: {}",
        if state.system_id.is_empty() {
            UNKNOWN_SYSTEM
        } else {
            &state.system_id
        }
    );
    if let Some(at) = state.last_refreshed_at {
        println!("Refreshed: {}", at.to_rfc3339());
    }
    println!();
    print_characters(&state.characters);
}
