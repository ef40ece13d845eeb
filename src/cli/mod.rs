//! CLI interface for Manuscrypt.

pub mod handlers;
pub mod output;

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

use output::OutputMode;

/// Manuscrypt - writing assistant backend for book manuscripts
#[derive(Parser)]
#[command(name = "manuscrypt", version, about, long_about = None)]
pub struct Cli {
    /// Override data directory (default: ~/.manuscrypt)
    #[arg(long, env = "MANUSCRYPT_DATA_PATH", global = true)]
    pub data_path: Option<PathBuf>,

    /// Output as JSON instead of human-readable format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to listen on (overrides config)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Print the system prompt compiled for a book and chapter
    Prompt {
        /// Book ID
        #[arg(long)]
        book: String,
        /// Chapter ID
        #[arg(long)]
        chapter: Option<String>,
        /// continue, deepen, dialogue, sensory (anything else is freeform)
        #[arg(long)]
        command: Option<String>,
        /// Text the command applies to
        #[arg(long)]
        selected: Option<String>,
    },

    /// Import a book from a YAML file
    Import {
        /// Path to the YAML file
        file: PathBuf,
    },

    /// Chat with the assistant through a running server
    Chat {
        /// Book ID
        #[arg(long)]
        book: String,
        /// Chapter ID
        #[arg(long)]
        chapter: Option<String>,
        /// Interview this character instead of the general assistant
        #[arg(long)]
        character: Option<String>,
        /// Command tag sent with every turn
        #[arg(long)]
        command: Option<String>,
        /// Server URL (default: derived from the configured bind address)
        #[arg(long)]
        url: Option<String>,
    },
}

/// Run a command that needs the database.
pub async fn execute(
    command: &Commands,
    ctx: &crate::init::AppContext,
    mode: OutputMode,
) -> anyhow::Result<()> {
    match command {
        Commands::Prompt {
            book,
            chapter,
            command,
            selected,
        } => {
            handlers::prompt::handle_prompt(
                ctx,
                book,
                chapter.as_deref(),
                command.as_deref(),
                selected.as_deref(),
                mode,
            )
            .await?
        }
        Commands::Import { file } => handlers::import::handle_import(ctx, file, mode).await?,
        Commands::Serve { .. } | Commands::Chat { .. } => {
            anyhow::bail!("serve and chat are dispatched by the binary")
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_prompt_command() {
        let cli = Cli::try_parse_from([
            "manuscrypt",
            "prompt",
            "--book",
            "b1",
            "--chapter",
            "c1",
            "--command",
            "continue",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Prompt {
                book,
                chapter,
                command,
                selected,
            } => {
                assert_eq!(book, "b1");
                assert_eq!(chapter.as_deref(), Some("c1"));
                assert_eq!(command.as_deref(), Some("continue"));
                assert!(selected.is_none());
            }
            _ => panic!("expected prompt command"),
        }
    }

    #[test]
    fn test_parses_serve_bind() {
        let cli = Cli::try_parse_from(["manuscrypt", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        match cli.command {
            Commands::Serve { bind } => {
                assert_eq!(bind, Some("0.0.0.0:8080".parse().unwrap()));
            }
            _ => panic!("expected serve command"),
        }
    }
}
