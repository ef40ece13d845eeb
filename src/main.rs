//! Manuscrypt - writing assistant backend for book manuscripts
//!
//! Usage:
//!   manuscrypt serve                         Start the HTTP server
//!   manuscrypt prompt --book <id>            Print the compiled system prompt
//!   manuscrypt import world.yaml             Import a book from YAML
//!   manuscrypt chat --book <id>              Chat through a running server
//!   manuscrypt --help                        Show all commands

use anyhow::Result;
use clap::Parser;

use manuscrypt::cli::handlers::chat::{handle_chat, ChatTarget};
use manuscrypt::cli::handlers::serve::handle_serve;
use manuscrypt::cli::output::OutputMode;
use manuscrypt::cli::{Cli, Commands};
use manuscrypt::config::{resolve_data_path, AppConfig};
use manuscrypt::init::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Tracing to stderr, stdout carries prompts and chat replies
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("manuscrypt=info".parse()?),
        )
        .init();

    let mode = OutputMode::from_json_flag(cli.json);

    match &cli.command {
        Commands::Serve { bind } => {
            let ctx = AppContext::new(cli.data_path.clone()).await?;
            handle_serve(ctx, *bind).await?;
        }
        Commands::Chat {
            book,
            chapter,
            character,
            command,
            url,
        } => {
            // Talks to a server over HTTP and must not open its database.
            let config = AppConfig::load(&resolve_data_path(cli.data_path.clone()))?;
            let target = ChatTarget {
                book_id: book.clone(),
                chapter_id: chapter.clone(),
                character_id: character.clone(),
                command: command.clone(),
            };
            handle_chat(&config, target, url.clone()).await?;
        }
        cmd => {
            let ctx = AppContext::new(cli.data_path.clone()).await?;
            manuscrypt::cli::execute(cmd, &ctx, mode).await?;
        }
    }

    Ok(())
}
