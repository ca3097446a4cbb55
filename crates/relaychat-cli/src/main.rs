use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod app;
mod commands;

#[derive(Parser)]
#[command(name = "relaychat")]
#[command(about = "RelayChat - chat with OpenRouter models from the terminal")]
#[command(version)]
struct Cli {
    /// Run a single prompt and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Model to use for this run (not saved)
    #[arg(short, long)]
    model: Option<String>,

    /// Image to attach to the first message
    #[arg(long)]
    image: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Manage saved chats
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Manage the model catalog
    Models {
        #[command(subcommand)]
        action: ModelsAction,
    },
    /// Manage settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List saved chats, newest first
    List,
    /// Print a saved chat
    Show { id: String },
    /// Delete a saved chat
    Delete { id: String },
    /// Delete every saved chat
    Clear,
}

#[derive(Subcommand)]
enum ModelsAction {
    /// List built-in and custom models
    List,
    /// Add a custom model
    Add {
        id: String,
        name: String,
        /// The model accepts image input
        #[arg(long)]
        images: bool,
    },
    /// Remove a custom model
    Remove { id: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Store the OpenRouter API key
    SetKey { key: String },
    /// Choose the default model
    SetModel { id: String },
    /// Show the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let ctx = app::AppContext::open(relaychat_core::AppConfig::load(), cli.model)?;

    match cli.command {
        Some(Command::History { action }) => match action {
            HistoryAction::List => app::list_history(&ctx),
            HistoryAction::Show { id } => app::show_history(&ctx, &id)?,
            HistoryAction::Delete { id } => {
                ctx.history.delete(&id)?;
                println!("Deleted {id}");
            }
            HistoryAction::Clear => {
                ctx.history.clear()?;
                println!("History cleared.");
            }
        },
        Some(Command::Models { action }) => match action {
            ModelsAction::List => app::list_models(&ctx),
            ModelsAction::Add { id, name, images } => {
                ctx.catalog
                    .add_custom(relaychat_core::ModelDescriptor::custom(&name, &id, images))?;
                println!("Added {name} ({id})");
            }
            ModelsAction::Remove { id } => {
                ctx.catalog.remove_custom(&id)?;
                println!("Removed {id}");
            }
        },
        Some(Command::Config { action }) => match action {
            ConfigAction::SetKey { key } => {
                ctx.settings.set_api_key(&key)?;
                println!("API key saved.");
            }
            ConfigAction::SetModel { id } => {
                app::select_model(&ctx, &id)?;
                println!("Default model set to {id}");
            }
            ConfigAction::Show => app::show_config(&ctx),
        },
        None => match cli.prompt {
            Some(prompt) => app::run_single_prompt(&ctx, &prompt, cli.image).await?,
            None => app::run_interactive(&ctx, cli.image).await?,
        },
    }

    Ok(())
}
