use anyhow::{bail, Result};
use relaychat_core::{
    display_text, AppConfig, Chat, ChatMessage, ChatSession, ConversationCheckpoint, HistoryStore,
    ModelCatalog, RequestConfig, Settings, ValidationError,
};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::commands::{self, CommandResult};

/// Everything the commands need, opened once per run.
pub struct AppContext {
    pub config: AppConfig,
    pub settings: Settings,
    pub history: HistoryStore,
    pub catalog: ModelCatalog,
    pub checkpoint: ConversationCheckpoint,
    model_override: Option<String>,
}

impl AppContext {
    pub fn open(config: AppConfig, model_override: Option<String>) -> Result<Self> {
        let prefs = config.open_preferences()?;
        let settings = Settings::new(prefs.clone()).with_fallback_api_key(config.env_api_key());
        Ok(Self {
            history: HistoryStore::new(prefs.clone()),
            catalog: ModelCatalog::new(prefs.clone()),
            checkpoint: ConversationCheckpoint::new(prefs),
            settings,
            config,
            model_override,
        })
    }

    fn model(&self) -> String {
        self.model_override
            .clone()
            .unwrap_or_else(|| self.settings.selected_model())
    }

    fn request_config(&self) -> Result<RequestConfig> {
        let mut request = match self.settings.request_config() {
            Ok(request) => request,
            Err(ValidationError::MissingApiKey) => bail!(
                "No API key. Run `relaychat config set-key <key>` or set {}.",
                self.config.api.api_key_env
            ),
            Err(e) => return Err(e.into()),
        };
        request.model = self.model();
        Ok(request)
    }

    fn new_chat(&self) -> Chat {
        Chat::new(Arc::new(self.config.build_client()))
    }
}

// ── Single-prompt mode ──────────────────────────────────────────────────

pub async fn run_single_prompt(ctx: &AppContext, prompt: &str, image: Option<PathBuf>) -> Result<()> {
    let request = ctx.request_config()?;
    let mut chat = ctx.new_chat();
    if let Some(path) = image {
        attach_image(ctx, &mut chat, path, &request.model)?;
    }

    let outcome = chat.submit(prompt, &request).await?;
    if let Some(e) = &outcome.image_error {
        eprintln!("[image not sent: {e}]");
    }
    println!("{}", display_text(&outcome.reply));

    if let Err(e) = outcome.response {
        bail!(e);
    }
    Ok(())
}

// ── Interactive mode ────────────────────────────────────────────────────

pub async fn run_interactive(ctx: &AppContext, image: Option<PathBuf>) -> Result<()> {
    let mut chat = ctx.new_chat();
    chat.restore(&ctx.checkpoint);
    if !chat.conversation().is_empty() {
        println!("Restored {} messages from your last session.", chat.conversation().len());
    }
    if let Some(path) = image {
        attach_image(ctx, &mut chat, path, &ctx.model())?;
    }

    println!("RelayChat v{} · model {}", env!("CARGO_PKG_VERSION"), ctx.model());
    println!("Type /help for commands.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match commands::handle_command(input) {
            CommandResult::NotACommand => send_turn(ctx, &mut chat, input).await,
            CommandResult::Quit => break,
            result => {
                if let Err(e) = apply_command(ctx, &mut chat, result) {
                    eprintln!("Error: {e}");
                }
            }
        }
    }

    chat.checkpoint(&ctx.checkpoint)?;
    Ok(())
}

async fn send_turn(ctx: &AppContext, chat: &mut Chat, input: &str) {
    let request = match ctx.request_config() {
        Ok(request) => request,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };

    match chat.submit_until(input, &request, interrupted(tokio::signal::ctrl_c())).await {
        Ok(outcome) => {
            if let Some(e) = &outcome.image_error {
                eprintln!("[image not sent: {e}]");
            }
            println!("\n{}\n", display_text(&outcome.reply));
        }
        Err(e) => eprintln!("{e}"),
    }

    if let Err(e) = chat.checkpoint(&ctx.checkpoint) {
        tracing::warn!("Failed to checkpoint conversation: {}", e);
    }
}

/// Resolves once `signal` fires. A signal that could not be installed never
/// fires, so the turn runs to completion instead of being cancelled at once.
async fn interrupted<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::warn!("Ctrl-C handler unavailable, replies cannot be cancelled: {}", e);
        std::future::pending::<()>().await;
    }
}

fn apply_command(ctx: &AppContext, chat: &mut Chat, result: CommandResult) -> Result<()> {
    match result {
        CommandResult::Message(msg) => println!("{msg}"),
        CommandResult::NewChat => {
            match chat.start_new(&ctx.history, &ctx.model())? {
                Some(id) => println!("Saved as {id}. Started a new chat."),
                None => println!("Started a new chat."),
            }
            ctx.checkpoint.clear()?;
        }
        CommandResult::ListHistory => list_history(ctx),
        CommandResult::LoadChat(id) => {
            let Some(session) = ctx.history.get(&id) else {
                bail!("No saved chat with id {id}");
            };
            print_session(&session);
            chat.load_session(session);
        }
        CommandResult::ModelChanged(id) => {
            select_model(ctx, &id)?;
            println!("Model changed to: {id}");
            if ctx.model_override.is_some() {
                println!("(a --model override is active for this run)");
            }
        }
        CommandResult::ListModels => list_models(ctx),
        CommandResult::AttachImage(path) => {
            attach_image(ctx, chat, path, &ctx.model())?;
            println!("Image attached to your next message.");
        }
        CommandResult::ClearImage => {
            chat.clear_image();
            println!("Image removed.");
        }
        CommandResult::Quit | CommandResult::NotACommand => {}
    }
    Ok(())
}

fn attach_image(ctx: &AppContext, chat: &mut Chat, path: PathBuf, model: &str) -> Result<()> {
    if !path.is_file() {
        bail!("No such image: {}", path.display());
    }
    if !ctx.catalog.supports_images(model) {
        bail!("{model} does not accept images. Pick one marked [img] in /models.");
    }
    chat.attach_image(path);
    Ok(())
}

// ── Subcommands ─────────────────────────────────────────────────────────

pub fn select_model(ctx: &AppContext, id: &str) -> Result<()> {
    if ctx.catalog.find(id).is_none() {
        return Err(ValidationError::UnknownModel(id.to_string()).into());
    }
    ctx.settings.set_selected_model(id)?;
    Ok(())
}

pub fn list_history(ctx: &AppContext) {
    let sessions = ctx.history.list();
    if sessions.is_empty() {
        println!("No saved chats.");
        return;
    }
    for session in sessions {
        let when = session
            .created_at()
            .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{:<20} {:<16} {:>3} msgs  {}",
            session.id,
            when,
            session.messages.len(),
            session.title
        );
    }
}

pub fn show_history(ctx: &AppContext, id: &str) -> Result<()> {
    let Some(session) = ctx.history.get(id) else {
        bail!("No saved chat with id {id}");
    };
    print_session(&session);
    Ok(())
}

fn print_session(session: &ChatSession) {
    println!("── {} · {} ──", session.title, session.model_used);
    for message in &session.messages {
        print_message(message);
    }
}

fn print_message(message: &ChatMessage) {
    let who = if message.is_user { "you" } else { "ai" };
    let image = if message.has_image { " [image]" } else { "" };
    println!("{who}{image}: {}", display_text(message));
}

pub fn list_models(ctx: &AppContext) {
    let selected = ctx.model();
    for model in ctx.catalog.all() {
        let marker = if model.id == selected { "*" } else { " " };
        let images = if model.supports_images { "[img]" } else { "     " };
        let origin = if model.is_default { "" } else { " (custom)" };
        println!("{marker} {images} {:<28} {}{origin}", model.name, model.id);
    }
}

pub fn show_config(ctx: &AppContext) {
    let key = match ctx.settings.api_key() {
        Some(key) => mask_key(&key),
        None => "not set".to_string(),
    };
    println!("config file:  {}", AppConfig::config_path().display());
    println!("preferences:  {}", ctx.config.preferences_path().display());
    println!("endpoint:     {}", ctx.config.api.base_url);
    println!("api key:      {key}");
    println!("model:        {}", ctx.model());
    println!("theme:        {}", ctx.settings.theme_mode());
    println!("background:   {}", ctx.settings.chat_background());
    println!("saved chats:  {}", ctx.history.len());
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "set".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}
