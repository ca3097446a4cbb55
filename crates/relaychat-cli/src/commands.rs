use std::path::PathBuf;

/// Result of processing a slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Display a message to the user.
    Message(String),
    /// Quit the application.
    Quit,
    /// Save the current chat to history and start a fresh one.
    NewChat,
    /// List saved chats.
    ListHistory,
    /// Load a saved chat by id.
    LoadChat(String),
    /// Change the model.
    ModelChanged(String),
    /// List the model catalog.
    ListModels,
    /// Attach an image to the next message.
    AttachImage(PathBuf),
    /// Drop the pending image.
    ClearImage,
    /// Not a command - treat as regular input.
    NotACommand,
}

pub fn handle_command(input: &str) -> CommandResult {
    let input = input.trim();
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0];
    let arg = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd {
        "/help" | "/h" => show_help(),
        "/exit" | "/quit" | "/q" => CommandResult::Quit,
        "/new" => CommandResult::NewChat,
        "/history" => CommandResult::ListHistory,
        "/load" => {
            if arg.is_empty() {
                CommandResult::Message("Usage: /load <chat-id>".into())
            } else {
                CommandResult::LoadChat(arg.to_string())
            }
        }

        "/model" => {
            if arg.is_empty() {
                CommandResult::Message("Usage: /model <model-id>  (see /models)".into())
            } else {
                CommandResult::ModelChanged(arg.to_string())
            }
        }
        "/models" => CommandResult::ListModels,

        "/image" => {
            if arg.is_empty() {
                CommandResult::Message("Usage: /image <path>".into())
            } else {
                CommandResult::AttachImage(PathBuf::from(arg))
            }
        }
        "/clear-image" => CommandResult::ClearImage,

        "/version" => CommandResult::Message(format!("RelayChat v{}", env!("CARGO_PKG_VERSION"))),

        _ => {
            if input.starts_with('/') {
                CommandResult::Message(format!("Unknown command: {cmd}. Type /help for commands."))
            } else {
                CommandResult::NotACommand
            }
        }
    }
}

fn show_help() -> CommandResult {
    let help_text = "\
╭─ RelayChat Commands ───────────────────────────────────────────╮

  CHATS
    /new                      Save this chat to history, start fresh
    /history                  List saved chats
    /load <id>                Load a saved chat

  MODELS & IMAGES
    /model <id>               Switch model
    /models                   List available models
    /image <path>             Attach an image to the next message
    /clear-image              Drop the attached image

  OTHER
    /help, /h                 Show this help message
    /version                  Show version information
    /exit, /quit, /q          Quit (the chat is checkpointed)

  Press Ctrl-C while waiting for a reply to cancel it.

╰────────────────────────────────────────────────────────────────╯";

    CommandResult::Message(help_text.into())
}
