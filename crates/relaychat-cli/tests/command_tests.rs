use relaychat_cli::commands::{handle_command, CommandResult};
use std::path::PathBuf;

// ========================================================================
// Slash command parsing (commands.rs)
// ========================================================================

#[test]
fn test_help_command() {
    let CommandResult::Message(msg) = handle_command("/help") else {
        panic!("expected help text");
    };
    assert!(msg.contains("RelayChat Commands"));
    assert!(msg.contains("/image <path>"));
    assert!(matches!(handle_command("/h"), CommandResult::Message(_)));
}

#[test]
fn test_quit_aliases() {
    for cmd in ["/quit", "/exit", "/q"] {
        assert_eq!(handle_command(cmd), CommandResult::Quit);
    }
}

#[test]
fn test_chat_commands() {
    assert_eq!(handle_command("/new"), CommandResult::NewChat);
    assert_eq!(handle_command("/history"), CommandResult::ListHistory);
    assert_eq!(
        handle_command("/load chat_1700000000000"),
        CommandResult::LoadChat("chat_1700000000000".into())
    );
}

#[test]
fn test_load_without_id_shows_usage() {
    let CommandResult::Message(msg) = handle_command("/load") else {
        panic!("expected usage");
    };
    assert!(msg.starts_with("Usage: /load"));
}

#[test]
fn test_model_commands() {
    assert_eq!(
        handle_command("/model   qwen/qwen3-8b:free  "),
        CommandResult::ModelChanged("qwen/qwen3-8b:free".into())
    );
    assert!(matches!(handle_command("/model"), CommandResult::Message(_)));
    assert_eq!(handle_command("/models"), CommandResult::ListModels);
}

#[test]
fn test_image_commands() {
    assert_eq!(
        handle_command("/image /tmp/my photo.png"),
        CommandResult::AttachImage(PathBuf::from("/tmp/my photo.png"))
    );
    assert!(matches!(handle_command("/image"), CommandResult::Message(_)));
    assert_eq!(handle_command("/clear-image"), CommandResult::ClearImage);
}

#[test]
fn test_version_command() {
    let CommandResult::Message(msg) = handle_command("/version") else {
        panic!("expected version");
    };
    assert!(msg.starts_with("RelayChat v"));
}

#[test]
fn test_unknown_command() {
    let CommandResult::Message(msg) = handle_command("/frobnicate now") else {
        panic!("expected error message");
    };
    assert!(msg.contains("Unknown command: /frobnicate"));
}

#[test]
fn test_plain_text_is_not_a_command() {
    assert_eq!(handle_command("hello there"), CommandResult::NotACommand);
    assert_eq!(handle_command("what does 1/2 mean"), CommandResult::NotACommand);
}
