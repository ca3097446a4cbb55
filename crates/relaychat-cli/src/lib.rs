// Library interface for relaychat-cli so integration tests can reach the
// command parser. commands.rs is also declared in main.rs, hence the path
// attribute.

#[path = "commands.rs"]
pub mod commands;

pub use commands::{handle_command, CommandResult};
