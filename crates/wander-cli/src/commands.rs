//! Slash commands for interactive mode

/// Result of parsing a slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Start a fresh conversation
    New,
    /// Show conversation status
    Status,
    /// Reprint the message log
    History,
    /// Show a message to the user (not sent to the planner)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse a slash command
pub fn parse_command(input: &str) -> Option<CommandResult> {
    let input = input.trim();
    let name = input.strip_prefix('/')?;
    let command = name.split_whitespace().next().unwrap_or("").to_lowercase();

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),
        "new" | "n" => CommandResult::New,
        "status" | "s" => CommandResult::Status,
        "history" => CommandResult::History,
        "quit" | "exit" | "q" => CommandResult::Exit,
        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?        Show this help message
  /new, /n             Start a new conversation
  /status, /s          Show conversation id, state and progress
  /history             Reprint the conversation so far
  /quit, /exit, /q     Exit wander

Press Ctrl-C while the planner is working to abort the current turn."#
        .to_string()
}
