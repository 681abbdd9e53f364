use owo_colors::OwoColorize;
use std::io::IsTerminal;

/// Check if we should use colors on stderr
pub fn should_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err()
}

/// Format an error message, colored if requested
pub fn error_message(message: &str, color: bool) -> String {
    if color {
        format!("{} {}", "Error:".red().bold(), message)
    } else {
        format!("Error: {}", message)
    }
}

/// Print an error message to stderr
pub fn error(message: &str) {
    eprintln!("{}", error_message(message, should_color()));
}
