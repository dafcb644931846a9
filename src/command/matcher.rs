//! Slash-command token parsing (spec §4.1 "Command Matcher").

/// Parse the first whitespace-delimited token of `text` as a command name.
///
/// Returns `None` if the token doesn't start with `/` or is empty once the
/// leading `/` and any bot-mention suffix (`@bot_name`) are stripped.
/// Matching the name/aliases against the result is case-sensitive; this
/// function performs no case folding of its own.
pub fn parse_command(text: &str) -> Option<String> {
    let token = text.split_whitespace().next()?;
    let rest = token.strip_prefix('/')?;
    let name = rest.split('@').next().unwrap_or(rest).trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_owned())
    }
}

/// Everything after the first whitespace-delimited token, trimmed.
pub fn argument_tail(text: &str) -> String {
    text.split_once(char::is_whitespace).map_or(String::new(), |(_, rest)| rest.trim().to_owned())
}
