/// Username validation for sampled player lists
use arrayvec::ArrayString;

/// Minecraft player name - max 16 characters, stored inline (no heap allocation).
pub type PlayerName = ArrayString<16>;

/// Checks whether a username is valid according to Minecraft's standard
/// rules: 1-16 characters, ASCII letters, digits and underscores only.
///
/// Rare legacy usernames with other characters exist; they are rejected
/// here on purpose.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= 16
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate a sampled username and inline it. `None` means the entry is
/// dropped from the sample.
pub fn parse_username(username: &str) -> Option<PlayerName> {
    if is_valid_username(username) {
        PlayerName::from(username).ok()
    } else {
        None
    }
}
