//! Shared utility functions used across the codebase.

/// Largest char boundary in `s` that is at most `max_bytes`.
pub fn safe_truncate_index(s: &str, max_bytes: usize) -> usize {
    if s.len() <= max_bytes {
        return s.len();
    }
    let mut idx = max_bytes;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// First `max_chars` characters of `text`.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Parse an environment variable, returning `default` if unset.
///
/// A set-but-unparseable value is an error carrying the parse message.
pub fn env_var_parse<T>(name: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value.trim().parse().map_err(|e: T::Err| e.to_string()),
        Err(_) => Ok(default),
    }
}
