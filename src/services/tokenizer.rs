//! Free-text tokenization.

/// Tokens longer than this many characters are kept.
const MIN_TOKEN_CHARS: usize = 3;

/// Split on whitespace and keep tokens longer than three characters, as written.
pub fn important_tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter(|token| token.chars().count() > MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}
