//! Token estimation for LLM context budgets.
//!
//! This is a length heuristic, not a tokenizer: roughly four characters per
//! token, which sits between typical code (~3.5) and prose (~4.2).

/// Characters assumed per token.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of `text`: character count divided by four,
/// rounded up.
///
/// # Examples
///
/// ```
/// use treedigest::tokens::estimate_tokens;
///
/// assert_eq!(estimate_tokens(""), 0);
/// assert_eq!(estimate_tokens("Hello"), 2);
/// ```
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Estimate tokens for several texts as if they were concatenated.
pub fn estimate_tokens_joined(parts: &[&str]) -> usize {
    parts
        .iter()
        .map(|p| p.chars().count())
        .sum::<usize>()
        .div_ceil(CHARS_PER_TOKEN)
}

/// Smallest count whose one-decimal `k` form would read `1000.0k`.
const MILLION_CUTOFF: usize = 999_950;

/// Render a token count compactly: `999`, `1.0k`, `2.5M`.
pub fn format_token_count(tokens: usize) -> String {
    if tokens >= MILLION_CUTOFF {
        format!("{:.1}M", tokens as f64 / 1_000_000.0)
    } else if tokens >= 1_000 {
        format!("{:.1}k", tokens as f64 / 1_000.0)
    } else {
        tokens.to_string()
    }
}
