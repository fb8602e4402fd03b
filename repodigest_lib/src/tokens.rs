//! Cheap token estimation used to size prompts and batches.

/// Average number of characters a model token covers for source code.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimates how many model tokens `text` will consume.
///
/// Counts characters in a single pass and rounds up, so the estimate never
/// decreases as text grows and empty text is zero tokens.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}
