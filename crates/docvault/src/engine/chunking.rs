//! Character-based splitting and truncation.
//!
//! Lengths are counted in Unicode scalar values, so a boundary never falls
//! inside a code point and identical text always splits identically.

/// Number of characters in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// The first `limit` characters of `text`, or all of it if shorter.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Splits `text` into contiguous chunks of exactly `chunk_size` characters;
/// the last chunk holds the remainder. Empty text yields no chunks.
///
/// A `chunk_size` of zero is treated as "no splitting".
pub fn split_into_chunks(text: &str, chunk_size: usize) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    if chunk_size == 0 {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (byte_idx, _) in text.char_indices() {
        if count == chunk_size {
            chunks.push(&text[start..byte_idx]);
            start = byte_idx;
            count = 0;
        }
        count += 1;
    }
    chunks.push(&text[start..]);
    chunks
}
