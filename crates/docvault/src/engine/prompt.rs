//! Prompt templates and notices.

/// Placed between generated markdown sections.
pub const SECTION_DELIMITER: &str = "\n\n---\n\n";

pub fn summary_prompt(text: &str) -> String {
    format!(
        "Please provide a concise summary of the following document:\n\n{}",
        text
    )
}

pub fn truncated_summary_prompt(text: &str, total_chars: usize, limit: usize) -> String {
    format!(
        "Note: This is a large document ({} characters). Below is the first {} characters. \
         Please provide a concise summary:\n\n{}",
        total_chars, limit, text
    )
}

/// Prepended to a summary generated from truncated text.
pub fn summary_truncation_notice(limit: usize, total_chars: usize) -> String {
    format!(
        "**Note:** Summary generated from the first {} of {} characters.\n\n",
        limit, total_chars
    )
}

pub fn markdown_prompt(text: &str) -> String {
    format!(
        "Convert the following document into clean, well-formatted markdown. \
         Preserve the structure and formatting:\n\n{}",
        text
    )
}

pub fn chunk_prompt(chunk: &str, part: usize, of: usize) -> String {
    format!(
        "Convert the following document section (part {} of {}) into clean, well-formatted \
         markdown. Preserve the structure and formatting. Do not add introductory text or \
         explanations, just convert to markdown:\n\n{}",
        part, of, chunk
    )
}

/// Prepended to markdown when only the first `processed_chunks` chunks
/// were rendered.
pub fn chunk_cap_notice(
    processed_chars: usize,
    total_chars: usize,
    processed_chunks: usize,
    total_chunks: usize,
) -> String {
    format!(
        "> **Note:** This document was very large. Showing markdown for the first {} of {} \
         characters ({} of {} sections).\n\n",
        format_count(processed_chars),
        format_count(total_chars),
        processed_chunks,
        total_chunks
    )
}

/// Formats a count with comma thousands separators.
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
