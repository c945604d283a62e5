//! Boundary-preserving text splitting for length-limited speech providers.

/// Text at or below this length is synthesized in a single call
pub const CHUNK_THRESHOLD: usize = 4000;

/// Largest slice index not exceeding `max` that falls on a char boundary
fn floor_char_boundary(text: &str, max: usize) -> usize {
    if max >= text.len() {
        return text.len();
    }
    let mut index = max;
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn last_sentence_end(chunk: &str) -> Option<usize> {
    ['.', '!', '?']
        .iter()
        .filter_map(|c| chunk.rfind(*c))
        .max()
}

/// Split long text into chunks of at most `max_chunk_size`, preferring in
/// order: the last sentence terminator after 60% of the chunk, the last
/// paragraph break after 50%, the last word boundary after 80%, then a hard
/// cut. Concatenating the chunks accounts for all original characters up to
/// whitespace trimmed at the seams.
pub fn chunk_text(text: &str, max_chunk_size: usize) -> Vec<String> {
    if text.len() <= max_chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_chunk_size {
            chunks.push(remaining.to_string());
            break;
        }

        let window_end = floor_char_boundary(remaining, max_chunk_size);
        let window = &remaining[..window_end];

        let split_point = match last_sentence_end(window) {
            Some(pos) if pos > max_chunk_size * 6 / 10 => pos + 1,
            _ => match window.rfind("\n\n") {
                Some(pos) if pos > max_chunk_size / 2 => pos + 2,
                _ => match window.rfind(' ') {
                    Some(pos) if pos > max_chunk_size * 8 / 10 => pos,
                    _ => window_end,
                },
            },
        };

        chunks.push(remaining[..split_point].trim().to_string());
        remaining = remaining[split_point..].trim_start();
    }

    chunks.retain(|chunk| !chunk.is_empty());
    chunks
}

/// Trim text to `max_len` and end cleanly on a sentence: if a period falls
/// within the final 20% of the truncated slice, cut there instead of
/// mid-sentence. Used for short previews and audio regeneration.
pub fn truncate_to_sentence(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }

    let end = floor_char_boundary(text, max_len);
    let truncated = &text[..end];

    if let Some(last_period) = truncated.rfind('.') {
        if last_period > max_len * 8 / 10 {
            return truncated[..=last_period].to_string();
        }
    }

    truncated.to_string()
}
