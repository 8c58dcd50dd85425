//! Reply splitting for platform message-length limits.
//!
//! Discord rejects messages over 2000 characters, so long replies are split
//! at safe boundaries before sending.

/// Split `text` into chunks of at most `max_len` bytes.
///
/// Rules:
/// 1. Prefer splitting at paragraph boundaries (`\n\n`).
/// 2. Fall back to line boundaries (`\n`), then a hard cut.
/// 3. A hard cut never lands inside a multi-byte character.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        // Largest prefix within the limit that ends on a char boundary.
        let safe_limit = remaining
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= max_len)
            .last()
            .unwrap_or(0);
        let candidate = &remaining[..safe_limit];

        let split_at = find_split_point(candidate, safe_limit);
        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start_matches(['\n', '\r']);
    }

    chunks
}

/// Find the best byte offset to split `candidate` (up to `limit` bytes).
fn find_split_point(candidate: &str, limit: usize) -> usize {
    if let Some(pos) = candidate.rfind("\n\n")
        && pos > 0
    {
        return pos;
    }

    if let Some(pos) = candidate.rfind('\n')
        && pos > 0
    {
        return pos;
    }

    let mut cut = limit;
    while cut > 0 && !candidate.is_char_boundary(cut) {
        cut -= 1;
    }
    cut
}
