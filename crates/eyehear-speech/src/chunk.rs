//! Whitespace-aware text chunking.

/// Maximum characters the TTS endpoint accepts per request.
pub const MAX_CHUNK_CHARS: usize = 200;

/// Split text into chunks of at most `max_chars` characters, breaking
/// only at whitespace. A single word longer than `max_chars` becomes
/// its own chunk rather than being cut mid-word.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
