//! Text cleanup and chunking.

/// Default maximum chunk length in characters.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 800;
/// A period must sit past this offset inside a window to end the chunk there.
pub const DEFAULT_MIN_BREAK_OFFSET: usize = 200;

/// Chunking parameters, both in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOptions {
    pub max_chars: usize,
    pub min_break: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHUNK_CHARS,
            min_break: DEFAULT_MIN_BREAK_OFFSET,
        }
    }
}

/// Decode UTF-8, dropping invalid byte sequences instead of replacing them.
pub fn decode_lossy(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

/// Collapse whitespace runs to one space, drop other control characters, trim.
pub fn clean_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if is_c0_control(ch) {
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }
    out
}

/// ASCII controls `U+0000..=U+001F` and DEL. C1 controls are kept.
fn is_c0_control(ch: char) -> bool {
    ch <= '\u{1f}' || ch == '\u{7f}'
}

/// Split text into trimmed, non-empty chunks of at most `max_chars` characters.
///
/// Each window of `max_chars` ends right after its last `.` when that period
/// sits past `min_break` characters into the window; otherwise it ends at the
/// hard limit.
pub fn chunk_text(text: &str, options: ChunkOptions) -> Vec<String> {
    let max_chars = options.max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        return vec![trimmed.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let mut end = (start + max_chars).min(chars.len());
        if let Some(dot) = chars[start..end].iter().rposition(|ch| *ch == '.') {
            if dot > options.min_break {
                end = start + dot + 1;
            }
        }
        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        start = end;
    }
    chunks
}
