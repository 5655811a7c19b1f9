/// Transport message size limit; longer replies are split into chunks.
pub const REPLY_CHUNK_SIZE: usize = 3500;

/// Normalizes a raw cell value. Spreadsheet exports leave literal "none"
/// and "nan" strings behind, which count as empty.
pub fn clean_text(value: Option<&str>) -> String {
    let s = value.unwrap_or("").trim();
    if s.eq_ignore_ascii_case("none") || s.eq_ignore_ascii_case("nan") {
        return String::new();
    }
    s.to_string()
}

/// Splits `text` into chunks of at most `chunk_size` characters, never
/// cutting inside a code point.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0usize;

    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == chunk_size {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
