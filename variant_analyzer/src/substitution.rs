// src/substitution.rs

/// Replaces the single base at `offset` with `alternate`.
///
/// Returns `None` when `offset` is past the end of `sequence` or `alternate`
/// is not an ASCII base; length is always preserved otherwise.
pub fn substitute(sequence: &str, offset: usize, alternate: char) -> Option<String> {
    if offset >= sequence.len() || !alternate.is_ascii() {
        return None;
    }
    let mut bytes = sequence.as_bytes().to_vec();
    bytes[offset] = alternate as u8;
    String::from_utf8(bytes).ok()
}
