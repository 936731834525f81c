//! Unicode-safe helpers for working with UTF-8 strings.

use unicode_width::UnicodeWidthChar;

/// Convert a character index (0-based) to a byte index in the given string.
/// If `n` exceeds the number of characters, returns `s.len()`.
pub fn char_to_byte_index(s: &str, n: usize) -> usize {
    match s.char_indices().nth(n) {
        Some((i, _)) => i,
        None => s.len(),
    }
}

/// Keep the tail of `s` that fits in `width` terminal columns, prefixed with
/// `…` when something was cut. File names are told apart by their ends.
pub fn truncate_start(s: &str, width: usize) -> String {
    let total: usize = s.chars().map(|c| c.width().unwrap_or(0)).sum();
    if total <= width {
        return s.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut kept = Vec::new();
    let mut used = 1; // room for the ellipsis
    for c in s.chars().rev() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        kept.push(c);
    }
    std::iter::once('…').chain(kept.into_iter().rev()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_index_for_multibyte() {
        assert_eq!(char_to_byte_index("aé b", 2), 3);
        assert_eq!(char_to_byte_index("ab", 9), 2);
    }

    #[test]
    fn truncation_keeps_the_end() {
        assert_eq!(truncate_start("frame_0001.png", 20), "frame_0001.png");
        assert_eq!(truncate_start("frame_0001.png", 8), "…001.png");
        assert_eq!(truncate_start("图像图像.png", 7), "…像.png");
        assert_eq!(truncate_start("abc", 0), "");
    }
}
