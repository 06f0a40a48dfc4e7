//! String utilities for the domain layer.

/// Shorten `s` to at most `max_len` bytes for log previews, appending `...`
/// when something was cut. Never splits a UTF-8 character.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len.saturating_sub(3).min(s.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_input_unchanged() {
        assert_eq!(truncate("go", 10), "go");
        assert_eq!(truncate("", 0), "");
    }

    #[test]
    fn test_ascii_cut() {
        assert_eq!(truncate("spawn a reviewer", 8), "spawn...");
    }

    #[test]
    fn test_multibyte_boundary() {
        // 'é' is 2 bytes; cutting inside it backs up to the previous boundary
        assert_eq!(truncate("ééééé", 8), "éé...");
    }
}
