//! Small shared helpers.

/// Truncate a string for logging purposes.
///
/// Model replies and page excerpts can be long; logs keep the first `max`
/// bytes with a byte-count indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hallo, Welt!", 100), "Hallo, Welt!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        // "ä" is two bytes; cutting inside it must not panic.
        let s = "ää".repeat(100);
        let result = truncate_for_log(&s, 101);
        assert!(result.starts_with("ä"));
    }
}
