//! Shared utility functions.

/// Truncate a string to approximately `max_bytes` without splitting a UTF-8
/// character boundary.
///
/// Returns a sub-slice of the original string. If the string is shorter than
/// `max_bytes`, the entire string is returned unchanged.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Keep the first `max_chars` characters, appending `...` when anything
/// was cut.
pub fn preview(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Keep the head and tail of `s` within roughly `max_bytes`, joined by an
/// omission marker.
pub fn truncate_head_tail(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let marker = format!("\n\n[... {} bytes omitted ...]\n\n", s.len().saturating_sub(max_bytes));
    let budget = max_bytes.saturating_sub(marker.len());
    let head = truncate_str(s, budget / 2);
    let mut tail_start = s.len() - (budget - head.len()).min(s.len());
    while tail_start < s.len() && !s.is_char_boundary(tail_start) {
        tail_start += 1;
    }
    format!("{head}{marker}{}", &s[tail_start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_ascii() {
        assert_eq!(truncate_str("hello world", 5), "hello");
    }

    #[test]
    fn truncate_no_op_when_short() {
        assert_eq!(truncate_str("hi", 10), "hi");
    }

    #[test]
    fn truncate_multibyte_boundary() {
        // '나' is 3 bytes
        let s = "가나다"; // 9 bytes: 3+3+3
        assert_eq!(truncate_str(s, 4), "가");
        assert_eq!(truncate_str(s, 6), "가나");
    }

    #[test]
    fn truncate_empty() {
        assert_eq!(truncate_str("", 10), "");
    }

    #[test]
    fn preview_counts_characters() {
        assert_eq!(preview("가나다라", 2), "가나...");
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("exact", 5), "exact");
    }

    #[test]
    fn head_tail_keeps_both_ends() {
        let s = format!("{}{}", "a".repeat(500), "z".repeat(500));
        let out = truncate_head_tail(&s, 200);
        assert!(out.starts_with("aaa"));
        assert!(out.ends_with("zzz"));
        assert!(out.contains("bytes omitted"));
        assert!(out.len() <= 200);
    }

    #[test]
    fn head_tail_no_op_when_short() {
        assert_eq!(truncate_head_tail("abc", 10), "abc");
    }
}
