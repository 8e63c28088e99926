use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Cuts `s` to at most `max` display columns, marking the cut with `...`.
pub fn truncate(s: &str, max: usize) -> String {
    if display_width(s) <= max {
        return s.to_string();
    }
    let room = max.saturating_sub(3);
    let mut width = 0;
    let mut out = String::new();
    for c in s.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + w > room {
            break;
        }
        width += w;
        out.push(c);
    }
    out.push_str("...");
    out
}

/// Single-line preview of a prompt or reply for log fields.
pub fn preview(s: &str) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(&flat, 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ascii_width() {
        assert_eq!(display_width("Mount"), 5);
    }

    #[test]
    fn cjk_width() {
        assert_eq!(display_width("柔術"), 4);
    }

    #[test]
    fn truncate_short_text_unchanged() {
        assert_eq!(truncate("Side Control", 20), "Side Control");
    }

    #[test]
    fn truncate_long_text() {
        assert_eq!(truncate("Rubber guard to omoplata", 10), "Rubber ...");
    }

    #[test]
    fn truncate_counts_wide_chars() {
        assert_eq!(truncate("柔術柔術柔術", 7), "柔術...");
    }

    #[test]
    fn preview_flattens_lines() {
        assert_eq!(preview("graph TD\n    A --> B"), "graph TD A --> B");
    }
}
