//! Greedy word wrap for monospace rendering of bot replies.

use unicode_width::UnicodeWidthStr;

/// Column width used for bot text.
pub const DEFAULT_WIDTH: usize = 100;

/// Wraps `text` so no line exceeds `width` columns, except a line holding a
/// single word that is wider than `width` on its own.
///
/// Words are separated by single spaces and every space is kept, so runs of
/// spaces and paragraph indentation survive. Where a line is broken, the
/// spaces at the break are dropped. Lines lose trailing spaces. Existing line
/// breaks are kept, which makes wrapping already-wrapped text a no-op.
pub fn wrap(text: &str, width: usize) -> String {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        // Words placed on `line`, including empty ones from space runs.
        let mut placed = 0usize;
        let mut has_text = false;
        let mut after_break = false;
        for word in paragraph.split(' ') {
            if after_break && placed == 0 && word.is_empty() {
                continue;
            }
            if has_text && !word.is_empty() && line.width() + 1 + word.width() > width {
                lines.push(line.trim_end_matches(' ').to_string());
                line.clear();
                placed = 0;
                has_text = false;
                after_break = true;
            }
            if placed > 0 {
                line.push(' ');
            }
            line.push_str(word);
            placed += 1;
            has_text |= !word.is_empty();
        }
        lines.push(line.trim_end_matches(' ').to_string());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(wrap("hello world", DEFAULT_WIDTH), "hello world");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(wrap("", DEFAULT_WIDTH), "");
    }

    #[test]
    fn breaks_before_the_word_that_overflows() {
        assert_eq!(wrap("aaa bbb ccc", 7), "aaa bbb\nccc");
        assert_eq!(wrap("aaa bbb ccc", 6), "aaa\nbbb\nccc");
    }

    #[test]
    fn long_word_gets_its_own_line() {
        assert_eq!(wrap("a abcdefghij b", 5), "a\nabcdefghij\nb");
        assert_eq!(wrap("abcdefghij", 5), "abcdefghij");
    }

    #[test]
    fn keeps_space_runs_and_indentation() {
        assert_eq!(wrap("  one   two  ", 20), "  one   two");
        assert_eq!(wrap("SELECT *\n  FROM t", DEFAULT_WIDTH), "SELECT *\n  FROM t");
    }

    #[test]
    fn drops_spaces_at_a_break() {
        assert_eq!(wrap("aaa   bbb", 5), "aaa\nbbb");
    }

    #[test]
    fn indented_long_word_stays_on_its_line() {
        assert_eq!(wrap("    abcdefghij", 5), "    abcdefghij");
    }

    #[test]
    fn keeps_existing_line_breaks() {
        assert_eq!(wrap("title\nbody text here", 9), "title\nbody text\nhere");
    }

    #[test]
    fn counts_display_columns() {
        // Each CJK character occupies two columns.
        assert_eq!(wrap("銷售 報表", 4), "銷售\n報表");
        assert_eq!(wrap("銷售 報表", 9), "銷售 報表");
    }

    #[test]
    fn wrapping_indented_text_is_idempotent() {
        let text = "Top products:\n  - widgets  (42%)\n  - gadgets  (31%)  and a long tail of others";
        for width in [12, 20, DEFAULT_WIDTH] {
            let once = wrap(text, width);
            assert_eq!(wrap(&once, width), once, "width {width}");
        }
    }

    #[test]
    fn wrapping_is_idempotent() {
        let text = "The total revenue for the last quarter was 1.2M, driven mostly by the \
                    western region where orders grew by twelve percent compared to the \
                    previous quarter while returns stayed flat.";
        for width in [10, 25, 40, DEFAULT_WIDTH] {
            let once = wrap(text, width);
            assert_eq!(wrap(&once, width), once, "width {width}");
            assert!(once.lines().all(|line| line.width() <= width));
        }
    }
}
