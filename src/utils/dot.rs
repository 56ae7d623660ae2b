//! Helpers for emitting Graphviz DOT.

/// Escapes `text` for use inside a double-quoted DOT label.
///
/// Quotes, backslashes and record-shape delimiters are escaped, line feeds become `\n`
/// and carriage returns are dropped.
#[must_use]
pub fn escape_dot(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' | '"' | '<' | '>' | '{' | '}' | '|' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(escape_dot("y = x + 1"), "y = x + 1");
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(escape_dot("s = \"a\\b\""), "s = \\\"a\\\\b\\\"");
    }

    #[test]
    fn test_comparisons_and_records() {
        assert_eq!(escape_dot("c = a < b"), "c = a \\< b");
        assert_eq!(escape_dot("{x|y}"), "\\{x\\|y\\}");
    }

    #[test]
    fn test_line_endings() {
        assert_eq!(escape_dot("a\r\nb"), "a\\nb");
    }
}
