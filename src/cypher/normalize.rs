//! Statement whitespace normalization
//!
//! Best effort. The scanner knows Cypher's three quote characters (`'`, `"`,
//! and backtick-quoted identifiers), backslash escapes inside string
//! literals, and `//` line comments. Anything else is treated as plain query
//! text. Normalization is cosmetic; it only makes statements readable in
//! server logs.

/// Collapses whitespace runs outside literals to a single space.
///
/// - Leading and trailing whitespace is dropped.
/// - Literal contents are copied verbatim, tabs and newlines included.
/// - A `//` comment keeps its terminating newline so it cannot swallow the
///   text that follows it.
/// - An unterminated literal is copied verbatim to the end.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut pending_space = false;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' && q != '`' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }

        if pending_space {
            if !out.ends_with('\n') {
                out.push(' ');
            }
            pending_space = false;
        }

        if c == '/' && chars.peek() == Some(&'/') {
            out.push(c);
            for next in chars.by_ref() {
                if next == '\n' {
                    out.push('\n');
                    break;
                }
                out.push(next);
            }
            continue;
        }

        if c == '\'' || c == '"' || c == '`' {
            quote = Some(c);
        }
        out.push(c);
    }

    // A comment closing the statement leaves a newline nothing needs.
    if quote.is_none() && out.ends_with('\n') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_indentation() {
        let query = "\n\t\tMATCH (a:Person)-[r]->(b)\n\t\tWHERE a.name = $name\n\t\tRETURN a.name, type(r), b.name\n\t";
        assert_eq!(
            normalize_whitespace(query),
            "MATCH (a:Person)-[r]->(b) WHERE a.name = $name RETURN a.name, type(r), b.name"
        );
    }

    #[test]
    fn test_tab_between_tokens_becomes_space() {
        assert_eq!(normalize_whitespace("RETURN\t1"), "RETURN 1");
    }

    #[test]
    fn test_string_literals_untouched() {
        let query = "CREATE (n {bio: 'line one\n\tline  two'})\n  RETURN n";
        assert_eq!(
            normalize_whitespace(query),
            "CREATE (n {bio: 'line one\n\tline  two'}) RETURN n"
        );
        let double = "RETURN \"a   b\"";
        assert_eq!(normalize_whitespace(double), double);
    }

    #[test]
    fn test_escaped_quote_stays_in_literal() {
        let query = r#"RETURN 'it\'s   fine'   AS s"#;
        assert_eq!(normalize_whitespace(query), r#"RETURN 'it\'s   fine' AS s"#);
    }

    #[test]
    fn test_backtick_identifier() {
        let query = "MATCH (n:`Odd   Label`)\n RETURN n";
        assert_eq!(normalize_whitespace(query), "MATCH (n:`Odd   Label`) RETURN n");
    }

    #[test]
    fn test_line_comment_keeps_newline() {
        let query = "MATCH (n) // all nodes\n    RETURN n";
        assert_eq!(normalize_whitespace(query), "MATCH (n) // all nodes\nRETURN n");
    }

    #[test]
    fn test_unterminated_literal_copied() {
        assert_eq!(normalize_whitespace("RETURN 'abc \n  def"), "RETURN 'abc \n  def");
    }

    #[test]
    fn test_blank_input() {
        assert_eq!(normalize_whitespace(" \n\t "), "");
    }
}
