/// Split SQL into individual statements.
///
/// Semicolons inside single-quoted literals and dollar-quoted bodies
/// (`$$ ... $$`, `$tag$ ... $tag$`) do not end a statement. Comment-only
/// fragments are dropped.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut dollar_tag: Option<String> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);

        if in_single_quote {
            if c == '\'' {
                in_single_quote = false;
            }
            continue;
        }

        if c == '$' {
            // Collect a potential tag like $$ or $body$
            let mut tag = String::from("$");
            while let Some(&next) = chars.peek() {
                if next == '$' {
                    tag.push(next);
                    current.push(next);
                    chars.next();
                    break;
                } else if next.is_alphanumeric() || next == '_' {
                    tag.push(next);
                    current.push(next);
                    chars.next();
                } else {
                    break;
                }
            }

            if tag.len() >= 2 && tag.ends_with('$') {
                match &dollar_tag {
                    Some(open) if *open == tag => dollar_tag = None,
                    None => dollar_tag = Some(tag),
                    Some(_) => {}
                }
            }
            continue;
        }

        if dollar_tag.is_some() {
            continue;
        }

        match c {
            '\'' => in_single_quote = true,
            '-' if chars.peek() == Some(&'-') => {
                // Line comment: copy through to the end of the line
                for next in chars.by_ref() {
                    current.push(next);
                    if next == '\n' {
                        break;
                    }
                }
            }
            ';' => {
                push_statement(&mut statements, &current);
                current.clear();
            }
            _ => {}
        }
    }

    // The last statement might not end with ;
    push_statement(&mut statements, &current);
    statements
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let stmt = raw.trim().trim_end_matches(';').trim();
    let comment_only = stmt.lines().all(|l| {
        let l = l.trim();
        l.is_empty() || l.starts_with("--")
    });
    if !comment_only {
        statements.push(stmt.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple_statements() {
        let stmts = split_sql_statements("SELECT 1; SELECT 2; SELECT 3;");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2", "SELECT 3"]);
    }

    #[test]
    fn test_split_without_trailing_semicolon() {
        let stmts = split_sql_statements("SELECT 1;\nSELECT 2");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_split_ignores_semicolon_in_literal() {
        let stmts = split_sql_statements(
            "INSERT INTO \"Notes\" (\"Body\") VALUES ('a; b'); SELECT 2;",
        );
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].ends_with("('a; b')"));
    }

    #[test]
    fn test_split_with_dollar_quoted_function() {
        let sql = r#"
CREATE FUNCTION touch_updated_at() RETURNS trigger AS $$
BEGIN
    NEW."UpdatedAt" := NOW();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

SELECT 3;
"#;
        let stmts = split_sql_statements(sql);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].contains("CREATE FUNCTION"));
        assert!(stmts[0].contains("$$ LANGUAGE plpgsql"));
        assert!(stmts[1].contains("SELECT 3"));
    }

    #[test]
    fn test_split_drops_comment_only_fragments() {
        let stmts = split_sql_statements("-- nothing here\n;\nSELECT 1;\n-- trailing");
        assert_eq!(stmts, vec!["SELECT 1"]);
    }

    #[test]
    fn test_split_comment_with_quote() {
        let stmts = split_sql_statements("-- don't split here; really\nSELECT 1; SELECT 2;");
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].ends_with("SELECT 1"));
    }

    #[test]
    fn test_split_empty_input() {
        assert!(split_sql_statements("").is_empty());
        assert!(split_sql_statements("   \n").is_empty());
    }
}
