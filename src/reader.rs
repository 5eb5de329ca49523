use crate::strings;
use crate::types::{Int, List, Value};
use regex::Regex;
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, PartialEq)]
pub enum ParseError {
    EmptyInput,
    UnbalancedParens,
    UnterminatedString,
    IntOutOfRange(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::EmptyInput => write!(f, "attempting to parse an empty expression"),
            ParseError::UnbalancedParens => write!(f, "parentheses don't match"),
            ParseError::UnterminatedString => write!(f, "unterminated string literal"),
            ParseError::IntOutOfRange(token) => {
                write!(f, "integer literal '{}' out of range", token)
            }
        }
    }
}

lazy_static! {
    static ref INT_RE: Regex = Regex::new(r"^-?[0-9]+$").unwrap();
}

/// Isolate parentheses and hide in-string whitespace behind escape
/// placeholders, so the token stream is a plain whitespace split.
fn spread(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut prev_backslash = false;
    for c in text.chars() {
        if in_string {
            match c {
                '"' if !prev_backslash => {
                    in_string = false;
                    out.push(c);
                }
                ' ' => out.push_str("\\s"),
                '\n' => out.push_str("\\n"),
                _ => out.push(c),
            }
            prev_backslash = c == '\\' && !prev_backslash;
        } else {
            match c {
                '"' => {
                    in_string = true;
                    out.push(c);
                }
                '(' => out.push_str(" ( "),
                ')' => out.push_str(" ) "),
                _ => out.push(c),
            }
            prev_backslash = false;
        }
    }
    out
}

pub(crate) fn tokenize(text: &str) -> VecDeque<String> {
    spread(text).split_whitespace().map(String::from).collect()
}

/// Parse a single well-formed form from `text`. Trailing tokens beyond the
/// first form are ignored; callers with multi-form buffers go through
/// `split_top_level_forms` first.
pub fn parse(text: &str) -> Result<Value, ParseError> {
    let mut tokens = tokenize(text);
    if tokens.is_empty() {
        return Err(ParseError::EmptyInput);
    }
    parse_tokens(&mut tokens)
}

fn parse_tokens(tokens: &mut VecDeque<String>) -> Result<Value, ParseError> {
    let token = tokens.pop_front().ok_or(ParseError::UnbalancedParens)?;
    if token == ")" {
        return Err(ParseError::UnbalancedParens);
    }
    if token == "(" {
        let mut elements = List::default();
        loop {
            match tokens.front().map(String::as_str) {
                Some(")") => {
                    tokens.pop_front();
                    break;
                }
                Some(_) => elements.push_back(parse_tokens(tokens)?),
                None => return Err(ParseError::UnbalancedParens),
            }
        }
        return Ok(Value::wrap_list(elements));
    }
    atom(&token)
}

fn atom(token: &str) -> Result<Value, ParseError> {
    if INT_RE.is_match(token) {
        return token
            .parse::<Int>()
            .map(Value::Integer)
            .map_err(|_| ParseError::IntOutOfRange(token.into()));
    }
    if token.starts_with('"') {
        return string_literal(token);
    }
    Ok(Value::new_symbol(token))
}

fn string_literal(token: &str) -> Result<Value, ParseError> {
    let bytes = token.as_bytes();
    if bytes.len() == 1 || bytes[bytes.len() - 1] != b'"' {
        return Err(ParseError::UnterminatedString);
    }
    // A trailing quote preceded by an odd number of backslashes is escaped,
    // not closing.
    let trailing_backslashes = bytes
        .iter()
        .rev()
        .skip(1)
        .take_while(|&&byte| byte == b'\\')
        .count();
    if trailing_backslashes % 2 == 1 {
        return Err(ParseError::UnterminatedString);
    }
    Ok(Value::String(strings::unescape(
        &token[1..token.len() - 1],
    )))
}

/// Divide a multi-form buffer into one substring per top-level form. A
/// parenthesised form ends when its paren depth returns to zero; a bare atom
/// ends at the next separator. Parentheses inside string literals don't
/// count.
pub fn split_top_level_forms(text: &str) -> Vec<String> {
    let mut forms = Vec::new();
    let mut current = String::new();
    let mut depth: i64 = 0;
    let mut in_string = false;
    let mut prev_backslash = false;

    let mut flush = |current: &mut String| {
        let form = current.trim();
        if !form.is_empty() {
            forms.push(form.to_string());
        }
        current.clear();
    };

    for c in text.chars() {
        if in_string {
            current.push(c);
            if c == '"' && !prev_backslash {
                in_string = false;
            }
            prev_backslash = c == '\\' && !prev_backslash;
            continue;
        }
        prev_backslash = false;
        match c {
            '"' => {
                in_string = true;
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
                if depth == 0 {
                    flush(&mut current);
                }
            }
            c if c.is_whitespace() => {
                if depth == 0 {
                    flush(&mut current);
                } else {
                    current.push(c);
                }
            }
            _ => current.push(c),
        }
    }
    flush(&mut current);
    forms
}

/// Balanced parentheses, with no closer before its opener.
pub fn paren_match(text: &str) -> bool {
    let mut depth: i64 = 0;
    let mut in_string = false;
    let mut prev_backslash = false;
    for c in text.chars() {
        if in_string {
            if c == '"' && !prev_backslash {
                in_string = false;
            }
            prev_backslash = c == '\\' && !prev_backslash;
            continue;
        }
        prev_backslash = false;
        match c {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    depth == 0
}

/// All string literals closed.
pub fn quote_match(text: &str) -> bool {
    let mut in_string = false;
    let mut prev_backslash = false;
    for c in text.chars() {
        if in_string {
            if c == '"' && !prev_backslash {
                in_string = false;
            }
            prev_backslash = c == '\\' && !prev_backslash;
        } else {
            prev_backslash = false;
            if c == '"' {
                in_string = true;
            }
        }
    }
    !in_string
}

pub fn balanced(text: &str) -> bool {
    paren_match(text) && quote_match(text)
}

/// Advisory continuation column for a line-editing front end. `open_columns`
/// carries the columns of still-open parens across successive calls; the
/// result is the column a continuation line should start at.
pub fn indent(code: &str, open_columns: &mut Vec<usize>, indent_length: usize) -> usize {
    let mut column = 0usize;
    let mut in_string = false;
    let mut prev_backslash = false;
    for c in code.chars() {
        if c == '\n' {
            column = 0;
            continue;
        }
        if in_string {
            if c == '"' && !prev_backslash {
                in_string = false;
            }
            prev_backslash = c == '\\' && !prev_backslash;
        } else {
            prev_backslash = false;
            match c {
                '"' => in_string = true,
                '(' => open_columns.push(column),
                ')' => {
                    open_columns.pop();
                }
                _ => {}
            }
        }
        column += 1;
    }
    open_columns
        .last()
        .map(|col| col + indent_length)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Symbol;

    #[test]
    fn tokenize_isolates_parens() {
        let tokens: Vec<String> = tokenize("(+ 1 (neg 2))").into_iter().collect();
        assert_eq!(tokens, vec!["(", "+", "1", "(", "neg", "2", ")", ")"]);
    }

    #[test]
    fn tokenize_keeps_string_contents_together() {
        let tokens: Vec<String> = tokenize(r#"(print "a b")"#).into_iter().collect();
        assert_eq!(tokens, vec!["(", "print", r#""a\sb""#, ")"]);
    }

    #[test]
    fn parse_atoms() {
        assert_eq!(parse("42").unwrap(), Value::Integer(42));
        assert_eq!(parse("-7").unwrap(), Value::Integer(-7));
        assert_eq!(parse("foo").unwrap(), Value::Symbol(Symbol::from("foo")));
        assert_eq!(parse("-").unwrap(), Value::Symbol(Symbol::from("-")));
        assert_eq!(parse(r#""a b""#).unwrap(), Value::String("a b".into()));
        assert_eq!(parse(r#""a\nb""#).unwrap(), Value::String("a\nb".into()));
    }

    #[test]
    fn parse_nested_lists() {
        let parsed = parse("(a (b 1) ())").unwrap();
        let outer = parsed.as_list().unwrap();
        assert_eq!(outer.len(), 3);
        assert_eq!(outer[0], Value::new_symbol("a"));
        let inner = outer[1].as_list().unwrap();
        assert_eq!(inner[1], Value::Integer(1));
        assert!(outer[2].as_list().unwrap().is_empty());
    }

    #[test]
    fn parse_errors() {
        assert_eq!(parse(""), Err(ParseError::EmptyInput));
        assert_eq!(parse("(a (b)"), Err(ParseError::UnbalancedParens));
        assert_eq!(parse(")"), Err(ParseError::UnbalancedParens));
        assert_eq!(parse(r#""oops"#), Err(ParseError::UnterminatedString));
        assert!(matches!(
            parse("99999999999999999999999999"),
            Err(ParseError::IntOutOfRange(_))
        ));
    }

    #[test]
    fn split_forms() {
        assert_eq!(
            split_top_level_forms("(a b) c (d (e))"),
            vec!["(a b)", "c", "(d (e))"]
        );
    }

    #[test]
    fn split_forms_ignores_parens_in_strings() {
        assert_eq!(
            split_top_level_forms(r#"(print ")(") x"#),
            vec![r#"(print ")(")"#, "x"]
        );
    }

    #[test]
    fn paren_matching() {
        assert!(paren_match("(a (b) c)"));
        assert!(!paren_match("(a (b c)"));
        assert!(!paren_match(")("));
        assert!(paren_match(r#"("unbalanced ) inside string (")"#));
    }

    #[test]
    fn quote_matching() {
        assert!(quote_match(r#""closed""#));
        assert!(!quote_match(r#""open"#));
        assert!(quote_match(r#""escaped \" still closed""#));
    }

    #[test]
    fn indent_tracks_open_parens() {
        let mut open = Vec::new();
        assert_eq!(indent("(define (f x)", &mut open, 2), 2);
        assert_eq!(open, vec![0]);
        assert_eq!(indent("(+ x 1))", &mut open, 2), 0);
        assert!(open.is_empty());
    }
}
