// String payloads are stored unescaped. The language defines exactly three
// escapes: \n, \" and \s. Escaping emits the first two; unescaping accepts
// all three, because the tokenizer hides in-string whitespace behind \s.

use bimap::BiMap;
use std::str::Chars;

lazy_static! {
    static ref ESCAPES: BiMap<char, char> = {
        let mut m = BiMap::new();
        m.insert('n', '\n');
        m.insert('"', '"');
        m
    };
}

struct StringBuilder<'a> {
    chars: Chars<'a>,
}

impl<'a> StringBuilder<'a> {
    fn new(src: &'a str) -> Self {
        Self { chars: src.chars() }
    }
}

impl Iterator for StringBuilder<'_> {
    type Item = char;

    fn next(&mut self) -> Option<Self::Item> {
        match self.chars.next()? {
            '\\' => {
                let mut ahead = self.chars.clone();
                match ahead.next() {
                    Some('s') => {
                        self.chars = ahead;
                        Some(' ')
                    }
                    Some(c) if ESCAPES.contains_left(&c) => {
                        self.chars = ahead;
                        ESCAPES.get_by_left(&c).copied()
                    }
                    // Not one of ours: leave the backslash alone.
                    _ => Some('\\'),
                }
            }
            c => Some(c),
        }
    }
}

pub(crate) fn unescape(src: &str) -> String {
    StringBuilder::new(src).collect()
}

struct StringPrinter<'a> {
    chars: Chars<'a>,
}

impl<'a> StringPrinter<'a> {
    fn new(src: &'a str) -> Self {
        Self { chars: src.chars() }
    }
}

impl Iterator for StringPrinter<'_> {
    type Item = (char, Option<char>);

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.chars.next()?;
        let charseq = match ESCAPES.get_by_right(&next) {
            Some(&l) => ('\\', Some(l)),
            None => (next, None),
        };
        Some(charseq)
    }
}

pub(crate) fn escape(src: &str) -> String {
    let mut output = String::new();
    for (char1, char2) in StringPrinter::new(src) {
        output.push(char1);
        if let Some(char2) = char2 {
            output.push(char2)
        };
    }
    output
}

pub(crate) fn string_repr(src: &str) -> String {
    let mut output = String::new();
    output.push('"');
    output.push_str(&escape(src));
    output.push('"');
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_known_escapes() {
        assert_eq!(unescape(r"a\nb"), "a\nb");
        assert_eq!(unescape(r"a\sb"), "a b");
        assert_eq!(unescape(r#"say \"hi\""#), "say \"hi\"");
    }

    #[test]
    fn unescape_leaves_other_backslashes() {
        assert_eq!(unescape(r"a\tb"), r"a\tb");
        assert_eq!(unescape(r"trailing\"), r"trailing\");
    }

    #[test]
    fn escape_quotes_and_newlines() {
        assert_eq!(escape("a\"b\nc"), "a\\\"b\\nc");
    }

    #[test]
    fn escape_then_unescape_is_identity() {
        for s in &["", "plain", "with space", "quote \" mark", "line\nbreak"] {
            assert_eq!(unescape(&escape(s)), *s);
        }
    }

    #[test]
    fn string_repr_wraps_in_quotes() {
        assert_eq!(string_repr("a b"), "\"a b\"");
        assert_eq!(string_repr("x\ny"), r#""x\ny""#);
    }
}
