//! Escape and quote aware tokenizer for line protocol
//!
//! A line is scanned once. Backslash escapes are resolved into a private
//! buffer, and every `,`, `=` or whitespace character outside a double quoted
//! span is recorded as a boundary. The line parser then walks the boundaries
//! in order, reading the span that each one closes.

use kairosdb_core::error::{KairosError, KairosResult};

pub const UNTERMINATED_QUOTE: &str = "Invalid syntax: unterminated double quote";
pub const PREMATURE_END: &str = "Premature end of input.";

/// The character class that closed a span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Equals,
    Whitespace,
    /// Sentinel boundary at the end of the line
    End,
}

impl Delimiter {
    fn from_char(c: char) -> Option<Self> {
        match c {
            ',' => Some(Delimiter::Comma),
            '=' => Some(Delimiter::Equals),
            c if is_delimiter_whitespace(c) => Some(Delimiter::Whitespace),
            _ => None,
        }
    }

    /// True for the delimiters that may end a tag or field value
    pub fn ends_pair(self) -> bool {
        matches!(self, Delimiter::Comma | Delimiter::Whitespace)
    }
}

/// Whitespace that separates blocks: Unicode white space minus the
/// non-breaking spaces, plus the ASCII separators U+001C..U+001F.
fn is_delimiter_whitespace(c: char) -> bool {
    (c.is_whitespace() && !matches!(c, '\u{a0}' | '\u{2007}' | '\u{202f}'))
        || ('\u{1c}'..='\u{1f}').contains(&c)
}

#[derive(Debug, Clone, Copy)]
struct Boundary {
    /// Byte offset of the delimiter in the unescaped buffer
    offset: usize,
    /// Byte width of the delimiter character; zero for the sentinel
    width: usize,
    delimiter: Delimiter,
}

/// Tokenizer state for a single line. Not reused across lines.
#[derive(Debug)]
pub struct Tokenizer {
    buffer: String,
    boundaries: Vec<Boundary>,
    position: usize,
    span_start: usize,
}

impl Tokenizer {
    /// Scan `line`, failing only if a double quote is left open
    pub fn new(line: &str) -> KairosResult<Self> {
        let mut buffer = String::with_capacity(line.len());
        let mut boundaries = Vec::new();
        let mut in_quote = false;
        let mut chars = line.chars();

        while let Some(c) = chars.next() {
            if c == '\\' {
                // A trailing backslash has nothing to escape and is kept as is
                buffer.push(chars.next().unwrap_or('\\'));
                continue;
            }

            if c == '"' {
                in_quote = !in_quote;
            } else if !in_quote {
                if let Some(delimiter) = Delimiter::from_char(c) {
                    boundaries.push(Boundary {
                        offset: buffer.len(),
                        width: c.len_utf8(),
                        delimiter,
                    });
                }
            }

            buffer.push(c);
        }

        if in_quote {
            return Err(KairosError::parse(UNTERMINATED_QUOTE));
        }

        boundaries.push(Boundary {
            offset: buffer.len(),
            width: 0,
            delimiter: Delimiter::End,
        });

        Ok(Self {
            buffer,
            boundaries,
            position: 0,
            span_start: 0,
        })
    }

    /// Delimiter that closes the current span
    pub fn delimiter(&self) -> Delimiter {
        self.current().delimiter
    }

    /// Unescaped content of the current span
    pub fn token(&self) -> &str {
        &self.buffer[self.span_start..self.current().offset]
    }

    /// True once the current span is closed by the end of the line
    pub fn is_at_end(&self) -> bool {
        self.delimiter() == Delimiter::End
    }

    /// Move to the span following the current delimiter
    pub fn advance(&mut self) -> KairosResult<()> {
        if self.position + 1 >= self.boundaries.len() {
            return Err(KairosError::parse(PREMATURE_END));
        }

        let closed = self.current();
        self.span_start = closed.offset + closed.width;
        self.position += 1;
        Ok(())
    }

    fn current(&self) -> Boundary {
        self.boundaries[self.position]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(line: &str) -> Vec<(String, Delimiter)> {
        let mut tokenizer = Tokenizer::new(line).unwrap();
        let mut spans = vec![(tokenizer.token().to_string(), tokenizer.delimiter())];
        while !tokenizer.is_at_end() {
            tokenizer.advance().unwrap();
            spans.push((tokenizer.token().to_string(), tokenizer.delimiter()));
        }
        spans
    }

    #[test]
    fn test_simple_line() {
        use Delimiter::*;
        let spans = collect("cpu,host=a usage=1 10");
        let expected = vec![
            ("cpu", Comma),
            ("host", Equals),
            ("a", Whitespace),
            ("usage", Equals),
            ("1", Whitespace),
            ("10", End),
        ];
        let expected: Vec<(String, Delimiter)> = expected
            .into_iter()
            .map(|(s, d)| (s.to_string(), d))
            .collect();
        assert_eq!(spans, expected);
    }

    #[test]
    fn test_escapes_are_resolved() {
        let spans = collect(r"s\ ys\=te\,m,host=local\,host");
        assert_eq!(spans[0], ("s ys=te,m".to_string(), Delimiter::Comma));
        assert_eq!(spans[1], ("host".to_string(), Delimiter::Equals));
        assert_eq!(spans[2], ("local,host".to_string(), Delimiter::End));
    }

    #[test]
    fn test_quoted_span_hides_delimiters() {
        let spans = collect(r#"f="7 days, 5:46" 1"#);
        assert_eq!(spans[1], (r#""7 days, 5:46""#.to_string(), Delimiter::Whitespace));
        assert_eq!(spans[2], ("1".to_string(), Delimiter::End));
    }

    #[test]
    fn test_escaped_quote_does_not_toggle() {
        let spans = collect(r#"f="say \"hi, there\"""#);
        assert_eq!(spans[1], (r#""say "hi, there"""#.to_string(), Delimiter::End));
    }

    #[test]
    fn test_unterminated_quote() {
        let err = Tokenizer::new(r#"system,host=h uptime_format="5:53 1000"#).unwrap_err();
        assert_eq!(err.message(), UNTERMINATED_QUOTE);
    }

    #[test]
    fn test_premature_end() {
        let mut tokenizer = Tokenizer::new("cpu").unwrap();
        assert_eq!(tokenizer.token(), "cpu");
        assert!(tokenizer.is_at_end());

        let err = tokenizer.advance().unwrap_err();
        assert_eq!(err.message(), PREMATURE_END);
    }

    #[test]
    fn test_empty_and_blank_lines() {
        let tokenizer = Tokenizer::new("").unwrap();
        assert_eq!(tokenizer.token(), "");
        assert!(tokenizer.is_at_end());

        let spans = collect("  ");
        assert_eq!(spans.len(), 3);
        assert!(spans.iter().all(|(s, _)| s.is_empty()));
    }

    #[test]
    fn test_non_breaking_space_is_not_a_boundary() {
        let spans = collect("m,h=a\u{a0}b v=1\u{202f}5");
        assert_eq!(spans[2], ("a\u{a0}b".to_string(), Delimiter::Whitespace));
        assert_eq!(spans[4], ("1\u{202f}5".to_string(), Delimiter::End));
    }

    #[test]
    fn test_information_separators_are_boundaries() {
        let spans = collect("cpu\u{1f}v=1");
        assert_eq!(spans[0], ("cpu".to_string(), Delimiter::Whitespace));
        assert_eq!(spans[1], ("v".to_string(), Delimiter::Equals));
    }

    #[test]
    fn test_trailing_backslash_is_literal() {
        let spans = collect("cpu\\");
        assert_eq!(spans, vec![("cpu\\".to_string(), Delimiter::End)]);
    }

    #[test]
    fn test_multibyte_content_and_whitespace() {
        let spans = collect("température,lieu=salle\u{3000}v=1");
        assert_eq!(spans[0].0, "température");
        assert_eq!(spans[2], ("salle".to_string(), Delimiter::Whitespace));
        assert_eq!(spans[3], ("v".to_string(), Delimiter::Equals));
        assert_eq!(spans[4], ("1".to_string(), Delimiter::End));
    }
}
