use super::TypeError;

/// Tokenizer shared by type names and text literals.
///
/// Every method skips leading whitespace before looking at the input.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Input not yet consumed.
    pub fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub(crate) fn error(&self, reason: impl Into<String>) -> TypeError {
        TypeError::Malformed {
            input: self.input.to_owned(),
            pos: self.pos,
            reason: reason.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    pub fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.rest().chars().next()
    }

    pub fn eof(&mut self) -> bool {
        self.peek().is_none()
    }

    /// Fail unless all input is consumed.
    pub fn expect_eof(&mut self) -> Result<(), TypeError> {
        match self.eof() {
            true => Ok(()),
            false => Err(self.error("unexpected trailing input")),
        }
    }

    /// Consume `c` if it is the next character.
    pub fn is_character(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// Consume `c`, failing if the next character is anything else.
    pub fn character(&mut self, c: char) -> Result<(), TypeError> {
        match self.is_character(c) {
            true => Ok(()),
            false => Err(self.error(format!("expected `{c}`"))),
        }
    }

    /// An identifier, `[A-Za-z_][A-Za-z0-9_]*`.
    pub fn bare_word(&mut self) -> Result<&'a str, TypeError> {
        self.skip_whitespace();
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|&(i, c)| !(c == '_' || c.is_ascii_alphabetic() || (i != 0 && c.is_ascii_digit())))
            .map_or(rest.len(), |(i, _)| i);
        if len == 0 {
            return Err(self.error("expected identifier"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    /// Consume `word` case insensitively if it is the next identifier.
    pub fn keyword(&mut self, word: &str) -> bool {
        let mut ahead = self.clone();
        match ahead.bare_word() {
            Ok(found) if found.eq_ignore_ascii_case(word) => {
                *self = ahead;
                true
            },
            _ => false,
        }
    }

    /// A numeric literal: optional sign, digits, fraction and exponent.
    pub fn number_literal(&mut self) -> Result<&'a str, TypeError> {
        self.skip_whitespace();
        let rest = self.rest().as_bytes();
        let mut len = 0;

        if matches!(rest.first(), Some(b'-' | b'+')) {
            len += 1;
        }
        let digits_start = len;
        while len < rest.len() {
            match rest[len] {
                b'0'..=b'9' | b'.' => len += 1,
                b'e' | b'E' if len > digits_start => {
                    len += 1;
                    if matches!(rest.get(len), Some(b'-' | b'+')) {
                        len += 1;
                    }
                },
                _ => break,
            }
        }

        if len == digits_start {
            return Err(self.error("expected number"));
        }
        let literal = &self.rest()[..len];
        self.pos += len;
        Ok(literal)
    }

    /// A single quoted string, with backslash escapes and `''` as a quote.
    pub fn string_literal(&mut self) -> Result<String, TypeError> {
        self.character('\'')?;
        let mut out = String::new();
        let mut chars = self.rest().char_indices();

        while let Some((i, c)) = chars.next() {
            match c {
                '\'' => {
                    if self.rest()[i + 1..].starts_with('\'') {
                        chars.next();
                        out.push('\'');
                        continue;
                    }
                    self.pos += i + 1;
                    return Ok(out);
                },
                '\\' => {
                    let Some((_, escaped)) = chars.next() else {
                        break;
                    };
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        'b' => '\x08',
                        'f' => '\x0c',
                        c => c,
                    });
                },
                c => out.push(c),
            }
        }

        Err(self.error("unterminated string literal"))
    }
}
