// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The scanner that produces tokens from source text.

use super::{Span, Token, TokenKind};
use crate::runtime::value::parse_number_literal;

/// Reserved words that are valid JavaScript but outside the supported subset.
const RESERVED: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "continue", "debugger", "default",
    "delete", "do", "enum", "export", "extends", "finally", "import", "in", "instanceof", "new",
    "super", "switch", "this", "throw", "try", "void", "with", "yield",
];

/// A scanner that tokenizes source code.
///
/// Cloning a scanner is cheap and is how the parser looks ahead.
#[derive(Clone)]
pub struct Scanner<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
        }
    }

    /// Returns the source text covered by a span.
    pub fn slice(&self, span: Span) -> &'a str {
        &self.source[span.start..span.end]
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        let newline_before = self.skip_whitespace_and_comments();

        let start = self.current_pos;

        let Some((_pos, ch)) = self.advance() else {
            let mut token = Token::new(TokenKind::Eof, Span::new(start, start));
            token.newline_before = newline_before;
            return token;
        };

        let kind = match ch {
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,

            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.scan_number(start),
            '.' => TokenKind::Dot,
            '+' => self.scan_compound('+', TokenKind::Plus, TokenKind::PlusPlus, TokenKind::PlusEqual),
            '-' => self.scan_compound(
                '-',
                TokenKind::Minus,
                TokenKind::MinusMinus,
                TokenKind::MinusEqual,
            ),
            '*' => self.scan_assign_op(TokenKind::Star, TokenKind::StarEqual),
            '/' => self.scan_assign_op(TokenKind::Slash, TokenKind::SlashEqual),
            '%' => self.scan_assign_op(TokenKind::Percent, TokenKind::PercentEqual),
            '<' => self.scan_assign_op(TokenKind::Less, TokenKind::LessEqual),
            '>' => self.scan_assign_op(TokenKind::Greater, TokenKind::GreaterEqual),
            '=' => self.scan_equal(),
            '!' => self.scan_bang(),
            '&' if self.eat('&') => TokenKind::AmpAmp,
            '|' if self.eat('|') => TokenKind::PipePipe,

            '"' | '\'' => self.scan_string(ch),
            '0'..='9' => self.scan_number(start),
            _ if is_id_start(ch) => self.scan_identifier(start),

            other => TokenKind::Invalid(other.to_string()),
        };

        let mut token = Token::new(kind, Span::new(start, self.current_pos));
        token.newline_before = newline_before;
        token
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.current_pos = pos + ch.len_utf8();
        }
        result
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().map(|(_, ch)| ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skips trivia and reports whether a line terminator was crossed.
    fn skip_whitespace_and_comments(&mut self) -> bool {
        let mut newline = false;
        loop {
            match self.peek() {
                Some('\n' | '\r' | '\u{2028}' | '\u{2029}') => {
                    newline = true;
                    self.advance();
                }
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') => match self.peek_next() {
                    Some('/') => {
                        while let Some(ch) = self.peek() {
                            if ch == '\n' || ch == '\r' {
                                break;
                            }
                            self.advance();
                        }
                    }
                    Some('*') => {
                        self.advance();
                        self.advance();
                        let mut prev = ' ';
                        while let Some((_, ch)) = self.advance() {
                            if ch == '\n' || ch == '\r' {
                                newline = true;
                            }
                            if prev == '*' && ch == '/' {
                                break;
                            }
                            prev = ch;
                        }
                    }
                    _ => break,
                },
                _ => break,
            }
        }
        newline
    }

    /// `+`, `++`, `+=` and the `-` family.
    fn scan_compound(
        &mut self,
        ch: char,
        single: TokenKind,
        double: TokenKind,
        assign: TokenKind,
    ) -> TokenKind {
        if self.eat(ch) {
            double
        } else if self.eat('=') {
            assign
        } else {
            single
        }
    }

    fn scan_assign_op(&mut self, plain: TokenKind, with_equal: TokenKind) -> TokenKind {
        if self.eat('=') { with_equal } else { plain }
    }

    fn scan_equal(&mut self) -> TokenKind {
        if self.eat('>') {
            TokenKind::Arrow
        } else if self.eat('=') {
            if self.eat('=') {
                TokenKind::EqualEqualEqual
            } else {
                TokenKind::EqualEqual
            }
        } else {
            TokenKind::Equal
        }
    }

    fn scan_bang(&mut self) -> TokenKind {
        if self.eat('=') {
            if self.eat('=') {
                TokenKind::BangEqualEqual
            } else {
                TokenKind::BangEqual
            }
        } else {
            TokenKind::Bang
        }
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        let mut value = String::new();

        loop {
            match self.advance() {
                None | Some((_, '\n')) => {
                    return TokenKind::Invalid("unterminated string literal".into());
                }
                Some((_, ch)) if ch == quote => break,
                Some((_, '\\')) => {
                    if let Some((_, escaped)) = self.advance() {
                        match escaped {
                            'n' => value.push('\n'),
                            'r' => value.push('\r'),
                            't' => value.push('\t'),
                            '0' => value.push('\0'),
                            'u' => match self.scan_unicode_escape() {
                                Some(c) => value.push(c),
                                None => {
                                    return TokenKind::Invalid("malformed unicode escape".into());
                                }
                            },
                            '\n' => {}
                            _ => value.push(escaped),
                        }
                    }
                }
                Some((_, ch)) => value.push(ch),
            }
        }

        TokenKind::String(value)
    }

    /// Reads the four hex digits of a `\uXXXX` escape.
    fn scan_unicode_escape(&mut self) -> Option<char> {
        let mut code = 0u32;
        for _ in 0..4 {
            let (_, ch) = self.advance()?;
            code = code * 16 + ch.to_digit(16)?;
        }
        char::from_u32(code)
    }

    fn scan_number(&mut self, start: usize) -> TokenKind {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                self.advance();
            } else if matches!(ch, '+' | '-')
                && self.source[start..self.current_pos].ends_with(['e', 'E'])
                && !self.source[start..self.current_pos].starts_with("0x")
            {
                self.advance();
            } else {
                break;
            }
        }

        let raw = &self.source[start..self.current_pos];
        match parse_number_literal(raw) {
            Some(n) => TokenKind::Number(n),
            None => TokenKind::Invalid(raw.to_string()),
        }
    }

    fn scan_identifier(&mut self, start: usize) -> TokenKind {
        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                self.advance();
            } else {
                break;
            }
        }

        let name = &self.source[start..self.current_pos];
        match name {
            "var" => TokenKind::Var,
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "function" => TokenKind::Function,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "typeof" => TokenKind::Typeof,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ if RESERVED.contains(&name) => TokenKind::Reserved(name.to_string()),
            _ => TokenKind::Identifier(name.to_string()),
        }
    }
}

fn is_id_start(ch: char) -> bool {
    ch == '_' || ch == '$' || unicode_xid::UnicodeXID::is_xid_start(ch)
}

fn is_id_continue(ch: char) -> bool {
    ch == '_' || ch == '$' || unicode_xid::UnicodeXID::is_xid_continue(ch)
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source).map(|t| t.kind).collect()
    }

    #[test]
    fn test_punctuation_and_operators() {
        assert_eq!(
            kinds("a.b = c[0] => ++ -= === !== && ||"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Dot,
                TokenKind::Identifier("b".into()),
                TokenKind::Equal,
                TokenKind::Identifier("c".into()),
                TokenKind::LeftBracket,
                TokenKind::Number(0.0),
                TokenKind::RightBracket,
                TokenKind::Arrow,
                TokenKind::PlusPlus,
                TokenKind::MinusEqual,
                TokenKind::EqualEqualEqual,
                TokenKind::BangEqualEqual,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
            ]
        );
    }

    #[test]
    fn test_numbers_keep_raw_text() {
        let mut scanner = Scanner::new("0x1F 1.5e3 .25");
        let hex = scanner.next_token();
        assert_eq!(hex.kind, TokenKind::Number(31.0));
        assert_eq!(scanner.slice(hex.span), "0x1F");
        let exp = scanner.next_token();
        assert_eq!(exp.kind, TokenKind::Number(1500.0));
        assert_eq!(scanner.slice(exp.span), "1.5e3");
        assert_eq!(scanner.next_token().kind, TokenKind::Number(0.25));
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "a\tb" "A""#),
            vec![
                TokenKind::String("it's".into()),
                TokenKind::String("a\tb".into()),
                TokenKind::String("A".into()),
            ]
        );
        assert!(matches!(kinds("'open")[0], TokenKind::Invalid(_)));
    }

    #[test]
    fn test_keywords_and_reserved() {
        assert_eq!(
            kinds("var let const function class"),
            vec![
                TokenKind::Var,
                TokenKind::Let,
                TokenKind::Const,
                TokenKind::Function,
                TokenKind::Reserved("class".into()),
            ]
        );
    }

    #[test]
    fn test_comments_and_newline_flag() {
        let mut scanner = Scanner::new("a // note\n/* multi\nline */ b c");
        assert!(!scanner.next_token().newline_before);
        let b = scanner.next_token();
        assert_eq!(b.kind, TokenKind::Identifier("b".into()));
        assert!(b.newline_before);
        assert!(!scanner.next_token().newline_before);
    }

    #[test]
    fn test_division_is_not_comment() {
        assert_eq!(
            kinds("a / b"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Slash,
                TokenKind::Identifier("b".into()),
            ]
        );
    }
}
