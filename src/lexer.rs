//! Filter lexer, shared by the prefix and infix syntaxes.

use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    /// Current byte offset into the input
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// Returns the character at the current position without consuming it
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// Consumes one character and returns it
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn token(&self, kind: TokenKind<'a>, start: usize) -> Token<'a> {
        Token {
            kind,
            span: Span::new(start, self.position),
        }
    }

    /// Reads a word: identifiers, dotted field names and plain values.
    /// The first character has already been consumed by the caller.
    fn read_word(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if is_word_char(c) {
                self.bump();
            } else {
                break;
            }
        }
        let literal = &self.input[start..self.position];
        self.token(match_keyword(literal), start)
    }

    /// Reads a `~`-led pattern. Parentheses and brackets inside the pattern
    /// must balance; an unbalanced closer or a comma ends the pattern.
    fn read_pattern(&mut self, start: usize) -> Token<'a> {
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                '(' | '[' => depth += 1,
                ')' | ']' if depth == 0 => break,
                ')' | ']' => depth -= 1,
                ',' if depth == 0 => break,
                c if c.is_whitespace() => break,
                _ => {}
            }
            self.bump();
        }
        self.token(TokenKind::Pattern(&self.input[start..self.position]), start)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '%' | '-')
}

fn match_keyword(s: &str) -> TokenKind<'_> {
    match s {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "in" => TokenKind::In,
        "not_in" => TokenKind::NotIn,
        _ => TokenKind::Word(s),
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let start = self.position;

        let c = self.bump()?;

        let token = match c {
            '(' => self.token(TokenKind::LParen, start),
            ')' => self.token(TokenKind::RParen, start),
            '[' => self.token(TokenKind::LBracket, start),
            ']' => self.token(TokenKind::RBracket, start),
            ',' => self.token(TokenKind::Comma, start),
            '=' => self.token(TokenKind::Eq, start),
            '<' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::Lte, start)
                } else {
                    self.token(TokenKind::Lt, start)
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::Gte, start)
                } else {
                    self.token(TokenKind::Gt, start)
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::NotEq, start)
                } else {
                    self.token(TokenKind::Illegal, start)
                }
            }
            '~' => self.read_pattern(start),
            c if is_word_char(c) => self.read_word(start),
            _ => self.token(TokenKind::Illegal, start),
        };
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind<'_>> {
        Lexer::new(input).map(|t| t.kind).collect()
    }

    #[test]
    fn test_prefix_call() {
        let input = "q(eq(name,openshift-vanilla))";
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::Word("q"),
                TokenKind::LParen,
                TokenKind::Word("eq"),
                TokenKind::LParen,
                TokenKind::Word("name"),
                TokenKind::Comma,
                TokenKind::Word("openshift-vanilla"),
                TokenKind::RParen,
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_all_operators_and_punctuation() {
        let input = "!= = > < >= <= ( ) [ ] ,";
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::NotEq,
                TokenKind::Eq,
                TokenKind::Gt,
                TokenKind::Lt,
                TokenKind::Gte,
                TokenKind::Lte,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Comma,
            ]
        );
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        assert_eq!(
            kinds("and or in not_in AND Or"),
            vec![
                TokenKind::And,
                TokenKind::Or,
                TokenKind::In,
                TokenKind::NotIn,
                TokenKind::Word("AND"),
                TokenKind::Word("Or"),
            ]
        );
    }

    #[test]
    fn test_value_characters() {
        assert_eq!(
            kinds("like(name,ocp-4.1%) stage:ocp 1.18.7-am1 a/b"),
            vec![
                TokenKind::Word("like"),
                TokenKind::LParen,
                TokenKind::Word("name"),
                TokenKind::Comma,
                TokenKind::Word("ocp-4.1%"),
                TokenKind::RParen,
                TokenKind::Word("stage:ocp"),
                TokenKind::Word("1.18.7-am1"),
                TokenKind::Word("a"),
                TokenKind::Illegal,
                TokenKind::Word("b"),
            ]
        );
    }

    #[test]
    fn test_infix_comparison() {
        assert_eq!(
            kinds("(components.version=4.14.27) and (team.name not_in [a, b])"),
            vec![
                TokenKind::LParen,
                TokenKind::Word("components.version"),
                TokenKind::Eq,
                TokenKind::Word("4.14.27"),
                TokenKind::RParen,
                TokenKind::And,
                TokenKind::LParen,
                TokenKind::Word("team.name"),
                TokenKind::NotIn,
                TokenKind::LBracket,
                TokenKind::Word("a"),
                TokenKind::Comma,
                TokenKind::Word("b"),
                TokenKind::RBracket,
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_pattern_stops_at_unbalanced_paren() {
        assert_eq!(
            kinds(r"(name=~4\.1(4|5).*)"),
            vec![
                TokenKind::LParen,
                TokenKind::Word("name"),
                TokenKind::Eq,
                TokenKind::Pattern(r"~4\.1(4|5).*"),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_spans_are_byte_offsets() {
        let tokens: Vec<_> = Lexer::new("eq( a ,b)").collect();
        assert_eq!(tokens[0].span, Span::new(0, 2));
        assert_eq!(tokens[2].span, Span::new(4, 5));
        assert_eq!(tokens[4].span, Span::new(7, 8));
    }
}
