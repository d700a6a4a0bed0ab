/// Single-pass O(n) lexer for Stilt source code.
use crate::error::ParseError;
use crate::token::{Literal, Token, TokenKind};

pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
        let mut lexer = Lexer {
            source: source.as_bytes(),
            pos: 0,
            line: 1,
        };
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<u8> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> u8 {
        let ch = self.source[self.pos];
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
        }
        ch
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    self.advance();
                }
                Some(b'/') if self.peek2() == Some(b'/') => {
                    while let Some(ch) = self.peek() {
                        if ch == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace_and_comments();

        let line = self.line;

        let Some(ch) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, "", None, line));
        };

        if ch.is_ascii_digit() {
            return self.lex_number(line);
        }

        if ch.is_ascii_alphabetic() || ch == b'_' {
            return Ok(self.lex_ident(line));
        }

        if ch == b'"' {
            return self.lex_string(line);
        }

        self.advance();
        let simple = |kind, lexeme: &str| Ok(Token::new(kind, lexeme, None, line));
        match ch {
            b'(' => simple(TokenKind::LeftParen, "("),
            b')' => simple(TokenKind::RightParen, ")"),
            b'{' => simple(TokenKind::LeftBrace, "{"),
            b'}' => simple(TokenKind::RightBrace, "}"),
            b',' => simple(TokenKind::Comma, ","),
            b';' => simple(TokenKind::Semicolon, ";"),
            b'+' => simple(TokenKind::Plus, "+"),
            b'-' => simple(TokenKind::Minus, "-"),
            b'*' => simple(TokenKind::Star, "*"),
            b'/' => simple(TokenKind::Slash, "/"),
            b'%' => simple(TokenKind::Percent, "%"),
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    simple(TokenKind::BangEqual, "!=")
                } else {
                    simple(TokenKind::Bang, "!")
                }
            }
            b'=' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    simple(TokenKind::EqualEqual, "==")
                } else {
                    simple(TokenKind::Equal, "=")
                }
            }
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    simple(TokenKind::GreaterEqual, ">=")
                } else {
                    simple(TokenKind::Greater, ">")
                }
            }
            b'<' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    simple(TokenKind::LessEqual, "<=")
                } else {
                    simple(TokenKind::Less, "<")
                }
            }
            _ => Err(ParseError::new(
                format!("unexpected character `{}`", ch as char),
                line,
            )),
        }
    }

    fn lex_number(&mut self, line: usize) -> Result<Token, ParseError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == Some(b'.') && matches!(self.peek2(), Some(c) if c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }

        let lexeme = std::str::from_utf8(&self.source[start..self.pos])
            .expect("number lexeme is ASCII")
            .to_string();

        if is_float {
            let value: f64 = lexeme
                .parse()
                .map_err(|_| ParseError::new(format!("invalid float literal `{lexeme}`"), line))?;
            Ok(Token::new(
                TokenKind::FloatLit,
                lexeme,
                Some(Literal::Float(value)),
                line,
            ))
        } else {
            let value: i64 = lexeme
                .parse()
                .map_err(|_| ParseError::new(format!("invalid int literal `{lexeme}`"), line))?;
            Ok(Token::new(
                TokenKind::IntLit,
                lexeme,
                Some(Literal::Int(value)),
                line,
            ))
        }
    }

    fn lex_ident(&mut self, line: usize) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.advance();
        }
        let lexeme = std::str::from_utf8(&self.source[start..self.pos])
            .expect("identifier lexeme is ASCII")
            .to_string();
        let kind = TokenKind::keyword(&lexeme).unwrap_or(TokenKind::Identifier);
        Token::new(kind, lexeme, None, line)
    }

    fn lex_string(&mut self, line: usize) -> Result<Token, ParseError> {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(ParseError::new("unterminated string", line)),
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    self.advance();
                    match self.peek() {
                        Some(b'n') => {
                            self.advance();
                            value.push('\n');
                        }
                        Some(b't') => {
                            self.advance();
                            value.push('\t');
                        }
                        Some(b'"') => {
                            self.advance();
                            value.push('"');
                        }
                        Some(b'\\') => {
                            self.advance();
                            value.push('\\');
                        }
                        Some(other) => {
                            self.advance();
                            value.push('\\');
                            value.push(other as char);
                        }
                        None => return Err(ParseError::new("unterminated string", line)),
                    }
                }
                Some(_) => {
                    // Multi-byte UTF-8 sequences pass through untouched.
                    let start = self.pos;
                    self.advance();
                    while self.pos < self.source.len() && (self.source[self.pos] & 0xC0) == 0x80 {
                        self.pos += 1;
                    }
                    value.push_str(
                        std::str::from_utf8(&self.source[start..self.pos])
                            .map_err(|_| ParseError::new("invalid UTF-8 in string", line))?,
                    );
                }
            }
        }
        let lexeme = format!("\"{value}\"");
        Ok(Token::new(
            TokenKind::StringLit,
            lexeme,
            Some(Literal::Str(value)),
            line,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lex_operators_and_keywords() {
        assert_eq!(
            kinds("var x = 1 <= 2;"),
            vec![
                TokenKind::Var,
                TokenKind::Identifier,
                TokenKind::Equal,
                TokenKind::IntLit,
                TokenKind::LessEqual,
                TokenKind::IntLit,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_int_and_float_literals() {
        let tokens = Lexer::tokenize("12 3.5").unwrap();
        assert_eq!(tokens[0].literal, Some(Literal::Int(12)));
        assert_eq!(tokens[1].literal, Some(Literal::Float(3.5)));
    }

    #[test]
    fn lex_string_with_escapes() {
        let tokens = Lexer::tokenize("\"a\\nb\"").unwrap();
        assert_eq!(tokens[0].literal, Some(Literal::Str("a\nb".to_string())));
    }

    #[test]
    fn lex_skips_line_comments() {
        let tokens = Lexer::tokenize("1 // comment\n2").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn lex_unterminated_string_errors() {
        assert!(Lexer::tokenize("\"abc").is_err());
    }
}
