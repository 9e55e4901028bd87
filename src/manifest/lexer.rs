use anyhow::bail;

#[derive(Clone, Copy, Debug)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    LBrace,
    RBrace,
    LParen,
    RParen,
    Colon,
    Comma,
    Plus,
    Eq,
    Eof,
}

#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

pub struct Lexer<'a> {
    bytes: &'a [u8],
    idx: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            bytes: src.as_bytes(),
            idx: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn lex_all(mut self) -> anyhow::Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = matches!(tok.kind, TokenKind::Eof);
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> anyhow::Result<Token> {
        self.skip_whitespace_and_comments();
        let span = Span {
            line: self.line,
            column: self.col,
        };
        if self.idx >= self.bytes.len() {
            return Ok(Token {
                kind: TokenKind::Eof,
                span,
            });
        }
        let ch = self.peek_char();
        if is_ident_start(ch) {
            let ident = self.read_while(is_ident_continue);
            return Ok(Token {
                kind: TokenKind::Ident(ident),
                span,
            });
        }
        let kind = match ch {
            '\'' | '"' => {
                let s = self.read_string(ch, span)?;
                TokenKind::Str(s)
            }
            '{' => {
                self.advance();
                TokenKind::LBrace
            }
            '}' => {
                self.advance();
                TokenKind::RBrace
            }
            '(' => {
                self.advance();
                TokenKind::LParen
            }
            ')' => {
                self.advance();
                TokenKind::RParen
            }
            ':' => {
                self.advance();
                TokenKind::Colon
            }
            ',' => {
                self.advance();
                TokenKind::Comma
            }
            '+' => {
                self.advance();
                TokenKind::Plus
            }
            '=' => {
                self.advance();
                TokenKind::Eq
            }
            _ => bail!(
                "{}:{}: unexpected character `{}`",
                span.line,
                span.column,
                ch
            ),
        };
        Ok(Token { kind, span })
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            if self.idx >= self.bytes.len() {
                return;
            }
            let ch = self.peek_char();
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '#' => {
                    while self.idx < self.bytes.len() && self.peek_char() != '\n' {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn read_string(&mut self, quote: char, start: Span) -> anyhow::Result<String> {
        self.advance(); // opening quote
        let mut s = String::new();
        while self.idx < self.bytes.len() {
            let ch = self.peek_char();
            if ch == quote {
                self.advance();
                return Ok(s);
            }
            if ch == '\n' {
                break;
            }
            if ch == '\\' {
                self.advance();
                if self.idx >= self.bytes.len() {
                    break;
                }
                let esc = self.peek_char();
                self.advance();
                let actual = match esc {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    '\\' => '\\',
                    '"' => '"',
                    '\'' => '\'',
                    _ => esc,
                };
                s.push(actual);
            } else {
                s.push(ch);
                self.advance();
            }
        }
        bail!(
            "{}:{}: unterminated string literal",
            start.line,
            start.column
        )
    }

    fn read_while<F>(&mut self, f: F) -> String
    where
        F: Fn(char) -> bool,
    {
        let mut s = String::new();
        while self.idx < self.bytes.len() {
            let ch = self.peek_char();
            if !f(ch) {
                break;
            }
            s.push(ch);
            self.advance();
        }
        s
    }

    fn advance(&mut self) {
        if self.idx >= self.bytes.len() {
            return;
        }
        let ch = self.peek_char();
        self.idx += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
    }

    fn peek_char(&self) -> char {
        self.bytes.get(self.idx).copied().unwrap_or(b'\0') as char
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::{Lexer, TokenKind};

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .lex_all()
            .expect("lex")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_assignment_with_both_quote_styles() {
        let toks = kinds("deps = { 'a': \"b\" }");
        assert_eq!(
            toks,
            vec![
                TokenKind::Ident("deps".to_string()),
                TokenKind::Eq,
                TokenKind::LBrace,
                TokenKind::Str("a".to_string()),
                TokenKind::Colon,
                TokenKind::Str("b".to_string()),
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn skips_comments_and_handles_escapes() {
        let toks = kinds("# heading\nVar('x') + 'a\\'b' # tail\n");
        assert_eq!(
            toks,
            vec![
                TokenKind::Ident("Var".to_string()),
                TokenKind::LParen,
                TokenKind::Str("x".to_string()),
                TokenKind::RParen,
                TokenKind::Plus,
                TokenKind::Str("a'b".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn reports_position_for_unterminated_string() {
        let err = Lexer::new("deps = {\n  'oops\n}")
            .lex_all()
            .expect_err("unterminated string must not lex");
        assert!(err.to_string().contains("2:3"), "got: {err}");
        assert!(err.to_string().contains("unterminated"), "got: {err}");
    }

    #[test]
    fn rejects_characters_outside_the_grammar() {
        let err = Lexer::new("deps = [1]").lex_all().expect_err("no lists");
        assert!(err.to_string().contains("unexpected character"), "got: {err}");
    }
}
