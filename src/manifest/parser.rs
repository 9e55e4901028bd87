use anyhow::bail;

use super::lexer::{Lexer, Span, Token, TokenKind};

#[derive(Clone, Debug)]
pub struct ManifestAst {
    pub assigns: Vec<Assign>,
}

#[derive(Clone, Debug)]
pub struct Assign {
    pub name: String,
    pub value: Expr,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Str(String),
    VarRef(String),
    Concat(Box<Expr>, Box<Expr>),
    Dict(Vec<DictEntry>),
}

#[derive(Clone, Debug)]
pub struct DictEntry {
    pub key: String,
    pub value: Expr,
    pub span: Span,
}

pub fn parse_text(src: &str) -> anyhow::Result<ManifestAst> {
    let tokens = Lexer::new(src).lex_all()?;
    Parser::new(tokens).parse_manifest()
}

struct Parser {
    tokens: Vec<Token>,
    idx: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, idx: 0 }
    }

    fn parse_manifest(mut self) -> anyhow::Result<ManifestAst> {
        let mut assigns = Vec::new();
        while !self.at_eof() {
            assigns.push(self.parse_assign()?);
        }
        Ok(ManifestAst { assigns })
    }

    fn parse_assign(&mut self) -> anyhow::Result<Assign> {
        let span = self.peek_span();
        let name = match self.peek_kind() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.bump();
                name
            }
            other => bail!(
                "{}:{}: expected an assignment name, found {}",
                span.line,
                span.column,
                describe(other)
            ),
        };
        self.expect(&TokenKind::Eq, "`=`")?;
        let value = self.parse_expr()?;
        Ok(Assign { name, value, span })
    }

    // Concatenation is the only binary operation; left-associative.
    fn parse_expr(&mut self) -> anyhow::Result<Expr> {
        let mut lhs = self.parse_term()?;
        while matches!(self.peek_kind(), TokenKind::Plus) {
            self.bump();
            let rhs = self.parse_term()?;
            let span = lhs.span;
            lhs = Expr {
                kind: ExprKind::Concat(Box::new(lhs), Box::new(rhs)),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> anyhow::Result<Expr> {
        let span = self.peek_span();
        match self.peek_kind() {
            TokenKind::Str(s) => {
                let s = s.clone();
                self.bump();
                Ok(Expr {
                    kind: ExprKind::Str(s),
                    span,
                })
            }
            TokenKind::Ident(name) if name == "Var" => {
                self.bump();
                self.expect(&TokenKind::LParen, "`(`")?;
                let arg_span = self.peek_span();
                let var = match self.peek_kind() {
                    TokenKind::Str(s) => {
                        let s = s.clone();
                        self.bump();
                        s
                    }
                    other => bail!(
                        "{}:{}: Var() takes a single string literal, found {}",
                        arg_span.line,
                        arg_span.column,
                        describe(other)
                    ),
                };
                self.expect(&TokenKind::RParen, "`)`")?;
                Ok(Expr {
                    kind: ExprKind::VarRef(var),
                    span,
                })
            }
            TokenKind::Ident(name) => bail!(
                "{}:{}: `{}` is not allowed here (only string literals, Var(..), `+`, and dicts)",
                span.line,
                span.column,
                name
            ),
            TokenKind::LBrace => self.parse_dict(span),
            other => bail!(
                "{}:{}: expected an expression, found {}",
                span.line,
                span.column,
                describe(other)
            ),
        }
    }

    fn parse_dict(&mut self, span: Span) -> anyhow::Result<Expr> {
        self.expect(&TokenKind::LBrace, "`{`")?;
        let mut entries = Vec::new();
        loop {
            if matches!(self.peek_kind(), TokenKind::RBrace) {
                self.bump();
                break;
            }
            let key_span = self.peek_span();
            let key = match self.peek_kind() {
                TokenKind::Str(s) => {
                    let s = s.clone();
                    self.bump();
                    s
                }
                other => bail!(
                    "{}:{}: dict keys must be string literals, found {}",
                    key_span.line,
                    key_span.column,
                    describe(other)
                ),
            };
            self.expect(&TokenKind::Colon, "`:`")?;
            let value = self.parse_expr()?;
            entries.push(DictEntry {
                key,
                value,
                span: key_span,
            });
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.bump();
                }
                TokenKind::RBrace => {
                    self.bump();
                    break;
                }
                other => {
                    let s = self.peek_span();
                    bail!(
                        "{}:{}: expected `,` or `}}` after dict entry, found {}",
                        s.line,
                        s.column,
                        describe(other)
                    );
                }
            }
        }
        Ok(Expr {
            kind: ExprKind::Dict(entries),
            span,
        })
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> anyhow::Result<()> {
        if self.peek_kind() == kind {
            self.bump();
            return Ok(());
        }
        let span = self.peek_span();
        bail!(
            "{}:{}: expected {}, found {}",
            span.line,
            span.column,
            what,
            describe(self.peek_kind())
        )
    }

    fn peek_kind(&self) -> &TokenKind {
        static EOF: TokenKind = TokenKind::Eof;
        self.tokens.get(self.idx).map(|t| &t.kind).unwrap_or(&EOF)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.idx)
            .map(|t| t.span)
            .unwrap_or(Span { line: 0, column: 0 })
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn bump(&mut self) {
        if self.idx < self.tokens.len() {
            self.idx += 1;
        }
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(s) => format!("`{}`", s),
        TokenKind::Str(_) => "a string literal".to_string(),
        TokenKind::LBrace => "`{`".to_string(),
        TokenKind::RBrace => "`}`".to_string(),
        TokenKind::LParen => "`(`".to_string(),
        TokenKind::RParen => "`)`".to_string(),
        TokenKind::Colon => "`:`".to_string(),
        TokenKind::Comma => "`,`".to_string(),
        TokenKind::Plus => "`+`".to_string(),
        TokenKind::Eq => "`=`".to_string(),
        TokenKind::Eof => "end of file".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{ExprKind, parse_text};

    #[test]
    fn parses_vars_and_deps_assignments() {
        let ast = parse_text(
            r#"
vars = {
  'upstream': 'https://example.org',
}

deps = {
  'third_party/alpha': Var('upstream') + '/alpha.git@v1',
  'third_party/beta': {
    'url': Var('upstream') + '/beta.git',
    'tag': 'v2',
  },
}
"#,
        )
        .expect("parse");
        assert_eq!(ast.assigns.len(), 2);
        assert_eq!(ast.assigns[0].name, "vars");
        assert_eq!(ast.assigns[1].name, "deps");
        let ExprKind::Dict(deps) = &ast.assigns[1].value.kind else {
            panic!("deps must parse as a dict");
        };
        assert_eq!(deps.len(), 2);
        assert!(matches!(deps[0].value.kind, ExprKind::Concat(_, _)));
        assert!(matches!(deps[1].value.kind, ExprKind::Dict(_)));
    }

    #[test]
    fn concat_is_left_associative_over_var_refs() {
        let ast = parse_text("u = Var('a') + '/x' + '@v1'").expect("parse");
        let ExprKind::Concat(lhs, rhs) = &ast.assigns[0].value.kind else {
            panic!("expected concat");
        };
        assert!(matches!(rhs.kind, ExprKind::Str(_)));
        assert!(matches!(lhs.kind, ExprKind::Concat(_, _)));
    }

    #[test]
    fn trailing_comma_is_optional() {
        for src in ["d = { 'a': 'b' }", "d = { 'a': 'b', }"] {
            let ast = parse_text(src).expect("parse");
            let ExprKind::Dict(entries) = &ast.assigns[0].value.kind else {
                panic!("expected dict");
            };
            assert_eq!(entries.len(), 1);
        }
    }

    #[test]
    fn rejects_calls_other_than_var() {
        let err = parse_text("deps = Fetch('x')").expect_err("only Var is callable");
        assert!(err.to_string().contains("`Fetch`"), "got: {err}");
    }

    #[test]
    fn rejects_non_string_dict_keys() {
        let err = parse_text("deps = { alpha: 'x' }").expect_err("bare keys");
        assert!(
            err.to_string().contains("dict keys must be string literals"),
            "got: {err}"
        );
    }

    #[test]
    fn error_carries_line_and_column() {
        let err = parse_text("deps = {\n  'a' 'b',\n}").expect_err("missing colon");
        assert!(err.to_string().starts_with("2:"), "got: {err}");
    }
}
