use crate::script::ast::{Expr, FunctionDecl, Stmt, Token, TokenKind, VarExpr, VarKind};
use crate::script::ParseError;

/// Parse a token stream (as returned by [`crate::script::tokenize`]) into top-level statements.
pub fn parse(tokens: Vec<Token>) -> Result<Vec<Stmt>, ParseError> {
    Parser::new(tokens).program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    package: Option<Token>,
}

impl Parser {
    fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let line = tokens.last().map(|t| t.line).unwrap_or(1);
            tokens.push(Token {
                kind: TokenKind::Eof,
                lexeme: String::new(),
                line,
            });
        }
        Self {
            tokens,
            pos: 0,
            package: None,
        }
    }

    fn peek(&self) -> &Token {
        // the stream always ends with Eof, and `advance` never moves past it
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn is_punct(&self, p: &str) -> bool {
        let t = self.peek();
        t.kind == TokenKind::Punct && t.lexeme == p
    }

    fn is_keyword(&self, kw: &str) -> bool {
        let t = self.peek();
        t.kind == TokenKind::Ident && t.lexeme.eq_ignore_ascii_case(kw)
    }

    fn expect_punct(&mut self, p: &'static str) -> Result<Token, ParseError> {
        if self.is_punct(p) {
            return Ok(self.advance());
        }
        Err(self.unexpected(p))
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        let t = self.peek();
        if t.kind == TokenKind::Eof {
            ParseError::UnexpectedEof { expected }
        } else {
            ParseError::Unexpected {
                line: t.line,
                expected,
                found: t.lexeme.clone(),
            }
        }
    }

    fn program(mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = vec![];
        while self.peek().kind != TokenKind::Eof {
            if self.is_keyword("package") {
                stmts.push(self.package_block()?);
            } else if self.is_punct("}") {
                return Err(self.unexpected("statement"));
            } else {
                stmts.push(self.declaration()?);
            }
        }
        Ok(stmts)
    }

    fn declaration(&mut self) -> Result<Stmt, ParseError> {
        if self.is_keyword("function") {
            return self.function_decl();
        }
        self.statement()
    }

    fn package_block(&mut self) -> Result<Stmt, ParseError> {
        self.advance();
        let name = self.advance();
        if name.kind != TokenKind::Ident {
            return Err(ParseError::Unexpected {
                line: name.line,
                expected: "package name",
                found: name.lexeme,
            });
        }
        self.expect_punct("{")?;

        self.package = Some(name);
        let mut body = vec![];
        while !self.is_punct("}") {
            if self.peek().kind == TokenKind::Eof {
                return Err(self.unexpected("}"));
            }
            if self.is_keyword("package") {
                return Err(self.unexpected("function declaration"));
            }
            body.push(self.declaration()?);
        }
        self.package = None;

        self.advance();
        if self.is_punct(";") {
            self.advance();
        }
        Ok(Stmt::Block(body))
    }

    fn function_decl(&mut self) -> Result<Stmt, ParseError> {
        self.advance();
        let qualified = self.advance();
        if qualified.kind != TokenKind::Ident {
            return Err(ParseError::Unexpected {
                line: qualified.line,
                expected: "function name",
                found: qualified.lexeme,
            });
        }

        let (namespace, name) = match qualified.lexeme.rsplit_once("::") {
            Some((ns, name)) => (
                Some(Token {
                    lexeme: ns.to_string(),
                    ..qualified.clone()
                }),
                Token {
                    lexeme: name.to_string(),
                    ..qualified
                },
            ),
            None => (None, qualified),
        };

        self.expect_punct("(")?;
        let mut params = vec![];
        while !self.is_punct(")") {
            let token = self.advance();
            match token.kind {
                TokenKind::LocalVar => params.push(VarExpr {
                    name: token,
                    kind: VarKind::Local,
                }),
                TokenKind::Eof => return Err(ParseError::UnexpectedEof { expected: ")" }),
                _ => {}
            }
        }
        self.advance();

        self.expect_punct("{")?;
        let body = self.block_body()?;

        Ok(Stmt::FunctionDecl(FunctionDecl {
            package: self.package.clone(),
            namespace,
            name,
            params,
            body,
        }))
    }

    /// Statements up to and including the closing `}` of an already opened block.
    fn block_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut body = vec![];
        loop {
            if self.is_punct("}") {
                self.advance();
                return Ok(body);
            }
            if self.peek().kind == TokenKind::Eof {
                return Err(self.unexpected("}"));
            }
            if self.is_keyword("function") || self.is_keyword("package") {
                return Err(self.unexpected("statement"));
            }
            body.push(self.statement()?);
        }
    }

    /// Any non-declaration statement. The statement ends at a `;` outside of
    /// parentheses or right after a nested block.
    fn statement(&mut self) -> Result<Stmt, ParseError> {
        let mut exprs = vec![];
        let mut depth = 0usize;

        loop {
            let (kind, lexeme) = {
                let token = self.peek();
                (token.kind, token.lexeme.clone())
            };
            match (kind, lexeme.as_str()) {
                (TokenKind::Eof, _) => {
                    if depth > 0 {
                        return Err(self.unexpected(")"));
                    }
                    break;
                }
                (TokenKind::Punct, ";") if depth == 0 => {
                    self.advance();
                    break;
                }
                (TokenKind::Punct, "{") if depth == 0 => {
                    self.advance();
                    let block = self.block_body()?;
                    if !exprs.is_empty() {
                        let mut stmts = vec![Stmt::Expr(Expr::Compound(exprs))];
                        stmts.push(Stmt::Block(block));
                        return Ok(Stmt::Block(stmts));
                    }
                    return Ok(Stmt::Block(block));
                }
                (TokenKind::Punct, "}") if depth == 0 => break,
                (TokenKind::Punct, "(") => {
                    depth += 1;
                    self.advance();
                }
                (TokenKind::Punct, ")") => {
                    if depth == 0 {
                        return Err(self.unexpected("expression"));
                    }
                    depth -= 1;
                    self.advance();
                }
                (TokenKind::LocalVar, _) => {
                    let name = self.advance();
                    exprs.push(Expr::Var(VarExpr {
                        name,
                        kind: VarKind::Local,
                    }));
                }
                (TokenKind::GlobalVar, _) => {
                    let name = self.advance();
                    exprs.push(Expr::Var(VarExpr {
                        name,
                        kind: VarKind::Global,
                    }));
                }
                _ => {
                    self.advance();
                }
            }
        }

        Ok(Stmt::Expr(Expr::Compound(exprs)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::script::tokenize;

    fn parse_src(src: &str) -> Result<Vec<Stmt>, ParseError> {
        parse(tokenize(src)?)
    }

    #[test]
    fn test_function_decl() {
        let stmts = parse_src("function Foo::bar(%a, %b) { %c = %a + $g; }").unwrap();
        assert_eq!(stmts.len(), 1);
        let Stmt::FunctionDecl(decl) = &stmts[0] else {
            panic!("expected function declaration");
        };
        assert_eq!(decl.namespace.as_ref().unwrap().lexeme, "Foo");
        assert_eq!(decl.name.lexeme, "bar");
        assert!(decl.package.is_none());
        assert_eq!(decl.params.len(), 2);
        assert_eq!(decl.body.len(), 1);
    }

    #[test]
    fn test_package() {
        let stmts = parse_src("package Pkg { function a() {} function N::b() {} };").unwrap();
        let Stmt::Block(body) = &stmts[0] else {
            panic!("expected package block");
        };
        assert_eq!(body.len(), 2);
        for stmt in body {
            let Stmt::FunctionDecl(decl) = stmt else {
                panic!("expected function declaration");
            };
            assert_eq!(decl.package.as_ref().unwrap().lexeme, "Pkg");
        }
    }

    #[test]
    fn test_nested_statements() {
        let src = r#"
            function f() {
                for (%i = 0; %i < 3; %i++) {
                    if (%i == 1) { echo(%i); } else { $done = true; }
                }
                new ScriptObject(Obj) { field = %i; };
            }
        "#;
        let stmts = parse_src(src).unwrap();
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn test_parse_errors() {
        struct TestCase {
            src: &'static str,
            eof: bool,
        }
        let cases = [
            TestCase {
                src: "function () {}",
                eof: false,
            },
            TestCase {
                src: "function f() { %a = 1;",
                eof: true,
            },
            TestCase {
                src: "%a = 1; }",
                eof: false,
            },
            TestCase {
                src: "function f() { function g() {} }",
                eof: false,
            },
            TestCase {
                src: "%a = (1 + 2;",
                eof: true,
            },
        ];

        for tc in cases {
            let err = parse_src(tc.src).unwrap_err();
            assert_eq!(
                matches!(err, ParseError::UnexpectedEof { .. }),
                tc.eof,
                "{}: {err}",
                tc.src
            );
        }
    }
}
