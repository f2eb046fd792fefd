//! Syntax tree produced by the script parser.
//!
//! Only the node kinds the adapter cares about are distinguished. Everything
//! else the parser sees ends up in [`Expr::Compound`] so that visitors still
//! reach nested variable references.

/// Token with the literal text it was scanned from.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Plain identifier, `::` separated parts are kept in one token.
    Ident,
    /// `%name`, lexeme excludes the sigil.
    LocalVar,
    /// `$name`, lexeme excludes the sigil.
    GlobalVar,
    Number,
    String,
    Punct,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Local,
    Global,
}

/// Variable reference expression.
#[derive(Debug, Clone, PartialEq)]
pub struct VarExpr {
    pub name: Token,
    pub kind: VarKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub package: Option<Token>,
    pub namespace: Option<Token>,
    pub name: Token,
    pub params: Vec<VarExpr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Var(VarExpr),
    /// Any other expression, reduced to its sub-expressions.
    Compound(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    FunctionDecl(FunctionDecl),
    Expr(Expr),
    Block(Vec<Stmt>),
}

/// Double-dispatch visitor over [`Stmt`] and [`Expr`] nodes.
///
/// Every method defaults to a no-op, implementors override the node kinds
/// they are interested in. Traversal order is source order: a function
/// declaration is visited before its parameters and body.
pub trait Visitor {
    fn visit_function_decl(&mut self, _decl: &FunctionDecl) {}

    fn visit_var(&mut self, _var: &VarExpr) {}
}

impl Stmt {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            Stmt::FunctionDecl(decl) => {
                visitor.visit_function_decl(decl);
                for param in &decl.params {
                    visitor.visit_var(param);
                }
                for stmt in &decl.body {
                    stmt.accept(visitor);
                }
            }
            Stmt::Expr(expr) => expr.accept(visitor),
            Stmt::Block(stmts) => {
                for stmt in stmts {
                    stmt.accept(visitor);
                }
            }
        }
    }
}

impl Expr {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            Expr::Var(var) => visitor.visit_var(var),
            Expr::Compound(exprs) => {
                for expr in exprs {
                    expr.accept(visitor);
                }
            }
        }
    }
}
