//! Recursive-descent parser producing a [`Program`].

use super::ast::*;
use super::lexer::{Keyword, Punct, Token, TokenKind};
use super::{CompileError, Span};

/// Parse a token stream produced by [`super::lexer::tokenize`].
pub fn parse(tokens: Vec<Token>) -> Result<Program, CompileError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let mut body = Vec::new();
    while !parser.at_eof() {
        body.push(parser.statement()?);
    }
    Ok(Program { body })
}

/// Deepest nesting of statements, operators and calls a script may use.
/// Evaluation and drop recurse over the tree too, so this also bounds them.
pub const MAX_NESTING: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Number(n) => format!("number {n}"),
        TokenKind::Str(s) => format!("string '{s}'"),
        TokenKind::Ident(name) => format!("'{name}'"),
        TokenKind::Keyword(kw) => format!("keyword {kw:?}").to_lowercase(),
        TokenKind::Punct(p) => format!("{p:?}"),
        TokenKind::Eof => "end of script".to_string(),
    }
}

impl Parser {
    // -----------------------------------------------------------------------
    // Token helpers
    // -----------------------------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn check_punct(&self, punct: Punct) -> bool {
        self.peek().kind == TokenKind::Punct(punct)
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.peek().kind == TokenKind::Keyword(keyword)
    }

    fn eat_punct(&mut self, punct: Punct) -> bool {
        if self.check_punct(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        let token = self.peek();
        CompileError::Syntax {
            span: token.span,
            message: format!("expected {expected}, found {}", describe(&token.kind)),
        }
    }

    fn expect_punct(&mut self, punct: Punct, expected: &str) -> Result<Span, CompileError> {
        if self.check_punct(punct) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<(String, Span), CompileError> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let span = self.advance().span;
                Ok((name, span))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    /// Go one level deeper, failing past [`MAX_NESTING`]. Callers give the
    /// level back once the nested part parsed; an error ends the parse.
    fn enter(&mut self) -> Result<(), CompileError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(CompileError::Syntax {
                span: self.peek().span,
                message: "expression nested too deeply".into(),
            });
        }
        Ok(())
    }

    fn nested<T>(
        &mut self,
        parse: fn(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        self.enter()?;
        let parsed = parse(self)?;
        self.depth -= 1;
        Ok(parsed)
    }

    /// A statement ends at `;`, before `}`, at the end of the script, or at a
    /// line break.
    fn end_statement(&mut self) -> Result<(), CompileError> {
        if self.eat_punct(Punct::Semicolon)
            || self.check_punct(Punct::RBrace)
            || self.at_eof()
            || self.peek().newline_before
        {
            Ok(())
        } else {
            Err(self.unexpected("';'"))
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn statement(&mut self) -> Result<Stmt, CompileError> {
        self.nested(Self::statement_inner)
    }

    fn statement_inner(&mut self) -> Result<Stmt, CompileError> {
        match self.peek().kind {
            TokenKind::Punct(Punct::LBrace) => self.block(),
            TokenKind::Punct(Punct::Semicolon) => {
                self.advance();
                Ok(Stmt::Empty)
            }
            TokenKind::Keyword(Keyword::Var | Keyword::Let | Keyword::Const) => {
                let decl = self.declaration()?;
                self.end_statement()?;
                Ok(decl)
            }
            TokenKind::Keyword(Keyword::If) => self.if_statement(),
            TokenKind::Keyword(Keyword::While) => self.while_statement(),
            TokenKind::Keyword(Keyword::For) => self.for_statement(),
            _ => {
                let expr = self.expression()?;
                self.end_statement()?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn block(&mut self) -> Result<Stmt, CompileError> {
        self.expect_punct(Punct::LBrace, "'{'")?;
        let mut body = Vec::new();
        while !self.check_punct(Punct::RBrace) {
            if self.at_eof() {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.statement()?);
        }
        self.advance();
        Ok(Stmt::Block(body))
    }

    fn declaration(&mut self) -> Result<Stmt, CompileError> {
        let kind = match self.advance().kind {
            TokenKind::Keyword(Keyword::Let) => DeclKind::Let,
            TokenKind::Keyword(Keyword::Const) => DeclKind::Const,
            _ => DeclKind::Var,
        };

        let mut declarators = Vec::new();
        loop {
            let (name, span) = self.expect_ident("variable name")?;
            let init = if self.eat_punct(Punct::Assign) {
                Some(self.assignment()?)
            } else {
                None
            };
            if kind == DeclKind::Const && init.is_none() {
                return Err(CompileError::Syntax {
                    span,
                    message: format!("missing initializer in const declaration of '{name}'"),
                });
            }
            declarators.push(Declarator { name, init, span });
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        Ok(Stmt::Decl { kind, declarators })
    }

    fn parenthesized(&mut self) -> Result<Expr, CompileError> {
        self.expect_punct(Punct::LParen, "'('")?;
        let expr = self.expression()?;
        self.expect_punct(Punct::RParen, "')'")?;
        Ok(expr)
    }

    fn if_statement(&mut self) -> Result<Stmt, CompileError> {
        self.advance();
        let cond = self.parenthesized()?;
        let then = Box::new(self.statement()?);
        let otherwise = if self.check_keyword(Keyword::Else) {
            self.advance();
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then,
            otherwise,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, CompileError> {
        self.advance();
        let cond = self.parenthesized()?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { cond, body })
    }

    fn for_statement(&mut self) -> Result<Stmt, CompileError> {
        self.advance();
        self.expect_punct(Punct::LParen, "'('")?;

        let init = if self.check_punct(Punct::Semicolon) {
            None
        } else if matches!(
            self.peek().kind,
            TokenKind::Keyword(Keyword::Var | Keyword::Let | Keyword::Const)
        ) {
            Some(Box::new(self.declaration()?))
        } else {
            Some(Box::new(Stmt::Expr(self.expression()?)))
        };
        self.expect_punct(Punct::Semicolon, "';'")?;

        let cond = if self.check_punct(Punct::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_punct(Punct::Semicolon, "';'")?;

        let update = if self.check_punct(Punct::RParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_punct(Punct::RParen, "')'")?;

        let body = Box::new(self.statement()?);
        Ok(Stmt::For {
            init,
            cond,
            update,
            body,
        })
    }

    // -----------------------------------------------------------------------
    // Expressions, lowest precedence first
    // -----------------------------------------------------------------------

    fn expression(&mut self) -> Result<Expr, CompileError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, CompileError> {
        self.nested(Self::assignment_inner)
    }

    fn assignment_inner(&mut self) -> Result<Expr, CompileError> {
        let target = self.logical_or()?;
        let op = match self.peek().kind {
            TokenKind::Punct(Punct::Assign) => None,
            TokenKind::Punct(Punct::PlusAssign) => Some(BinaryOp::Add),
            TokenKind::Punct(Punct::MinusAssign) => Some(BinaryOp::Sub),
            TokenKind::Punct(Punct::StarAssign) => Some(BinaryOp::Mul),
            TokenKind::Punct(Punct::SlashAssign) => Some(BinaryOp::Div),
            _ => return Ok(target),
        };
        self.advance();
        let value = Box::new(self.assignment()?);
        match target.kind {
            ExprKind::Ident(name) => Ok(Expr::new(ExprKind::Assign { name, op, value }, target.span)),
            _ => Err(CompileError::Syntax {
                span: target.span,
                message: "invalid assignment target; only variables can be assigned".into(),
            }),
        }
    }

    fn logical_or(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.logical_and()?;
        let mut links = 0;
        while self.check_punct(Punct::OrOr) {
            self.enter()?;
            links += 1;
            let span = self.advance().span;
            let rhs = self.logical_and()?;
            lhs = Expr::new(
                ExprKind::Logical {
                    op: LogicalOp::Or,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        self.depth -= links;
        Ok(lhs)
    }

    fn logical_and(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.equality()?;
        let mut links = 0;
        while self.check_punct(Punct::AndAnd) {
            self.enter()?;
            links += 1;
            let span = self.advance().span;
            let rhs = self.equality()?;
            lhs = Expr::new(
                ExprKind::Logical {
                    op: LogicalOp::And,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        self.depth -= links;
        Ok(lhs)
    }

    /// Parse a left-associative chain of binary operators at one precedence
    /// level.
    fn binary_level(
        &mut self,
        ops: &[(Punct, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, CompileError>,
    ) -> Result<Expr, CompileError> {
        let mut lhs = next(self)?;
        let mut links = 0;
        loop {
            let found = ops
                .iter()
                .find(|(punct, _)| self.check_punct(*punct))
                .map(|&(_, op)| op);
            let Some(op) = found else {
                self.depth -= links;
                return Ok(lhs);
            };
            self.enter()?;
            links += 1;
            let span = self.advance().span;
            let rhs = next(self)?;
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
    }

    fn equality(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(
            &[
                (Punct::EqEqEq, BinaryOp::StrictEq),
                (Punct::NotEqEq, BinaryOp::StrictNotEq),
                (Punct::EqEq, BinaryOp::Eq),
                (Punct::NotEq, BinaryOp::NotEq),
            ],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(
            &[
                (Punct::Lt, BinaryOp::Lt),
                (Punct::Le, BinaryOp::Le),
                (Punct::Gt, BinaryOp::Gt),
                (Punct::Ge, BinaryOp::Ge),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(
            &[(Punct::Plus, BinaryOp::Add), (Punct::Minus, BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(
            &[
                (Punct::Star, BinaryOp::Mul),
                (Punct::Slash, BinaryOp::Div),
                (Punct::Percent, BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr, CompileError> {
        self.nested(Self::unary_inner)
    }

    fn unary_inner(&mut self) -> Result<Expr, CompileError> {
        let op = match self.peek().kind {
            TokenKind::Punct(Punct::Minus) => UnaryOp::Neg,
            TokenKind::Punct(Punct::Plus) => UnaryOp::Plus,
            TokenKind::Punct(Punct::Bang) => UnaryOp::Not,
            TokenKind::Punct(p @ (Punct::PlusPlus | Punct::MinusMinus)) => {
                let span = self.advance().span;
                let operand = self.unary()?;
                let delta = if p == Punct::PlusPlus { 1.0 } else { -1.0 };
                return update_target(operand, delta, true, span);
            }
            _ => return self.postfix(),
        };
        let span = self.advance().span;
        let operand = Box::new(self.unary()?);
        Ok(Expr::new(ExprKind::Unary { op, operand }, span))
    }

    fn postfix(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.primary()?;
        let mut links = 0;
        let expr = loop {
            if self.check_punct(Punct::Dot) {
                self.enter()?;
                links += 1;
                self.advance();
                let (method, span) = self.expect_ident("method name")?;
                if !self.check_punct(Punct::LParen) {
                    return Err(CompileError::Syntax {
                        span,
                        message: format!(
                            "property access '.{method}' is not supported; call a method instead"
                        ),
                    });
                }
                let args = self.arguments()?;
                expr = Expr::new(
                    ExprKind::Method {
                        receiver: Box::new(expr),
                        method,
                        args,
                    },
                    span,
                );
            } else if self.check_punct(Punct::LParen) {
                let ExprKind::Ident(callee) = expr.kind else {
                    return Err(CompileError::Syntax {
                        span: expr.span,
                        message: "only named functions can be called".into(),
                    });
                };
                let args = self.arguments()?;
                expr = Expr::new(ExprKind::Call { callee, args }, expr.span);
            } else if !self.peek().newline_before
                && (self.check_punct(Punct::PlusPlus) || self.check_punct(Punct::MinusMinus))
            {
                let delta = if self.check_punct(Punct::PlusPlus) { 1.0 } else { -1.0 };
                let span = self.advance().span;
                break update_target(expr, delta, false, span)?;
            } else {
                break expr;
            }
        };
        self.depth -= links;
        Ok(expr)
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, CompileError> {
        self.expect_punct(Punct::LParen, "'('")?;
        let mut args = Vec::new();
        while !self.check_punct(Punct::RParen) {
            args.push(self.assignment()?);
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        self.expect_punct(Punct::RParen, "')'")?;
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        let token = self.peek().clone();
        let kind = match token.kind {
            TokenKind::Number(n) => ExprKind::Number(n),
            TokenKind::Str(s) => ExprKind::Str(s),
            TokenKind::Ident(name) => ExprKind::Ident(name),
            TokenKind::Keyword(Keyword::True) => ExprKind::Bool(true),
            TokenKind::Keyword(Keyword::False) => ExprKind::Bool(false),
            TokenKind::Keyword(Keyword::Null) => ExprKind::Null,
            TokenKind::Keyword(Keyword::Undefined) => ExprKind::Undefined,
            TokenKind::Punct(Punct::LParen) => return self.parenthesized(),
            _ => return Err(self.unexpected("an expression")),
        };
        self.advance();
        Ok(Expr::new(kind, token.span))
    }
}

fn update_target(operand: Expr, delta: f64, prefix: bool, span: Span) -> Result<Expr, CompileError> {
    match operand.kind {
        ExprKind::Ident(name) => Ok(Expr::new(
            ExprKind::Update {
                name,
                delta,
                prefix,
            },
            span,
        )),
        _ => Err(CompileError::Syntax {
            span,
            message: "increment and decrement need a variable".into(),
        }),
    }
}
