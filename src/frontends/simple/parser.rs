//! Hand-written lexer and recursive-descent parser for the simple
//! language. Every token carries its byte span, so the tree downstream of
//! this module can point the instrumentor at exact edit locations.

use super::ast::{BinOp, Block, Expr, Function, Program, Span, Stmt, SwitchCase, UnOp};
use super::syntax::keywords;

#[derive(Debug)]
pub struct ParseError {
    pub line: u32,
    pub message: String,
}

impl ParseError {
    fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Ident(String),
    Int(i64),
    LParen,
    RParen,
    LBrace,
    RBrace,
    Semi,
    Colon,
    Comma,
    Assign,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    AndAnd,
    OrOr,
    Bang,
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    span: Span,
}

fn lex(source: &str) -> Result<Vec<Token>, ParseError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0usize;
    let mut line = 1u32;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'\n' => {
                line += 1;
                i += 1;
            }
            b' ' | b'\t' | b'\r' => i += 1,
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            _ => {
                let start = i as u32;
                let tok = match b {
                    b'(' => {
                        i += 1;
                        Tok::LParen
                    }
                    b')' => {
                        i += 1;
                        Tok::RParen
                    }
                    b'{' => {
                        i += 1;
                        Tok::LBrace
                    }
                    b'}' => {
                        i += 1;
                        Tok::RBrace
                    }
                    b';' => {
                        i += 1;
                        Tok::Semi
                    }
                    b':' => {
                        i += 1;
                        Tok::Colon
                    }
                    b',' => {
                        i += 1;
                        Tok::Comma
                    }
                    b'+' => {
                        i += 1;
                        Tok::Plus
                    }
                    b'-' => {
                        i += 1;
                        Tok::Minus
                    }
                    b'*' => {
                        i += 1;
                        Tok::Star
                    }
                    b'/' => {
                        i += 1;
                        Tok::Slash
                    }
                    b'%' => {
                        i += 1;
                        Tok::Percent
                    }
                    b'=' => {
                        if bytes.get(i + 1) == Some(&b'=') {
                            i += 2;
                            Tok::Eq
                        } else {
                            i += 1;
                            Tok::Assign
                        }
                    }
                    b'!' => {
                        if bytes.get(i + 1) == Some(&b'=') {
                            i += 2;
                            Tok::Ne
                        } else {
                            i += 1;
                            Tok::Bang
                        }
                    }
                    b'<' => {
                        if bytes.get(i + 1) == Some(&b'=') {
                            i += 2;
                            Tok::Le
                        } else {
                            i += 1;
                            Tok::Lt
                        }
                    }
                    b'>' => {
                        if bytes.get(i + 1) == Some(&b'=') {
                            i += 2;
                            Tok::Ge
                        } else {
                            i += 1;
                            Tok::Gt
                        }
                    }
                    b'&' => {
                        if bytes.get(i + 1) == Some(&b'&') {
                            i += 2;
                            Tok::AndAnd
                        } else {
                            return Err(ParseError::new(line, "expected '&&'"));
                        }
                    }
                    b'|' => {
                        if bytes.get(i + 1) == Some(&b'|') {
                            i += 2;
                            Tok::OrOr
                        } else {
                            return Err(ParseError::new(line, "expected '||'"));
                        }
                    }
                    b'0'..=b'9' => {
                        while i < bytes.len() && bytes[i].is_ascii_digit() {
                            i += 1;
                        }
                        let text = &source[start as usize..i];
                        let value = text.parse::<i64>().map_err(|_| {
                            ParseError::new(line, format!("integer literal too large: {text}"))
                        })?;
                        Tok::Int(value)
                    }
                    b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                        while i < bytes.len()
                            && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_')
                        {
                            i += 1;
                        }
                        Tok::Ident(source[start as usize..i].to_string())
                    }
                    other => {
                        return Err(ParseError::new(
                            line,
                            format!("unexpected character {:?}", other as char),
                        ));
                    }
                };
                tokens.push(Token {
                    tok,
                    span: Span {
                        start,
                        end: i as u32,
                        line,
                    },
                });
            }
        }
    }

    Ok(tokens)
}

pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = lex(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kw(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Token { tok: Tok::Ident(name), .. }) if name == kw)
    }

    fn last_line(&self) -> u32 {
        self.tokens.last().map(|t| t.span.line).unwrap_or(1)
    }

    fn next(&mut self) -> Result<Token, ParseError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| ParseError::new(self.last_line(), "unexpected end of input"))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: Tok, what: &str) -> Result<Token, ParseError> {
        let token = self.next()?;
        if token.tok != expected {
            return Err(ParseError::new(
                token.span.line,
                format!("expected {what}, found {:?}", token.tok),
            ));
        }
        Ok(token)
    }

    fn expect_kw(&mut self, kw: &str) -> Result<Token, ParseError> {
        let token = self.next()?;
        match &token.tok {
            Tok::Ident(name) if name == kw => Ok(token),
            other => Err(ParseError::new(
                token.span.line,
                format!("expected '{kw}', found {other:?}"),
            )),
        }
    }

    fn ident(&mut self, what: &str) -> Result<(String, Span), ParseError> {
        let token = self.next()?;
        match token.tok {
            Tok::Ident(name) => Ok((name, token.span)),
            other => Err(ParseError::new(
                token.span.line,
                format!("expected {what}, found {other:?}"),
            )),
        }
    }

    fn program(&mut self) -> Result<Program, ParseError> {
        let mut functions = Vec::new();
        while self.peek().is_some() {
            functions.push(self.function()?);
        }
        Ok(Program { functions })
    }

    fn function(&mut self) -> Result<Function, ParseError> {
        let fn_token = self.expect_kw(keywords::FN)?;
        let (name, name_span) = self.ident("function name")?;
        if is_keyword(&name) {
            return Err(ParseError::new(
                name_span.line,
                format!("'{name}' is a keyword, not a function name"),
            ));
        }
        self.expect(Tok::LParen, "'('")?;
        let mut params = Vec::new();
        if !matches!(self.peek().map(|t| &t.tok), Some(Tok::RParen)) {
            loop {
                let (param, _) = self.ident("parameter name")?;
                params.push(param);
                match self.next()? {
                    Token { tok: Tok::Comma, .. } => continue,
                    Token { tok: Tok::RParen, .. } => break,
                    token => {
                        return Err(ParseError::new(
                            token.span.line,
                            "expected ',' or ')' in parameter list",
                        ));
                    }
                }
            }
        } else {
            self.next()?; // consume ')'
        }
        let body = self.block()?;
        Ok(Function {
            name,
            params,
            body,
            line: fn_token.span.line,
        })
    }

    fn block(&mut self) -> Result<Block, ParseError> {
        let open = self.expect(Tok::LBrace, "'{'")?;
        let mut statements = Vec::new();
        loop {
            match self.peek() {
                Some(Token { tok: Tok::RBrace, .. }) => break,
                Some(_) => statements.push(self.statement()?),
                None => {
                    return Err(ParseError::new(self.last_line(), "unclosed block"));
                }
            }
        }
        let close = self.expect(Tok::RBrace, "'}'")?;
        Ok(Block {
            open: open.span.start,
            close: close.span.start,
            statements,
        })
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        if self.peek_kw(keywords::LET) {
            return self.let_statement();
        }
        if self.peek_kw(keywords::RETURN) {
            return self.return_statement();
        }
        if self.peek_kw(keywords::PRINT) {
            return self.print_statement();
        }
        if self.peek_kw(keywords::IF) {
            return self.if_statement();
        }
        if self.peek_kw(keywords::WHILE) {
            return self.while_statement();
        }
        if self.peek_kw(keywords::SWITCH) {
            return self.switch_statement();
        }
        self.assign_or_call_statement()
    }

    fn let_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect_kw(keywords::LET)?;
        let (name, _) = self.ident("variable name")?;
        self.expect(Tok::Assign, "'='")?;
        let value = self.expr()?;
        let semi = self.expect(Tok::Semi, "';'")?;
        Ok(Stmt::Let {
            name,
            value,
            span: span_between(start.span, semi.span),
        })
    }

    fn return_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect_kw(keywords::RETURN)?;
        let value = if matches!(self.peek().map(|t| &t.tok), Some(Tok::Semi)) {
            None
        } else {
            Some(self.expr()?)
        };
        let semi = self.expect(Tok::Semi, "';'")?;
        Ok(Stmt::Return {
            value,
            span: span_between(start.span, semi.span),
        })
    }

    fn print_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect_kw(keywords::PRINT)?;
        self.expect(Tok::LParen, "'('")?;
        let value = self.expr()?;
        self.expect(Tok::RParen, "')'")?;
        let semi = self.expect(Tok::Semi, "';'")?;
        Ok(Stmt::Print {
            value,
            span: span_between(start.span, semi.span),
        })
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect_kw(keywords::IF)?;
        let mut arms = Vec::new();
        let mut else_block = None;
        let mut end;

        self.expect(Tok::LParen, "'('")?;
        let cond = self.expr()?;
        self.expect(Tok::RParen, "')'")?;
        let body = self.block()?;
        end = body.close + 1;
        arms.push((cond, body));

        while self.peek_kw(keywords::ELSE) {
            self.next()?; // consume 'else'
            if self.peek_kw(keywords::IF) {
                self.next()?; // consume 'if'
                self.expect(Tok::LParen, "'('")?;
                let cond = self.expr()?;
                self.expect(Tok::RParen, "')'")?;
                let body = self.block()?;
                end = body.close + 1;
                arms.push((cond, body));
            } else {
                let body = self.block()?;
                end = body.close + 1;
                else_block = Some(body);
                break;
            }
        }

        Ok(Stmt::If {
            arms,
            else_block,
            span: Span {
                start: start.span.start,
                end,
                line: start.span.line,
            },
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect_kw(keywords::WHILE)?;
        self.expect(Tok::LParen, "'('")?;
        let cond = self.expr()?;
        self.expect(Tok::RParen, "')'")?;
        let body = self.block()?;
        let end = body.close + 1;
        Ok(Stmt::While {
            cond,
            body,
            span: Span {
                start: start.span.start,
                end,
                line: start.span.line,
            },
        })
    }

    fn switch_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect_kw(keywords::SWITCH)?;
        self.expect(Tok::LParen, "'('")?;
        let scrutinee = self.expr()?;
        self.expect(Tok::RParen, "')'")?;
        self.expect(Tok::LBrace, "'{'")?;

        let mut cases = Vec::new();
        let mut default = None;
        loop {
            if self.peek_kw(keywords::CASE) {
                let case_token = self.next()?;
                let value = match self.next()? {
                    Token {
                        tok: Tok::Int(value),
                        ..
                    } => value,
                    token => {
                        return Err(ParseError::new(
                            token.span.line,
                            "expected integer literal after 'case'",
                        ));
                    }
                };
                self.expect(Tok::Colon, "':'")?;
                let body = self.block()?;
                cases.push(SwitchCase {
                    value,
                    body,
                    line: case_token.span.line,
                });
            } else if self.peek_kw(keywords::DEFAULT) {
                let token = self.next()?;
                if default.is_some() {
                    return Err(ParseError::new(token.span.line, "duplicate 'default' arm"));
                }
                self.expect(Tok::Colon, "':'")?;
                default = Some(self.block()?);
            } else {
                break;
            }
        }

        let close = self.expect(Tok::RBrace, "'}' to close switch")?;
        if cases.is_empty() {
            return Err(ParseError::new(
                start.span.line,
                "switch needs at least one case",
            ));
        }
        Ok(Stmt::Switch {
            scrutinee,
            cases,
            default,
            span: span_between(start.span, close.span),
        })
    }

    fn assign_or_call_statement(&mut self) -> Result<Stmt, ParseError> {
        let (name, name_span) = self.ident("statement")?;
        if is_keyword(&name) {
            return Err(ParseError::new(
                name_span.line,
                format!("'{name}' cannot start a statement here"),
            ));
        }
        match self.peek().map(|t| &t.tok) {
            Some(Tok::Assign) => {
                self.next()?;
                let value = self.expr()?;
                let semi = self.expect(Tok::Semi, "';'")?;
                Ok(Stmt::Assign {
                    name,
                    value,
                    span: span_between(name_span, semi.span),
                })
            }
            Some(Tok::LParen) => {
                let call = self.call_expr(name, name_span)?;
                let semi = self.expect(Tok::Semi, "';'")?;
                Ok(Stmt::Call {
                    call,
                    span: span_between(name_span, semi.span),
                })
            }
            _ => Err(ParseError::new(
                name_span.line,
                "expected '=' or '(' after identifier",
            )),
        }
    }

    fn call_expr(&mut self, callee: String, callee_span: Span) -> Result<Expr, ParseError> {
        self.expect(Tok::LParen, "'('")?;
        let mut args = Vec::new();
        if matches!(self.peek().map(|t| &t.tok), Some(Tok::RParen)) {
            let close = self.next()?;
            return Ok(Expr::Call {
                callee,
                args,
                span: span_between(callee_span, close.span),
            });
        }
        loop {
            args.push(self.expr()?);
            match self.next()? {
                Token { tok: Tok::Comma, .. } => continue,
                Token {
                    tok: Tok::RParen,
                    span: close,
                } => {
                    return Ok(Expr::Call {
                        callee,
                        args,
                        span: span_between(callee_span, close),
                    });
                }
                token => {
                    return Err(ParseError::new(
                        token.span.line,
                        "expected ',' or ')' in argument list",
                    ));
                }
            }
        }
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.and_expr()?;
        while matches!(self.peek().map(|t| &t.tok), Some(Tok::OrOr)) {
            self.next()?;
            let rhs = self.and_expr()?;
            lhs = binary(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.cmp_expr()?;
        while matches!(self.peek().map(|t| &t.tok), Some(Tok::AndAnd)) {
            self.next()?;
            let rhs = self.cmp_expr()?;
            lhs = binary(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn cmp_expr(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.add_expr()?;
        let op = match self.peek().map(|t| &t.tok) {
            Some(Tok::Eq) => BinOp::Eq,
            Some(Tok::Ne) => BinOp::Ne,
            Some(Tok::Lt) => BinOp::Lt,
            Some(Tok::Le) => BinOp::Le,
            Some(Tok::Gt) => BinOp::Gt,
            Some(Tok::Ge) => BinOp::Ge,
            _ => return Ok(lhs),
        };
        self.next()?;
        let rhs = self.add_expr()?;
        Ok(binary(op, lhs, rhs))
    }

    fn add_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.mul_expr()?;
        loop {
            let op = match self.peek().map(|t| &t.tok) {
                Some(Tok::Plus) => BinOp::Add,
                Some(Tok::Minus) => BinOp::Sub,
                _ => break,
            };
            self.next()?;
            let rhs = self.mul_expr()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn mul_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary_expr()?;
        loop {
            let op = match self.peek().map(|t| &t.tok) {
                Some(Tok::Star) => BinOp::Mul,
                Some(Tok::Slash) => BinOp::Div,
                Some(Tok::Percent) => BinOp::Rem,
                _ => break,
            };
            self.next()?;
            let rhs = self.unary_expr()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary_expr(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek().map(|t| &t.tok) {
            Some(Tok::Bang) => Some(UnOp::Not),
            Some(Tok::Minus) => Some(UnOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            let token = self.next()?;
            let operand = self.unary_expr()?;
            let span = Span {
                start: token.span.start,
                end: operand.span().end,
                line: token.span.line,
            };
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
                span,
            });
        }
        self.primary_expr()
    }

    fn primary_expr(&mut self) -> Result<Expr, ParseError> {
        let token = self.next()?;
        match token.tok {
            Tok::Int(value) => Ok(Expr::Int(value, token.span)),
            Tok::LParen => {
                let inner = self.expr()?;
                let close = self.expect(Tok::RParen, "')'")?;
                // Span covers the parentheses, so source slices of this
                // node splice back in without changing precedence
                Ok(inner.with_span(Span {
                    start: token.span.start,
                    end: close.span.end,
                    line: token.span.line,
                }))
            }
            Tok::Ident(name) if name == keywords::TRUE => Ok(Expr::Bool(true, token.span)),
            Tok::Ident(name) if name == keywords::FALSE => Ok(Expr::Bool(false, token.span)),
            Tok::Ident(name) => {
                if is_keyword(&name) {
                    return Err(ParseError::new(
                        token.span.line,
                        format!("'{name}' is not valid in an expression"),
                    ));
                }
                if matches!(self.peek().map(|t| &t.tok), Some(Tok::LParen)) {
                    self.call_expr(name, token.span)
                } else {
                    Ok(Expr::Var(name, token.span))
                }
            }
            other => Err(ParseError::new(
                token.span.line,
                format!("expected expression, found {other:?}"),
            )),
        }
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    let span = Span {
        start: lhs.span().start,
        end: rhs.span().end,
        line: lhs.span().line,
    };
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        span,
    }
}

fn span_between(start: Span, end: Span) -> Span {
    Span {
        start: start.start,
        end: end.end,
        line: start.line,
    }
}

fn is_keyword(name: &str) -> bool {
    matches!(
        name,
        keywords::FN
            | keywords::LET
            | keywords::IF
            | keywords::ELSE
            | keywords::WHILE
            | keywords::SWITCH
            | keywords::CASE
            | keywords::DEFAULT
            | keywords::RETURN
            | keywords::PRINT
            | keywords::TRUE
            | keywords::FALSE
    )
}
