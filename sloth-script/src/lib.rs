// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::fmt;

use sloth::{BinaryOperator, EvalError, EvalResult};

mod interpreter;
mod lexer;

pub use interpreter::{
    evaluate_expression, execute_statement, execute_statements, InterpreterOptions,
};
pub use lexer::{tokenize, Token, TokenKind};

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    Assign {
        name: String,
        value: Node,
        line: usize,
    },
    Expression {
        value: Node,
        line: usize,
    },
}
impl Statement {
    pub fn line(&self) -> usize {
        match self {
            Self::Assign { line, .. } => *line,
            Self::Expression { line, .. } => *line,
        }
    }
}
impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assign { name, value, .. } => write!(f, "{} = {}", name, value),
            Self::Expression { value, .. } => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Operator {
    Arithmetic(BinaryOperator),
    Append,
}
impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arithmetic(operator) => write!(f, "{}", operator.symbol()),
            Self::Append => write!(f, ">>"),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Node {
    Int(i64),
    Float(f64),
    String(String),
    Identifier(String),
    List(Vec<Node>),
    Map(Vec<(Node, Node)>),
    Negate(Box<Node>),
    Binary(Operator, Box<Node>, Box<Node>),
    Call {
        target: Box<Node>,
        args: Vec<Node>,
        kwargs: Vec<(String, Node)>,
    },
}
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{:?}", value),
            Self::String(value) => write!(f, "{:?}", value),
            Self::Identifier(name) => write!(f, "{}", name),
            Self::List(items) => write!(
                f,
                "[{}]",
                items
                    .iter()
                    .map(|item| format!("{}", item))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Map(entries) => write!(
                f,
                "{{{}}}",
                entries
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, value))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Negate(operand) => write!(f, "-{}", operand),
            Self::Binary(operator, left, right) => write!(f, "({} {} {})", left, operator, right),
            Self::Call {
                target,
                args,
                kwargs,
            } => write!(
                f,
                "{}({})",
                target,
                args.iter()
                    .map(|arg| format!("{}", arg))
                    .chain(
                        kwargs
                            .iter()
                            .map(|(key, value)| format!("{}={}", key, value))
                    )
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

/// Parses a program made of newline- or `;`-separated statements.
pub fn parse_program(input: &str) -> EvalResult<Vec<Statement>> {
    let mut parser = Parser::new(tokenize(input)?);
    let mut statements = Vec::new();
    loop {
        parser.skip_separators();
        if parser.peek() == &TokenKind::EndOfInput {
            break;
        }
        statements.push(parser.statement()?);
        match parser.peek() {
            TokenKind::Separator | TokenKind::EndOfInput => {}
            _ => return Err(parser.unexpected("end of statement")),
        }
    }
    Ok(statements)
}

/// Maximum nesting of brackets, unary operators, chained binary operators and chained calls.
pub const MAX_NESTING_DEPTH: usize = 200;

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}
impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
        }
    }
    fn descend(&mut self) -> EvalResult<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(EvalError::syntax(
                self.line(),
                format!(
                    "Expression nested too deeply (limit {})",
                    MAX_NESTING_DEPTH
                ),
            ));
        }
        self.depth += 1;
        Ok(())
    }
    fn ascend(&mut self, levels: usize) {
        self.depth -= levels;
    }
    fn current(&self) -> &Token {
        let index = self.position.min(self.tokens.len().saturating_sub(1));
        &self.tokens[index]
    }
    fn peek(&self) -> &TokenKind {
        &self.current().kind
    }
    fn peek_ahead(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens
            .get(self.position + offset)
            .map(|token| &token.kind)
    }
    fn line(&self) -> usize {
        self.current().line
    }
    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        kind
    }
    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }
    fn expect(&mut self, kind: TokenKind) -> EvalResult<()> {
        if self.consume(&kind) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("{}", kind)))
        }
    }
    fn unexpected(&self, expected: &str) -> EvalError {
        EvalError::syntax(
            self.line(),
            format!("Expected {}, received {}", expected, self.peek()),
        )
    }
    fn skip_separators(&mut self) {
        while self.consume(&TokenKind::Separator) {}
    }
    fn statement(&mut self) -> EvalResult<Statement> {
        let line = self.line();
        match (self.peek(), self.peek_ahead(1)) {
            (TokenKind::Identifier(name), Some(TokenKind::Assign)) => {
                let name = name.clone();
                self.advance();
                self.advance();
                let value = self.expression()?;
                Ok(Statement::Assign { name, value, line })
            }
            _ => {
                let value = self.expression()?;
                Ok(Statement::Expression { value, line })
            }
        }
    }
    fn expression(&mut self) -> EvalResult<Node> {
        self.descend()?;
        let head = self.additive()?;
        let result = if self.consume(&TokenKind::Append) {
            let tail = self.expression()?;
            Node::Binary(Operator::Append, Box::new(head), Box::new(tail))
        } else {
            head
        };
        self.ascend(1);
        Ok(result)
    }
    fn additive(&mut self) -> EvalResult<Node> {
        let mut left = self.multiplicative()?;
        let mut levels = 0;
        loop {
            let operator = match self.peek() {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            self.descend()?;
            levels += 1;
            let right = self.multiplicative()?;
            left = Node::Binary(
                Operator::Arithmetic(operator),
                Box::new(left),
                Box::new(right),
            );
        }
        self.ascend(levels);
        Ok(left)
    }
    fn multiplicative(&mut self) -> EvalResult<Node> {
        let mut left = self.unary()?;
        let mut levels = 0;
        loop {
            let operator = match self.peek() {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                _ => break,
            };
            self.advance();
            self.descend()?;
            levels += 1;
            let right = self.unary()?;
            left = Node::Binary(
                Operator::Arithmetic(operator),
                Box::new(left),
                Box::new(right),
            );
        }
        self.ascend(levels);
        Ok(left)
    }
    fn unary(&mut self) -> EvalResult<Node> {
        if !self.consume(&TokenKind::Minus) {
            return self.postfix();
        }
        let literal = match self.peek() {
            TokenKind::IntegerLiteral(value) => Some(*value),
            _ => None,
        };
        if let Some(value) = literal {
            // Negative literals are folded so that i64::MIN can be written
            let line = self.line();
            self.advance();
            return i64::try_from(-i128::from(value))
                .map(Node::Int)
                .map_err(|_| {
                    EvalError::syntax(line, format!("Integer literal out of range: -{}", value))
                });
        }
        self.descend()?;
        let operand = self.unary()?;
        self.ascend(1);
        Ok(Node::Negate(Box::new(operand)))
    }
    fn postfix(&mut self) -> EvalResult<Node> {
        let mut target = self.primary()?;
        let mut levels = 0;
        while self.consume(&TokenKind::OpenParen) {
            self.descend()?;
            levels += 1;
            let (args, kwargs) = self.arguments()?;
            target = Node::Call {
                target: Box::new(target),
                args,
                kwargs,
            };
        }
        self.ascend(levels);
        Ok(target)
    }
    fn arguments(&mut self) -> EvalResult<(Vec<Node>, Vec<(String, Node)>)> {
        let mut args = Vec::new();
        let mut kwargs = Vec::<(String, Node)>::new();
        while !self.consume(&TokenKind::CloseParen) {
            match (self.peek(), self.peek_ahead(1)) {
                (TokenKind::Identifier(name), Some(TokenKind::Assign)) => {
                    let name = name.clone();
                    if kwargs.iter().any(|(key, _)| *key == name) {
                        return Err(EvalError::syntax(
                            self.line(),
                            format!("Keyword argument repeated: {}", name),
                        ));
                    }
                    self.advance();
                    self.advance();
                    kwargs.push((name, self.expression()?));
                }
                _ => {
                    let line = self.line();
                    let arg = self.expression()?;
                    if !kwargs.is_empty() {
                        return Err(EvalError::syntax(
                            line,
                            "Positional argument follows keyword argument",
                        ));
                    }
                    args.push(arg);
                }
            }
            if !self.consume(&TokenKind::Comma) {
                self.expect(TokenKind::CloseParen)?;
                break;
            }
        }
        Ok((args, kwargs))
    }
    fn primary(&mut self) -> EvalResult<Node> {
        match self.peek() {
            TokenKind::IntegerLiteral(value) => {
                let value = *value;
                let line = self.line();
                self.advance();
                i64::try_from(value).map(Node::Int).map_err(|_| {
                    EvalError::syntax(line, format!("Integer literal out of range: {}", value))
                })
            }
            TokenKind::FloatLiteral(value) => {
                let value = *value;
                self.advance();
                Ok(Node::Float(value))
            }
            TokenKind::StringLiteral(_) | TokenKind::Identifier(_) => match self.advance() {
                TokenKind::StringLiteral(value) => Ok(Node::String(value)),
                TokenKind::Identifier(name) => Ok(Node::Identifier(name)),
                _ => Err(self.unexpected("expression")),
            },
            TokenKind::OpenParen => {
                self.advance();
                let value = self.expression()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(value)
            }
            TokenKind::OpenBracket => {
                self.advance();
                let mut items = Vec::new();
                while !self.consume(&TokenKind::CloseBracket) {
                    items.push(self.expression()?);
                    if !self.consume(&TokenKind::Comma) {
                        self.expect(TokenKind::CloseBracket)?;
                        break;
                    }
                }
                Ok(Node::List(items))
            }
            TokenKind::OpenBrace => {
                self.advance();
                let mut entries = Vec::new();
                while !self.consume(&TokenKind::CloseBrace) {
                    let key = self.expression()?;
                    self.expect(TokenKind::Colon)?;
                    entries.push((key, self.expression()?));
                    if !self.consume(&TokenKind::Comma) {
                        self.expect(TokenKind::CloseBrace)?;
                        break;
                    }
                }
                Ok(Node::Map(entries))
            }
            _ => Err(self.unexpected("expression")),
        }
    }
}
