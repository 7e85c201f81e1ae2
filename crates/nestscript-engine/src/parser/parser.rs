// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The main parser implementation.

use crate::Error;
use crate::ast::*;
use crate::lexer::{Scanner, Token, TokenKind};
use crate::runtime::value::number_to_string;

/// A recursive descent parser for the supported JavaScript subset.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    current: Token,
    /// Nesting depth of function bodies; `return` is only legal above zero.
    function_depth: usize,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given source code.
    pub fn new(source: &'a str) -> Self {
        let mut scanner = Scanner::new(source);
        let current = scanner.next_token();
        Self {
            scanner,
            current,
            function_depth: 0,
        }
    }

    /// Parses the source code into a Program AST node.
    pub fn parse_program(&mut self) -> Result<Program, Error> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        Ok(Program { body })
    }

    /// Parses a single statement.
    pub fn parse_statement(&mut self) -> Result<Statement, Error> {
        match &self.current.kind {
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let decl = self.parse_variable_declaration_no_semi()?;
                self.consume_semicolon()?;
                Ok(Statement::VariableDeclaration(decl))
            }
            TokenKind::Function => self.parse_function_declaration(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::LeftBrace => {
                self.advance();
                let body = self.parse_block_body()?;
                Ok(Statement::Block(BlockStatement { body }))
            }
            TokenKind::Semicolon => {
                self.advance();
                Ok(Statement::Empty)
            }
            TokenKind::Reserved(word) => Err(Error::SyntaxError(format!(
                "'{}' is not supported",
                word
            ))),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_variable_declaration_no_semi(&mut self) -> Result<VariableDeclaration, Error> {
        let kind = match &self.current.kind {
            TokenKind::Var => VariableKind::Var,
            TokenKind::Let => VariableKind::Let,
            _ => VariableKind::Const,
        };
        self.advance();

        let mut declarations = Vec::new();
        loop {
            let id = self.expect_identifier()?;
            let init = if self.check(&TokenKind::Equal) {
                self.advance();
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarations.push(VariableDeclarator { id, init });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(VariableDeclaration { kind, declarations })
    }

    fn parse_function_declaration(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'function'

        let id = self.expect_identifier()?;
        let params = self.parse_parameters()?;
        let body = self.parse_function_body()?;

        Ok(Statement::FunctionDeclaration(FunctionDeclaration {
            id,
            params,
            body,
        }))
    }

    /// Parses `( a, b, ... )`.
    fn parse_parameters(&mut self) -> Result<Vec<Identifier>, Error> {
        self.expect(&TokenKind::LeftParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                params.push(self.expect_identifier()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(&TokenKind::RightParen)?;
        Ok(params)
    }

    /// Parses `{ ... }` as a function body.
    fn parse_function_body(&mut self) -> Result<Vec<Statement>, Error> {
        self.expect(&TokenKind::LeftBrace)?;
        self.function_depth += 1;
        let body = self.parse_block_body();
        self.function_depth -= 1;
        body
    }

    /// Parses statements up to and including the closing brace.
    fn parse_block_body(&mut self) -> Result<Vec<Statement>, Error> {
        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            if self.is_at_end() {
                return Err(Error::SyntaxError("Unexpected end of input, expected '}'".into()));
            }
            body.push(self.parse_statement()?);
        }
        self.advance();
        Ok(body)
    }

    fn parse_if_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'if'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;

        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.check(&TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Statement::If(IfStatement {
            test,
            consequent,
            alternate,
        }))
    }

    fn parse_while_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'while'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While(WhileStatement { test, body }))
    }

    fn parse_for_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'for'
        self.expect(&TokenKind::LeftParen)?;

        let init = match &self.current.kind {
            TokenKind::Semicolon => None,
            TokenKind::Var | TokenKind::Let | TokenKind::Const => Some(ForInit::Declaration(
                self.parse_variable_declaration_no_semi()?,
            )),
            _ => Some(ForInit::Expression(self.parse_expression()?)),
        };
        self.expect(&TokenKind::Semicolon)?;

        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;

        let update = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RightParen)?;

        let body = Box::new(self.parse_statement()?);
        Ok(Statement::For(ForStatement {
            init,
            test,
            update,
            body,
        }))
    }

    fn parse_return_statement(&mut self) -> Result<Statement, Error> {
        if self.function_depth == 0 {
            return Err(Error::SyntaxError("Illegal return statement".into()));
        }
        self.advance(); // consume 'return'

        let argument = if self.at_statement_end() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;
        Ok(Statement::Return(ReturnStatement { argument }))
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, Error> {
        let expression = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Statement::Expression(ExpressionStatement { expression }))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Parses an expression.
    pub fn parse_expression(&mut self) -> Result<Expression, Error> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expression, Error> {
        if self.arrow_ahead() {
            return self.parse_arrow_function();
        }

        let left = self.parse_logical_or()?;

        let operator = match self.current.kind {
            TokenKind::Equal => AssignmentOperator::Assign,
            TokenKind::PlusEqual => AssignmentOperator::AddAssign,
            TokenKind::MinusEqual => AssignmentOperator::SubAssign,
            TokenKind::StarEqual => AssignmentOperator::MulAssign,
            TokenKind::SlashEqual => AssignmentOperator::DivAssign,
            TokenKind::PercentEqual => AssignmentOperator::ModAssign,
            _ => return Ok(left),
        };
        self.advance();

        // Right-associative: a = b = c
        let right = self.parse_assignment()?;
        Ok(Expression::Assignment(AssignmentExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }))
    }

    fn parse_logical_or(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_logical_and()?;
        while self.check(&TokenKind::PipePipe) {
            self.advance();
            let right = self.parse_logical_and()?;
            left = Expression::Logical(LogicalExpression {
                operator: LogicalOperator::Or,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_equality()?;
        while self.check(&TokenKind::AmpAmp) {
            self.advance();
            let right = self.parse_equality()?;
            left = Expression::Logical(LogicalExpression {
                operator: LogicalOperator::And,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_comparison()?;
        loop {
            let operator = match self.current.kind {
                TokenKind::EqualEqual => BinaryOperator::Eq,
                TokenKind::BangEqual => BinaryOperator::Ne,
                TokenKind::EqualEqualEqual => BinaryOperator::StrictEq,
                TokenKind::BangEqualEqual => BinaryOperator::StrictNe,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = binary(operator, left, right);
        }
    }

    fn parse_comparison(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_additive()?;
        loop {
            let operator = match self.current.kind {
                TokenKind::Less => BinaryOperator::Lt,
                TokenKind::LessEqual => BinaryOperator::Le,
                TokenKind::Greater => BinaryOperator::Gt,
                TokenKind::GreaterEqual => BinaryOperator::Ge,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(operator, left, right);
        }
    }

    fn parse_additive(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let operator = match self.current.kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(operator, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_unary()?;
        loop {
            let operator = match self.current.kind {
                TokenKind::Star => BinaryOperator::Mul,
                TokenKind::Slash => BinaryOperator::Div,
                TokenKind::Percent => BinaryOperator::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(operator, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expression, Error> {
        let operator = match self.current.kind {
            TokenKind::Minus => UnaryOperator::Minus,
            TokenKind::Bang => UnaryOperator::Not,
            TokenKind::Typeof => UnaryOperator::TypeOf,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let operator = update_operator(&self.current.kind);
                self.advance();
                let argument = self.parse_unary()?;
                return Ok(Expression::Update(UpdateExpression {
                    operator,
                    prefix: true,
                    argument: Box::new(argument),
                }));
            }
            TokenKind::Plus => {
                return Err(Error::SyntaxError("unary '+' is not supported".into()));
            }
            _ => return self.parse_postfix(),
        };
        self.advance();
        let argument = self.parse_unary()?;
        Ok(Expression::Unary(UnaryExpression {
            operator,
            argument: Box::new(argument),
        }))
    }

    fn parse_postfix(&mut self) -> Result<Expression, Error> {
        let expr = self.parse_call()?;
        if matches!(self.current.kind, TokenKind::PlusPlus | TokenKind::MinusMinus)
            && !self.current.newline_before
        {
            let operator = update_operator(&self.current.kind);
            self.advance();
            return Ok(Expression::Update(UpdateExpression {
                operator,
                prefix: false,
                argument: Box::new(expr),
            }));
        }
        Ok(expr)
    }

    /// Parses member accesses and calls chained onto a primary expression.
    fn parse_call(&mut self) -> Result<Expression, Error> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.current.kind {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_property_name()?;
                    expr = Expression::Member(MemberExpression {
                        object: Box::new(expr),
                        property: Box::new(Expression::Identifier(Identifier::new(name))),
                        computed: false,
                    });
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let property = self.parse_expression()?;
                    self.expect(&TokenKind::RightBracket)?;
                    expr = Expression::Member(MemberExpression {
                        object: Box::new(expr),
                        property: Box::new(property),
                        computed: true,
                    });
                }
                TokenKind::LeftParen => {
                    let arguments = self.parse_arguments()?;
                    expr = Expression::Call(CallExpression {
                        callee: Box::new(expr),
                        arguments,
                    });
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, Error> {
        self.expect(&TokenKind::LeftParen)?;
        let mut arguments = Vec::new();
        while !self.check(&TokenKind::RightParen) {
            arguments.push(self.parse_assignment()?);
            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(&TokenKind::RightParen)?;
        Ok(arguments)
    }

    fn parse_primary(&mut self) -> Result<Expression, Error> {
        let raw = self.scanner.slice(self.current.span).to_string();
        let value = match &self.current.kind {
            TokenKind::Number(n) => LiteralValue::Number(*n),
            TokenKind::String(s) => LiteralValue::String(s.clone()),
            TokenKind::True => LiteralValue::Boolean(true),
            TokenKind::False => LiteralValue::Boolean(false),
            TokenKind::Null => LiteralValue::Null,
            TokenKind::Identifier(name) => {
                let id = Identifier::new(name.clone());
                self.advance();
                return Ok(Expression::Identifier(id));
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                return Ok(expr);
            }
            TokenKind::Function => return self.parse_function_expression(),
            TokenKind::LeftBracket => return self.parse_array_literal(),
            TokenKind::LeftBrace => return self.parse_object_literal(),
            TokenKind::Reserved(word) => {
                return Err(Error::SyntaxError(format!("'{}' is not supported", word)));
            }
            other => {
                return Err(Error::SyntaxError(format!(
                    "Unexpected {}",
                    other.describe()
                )));
            }
        };
        self.advance();
        Ok(Expression::Literal(Literal { value, raw }))
    }

    fn parse_function_expression(&mut self) -> Result<Expression, Error> {
        self.advance(); // consume 'function'

        let id = match &self.current.kind {
            TokenKind::Identifier(name) => {
                let id = Identifier::new(name.clone());
                self.advance();
                Some(id)
            }
            _ => None,
        };
        let params = self.parse_parameters()?;
        let body = self.parse_function_body()?;

        Ok(Expression::Function(FunctionExpression { id, params, body }))
    }

    /// True when the upcoming tokens start an arrow function:
    /// `x =>` or `( a, b ) =>`.
    fn arrow_ahead(&self) -> bool {
        let mut lookahead = self.scanner.clone();
        match &self.current.kind {
            TokenKind::Identifier(_) => lookahead.next_token().kind == TokenKind::Arrow,
            TokenKind::LeftParen => {
                let mut expect_name = true;
                loop {
                    let token = lookahead.next_token();
                    match token.kind {
                        TokenKind::RightParen => {
                            return lookahead.next_token().kind == TokenKind::Arrow;
                        }
                        TokenKind::Identifier(_) if expect_name => expect_name = false,
                        TokenKind::Comma if !expect_name => expect_name = true,
                        _ => return false,
                    }
                }
            }
            _ => false,
        }
    }

    fn parse_arrow_function(&mut self) -> Result<Expression, Error> {
        let params = if self.check(&TokenKind::LeftParen) {
            self.parse_parameters()?
        } else {
            vec![self.expect_identifier()?]
        };
        self.expect(&TokenKind::Arrow)?;

        let body = if self.check(&TokenKind::LeftBrace) {
            ArrowBody::Block(self.parse_function_body()?)
        } else {
            ArrowBody::Expression(Box::new(self.parse_assignment()?))
        };

        Ok(Expression::Arrow(ArrowFunctionExpression { params, body }))
    }

    fn parse_array_literal(&mut self) -> Result<Expression, Error> {
        self.advance(); // consume '['
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RightBracket) {
            elements.push(self.parse_assignment()?);
            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(&TokenKind::RightBracket)?;
        Ok(Expression::Array(ArrayExpression { elements }))
    }

    fn parse_object_literal(&mut self) -> Result<Expression, Error> {
        self.advance(); // consume '{'
        let mut properties = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            let shorthand = match &self.current.kind {
                TokenKind::Identifier(name) => Some(name.clone()),
                _ => None,
            };
            let key = self.expect_property_name()?;

            let value = if self.check(&TokenKind::Colon) {
                self.advance();
                self.parse_assignment()?
            } else if let Some(name) = shorthand {
                Expression::Identifier(Identifier::new(name))
            } else {
                return Err(Error::SyntaxError(format!(
                    "Expected ':' after property '{}'",
                    key
                )));
            };
            properties.push(Property { key, value });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(&TokenKind::RightBrace)?;
        Ok(Expression::Object(ObjectExpression { properties }))
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn advance(&mut self) {
        self.current = self.scanner.next_token();
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.current.kind == *kind
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), Error> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(Error::SyntaxError(format!(
                "Expected {}, found {}",
                kind.describe(),
                self.current.kind.describe()
            )))
        }
    }

    fn expect_identifier(&mut self) -> Result<Identifier, Error> {
        match &self.current.kind {
            TokenKind::Identifier(name) => {
                let id = Identifier::new(name.clone());
                self.advance();
                Ok(id)
            }
            other => Err(Error::SyntaxError(format!(
                "Expected identifier, found {}",
                other.describe()
            ))),
        }
    }

    /// Property names after `.` and object literal keys: identifiers,
    /// keywords, strings and numbers.
    fn expect_property_name(&mut self) -> Result<String, Error> {
        let name = match &self.current.kind {
            TokenKind::Identifier(name) | TokenKind::String(name) | TokenKind::Reserved(name) => {
                name.clone()
            }
            TokenKind::Number(n) => number_to_string(*n),
            TokenKind::True
            | TokenKind::False
            | TokenKind::Null
            | TokenKind::Var
            | TokenKind::Let
            | TokenKind::Const
            | TokenKind::Function
            | TokenKind::Return
            | TokenKind::If
            | TokenKind::Else
            | TokenKind::While
            | TokenKind::For
            | TokenKind::Typeof => self.scanner.slice(self.current.span).to_string(),
            other => {
                return Err(Error::SyntaxError(format!(
                    "Expected property name, found {}",
                    other.describe()
                )));
            }
        };
        self.advance();
        Ok(name)
    }

    /// Automatic semicolon insertion: a `;` is optional before `}`, at the
    /// end of input and after a line break.
    fn consume_semicolon(&mut self) -> Result<(), Error> {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
            Ok(())
        } else if self.at_statement_end() {
            Ok(())
        } else {
            Err(Error::SyntaxError(format!(
                "Expected ';', found {}",
                self.current.kind.describe()
            )))
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.current.kind,
            TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof
        ) || self.current.newline_before
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }
}

fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::Binary(BinaryExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn update_operator(kind: &TokenKind) -> UpdateOperator {
    if *kind == TokenKind::PlusPlus {
        UpdateOperator::Increment
    } else {
        UpdateOperator::Decrement
    }
}
