// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Abstract Syntax Tree (AST) definitions for the supported JavaScript subset.
//!
//! These structures follow ESTree naming. The set of node kinds is closed:
//! the code generator matches every variant exhaustively, so adding a kind
//! here is a compile error until it has a lowering.

/// A complete program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// The statements in the program
    pub body: Vec<Statement>,
}

/// An identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    /// The name of the identifier
    pub name: String,
}

impl Identifier {
    /// Creates an identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Variable declaration (var, let, const)
    VariableDeclaration(VariableDeclaration),
    /// Function declaration
    FunctionDeclaration(FunctionDeclaration),
    /// Expression statement
    Expression(ExpressionStatement),
    /// Block statement { ... }
    Block(BlockStatement),
    /// If statement
    If(IfStatement),
    /// While statement
    While(WhileStatement),
    /// For statement
    For(ForStatement),
    /// Return statement
    Return(ReturnStatement),
    /// Empty statement (;)
    Empty,
}

/// Variable declaration kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// var declaration
    Var,
    /// let declaration
    Let,
    /// const declaration
    Const,
}

/// A variable declaration statement.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    /// The kind of declaration
    pub kind: VariableKind,
    /// The declarators
    pub declarations: Vec<VariableDeclarator>,
}

/// A single variable declarator.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    /// The identifier being declared
    pub id: Identifier,
    /// Optional initializer expression
    pub init: Option<Expression>,
}

/// A function declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    /// The function name
    pub id: Identifier,
    /// The parameters
    pub params: Vec<Identifier>,
    /// The function body
    pub body: Vec<Statement>,
}

/// An expression statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    /// The expression
    pub expression: Expression,
}

/// A block statement.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    /// The statements in the block
    pub body: Vec<Statement>,
}

/// An if statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    /// The condition
    pub test: Expression,
    /// The then branch
    pub consequent: Box<Statement>,
    /// The optional else branch
    pub alternate: Option<Box<Statement>>,
}

/// A while statement.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    /// The condition
    pub test: Expression,
    /// The loop body
    pub body: Box<Statement>,
}

/// A for statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    /// The initializer
    pub init: Option<ForInit>,
    /// The condition
    pub test: Option<Expression>,
    /// The update expression
    pub update: Option<Expression>,
    /// The loop body
    pub body: Box<Statement>,
}

/// For loop initializer.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    /// Variable declaration
    Declaration(VariableDeclaration),
    /// Expression
    Expression(Expression),
}

/// A return statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    /// The returned value, if any
    pub argument: Option<Expression>,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Identifier reference
    Identifier(Identifier),
    /// Literal value
    Literal(Literal),
    /// Array literal [a, b]
    Array(ArrayExpression),
    /// Object literal { a: 1 }
    Object(ObjectExpression),
    /// Function expression
    Function(FunctionExpression),
    /// Arrow function
    Arrow(ArrowFunctionExpression),
    /// Unary operation
    Unary(UnaryExpression),
    /// Prefix or postfix ++/--
    Update(UpdateExpression),
    /// Binary operation
    Binary(BinaryExpression),
    /// Short-circuit && / ||
    Logical(LogicalExpression),
    /// Assignment
    Assignment(AssignmentExpression),
    /// Function call
    Call(CallExpression),
    /// Property access a.b / a[b]
    Member(MemberExpression),
}

impl Expression {
    /// A short description of the node kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expression::Identifier(_) => "identifier",
            Expression::Literal(_) => "literal",
            Expression::Array(_) => "array expression",
            Expression::Object(_) => "object expression",
            Expression::Function(_) => "function expression",
            Expression::Arrow(_) => "arrow function",
            Expression::Unary(_) => "unary expression",
            Expression::Update(_) => "update expression",
            Expression::Binary(_) => "binary expression",
            Expression::Logical(_) => "logical expression",
            Expression::Assignment(_) => "assignment expression",
            Expression::Call(_) => "call expression",
            Expression::Member(_) => "member expression",
        }
    }
}

/// A literal together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    /// The parsed value
    pub value: LiteralValue,
    /// The literal exactly as written in the source
    pub raw: String,
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Number literal
    Number(f64),
    /// String literal (escapes already processed)
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// null
    Null,
}

/// Array literal.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExpression {
    /// The elements, in order
    pub elements: Vec<Expression>,
}

/// Object literal.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectExpression {
    /// The properties, in source order
    pub properties: Vec<Property>,
}

/// A `key: value` pair in an object literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// The property key as a string
    pub key: String,
    /// The value expression
    pub value: Expression,
}

/// A function expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpression {
    /// Optional function name
    pub id: Option<Identifier>,
    /// The parameters
    pub params: Vec<Identifier>,
    /// The function body
    pub body: Vec<Statement>,
}

/// An arrow function.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFunctionExpression {
    /// The parameters
    pub params: Vec<Identifier>,
    /// The body
    pub body: ArrowBody,
}

/// Arrow function body.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    /// Block body
    Block(Vec<Statement>),
    /// Concise body: the expression is the return value
    Expression(Box<Expression>),
}

/// A unary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    /// The operator
    pub operator: UnaryOperator,
    /// The operand
    pub argument: Box<Expression>,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// -
    Minus,
    /// !
    Not,
    /// typeof
    TypeOf,
}

/// An update expression (++/--).
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpression {
    /// The operator
    pub operator: UpdateOperator,
    /// Whether the operator precedes its operand
    pub prefix: bool,
    /// The updated target
    pub argument: Box<Expression>,
}

/// Update operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    /// ++
    Increment,
    /// --
    Decrement,
}

/// A binary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    /// The operator
    pub operator: BinaryOperator,
    /// Left operand
    pub left: Box<Expression>,
    /// Right operand
    pub right: Box<Expression>,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// +
    Add,
    /// -
    Sub,
    /// *
    Mul,
    /// /
    Div,
    /// %
    Mod,
    /// <
    Lt,
    /// <=
    Le,
    /// >
    Gt,
    /// >=
    Ge,
    /// ==
    Eq,
    /// !=
    Ne,
    /// ===
    StrictEq,
    /// !==
    StrictNe,
}

/// A logical expression.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpression {
    /// The operator
    pub operator: LogicalOperator,
    /// Left operand
    pub left: Box<Expression>,
    /// Right operand, evaluated only when needed
    pub right: Box<Expression>,
}

/// Logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    /// &&
    And,
    /// ||
    Or,
}

/// An assignment expression.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    /// The operator
    pub operator: AssignmentOperator,
    /// The target
    pub left: Box<Expression>,
    /// The assigned value
    pub right: Box<Expression>,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    /// =
    Assign,
    /// +=
    AddAssign,
    /// -=
    SubAssign,
    /// *=
    MulAssign,
    /// /=
    DivAssign,
    /// %=
    ModAssign,
}

/// A call expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    /// The callee
    pub callee: Box<Expression>,
    /// The arguments
    pub arguments: Vec<Expression>,
}

/// A member expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpression {
    /// The object being accessed
    pub object: Box<Expression>,
    /// The property; an `Identifier` when not computed
    pub property: Box<Expression>,
    /// `a[b]` rather than `a.b`
    pub computed: bool,
}
