// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Code generation from AST to IR.
//!
//! The `Compiler` walks a program and emits a flat instruction list for the
//! top level. Every function or arrow it meets is given a routine name
//! (declared or synthesized `%fnN`), queued, and compiled later in its own
//! pass with a fresh local namespace and register counter. Nothing is ever
//! inlined, so the output is one main list plus one routine per function.

mod expressions;
mod registers;
mod scope;

#[cfg(test)]
mod tests;

pub use registers::{Register, RegisterAllocator};
pub use scope::{Kind, Namespaces, Scope};

use crate::Error;
use crate::ast::*;
use crate::compiler::ir::{Instruction, Module, OpCode, Operand, Routine};
use std::collections::VecDeque;
use tracing::debug;

/// Body of a function waiting to be compiled.
#[derive(Debug, Clone, Copy)]
enum PendingBody<'a> {
    /// Statement list
    Block(&'a [Statement]),
    /// Concise arrow body, returned as-is
    Expression(&'a Expression),
}

/// A discovered function that has not been compiled yet.
#[derive(Debug)]
struct PendingFunction<'a> {
    /// Routine name
    name: String,
    /// Name a function expression uses to refer to itself
    self_name: Option<&'a str>,
    params: &'a [Identifier],
    body: PendingBody<'a>,
}

/// Compiles an AST into an IR [`Module`].
///
/// One compiler is one compilation run: the global namespace and the
/// synthesized-name counter live as long as the compiler does.
pub struct Compiler<'a> {
    namespaces: Namespaces,
    registers: RegisterAllocator,
    /// Functions discovered but not yet compiled, in discovery order
    worklist: VecDeque<PendingFunction<'a>>,
    /// Next `%fnN` index
    function_index: usize,
    /// Instructions of the pass in progress
    code: Vec<Instruction>,
    /// Inside a function body (as opposed to the top level)
    in_function: bool,
}

impl<'a> Compiler<'a> {
    /// Creates a new compiler.
    pub fn new() -> Self {
        Self::with_function_offset(0)
    }

    /// Creates a compiler whose synthesized names start at `%fn{offset}`,
    /// so several compilations feeding one VM never reuse a name.
    pub fn with_function_offset(offset: usize) -> Self {
        Self {
            namespaces: Namespaces::new(),
            registers: RegisterAllocator::new(),
            worklist: VecDeque::new(),
            function_index: offset,
            code: Vec::new(),
            in_function: false,
        }
    }

    /// The next synthesized function index.
    pub fn function_index(&self) -> usize {
        self.function_index
    }

    // ========================================================================
    // Main Compilation Entry Point
    // ========================================================================

    /// Compiles a program: the top level first, then every queued function
    /// until the worklist is empty.
    pub fn compile(&mut self, program: &'a Program) -> Result<Module, Error> {
        let mut module = Module::new();

        self.in_function = false;
        self.registers.reset();
        self.hoist_functions(&program.body);
        self.compile_statements(&program.body)?;
        module.main = std::mem::take(&mut self.code);
        debug!(
            instructions = module.main.len(),
            registers = self.registers.peak(),
            pending = self.worklist.len(),
            "compiled top level"
        );

        while let Some(pending) = self.worklist.pop_front() {
            let routine = self.compile_routine(pending)?;
            module.routines.push(routine);
        }

        Ok(module)
    }

    /// Compiles one queued function into a routine: slot declarations, the
    /// body with its jump targets shifted past them, and a trailing `RET`.
    fn compile_routine(&mut self, pending: PendingFunction<'a>) -> Result<Routine, Error> {
        debug!(routine = %pending.name, "compiling routine");

        self.in_function = true;
        self.namespaces.reset_locals();
        self.registers.reset();

        if let Some(self_name) = pending.self_name {
            self.namespaces
                .declare(Scope::Local, self_name, Kind::Function(pending.name.clone()));
        }
        for param in pending.params {
            self.namespaces
                .declare(Scope::Local, param.name.as_str(), Kind::Variable);
        }

        match pending.body {
            PendingBody::Block(body) => {
                self.hoist_functions(body);
                self.compile_statements(body)?;
            }
            PendingBody::Expression(expr) => {
                let (value, reg) = self.value_source(expr)?;
                self.emit(OpCode::Ret, vec![value]);
                self.release(reg);
                self.check_balanced()?;
            }
        }

        let body = std::mem::take(&mut self.code);
        let registers = self.registers.peak();

        let mut instructions = Vec::with_capacity(registers + body.len() + 1);
        instructions.extend(
            (0..registers).map(|i| Instruction::new(OpCode::Var, vec![Register(i).operand()])),
        );
        for mut instruction in body {
            if instruction.opcode.is_jump() {
                if let Some(Operand::Label(target)) = instruction.operands.last_mut() {
                    *target += registers;
                }
            }
            instructions.push(instruction);
        }
        instructions.push(Instruction::simple(OpCode::Ret));

        debug!(
            routine = %pending.name,
            instructions = instructions.len(),
            registers,
            "compiled routine"
        );

        self.namespaces.reset_locals();
        Ok(Routine {
            name: pending.name,
            params: pending.params.iter().map(|p| p.name.clone()).collect(),
            registers,
            instructions,
        })
    }

    // ========================================================================
    // Function Discovery
    // ========================================================================

    /// Registers and queues every function declaration reachable in a body
    /// before any of it is compiled.
    fn hoist_functions(&mut self, statements: &'a [Statement]) {
        for stmt in statements {
            self.hoist_from_statement(stmt);
        }
    }

    fn hoist_from_statement(&mut self, stmt: &'a Statement) {
        match stmt {
            Statement::FunctionDeclaration(decl) => {
                self.declare_function(
                    &decl.id.name,
                    None,
                    &decl.params,
                    PendingBody::Block(&decl.body),
                );
            }
            Statement::Block(block) => self.hoist_functions(&block.body),
            Statement::If(if_stmt) => {
                self.hoist_from_statement(&if_stmt.consequent);
                if let Some(alt) = &if_stmt.alternate {
                    self.hoist_from_statement(alt);
                }
            }
            Statement::While(while_stmt) => self.hoist_from_statement(&while_stmt.body),
            Statement::For(for_stmt) => self.hoist_from_statement(&for_stmt.body),
            Statement::VariableDeclaration(_)
            | Statement::Expression(_)
            | Statement::Return(_)
            | Statement::Empty => {}
        }
    }

    /// Binds a named function and queues it. At the top level the routine
    /// takes the declared name; inside a function it gets a synthesized name
    /// and the declared name becomes a local alias.
    fn declare_function(
        &mut self,
        name: &str,
        self_name: Option<&'a str>,
        params: &'a [Identifier],
        body: PendingBody<'a>,
    ) -> String {
        let routine = if self.in_function {
            let routine = self.synthesize_name();
            self.namespaces
                .declare(Scope::Local, name, Kind::Function(routine.clone()));
            routine
        } else {
            self.namespaces
                .declare(Scope::Global, name, Kind::Function(name.to_string()));
            name.to_string()
        };
        self.enqueue(routine.clone(), self_name, params, body);
        routine
    }

    /// Queues an anonymous function under a synthesized name.
    fn declare_anonymous(
        &mut self,
        self_name: Option<&'a str>,
        params: &'a [Identifier],
        body: PendingBody<'a>,
    ) -> String {
        let routine = self.synthesize_name();
        self.enqueue(routine.clone(), self_name, params, body);
        routine
    }

    fn enqueue(
        &mut self,
        name: String,
        self_name: Option<&'a str>,
        params: &'a [Identifier],
        body: PendingBody<'a>,
    ) {
        self.worklist.push_back(PendingFunction {
            name,
            self_name,
            params,
            body,
        });
    }

    fn synthesize_name(&mut self) -> String {
        let name = format!("%fn{}", self.function_index);
        self.function_index += 1;
        name
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn compile_statements(&mut self, statements: &'a [Statement]) -> Result<(), Error> {
        for stmt in statements {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    fn compile_statement(&mut self, stmt: &'a Statement) -> Result<(), Error> {
        match stmt {
            Statement::VariableDeclaration(decl) => self.compile_variable_declaration(decl)?,
            // Hoisted
            Statement::FunctionDeclaration(_) => {}
            Statement::Expression(expr_stmt) => {
                self.compile_expression_statement(&expr_stmt.expression)?
            }
            Statement::Block(block) => self.compile_statements(&block.body)?,
            Statement::If(if_stmt) => self.compile_if_statement(if_stmt)?,
            Statement::While(while_stmt) => self.compile_while_statement(while_stmt)?,
            Statement::For(for_stmt) => self.compile_for_statement(for_stmt)?,
            Statement::Return(ret) => self.compile_return_statement(ret)?,
            Statement::Empty => {}
        }
        self.check_balanced()
    }

    fn compile_variable_declaration(&mut self, decl: &'a VariableDeclaration) -> Result<(), Error> {
        for declarator in &decl.declarations {
            self.compile_declarator(declarator)?;
        }
        Ok(())
    }

    fn compile_declarator(&mut self, declarator: &'a VariableDeclarator) -> Result<(), Error> {
        let name = declarator.id.name.as_str();

        match &declarator.init {
            Some(Expression::Function(func)) => {
                let self_name = func.id.as_ref().map(|id| id.name.as_str());
                self.declare_function(name, self_name, &func.params, PendingBody::Block(&func.body));
            }
            Some(Expression::Arrow(arrow)) => {
                self.declare_function(name, None, &arrow.params, arrow_body(arrow));
            }
            init => {
                let (opcode, scope) = if self.in_function {
                    (OpCode::Var, Scope::Local)
                } else {
                    (OpCode::Global, Scope::Global)
                };
                self.emit(opcode, vec![Operand::name(name)]);
                self.namespaces.declare(scope, name, Kind::Variable);

                if let Some(init) = init {
                    self.compile_initializer(name, init)?;
                }
            }
        }
        Ok(())
    }

    /// Logical, object, array and update initializers write their destination
    /// before they finish reading, so they are built in a scratch register.
    fn compile_initializer(&mut self, name: &str, init: &'a Expression) -> Result<(), Error> {
        let target = Operand::name(name);
        if !matches!(
            init,
            Expression::Logical(_)
                | Expression::Object(_)
                | Expression::Array(_)
                | Expression::Update(_)
        ) {
            return self.compile_expression(init, Some(&target));
        }

        let reg = self.registers.allocate();
        let result = self.compile_expression(init, Some(&reg.operand()));
        if result.is_ok() {
            self.emit(OpCode::Mov, vec![target, reg.operand()]);
        }
        self.registers.free(reg);
        result
    }

    /// Calls, assignments and updates produce no result move; anything else
    /// is evaluated into a scratch register.
    fn compile_expression_statement(&mut self, expr: &'a Expression) -> Result<(), Error> {
        match expr {
            Expression::Call(_) | Expression::Assignment(_) | Expression::Update(_) => {
                self.compile_expression(expr, None)
            }
            _ => {
                let scratch = self.registers.allocate();
                let result = self.compile_expression(expr, Some(&scratch.operand()));
                self.registers.free(scratch);
                result
            }
        }
    }

    fn compile_if_statement(&mut self, if_stmt: &'a IfStatement) -> Result<(), Error> {
        let jump_to_else = self.compile_condition(&if_stmt.test, OpCode::JumpIfFalse)?;

        self.compile_statement(&if_stmt.consequent)?;

        if let Some(alternate) = &if_stmt.alternate {
            let jump_to_end = self.emit_jump(OpCode::Jump, None);
            self.patch_jump(jump_to_else);
            self.compile_statement(alternate)?;
            self.patch_jump(jump_to_end);
        } else {
            self.patch_jump(jump_to_else);
        }
        Ok(())
    }

    fn compile_while_statement(&mut self, while_stmt: &'a WhileStatement) -> Result<(), Error> {
        let loop_start = self.code.len();
        let jump_to_end = self.compile_condition(&while_stmt.test, OpCode::JumpIfFalse)?;

        self.compile_statement(&while_stmt.body)?;

        self.emit(OpCode::Jump, vec![Operand::Label(loop_start)]);
        self.patch_jump(jump_to_end);
        Ok(())
    }

    fn compile_for_statement(&mut self, for_stmt: &'a ForStatement) -> Result<(), Error> {
        match &for_stmt.init {
            Some(ForInit::Declaration(decl)) => self.compile_variable_declaration(decl)?,
            Some(ForInit::Expression(expr)) => self.compile_expression_statement(expr)?,
            None => {}
        }
        self.check_balanced()?;

        let loop_start = self.code.len();
        let jump_to_end = match &for_stmt.test {
            Some(test) => Some(self.compile_condition(test, OpCode::JumpIfFalse)?),
            None => None,
        };

        self.compile_statement(&for_stmt.body)?;

        if let Some(update) = &for_stmt.update {
            self.compile_expression_statement(update)?;
            self.check_balanced()?;
        }

        self.emit(OpCode::Jump, vec![Operand::Label(loop_start)]);
        if let Some(jump) = jump_to_end {
            self.patch_jump(jump);
        }
        Ok(())
    }

    fn compile_return_statement(&mut self, ret: &'a ReturnStatement) -> Result<(), Error> {
        match &ret.argument {
            Some(argument) => {
                let (value, reg) = self.value_source(argument)?;
                self.emit(OpCode::Ret, vec![value]);
                self.release(reg);
            }
            None => {
                self.emit(OpCode::Ret, Vec::new());
            }
        }
        Ok(())
    }

    /// Evaluates a test and emits a conditional jump with a placeholder
    /// target. Returns the jump's index for patching.
    fn compile_condition(&mut self, test: &'a Expression, opcode: OpCode) -> Result<usize, Error> {
        let (cond, reg) = self.value_source(test)?;
        let jump = self.emit_jump(opcode, Some(cond));
        self.release(reg);
        Ok(jump)
    }

    // ========================================================================
    // Emission helpers
    // ========================================================================

    fn emit(&mut self, opcode: OpCode, operands: Vec<Operand>) -> usize {
        let index = self.code.len();
        self.code.push(Instruction::new(opcode, operands));
        index
    }

    /// Emits a jump whose target is filled in by `patch_jump`.
    fn emit_jump(&mut self, opcode: OpCode, cond: Option<Operand>) -> usize {
        let mut operands: Vec<Operand> = cond.into_iter().collect();
        operands.push(Operand::Label(0));
        self.emit(opcode, operands)
    }

    /// Points a previously emitted jump at the next instruction.
    fn patch_jump(&mut self, index: usize) {
        let target = self.code.len();
        if let Some(Operand::Label(label)) = self.code[index].operands.last_mut() {
            *label = target;
        }
    }

    fn release(&mut self, reg: Option<Register>) {
        if let Some(reg) = reg {
            self.registers.free(reg);
        }
    }

    fn check_balanced(&self) -> Result<(), Error> {
        match self.registers.live() {
            0 => Ok(()),
            live => Err(Error::InternalError(format!(
                "{} register(s) still live after statement",
                live
            ))),
        }
    }
}

impl Default for Compiler<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn arrow_body(arrow: &ArrowFunctionExpression) -> PendingBody<'_> {
    match &arrow.body {
        ArrowBody::Block(body) => PendingBody::Block(body),
        ArrowBody::Expression(expr) => PendingBody::Expression(expr),
    }
}
