// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Expression compilation.
//!
//! Every expression is compiled against an optional destination operand (a
//! register or a binding name). Intermediate values live in registers taken
//! from the allocator and released in reverse order before returning.
//!
//! ## Member windows
//!
//! Property access works on three registers: value, object and key. For
//! `a.b.c` the outer window's object register becomes the inner access's
//! value register, so the chain reads deepest first:
//!
//! ```text
//! MOV_CTX %r3 "a"
//! MOV %r4 "b"
//! MOV_PROP %r1 %r3 %r4
//! MOV %r2 "c"
//! MOV_PROP %r0 %r1 %r2
//! ```

use super::{Compiler, PendingBody, Register, arrow_body};
use crate::Error;
use crate::ast::*;
use crate::compiler::ir::{Constant, OpCode, Operand, RESULT_SLOT};

/// Value, object and key registers for one property access.
#[derive(Debug, Clone, Copy)]
struct Window {
    value: Register,
    object: Register,
    key: Register,
}

impl<'a> Compiler<'a> {
    /// Compiles an expression, storing its value in `dst` when given.
    pub(super) fn compile_expression(
        &mut self,
        expr: &'a Expression,
        dst: Option<&Operand>,
    ) -> Result<(), Error> {
        match expr {
            Expression::Call(call) => self.compile_call(call, dst),
            Expression::Assignment(assign) => self.compile_assignment(assign, dst),
            Expression::Update(update) => self.compile_update(update, dst),
            Expression::Function(func) => {
                let self_name = func.id.as_ref().map(|id| id.name.as_str());
                let routine =
                    self.declare_anonymous(self_name, &func.params, PendingBody::Block(&func.body));
                self.move_function(routine, dst);
                Ok(())
            }
            Expression::Arrow(arrow) => {
                let routine = self.declare_anonymous(None, &arrow.params, arrow_body(arrow));
                self.move_function(routine, dst);
                Ok(())
            }
            _ => match dst {
                Some(dst) => self.compile_value(expr, dst),
                None => {
                    let scratch = self.registers.allocate();
                    let result = self.compile_value(expr, &scratch.operand());
                    self.registers.free(scratch);
                    result
                }
            },
        }
    }

    /// Compiles an expression that always produces a value into `dst`.
    fn compile_value(&mut self, expr: &'a Expression, dst: &Operand) -> Result<(), Error> {
        match expr {
            Expression::Identifier(id) => {
                self.resolve_identifier(&id.name, dst);
                Ok(())
            }
            Expression::Literal(lit) => {
                self.emit(OpCode::Mov, vec![dst.clone(), Operand::Const(constant(lit))]);
                Ok(())
            }
            Expression::Member(member) => {
                let object = self.registers.allocate();
                let key = self.registers.allocate();
                let result = self.compile_member(member, dst, object, key, true);
                self.registers.free(key);
                self.registers.free(object);
                result
            }
            Expression::Binary(binary) => self.compile_binary(binary, dst),
            Expression::Logical(logical) => self.compile_logical(logical, dst),
            Expression::Unary(unary) => self.compile_unary(unary, dst),
            Expression::Object(object) => self.compile_object(object, dst),
            Expression::Array(array) => self.compile_array(array, dst),
            Expression::Call(_)
            | Expression::Assignment(_)
            | Expression::Update(_)
            | Expression::Function(_)
            | Expression::Arrow(_) => self.compile_expression(expr, Some(dst)),
        }
    }

    /// Resolves an expression to something an instruction can read: a bare
    /// identifier or literal is used directly, anything else is compiled
    /// into a fresh register that the caller must release.
    pub(super) fn value_source(
        &mut self,
        expr: &'a Expression,
    ) -> Result<(Operand, Option<Register>), Error> {
        match expr {
            Expression::Identifier(id) => Ok((self.name_source(&id.name), None)),
            Expression::Literal(lit) => Ok((Operand::Const(constant(lit)), None)),
            _ => {
                let reg = self.registers.allocate();
                if let Err(e) = self.compile_expression(expr, Some(&reg.operand())) {
                    self.registers.free(reg);
                    return Err(e);
                }
                Ok((reg.operand(), Some(reg)))
            }
        }
    }

    /// `MOV dst name` for declared names, `MOV_CTX dst "name"` for free ones.
    fn resolve_identifier(&mut self, name: &str, dst: &Operand) {
        match self.namespaces.reference(name) {
            Some(reference) => {
                self.emit(OpCode::Mov, vec![dst.clone(), Operand::Name(reference)]);
            }
            None => {
                self.emit(OpCode::MovCtx, vec![dst.clone(), Operand::string(name)]);
            }
        }
    }

    /// The name an instruction should use to read `name`.
    fn name_ref(&self, name: &str) -> String {
        self.namespaces
            .reference(name)
            .unwrap_or_else(|| name.to_string())
    }

    /// A value operand reading `name`. An undeclared `undefined` is the
    /// constant, which is also how the assembler reads it back.
    fn name_source(&self, name: &str) -> Operand {
        match self.namespaces.reference(name) {
            Some(reference) => Operand::Name(reference),
            None if name == "undefined" => Operand::Const(Constant::Undefined),
            None => Operand::Name(name.to_string()),
        }
    }

    fn move_function(&mut self, routine: String, dst: Option<&Operand>) {
        if let Some(dst) = dst {
            self.emit(OpCode::Mov, vec![dst.clone(), Operand::Name(routine)]);
        }
    }

    fn allocate_window(&mut self) -> Window {
        Window {
            value: self.registers.allocate(),
            object: self.registers.allocate(),
            key: self.registers.allocate(),
        }
    }

    fn free_window(&mut self, window: Window) {
        self.registers.free(window.key);
        self.registers.free(window.object);
        self.registers.free(window.value);
    }

    // ========================================================================
    // Member expressions
    // ========================================================================

    /// Fills `object` and `key` for `member`, then reads the property into
    /// `value` unless the access is an assignment target.
    fn compile_member(
        &mut self,
        member: &'a MemberExpression,
        value: &Operand,
        object: Register,
        key: Register,
        read: bool,
    ) -> Result<(), Error> {
        let object_op = object.operand();
        let key_op = key.operand();

        match member.object.as_ref() {
            Expression::Member(inner) => {
                let inner_object = self.registers.allocate();
                let inner_key = self.registers.allocate();
                let result = self.compile_member(inner, &object_op, inner_object, inner_key, true);
                self.registers.free(inner_key);
                self.registers.free(inner_object);
                result?;
            }
            Expression::Identifier(id) => self.resolve_identifier(&id.name, &object_op),
            other => self.compile_expression(other, Some(&object_op))?,
        }

        match member.property.as_ref() {
            Expression::Identifier(id) if !member.computed => {
                self.emit(OpCode::Mov, vec![key_op.clone(), Operand::string(id.name.as_str())]);
            }
            Expression::Identifier(id) => {
                let source = self.name_source(&id.name);
                self.emit(OpCode::Mov, vec![key_op.clone(), source]);
            }
            Expression::Member(inner) => {
                let inner_object = self.registers.allocate();
                let inner_key = self.registers.allocate();
                let result = self.compile_member(inner, &key_op, inner_object, inner_key, true);
                self.registers.free(inner_key);
                self.registers.free(inner_object);
                result?;
            }
            other => self.compile_expression(other, Some(&key_op))?,
        }

        if read {
            self.emit(OpCode::MovProp, vec![value.clone(), object_op, key_op]);
        }
        Ok(())
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn compile_call(&mut self, call: &'a CallExpression, dst: Option<&Operand>) -> Result<(), Error> {
        for argument in &call.arguments {
            let reg = self.registers.allocate();
            let result = self.compile_expression(argument, Some(&reg.operand()));
            if result.is_ok() {
                self.emit(OpCode::Push, vec![reg.operand()]);
            }
            self.registers.free(reg);
            result?;
        }
        let argc = Operand::Count(call.arguments.len());

        match call.callee.as_ref() {
            Expression::Member(member) => {
                let window = self.allocate_window();
                let result =
                    self.compile_member(member, &window.value.operand(), window.object, window.key, true);
                if result.is_ok() {
                    self.emit(
                        OpCode::CallVar,
                        vec![window.object.operand(), window.key.operand(), argc],
                    );
                }
                self.free_window(window);
                result?;
            }
            Expression::Identifier(id) => {
                let callee = self.name_ref(&id.name);
                self.emit(OpCode::Call, vec![Operand::Name(callee), argc]);
            }
            other => {
                let reg = self.registers.allocate();
                let result = self.compile_expression(other, Some(&reg.operand()));
                if result.is_ok() {
                    self.emit(OpCode::Call, vec![reg.operand(), argc]);
                }
                self.registers.free(reg);
                result?;
            }
        }

        if let Some(dst) = dst {
            self.emit(OpCode::Mov, vec![dst.clone(), Operand::name(RESULT_SLOT)]);
        }
        Ok(())
    }

    // ========================================================================
    // Assignment and update
    // ========================================================================

    fn compile_assignment(
        &mut self,
        assign: &'a AssignmentExpression,
        dst: Option<&Operand>,
    ) -> Result<(), Error> {
        if !matches!(
            assign.left.as_ref(),
            Expression::Identifier(_) | Expression::Member(_)
        ) {
            return Err(Error::UnsupportedAssignmentTarget(
                assign.left.kind_name().to_string(),
            ));
        }

        let compound = compound_opcode(assign.operator);
        let (source, source_reg) = self.value_source(&assign.right)?;

        let result = match assign.left.as_ref() {
            Expression::Member(member) => {
                let window = self.allocate_window();
                let value = window.value.operand();
                let result = self
                    .compile_member(member, &value, window.object, window.key, compound.is_some())
                    .map(|()| {
                        let stored = match compound {
                            Some(opcode) => {
                                self.emit(opcode, vec![value.clone(), value.clone(), source.clone()]);
                                value.clone()
                            }
                            None => source.clone(),
                        };
                        self.emit(
                            OpCode::SetKey,
                            vec![window.object.operand(), window.key.operand(), stored.clone()],
                        );
                        if let Some(dst) = dst {
                            self.emit(OpCode::Mov, vec![dst.clone(), stored]);
                        }
                    });
                self.free_window(window);
                result
            }
            Expression::Identifier(id) => {
                let target = Operand::name(id.name.as_str());
                let stored = match compound {
                    Some(opcode) => {
                        let current = self.name_source(&id.name);
                        self.emit(opcode, vec![target.clone(), current, source.clone()]);
                        target
                    }
                    None => {
                        self.emit(OpCode::Mov, vec![target, source.clone()]);
                        source.clone()
                    }
                };
                if let Some(dst) = dst {
                    self.emit(OpCode::Mov, vec![dst.clone(), stored]);
                }
                Ok(())
            }
            _ => Ok(()),
        };

        self.release(source_reg);
        result
    }

    fn compile_update(
        &mut self,
        update: &'a UpdateExpression,
        dst: Option<&Operand>,
    ) -> Result<(), Error> {
        let opcode = match update.operator {
            UpdateOperator::Increment => OpCode::Add,
            UpdateOperator::Decrement => OpCode::Sub,
        };
        let one = Operand::number(1.0);

        match update.argument.as_ref() {
            Expression::Identifier(id) => {
                let target = Operand::name(id.name.as_str());
                if let (Some(dst), false) = (dst, update.prefix) {
                    self.emit(OpCode::Mov, vec![dst.clone(), target.clone()]);
                }
                self.emit(opcode, vec![target.clone(), target.clone(), one]);
                if let (Some(dst), true) = (dst, update.prefix) {
                    self.emit(OpCode::Mov, vec![dst.clone(), target]);
                }
                Ok(())
            }
            Expression::Member(member) => {
                let window = self.allocate_window();
                let value = window.value.operand();
                let result = self
                    .compile_member(member, &value, window.object, window.key, true)
                    .map(|()| {
                        if let (Some(dst), false) = (dst, update.prefix) {
                            self.emit(OpCode::Mov, vec![dst.clone(), value.clone()]);
                        }
                        self.emit(opcode, vec![value.clone(), value.clone(), one]);
                        self.emit(
                            OpCode::SetKey,
                            vec![window.object.operand(), window.key.operand(), value.clone()],
                        );
                        if let (Some(dst), true) = (dst, update.prefix) {
                            self.emit(OpCode::Mov, vec![dst.clone(), value]);
                        }
                    });
                self.free_window(window);
                result
            }
            other => Err(Error::Unsupported(format!(
                "update of {}",
                other.kind_name()
            ))),
        }
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn compile_binary(&mut self, binary: &'a BinaryExpression, dst: &Operand) -> Result<(), Error> {
        let (left, left_reg) = self.value_source(&binary.left)?;
        let right = self.value_source(&binary.right);
        let (right, right_reg) = match right {
            Ok(source) => source,
            Err(e) => {
                self.release(left_reg);
                return Err(e);
            }
        };

        self.emit(binary_opcode(binary.operator), vec![dst.clone(), left, right]);

        self.release(right_reg);
        self.release(left_reg);
        Ok(())
    }

    /// Left side into `dst`, then skip the right side when it cannot change
    /// the result.
    fn compile_logical(&mut self, logical: &'a LogicalExpression, dst: &Operand) -> Result<(), Error> {
        self.compile_expression(&logical.left, Some(dst))?;
        let opcode = match logical.operator {
            LogicalOperator::And => OpCode::JumpIfFalse,
            LogicalOperator::Or => OpCode::JumpIfTrue,
        };
        let skip_right = self.emit_jump(opcode, Some(dst.clone()));
        self.compile_expression(&logical.right, Some(dst))?;
        self.patch_jump(skip_right);
        Ok(())
    }

    fn compile_unary(&mut self, unary: &'a UnaryExpression, dst: &Operand) -> Result<(), Error> {
        let opcode = match unary.operator {
            UnaryOperator::Minus => OpCode::Neg,
            UnaryOperator::Not => OpCode::Not,
            UnaryOperator::TypeOf => OpCode::TypeOf,
        };
        let (source, reg) = self.value_source(&unary.argument)?;
        self.emit(opcode, vec![dst.clone(), source]);
        self.release(reg);
        Ok(())
    }

    // ========================================================================
    // Literals
    // ========================================================================

    fn compile_object(&mut self, object: &'a ObjectExpression, dst: &Operand) -> Result<(), Error> {
        self.emit(OpCode::NewObject, vec![dst.clone()]);
        for property in &object.properties {
            let (value, reg) = self.value_source(&property.value)?;
            self.emit(
                OpCode::SetKey,
                vec![dst.clone(), Operand::string(property.key.as_str()), value],
            );
            self.release(reg);
        }
        Ok(())
    }

    fn compile_array(&mut self, array: &'a ArrayExpression, dst: &Operand) -> Result<(), Error> {
        self.emit(OpCode::NewArray, vec![dst.clone()]);
        for (index, element) in array.elements.iter().enumerate() {
            let (value, reg) = self.value_source(element)?;
            self.emit(
                OpCode::SetKey,
                vec![dst.clone(), Operand::number(index as f64), value],
            );
            self.release(reg);
        }
        Ok(())
    }
}

/// The IR constant for a literal, keeping numbers as written.
fn constant(lit: &Literal) -> Constant {
    match &lit.value {
        LiteralValue::Number(value) => Constant::Number {
            value: *value,
            raw: lit.raw.clone(),
        },
        LiteralValue::String(s) => Constant::String(s.clone()),
        LiteralValue::Boolean(b) => Constant::Boolean(*b),
        LiteralValue::Null => Constant::Null,
    }
}

fn binary_opcode(operator: BinaryOperator) -> OpCode {
    match operator {
        BinaryOperator::Add => OpCode::Add,
        BinaryOperator::Sub => OpCode::Sub,
        BinaryOperator::Mul => OpCode::Mul,
        BinaryOperator::Div => OpCode::Div,
        BinaryOperator::Mod => OpCode::Mod,
        BinaryOperator::Lt => OpCode::Lt,
        BinaryOperator::Le => OpCode::Le,
        BinaryOperator::Gt => OpCode::Gt,
        BinaryOperator::Ge => OpCode::Ge,
        BinaryOperator::Eq => OpCode::Eq,
        BinaryOperator::Ne => OpCode::Ne,
        BinaryOperator::StrictEq => OpCode::StrictEq,
        BinaryOperator::StrictNe => OpCode::StrictNe,
    }
}

fn compound_opcode(operator: AssignmentOperator) -> Option<OpCode> {
    match operator {
        AssignmentOperator::Assign => None,
        AssignmentOperator::AddAssign => Some(OpCode::Add),
        AssignmentOperator::SubAssign => Some(OpCode::Sub),
        AssignmentOperator::MulAssign => Some(OpCode::Mul),
        AssignmentOperator::DivAssign => Some(OpCode::Div),
        AssignmentOperator::ModAssign => Some(OpCode::Mod),
    }
}
