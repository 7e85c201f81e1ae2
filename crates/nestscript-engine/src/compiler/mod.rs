// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! IR compiler for JavaScript.
//!
//! Transforms AST into register-addressed IR that can be printed, read back
//! and executed by the VM.
//!
//! # Module Structure
//!
//! - `ir`: Instruction set, routines, modules and their text form
//! - `assembler`: IR text back into a `Module`
//! - `codegen`: Code generation from AST
//!   - `codegen::registers`: LIFO register allocation
//!   - `codegen::scope`: Global and local namespaces

pub mod assembler;
pub mod codegen;
pub mod ir;

pub use assembler::parse_module;
pub use codegen::Compiler;
pub use ir::{Constant, Instruction, Module, OpCode, Operand, OperandKind, Routine};
