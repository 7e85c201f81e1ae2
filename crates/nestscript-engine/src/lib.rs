// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # nestscript-engine
//!
//! Compiles a subset of JavaScript into a flat, register-addressed IR and
//! runs that IR on a small virtual machine.
//!
//! ## Overview
//!
//! - Lexer and parser producing an ESTree-shaped AST
//! - Code generator with a LIFO register allocator, global/local namespaces
//!   and a function worklist that flattens nested functions into routines
//! - A textual IR format plus an assembler that reads it back
//! - A fetch/decode/execute VM backed by symbol tables and a host context
//!
//! ## Quick Start
//!
//! ```rust
//! use nestscript_engine::{Engine, Value};
//!
//! let mut engine = Engine::new();
//! let symbols = engine.run("a = 1").unwrap();
//! assert_eq!(symbols.get("a"), Some(&Value::Number(1.0)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod vm;

pub use compiler::{Compiler, Module};
pub use runtime::host::HostContext;
pub use runtime::value::Value;
pub use vm::{SymbolTable, Vm, VmConfig};

use thiserror::Error;

/// The main engine instance.
///
/// Owns a VM whose globals survive between calls, so a REPL session can
/// build on earlier input.
pub struct Engine {
    vm: Vm,
    /// Next synthesized function index, carried across compilations so
    /// routine names stay unique for the lifetime of the VM.
    function_offset: usize,
}

impl Engine {
    /// Creates an engine with the default builtins and limits.
    pub fn new() -> Self {
        Self::with_host(HostContext::with_builtins(), VmConfig::default())
    }

    /// Creates an engine over a caller-supplied host context.
    pub fn with_host(host: HostContext, config: VmConfig) -> Self {
        Self {
            vm: Vm::with_config(host, config),
            function_offset: 0,
        }
    }

    /// Parses and compiles source code into an IR module.
    pub fn compile(&mut self, source: &str) -> Result<Module, Error> {
        let program = parser::Parser::new(source).parse_program()?;
        let mut compiler = Compiler::with_function_offset(self.function_offset);
        let module = compiler.compile(&program)?;
        self.function_offset = compiler.function_index();
        Ok(module)
    }

    /// Compiles and executes source code, returning the global symbol table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let mut engine = nestscript_engine::Engine::new();
    /// let symbols = engine.run("var x = 40; x = x + 2").unwrap();
    /// assert_eq!(symbols["x"].to_string(), "42");
    /// ```
    pub fn run(&mut self, source: &str) -> Result<SymbolTable, Error> {
        let module = self.compile(source)?;
        self.execute(&module)
    }

    /// Executes an already compiled (or assembled) module.
    pub fn execute(&mut self, module: &Module) -> Result<SymbolTable, Error> {
        self.vm.run(module)?;
        Ok(self.vm.symbols())
    }

    /// Compiles and executes a source file.
    pub fn eval_file(&mut self, path: &std::path::Path) -> Result<SymbolTable, Error> {
        let source = std::fs::read_to_string(path).map_err(|e| Error::Io(e.to_string()))?;
        self.run(&source)
    }

    /// Returns the underlying VM.
    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    /// Returns the underlying VM mutably, e.g. to call a routine from Rust.
    pub fn vm_mut(&mut self) -> &mut Vm {
        &mut self.vm
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors produced anywhere in the compile/execute pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Syntax error during scanning or parsing
    #[error("SyntaxError: {0}")]
    SyntaxError(String),
    /// Assignment to something that is neither a name nor a property
    #[error("CompileError: unsupported assignment target: {0}")]
    UnsupportedAssignmentTarget(String),
    /// A construct the code generator has no lowering for
    #[error("CompileError: unsupported {0}")]
    Unsupported(String),
    /// Malformed IR text
    #[error("AssemblyError: line {line}: {message}")]
    Assembly {
        /// 1-based line number in the IR text
        line: usize,
        /// What was wrong with it
        message: String,
    },
    /// Mnemonic that is not part of the instruction set
    #[error("InvalidOpcode: unknown opcode '{0}'")]
    UnknownOpcode(String),
    /// Reference to an undefined name
    #[error("ReferenceError: {0}")]
    ReferenceError(String),
    /// Type error during execution
    #[error("TypeError: {0}")]
    TypeError(String),
    /// Step or call-depth limit exceeded
    #[error("RangeError: {0}")]
    RangeError(String),
    /// Broken internal invariant
    #[error("InternalError: {0}")]
    InternalError(String),
    /// I/O error
    #[error("IOError: {0}")]
    Io(String),
}
