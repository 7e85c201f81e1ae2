// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The IR virtual machine.
//!
//! Executes a [`Module`](crate::compiler::Module) one instruction at a time
//! against a global symbol table, a stack of call frames and the host
//! context.
//!
//! ## Structure
//!
//! - `interpreter` - Frames, name resolution and the dispatch loop

mod interpreter;

pub use interpreter::{SymbolTable, Vm, VmConfig};
