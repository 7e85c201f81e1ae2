// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Parser for the supported JavaScript subset.
//!
//! Transforms a stream of tokens into an Abstract Syntax Tree (AST).
//!
//! ## Usage
//!
//! ```rust
//! use nestscript_engine::parser::Parser;
//!
//! let mut parser = Parser::new("let x = 1 + 2;");
//! let program = parser.parse_program().expect("Should parse");
//! assert_eq!(program.body.len(), 1);
//! ```

#[allow(clippy::module_inception)]
mod parser;

pub use parser::Parser;
