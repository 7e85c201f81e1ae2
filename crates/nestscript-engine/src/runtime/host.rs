// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The host context: the outer binding environment that free identifiers
//! resolve against at run time (`MOV_CTX`).

use super::function::NativeFunction;
use super::value::Value;
use crate::builtins::{self, ConsoleSink};
use rustc_hash::FxHashMap;

/// Name to value bindings supplied by the embedder.
#[derive(Debug, Clone, Default)]
pub struct HostContext {
    bindings: FxHashMap<String, Value>,
}

impl HostContext {
    /// Creates an empty host context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a host context with the default builtins, printing to the
    /// process's stdout/stderr.
    pub fn with_builtins() -> Self {
        Self::with_console(ConsoleSink::Stdio)
    }

    /// Creates a host context with the default builtins and the given
    /// console destination.
    pub fn with_console(sink: ConsoleSink) -> Self {
        let mut host = Self::new();
        builtins::install(&mut host, sink);
        host
    }

    /// Binds `name` to `value`, replacing any previous binding.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Binds `name` to a native function.
    pub fn define_native<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&[Value]) -> Result<Value, String> + 'static,
    {
        self.define(name, Value::Native(NativeFunction::new(name, func)));
    }

    /// Looks up a binding.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Checks whether `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }
}
