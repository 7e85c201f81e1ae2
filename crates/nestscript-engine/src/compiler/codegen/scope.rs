// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compile-time namespaces for name resolution.

use rustc_hash::FxHashMap;

/// Which namespace a declaration goes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Lives for the whole compilation run
    Global,
    /// Lives for the current function pass
    Local,
}

/// What a name is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    /// A function; carries the routine name the binding refers to
    Function(String),
    /// A variable or parameter
    Variable,
}

/// The global and local name maps.
#[derive(Debug, Default)]
pub struct Namespaces {
    globals: FxHashMap<String, Kind>,
    locals: FxHashMap<String, Kind>,
}

impl Namespaces {
    /// Creates empty namespaces.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` in the given namespace, replacing an earlier binding.
    pub fn declare(&mut self, scope: Scope, name: impl Into<String>, kind: Kind) {
        let map = match scope {
            Scope::Global => &mut self.globals,
            Scope::Local => &mut self.locals,
        };
        map.insert(name.into(), kind);
    }

    /// Resolves a name; locals shadow globals.
    pub fn resolve(&self, name: &str) -> Option<&Kind> {
        self.locals.get(name).or_else(|| self.globals.get(name))
    }

    /// The name to emit for a reference: function aliases resolve to their
    /// routine, everything else to itself. `None` for undeclared names.
    pub fn reference(&self, name: &str) -> Option<String> {
        self.resolve(name).map(|kind| match kind {
            Kind::Function(routine) => routine.clone(),
            Kind::Variable => name.to_string(),
        })
    }

    /// Discards the local namespace at the end of a function pass.
    pub fn reset_locals(&mut self) {
        self.locals.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locals_shadow_globals() {
        let mut ns = Namespaces::new();
        ns.declare(Scope::Global, "x", Kind::Function("x".into()));
        ns.declare(Scope::Local, "x", Kind::Variable);
        ns.declare(Scope::Local, "y", Kind::Variable);
        assert_eq!(ns.resolve("x"), Some(&Kind::Variable));

        ns.reset_locals();
        assert_eq!(ns.resolve("x"), Some(&Kind::Function("x".into())));
        assert_eq!(ns.resolve("y"), None);
    }

    #[test]
    fn test_reference_resolves_aliases() {
        let mut ns = Namespaces::new();
        ns.declare(Scope::Local, "inner", Kind::Function("%fn3".into()));
        ns.declare(Scope::Global, "count", Kind::Variable);
        assert_eq!(ns.reference("inner").as_deref(), Some("%fn3"));
        assert_eq!(ns.reference("count").as_deref(), Some("count"));
        assert_eq!(ns.reference("missing"), None);
    }
}
