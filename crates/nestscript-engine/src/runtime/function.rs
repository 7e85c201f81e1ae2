// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Native (Rust) functions exposed to scripts.

use super::value::Value;
use std::fmt;
use std::rc::Rc;

/// Signature of a host function body. An `Err` becomes a script `TypeError`.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, String>;

/// A named host function.
#[derive(Clone)]
pub struct NativeFunction {
    name: Rc<str>,
    func: Rc<NativeFn>,
}

impl NativeFunction {
    /// Wraps a closure as a callable value.
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + 'static,
    {
        Self {
            name: Rc::from(name),
            func: Rc::new(func),
        }
    }

    /// The function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the function.
    pub fn call(&self, args: &[Value]) -> Result<Value, String> {
        (self.func)(args)
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &NativeFunction) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_call() {
        let double = NativeFunction::new("double", |args| {
            Ok(Value::Number(args.first().map(Value::to_number).unwrap_or(0.0) * 2.0))
        });
        assert_eq!(double.name(), "double");
        assert_eq!(double.call(&[Value::Number(4.0)]), Ok(Value::Number(8.0)));
        assert!(double.ptr_eq(&double.clone()));
        assert_eq!(format!("{:?}", double), "NativeFunction(double)");
    }
}
