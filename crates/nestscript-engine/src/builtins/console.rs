// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Console built-in object.
//!
//! Provides `console.log`, `console.error` and `console.warn`.

use crate::runtime::function::NativeFunction;
use crate::runtime::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Where console output goes.
#[derive(Debug, Clone, Default)]
pub enum ConsoleSink {
    /// `log` to stdout, `error`/`warn` to stderr
    #[default]
    Stdio,
    /// Every line is appended to a shared buffer (used by embedders and tests)
    Capture(Rc<RefCell<Vec<String>>>),
}

impl ConsoleSink {
    /// Creates a capturing sink and returns a handle to its buffer.
    pub fn capture() -> (Self, Rc<RefCell<Vec<String>>>) {
        let lines = Rc::new(RefCell::new(Vec::new()));
        (ConsoleSink::Capture(Rc::clone(&lines)), lines)
    }

    fn write(&self, line: String, to_stderr: bool) {
        match self {
            ConsoleSink::Stdio if to_stderr => eprintln!("{}", line),
            ConsoleSink::Stdio => println!("{}", line),
            ConsoleSink::Capture(lines) => lines.borrow_mut().push(line),
        }
    }
}

/// Formats arguments the way `console.log` does: top-level strings raw,
/// everything else inspected, separated by spaces.
pub fn format_args(args: &[Value]) -> String {
    let output: Vec<String> = args.iter().map(Value::inspect).collect();
    output.join(" ")
}

/// Builds the `console` object.
pub fn console_object(sink: ConsoleSink) -> Value {
    let console = Value::new_object();
    if let Value::Object(obj) = &console {
        let mut obj = obj.borrow_mut();
        for (method, to_stderr, prefix) in [
            ("log", false, ""),
            ("error", true, ""),
            ("warn", true, "Warning: "),
        ] {
            let sink = sink.clone();
            let native = NativeFunction::new(&format!("console.{}", method), move |args| {
                sink.write(format!("{}{}", prefix, format_args(args)), to_stderr);
                Ok(Value::Undefined)
            });
            obj.set(method, Value::Native(native));
        }
    }
    console
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_capture() {
        let (sink, lines) = ConsoleSink::capture();
        let console = console_object(sink);

        let log = console.get_property(&Value::from("log")).unwrap();
        let Value::Native(log) = log else {
            panic!("console.log should be native");
        };
        log.call(&[Value::from("hello"), Value::Number(42.0)]).unwrap();

        let Value::Native(warn) = console.get_property(&Value::from("warn")).unwrap() else {
            panic!("console.warn should be native");
        };
        warn.call(&[Value::from("careful")]).unwrap();

        assert_eq!(*lines.borrow(), vec!["hello 42", "Warning: careful"]);
    }

    #[test]
    fn test_format_args_quotes_nested_strings() {
        let arr = Value::new_array(vec![Value::from("a")]);
        assert_eq!(format_args(&[Value::from("x"), arr]), "x [ 'a' ]");
    }
}
