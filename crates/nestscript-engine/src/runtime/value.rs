// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! JavaScript value representation.

use super::function::NativeFunction;
use super::object::Object;
use crate::Error;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// A JavaScript value.
///
/// Objects and arrays are shared by reference; everything else is copied.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// undefined
    #[default]
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(String),
    /// Object reference
    Object(Rc<RefCell<Object>>),
    /// Array reference
    Array(Rc<RefCell<Vec<Value>>>),
    /// A compiled routine, referenced by name
    Function(Rc<str>),
    /// A host function
    Native(NativeFunction),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            // NaN is never equal to itself
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl Value {
    /// Creates a new, empty object value.
    pub fn new_object() -> Self {
        Value::Object(Rc::new(RefCell::new(Object::new())))
    }

    /// Creates an array value from its elements.
    pub fn new_array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    /// Returns true if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns true if this value is nullish (null or undefined).
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Returns true if this value can be called.
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Native(_))
    }

    /// Converts the value to a boolean (ToBoolean).
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_nan() && *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Object(_) | Value::Array(_) | Value::Function(_) | Value::Native(_) => true,
        }
    }

    /// Converts the value to a number (ToNumber).
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Array(_) => string_to_number(&self.to_js_string()),
            Value::Object(_) | Value::Function(_) | Value::Native(_) => f64::NAN,
        }
    }

    /// Converts the value to a string (ToString).
    pub fn to_js_string(&self) -> String {
        let mut out = String::new();
        self.write_js_string(&mut out, &mut Vec::new());
        out
    }

    /// Arrays join their elements with `,`; an array already being rendered
    /// further up `path` renders as the empty string.
    fn write_js_string(&self, out: &mut String, path: &mut Vec<*const RefCell<Vec<Value>>>) {
        let Value::Array(elements) = self else {
            out.push_str(&self.to_string());
            return;
        };
        let ptr = Rc::as_ptr(elements);
        if path.contains(&ptr) {
            return;
        }
        path.push(ptr);
        for (i, element) in elements.borrow().iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            if !element.is_nullish() {
                element.write_js_string(out, path);
            }
        }
        path.pop();
    }

    /// Returns the type of this value as a string.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object", // Historical quirk
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) | Value::Array(_) => "object",
            Value::Function(_) | Value::Native(_) => "function",
        }
    }

    /// Strict equality (`===`).
    pub fn strict_equals(&self, other: &Value) -> bool {
        self == other
    }

    /// Abstract equality (`==`).
    pub fn abstract_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null | Value::Undefined, Value::Null | Value::Undefined) => true,
            (Value::Null | Value::Undefined, _) | (_, Value::Null | Value::Undefined) => false,

            (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
                *n == string_to_number(s)
            }

            (Value::Boolean(b), other) | (other, Value::Boolean(b)) => {
                let num = if *b { 1.0 } else { 0.0 };
                Value::Number(num).abstract_equals(other)
            }

            // ToPrimitive on an object or array yields its string form
            (Value::Number(_) | Value::String(_), Value::Object(_) | Value::Array(_)) => {
                self.abstract_equals(&Value::String(other.to_js_string()))
            }
            (Value::Object(_) | Value::Array(_), Value::Number(_) | Value::String(_)) => {
                Value::String(self.to_js_string()).abstract_equals(other)
            }

            _ => self.strict_equals(other),
        }
    }

    /// Relational comparison. Strings compare by UTF-16 code unit,
    /// everything else numerically; `None` when either side is NaN.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.encode_utf16().cmp(b.encode_utf16())),
            _ => self.to_number().partial_cmp(&other.to_number()),
        }
    }

    /// The `+` operator: concatenation when either side is a string (or an
    /// object, which converts to one), numeric addition otherwise.
    pub fn add(&self, other: &Value) -> Value {
        let is_stringy =
            |v: &Value| matches!(v, Value::String(_) | Value::Object(_) | Value::Array(_));
        if is_stringy(self) || is_stringy(other) {
            let mut s = self.to_js_string();
            s.push_str(&other.to_js_string());
            Value::String(s)
        } else {
            Value::Number(self.to_number() + other.to_number())
        }
    }

    /// Reads `self[key]`.
    pub fn get_property(&self, key: &Value) -> Result<Value, Error> {
        let name = key.to_js_string();
        match self {
            Value::Undefined | Value::Null => Err(Error::TypeError(format!(
                "Cannot read properties of {} (reading '{}')",
                self, name
            ))),
            Value::Object(obj) => Ok(obj.borrow().get(&name).cloned().unwrap_or_default()),
            Value::Array(elements) => {
                let elements = elements.borrow();
                if name == "length" {
                    return Ok(Value::Number(elements.len() as f64));
                }
                Ok(array_index(&name)
                    .and_then(|i| elements.get(i).cloned())
                    .unwrap_or_default())
            }
            Value::String(s) => {
                if name == "length" {
                    return Ok(Value::Number(s.encode_utf16().count() as f64));
                }
                Ok(array_index(&name)
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or_default())
            }
            Value::Boolean(_) | Value::Number(_) | Value::Function(_) | Value::Native(_) => {
                Ok(Value::Undefined)
            }
        }
    }

    /// Writes `self[key] = value`.
    pub fn set_property(&self, key: &Value, value: Value) -> Result<(), Error> {
        let name = key.to_js_string();
        match self {
            Value::Object(obj) => {
                obj.borrow_mut().set(name, value);
                Ok(())
            }
            Value::Array(elements) => {
                let mut elements = elements.borrow_mut();
                if name == "length" {
                    let len = value.to_number();
                    if !(0.0..=u32::MAX as f64).contains(&len) || len.fract() != 0.0 {
                        return Err(Error::RangeError("Invalid array length".into()));
                    }
                    let len = len as usize;
                    check_dense_length(len)?;
                    elements.resize(len, Value::Undefined);
                    return Ok(());
                }
                let Some(index) = array_index(&name) else {
                    return Err(Error::TypeError(format!(
                        "Cannot set property '{}' of an array",
                        name
                    )));
                };
                if index >= elements.len() {
                    check_dense_length(index + 1)?;
                    elements.resize(index + 1, Value::Undefined);
                }
                elements[index] = value;
                Ok(())
            }
            _ => Err(Error::TypeError(format!(
                "Cannot set properties of {} (setting '{}')",
                self.inspect(),
                name
            ))),
        }
    }

    /// Developer-facing rendering used by `console.log` and the REPL:
    /// strings nested inside containers are quoted, containers are expanded.
    pub fn inspect(&self) -> String {
        let mut out = String::new();
        self.write_inspect(&mut out, 0);
        out
    }

    fn write_inspect(&self, out: &mut String, depth: usize) {
        const MAX_DEPTH: usize = 4;

        match self {
            Value::String(s) if depth > 0 => {
                out.push('\'');
                out.push_str(s);
                out.push('\'');
            }
            Value::Array(elements) => {
                let elements = elements.borrow();
                if elements.is_empty() {
                    out.push_str("[]");
                } else if depth >= MAX_DEPTH {
                    out.push_str("[Array]");
                } else {
                    out.push_str("[ ");
                    for (i, element) in elements.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        element.write_inspect(out, depth + 1);
                    }
                    out.push_str(" ]");
                }
            }
            Value::Object(obj) => {
                let obj = obj.borrow();
                if obj.is_empty() {
                    out.push_str("{}");
                } else if depth >= MAX_DEPTH {
                    out.push_str("[Object]");
                } else {
                    out.push_str("{ ");
                    for (i, (key, value)) in obj.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(key);
                        out.push_str(": ");
                        value.write_inspect(out, depth + 1);
                    }
                    out.push_str(" }");
                }
            }
            other => out.push_str(&other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", number_to_string(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Array(_) => f.write_str(&self.to_js_string()),
            Value::Function(name) => write!(f, "[Function: {}]", name),
            Value::Native(native) => write!(f, "[Function: {} (native)]", native.name()),
        }
    }
}

/// Formats a number the way JavaScript's Number::toString does for the
/// common cases: no trailing `.0`, `NaN`, `Infinity`, exponent form for very
/// large and very small magnitudes.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        return format!("{}", n);
    }

    // Rust prints "1e21" where JavaScript writes "1e+21"
    let formatted = format!("{:e}", n);
    match formatted.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => formatted,
    }
}

/// Parses a numeric literal as written in source: decimal integers and
/// fractions (including a leading `.`), exponents, `0x`/`0o`/`0b` prefixes
/// and `_` separators.
///
/// Returns `None` for anything that is not a well-formed literal, including
/// the `inf`/`nan` spellings Rust's float parser would otherwise accept.
pub fn parse_number_literal(raw: &str) -> Option<f64> {
    if raw.starts_with('_') || raw.ends_with('_') {
        return None;
    }
    let cleaned: String = raw.chars().filter(|&c| c != '_').collect();

    let radix = match cleaned.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &cleaned[2..];
        if digits.is_empty() {
            return None;
        }
        return digits.chars().try_fold(0.0f64, |acc, c| {
            c.to_digit(radix).map(|d| acc * radix as f64 + d as f64)
        });
    }

    let valid = cleaned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !valid || !cleaned.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// ToNumber applied to a string.
fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    let (negative, unsigned) = match trimmed.as_bytes()[0] {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let magnitude = if unsigned == "Infinity" {
        Some(f64::INFINITY)
    } else if unsigned.contains('_') {
        None
    } else {
        parse_number_literal(unsigned)
    };
    match magnitude {
        Some(n) if negative => -n,
        Some(n) => n,
        None => f64::NAN,
    }
}

/// Largest valid array index; an array's length must fit in a `u32`.
const MAX_ARRAY_INDEX: u32 = u32::MAX - 1;

/// Arrays are stored densely, so growing one past this many elements is
/// refused rather than allocated.
pub const MAX_DENSE_LENGTH: usize = 1 << 24;

/// Interprets a property name as an array index (`"0"`, `"12"`, not `"01"`,
/// nothing above 2^32 - 2).
fn array_index(name: &str) -> Option<usize> {
    let index = name.parse::<u32>().ok()?;
    (index <= MAX_ARRAY_INDEX && index.to_string() == name).then_some(index as usize)
}

fn check_dense_length(len: usize) -> Result<(), Error> {
    if len > MAX_DENSE_LENGTH {
        return Err(Error::RangeError(format!(
            "array length {} exceeds the supported maximum of {}",
            len, MAX_DENSE_LENGTH
        )));
    }
    Ok(())
}
