// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Built-in bindings installed into the default host context.

pub mod console;

pub use console::ConsoleSink;

use crate::runtime::host::HostContext;
use crate::runtime::value::Value;

/// Register all built-in bindings.
pub fn install(host: &mut HostContext, sink: ConsoleSink) {
    host.define("console", console::console_object(sink));
    host.define("undefined", Value::Undefined);
    host.define("NaN", Value::Number(f64::NAN));
    host.define("Infinity", Value::Number(f64::INFINITY));
}
