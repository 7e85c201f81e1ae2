// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Runtime values and the host context.

pub mod function;
pub mod host;
pub mod object;
pub mod value;

pub use function::NativeFunction;
pub use host::HostContext;
pub use object::Object;
pub use value::Value;
