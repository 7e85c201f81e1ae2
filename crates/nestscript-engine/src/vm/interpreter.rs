// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Fetch/decode/execute loop over IR instruction lists.

use crate::compiler::ir::{Constant, Instruction, Module, OpCode, Operand, Routine, RESULT_SLOT};
use crate::runtime::host::HostContext;
use crate::runtime::value::Value;
use crate::Error;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// Globals visible after a run, sorted by name.
pub type SymbolTable = BTreeMap<String, Value>;

/// Name of the frame that runs a module's main list.
const MAIN: &str = "main";

/// Execution limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Maximum number of nested routine frames
    pub max_call_depth: usize,
    /// Maximum instructions per `run`/`call`; unlimited when `None`
    pub max_steps: Option<u64>,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 256,
            max_steps: None,
        }
    }
}

/// An active instruction list.
struct Frame {
    routine: Rc<Routine>,
    /// Index of the next instruction
    ip: usize,
    /// `None` for a main list: its declarations land in globals
    locals: Option<FxHashMap<String, Value>>,
}

/// The virtual machine that executes IR modules.
pub struct Vm {
    /// Loaded routines by name
    routines: FxHashMap<String, Rc<Routine>>,
    /// Global symbol table
    globals: FxHashMap<String, Value>,
    /// Call stack
    frames: Vec<Frame>,
    /// Routine frames currently on the stack
    depth: usize,
    /// Pending call arguments, in push order
    args: Vec<Value>,
    /// The `%ret` slot
    ret: Value,
    /// Outer bindings for free names
    host: HostContext,
    config: VmConfig,
    /// Instructions executed since the current entry point
    steps: u64,
}

impl Vm {
    /// Creates a VM with default limits.
    pub fn new(host: HostContext) -> Self {
        Self::with_config(host, VmConfig::default())
    }

    /// Creates a VM with the given limits.
    pub fn with_config(host: HostContext, config: VmConfig) -> Self {
        Self {
            routines: FxHashMap::default(),
            globals: FxHashMap::default(),
            frames: Vec::with_capacity(64),
            depth: 0,
            args: Vec::with_capacity(16),
            ret: Value::Undefined,
            host,
            config,
            steps: 0,
        }
    }

    /// Registers a module's routines without running anything. A routine
    /// replaces an earlier one of the same name.
    pub fn load(&mut self, module: &Module) {
        for routine in &module.routines {
            self.routines
                .insert(routine.name.clone(), Rc::new(routine.clone()));
        }
    }

    /// Loads a module and executes its main list to completion.
    pub fn run(&mut self, module: &Module) -> Result<(), Error> {
        self.load(module);
        let main = Rc::new(Routine {
            name: MAIN.to_string(),
            params: Vec::new(),
            registers: 0,
            instructions: module.main.clone(),
        });

        debug!(
            instructions = module.instruction_count(),
            routines = module.routines.len(),
            "run module"
        );
        self.steps = 0;
        let base = self.frames.len();
        self.frames.push(Frame {
            routine: main,
            ip: 0,
            locals: None,
        });
        let result = self.run_frames(base);
        if result.is_err() {
            self.unwind(base);
        }
        result
    }

    /// Calls a routine, native or function-valued global by name.
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, Error> {
        let callee = self.read_name(name)?;
        self.steps = 0;
        let base = self.frames.len();
        let result = self
            .dispatch(callee, args.to_vec(), name)
            .and_then(|()| self.run_frames(base))
            .map(|()| self.ret.clone());
        if result.is_err() {
            self.unwind(base);
        }
        result
    }

    /// User-visible globals, sorted. Registers and other reserved slots are
    /// left out.
    pub fn symbols(&self) -> SymbolTable {
        self.globals
            .iter()
            .filter(|(name, _)| !name.starts_with('%'))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Reads a global.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// Names of the loaded routines, sorted.
    pub fn routine_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.routines.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn run_frames(&mut self, base: usize) -> Result<(), Error> {
        while self.frames.len() > base {
            let Some(frame) = self.frames.last_mut() else {
                break;
            };
            let routine = Rc::clone(&frame.routine);
            let ip = frame.ip;
            frame.ip += 1;

            let Some(instruction) = routine.instructions.get(ip) else {
                // Fell off the end
                self.leave_frame(Value::Undefined);
                continue;
            };

            self.tick()?;
            trace!(routine = %routine.name, ip, instruction = %instruction, "execute");
            self.execute(instruction)?;
        }
        Ok(())
    }

    fn tick(&mut self) -> Result<(), Error> {
        self.steps += 1;
        match self.config.max_steps {
            Some(limit) if self.steps > limit => Err(Error::RangeError(format!(
                "step limit of {} instructions exceeded",
                limit
            ))),
            _ => Ok(()),
        }
    }

    fn execute(&mut self, instruction: &Instruction) -> Result<(), Error> {
        let ops = instruction.operands.as_slice();

        match instruction.opcode {
            OpCode::Global => {
                let value = self.optional(ops.get(1))?;
                declare(&mut self.globals, target(ops, 0)?, value);
            }
            OpCode::Var => {
                let value = self.optional(ops.get(1))?;
                let scope = match self.frames.last_mut().and_then(|f| f.locals.as_mut()) {
                    Some(locals) => locals,
                    None => &mut self.globals,
                };
                declare(scope, target(ops, 0)?, value);
            }
            OpCode::Mov => {
                let value = self.read(operand(ops, 1)?)?;
                self.write(target(ops, 0)?, value);
            }
            OpCode::MovCtx => {
                let value = self.context(string(ops, 1)?)?;
                self.write(target(ops, 0)?, value);
            }
            OpCode::MovProp => {
                let object = self.read(operand(ops, 1)?)?;
                let key = self.read(operand(ops, 2)?)?;
                let value = object.get_property(&key)?;
                self.write(target(ops, 0)?, value);
            }
            OpCode::SetKey => {
                let object = self.read(operand(ops, 0)?)?;
                let key = self.read(operand(ops, 1)?)?;
                let value = self.read(operand(ops, 2)?)?;
                object.set_property(&key, value)?;
            }
            OpCode::Push => {
                let value = self.read(operand(ops, 0)?)?;
                self.args.push(value);
            }
            OpCode::Call => {
                let callee_operand = operand(ops, 0)?;
                let callee = self.read(callee_operand)?;
                let args = self.pop_args(count(ops, 1)?)?;
                self.dispatch(callee, args, &callee_operand.to_string())?;
            }
            OpCode::CallVar => {
                let object = self.read(operand(ops, 0)?)?;
                let key = self.read(operand(ops, 1)?)?;
                let callee = object.get_property(&key)?;
                let args = self.pop_args(count(ops, 2)?)?;
                let label = format!("{}.{}", operand(ops, 0)?, key.to_js_string());
                self.dispatch(callee, args, &label)?;
            }
            OpCode::Ret => {
                let value = self.optional(ops.first())?.unwrap_or_default();
                self.leave_frame(value);
            }

            OpCode::Add => self.binary(ops, |a, b| a.add(b))?,
            OpCode::Sub => self.binary(ops, |a, b| Value::Number(a.to_number() - b.to_number()))?,
            OpCode::Mul => self.binary(ops, |a, b| Value::Number(a.to_number() * b.to_number()))?,
            OpCode::Div => self.binary(ops, |a, b| Value::Number(a.to_number() / b.to_number()))?,
            OpCode::Mod => self.binary(ops, |a, b| Value::Number(a.to_number() % b.to_number()))?,

            OpCode::Lt => self.binary(ops, |a, b| {
                Value::Boolean(a.compare(b) == Some(Ordering::Less))
            })?,
            OpCode::Le => self.binary(ops, |a, b| {
                Value::Boolean(matches!(a.compare(b), Some(Ordering::Less | Ordering::Equal)))
            })?,
            OpCode::Gt => self.binary(ops, |a, b| {
                Value::Boolean(a.compare(b) == Some(Ordering::Greater))
            })?,
            OpCode::Ge => self.binary(ops, |a, b| {
                Value::Boolean(matches!(a.compare(b), Some(Ordering::Greater | Ordering::Equal)))
            })?,
            OpCode::Eq => self.binary(ops, |a, b| Value::Boolean(a.abstract_equals(b)))?,
            OpCode::Ne => self.binary(ops, |a, b| Value::Boolean(!a.abstract_equals(b)))?,
            OpCode::StrictEq => self.binary(ops, |a, b| Value::Boolean(a.strict_equals(b)))?,
            OpCode::StrictNe => self.binary(ops, |a, b| Value::Boolean(!a.strict_equals(b)))?,

            OpCode::Neg => {
                let value = self.read(operand(ops, 1)?)?;
                self.write(target(ops, 0)?, Value::Number(-value.to_number()));
            }
            OpCode::Not => {
                let value = self.read(operand(ops, 1)?)?;
                self.write(target(ops, 0)?, Value::Boolean(!value.to_boolean()));
            }
            OpCode::TypeOf => {
                // typeof on an unbound name is "undefined", not an error
                let value = match self.read(operand(ops, 1)?) {
                    Ok(value) => value,
                    Err(Error::ReferenceError(_)) => Value::Undefined,
                    Err(e) => return Err(e),
                };
                self.write(target(ops, 0)?, Value::from(value.type_of()));
            }

            OpCode::Jump => self.jump(label(ops, 0)?),
            OpCode::JumpIfFalse => {
                if !self.read(operand(ops, 0)?)?.to_boolean() {
                    self.jump(label(ops, 1)?);
                }
            }
            OpCode::JumpIfTrue => {
                if self.read(operand(ops, 0)?)?.to_boolean() {
                    self.jump(label(ops, 1)?);
                }
            }

            OpCode::NewObject => self.write(target(ops, 0)?, Value::new_object()),
            OpCode::NewArray => self.write(target(ops, 0)?, Value::new_array(Vec::new())),
        }

        Ok(())
    }

    fn binary<F>(&mut self, ops: &[Operand], op: F) -> Result<(), Error>
    where
        F: FnOnce(&Value, &Value) -> Value,
    {
        let a = self.read(operand(ops, 1)?)?;
        let b = self.read(operand(ops, 2)?)?;
        self.write(target(ops, 0)?, op(&a, &b));
        Ok(())
    }

    fn jump(&mut self, target: usize) {
        if let Some(frame) = self.frames.last_mut() {
            frame.ip = target;
        }
    }

    fn pop_args(&mut self, argc: usize) -> Result<Vec<Value>, Error> {
        let len = self.args.len();
        if argc > len {
            return Err(Error::InternalError(format!(
                "call expects {} arguments but only {} were pushed",
                argc, len
            )));
        }
        Ok(self.args.split_off(len - argc))
    }

    /// Starts a call. Routines get a new frame that the dispatch loop picks
    /// up; natives run to completion here. Either way the result ends up in
    /// `%ret`.
    fn dispatch(&mut self, callee: Value, args: Vec<Value>, label: &str) -> Result<(), Error> {
        match callee {
            Value::Function(name) => self.enter_routine(&name, args),
            Value::Native(native) => {
                debug!(function = native.name(), argc = args.len(), "native call");
                self.ret = native.call(&args).map_err(Error::TypeError)?;
                Ok(())
            }
            other => Err(Error::TypeError(format!(
                "{} is not a function (got {})",
                label,
                other.type_of()
            ))),
        }
    }

    fn enter_routine(&mut self, name: &str, args: Vec<Value>) -> Result<(), Error> {
        let routine = self
            .routines
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ReferenceError(format!("{} is not defined", name)))?;
        if self.depth >= self.config.max_call_depth {
            return Err(Error::RangeError(
                "Maximum call stack size exceeded".to_string(),
            ));
        }

        let mut locals = FxHashMap::default();
        let mut args = args.into_iter();
        for param in &routine.params {
            locals.insert(param.clone(), args.next().unwrap_or_default());
        }

        self.depth += 1;
        debug!(routine = %routine.name, depth = self.depth, "enter routine");
        self.frames.push(Frame {
            routine,
            ip: 0,
            locals: Some(locals),
        });
        Ok(())
    }

    fn leave_frame(&mut self, value: Value) {
        if let Some(frame) = self.frames.pop() {
            if frame.locals.is_some() {
                self.depth = self.depth.saturating_sub(1);
                self.ret = value;
            }
        }
    }

    /// Drops everything above `base` after an error so the VM can be reused.
    fn unwind(&mut self, base: usize) {
        self.frames.truncate(base);
        self.args.clear();
        self.depth = self.frames.iter().filter(|f| f.locals.is_some()).count();
    }

    fn read(&self, operand: &Operand) -> Result<Value, Error> {
        match operand {
            Operand::Name(name) => self.read_name(name),
            Operand::Const(constant) => Ok(constant_value(constant)),
            Operand::Count(_) | Operand::Label(_) => Err(Error::InternalError(format!(
                "'{}' is not a value operand",
                operand
            ))),
        }
    }

    fn optional(&self, operand: Option<&Operand>) -> Result<Option<Value>, Error> {
        operand.map(|op| self.read(op)).transpose()
    }

    fn read_name(&self, name: &str) -> Result<Value, Error> {
        if name == RESULT_SLOT {
            return Ok(self.ret.clone());
        }
        if let Some(value) = self
            .frames
            .last()
            .and_then(|f| f.locals.as_ref())
            .and_then(|locals| locals.get(name))
        {
            return Ok(value.clone());
        }
        self.context(name)
    }

    /// Resolves a name outside the current frame: globals, then routines,
    /// then the host.
    fn context(&self, name: &str) -> Result<Value, Error> {
        if let Some(value) = self.globals.get(name) {
            return Ok(value.clone());
        }
        if self.routines.contains_key(name) {
            return Ok(Value::Function(Rc::from(name)));
        }
        self.host
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ReferenceError(format!("{} is not defined", name)))
    }

    fn write(&mut self, name: &str, value: Value) {
        if name == RESULT_SLOT {
            self.ret = value;
            return;
        }
        if let Some(slot) = self
            .frames
            .last_mut()
            .and_then(|f| f.locals.as_mut())
            .and_then(|locals| locals.get_mut(name))
        {
            *slot = value;
            return;
        }
        self.globals.insert(name.to_string(), value);
    }
}

fn declare(scope: &mut FxHashMap<String, Value>, name: &str, value: Option<Value>) {
    match value {
        Some(value) => {
            scope.insert(name.to_string(), value);
        }
        None => {
            scope.entry(name.to_string()).or_insert(Value::Undefined);
        }
    }
}

fn constant_value(constant: &Constant) -> Value {
    match constant {
        Constant::Number { value, .. } => Value::Number(*value),
        Constant::String(s) => Value::String(s.clone()),
        Constant::Boolean(b) => Value::Boolean(*b),
        Constant::Null => Value::Null,
        Constant::Undefined => Value::Undefined,
    }
}

fn operand(ops: &[Operand], index: usize) -> Result<&Operand, Error> {
    ops.get(index)
        .ok_or_else(|| Error::InternalError(format!("missing operand {}", index)))
}

fn target(ops: &[Operand], index: usize) -> Result<&str, Error> {
    let op = operand(ops, index)?;
    op.as_name()
        .ok_or_else(|| Error::InternalError(format!("'{}' is not a name operand", op)))
}

fn string(ops: &[Operand], index: usize) -> Result<&str, Error> {
    match operand(ops, index)? {
        Operand::Const(Constant::String(s)) => Ok(s),
        other => Err(Error::InternalError(format!("'{}' is not a string", other))),
    }
}

fn count(ops: &[Operand], index: usize) -> Result<usize, Error> {
    match operand(ops, index)? {
        Operand::Count(n) => Ok(*n),
        other => Err(Error::InternalError(format!("'{}' is not a count", other))),
    }
}

fn label(ops: &[Operand], index: usize) -> Result<usize, Error> {
    match operand(ops, index)? {
        Operand::Label(n) => Ok(*n),
        other => Err(Error::InternalError(format!("'{}' is not a label", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parse_module;

    fn run_ir(text: &str) -> Vm {
        let mut vm = Vm::new(HostContext::new());
        vm.run(&parse_module(text).unwrap()).unwrap();
        vm
    }

    fn run_err(host: HostContext, config: VmConfig, text: &str) -> Error {
        let mut vm = Vm::with_config(host, config);
        vm.run(&parse_module(text).unwrap()).unwrap_err()
    }

    #[test]
    fn test_mov_writes_global() {
        let vm = run_ir("MOV a 1");
        assert_eq!(vm.get("a"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn test_symbols_skip_registers() {
        let vm = run_ir("MOV %r0 2\nADD total %r0 3");
        let symbols = vm.symbols();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols["total"], Value::Number(5.0));
    }

    #[test]
    fn test_var_without_value_keeps_binding() {
        let vm = run_ir("GLOBAL x 7\nGLOBAL x\nVAR y");
        assert_eq!(vm.get("x"), Some(&Value::Number(7.0)));
        assert_eq!(vm.get("y"), Some(&Value::Undefined));
    }

    #[test]
    fn test_arguments_bind_in_push_order() {
        let vm = run_ir(
            "PUSH 5\nPUSH 3\nCALL sub 2\nMOV r %ret\n\
             func sub(a, b) {\n  SUB %ret a b\n  RET %ret\n}",
        );
        assert_eq!(vm.get("r"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_missing_arguments_are_undefined() {
        let vm = run_ir("CALL f 0\nMOV r %ret\nfunc f(a) {\n  TYPEOF %ret a\n  RET %ret\n}");
        assert_eq!(vm.get("r"), Some(&Value::from("undefined")));
    }

    #[test]
    fn test_locals_shadow_globals() {
        let vm = run_ir(
            "GLOBAL x 1\nCALL f 0\nMOV y %ret\n\
             func f() {\n  VAR x 2\n  MOV x 3\n  RET x\n}",
        );
        assert_eq!(vm.get("x"), Some(&Value::Number(1.0)));
        assert_eq!(vm.get("y"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn test_routine_writes_undeclared_name_to_globals() {
        let vm = run_ir("CALL f 0\nfunc f() {\n  MOV seen true\n  RET\n}");
        assert_eq!(vm.get("seen"), Some(&Value::Boolean(true)));
    }

    #[test]
    fn test_ret_without_value_returns_undefined() {
        let vm = run_ir("MOV %ret 1\nCALL f 0\nMOV r %ret\nfunc f() {\n  RET\n}");
        assert_eq!(vm.get("r"), Some(&Value::Undefined));
    }

    #[test]
    fn test_object_properties() {
        let vm = run_ir(
            "NEW_OBJ o\nSET_KEY o \"b\" 4\nMOV_PROP v o \"b\"\nMOV_PROP missing o \"c\"",
        );
        assert_eq!(vm.get("v"), Some(&Value::Number(4.0)));
        assert_eq!(vm.get("missing"), Some(&Value::Undefined));
    }

    #[test]
    fn test_host_object_is_mutated_in_place() {
        let mut host = HostContext::new();
        let target = Value::new_object();
        host.define("a", target.clone());

        let mut vm = Vm::new(host);
        let module = parse_module("MOV_CTX %r0 \"a\"\nSET_KEY %r0 \"b\" 1").unwrap();
        vm.run(&module).unwrap();

        assert_eq!(
            target.get_property(&Value::from("b")).unwrap(),
            Value::Number(1.0)
        );
    }

    #[test]
    fn test_native_call_and_method_call() {
        let mut host = HostContext::new();
        host.define_native("sum", |args| {
            Ok(Value::Number(args.iter().map(Value::to_number).sum()))
        });
        let math = Value::new_object();
        math.set_property(
            &Value::from("twice"),
            Value::Native(crate::runtime::NativeFunction::new("twice", |args| {
                Ok(Value::Number(args.first().map_or(f64::NAN, Value::to_number) * 2.0))
            })),
        )
        .unwrap();
        host.define("math", math);

        let mut vm = Vm::new(host);
        let module = parse_module(
            "PUSH 1\nPUSH 2\nPUSH 3\nCALL sum 3\nMOV s %ret\n\
             MOV_CTX %r0 \"math\"\nPUSH 21\nCALL_VAR %r0 \"twice\" 1\nMOV t %ret",
        )
        .unwrap();
        vm.run(&module).unwrap();

        assert_eq!(vm.get("s"), Some(&Value::Number(6.0)));
        assert_eq!(vm.get("t"), Some(&Value::Number(42.0)));
    }

    #[test]
    fn test_native_error_is_type_error() {
        let mut host = HostContext::new();
        host.define_native("fail", |_| Err("boom".to_string()));
        let err = run_err(host, VmConfig::default(), "CALL fail 0");
        assert_eq!(err, Error::TypeError("boom".into()));
    }

    #[test]
    fn test_unbound_name_is_reference_error() {
        let err = run_err(HostContext::new(), VmConfig::default(), "MOV a nope");
        assert_eq!(err, Error::ReferenceError("nope is not defined".into()));

        let err = run_err(HostContext::new(), VmConfig::default(), "MOV_CTX %r0 \"nope\"");
        assert!(matches!(err, Error::ReferenceError(_)));
    }

    #[test]
    fn test_calling_non_function_is_type_error() {
        let err = run_err(HostContext::new(), VmConfig::default(), "MOV x 1\nCALL x 0");
        assert!(matches!(err, Error::TypeError(msg) if msg.contains("not a function")));
    }

    #[test]
    fn test_property_of_undefined_is_type_error() {
        let err = run_err(
            HostContext::new(),
            VmConfig::default(),
            "MOV o undefined\nMOV_PROP v o \"x\"",
        );
        assert!(matches!(err, Error::TypeError(_)));
    }

    #[test]
    fn test_typeof_unbound_name() {
        let vm = run_ir("TYPEOF t nothing_here\nTYPEOF n 1");
        assert_eq!(vm.get("t"), Some(&Value::from("undefined")));
        assert_eq!(vm.get("n"), Some(&Value::from("number")));
    }

    #[test]
    fn test_comparisons() {
        let vm = run_ir(
            "LT a 1 2\nLE b 2 2\nGT c \"b\" \"a\"\nGE d undefined 1\n\
             EQ e \"1\" 1\nSEQ f \"1\" 1\nNE g null undefined\nSNE h null undefined",
        );
        let expected = [
            ("a", true),
            ("b", true),
            ("c", true),
            ("d", false),
            ("e", true),
            ("f", false),
            ("g", false),
            ("h", true),
        ];
        for (name, value) in expected {
            assert_eq!(vm.get(name), Some(&Value::Boolean(value)), "{}", name);
        }
    }

    #[test]
    fn test_arithmetic() {
        let vm = run_ir("ADD s \"a\" 1\nMOD m -7 3\nDIV d 1 0\nNEG n \"4\"\nNOT b 0");
        assert_eq!(vm.get("s"), Some(&Value::from("a1")));
        assert_eq!(vm.get("m"), Some(&Value::Number(-1.0)));
        assert_eq!(vm.get("d"), Some(&Value::Number(f64::INFINITY)));
        assert_eq!(vm.get("n"), Some(&Value::Number(-4.0)));
        assert_eq!(vm.get("b"), Some(&Value::Boolean(true)));
    }

    #[test]
    fn test_loop_with_jumps() {
        // i = 0; while (i < 5) i = i + 1
        let vm = run_ir("MOV i 0\nLT %r0 i 5\nJF %r0 5\nADD i i 1\nJMP 1\nMOV done true");
        assert_eq!(vm.get("i"), Some(&Value::Number(5.0)));
        assert_eq!(vm.get("done"), Some(&Value::Boolean(true)));
    }

    #[test]
    fn test_call_depth_limit() {
        let config = VmConfig {
            max_call_depth: 16,
            max_steps: None,
        };
        let err = run_err(HostContext::new(), config, "CALL f 0\nfunc f() {\n  CALL f 0\n  RET\n}");
        assert!(matches!(err, Error::RangeError(_)));
    }

    #[test]
    fn test_step_limit() {
        let config = VmConfig {
            max_call_depth: 256,
            max_steps: Some(100),
        };
        let err = run_err(HostContext::new(), config, "MOV x 1\nJMP 0");
        assert_eq!(
            err,
            Error::RangeError("step limit of 100 instructions exceeded".into())
        );
    }

    #[test]
    fn test_vm_usable_after_error() {
        let mut vm = Vm::new(HostContext::new());
        let bad = parse_module("CALL f 0\nfunc f() {\n  PUSH 1\n  MOV x missing\n  RET\n}").unwrap();
        assert!(vm.run(&bad).is_err());

        let good = parse_module("PUSH 9\nCALL id 1\nMOV r %ret\nfunc id(v) {\n  RET v\n}").unwrap();
        vm.run(&good).unwrap();
        assert_eq!(vm.get("r"), Some(&Value::Number(9.0)));
    }

    #[test]
    fn test_call_from_rust() {
        let mut vm = Vm::new(HostContext::new());
        let module = parse_module("func add(a, b) {\n  ADD %ret a b\n  RET %ret\n}").unwrap();
        vm.load(&module);

        let result = vm
            .call("add", &[Value::Number(40.0), Value::Number(2.0)])
            .unwrap();
        assert_eq!(result, Value::Number(42.0));
        assert_eq!(vm.routine_names(), vec!["add"]);
        assert!(vm.call("missing", &[]).is_err());
    }

    #[test]
    fn test_routine_is_a_value() {
        let vm = run_ir("MOV f g\nTYPEOF t f\nfunc g() {\n  RET\n}");
        assert_eq!(vm.get("f"), Some(&Value::Function(Rc::from("g"))));
        assert_eq!(vm.get("t"), Some(&Value::from("function")));
    }
}
