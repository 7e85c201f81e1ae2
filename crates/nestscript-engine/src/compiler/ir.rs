// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! IR definitions: instructions, routines, modules and their text form.

use std::fmt;

/// Name of the call-result slot written by `CALL`/`CALL_VAR`.
pub const RESULT_SLOT: &str = "%ret";

/// A compiled program: the top-level instruction list plus one routine per
/// function, in the order they were compiled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    /// Top-level instructions
    pub main: Vec<Instruction>,
    /// Compiled functions
    pub routines: Vec<Routine>,
}

impl Module {
    /// Creates a new empty module.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds a routine by name.
    pub fn routine(&self, name: &str) -> Option<&Routine> {
        self.routines.iter().find(|r| r.name == name)
    }

    /// Total number of instructions across main and all routines.
    pub fn instruction_count(&self) -> usize {
        self.main.len()
            + self
                .routines
                .iter()
                .map(|r| r.instructions.len())
                .sum::<usize>()
    }
}

/// One compiled function.
#[derive(Debug, Clone, PartialEq)]
pub struct Routine {
    /// Declared or synthesized name
    pub name: String,
    /// Parameter names, in order
    pub params: Vec<String>,
    /// Peak register usage; the first `registers` instructions declare the
    /// slots `%r0..`
    pub registers: usize,
    /// Slot declarations, body and the trailing `RET`
    pub instructions: Vec<Instruction>,
}

/// A single IR instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The operation code
    pub opcode: OpCode,
    /// Operands, tagged by kind
    pub operands: Vec<Operand>,
}

impl Instruction {
    /// Creates a new instruction.
    pub fn new(opcode: OpCode, operands: Vec<Operand>) -> Self {
        Self { opcode, operands }
    }

    /// Creates a new instruction with no operands.
    pub fn simple(opcode: OpCode) -> Self {
        Self::new(opcode, Vec::new())
    }
}

/// Instruction operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Binding, register, routine or reserved slot reference
    Name(String),
    /// Literal value
    Const(Constant),
    /// Argument count
    Count(usize),
    /// Jump target (instruction index in the enclosing list)
    Label(usize),
}

impl Operand {
    /// A name reference.
    pub fn name(name: impl Into<String>) -> Self {
        Operand::Name(name.into())
    }

    /// A string constant.
    pub fn string(value: impl Into<String>) -> Self {
        Operand::Const(Constant::String(value.into()))
    }

    /// A number constant from its value, with canonical raw text.
    pub fn number(value: f64) -> Self {
        Operand::Const(Constant::Number {
            value,
            raw: crate::runtime::value::number_to_string(value),
        })
    }

    /// Returns the name if this operand is a name reference.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Operand::Name(name) => Some(name),
            _ => None,
        }
    }
}

/// A literal operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Number, with its source text
    Number {
        /// Parsed value
        value: f64,
        /// Text as written
        raw: String,
    },
    /// String
    String(String),
    /// Boolean
    Boolean(bool),
    /// null
    Null,
    /// undefined
    Undefined,
}

/// What an operand position accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// A name (written to or called)
    Name,
    /// A name or a constant (read)
    Value,
    /// A string constant
    Str,
    /// An argument count
    Count,
    /// A jump target
    Label,
}

/// Operation codes for the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    // Declarations
    /// Declare a global binding
    Global,
    /// Declare a binding in the current frame
    Var,

    // Moves
    /// Copy a value
    Mov,
    /// Resolve a free identifier against the host context
    MovCtx,
    /// Read a property
    MovProp,
    /// Write a property
    SetKey,

    // Calls
    /// Push an argument
    Push,
    /// Call a function by name or register
    Call,
    /// Call a method `obj[key]`
    CallVar,
    /// Return from the routine
    Ret,

    // Arithmetic
    /// Addition / concatenation
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division
    Div,
    /// Remainder
    Mod,

    // Comparison
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
    /// Equal (==)
    Eq,
    /// Not equal (!=)
    Ne,
    /// Strict equal (===)
    StrictEq,
    /// Strict not equal (!==)
    StrictNe,

    // Unary
    /// Numeric negation
    Neg,
    /// Logical NOT
    Not,
    /// typeof operator
    TypeOf,

    // Control flow
    /// Unconditional jump
    Jump,
    /// Jump if falsy
    JumpIfFalse,
    /// Jump if truthy
    JumpIfTrue,

    // Allocation
    /// Create an empty object
    NewObject,
    /// Create an empty array
    NewArray,
}

/// Every opcode, for mnemonic lookup.
const ALL_OPCODES: &[OpCode] = &[
    OpCode::Global,
    OpCode::Var,
    OpCode::Mov,
    OpCode::MovCtx,
    OpCode::MovProp,
    OpCode::SetKey,
    OpCode::Push,
    OpCode::Call,
    OpCode::CallVar,
    OpCode::Ret,
    OpCode::Add,
    OpCode::Sub,
    OpCode::Mul,
    OpCode::Div,
    OpCode::Mod,
    OpCode::Lt,
    OpCode::Le,
    OpCode::Gt,
    OpCode::Ge,
    OpCode::Eq,
    OpCode::Ne,
    OpCode::StrictEq,
    OpCode::StrictNe,
    OpCode::Neg,
    OpCode::Not,
    OpCode::TypeOf,
    OpCode::Jump,
    OpCode::JumpIfFalse,
    OpCode::JumpIfTrue,
    OpCode::NewObject,
    OpCode::NewArray,
];

impl OpCode {
    /// The mnemonic used in IR text.
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Global => "GLOBAL",
            OpCode::Var => "VAR",
            OpCode::Mov => "MOV",
            OpCode::MovCtx => "MOV_CTX",
            OpCode::MovProp => "MOV_PROP",
            OpCode::SetKey => "SET_KEY",
            OpCode::Push => "PUSH",
            OpCode::Call => "CALL",
            OpCode::CallVar => "CALL_VAR",
            OpCode::Ret => "RET",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Mod => "MOD",
            OpCode::Lt => "LT",
            OpCode::Le => "LE",
            OpCode::Gt => "GT",
            OpCode::Ge => "GE",
            OpCode::Eq => "EQ",
            OpCode::Ne => "NE",
            OpCode::StrictEq => "SEQ",
            OpCode::StrictNe => "SNE",
            OpCode::Neg => "NEG",
            OpCode::Not => "NOT",
            OpCode::TypeOf => "TYPEOF",
            OpCode::Jump => "JMP",
            OpCode::JumpIfFalse => "JF",
            OpCode::JumpIfTrue => "JT",
            OpCode::NewObject => "NEW_OBJ",
            OpCode::NewArray => "NEW_ARR",
        }
    }

    /// Looks up an opcode by mnemonic.
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        ALL_OPCODES
            .iter()
            .copied()
            .find(|op| op.mnemonic() == mnemonic)
    }

    /// The operand positions, in order. Positions past `min_operands` are
    /// optional.
    pub fn operand_kinds(self) -> &'static [OperandKind] {
        use OperandKind::*;
        match self {
            OpCode::Global | OpCode::Var => &[Name, Value],
            OpCode::Mov => &[Name, Value],
            OpCode::MovCtx => &[Name, Str],
            OpCode::MovProp => &[Name, Value, Value],
            OpCode::SetKey => &[Value, Value, Value],
            OpCode::Push => &[Value],
            OpCode::Call => &[Name, Count],
            OpCode::CallVar => &[Value, Value, Count],
            OpCode::Ret => &[Value],
            OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::Div
            | OpCode::Mod
            | OpCode::Lt
            | OpCode::Le
            | OpCode::Gt
            | OpCode::Ge
            | OpCode::Eq
            | OpCode::Ne
            | OpCode::StrictEq
            | OpCode::StrictNe => &[Name, Value, Value],
            OpCode::Neg | OpCode::Not | OpCode::TypeOf => &[Name, Value],
            OpCode::Jump => &[Label],
            OpCode::JumpIfFalse | OpCode::JumpIfTrue => &[Value, Label],
            OpCode::NewObject | OpCode::NewArray => &[Name],
        }
    }

    /// Number of operands that must be present.
    pub fn min_operands(self) -> usize {
        match self {
            OpCode::Global | OpCode::Var => 1,
            OpCode::Ret => 0,
            other => other.operand_kinds().len(),
        }
    }

    /// True for the jump family, whose last operand is a label.
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            OpCode::Jump | OpCode::JumpIfFalse | OpCode::JumpIfTrue
        )
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Number { raw, .. } => f.write_str(raw),
            Constant::String(s) => f.write_str(&quote(s)),
            Constant::Boolean(b) => write!(f, "{}", b),
            Constant::Null => f.write_str("null"),
            Constant::Undefined => f.write_str("undefined"),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Name(name) => f.write_str(name),
            Operand::Const(constant) => write!(f, "{}", constant),
            Operand::Count(n) | Operand::Label(n) => write!(f, "{}", n),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opcode.mnemonic())?;
        for operand in &self.operands {
            write!(f, " {}", operand)?;
        }
        Ok(())
    }
}

impl fmt::Display for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "func {}({}) {{", self.name, self.params.join(", "))?;
        for instruction in &self.instructions {
            writeln!(f, "  {}", instruction)?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in &self.main {
            writeln!(f, "{}", instruction)?;
        }
        for (i, routine) in self.routines.iter().enumerate() {
            if i > 0 || !self.main.is_empty() {
                writeln!(f)?;
            }
            write!(f, "{}", routine)?;
        }
        Ok(())
    }
}

/// Renders a string constant: double-quoted with escapes.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mnemonic_lookup() {
        for &op in ALL_OPCODES {
            assert_eq!(OpCode::from_mnemonic(op.mnemonic()), Some(op));
        }
        assert_eq!(OpCode::from_mnemonic("MOV_CTX"), Some(OpCode::MovCtx));
        assert_eq!(OpCode::from_mnemonic("mov"), None);
    }

    #[test]
    fn test_optional_operands() {
        assert_eq!(OpCode::Var.min_operands(), 1);
        assert_eq!(OpCode::Var.operand_kinds().len(), 2);
        assert_eq!(OpCode::Ret.min_operands(), 0);
        assert_eq!(OpCode::CallVar.min_operands(), 3);
    }

    #[test]
    fn test_jump_family() {
        let jumps: Vec<OpCode> = ALL_OPCODES.iter().copied().filter(|op| op.is_jump()).collect();
        assert_eq!(jumps, vec![OpCode::Jump, OpCode::JumpIfFalse, OpCode::JumpIfTrue]);
        for op in jumps {
            assert_eq!(op.operand_kinds().last(), Some(&OperandKind::Label));
        }
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("say \"hi\"\n"), "\"say \\\"hi\\\"\\n\"");
        assert_eq!(quote("a\\b"), "\"a\\\\b\"");
    }

    #[test]
    fn test_instruction_display() {
        let instr = Instruction::new(
            OpCode::MovCtx,
            vec![Operand::name("%r0"), Operand::string("console")],
        );
        assert_eq!(instr.to_string(), "MOV_CTX %r0 \"console\"");

        let call = Instruction::new(OpCode::Call, vec![Operand::name("f"), Operand::Count(2)]);
        assert_eq!(call.to_string(), "CALL f 2");

        let num = Instruction::new(
            OpCode::Mov,
            vec![
                Operand::name("a"),
                Operand::Const(Constant::Number {
                    value: 16.0,
                    raw: "0x10".into(),
                }),
            ],
        );
        assert_eq!(num.to_string(), "MOV a 0x10");
    }

    #[test]
    fn test_module_display() {
        let module = Module {
            main: vec![Instruction::new(
                OpCode::Call,
                vec![Operand::name("main"), Operand::Count(0)],
            )],
            routines: vec![Routine {
                name: "main".into(),
                params: vec!["a".into(), "b".into()],
                registers: 1,
                instructions: vec![
                    Instruction::new(OpCode::Var, vec![Operand::name("%r0")]),
                    Instruction::simple(OpCode::Ret),
                ],
            }],
        };
        assert_eq!(
            module.to_string(),
            "CALL main 0\n\nfunc main(a, b) {\n  VAR %r0\n  RET\n}\n"
        );
        assert_eq!(module.instruction_count(), 3);
        assert!(module.routine("main").is_some());
    }
}
