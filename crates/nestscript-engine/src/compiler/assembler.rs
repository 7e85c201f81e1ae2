// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Reads IR text back into a [`Module`].
//!
//! The accepted format is exactly what `Module`'s `Display` produces, plus
//! blank lines and `#` comment lines anywhere.

use super::ir::{Constant, Instruction, Module, OpCode, Operand, OperandKind, Routine};
use crate::Error;
use crate::runtime::value::parse_number_literal;

/// Parses IR text into a module.
pub fn parse_module(text: &str) -> Result<Module, Error> {
    let mut module = Module::new();
    let mut main = Vec::new();
    // Open routine header, its line, and its body so far
    let mut open: Option<(Routine, usize, Vec<(Instruction, usize)>)> = None;

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(header) = line.strip_prefix("func ") {
            if open.is_some() {
                return Err(assembly(line_no, "nested 'func' block"));
            }
            open = Some((parse_header(header, line_no)?, line_no, Vec::new()));
            continue;
        }

        if line == "}" {
            let Some((mut routine, _, body)) = open.take() else {
                return Err(assembly(line_no, "unexpected '}'"));
            };
            routine.instructions = finish_list(body)?;
            routine.registers = count_slots(&routine.instructions);
            module.routines.push(routine);
            continue;
        }

        let instruction = parse_instruction(line, line_no)?;
        match &mut open {
            Some((_, _, body)) => body.push((instruction, line_no)),
            None => main.push((instruction, line_no)),
        }
    }

    if let Some((routine, header_line, _)) = open {
        return Err(assembly(
            header_line,
            &format!("unterminated 'func {}' block", routine.name),
        ));
    }

    module.main = finish_list(main)?;
    Ok(module)
}

/// Parses a single instruction line.
pub fn parse_instruction(line: &str, line_no: usize) -> Result<Instruction, Error> {
    let tokens = tokenize(line, line_no)?;
    let Some((Token::Bare(mnemonic), rest)) = tokens.split_first() else {
        return Err(assembly(line_no, "expected an opcode"));
    };
    let opcode =
        OpCode::from_mnemonic(mnemonic).ok_or_else(|| Error::UnknownOpcode(mnemonic.clone()))?;

    let kinds = opcode.operand_kinds();
    if rest.len() < opcode.min_operands() || rest.len() > kinds.len() {
        let expected = if opcode.min_operands() == kinds.len() {
            kinds.len().to_string()
        } else {
            format!("{} to {}", opcode.min_operands(), kinds.len())
        };
        return Err(assembly(
            line_no,
            &format!(
                "{} expects {} operand(s), found {}",
                opcode,
                expected,
                rest.len()
            ),
        ));
    }

    let operands = rest
        .iter()
        .zip(kinds)
        .map(|(token, &kind)| parse_operand(token, kind, line_no))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Instruction::new(opcode, operands))
}

fn parse_header(header: &str, line_no: usize) -> Result<Routine, Error> {
    let malformed = || assembly(line_no, "malformed header, expected 'func name(params) {'");

    let header = header.trim_end();
    let header = header.strip_suffix('{').ok_or_else(malformed)?.trim_end();
    let (name, params) = header.split_once('(').ok_or_else(malformed)?;
    let params = params.strip_suffix(')').ok_or_else(malformed)?;

    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(malformed());
    }

    let params = params
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect();

    Ok(Routine {
        name: name.to_string(),
        params,
        registers: 0,
        instructions: Vec::new(),
    })
}

/// Checks jump targets against the finished list.
fn finish_list(list: Vec<(Instruction, usize)>) -> Result<Vec<Instruction>, Error> {
    let len = list.len();
    for (instruction, line_no) in list.iter().filter(|(i, _)| i.opcode.is_jump()) {
        if let Some(Operand::Label(target)) = instruction.operands.last() {
            if *target > len {
                return Err(assembly(
                    *line_no,
                    &format!("jump target {} is out of range", target),
                ));
            }
        }
    }
    Ok(list.into_iter().map(|(instruction, _)| instruction).collect())
}

/// Number of leading `VAR %r0`, `VAR %r1`, ... slot declarations.
fn count_slots(instructions: &[Instruction]) -> usize {
    instructions
        .iter()
        .enumerate()
        .take_while(|(i, instr)| {
            instr.opcode == OpCode::Var
                && instr.operands.len() == 1
                && instr.operands[0].as_name() == Some(format!("%r{}", i).as_str())
        })
        .count()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Bare(String),
    Str(String),
}

fn tokenize(line: &str, line_no: usize) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch == '"' {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next() {
                    None => return Err(assembly(line_no, "unterminated string")),
                    Some('"') => break,
                    Some('\\') => value.push(unescape(&mut chars, line_no)?),
                    Some(c) => value.push(c),
                }
            }
            tokens.push(Token::Str(value));
            continue;
        }

        let mut word = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            word.push(c);
            chars.next();
        }
        tokens.push(Token::Bare(word));
    }

    Ok(tokens)
}

fn unescape(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    line_no: usize,
) -> Result<char, Error> {
    match chars.next() {
        Some('"') => Ok('"'),
        Some('\\') => Ok('\\'),
        Some('n') => Ok('\n'),
        Some('r') => Ok('\r'),
        Some('t') => Ok('\t'),
        Some('0') => Ok('\0'),
        Some('u') => {
            let hex: String = chars.by_ref().take(4).collect();
            u32::from_str_radix(&hex, 16)
                .ok()
                .filter(|_| hex.len() == 4)
                .and_then(char::from_u32)
                .ok_or_else(|| assembly(line_no, "malformed \\u escape"))
        }
        Some(other) => Err(assembly(line_no, &format!("unknown escape '\\{}'", other))),
        None => Err(assembly(line_no, "unterminated string")),
    }
}

fn parse_operand(token: &Token, kind: OperandKind, line_no: usize) -> Result<Operand, Error> {
    match (kind, token) {
        (OperandKind::Value | OperandKind::Str, Token::Str(s)) => {
            Ok(Operand::Const(Constant::String(s.clone())))
        }
        (OperandKind::Str, Token::Bare(word)) => Err(assembly(
            line_no,
            &format!("expected a string, found '{}'", word),
        )),
        (OperandKind::Count, Token::Bare(word)) => word
            .parse()
            .map(Operand::Count)
            .map_err(|_| assembly(line_no, &format!("expected an argument count, found '{}'", word))),
        (OperandKind::Label, Token::Bare(word)) => word
            .parse()
            .map(Operand::Label)
            .map_err(|_| assembly(line_no, &format!("expected a jump target, found '{}'", word))),
        (OperandKind::Value, Token::Bare(word)) => match parse_constant(word, line_no)? {
            Some(constant) => Ok(Operand::Const(constant)),
            None => Ok(Operand::Name(word.clone())),
        },
        (OperandKind::Name, Token::Bare(word)) => match parse_constant(word, line_no)? {
            Some(_) => Err(assembly(
                line_no,
                &format!("expected a name, found literal '{}'", word),
            )),
            None => Ok(Operand::Name(word.clone())),
        },
        (_, Token::Str(s)) => Err(assembly(
            line_no,
            &format!("unexpected string \"{}\"", s),
        )),
    }
}

/// Classifies a bare word: `Some` for literals, `None` for names.
fn parse_constant(word: &str, line_no: usize) -> Result<Option<Constant>, Error> {
    let constant = match word {
        "true" => Constant::Boolean(true),
        "false" => Constant::Boolean(false),
        "null" => Constant::Null,
        "undefined" => Constant::Undefined,
        _ => {
            let unsigned = word.strip_prefix('-').unwrap_or(word);
            if !unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
                return Ok(None);
            }
            let magnitude = parse_number_literal(unsigned)
                .ok_or_else(|| assembly(line_no, &format!("malformed number '{}'", word)))?;
            let value = if unsigned.len() < word.len() {
                -magnitude
            } else {
                magnitude
            };
            Constant::Number {
                value,
                raw: word.to_string(),
            }
        }
    };
    Ok(Some(constant))
}

fn assembly(line: usize, message: &str) -> Error {
    Error::Assembly {
        line,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_main_and_routine() {
        let text = "\
# comment
CALL main 0

func main(a, b) {
  VAR %r0
  MOV_CTX %r0 \"console\"
  MOV a \"good\"
  RET
}
";
        let module = parse_module(text).unwrap();
        assert_eq!(module.main.len(), 1);
        let routine = module.routine("main").unwrap();
        assert_eq!(routine.params, vec!["a", "b"]);
        assert_eq!(routine.registers, 1);
        assert_eq!(routine.instructions.len(), 4);
        assert_eq!(
            routine.instructions[1].operands[1],
            Operand::string("console")
        );
    }

    #[test]
    fn test_operand_classification() {
        let instr = parse_instruction("SET_KEY %r0 %r1 1", 1).unwrap();
        assert_eq!(instr.operands[0], Operand::name("%r0"));
        assert!(matches!(
            instr.operands[2],
            Operand::Const(Constant::Number { value, .. }) if value == 1.0
        ));

        let instr = parse_instruction("MOV x null", 1).unwrap();
        assert_eq!(instr.operands[1], Operand::Const(Constant::Null));

        let instr = parse_instruction("JF %r0 7", 1).unwrap();
        assert_eq!(instr.operands[1], Operand::Label(7));
    }

    #[test]
    fn test_string_escapes() {
        let instr = parse_instruction(r#"MOV a "say \"hi\"\nA""#, 1).unwrap();
        assert_eq!(instr.operands[1], Operand::string("say \"hi\"\nA"));
    }

    #[test]
    fn test_unknown_opcode() {
        assert_eq!(
            parse_module("FROB a b"),
            Err(Error::UnknownOpcode("FROB".into()))
        );
    }

    #[test]
    fn test_operand_errors_carry_line() {
        let err = parse_module("MOV a 1\nMOV a").unwrap_err();
        assert!(matches!(err, Error::Assembly { line: 2, .. }));

        let err = parse_module("MOV_CTX %r0 console").unwrap_err();
        assert!(matches!(err, Error::Assembly { line: 1, .. }));

        let err = parse_module("MOV 1 a").unwrap_err();
        assert!(matches!(err, Error::Assembly { line: 1, .. }));

        let err = parse_module("MOV a \"open").unwrap_err();
        assert!(matches!(err, Error::Assembly { line: 1, .. }));
    }

    #[test]
    fn test_block_errors() {
        let err = parse_module("RET\n}").unwrap_err();
        assert!(matches!(err, Error::Assembly { line: 2, .. }));

        let err = parse_module("\nfunc f() {\n  RET").unwrap_err();
        assert!(matches!(err, Error::Assembly { line: 2, .. }));

        let err = parse_module("func f() {\nfunc g() {\n}\n}").unwrap_err();
        assert!(matches!(err, Error::Assembly { line: 2, .. }));
    }

    #[test]
    fn test_jump_target_range() {
        assert!(parse_module("JMP 1").is_ok());
        let err = parse_module("JMP 5").unwrap_err();
        assert!(matches!(err, Error::Assembly { line: 1, .. }));
    }

    #[test]
    fn test_display_then_parse() {
        let text = "GLOBAL x\nMOV x -1.5e3\nJT x 0\n\nfunc %fn0() {\n  VAR %r0\n  VAR %r1\n  RET %r1\n}\n";
        let module = parse_module(text).unwrap();
        assert_eq!(module.to_string(), text);
        assert_eq!(module.routine("%fn0").unwrap().registers, 2);
    }
}
