// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tests for the IR code generator.

use super::*;
use crate::compiler::ir::{Constant, Instruction};
use crate::parser::Parser;
use std::collections::HashSet;

fn parse(src: &str) -> Program {
    Parser::new(src).parse_program().expect("Should parse")
}

fn compile_ok(src: &str) -> Module {
    let program = parse(src);
    let mut compiler = Compiler::new();
    compiler.compile(&program).expect("Compilation should succeed")
}

fn compile_err(src: &str) -> Error {
    let program = parse(src);
    let mut compiler = Compiler::new();
    compiler
        .compile(&program)
        .expect_err("Compilation should fail")
}

fn lines(instructions: &[Instruction]) -> Vec<String> {
    instructions.iter().map(ToString::to_string).collect()
}

#[test]
fn test_compile_empty_program() {
    let module = compile_ok("");
    assert!(module.main.is_empty());
    assert!(module.routines.is_empty());
}

#[test]
fn test_assignment_to_free_name() {
    let module = compile_ok("a = 1");
    assert_eq!(lines(&module.main), vec!["MOV a 1"]);
}

#[test]
fn test_member_chain_reads_deepest_first() {
    let module = compile_ok("a.b.c;");
    assert_eq!(
        lines(&module.main),
        vec![
            "MOV_CTX %r3 \"a\"",
            "MOV %r4 \"b\"",
            "MOV_PROP %r1 %r3 %r4",
            "MOV %r2 \"c\"",
            "MOV_PROP %r0 %r1 %r2",
        ]
    );
    let reads = module
        .main
        .iter()
        .filter(|i| i.opcode == OpCode::MovProp)
        .count();
    assert_eq!(reads, 2);
}

#[test]
fn test_member_assignment_uses_three_register_window() {
    let program = parse("a.b = 1");
    let mut compiler = Compiler::new();
    let module = compiler.compile(&program).unwrap();
    assert_eq!(
        lines(&module.main),
        vec!["MOV_CTX %r1 \"a\"", "MOV %r2 \"b\"", "SET_KEY %r1 %r2 1"]
    );
    assert_eq!(compiler.registers.peak(), 3);
}

#[test]
fn test_computed_member_key() {
    let module = compile_ok("var k = 'x'; o[k] = o[0];");
    assert_eq!(
        lines(&module.main),
        vec![
            "GLOBAL k",
            "MOV k \"x\"",
            "MOV_CTX %r1 \"o\"",
            "MOV %r2 0",
            "MOV_PROP %r0 %r1 %r2",
            "MOV_CTX %r2 \"o\"",
            "MOV %r3 k",
            "SET_KEY %r2 %r3 %r0",
        ]
    );
}

#[test]
fn test_call_pushes_arguments_in_order() {
    let module = compile_ok("f(1, 2)");
    assert_eq!(
        lines(&module.main),
        vec!["MOV %r0 1", "PUSH %r0", "MOV %r0 2", "PUSH %r0", "CALL f 2"]
    );
}

#[test]
fn test_method_call() {
    let module = compile_ok("console.log(\"hi\")");
    assert_eq!(
        lines(&module.main),
        vec![
            "MOV %r0 \"hi\"",
            "PUSH %r0",
            "MOV_CTX %r1 \"console\"",
            "MOV %r2 \"log\"",
            "MOV_PROP %r0 %r1 %r2",
            "CALL_VAR %r1 %r2 1",
        ]
    );
}

#[test]
fn test_call_result_moves_into_destination() {
    let module = compile_ok("var x = f();");
    assert_eq!(lines(&module.main), vec!["GLOBAL x", "CALL f 0", "MOV x %ret"]);
}

#[test]
fn test_function_declaration_becomes_routine() {
    let module = compile_ok("function main() {\n  a = 'good'\n  b = 2\n}\nmain()");
    assert_eq!(lines(&module.main), vec!["CALL main 0"]);

    let main = module.routine("main").expect("routine main");
    assert!(main.params.is_empty());
    assert_eq!(main.registers, 0);
    assert_eq!(lines(&main.instructions), vec!["MOV a \"good\"", "MOV b 2", "RET"]);
}

#[test]
fn test_function_declarations_are_hoisted() {
    let module = compile_ok("run(); if (ok) { function run() {} }");
    assert_eq!(lines(&module.main)[0], "CALL run 0");
    assert!(module.routine("run").is_some());
}

#[test]
fn test_nested_function_gets_synthesized_name_and_alias() {
    let module = compile_ok("function outer() { function inner() { return 1 } return inner() }");
    let names: Vec<&str> = module.routines.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["outer", "%fn0"]);

    let outer = module.routine("outer").unwrap();
    assert_eq!(
        lines(&outer.instructions),
        vec!["VAR %r0", "CALL %fn0 0", "MOV %r0 %ret", "RET %r0", "RET"]
    );
    let inner = module.routine("%fn0").unwrap();
    assert_eq!(lines(&inner.instructions), vec!["RET 1", "RET"]);
}

#[test]
fn test_arrow_argument_is_passed_by_name() {
    let module = compile_ok("setTimeout(() => 1)");
    assert_eq!(
        lines(&module.main),
        vec!["MOV %r0 %fn0", "PUSH %r0", "CALL setTimeout 1"]
    );
    let arrow = module.routine("%fn0").unwrap();
    assert_eq!(lines(&arrow.instructions), vec!["RET 1", "RET"]);
}

#[test]
fn test_function_initializer_is_not_inlined() {
    let module = compile_ok("var add = (a, b) => a + b;\nfunction f() { var g = function () {}; g() }");
    assert!(module.main.is_empty());

    let add = module.routine("add").unwrap();
    assert_eq!(add.params, vec!["a", "b"]);
    assert_eq!(
        lines(&add.instructions),
        vec!["VAR %r0", "ADD %r0 a b", "RET %r0", "RET"]
    );

    let f = module.routine("f").unwrap();
    assert_eq!(lines(&f.instructions), vec!["CALL %fn0 0", "RET"]);
}

#[test]
fn test_locals_resolve_by_name() {
    let module = compile_ok("function g() {}\nfunction f(g) { g() }");
    let f = module.routine("f").unwrap();
    assert_eq!(lines(&f.instructions), vec!["CALL g 0", "RET"]);

    let module = compile_ok("function f() { var x = 1; return x }\nvar x = 2;");
    let f = module.routine("f").unwrap();
    assert_eq!(
        lines(&f.instructions),
        vec!["VAR x", "MOV x 1", "RET x", "RET"]
    );
    assert_eq!(lines(&module.main), vec!["GLOBAL x", "MOV x 2"]);
}

#[test]
fn test_named_function_expression_sees_itself() {
    let module = compile_ok("var fact = function f(n) { return f(n) };");
    let fact = module.routine("fact").unwrap();
    assert_eq!(
        lines(&fact.instructions),
        vec![
            "VAR %r0",
            "VAR %r1",
            "MOV %r1 n",
            "PUSH %r1",
            "CALL fact 1",
            "MOV %r0 %ret",
            "RET %r0",
            "RET",
        ]
    );
}

#[test]
fn test_object_and_array_literals() {
    let module = compile_ok("var obj = { a: 1, b: [x] };");
    assert_eq!(
        lines(&module.main),
        vec![
            "GLOBAL obj",
            "NEW_OBJ %r0",
            "SET_KEY %r0 \"a\" 1",
            "NEW_ARR %r1",
            "SET_KEY %r1 0 x",
            "SET_KEY %r0 \"b\" %r1",
            "MOV obj %r0",
        ]
    );
}

#[test]
fn test_initializer_reading_declared_name_uses_scratch_register() {
    let module = compile_ok("var x = 5; var x = true && x;");
    assert_eq!(
        lines(&module.main),
        vec![
            "GLOBAL x",
            "MOV x 5",
            "GLOBAL x",
            "MOV %r0 true",
            "JF %r0 6",
            "MOV %r0 x",
            "MOV x %r0",
        ]
    );
}

#[test]
fn test_free_undefined_is_a_constant() {
    let module = compile_ok("u = undefined; o = [undefined];");
    assert_eq!(module.main[0].operands[1], Operand::Const(Constant::Undefined));
    assert_eq!(lines(&module.main)[2], "SET_KEY %r0 0 undefined");
    assert_eq!(module.main[2].operands[2], Operand::Const(Constant::Undefined));

    let module = compile_ok("var undefined = 1; u = undefined;");
    assert_eq!(module.main[2].operands[1], Operand::name("undefined"));
}

#[test]
fn test_chained_assignment() {
    let module = compile_ok("window.x = damn.good = 1");
    assert_eq!(
        lines(&module.main),
        vec![
            "MOV_CTX %r2 \"damn\"",
            "MOV %r3 \"good\"",
            "SET_KEY %r2 %r3 1",
            "MOV %r0 1",
            "MOV_CTX %r2 \"window\"",
            "MOV %r3 \"x\"",
            "SET_KEY %r2 %r3 %r0",
        ]
    );
}

#[test]
fn test_compound_assignment() {
    let module = compile_ok("var n = 1; n += 2; o.count *= n;");
    assert_eq!(
        lines(&module.main),
        vec![
            "GLOBAL n",
            "MOV n 1",
            "ADD n n 2",
            "MOV_CTX %r1 \"o\"",
            "MOV %r2 \"count\"",
            "MOV_PROP %r0 %r1 %r2",
            "MUL %r0 %r0 n",
            "SET_KEY %r1 %r2 %r0",
        ]
    );
}

#[test]
fn test_update_expressions() {
    let module = compile_ok("var i = 0; y = i++; ++i;");
    assert_eq!(
        lines(&module.main),
        vec![
            "GLOBAL i",
            "MOV i 0",
            "MOV %r0 i",
            "ADD i i 1",
            "MOV y %r0",
            "ADD i i 1",
        ]
    );
}

#[test]
fn test_logical_short_circuit() {
    let module = compile_ok("x = a && b");
    assert_eq!(
        lines(&module.main),
        vec![
            "MOV_CTX %r0 \"a\"",
            "JF %r0 3",
            "MOV_CTX %r0 \"b\"",
            "MOV x %r0",
        ]
    );
}

#[test]
fn test_while_labels_shift_past_slots() {
    let module = compile_ok("function f(n) { while (n > 0) { n = n - 1 } return n }");
    let f = module.routine("f").unwrap();
    assert_eq!(
        lines(&f.instructions),
        vec![
            "VAR %r0",
            "GT %r0 n 0",
            "JF %r0 6",
            "SUB %r0 n 1",
            "MOV n %r0",
            "JMP 1",
            "RET n",
            "RET",
        ]
    );
}

#[test]
fn test_if_else() {
    let module = compile_ok("if (x) { y = 1 } else { y = 2 }");
    assert_eq!(
        lines(&module.main),
        vec!["JF x 3", "MOV y 1", "JMP 4", "MOV y 2"]
    );
}

#[test]
fn test_for_loop() {
    let module = compile_ok("for (var i = 0; i < 3; i++) { total = total + i }");
    assert_eq!(
        lines(&module.main),
        vec![
            "GLOBAL i",
            "MOV i 0",
            "LT %r0 i 3",
            "JF %r0 8",
            "ADD %r0 total i",
            "MOV total %r0",
            "ADD i i 1",
            "JMP 2",
        ]
    );
}

#[test]
fn test_unary_and_typeof() {
    let module = compile_ok("t = typeof missing; n = -x; b = !x;");
    assert_eq!(
        lines(&module.main),
        vec![
            "TYPEOF %r0 missing",
            "MOV t %r0",
            "NEG %r0 x",
            "MOV n %r0",
            "NOT %r0 x",
            "MOV b %r0",
        ]
    );
}

#[test]
fn test_unsupported_assignment_target() {
    assert_eq!(
        compile_err("f() = 1"),
        Error::UnsupportedAssignmentTarget("call expression".into())
    );
    assert!(matches!(compile_err("f()++"), Error::Unsupported(_)));
}

#[test]
fn test_registers_balanced_and_peak_recorded() {
    let program = parse("a.b.c; f(g(1), h.i(2, 3));");
    let mut compiler = Compiler::new();
    compiler.compile(&program).unwrap();
    assert_eq!(compiler.registers.live(), 0);
    assert_eq!(compiler.registers.allocations(), compiler.registers.frees());
    assert_eq!(compiler.registers.peak(), 5);
}

#[test]
fn test_routine_slots_match_peak() {
    let module = compile_ok("function f(o) { return o.a.b }");
    let f = module.routine("f").unwrap();
    assert_eq!(f.registers, 5);
    for (i, instruction) in f.instructions.iter().take(f.registers).enumerate() {
        assert_eq!(instruction.to_string(), format!("VAR %r{}", i));
    }
    assert_eq!(f.instructions.last().unwrap().to_string(), "RET");
}

#[test]
fn test_synthesized_names_unique() {
    let module = compile_ok(
        "a(() => 1); b(() => 2); function f() { var g = () => 3; function h() { c(() => 4) } }",
    );
    let names: HashSet<&str> = module.routines.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names.len(), module.routines.len());
    assert_eq!(module.routines.len(), 6);
}

#[test]
fn test_function_offset() {
    let program = parse("run(() => 1)");
    let mut compiler = Compiler::with_function_offset(5);
    let module = compiler.compile(&program).unwrap();
    assert!(module.routine("%fn5").is_some());
    assert_eq!(compiler.function_index(), 6);
}

#[test]
fn test_compilation_is_deterministic() {
    let src = "var o = { a: 1 }; function f(x) { if (x) { return o.a } return g(x, 2) }\nf(1)";
    assert_eq!(compile_ok(src).to_string(), compile_ok(src).to_string());
}
