//! End-to-end tests: source text through the parser, code generator,
//! IR text form and VM.

use nestscript_engine::builtins::ConsoleSink;
use nestscript_engine::compiler::parse_module;
use nestscript_engine::{Engine, Error, HostContext, Value, VmConfig};

fn run(source: &str) -> nestscript_engine::SymbolTable {
    Engine::new().run(source).unwrap()
}

fn number(symbols: &nestscript_engine::SymbolTable, name: &str) -> f64 {
    match symbols.get(name) {
        Some(Value::Number(n)) => *n,
        other => panic!("{} is not a number: {:?}", name, other),
    }
}

#[test]
fn test_assignment_to_free_name_creates_global() {
    let symbols = run("a = 1");
    assert_eq!(symbols.get("a"), Some(&Value::Number(1.0)));
    assert_eq!(symbols.len(), 1);
}

#[test]
fn test_host_object_mutated_through_member_assignment() {
    let target = Value::new_object();
    let mut host = HostContext::new();
    host.define("a", target.clone());

    let mut engine = Engine::with_host(host, VmConfig::default());
    engine.run("a.b = 1; a.c = { d: 'x' }; a.c.d = a.c.d + 'y';").unwrap();

    let b = target.get_property(&Value::from("b")).unwrap();
    assert_eq!(b, Value::Number(1.0));
    let c = target.get_property(&Value::from("c")).unwrap();
    assert_eq!(c.get_property(&Value::from("d")).unwrap(), Value::from("xy"));
}

#[test]
fn test_arguments_arrive_in_order() {
    let symbols = run("function f(a, b) { return a - b; } r = f(10, 4);");
    assert_eq!(number(&symbols, "r"), 6.0);
}

#[test]
fn test_nested_calls_keep_argument_order() {
    let symbols = run(
        "function sub(a, b) { return a - b; }\n\
         r = sub(sub(20, 5), sub(4, 1));",
    );
    assert_eq!(number(&symbols, "r"), 12.0);
}

#[test]
fn test_locals_shadow_globals() {
    let symbols = run("var x = 1; function f() { var x = 2; return x; } y = f();");
    assert_eq!(number(&symbols, "x"), 1.0);
    assert_eq!(number(&symbols, "y"), 2.0);
}

#[test]
fn test_hoisted_function_called_before_declaration() {
    let symbols = run("r = twice(21); function twice(n) { return n * 2; }");
    assert_eq!(number(&symbols, "r"), 42.0);
}

#[test]
fn test_nested_function_and_arrow() {
    let symbols = run(
        "function outer() {\n\
           function inner(n) { return n + 1; }\n\
           var half = n => n / 2;\n\
           return inner(half(8));\n\
         }\n\
         r = outer();",
    );
    assert_eq!(number(&symbols, "r"), 5.0);
}

#[test]
fn test_named_function_expression_recurses() {
    let symbols = run(
        "var fact = function f(n) { if (n <= 1) { return 1; } return n * f(n - 1); };\n\
         r = fact(5);",
    );
    assert_eq!(number(&symbols, "r"), 120.0);
}

#[test]
fn test_loops_and_updates() {
    let symbols = run(
        "var s = 0;\n\
         for (var i = 0; i < 5; i++) { s += i; }\n\
         var n = 10;\n\
         while (n > 0) { n -= 3; }",
    );
    assert_eq!(number(&symbols, "s"), 10.0);
    assert_eq!(number(&symbols, "i"), 5.0);
    assert_eq!(number(&symbols, "n"), -2.0);
}

#[test]
fn test_if_else_and_logical_operators() {
    let symbols = run(
        "var grade;\n\
         var score = 72;\n\
         if (score >= 90) { grade = 'A'; } else if (score >= 70) { grade = 'C'; } else { grade = 'F'; }\n\
         d = null || 'fallback';\n\
         z = 0 && explode();",
    );
    assert_eq!(symbols["grade"], Value::from("C"));
    assert_eq!(symbols["d"], Value::from("fallback"));
    assert_eq!(number(&symbols, "z"), 0.0);
}

#[test]
fn test_objects_and_arrays() {
    let symbols = run(
        "var o = { a: 1, b: [1, 'two'] };\n\
         o.a += 5;\n\
         o['c'] = o.b.length;\n\
         first = o.b[0];\n\
         count = o.c;",
    );
    assert_eq!(number(&symbols, "first"), 1.0);
    assert_eq!(number(&symbols, "count"), 2.0);
    assert_eq!(symbols["o"].inspect(), "{ a: 6, b: [ 1, 'two' ], c: 2 }");
}

#[test]
fn test_typeof_and_equality() {
    let symbols = run(
        "t = typeof nothing;\n\
         u = typeof 'x';\n\
         loose = 1 == '1';\n\
         strict = 1 === '1';",
    );
    assert_eq!(symbols["t"], Value::from("undefined"));
    assert_eq!(symbols["u"], Value::from("string"));
    assert_eq!(symbols["loose"], Value::Boolean(true));
    assert_eq!(symbols["strict"], Value::Boolean(false));
}

#[test]
fn test_console_output_is_captured() {
    let (sink, lines) = ConsoleSink::capture();
    let mut engine = Engine::with_host(HostContext::with_console(sink), VmConfig::default());
    engine
        .run("var name = 'world'; console.log('hello', name, 1 + 2); console.log({ k: [1] });")
        .unwrap();

    assert_eq!(
        lines.borrow().as_slice(),
        ["hello world 3".to_string(), "{ k: [ 1 ] }".to_string()]
    );
}

#[test]
fn test_printed_ir_assembles_to_same_behavior() {
    let source = "function add(a, b) { return a + b; }\n\
                  var f = x => add(x, 1);\n\
                  var total = 0;\n\
                  for (var i = 0; i < 3; i++) { total = total + f(i); }";

    let mut engine = Engine::new();
    let module = engine.compile(source).unwrap();
    let text = module.to_string();
    let reassembled = parse_module(&text).unwrap();
    assert_eq!(reassembled, module);
    assert_eq!(reassembled.to_string(), text);

    let direct = Engine::new().execute(&module).unwrap();
    let assembled = Engine::new().execute(&reassembled).unwrap();
    assert_eq!(direct, assembled);
    assert_eq!(number(&direct, "total"), 6.0);
}

#[test]
fn test_globals_and_functions_survive_between_runs() {
    let mut engine = Engine::new();
    engine.run("var inc = n => n + 1; var count = 1;").unwrap();
    let symbols = engine.run("count = inc(count); count = inc(count);").unwrap();
    assert_eq!(number(&symbols, "count"), 3.0);
}

#[test]
fn test_call_routine_from_rust() {
    let mut engine = Engine::new();
    engine.run("function greet(name) { return 'hi ' + name; }").unwrap();
    let result = engine.vm_mut().call("greet", &[Value::from("ann")]).unwrap();
    assert_eq!(result, Value::from("hi ann"));
}

#[test]
fn test_unbounded_recursion_is_range_error() {
    let config = VmConfig {
        max_call_depth: 64,
        max_steps: None,
    };
    let mut engine = Engine::with_host(HostContext::new(), config);
    let err = engine.run("function f() { return f(); } f();").unwrap_err();
    assert!(matches!(err, Error::RangeError(_)));
}

#[test]
fn test_step_limit_stops_infinite_loop() {
    let config = VmConfig {
        max_call_depth: 256,
        max_steps: Some(1_000),
    };
    let mut engine = Engine::with_host(HostContext::new(), config);
    let err = engine.run("while (true) { x = 1; }").unwrap_err();
    assert!(matches!(err, Error::RangeError(_)));
}

#[test]
fn test_runtime_errors() {
    let mut engine = Engine::new();
    assert!(matches!(engine.run("x = y;"), Err(Error::ReferenceError(_))));
    assert!(matches!(engine.run("u = undefined; u.p = 1;"), Err(Error::TypeError(_))));
    assert!(matches!(engine.run("n = 1; n();"), Err(Error::TypeError(_))));
}

#[test]
fn test_compile_errors() {
    let mut engine = Engine::new();
    assert!(matches!(engine.run("var = 1"), Err(Error::SyntaxError(_))));
    assert!(matches!(
        engine.run("f() = 1"),
        Err(Error::UnsupportedAssignmentTarget(_))
    ));
    assert!(matches!(engine.run("return 1"), Err(Error::SyntaxError(_))));
}

#[test]
fn test_self_referencing_array_converts_to_string() {
    let symbols = run(
        "var a = [];\n\
         a[0] = a;\n\
         a[1] = 2;\n\
         s = a + '';\n\
         n = -a;\n\
         same = a == ',2';",
    );
    assert_eq!(symbols["s"], Value::from(",2"));
    assert!(number(&symbols, "n").is_nan());
    assert_eq!(symbols["same"], Value::Boolean(true));
}

#[test]
fn test_array_growth_beyond_dense_limit_is_range_error() {
    let mut engine = Engine::new();
    assert!(matches!(
        engine.run("var a = []; a.length = 1e12;"),
        Err(Error::RangeError(_))
    ));
    assert!(matches!(
        engine.run("var b = []; b[4294967294] = 1;"),
        Err(Error::RangeError(_))
    ));
    assert!(matches!(
        engine.run("var c = []; c.length = -1;"),
        Err(Error::RangeError(_))
    ));

    let symbols = engine.run("var d = [1, 2, 3]; d.length = 1; len = d.length;").unwrap();
    assert_eq!(number(&symbols, "len"), 1.0);
}

#[test]
fn test_redeclaration_reads_previous_value() {
    let symbols = run(
        "var x = 5; var x = true && x;\n\
         var y = 0; var y = y || 7;\n\
         var a = 1; var a = { v: a };\n\
         var l = 4; var l = [l, l];\n\
         var c = 3; var c = c++;\n\
         av = a.v;\n\
         l1 = l[1];",
    );
    assert_eq!(number(&symbols, "x"), 5.0);
    assert_eq!(number(&symbols, "y"), 7.0);
    assert_eq!(number(&symbols, "av"), 1.0);
    assert_eq!(number(&symbols, "l1"), 4.0);
    assert_eq!(number(&symbols, "c"), 3.0);
}

#[test]
fn test_undefined_survives_ir_round_trip() {
    let source = "u = undefined;\n\
                  var o = { k: undefined };\n\
                  o[undefined] = 1;\n\
                  var n = 0;\n\
                  n += undefined;\n\
                  t = typeof undefined;";

    let module = Engine::new().compile(source).unwrap();
    let reassembled = parse_module(&module.to_string()).unwrap();
    assert_eq!(reassembled, module);

    let direct = Engine::with_host(HostContext::new(), VmConfig::default())
        .execute(&module)
        .unwrap();
    let assembled = Engine::with_host(HostContext::new(), VmConfig::default())
        .execute(&reassembled)
        .unwrap();
    assert_eq!(direct, assembled);
    assert_eq!(direct["u"], Value::Undefined);
    assert!(number(&direct, "n").is_nan());
    assert_eq!(direct["t"], Value::from("undefined"));
    assert_eq!(direct["o"].inspect(), "{ k: undefined, undefined: 1 }");
}
