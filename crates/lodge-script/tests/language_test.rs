//! Language integration tests
//!
//! Exercise the engine end to end through `Engine::eval`.

use lodge_script::{Engine, Error, Value};

fn eval(source: &str) -> String {
    Engine::new().eval(source).unwrap().to_string()
}

#[test]
fn test_arithmetic() {
    assert_eq!(eval("5 + 3;"), "8");
    assert_eq!(eval("10 - 4;"), "6");
    assert_eq!(eval("6 * 7;"), "42");
    assert_eq!(eval("15 / 3;"), "5");
    assert_eq!(eval("17 % 5;"), "2");
    assert_eq!(eval("1 / 0;"), "Infinity");
    assert_eq!(eval("0.1 * 3;"), "0.30000000000000004");
}

#[test]
fn test_comparison() {
    assert_eq!(eval("5 == 5;"), "true");
    assert_eq!(eval("5 != 3;"), "true");
    assert_eq!(eval("'5' === 5;"), "false");
    assert_eq!(eval("5 <= 5;"), "true");
    assert_eq!(eval("NaN == NaN;"), "false");
}

#[test]
fn test_typeof() {
    assert_eq!(eval("typeof 1;"), "number");
    assert_eq!(eval("typeof 'x';"), "string");
    assert_eq!(eval("typeof null;"), "object");
    assert_eq!(eval("typeof [];"), "object");
    assert_eq!(eval("typeof function () {};"), "function");
    assert_eq!(eval("typeof nothing;"), "undefined");
}

#[test]
fn test_conditional_and_logical() {
    assert_eq!(eval("true ? 'yes' : 'no';"), "yes");
    assert_eq!(eval("let v = null; v || 'default';"), "default");
    assert_eq!(eval("!'';"), "true");
}

#[test]
fn test_recursion() {
    let source = "
        function fib(n) {
            if (n < 2) { return n; }
            return fib(n - 1) + fib(n - 2);
        }
        fib(15);
    ";
    assert_eq!(eval(source), "610");
}

#[test]
fn test_closures_share_scope() {
    let source = "
        function pair() {
            let value = 0;
            return {
                get: function () { return value; },
                set: function (v) { value = v; }
            };
        }
        const p = pair();
        p.set(9);
        p.get();
    ";
    assert_eq!(eval(source), "9");
}

#[test]
fn test_object_and_array_inspection() {
    assert_eq!(
        eval("({ name: 'lodge', tags: ['a', 'b'], nested: { deep: true } });"),
        "{ name: 'lodge', tags: [ 'a', 'b' ], nested: { deep: true } }"
    );
    assert_eq!(eval("[1, [2, 3]].length;"), "2");
    assert_eq!(eval("'héllo'.length;"), "5");
}

#[test]
fn test_while_loop_builds_array() {
    let source = "
        const out = [];
        let i = 0;
        while (i < 4) { out.push(i * i); i += 1; }
        out.join(' ');
    ";
    assert_eq!(eval(source), "0 1 4 9");
}

#[test]
fn test_comments_are_ignored() {
    assert_eq!(eval("// leading\n/* block */ 1 + /* inline */ 1;"), "2");
}

#[test]
fn test_errors() {
    let mut engine = Engine::new();
    assert!(matches!(engine.eval("let x = ;"), Err(Error::SyntaxError(_))));
    assert!(matches!(engine.eval("undeclared = 1;"), Err(Error::ReferenceError(_))));
    assert!(matches!(engine.eval("null.x;"), Err(Error::TypeError(_))));
    assert!(matches!(engine.eval("throw { code: 1 };"), Err(Error::Thrown(Value::Object(_)))));
}

#[test]
fn test_deeply_nested_source_is_syntax_error() {
    let mut engine = Engine::new();
    let arrays = format!("{}1{};", "[".repeat(300), "]".repeat(300));
    assert!(matches!(
        engine.eval(&arrays),
        Err(Error::SyntaxError(msg)) if msg.contains("Maximum nesting depth")
    ));
    assert!(matches!(engine.eval(&"(".repeat(50_000)), Err(Error::SyntaxError(_))));

    let shallow = format!("{}1{}.length;", "[".repeat(100), "]".repeat(100));
    assert_eq!(engine.eval(&shallow).unwrap(), Value::Number(1.0));
}

#[test]
fn test_unbounded_recursion_is_range_error() {
    let mut engine = Engine::new();
    let result = engine.eval("function f(n) { return f(n + 1) + 1; } f(0);");
    assert!(matches!(result, Err(Error::RangeError(msg)) if msg == "Maximum call stack size exceeded"));

    // The engine stays usable afterwards.
    assert_eq!(engine.eval("f = function (n) { return n; }; f(7);").unwrap(), Value::Number(7.0));
}

#[test]
fn test_recursion_through_call_is_range_error() {
    let mut engine = Engine::new();
    engine.eval("function loop() { return loop(); }").unwrap();
    let f = engine.get("loop").unwrap();
    assert!(matches!(engine.call(&f, vec![]), Err(Error::RangeError(_))));
}

#[test]
fn test_huge_array_index_is_range_error() {
    let mut engine = Engine::new();
    assert!(matches!(
        engine.eval("let a = []; a[1000000000000000] = 1;"),
        Err(Error::RangeError(msg)) if msg == "Invalid array length"
    ));
    assert_eq!(engine.eval("a.length;").unwrap(), Value::Number(0.0));
}
