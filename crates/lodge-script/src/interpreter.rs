//! Tree-walking evaluator for module scripts.

use crate::Error;
use crate::ast::*;
use crate::runtime::value::number_to_string;
use crate::runtime::{ArrayRef, Callable, Environment, ObjectRef, ScriptFunction, Value};
use crate::stack::{DepthGuard, with_script_stack};
use std::sync::Arc;

/// How a statement finished.
enum Completion {
    /// Ran to the end; carries the value of the last expression statement
    Normal(Value),
    /// Hit a `return`
    Return(Value),
}

/// Executes programs against an [`Environment`].
///
/// Every statement, expression and call counts against the per-thread
/// [`MAX_EVAL_DEPTH`](crate::stack::MAX_EVAL_DEPTH); running out is a
/// `RangeError`.
#[derive(Debug, Default)]
pub struct Interpreter;

impl Interpreter {
    /// Creates a new interpreter.
    pub fn new() -> Self {
        Self
    }

    /// Runs a program to completion in `env`.
    ///
    /// Returns the value of a top-level `return`, or else the value of the last
    /// expression statement executed.
    pub fn run(&mut self, program: &Program, env: &Environment) -> Result<Value, Error> {
        with_script_stack(|| match self.execute_block(&program.body, env)? {
            Completion::Normal(value) | Completion::Return(value) => Ok(value),
        })
    }

    /// Calls a function value with the given arguments.
    pub fn call(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, Error> {
        with_script_stack(|| self.call_value(callee, args))
    }

    fn call_value(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, Error> {
        let Value::Function(callable) = callee else {
            return Err(Error::TypeError(format!(
                "{} is not a function",
                callee.inspect()
            )));
        };

        let _frame = DepthGuard::enter()?;
        match callable.as_ref() {
            Callable::Native { func, .. } => func(&args),
            Callable::Function(func) => self.call_script_function(func, args),
        }
    }

    fn call_script_function(
        &mut self,
        func: &ScriptFunction,
        args: Vec<Value>,
    ) -> Result<Value, Error> {
        let env = Environment::with_outer(&func.closure);
        let mut args = args.into_iter();
        for param in &func.params {
            env.define(param, args.next().unwrap_or_default());
        }

        match self.execute_block(&func.body, &env)? {
            Completion::Return(value) => Ok(value),
            Completion::Normal(_) => Ok(Value::Undefined),
        }
    }

    fn execute_block(&mut self, body: &[Statement], env: &Environment) -> Result<Completion, Error> {
        // Function declarations are visible throughout their block.
        for stmt in body {
            if let Statement::FunctionDeclaration(decl) = stmt {
                if let Some(id) = &decl.id {
                    env.define(&id.name, make_closure(decl, env));
                }
            }
        }

        let mut last = Value::Undefined;
        for stmt in body {
            match self.execute(stmt, env)? {
                Completion::Return(value) => return Ok(Completion::Return(value)),
                Completion::Normal(value) => last = value,
            }
        }
        Ok(Completion::Normal(last))
    }

    fn execute(&mut self, stmt: &Statement, env: &Environment) -> Result<Completion, Error> {
        let _frame = DepthGuard::enter()?;
        match stmt {
            Statement::VariableDeclaration(decl) => {
                for declarator in &decl.declarations {
                    let value = match &declarator.init {
                        Some(init) => self.evaluate(init, env)?,
                        None => Value::Undefined,
                    };
                    env.declare(&declarator.id.name, value, decl.kind)?;
                }
                Ok(Completion::Normal(Value::Undefined))
            }
            Statement::FunctionDeclaration(_) | Statement::Empty => {
                Ok(Completion::Normal(Value::Undefined))
            }
            Statement::Expression(expr) => Ok(Completion::Normal(self.evaluate(expr, env)?)),
            Statement::Block(body) => self.execute_block(body, &Environment::with_outer(env)),
            Statement::If(stmt) => {
                if self.evaluate(&stmt.test, env)?.to_boolean() {
                    self.execute(&stmt.consequent, env)
                } else if let Some(alternate) = &stmt.alternate {
                    self.execute(alternate, env)
                } else {
                    Ok(Completion::Normal(Value::Undefined))
                }
            }
            Statement::While(stmt) => {
                while self.evaluate(&stmt.test, env)?.to_boolean() {
                    if let Completion::Return(value) = self.execute(&stmt.body, env)? {
                        return Ok(Completion::Return(value));
                    }
                }
                Ok(Completion::Normal(Value::Undefined))
            }
            Statement::Return(argument) => {
                let value = match argument {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }
            Statement::Throw(expr) => Err(Error::Thrown(self.evaluate(expr, env)?)),
        }
    }

    fn evaluate(&mut self, expr: &Expression, env: &Environment) -> Result<Value, Error> {
        let _frame = DepthGuard::enter()?;
        match expr {
            Expression::Literal(literal) => Ok(match literal {
                Literal::Null => Value::Null,
                Literal::Boolean(b) => Value::Boolean(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::String(s.clone()),
            }),
            Expression::Identifier(id) => env
                .get(&id.name)
                .ok_or_else(|| Error::ReferenceError(format!("{} is not defined", id.name))),
            Expression::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element, env)?);
                }
                Ok(Value::Array(ArrayRef::from(values)))
            }
            Expression::Object(properties) => {
                let obj = ObjectRef::new();
                for property in properties {
                    let value = self.evaluate(&property.value, env)?;
                    obj.set(property.key.clone(), value);
                }
                Ok(Value::Object(obj))
            }
            Expression::Function(decl) => Ok(make_closure(decl, env)),
            Expression::Unary(unary) => self.evaluate_unary(unary, env),
            Expression::Binary(binary) => {
                let left = self.evaluate(&binary.left, env)?;
                let right = self.evaluate(&binary.right, env)?;
                Ok(binary_op(binary.operator, &left, &right))
            }
            Expression::Logical(logical) => {
                let left = self.evaluate(&logical.left, env)?;
                let short_circuit = match logical.operator {
                    LogicalOperator::And => !left.to_boolean(),
                    LogicalOperator::Or => left.to_boolean(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(&logical.right, env)
                }
            }
            Expression::Conditional(cond) => {
                if self.evaluate(&cond.test, env)?.to_boolean() {
                    self.evaluate(&cond.consequent, env)
                } else {
                    self.evaluate(&cond.alternate, env)
                }
            }
            Expression::Assignment(assign) => self.evaluate_assignment(assign, env),
            Expression::Member(member) => {
                let object = self.evaluate(&member.object, env)?;
                let key = self.property_key(&member.property, env)?;
                get_property(&object, &key)
            }
            Expression::Call(call) => {
                let callee = self.evaluate(&call.callee, env)?;
                let mut args = Vec::with_capacity(call.arguments.len());
                for arg in &call.arguments {
                    args.push(self.evaluate(arg, env)?);
                }
                if !callee.is_function() {
                    return Err(Error::TypeError(format!(
                        "{} is not a function",
                        describe_callee(&call.callee)
                    )));
                }
                self.call_value(&callee, args)
            }
        }
    }

    fn evaluate_unary(&mut self, unary: &UnaryExpression, env: &Environment) -> Result<Value, Error> {
        if unary.operator == UnaryOperator::Typeof {
            // typeof tolerates undeclared identifiers.
            if let Expression::Identifier(id) = unary.argument.as_ref() {
                if !env.contains(&id.name) {
                    return Ok(Value::from("undefined"));
                }
            }
        }

        let argument = self.evaluate(&unary.argument, env)?;
        Ok(match unary.operator {
            UnaryOperator::Minus => Value::Number(-argument.to_number()),
            UnaryOperator::Not => Value::Boolean(!argument.to_boolean()),
            UnaryOperator::Typeof => Value::from(argument.type_of()),
        })
    }

    fn evaluate_assignment(
        &mut self,
        assign: &AssignmentExpression,
        env: &Environment,
    ) -> Result<Value, Error> {
        match &assign.target {
            AssignmentTarget::Identifier(id) => {
                let value = match assign.operator {
                    AssignmentOperator::Assign => self.evaluate(&assign.value, env)?,
                    operator => {
                        let current = env.get(&id.name).ok_or_else(|| {
                            Error::ReferenceError(format!("{} is not defined", id.name))
                        })?;
                        let rhs = self.evaluate(&assign.value, env)?;
                        compound(operator, &current, &rhs)
                    }
                };
                env.assign(&id.name, value.clone())?;
                Ok(value)
            }
            AssignmentTarget::Member(member) => {
                let object = self.evaluate(&member.object, env)?;
                let key = self.property_key(&member.property, env)?;
                let value = match assign.operator {
                    AssignmentOperator::Assign => self.evaluate(&assign.value, env)?,
                    operator => {
                        let current = get_property(&object, &key)?;
                        let rhs = self.evaluate(&assign.value, env)?;
                        compound(operator, &current, &rhs)
                    }
                };
                set_property(&object, &key, value.clone())?;
                Ok(value)
            }
        }
    }

    fn property_key(&mut self, property: &MemberProperty, env: &Environment) -> Result<String, Error> {
        match property {
            MemberProperty::Identifier(id) => Ok(id.name.clone()),
            MemberProperty::Computed(expr) => Ok(match self.evaluate(expr, env)? {
                Value::Number(n) => number_to_string(n),
                other => other.to_js_string(),
            }),
        }
    }
}

fn make_closure(decl: &FunctionDeclaration, env: &Environment) -> Value {
    Value::Function(Arc::new(Callable::Function(ScriptFunction {
        name: decl.id.as_ref().map(|id| id.name.clone()),
        params: decl.params.iter().map(|p| p.name.clone()).collect(),
        body: Arc::clone(&decl.body),
        closure: env.clone(),
    })))
}

fn compound(operator: AssignmentOperator, current: &Value, rhs: &Value) -> Value {
    match operator {
        AssignmentOperator::SubAssign => binary_op(BinaryOperator::Sub, current, rhs),
        _ => binary_op(BinaryOperator::Add, current, rhs),
    }
}

fn binary_op(operator: BinaryOperator, left: &Value, right: &Value) -> Value {
    match operator {
        BinaryOperator::Add => {
            if is_stringish(left) || is_stringish(right) {
                Value::String(format!("{}{}", left.to_js_string(), right.to_js_string()))
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOperator::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOperator::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOperator::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOperator::Mod => Value::Number(left.to_number() % right.to_number()),
        BinaryOperator::Equal => Value::Boolean(left.loose_equals(right)),
        BinaryOperator::NotEqual => Value::Boolean(!left.loose_equals(right)),
        BinaryOperator::StrictEqual => Value::Boolean(left == right),
        BinaryOperator::StrictNotEqual => Value::Boolean(left != right),
        BinaryOperator::LessThan
        | BinaryOperator::LessEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterEqual => Value::Boolean(compare(operator, left, right)),
    }
}

/// Values that `+` concatenates instead of adding.
fn is_stringish(value: &Value) -> bool {
    matches!(
        value,
        Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Function(_)
    )
}

fn compare(operator: BinaryOperator, left: &Value, right: &Value) -> bool {
    use std::cmp::Ordering;

    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    };

    match (operator, ordering) {
        (_, None) => false,
        (BinaryOperator::LessThan, Some(o)) => o == Ordering::Less,
        (BinaryOperator::LessEqual, Some(o)) => o != Ordering::Greater,
        (BinaryOperator::GreaterThan, Some(o)) => o == Ordering::Greater,
        (_, Some(o)) => o != Ordering::Less,
    }
}

fn get_property(object: &Value, key: &str) -> Result<Value, Error> {
    match object {
        Value::Undefined | Value::Null => Err(Error::TypeError(format!(
            "Cannot read properties of {} (reading '{}')",
            object.to_js_string(),
            key
        ))),
        Value::Object(obj) => Ok(obj.get(key).unwrap_or_default()),
        Value::Array(arr) => Ok(match key {
            "length" => Value::Number(arr.len() as f64),
            "push" => array_push(arr),
            "join" => array_join(arr),
            _ => key
                .parse::<usize>()
                .ok()
                .and_then(|index| arr.get(index))
                .unwrap_or_default(),
        }),
        Value::String(s) => Ok(match key {
            "length" => Value::Number(s.chars().count() as f64),
            _ => key
                .parse::<usize>()
                .ok()
                .and_then(|index| s.chars().nth(index))
                .map(|ch| Value::String(ch.to_string()))
                .unwrap_or_default(),
        }),
        _ => Ok(Value::Undefined),
    }
}

fn set_property(object: &Value, key: &str, value: Value) -> Result<(), Error> {
    match object {
        Value::Undefined | Value::Null => Err(Error::TypeError(format!(
            "Cannot set properties of {} (setting '{}')",
            object.to_js_string(),
            key
        ))),
        Value::Object(obj) => {
            obj.set(key, value);
            Ok(())
        }
        Value::Array(arr) => match key.parse::<usize>() {
            Ok(index) => arr.set(index, value),
            Err(_) => Err(Error::TypeError(format!(
                "Cannot set property '{}' on an array",
                key
            ))),
        },
        // Writes to primitives are silently dropped.
        _ => Ok(()),
    }
}

fn array_push(arr: &ArrayRef) -> Value {
    let arr = arr.clone();
    Value::native_function("push", move |args| {
        let mut len = arr.len();
        for arg in args {
            len = arr.push(arg.clone())?;
        }
        Ok(Value::Number(len as f64))
    })
}

fn array_join(arr: &ArrayRef) -> Value {
    let arr = arr.clone();
    Value::native_function("join", move |args| {
        let separator = match args.first() {
            Some(Value::Undefined) | None => ",".to_string(),
            Some(sep) => sep.to_js_string(),
        };
        let parts: Vec<String> = arr
            .to_vec()
            .iter()
            .map(|v| if v.is_nullish() { String::new() } else { v.to_js_string() })
            .collect();
        Ok(Value::String(parts.join(&separator)))
    })
}

/// Renders a callee expression for error messages (`exports.run is not a function`).
fn describe_callee(expr: &Expression) -> String {
    match expr {
        Expression::Identifier(id) => id.name.clone(),
        Expression::Member(member) => match &member.property {
            MemberProperty::Identifier(id) => {
                format!("{}.{}", describe_callee(&member.object), id.name)
            }
            MemberProperty::Computed(_) => format!("{}[...]", describe_callee(&member.object)),
        },
        Expression::Call(call) => format!("{}(...)", describe_callee(&call.callee)),
        _ => "expression".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn run(source: &str) -> Result<Value, Error> {
        let program = Parser::new(source).parse_program()?;
        Interpreter::new().run(&program, &Environment::new())
    }

    fn run_ok(source: &str) -> Value {
        run(source).unwrap()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(run_ok("1 + 2 * 3;"), Value::Number(7.0));
        assert_eq!(run_ok("(1 + 2) * 3;"), Value::Number(9.0));
        assert_eq!(run_ok("17 % 5;"), Value::Number(2.0));
        assert_eq!(run_ok("-4 / 2;"), Value::Number(-2.0));
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(run_ok("'a' + 1 + 2;"), Value::from("a12"));
        assert_eq!(run_ok("1 + 2 + 'a';"), Value::from("3a"));
        assert_eq!(run_ok("'n=' + null;"), Value::from("n=null"));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(run_ok("1 < 2;"), Value::Boolean(true));
        assert_eq!(run_ok("'b' >= 'a';"), Value::Boolean(true));
        assert_eq!(run_ok("1 == '1';"), Value::Boolean(true));
        assert_eq!(run_ok("1 === '1';"), Value::Boolean(false));
        assert_eq!(run_ok("null == undefined;"), Value::Boolean(true));
        assert_eq!(run_ok("null === undefined;"), Value::Boolean(false));
    }

    #[test]
    fn test_undefined_identifier() {
        assert!(matches!(
            run("missing;"),
            Err(Error::ReferenceError(msg)) if msg == "missing is not defined"
        ));
        assert_eq!(run_ok("typeof missing;"), Value::from("undefined"));
    }

    #[test]
    fn test_logical_short_circuit() {
        assert_eq!(run_ok("0 || 'fallback';"), Value::from("fallback"));
        assert_eq!(run_ok("0 && missing;"), Value::Number(0.0));
        assert_eq!(run_ok("'x' && 'y';"), Value::from("y"));
    }

    #[test]
    fn test_variables_and_blocks() {
        assert_eq!(run_ok("let x = 1; { let x = 2; } x;"), Value::Number(1.0));
        assert_eq!(run_ok("let x = 1; { x = 2; } x;"), Value::Number(2.0));
        assert_eq!(run_ok("var n = 1; n += 4; n -= 2; n;"), Value::Number(3.0));
        assert!(matches!(run("const c = 1; c = 2;"), Err(Error::TypeError(_))));
    }

    #[test]
    fn test_functions_and_closures() {
        let source = "
            function counter() {
                let n = 0;
                return function () { n += 1; return n; };
            }
            const next = counter();
            next();
            next();
        ";
        assert_eq!(run_ok(source), Value::Number(2.0));
    }

    #[test]
    fn test_function_hoisting() {
        assert_eq!(run_ok("double(21); function double(x) { return x * 2; }"), Value::Number(42.0));
    }

    #[test]
    fn test_missing_arguments_are_undefined() {
        assert_eq!(run_ok("function f(a, b) { return b; } f(1);"), Value::Undefined);
    }

    #[test]
    fn test_if_while() {
        let source = "
            let i = 0;
            let total = 0;
            while (i < 5) {
                i += 1;
                if (i % 2 == 0) { total += i; } else { total += 0; }
            }
            total;
        ";
        assert_eq!(run_ok(source), Value::Number(6.0));
    }

    #[test]
    fn test_top_level_return() {
        assert_eq!(run_ok("1; return 'early'; 2;"), Value::from("early"));
    }

    #[test]
    fn test_objects_and_arrays() {
        let source = "
            const o = { a: 1, list: [1, 2] };
            o.b = o.a + 1;
            o['c'] = o.list.length;
            o.list.push(3);
            o.list[1] = 'two';
            o.list.join('-') + ':' + o.b + o.c;
        ";
        assert_eq!(run_ok(source), Value::from("1-two-3:22"));
    }

    #[test]
    fn test_object_shorthand() {
        let value = run_ok("const a = 1; ({ a });");
        assert_eq!(value.as_object().unwrap().get("a"), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_reading_property_of_undefined() {
        assert!(matches!(
            run("let u; u.x;"),
            Err(Error::TypeError(msg)) if msg == "Cannot read properties of undefined (reading 'x')"
        ));
    }

    #[test]
    fn test_calling_non_function() {
        assert!(matches!(
            run("const o = {}; o.run();"),
            Err(Error::TypeError(msg)) if msg == "o.run is not a function"
        ));
    }

    #[test]
    fn test_throw() {
        match run("throw 'boom';") {
            Err(Error::Thrown(value)) => assert_eq!(value, Value::from("boom")),
            other => panic!("expected thrown value, got {:?}", other),
        }
    }

    #[test]
    fn test_runaway_recursion_is_range_error() {
        assert!(matches!(
            run("function f() { return f(); } f();"),
            Err(Error::RangeError(msg)) if msg == "Maximum call stack size exceeded"
        ));
        assert!(matches!(
            run("function f(n) { return n == 0 ? 0 : f(n - 1) + 1; } f(1000);"),
            Err(Error::RangeError(_))
        ));
    }

    #[test]
    fn test_moderate_recursion_succeeds() {
        let source = "function f(n) { return n == 0 ? 0 : f(n - 1) + 1; } f(100);";
        assert_eq!(run_ok(source), Value::Number(100.0));
    }

    #[test]
    fn test_depth_is_released_after_error() {
        let env = Environment::new();
        let mut interpreter = Interpreter::new();
        let deep = Parser::new("function f() { return f(); } f();").parse_program().unwrap();
        assert!(interpreter.run(&deep, &env).is_err());
        let shallow = Parser::new("f = function () { return 1; }; f();").parse_program().unwrap();
        assert_eq!(interpreter.run(&shallow, &env).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_huge_array_index_is_range_error() {
        assert!(matches!(
            run("let a = []; a[1000000000000000] = 1;"),
            Err(Error::RangeError(msg)) if msg == "Invalid array length"
        ));
        assert_eq!(run_ok("let a = []; a[3] = 1; a.length;"), Value::Number(4.0));
    }

    #[test]
    fn test_native_function_call() {
        let env = Environment::new();
        env.define(
            "twice",
            Value::native_function("twice", |args| {
                Ok(Value::Number(args.first().map(Value::to_number).unwrap_or(0.0) * 2.0))
            }),
        );
        let program = Parser::new("twice(4);").parse_program().unwrap();
        assert_eq!(Interpreter::new().run(&program, &env).unwrap(), Value::Number(8.0));
    }
}
