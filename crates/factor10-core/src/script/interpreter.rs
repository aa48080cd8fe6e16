//! Tree-walking evaluator.
//!
//! `var` bindings live in the global scope; `let` and `const` are scoped to
//! the enclosing block. Every evaluated expression and every loop iteration
//! costs one step against the budget.

use std::collections::HashMap;

use super::ast::*;
use super::value::Value;
use super::{CompileError, ScriptHost, Span};

#[derive(Debug)]
struct Binding {
    value: Value,
    constant: bool,
}

type Scope = HashMap<String, Binding>;

pub struct Interpreter<'h, H: ScriptHost> {
    host: &'h mut H,
    scopes: Vec<Scope>,
    steps: u64,
    max_steps: u64,
    /// Position of the most recently evaluated expression.
    current: Span,
}

fn runtime(span: Span, message: impl Into<String>) -> CompileError {
    CompileError::Runtime {
        span,
        message: message.into(),
    }
}

fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        0.0
    } else {
        trimmed.parse().unwrap_or(f64::NAN)
    }
}

fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Number(n), Value::Str(s)) | (Value::Str(s), Value::Number(n)) => {
            *n == string_to_number(s)
        }
        (Value::Bool(b), other) | (other, Value::Bool(b)) => {
            loose_eq(&Value::Number(if *b { 1.0 } else { 0.0 }), other)
        }
        _ => lhs == rhs,
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value, span: Span) -> Result<Value, CompileError> {
    use BinaryOp::*;

    match op {
        Eq => return Ok(Value::Bool(loose_eq(&lhs, &rhs))),
        NotEq => return Ok(Value::Bool(!loose_eq(&lhs, &rhs))),
        StrictEq => return Ok(Value::Bool(lhs == rhs)),
        StrictNotEq => return Ok(Value::Bool(lhs != rhs)),
        _ => {}
    }

    if op == Add && (matches!(lhs, Value::Str(_)) || matches!(rhs, Value::Str(_))) {
        return Ok(Value::Str(format!("{lhs}{rhs}")));
    }

    if let (Value::Str(a), Value::Str(b)) = (&lhs, &rhs) {
        let ordering = a.cmp(b);
        return match op {
            Lt => Ok(Value::Bool(ordering.is_lt())),
            Le => Ok(Value::Bool(ordering.is_le())),
            Gt => Ok(Value::Bool(ordering.is_gt())),
            Ge => Ok(Value::Bool(ordering.is_ge())),
            _ => Err(runtime(span, format!("operator {op:?} is not defined for strings"))),
        };
    }

    let (Value::Number(a), Value::Number(b)) = (&lhs, &rhs) else {
        return Err(runtime(
            span,
            format!(
                "operator {op:?} needs numbers, found {} and {}",
                lhs.type_name(),
                rhs.type_name()
            ),
        ));
    };
    let (a, b) = (*a, *b);

    Ok(match op {
        Add => Value::Number(a + b),
        Sub => Value::Number(a - b),
        Mul => Value::Number(a * b),
        Div => Value::Number(a / b),
        Rem => Value::Number(a % b),
        Lt => Value::Bool(a < b),
        Le => Value::Bool(a <= b),
        Gt => Value::Bool(a > b),
        Ge => Value::Bool(a >= b),
        Eq | NotEq | StrictEq | StrictNotEq => unreachable!("equality handled above"),
    })
}

impl<'h, H: ScriptHost> Interpreter<'h, H> {
    pub fn new(host: &'h mut H, max_steps: u64) -> Self {
        Self {
            host,
            scopes: vec![Scope::new()],
            steps: 0,
            max_steps,
            current: Span::new(1, 1),
        }
    }

    pub fn run(mut self, program: &Program) -> Result<(), CompileError> {
        for stmt in &program.body {
            self.exec(stmt)?;
        }
        tracing::trace!(steps = self.steps, "script finished");
        Ok(())
    }

    fn step(&mut self) -> Result<(), CompileError> {
        self.steps += 1;
        if self.steps > self.max_steps {
            return Err(CompileError::StepLimit {
                span: self.current,
                limit: self.max_steps,
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bindings
    // -----------------------------------------------------------------------

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn declare(
        &mut self,
        kind: DeclKind,
        name: &str,
        value: Option<Value>,
        span: Span,
    ) -> Result<(), CompileError> {
        let scope = match kind {
            DeclKind::Var => &mut self.scopes[0],
            DeclKind::Let | DeclKind::Const => {
                let last = self.scopes.len() - 1;
                &mut self.scopes[last]
            }
        };

        match scope.get(name) {
            Some(existing) if existing.constant || kind != DeclKind::Var => {
                return Err(runtime(span, format!("'{name}' has already been declared")));
            }
            // `var x;` over an existing var keeps its value.
            Some(_) if value.is_none() => return Ok(()),
            _ => {}
        }

        scope.insert(
            name.to_string(),
            Binding {
                value: value.unwrap_or_default(),
                constant: kind == DeclKind::Const,
            },
        );
        Ok(())
    }

    fn assign(&mut self, name: &str, value: Value, span: Span) -> Result<(), CompileError> {
        let Some(binding) = self
            .scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
        else {
            return Err(runtime(span, format!("{name} is not defined")));
        };
        if binding.constant {
            return Err(runtime(span, format!("assignment to constant variable '{name}'")));
        }
        binding.value = value;
        Ok(())
    }

    fn read(&self, name: &str, span: Span) -> Result<Value, CompileError> {
        match self.lookup(name) {
            Some(binding) => Ok(binding.value.clone()),
            None if self.host.has_function(name) => Err(runtime(
                span,
                format!("{name} is a function and can only be called"),
            )),
            None => Err(runtime(span, format!("{name} is not defined"))),
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn exec(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Decl { kind, declarators } => {
                for decl in declarators {
                    let value = match &decl.init {
                        Some(init) => Some(self.eval(init)?),
                        None => None,
                    };
                    self.declare(*kind, &decl.name, value, decl.span)?;
                }
                Ok(())
            }
            Stmt::Expr(expr) => self.eval(expr).map(|_| ()),
            Stmt::Block(body) => self.scoped(|this| {
                for stmt in body {
                    this.exec(stmt)?;
                }
                Ok(())
            }),
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond)?.truthy() {
                    self.exec(then)
                } else if let Some(otherwise) = otherwise {
                    self.exec(otherwise)
                } else {
                    Ok(())
                }
            }
            Stmt::While { cond, body } => loop {
                self.step()?;
                if !self.eval(cond)?.truthy() {
                    return Ok(());
                }
                self.exec(body)?;
            },
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => self.scoped(|this| {
                if let Some(init) = init {
                    this.exec(init)?;
                }
                loop {
                    this.step()?;
                    if let Some(cond) = cond {
                        if !this.eval(cond)?.truthy() {
                            return Ok(());
                        }
                    }
                    this.exec(body)?;
                    if let Some(update) = update {
                        this.eval(update)?;
                    }
                }
            }),
            Stmt::Empty => Ok(()),
        }
    }

    fn scoped(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<(), CompileError>,
    ) -> Result<(), CompileError> {
        self.scopes.push(Scope::new());
        let result = f(self);
        self.scopes.pop();
        result
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn eval(&mut self, expr: &Expr) -> Result<Value, CompileError> {
        self.current = expr.span;
        self.step()?;

        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::Number(*n)),
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Undefined => Ok(Value::Undefined),
            ExprKind::Ident(name) => self.read(name, expr.span),
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match (op, value) {
                    (UnaryOp::Not, value) => Ok(Value::Bool(!value.truthy())),
                    (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
                    (UnaryOp::Plus, Value::Number(n)) => Ok(Value::Number(n)),
                    (UnaryOp::Plus, Value::Str(s)) => Ok(Value::Number(string_to_number(&s))),
                    (_, value) => Err(runtime(
                        expr.span,
                        format!("unary {op:?} needs a number, found {}", value.type_name()),
                    )),
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, lhs, rhs, expr.span)
            }
            ExprKind::Logical { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                match (op, lhs.truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(lhs),
                    _ => self.eval(rhs),
                }
            }
            ExprKind::Assign { name, op, value } => {
                let mut value = self.eval(value)?;
                if let Some(op) = op {
                    let current = self.read(name, expr.span)?;
                    value = binary(*op, current, value, expr.span)?;
                }
                self.assign(name, value.clone(), expr.span)?;
                Ok(value)
            }
            ExprKind::Update {
                name,
                delta,
                prefix,
            } => {
                let current = self.read(name, expr.span)?;
                let Value::Number(old) = current else {
                    return Err(runtime(
                        expr.span,
                        format!("cannot increment {}", current.type_name()),
                    ));
                };
                let new = old + delta;
                self.assign(name, Value::Number(new), expr.span)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            ExprKind::Call { callee, args } => {
                if !self.host.has_function(callee) {
                    let message = if self.lookup(callee).is_some() {
                        format!("{callee} is not a function")
                    } else {
                        format!("{callee} is not defined")
                    };
                    return Err(runtime(expr.span, message));
                }
                let args = self.eval_args(args)?;
                self.host
                    .call_function(callee, &args)
                    .map_err(|message| runtime(expr.span, message))
            }
            ExprKind::Method {
                receiver,
                method,
                args,
            } => {
                let receiver = self.eval(receiver)?;
                let Some(object) = receiver.as_object() else {
                    return Err(runtime(
                        expr.span,
                        format!("cannot call {method}() on {}", receiver.type_name()),
                    ));
                };
                let args = self.eval_args(args)?;
                self.host
                    .call_method(object, method, &args)
                    .map_err(|message| runtime(expr.span, message))
            }
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, CompileError> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::EntityId;
    use crate::script::value::ObjectRef;
    use crate::script::execute;

    #[derive(Debug, Default)]
    struct Recorder {
        logs: Vec<String>,
        calls: Vec<(ObjectRef, String, Vec<Value>)>,
        made: u32,
    }

    impl ScriptHost for Recorder {
        fn has_function(&self, name: &str) -> bool {
            matches!(name, "log" | "make" | "fail")
        }

        fn call_function(&mut self, name: &str, args: &[Value]) -> Result<Value, String> {
            match name {
                "log" => {
                    let line = args.iter().map(Value::to_string).collect::<Vec<_>>().join(" ");
                    self.logs.push(line);
                    Ok(Value::Undefined)
                }
                "make" => {
                    let id = EntityId(self.made);
                    self.made += 1;
                    Ok(Value::Object(ObjectRef::Entity(id)))
                }
                _ => Err("host refused".into()),
            }
        }

        fn call_method(
            &mut self,
            receiver: ObjectRef,
            method: &str,
            args: &[Value],
        ) -> Result<Value, String> {
            self.calls.push((receiver, method.to_string(), args.to_vec()));
            Ok(Value::Undefined)
        }
    }

    fn run(src: &str) -> Result<Recorder, CompileError> {
        let mut host = Recorder::default();
        execute(src, &mut host, 10_000)?;
        Ok(host)
    }

    #[test]
    fn arithmetic_and_concatenation() {
        let host = run("log(1 + 2 * 3)\nlog('a' + 1)\nlog(7 % 4, 1 / 2)").unwrap();
        assert_eq!(host.logs, vec!["7", "a1", "3 0.5"]);
    }

    #[test]
    fn loops_accumulate() {
        let host = run(
            "var total = 0;\n\
             for (let i = 1; i <= 4; i++) { total += i }\n\
             var n = 3; while (n > 0) { n-- }\n\
             log(total, n)",
        )
        .unwrap();
        assert_eq!(host.logs, vec!["10 0"]);
    }

    #[test]
    fn update_operators_return_old_or_new() {
        let host = run("var i = 1; log(i++); log(i); log(++i)").unwrap();
        assert_eq!(host.logs, vec!["1", "2", "3"]);
    }

    #[test]
    fn equality_rules() {
        let host = run("log(1 == '1', 1 === '1', null == undefined, null === undefined, true == 1)")
            .unwrap();
        assert_eq!(host.logs, vec!["true false true false true"]);
    }

    #[test]
    fn logical_operators_short_circuit() {
        let host = run("log(false && fail()); log(0 || 'x')").unwrap();
        assert_eq!(host.logs, vec!["false", "x"]);
    }

    #[test]
    fn let_is_block_scoped_and_var_is_global() {
        let host = run("{ var a = 1 } log(a)").unwrap();
        assert_eq!(host.logs, vec!["1"]);
        let err = run("{ let b = 1 }\nlog(b)").unwrap_err();
        assert!(matches!(err, CompileError::Runtime { span, .. } if span.line == 2));
    }

    #[test]
    fn const_cannot_be_reassigned_or_redeclared() {
        assert!(run("const c = 1; c = 2").is_err());
        assert!(run("let d = 1; let d = 2").is_err());
        assert!(run("var e = 1; var e = 2").is_ok());
    }

    #[test]
    fn bare_var_redeclaration_keeps_value() {
        let host = run("var e = 1; var e; log(e); var e = 3; log(e)").unwrap();
        assert_eq!(host.logs, vec!["1", "3"]);
        let host = run("var f; log(f)").unwrap();
        assert_eq!(host.logs, vec!["undefined"]);
    }

    #[test]
    fn methods_dispatch_to_host() {
        let host = run("var m = make();\nm.setName('Machine');\nm.setX(2)").unwrap();
        assert_eq!(host.calls.len(), 2);
        assert_eq!(host.calls[0].0, ObjectRef::Entity(EntityId(0)));
        assert_eq!(host.calls[0].1, "setName");
        assert_eq!(host.calls[0].2, vec![Value::Str("Machine".into())]);
    }

    #[test]
    fn method_on_plain_value_is_an_error() {
        let err = run("var n = 3;\nn.setName('x')").unwrap_err();
        assert!(err.to_string().contains("on number"));
    }

    #[test]
    fn host_errors_carry_call_position() {
        let err = run("make();\n  fail()").unwrap_err();
        assert_eq!(
            err,
            CompileError::Runtime {
                span: Span::new(2, 3),
                message: "host refused".into(),
            }
        );
    }

    #[test]
    fn unknown_names_are_errors() {
        assert!(run("window.alert('x')").is_err());
        assert!(run("require('fs')").is_err());
        assert!(run("var x = log").is_err());
    }

    #[test]
    fn runaway_loops_hit_the_step_limit() {
        let mut host = Recorder::default();
        let err = execute("while (true) {}", &mut host, 1_000).unwrap_err();
        assert!(matches!(err, CompileError::StepLimit { limit: 1_000, .. }));
        let err = execute("for (;;) ;", &mut host, 1_000).unwrap_err();
        assert!(matches!(err, CompileError::StepLimit { .. }));
    }
}
