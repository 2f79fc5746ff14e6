//! Tree-walking evaluator for the simple language.
//!
//! Exists so instrumented output can actually be executed: tests run the
//! same program before and after probe insertion and compare observable
//! behavior, with probe hits flowing into a [`CounterSink`].

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::CounterStore;
use crate::types::EngineError;

use super::ast::{BinOp, Block, Expr, Function, Stmt, UnOp};
use super::parser;
use super::syntax::builtins;

/// Receiver for probe hits during a run. Index values come straight from
/// the counter map the program was instrumented with.
pub trait CounterSink {
    fn hit(&self, index: u32) -> Result<(), EngineError>;
}

impl CounterSink for CounterStore {
    fn hit(&self, index: u32) -> Result<(), EngineError> {
        self.increment(index)
    }
}

/// Discards hits; for running uninstrumented programs
impl CounterSink for () {
    fn hit(&self, _index: u32) -> Result<(), EngineError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bool(bool),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Everything observable about a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// `print` output, one entry per statement, in order
    pub output: Vec<String>,
    pub result: Option<Value>,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("line {line}: {message}")]
    Parse { line: u32, message: String },
    #[error("line {line}: undefined variable `{name}`")]
    UndefinedVariable { name: String, line: u32 },
    #[error("line {line}: unknown function `{name}`")]
    UnknownFunction { name: String, line: u32 },
    #[error("line {line}: `{name}` takes {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
        line: u32,
    },
    #[error("line {line}: {message}")]
    Type { message: String, line: u32 },
    #[error("line {line}: division by zero")]
    DivideByZero { line: u32 },
    #[error(transparent)]
    Counter(#[from] EngineError),
}

enum Flow {
    Normal,
    Return(Value),
}

/// Parse and run `source`, starting from `main`. Probe hits go to `sink`.
pub fn run(source: &str, sink: &dyn CounterSink) -> Result<Execution, RunError> {
    let program = parser::parse(source).map_err(|e| RunError::Parse {
        line: e.line,
        message: e.message,
    })?;
    let mut interp = Interp {
        functions: program
            .functions
            .iter()
            .map(|f| (f.name.clone(), f))
            .collect(),
        sink,
        output: Vec::new(),
    };
    let main = interp
        .functions
        .get("main")
        .copied()
        .ok_or(RunError::UnknownFunction {
            name: "main".to_string(),
            line: 1,
        })?;
    let result = interp.call_function(main, Vec::new())?;
    Ok(Execution {
        output: interp.output,
        result,
    })
}

struct Interp<'a> {
    functions: HashMap<String, &'a Function>,
    sink: &'a dyn CounterSink,
    output: Vec<String>,
}

type Env = HashMap<String, Value>;

impl Interp<'_> {
    fn call_function(
        &mut self,
        function: &Function,
        args: Vec<Value>,
    ) -> Result<Option<Value>, RunError> {
        if args.len() != function.params.len() {
            return Err(RunError::Arity {
                name: function.name.clone(),
                expected: function.params.len(),
                got: args.len(),
                line: function.line,
            });
        }
        let mut env: Env = function.params.iter().cloned().zip(args).collect();
        match self.exec_block(&function.body, &mut env)? {
            Flow::Return(value) => Ok(Some(value)),
            Flow::Normal => Ok(None),
        }
    }

    fn exec_block(&mut self, block: &Block, env: &mut Env) -> Result<Flow, RunError> {
        for stmt in &block.statements {
            if let Flow::Return(value) = self.exec_stmt(stmt, env)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, env: &mut Env) -> Result<Flow, RunError> {
        match stmt {
            Stmt::Let { name, value, .. } => {
                let value = self.eval(value, env)?;
                env.insert(name.clone(), value);
                Ok(Flow::Normal)
            }
            Stmt::Assign { name, value, span } => {
                let value = self.eval(value, env)?;
                match env.get_mut(name) {
                    Some(slot) => {
                        *slot = value;
                        Ok(Flow::Normal)
                    }
                    None => Err(RunError::UndefinedVariable {
                        name: name.clone(),
                        line: span.line,
                    }),
                }
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::Int(0),
                };
                Ok(Flow::Return(value))
            }
            Stmt::Print { value, .. } => {
                let value = self.eval(value, env)?;
                self.output.push(value.to_string());
                Ok(Flow::Normal)
            }
            Stmt::Call { call, .. } => {
                self.eval(call, env)?;
                Ok(Flow::Normal)
            }
            Stmt::If {
                arms, else_block, ..
            } => {
                for (cond, body) in arms {
                    if self.eval_bool(cond, env)? {
                        return self.exec_block(body, env);
                    }
                }
                match else_block {
                    Some(body) => self.exec_block(body, env),
                    None => Ok(Flow::Normal),
                }
            }
            Stmt::While { cond, body, .. } => {
                while self.eval_bool(cond, env)? {
                    if let Flow::Return(value) = self.exec_block(body, env)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Switch {
                scrutinee,
                cases,
                default,
                span,
            } => {
                let value = match self.eval(scrutinee, env)? {
                    Value::Int(n) => n,
                    other => {
                        return Err(RunError::Type {
                            message: format!("switch scrutinee must be int, got {}", other.type_name()),
                            line: span.line,
                        });
                    }
                };
                for case in cases {
                    if case.value == value {
                        return self.exec_block(&case.body, env);
                    }
                }
                match default {
                    Some(body) => self.exec_block(body, env),
                    None => Ok(Flow::Normal),
                }
            }
        }
    }

    fn eval_bool(&mut self, expr: &Expr, env: &mut Env) -> Result<bool, RunError> {
        match self.eval(expr, env)? {
            Value::Bool(b) => Ok(b),
            other => Err(RunError::Type {
                message: format!("condition must be bool, got {}", other.type_name()),
                line: expr.span().line,
            }),
        }
    }

    fn eval(&mut self, expr: &Expr, env: &mut Env) -> Result<Value, RunError> {
        match expr {
            Expr::Int(n, _) => Ok(Value::Int(*n)),
            Expr::Bool(b, _) => Ok(Value::Bool(*b)),
            Expr::Var(name, span) => {
                env.get(name)
                    .copied()
                    .ok_or_else(|| RunError::UndefinedVariable {
                        name: name.clone(),
                        line: span.line,
                    })
            }
            Expr::Call { callee, args, span } => self.eval_call(callee, args, span.line, env),
            Expr::Unary { op, operand, span } => {
                let value = self.eval(operand, env)?;
                match (op, value) {
                    (UnOp::Neg, Value::Int(n)) => Ok(Value::Int(n.wrapping_neg())),
                    (UnOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (UnOp::Neg, other) => Err(RunError::Type {
                        message: format!("cannot negate {}", other.type_name()),
                        line: span.line,
                    }),
                    (UnOp::Not, other) => Err(RunError::Type {
                        message: format!("cannot apply `!` to {}", other.type_name()),
                        line: span.line,
                    }),
                }
            }
            Expr::Binary { op, lhs, rhs, span } => {
                // && and || must not evaluate the right operand eagerly
                if op.is_short_circuit() {
                    let left = self.eval_bool(lhs, env)?;
                    return match (op, left) {
                        (BinOp::And, false) => Ok(Value::Bool(false)),
                        (BinOp::Or, true) => Ok(Value::Bool(true)),
                        _ => Ok(Value::Bool(self.eval_bool(rhs, env)?)),
                    };
                }
                let left = self.eval(lhs, env)?;
                let right = self.eval(rhs, env)?;
                self.apply_binop(*op, left, right, span.line)
            }
        }
    }

    fn apply_binop(
        &self,
        op: BinOp,
        left: Value,
        right: Value,
        line: u32,
    ) -> Result<Value, RunError> {
        use Value::{Bool, Int};
        match (op, left, right) {
            (BinOp::Add, Int(a), Int(b)) => Ok(Int(a.wrapping_add(b))),
            (BinOp::Sub, Int(a), Int(b)) => Ok(Int(a.wrapping_sub(b))),
            (BinOp::Mul, Int(a), Int(b)) => Ok(Int(a.wrapping_mul(b))),
            (BinOp::Div, Int(_), Int(0)) | (BinOp::Rem, Int(_), Int(0)) => {
                Err(RunError::DivideByZero { line })
            }
            (BinOp::Div, Int(a), Int(b)) => Ok(Int(a.wrapping_div(b))),
            (BinOp::Rem, Int(a), Int(b)) => Ok(Int(a.wrapping_rem(b))),
            (BinOp::Lt, Int(a), Int(b)) => Ok(Bool(a < b)),
            (BinOp::Le, Int(a), Int(b)) => Ok(Bool(a <= b)),
            (BinOp::Gt, Int(a), Int(b)) => Ok(Bool(a > b)),
            (BinOp::Ge, Int(a), Int(b)) => Ok(Bool(a >= b)),
            (BinOp::Eq, a, b) if a.type_name() == b.type_name() => Ok(Bool(a == b)),
            (BinOp::Ne, a, b) if a.type_name() == b.type_name() => Ok(Bool(a != b)),
            (op, a, b) => Err(RunError::Type {
                message: format!(
                    "cannot apply `{op:?}` to {} and {}",
                    a.type_name(),
                    b.type_name()
                ),
                line,
            }),
        }
    }

    fn eval_call(
        &mut self,
        callee: &str,
        args: &[Expr],
        line: u32,
        env: &mut Env,
    ) -> Result<Value, RunError> {
        if callee == builtins::HIT {
            let index = self.probe_index(callee, args, 0, 1, line, env)?;
            self.sink.hit(index)?;
            return Ok(Value::Int(0));
        }
        if callee == builtins::COND {
            if args.len() != 3 {
                return Err(RunError::Arity {
                    name: callee.to_string(),
                    expected: 3,
                    got: args.len(),
                    line,
                });
            }
            let true_index = self.probe_index(callee, args, 0, 3, line, env)?;
            let false_index = self.probe_index(callee, args, 1, 3, line, env)?;
            let value = self.eval_bool(&args[2], env)?;
            self.sink
                .hit(if value { true_index } else { false_index })?;
            return Ok(Value::Bool(value));
        }

        let function = match self.functions.get(callee) {
            Some(function) => *function,
            None => {
                return Err(RunError::UnknownFunction {
                    name: callee.to_string(),
                    line,
                });
            }
        };
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg, env)?);
        }
        // a call in expression position that returns nothing yields 0
        Ok(self.call_function(function, values)?.unwrap_or(Value::Int(0)))
    }

    fn probe_index(
        &mut self,
        callee: &str,
        args: &[Expr],
        at: usize,
        expected: usize,
        line: u32,
        env: &mut Env,
    ) -> Result<u32, RunError> {
        let arg = args.get(at).ok_or_else(|| RunError::Arity {
            name: callee.to_string(),
            expected,
            got: args.len(),
            line,
        })?;
        match self.eval(arg, env)? {
            Value::Int(n) if n >= 0 => Ok(n as u32),
            other => Err(RunError::Type {
                message: format!("counter index must be a non-negative int, got {other}"),
                line,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_clean(source: &str) -> Execution {
        run(source, &()).unwrap()
    }

    #[test]
    fn arithmetic_and_print() {
        let exec = run_clean("fn main() {\n  let x = 2 + 3 * 4;\n  print(x);\n}\n");
        assert_eq!(exec.output, vec!["14"]);
    }

    #[test]
    fn function_calls_and_returns() {
        let exec = run_clean(
            "fn add(a, b) {\n  return a + b;\n}\n\
             fn main() {\n  print(add(2, 3));\n  return add(10, 20);\n}\n",
        );
        assert_eq!(exec.output, vec!["5"]);
        assert_eq!(exec.result, Some(Value::Int(30)));
    }

    #[test]
    fn while_loop_counts() {
        let exec = run_clean(
            "fn main() {\n  let i = 0;\n  let sum = 0;\n  while (i < 4) {\n    sum = sum + i;\n    i = i + 1;\n  }\n  print(sum);\n}\n",
        );
        assert_eq!(exec.output, vec!["6"]);
    }

    #[test]
    fn switch_dispatches_and_falls_back_to_default() {
        let source = "fn classify(n) {\n\
               switch (n) {\n\
                 case 0: {\n      return 10;\n    }\n\
                 case 1: {\n      return 20;\n    }\n\
                 default: {\n      return 30;\n    }\n\
               }\n\
             }\n\
             fn main() {\n  print(classify(1));\n  print(classify(7));\n}\n";
        let exec = run_clean(source);
        assert_eq!(exec.output, vec!["20", "30"]);
    }

    #[test]
    fn logical_operators_short_circuit() {
        // rhs would divide by zero if evaluated
        let exec = run_clean(
            "fn boom() {\n  let x = 1 / 0;\n  return true;\n}\n\
             fn main() {\n  if (false && boom()) {\n    print(1);\n  }\n  if (true || boom()) {\n    print(2);\n  }\n}\n",
        );
        assert_eq!(exec.output, vec!["2"]);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let err = run("fn main() {\n  let x = 1 / 0;\n}\n", &()).unwrap_err();
        assert!(matches!(err, RunError::DivideByZero { line: 2 }));
    }

    #[test]
    fn undefined_variable_reports_its_line() {
        let err = run("fn main() {\n  print(y);\n}\n", &()).unwrap_err();
        assert!(matches!(err, RunError::UndefinedVariable { line: 2, .. }));
    }

    #[test]
    fn probe_builtins_hit_the_sink() {
        let store = CounterStore::new("t.sim", 3);
        let exec = run(
            "fn main() {\n  __hit(0); let x = 1;\n  if (__cond(1, 2, x > 0)) {\n    print(x);\n  }\n}\n",
            &store,
        )
        .unwrap();
        assert_eq!(exec.output, vec!["1"]);
        let snap = store.snapshot();
        assert_eq!(snap.count(0), 1);
        assert_eq!(snap.count(1), 1);
        assert_eq!(snap.count(2), 0);
    }

    #[test]
    fn cond_probe_preserves_the_wrapped_value() {
        let store = CounterStore::new("t.sim", 2);
        let exec = run(
            "fn main() {\n  let i = 0;\n  while (__cond(0, 1, i < 3)) {\n    i = i + 1;\n  }\n  print(i);\n}\n",
            &store,
        )
        .unwrap();
        assert_eq!(exec.output, vec!["3"]);
        let snap = store.snapshot();
        assert_eq!(snap.count(0), 3);
        assert_eq!(snap.count(1), 1);
    }

    #[test]
    fn counter_desync_aborts_the_run() {
        let store = CounterStore::new("t.sim", 1);
        let err = run("fn main() {\n  __hit(5);\n}\n", &store).unwrap_err();
        assert!(matches!(err, RunError::Counter(_)));
    }
}
