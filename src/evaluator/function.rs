//! The function model.
//!
//! Every callable value is a [`Function`]: a native [`Builtin`], an
//! [`Assignable`] builtin that can also act as a place for `=`, a lambda or a
//! macro. All of them declare a minimum arity and whether the evaluator should
//! evaluate their arguments before the call, which is how special forms are
//! expressed as ordinary function values.

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::Environment;
use super::scope::Scope;
use super::signal::{CALL_DEPTH, EvalResult, Flow, Signal};
use crate::Error;
use crate::ast::{SymbolRef, Value};

/// Native implementation: `(arguments, environment, context) -> value`
pub type BuiltinFn = Rc<dyn Fn(&Value, &mut Environment, &Value) -> EvalResult>;

/// Native place writer: `(arguments, value, environment, context) -> value`
pub type AssignFn = Rc<dyn Fn(&Value, Value, &mut Environment, &Value) -> EvalResult>;

/// A function implemented by the host
#[derive(Clone)]
pub struct Builtin {
    name: String,
    num_args: usize,
    eval_args: bool,
    call: BuiltinFn,
}

impl Builtin {
    pub fn new<F>(name: impl Into<String>, num_args: usize, eval_args: bool, call: F) -> Self
    where
        F: Fn(&Value, &mut Environment, &Value) -> EvalResult + 'static,
    {
        Builtin {
            name: name.into(),
            num_args,
            eval_args,
            call: Rc::new(call),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A builtin that can also be the target of `=`, e.g. `(= (elt arr 0) 5)`
#[derive(Clone)]
pub struct Assignable {
    builtin: Builtin,
    assign: AssignFn,
}

impl Assignable {
    pub fn new<F>(builtin: Builtin, assign: F) -> Self
    where
        F: Fn(&Value, Value, &mut Environment, &Value) -> EvalResult + 'static,
    {
        Assignable {
            builtin,
            assign: Rc::new(assign),
        }
    }

    pub fn builtin(&self) -> &Builtin {
        &self.builtin
    }

    /// Store `value` into the place described by `args`
    pub fn assign(
        &self,
        args: &Value,
        value: Value,
        env: &mut Environment,
        context: &Value,
    ) -> EvalResult {
        (self.assign)(args, value, env, context)
    }
}

/// Parameters, captured scope and body shared by lambdas and macros
#[derive(Clone)]
pub struct Closure {
    params: Vec<SymbolRef>,
    captured: Scope,
    body: Value,
}

impl Closure {
    pub fn new(params: Vec<SymbolRef>, captured: Scope, body: Value) -> Self {
        Closure {
            params,
            captured,
            body,
        }
    }

    pub fn params(&self) -> &[SymbolRef] {
        &self.params
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Bind parameters positionally, then `&REST` to whatever is left
    fn bind_params(&self, args: &Value, env: &mut Environment) -> Result<(), Error> {
        let mut remaining = args.clone();
        for (bound, param) in self.params.iter().enumerate() {
            if param.is_reserved() {
                return Err(Error::ReservedSymbol(format!(
                    "can't bind to reserved symbol {param}"
                )));
            }
            let Value::Cons(cell) = remaining else {
                return Err(Error::arity_error(self.params.len(), bound));
            };
            env.add_binding(param.clone(), cell.car());
            remaining = cell.cdr();
        }
        let rest = env.system_symbols().rest.clone();
        env.add_binding(rest, remaining);
        Ok(())
    }

    /// Run the body in a fresh frame: captured scope, local scope and a call
    /// marker. A `return` aimed at this frame becomes the result.
    fn run_frame(
        &self,
        args: &Value,
        env: &mut Environment,
        context: &Value,
        this: Option<&Rc<Function>>,
    ) -> EvalResult {
        env.with_scope(self.captured.clone(), |env| {
            env.with_scope(Scope::new(), |env| {
                env.with_depth_context(CALL_DEPTH, |env| -> EvalResult {
                    let depth = env.depth_context(CALL_DEPTH);
                    self.bind_params(args, env)?;
                    if let Some(this) = this {
                        let self_sym = env.system_symbols().self_ref.clone();
                        env.add_binding(self_sym, Value::Function(Rc::clone(this)));
                    }
                    match env.eval_body(&self.body, context) {
                        Err(Flow::Signal(Signal::Return { value, depth: target }))
                            if target == depth =>
                        {
                            debug!(depth, "return intercepted by call frame");
                            Ok(value)
                        }
                        other => other,
                    }
                })
            })
        })
    }
}

/// A callable value
#[derive(Clone)]
pub enum Function {
    Builtin(Builtin),
    Assignable(Assignable),
    Lambda(Closure),
    Macro(Closure),
}

impl Function {
    /// Minimum number of positional arguments
    pub fn num_args(&self) -> usize {
        match self {
            Function::Builtin(builtin) => builtin.num_args,
            Function::Assignable(assignable) => assignable.builtin.num_args,
            Function::Lambda(closure) | Function::Macro(closure) => closure.params.len(),
        }
    }

    /// Whether the evaluator evaluates arguments before the call
    pub fn eval_args(&self) -> bool {
        match self {
            Function::Builtin(builtin) => builtin.eval_args,
            Function::Assignable(assignable) => assignable.builtin.eval_args,
            Function::Lambda(_) => true,
            Function::Macro(_) => false,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Function::Builtin(builtin) => Some(builtin.name()),
            Function::Assignable(assignable) => Some(assignable.builtin.name()),
            Function::Lambda(_) | Function::Macro(_) => None,
        }
    }

    pub fn as_assignable(&self) -> Option<&Assignable> {
        match self {
            Function::Assignable(assignable) => Some(assignable),
            _ => None,
        }
    }

    /// Invoke the function. `args` is a proper list, already evaluated when
    /// [`Function::eval_args`] is true.
    pub fn call(self: &Rc<Self>, args: &Value, env: &mut Environment, context: &Value) -> EvalResult {
        match self.as_ref() {
            Function::Builtin(builtin) => (builtin.call)(args, env, context),
            Function::Assignable(assignable) => (assignable.builtin.call)(args, env, context),
            Function::Lambda(closure) => closure.run_frame(args, env, context, Some(self)),
            Function::Macro(closure) => {
                let expansion = closure.run_frame(args, env, context, None)?;
                debug!(%expansion, "macro expanded");
                env.eval_form(&expansion, context)
            }
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = |closure: &Closure| {
            closure
                .params
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        };
        match self {
            Function::Builtin(builtin) => write!(f, "#<builtin {}>", builtin.name),
            Function::Assignable(assignable) => {
                write!(f, "#<builtin {}>", assignable.builtin.name)
            }
            Function::Lambda(closure) => write!(f, "#<lambda ({})>", params(closure)),
            Function::Macro(closure) => write!(f, "#<macro ({})>", params(closure)),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
