//! Built-in operations registry.
//!
//! Every builtin is described once by a [`BuiltinOp`]: its name, how it treats
//! its arguments and its minimum arity. At bootstrap [`install`] defines each
//! name as a reserved, exported symbol of the locked `GLISP` namespace and binds
//! it in the global scope.
//!
//! ```lisp
//! (var xs (list 3 1 2))         ; functions evaluate their arguments
//! (if (> (length xs) 2) 'long)  ; special forms decide what to evaluate
//! (= (elt xs 0) 10)             ; places can be assigned through =
//! ```
//!
//! ## Functions, Special Forms and Places
//!
//! - **Functions** receive a freshly evaluated argument list
//! - **Special forms** receive their argument list unevaluated
//! - **Places** are functions that `=` can also write through
//!
//! ## Error Handling
//!
//! - **Arity**: the evaluator rejects calls with fewer arguments than declared;
//!   extra arguments are ignored
//! - **Types**: operations reject incorrect types instead of coercing
//! - **Overflow**: integer arithmetic detects and reports overflow

use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::LazyLock;

use tracing::debug;

use crate::Error;
use crate::ast::{Number, NumberType, Value};
use crate::collections::{self, Array, Collection, Dictionary, HashTable};
use crate::evaluator::function::{Assignable, Builtin, Closure, Function};
use crate::evaluator::quasiquote;
use crate::evaluator::{
    CALL_DEPTH, Environment, EvalResult, Flow, LOOP_DEPTH, Scope, Signal, TRY_DEPTH,
};
use crate::namespace::Namespace;

/// Native builtin signature: `(arguments, environment, context)`
pub type NativeFn = fn(&Value, &mut Environment, &Value) -> EvalResult;
/// Native place writer: `(arguments, value, environment, context)`
pub type NativeAssignFn = fn(&Value, Value, &mut Environment, &Value) -> EvalResult;

/// Represents the implementation of a built-in operation
#[derive(Clone, Copy)]
pub enum OpKind {
    /// Takes evaluated arguments
    Function(NativeFn),
    /// Takes unevaluated arguments and evaluates what it needs itself
    SpecialForm(NativeFn),
    /// Function that can also be the target of `=`
    Place {
        read: NativeFn,
        assign: NativeAssignFn,
    },
}

impl std::fmt::Debug for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Function(_) => write!(f, "Function(<fn>)"),
            OpKind::SpecialForm(_) => write!(f, "SpecialForm(<fn>)"),
            OpKind::Place { .. } => write!(f, "Place(<fn>)"),
        }
    }
}

/// Definition of a built-in operation
#[derive(Debug, Clone)]
pub struct BuiltinOp {
    /// Symbol name, as the reader produces it (upper case)
    pub name: &'static str,
    pub op_kind: OpKind,
    /// Minimum number of arguments
    pub min_args: usize,
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl BuiltinOp {
    /// Build the runtime function value for this operation
    pub(crate) fn to_function(&self) -> Function {
        match self.op_kind {
            OpKind::Function(call) => {
                Function::Builtin(Builtin::new(self.name, self.min_args, true, call))
            }
            OpKind::SpecialForm(call) => {
                Function::Builtin(Builtin::new(self.name, self.min_args, false, call))
            }
            OpKind::Place { read, assign } => Function::Assignable(Assignable::new(
                Builtin::new(self.name, self.min_args, true, read),
                assign,
            )),
        }
    }
}

//
// Argument helpers
//

fn first(args: &Value) -> Value {
    args.car().unwrap_or(Value::Nil)
}

fn second(args: &Value) -> Value {
    args.nth(1).unwrap_or(Value::Nil)
}

fn rest(args: &Value) -> Value {
    args.cdr().unwrap_or(Value::Nil)
}

fn number_arg(value: &Value, op: &str) -> Result<Number, Error> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(Error::TypeError(format!("{op} expected a number, got {other}"))),
    }
}

/// Namespace and clause names: symbols by name, strings upper-cased
fn name_arg(value: &Value) -> Result<String, Error> {
    match value {
        Value::Symbol(sym) => Ok(sym.name().to_string()),
        Value::String(s) => Ok(s.to_uppercase()),
        other => Err(Error::TypeError(format!(
            "namespace expected a string or symbol, got {other}"
        ))),
    }
}

//
// Special forms
//

fn builtin_quote(args: &Value, _env: &mut Environment, _context: &Value) -> EvalResult {
    Ok(first(args))
}

fn builtin_backquote(args: &Value, env: &mut Environment, context: &Value) -> EvalResult {
    quasiquote::backquote(&first(args), env, context)
}

/// Validate a parameter list and capture the current scope
fn make_closure(args: &Value, env: &Environment, what: &str) -> Result<Closure, Error> {
    let params_form = first(args);
    let (proper, _) = params_form.list_info();
    if !proper {
        return Err(Error::TypeError(format!(
            "{what} expected a parameter list, got {params_form}"
        )));
    }

    let mut params = Vec::new();
    for param in params_form.iter() {
        let Value::Symbol(sym) = param else {
            return Err(Error::TypeError(format!(
                "{what} parameters must be symbols, got {param}"
            )));
        };
        if sym.is_reserved() {
            return Err(Error::ReservedSymbol(format!(
                "can't bind to reserved symbol {sym}"
            )));
        }
        params.push(sym);
    }

    Ok(Closure::new(params, env.capture_scope(), rest(args)))
}

fn builtin_lambda(args: &Value, env: &mut Environment, _context: &Value) -> EvalResult {
    let closure = make_closure(args, env, "LAMBDA")?;
    Ok(Value::Function(Rc::new(Function::Lambda(closure))))
}

fn builtin_macro(args: &Value, env: &mut Environment, _context: &Value) -> EvalResult {
    let closure = make_closure(args, env, "MACRO")?;
    Ok(Value::Function(Rc::new(Function::Macro(closure))))
}

fn builtin_var(args: &Value, env: &mut Environment, context: &Value) -> EvalResult {
    let target = first(args);
    let Value::Symbol(sym) = target else {
        return Err(Error::TypeError(format!(
            "VAR expected a symbol as first argument, got {target}"
        ))
        .into());
    };
    if sym.is_reserved() {
        return Err(Error::ReservedSymbol(format!("can't bind to reserved symbol {sym}")).into());
    }

    let value = match args.nth(1) {
        Some(form) => env.eval_form(&form, context)?,
        None => Value::Nil,
    };
    env.add_binding(sym, value.clone());
    Ok(value)
}

/// `(= place value)`
fn builtin_assign(args: &Value, env: &mut Environment, context: &Value) -> EvalResult {
    let place = first(args);
    let value_form = second(args);
    match &place {
        Value::Symbol(sym) => {
            if sym.is_reserved() {
                return Err(Error::ReservedSymbol(format!(
                    "can't assign to reserved symbol {sym}"
                ))
                .into());
            }
            let value = env.eval_form(&value_form, context)?;
            env.set_binding(sym, value.clone())?;
            Ok(value)
        }
        Value::Cons(_) => assign_place(&place, value_form, env, context),
        other => Err(Error::EvalError(format!("can't assign to {other}")).into()),
    }
}

/// Dispatch `(= (op args...) value)` to the assign half of an assignable builtin
fn assign_place(place: &Value, value_form: Value, env: &mut Environment, context: &Value) -> EvalResult {
    let head = first(place);
    let operator = env.eval_form(&head, context)?;
    let Value::Function(function) = &operator else {
        return Err(Error::EvalError(format!("can't assign to {operator}")).into());
    };
    let Some(assignable) = function.as_assignable() else {
        return Err(Error::EvalError(format!("can't assign to {operator}")).into());
    };

    let args = rest(place);
    let (proper, count) = args.list_info();
    if !proper {
        return Err(Error::EvalError(format!("assign can't evaluate a dotted list: {place}")).into());
    }
    if count < function.num_args() {
        return Err(Error::EvalError(format!("not enough arguments to function {head}")).into());
    }

    let (args, value) = if function.eval_args() {
        let args = env.eval_list(&args, context)?;
        let value = env.eval_form(&value_form, context)?;
        (args, value)
    } else {
        (args, value_form)
    };
    assignable.assign(&args, value, env, context)
}

fn builtin_scope(args: &Value, env: &mut Environment, context: &Value) -> EvalResult {
    env.with_scope(Scope::new(), |env| env.eval_body(args, context))
}

fn builtin_if(args: &Value, env: &mut Environment, context: &Value) -> EvalResult {
    if env.eval_form(&first(args), context)?.is_true() {
        env.eval_form(&second(args), context)
    } else {
        match args.nth(2) {
            Some(alternative) => env.eval_form(&alternative, context),
            None => Ok(Value::Nil),
        }
    }
}

fn builtin_progn(args: &Value, env: &mut Environment, context: &Value) -> EvalResult {
    env.eval_body(args, context)
}

fn builtin_and(args: &Value, env: &mut Environment, context: &Value) -> EvalResult {
    let mut result = Value::True;
    for form in args.iter() {
        result = env.eval_form(&form, context)?;
        if result.is_nil() {
            break;
        }
    }
    Ok(result)
}

fn builtin_or(args: &Value, env: &mut Environment, context: &Value) -> EvalResult {
    for form in args.iter() {
        let result = env.eval_form(&form, context)?;
        if result.is_true() {
            return Ok(result);
        }
    }
    Ok(Value::Nil)
}

fn run_loop(test: &Value, body: &Value, env: &mut Environment, context: &Value) -> EvalResult {
    let mut result = Value::Nil;
    while env.eval_form(test, context)?.is_true() {
        result = env.eval_body(body, context)?;
    }
    Ok(result)
}

/// `(while test body...)` yields the value of the last completed pass, or
/// `NIL` when the body never ran or the loop was left with `break`
fn builtin_while(args: &Value, env: &mut Environment, context: &Value) -> EvalResult {
    let test = first(args);
    let body = rest(args);
    env.with_depth_context(LOOP_DEPTH, |env| {
        let depth = env.depth_context(LOOP_DEPTH);
        match run_loop(&test, &body, env, context) {
            Ok(result) => Ok(result),
            Err(Flow::Signal(Signal::Break { depth: target })) if target == depth => {
                debug!(depth, "break intercepted by loop");
                Ok(Value::Nil)
            }
            Err(other) => Err(other),
        }
    })
}

/// Outcome of the protected form of a `try`
enum Protected {
    Finished(EvalResult),
    Caught(String),
}

/// `(try protected catch [always])`
///
/// A throw aimed at this `try` evaluates `catch` to a handler and calls it with
/// the payload. `always` runs exactly once after that, whatever happened.
fn builtin_try(args: &Value, env: &mut Environment, context: &Value) -> EvalResult {
    let protected = first(args);
    let handler = second(args);
    let always = args.nth(2);

    let outcome = env.with_depth_context(TRY_DEPTH, |env| {
        let depth = env.depth_context(TRY_DEPTH);
        match env.eval_form(&protected, context) {
            Err(Flow::Signal(Signal::Throw {
                message,
                depth: target,
            })) if target == depth => {
                debug!(depth, %message, "throw intercepted by try");
                Protected::Caught(message)
            }
            other => Protected::Finished(other),
        }
    });

    let result = match outcome {
        Protected::Finished(result) => result,
        Protected::Caught(message) => env.eval_form(&handler, context).and_then(|handler| {
            let call = Value::list([handler, Value::string(message)]);
            env.eval_form(&call, context)
        }),
    };

    if let Some(always) = always {
        env.eval_form(&always, context)?;
    }
    result
}

fn builtin_namespace(args: &Value, env: &mut Environment, _context: &Value) -> EvalResult {
    let mut namespace = Namespace::new(name_arg(&first(args))?, true);

    for clause in rest(args).iter() {
        if !matches!(clause, Value::Cons(_)) {
            return Err(Error::NamespaceError(format!("illegal namespace clause {clause}")).into());
        }
        let names = clause
            .to_vec()?
            .iter()
            .map(name_arg)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| {
                Error::NamespaceError(format!("namespace clause must contain only names: {clause}"))
            })?;
        let Some((keyword, operands)) = names.split_first() else {
            continue;
        };

        match keyword.as_str() {
            "USE" => {
                for name in operands {
                    let other = env.find_namespace(name).ok_or_else(|| {
                        Error::NamespaceError(format!("undefined namespace {name}"))
                    })?;
                    namespace.use_namespace(&other.borrow());
                }
            }
            "EXPORT" => {
                for name in operands {
                    namespace.intern(name)?;
                    namespace.export(name)?;
                }
            }
            "IMPORT-FROM" => {
                let Some((from, names)) = operands.split_first() else {
                    continue;
                };
                let other = env.find_namespace(from).ok_or_else(|| {
                    Error::NamespaceError(format!("import-from undefined namespace {from}"))
                })?;
                for name in names {
                    if !namespace.import(name, &other.borrow()) {
                        return Err(Error::NamespaceError(format!(
                            "import-from namespace {from} unknown symbol {name}"
                        ))
                        .into());
                    }
                }
            }
            "SHADOW" => {
                for name in operands {
                    namespace.shadow(name);
                }
            }
            other => {
                return Err(
                    Error::NamespaceError(format!("unknown namespace clause {other}")).into(),
                );
            }
        }
    }

    let namespace = env.add_namespace(namespace)?;
    Ok(Value::Namespace(namespace))
}

fn builtin_in_namespace(args: &Value, env: &mut Environment, _context: &Value) -> EvalResult {
    let name = name_arg(&first(args))?;
    let namespace = env.change_current_namespace(&name)?;
    Ok(Value::Namespace(namespace))
}

fn builtin_use_namespace(args: &Value, env: &mut Environment, _context: &Value) -> EvalResult {
    let name = name_arg(&first(args))?;
    let other = env
        .find_namespace(&name)
        .ok_or_else(|| Error::NamespaceError(format!("undefined namespace {name}")))?;
    let current = env.current_namespace();
    if !Rc::ptr_eq(&current, &other) {
        current.borrow_mut().use_namespace(&other.borrow());
    }
    Ok(Value::Namespace(other))
}

fn builtin_gensym(_args: &Value, env: &mut Environment, _context: &Value) -> EvalResult {
    Ok(Value::Symbol(env.gensym()))
}

//
// Control transfer
//

fn builtin_break(_args: &Value, env: &mut Environment, _context: &Value) -> EvalResult {
    if !env.has_depth_context(LOOP_DEPTH) {
        return Err(Error::EvalError("break can only be used inside a loop".into()).into());
    }
    Err(Flow::Signal(Signal::Break {
        depth: env.depth_context(LOOP_DEPTH),
    }))
}

fn builtin_return(args: &Value, env: &mut Environment, _context: &Value) -> EvalResult {
    if !env.has_depth_context(CALL_DEPTH) {
        return Err(Error::EvalError(
            "return can only be used inside a macro or lambda body".into(),
        )
        .into());
    }
    Err(Flow::Signal(Signal::Return {
        value: first(args),
        depth: env.depth_context(CALL_DEPTH),
    }))
}

fn builtin_throw(args: &Value, env: &mut Environment, _context: &Value) -> EvalResult {
    if !env.has_depth_context(TRY_DEPTH) {
        return Err(Error::EvalError("throw can only be used inside a try block".into()).into());
    }
    let Value::String(message) = first(args) else {
        return Err(Error::TypeError("throw expected a string as first argument".into()).into());
    };
    Err(Flow::Signal(Signal::Throw {
        message: message.to_string(),
        depth: env.depth_context(TRY_DEPTH),
    }))
}

//
// Functions
//

fn builtin_identity(args: &Value, _env: &mut Environment, _context: &Value) -> EvalResult {
    Ok(first(args))
}

fn builtin_list(args: &Value, _env: &mut Environment, _context: &Value) -> EvalResult {
    Ok(args.clone())
}

fn builtin_car(args: &Value, _env: &mut Environment, _context: &Value) -> EvalResult {
    match first(args) {
        Value::Nil => Ok(Value::Nil),
        Value::Cons(cell) => Ok(cell.car()),
        other => Err(Error::TypeError(format!("CAR expected a list, got {other}")).into()),
    }
}

fn builtin_cdr(args: &Value, _env: &mut Environment, _context: &Value) -> EvalResult {
    match first(args) {
        Value::Nil => Ok(Value::Nil),
        Value::Cons(cell) => Ok(cell.cdr()),
        other => Err(Error::TypeError(format!("CDR expected a list, got {other}")).into()),
    }
}

fn builtin_cons(args: &Value, _env: &mut Environment, _context: &Value) -> EvalResult {
    Ok(Value::cons(first(args), second(args)))
}

fn builtin_eval(args: &Value, env: &mut Environment, context: &Value) -> EvalResult {
    env.eval_form(&first(args), context)
}

fn builtin_not(args: &Value, _env: &mut Environment, _context: &Value) -> EvalResult {
    Ok(Value::from_bool(first(args).is_nil()))
}

fn builtin_eql(args: &Value, _env: &mut Environment, _context: &Value) -> EvalResult {
    Ok(Value::from_bool(first(args).eql(&second(args))))
}

fn builtin_equal(args: &Value, _env: &mut Environment, _context: &Value) -> EvalResult {
    Ok(Value::from_bool(first(args).equal(&second(args))))
}

fn builtin_type_of(args: &Value, env: &mut Environment, _context: &Value) -> EvalResult {
    let keyword = env.intern_keyword(first(args).type_name())?;
    Ok(Value::Symbol(keyword))
}

fn builtin_elt(args: &Value, _env: &mut Environment, _context: &Value) -> EvalResult {
    Ok(collections::access(&first(args), &second(args))?)
}

fn builtin_elt_assign(
    args: &Value,
    value: Value,
    _env: &mut Environment,
    _context: &Value,
) -> EvalResult {
    collections::assign(&first(args), &second(args), value.clone())?;
    Ok(value)
}

fn builtin_array(args: &Value, _env: &mut Environment, _context: &Value) -> EvalResult {
    Ok(Value::Array(Rc::new(Array::new(args.iter().collect()).into())))
}

fn builtin_make_array(args: &Value, _env: &mut Environment, _context: &Value) -> EvalResult {
    let size = match first(args) {
        Value::Number(Number::Int(n)) => usize::try_from(n).map_err(|_| {
            Error::EvalError(format!("MAKE-ARRAY expected a non-negative size, got {n}"))
        })?,
        other => {
            return Err(Error::TypeError(format!(
                "MAKE-ARRAY expected an integer size, got {other}"
            ))
            .into());
        }
    };
    let initial = second(args);
    Ok(Value::Array(Rc::new(Array::new(vec![initial; size]).into())))
}

/// Fill `collection` from `(key value)` pair arguments
fn fill_pairs<C: Collection>(mut collection: C, args: &Value, what: &str) -> Result<C, Error> {
    for pair in args.iter() {
        let (proper, length) = pair.list_info();
        if !matches!(pair, Value::Cons(_)) || !proper || length != 2 {
            return Err(Error::EvalError(format!(
                "illegal key value pair for {what}: {pair}"
            )));
        }
        collection.assign(&first(&pair), second(&pair))?;
    }
    Ok(collection)
}

fn builtin_dictionary(args: &Value, _env: &mut Environment, _context: &Value) -> EvalResult {
    let dictionary = fill_pairs(Dictionary::new(), args, "dictionary")?;
    Ok(Value::Dictionary(Rc::new(dictionary.into())))
}

fn builtin_hashtable(args: &Value, _env: &mut Environment, _context: &Value) -> EvalResult {
    let table = fill_pairs(HashTable::new(), args, "hashtable")?;
    Ok(Value::HashTable(Rc::new(table.into())))
}

fn builtin_length(args: &Value, _env: &mut Environment, _context: &Value) -> EvalResult {
    Ok(Value::from(collections::length(&first(args))?))
}

/// `(map collection function)` calls `function` with `(element key)` and
/// returns a collection of the same kind; lists and strings map to lists
fn builtin_map(args: &Value, env: &mut Environment, context: &Value) -> EvalResult {
    let target = first(args);
    let entries = collections::entries(&target)
        .map_err(|_| Error::TypeError(format!("MAP expected a collection, got {target}")))?;
    let Value::Function(function) = second(args) else {
        return Err(Error::TypeError("MAP expected a function as second argument".into()).into());
    };

    let mut mapped = Vec::with_capacity(entries.len());
    for (element, key) in entries {
        let value = env.apply(&function, &Value::list([element, key.clone()]), context)?;
        mapped.push((key, value));
    }

    match target {
        Value::Array(_) => Ok(Value::Array(Rc::new(
            Array::new(mapped.into_iter().map(|(_, value)| value).collect()).into(),
        ))),
        Value::Dictionary(_) => {
            let mut dictionary = Dictionary::new();
            for (key, value) in mapped {
                dictionary.assign(&key, value)?;
            }
            Ok(Value::Dictionary(Rc::new(dictionary.into())))
        }
        Value::HashTable(_) => {
            let mut table = HashTable::new();
            for (key, value) in mapped {
                table.assign(&key, value)?;
            }
            Ok(Value::HashTable(Rc::new(table.into())))
        }
        _ => Ok(Value::list(mapped.into_iter().map(|(_, value)| value))),
    }
}

//
// Numbers
//

#[derive(Debug, Clone, Copy)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithOp {
    fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Rem => "%",
        }
    }

    fn apply(self, a: Number, b: Number) -> Result<Number, Error> {
        if matches!(self, ArithOp::Div | ArithOp::Rem) && b.is_zero() {
            return Err(Error::EvalError(format!("division by zero in {}", self.symbol())));
        }
        match (a, b) {
            (Number::Int(x), Number::Int(y)) => {
                let result: Option<NumberType> = match self {
                    ArithOp::Add => x.checked_add(y),
                    ArithOp::Sub => x.checked_sub(y),
                    ArithOp::Mul => x.checked_mul(y),
                    ArithOp::Div => x.checked_div(y),
                    ArithOp::Rem => x.checked_rem(y),
                };
                result
                    .map(Number::Int)
                    .ok_or_else(|| Error::EvalError(format!("integer overflow in {}", self.symbol())))
            }
            (a, b) => {
                let (x, y) = (a.as_f64(), b.as_f64());
                Ok(Number::Float(match self {
                    ArithOp::Add => x + y,
                    ArithOp::Sub => x - y,
                    ArithOp::Mul => x * y,
                    ArithOp::Div => x / y,
                    ArithOp::Rem => x % y,
                }))
            }
        }
    }

    /// Left fold over the arguments. A single argument is combined with the
    /// identity first, so `(- x)` negates and `(/ x)` inverts.
    fn fold(self, args: &Value) -> EvalResult {
        let identity = match self {
            ArithOp::Add | ArithOp::Sub => Number::Int(0),
            ArithOp::Mul | ArithOp::Div | ArithOp::Rem => Number::Int(1),
        };
        let mut numbers = args.iter();
        let mut acc = match numbers.next() {
            None => identity,
            Some(value) => number_arg(&value, self.symbol())?,
        };
        let mut count = 1;
        for value in numbers {
            acc = self.apply(acc, number_arg(&value, self.symbol())?)?;
            count += 1;
        }
        if count == 1 && matches!(self, ArithOp::Sub | ArithOp::Div) {
            acc = self.apply(identity, acc)?;
        }
        Ok(Value::Number(acc))
    }
}

macro_rules! arithmetic_op {
    ($name:ident, $op:expr) => {
        fn $name(args: &Value, _env: &mut Environment, _context: &Value) -> EvalResult {
            $op.fold(args)
        }
    };
}

arithmetic_op!(builtin_add, ArithOp::Add);
arithmetic_op!(builtin_sub, ArithOp::Sub);
arithmetic_op!(builtin_mul, ArithOp::Mul);
arithmetic_op!(builtin_div, ArithOp::Div);
arithmetic_op!(builtin_rem, ArithOp::Rem);

// Macro to generate chained numeric comparison functions
macro_rules! numeric_comparison {
    ($name:ident, $op_str:expr, $ordering:pat) => {
        fn $name(args: &Value, _env: &mut Environment, _context: &Value) -> EvalResult {
            let mut numbers = args.iter();
            let mut prev = number_arg(&numbers.next().unwrap_or(Value::Nil), $op_str)?;

            // All adjacent pairs must satisfy the comparison
            for value in numbers {
                let current = number_arg(&value, $op_str)?;
                if !matches!(prev.compare(current), Some($ordering)) {
                    return Ok(Value::Nil);
                }
                prev = current;
            }

            Ok(Value::True)
        }
    };
}

// Generate all comparison functions
numeric_comparison!(builtin_lt, "<", Ordering::Less);
numeric_comparison!(builtin_gt, ">", Ordering::Greater);
numeric_comparison!(builtin_le, "<=", Ordering::Less | Ordering::Equal);
numeric_comparison!(builtin_ge, ">=", Ordering::Greater | Ordering::Equal);

fn extremum(args: &Value, op: &str, wanted: Ordering) -> EvalResult {
    let mut best = number_arg(&first(args), op)?;
    for value in args.iter().skip(1) {
        let candidate = number_arg(&value, op)?;
        if candidate.compare(best) == Some(wanted) {
            best = candidate;
        }
    }
    Ok(Value::Number(best))
}

fn builtin_max(args: &Value, _env: &mut Environment, _context: &Value) -> EvalResult {
    extremum(args, "MAX", Ordering::Greater)
}

fn builtin_min(args: &Value, _env: &mut Environment, _context: &Value) -> EvalResult {
    extremum(args, "MIN", Ordering::Less)
}

/// Global registry of all built-in operations.
///
/// Kept as a single contiguous collection of `BuiltinOp` values for ease of
/// auditing. Built once, on first use, via a `LazyLock`.
static BUILTIN_OPS: LazyLock<Vec<BuiltinOp>> = LazyLock::new(|| {
    const fn special(name: &'static str, min_args: usize, call: NativeFn) -> BuiltinOp {
        BuiltinOp {
            name,
            op_kind: OpKind::SpecialForm(call),
            min_args,
        }
    }

    const fn function(name: &'static str, min_args: usize, call: NativeFn) -> BuiltinOp {
        BuiltinOp {
            name,
            op_kind: OpKind::Function(call),
            min_args,
        }
    }

    vec![
        // Quotation
        special("QUOTE", 1, builtin_quote),
        special("BACKQUOTE", 1, builtin_backquote),
        function("UNQUOTE", 1, builtin_identity),
        function("SPLICE", 1, builtin_identity),
        // Functions and bindings
        special("LAMBDA", 1, builtin_lambda),
        special("MACRO", 1, builtin_macro),
        special("VAR", 1, builtin_var),
        special("=", 2, builtin_assign),
        special("SCOPE", 0, builtin_scope),
        special("GENSYM", 0, builtin_gensym),
        // Control flow
        special("IF", 2, builtin_if),
        special("PROGN", 0, builtin_progn),
        special("DO", 0, builtin_progn),
        special("AND", 0, builtin_and),
        special("OR", 0, builtin_or),
        special("WHILE", 1, builtin_while),
        special("TRY", 2, builtin_try),
        special("BREAK", 0, builtin_break),
        function("RETURN", 0, builtin_return),
        function("THROW", 1, builtin_throw),
        // Namespaces
        special("NAMESPACE", 1, builtin_namespace),
        special("IN-NAMESPACE", 1, builtin_in_namespace),
        special("USE-NAMESPACE", 1, builtin_use_namespace),
        // Lists and evaluation
        function("LIST", 0, builtin_list),
        function("CAR", 1, builtin_car),
        function("CDR", 1, builtin_cdr),
        function("CONS", 2, builtin_cons),
        function("EVAL", 1, builtin_eval),
        // Predicates
        function("NOT", 1, builtin_not),
        function("EQL", 2, builtin_eql),
        function("EQUAL", 2, builtin_equal),
        function("TYPE-OF", 1, builtin_type_of),
        // Collections
        BuiltinOp {
            name: "ELT",
            op_kind: OpKind::Place {
                read: builtin_elt,
                assign: builtin_elt_assign,
            },
            min_args: 2,
        },
        function("ARRAY", 0, builtin_array),
        function("MAKE-ARRAY", 1, builtin_make_array),
        function("DICTIONARY", 0, builtin_dictionary),
        function("HASHTABLE", 0, builtin_hashtable),
        function("LENGTH", 1, builtin_length),
        function("MAP", 2, builtin_map),
        // Arithmetic
        function("+", 0, builtin_add),
        function("-", 1, builtin_sub),
        function("*", 0, builtin_mul),
        function("/", 1, builtin_div),
        function("%", 2, builtin_rem),
        // Comparison
        function("<", 2, builtin_lt),
        function("<=", 2, builtin_le),
        function(">", 2, builtin_gt),
        function(">=", 2, builtin_ge),
        function("MAX", 1, builtin_max),
        function("MIN", 1, builtin_min),
    ]
});

/// Lazy static map from name to BuiltinOp (private - use find_builtin_op)
static BUILTIN_BY_NAME: LazyLock<HashMap<&'static str, &'static BuiltinOp>> =
    LazyLock::new(|| {
        let ops: &'static [BuiltinOp] = BUILTIN_OPS.as_slice();
        ops.iter().map(|op| (op.name, op)).collect()
    });

/// Get all builtin operations
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS.as_slice()
}

/// Find a builtin operation by its symbol name
pub fn find_builtin_op(name: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_BY_NAME.get(name).copied()
}

/// Install every builtin into the environment's system namespace
pub(crate) fn install(env: &mut Environment) {
    for op in get_builtin_ops() {
        env.install_function(op.name, op.to_function());
    }
}
