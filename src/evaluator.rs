//! The environment and the evaluation algorithm.
//!
//! An [`Environment`] owns everything an interpreter instance needs: the
//! namespace registry, the scope chain, the depth-context counters that scope
//! `return`, `break` and `throw`, and the gensym counter. Nothing is global, so
//! independent environments can coexist in one process.
//!
//! ```
//! use lispcore::{Environment, Value};
//!
//! let mut env = Environment::new();
//! let result = env.eval_str("((lambda (x) (+ x 1)) 41)").unwrap();
//! assert_eq!(result, Value::from(42));
//! ```

pub mod function;
pub mod quasiquote;
pub mod scope;
pub mod signal;

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::ast::{SymbolRef, Value};
use crate::builtinops;
use crate::namespace::{Namespace, NamespaceRef};
use crate::{Config, Error};

pub use function::{Assignable, Builtin, Closure, Function};
pub use scope::Scope;
pub use signal::{CALL_DEPTH, EvalResult, Flow, LOOP_DEPTH, Signal, TRY_DEPTH};

use scope::ScopeChain;

/// Locked namespace holding the standard library
pub const SYSTEM_NAMESPACE: &str = "GLISP";
/// Namespace of self-evaluating keywords
pub const KEYWORD_NAMESPACE: &str = "KEYWORD";
/// Namespace that is current when an environment starts
pub const USER_NAMESPACE: &str = "USER";

/// Symbols the evaluator and the reader refer to directly
#[derive(Debug, Clone)]
pub struct SystemSymbols {
    pub nil: SymbolRef,
    pub t: SymbolRef,
    /// Bound to the arguments left over after positional parameters
    pub rest: SymbolRef,
    /// Bound to the running lambda, for anonymous recursion
    pub self_ref: SymbolRef,
    pub quote: SymbolRef,
    pub backquote: SymbolRef,
    pub unquote: SymbolRef,
    pub splice: SymbolRef,
}

/// Interpreter state
pub struct Environment {
    namespaces: HashMap<String, NamespaceRef>,
    current: NamespaceRef,
    system: NamespaceRef,
    keywords: NamespaceRef,
    scopes: ScopeChain,
    contexts: HashMap<String, usize>,
    gensym_counter: u64,
    eval_depth: usize,
    config: Config,
    symbols: SystemSymbols,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Bootstrap the `GLISP`, `KEYWORD` and `USER` namespaces and install the
    /// standard library. `USER` is current and uses `GLISP`.
    pub fn with_config(config: Config) -> Self {
        let mut system = Namespace::new(SYSTEM_NAMESPACE, false);
        let symbols = SystemSymbols {
            nil: system.define_symbol("NIL", true, Some(Value::Nil), true),
            t: system.define_symbol("T", true, Some(Value::True), true),
            rest: system.define_symbol("&REST", true, None, true),
            self_ref: system.define_symbol("&SELF", true, None, true),
            quote: system.define_symbol("QUOTE", true, None, true),
            backquote: system.define_symbol("BACKQUOTE", true, None, true),
            unquote: system.define_symbol("UNQUOTE", true, None, true),
            splice: system.define_symbol("SPLICE", true, None, true),
        };
        let system = system.into_ref();
        let keywords = Namespace::keyword_namespace(KEYWORD_NAMESPACE).into_ref();
        let user = Namespace::new(USER_NAMESPACE, true).into_ref();

        let mut env = Environment {
            namespaces: HashMap::new(),
            current: Rc::clone(&user),
            system: Rc::clone(&system),
            keywords: Rc::clone(&keywords),
            scopes: ScopeChain::new(),
            contexts: HashMap::new(),
            gensym_counter: 0,
            eval_depth: 0,
            config,
            symbols,
        };
        for ns in [&system, &keywords, &user] {
            let name = ns.borrow().name().to_string();
            env.namespaces.insert(name, Rc::clone(ns));
        }

        let (nil, t) = (env.symbols.nil.clone(), env.symbols.t.clone());
        env.add_global_binding(nil, Value::Nil);
        env.add_global_binding(t, Value::True);
        builtinops::install(&mut env);

        user.borrow_mut().use_namespace(&system.borrow());
        debug!(namespace = USER_NAMESPACE, "environment bootstrapped");
        env
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn system_symbols(&self) -> &SystemSymbols {
        &self.symbols
    }

    //
    // Namespace registry
    //

    pub fn find_namespace(&self, name: &str) -> Option<NamespaceRef> {
        self.namespaces.get(name).cloned()
    }

    /// Register a namespace; fails if the name is taken
    pub fn add_namespace(&mut self, namespace: Namespace) -> Result<NamespaceRef, Error> {
        let name = namespace.name().to_string();
        if self.namespaces.contains_key(&name) {
            return Err(Error::NamespaceError(format!(
                "namespace {name} already exists"
            )));
        }
        let namespace = namespace.into_ref();
        self.namespaces.insert(name.clone(), Rc::clone(&namespace));
        debug!(namespace = %name, "namespace added");
        Ok(namespace)
    }

    /// Make the named namespace current. Locked namespaces can't become current.
    pub fn change_current_namespace(&mut self, name: &str) -> Result<NamespaceRef, Error> {
        let namespace = self
            .find_namespace(name)
            .ok_or_else(|| Error::NamespaceError(format!("undefined namespace {name}")))?;
        if !namespace.borrow().can_intern() {
            return Err(Error::NamespaceError(format!("namespace {name} is locked")));
        }
        self.current = Rc::clone(&namespace);
        debug!(namespace = %name, "current namespace changed");
        Ok(namespace)
    }

    pub fn current_namespace(&self) -> NamespaceRef {
        Rc::clone(&self.current)
    }

    pub fn system_namespace(&self) -> NamespaceRef {
        Rc::clone(&self.system)
    }

    pub fn keyword_namespace(&self) -> NamespaceRef {
        Rc::clone(&self.keywords)
    }

    /// Find or create `name` in the current namespace
    pub fn intern_symbol(&mut self, name: &str) -> Result<SymbolRef, Error> {
        self.current.borrow_mut().intern(name)
    }

    /// Find or create the keyword `name`. New keywords get a global binding to
    /// themselves, which makes them self-evaluating.
    pub fn intern_keyword(&mut self, name: &str) -> Result<SymbolRef, Error> {
        let existing = self.keywords.borrow().find_symbol(name);
        if let Some(sym) = existing {
            return Ok(sym);
        }
        let sym = self.keywords.borrow_mut().intern(name)?;
        self.add_global_binding(sym.clone(), Value::Symbol(sym.clone()));
        Ok(sym)
    }

    /// Create a fresh symbol in the current namespace, replacing any previous one
    pub fn define_symbol(
        &mut self,
        name: &str,
        reserved: bool,
        value: Option<Value>,
        export: bool,
    ) -> SymbolRef {
        self.current
            .borrow_mut()
            .define_symbol(name, reserved, value, export)
    }

    /// Qualified lookup `PKG:name`: only exported symbols are visible
    pub fn find_exported_symbol_in_namespace(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<SymbolRef, Error> {
        let ns = self
            .find_namespace(namespace)
            .ok_or_else(|| Error::NamespaceError(format!("undefined namespace {namespace}")))?;
        let found = ns.borrow().find_exported_symbol(name);
        found.ok_or_else(|| {
            Error::NamespaceError(format!("{name} is not exported from {namespace}"))
        })
    }

    /// Qualified lookup `PKG::name`: any interned symbol, interned on demand
    /// unless the namespace is locked
    pub fn find_interned_symbol_in_namespace(
        &mut self,
        namespace: &str,
        name: &str,
    ) -> Result<SymbolRef, Error> {
        let ns = self
            .find_namespace(namespace)
            .ok_or_else(|| Error::NamespaceError(format!("undefined namespace {namespace}")))?;
        if Rc::ptr_eq(&ns, &self.keywords) {
            return self.intern_keyword(name);
        }
        ns.borrow_mut().intern(name)
    }

    /// Uninterned symbol with a unique name
    pub fn gensym(&mut self) -> SymbolRef {
        self.gensym_counter += 1;
        let sym = SymbolRef::uninterned(format!("G{}", self.gensym_counter));
        trace!(symbol = %sym, "gensym");
        sym
    }

    //
    // Scope chain
    //

    pub fn push_scope(&mut self, scope: Scope) {
        trace!(depth = self.scopes.depth() + 1, "push scope");
        self.scopes.push(scope);
    }

    /// Pop the innermost scope. The global scope is never popped.
    pub fn pop_scope(&mut self) -> Option<Scope> {
        trace!(depth = self.scopes.depth(), "pop scope");
        self.scopes.pop()
    }

    pub fn current_scope(&self) -> Scope {
        self.scopes.current().clone()
    }

    /// Snapshot of all non-global bindings, innermost winning, for closures
    pub fn capture_scope(&self) -> Scope {
        self.scopes.capture()
    }

    pub fn add_binding(&mut self, sym: SymbolRef, value: Value) {
        self.scopes.current().insert(sym, value);
    }

    pub fn add_global_binding(&mut self, sym: SymbolRef, value: Value) {
        self.scopes.global().insert(sym, value);
    }

    pub fn get_binding(&self, sym: &SymbolRef) -> Option<Value> {
        self.scopes.get(sym)
    }

    /// Assign to the innermost existing binding of `sym`
    pub fn set_binding(&mut self, sym: &SymbolRef, value: Value) -> Result<(), Error> {
        if self.scopes.set(sym, value) {
            Ok(())
        } else {
            Err(Error::UnboundSymbol(format!("can't assign to {sym} before binding it")))
        }
    }

    /// Sorted `(name, value)` pairs of the global scope
    pub fn global_bindings(&self) -> Vec<(String, Value)> {
        self.scopes.global().bindings()
    }

    /// Run `f` with `scope` pushed, popping it on every exit path
    pub(crate) fn with_scope<R>(&mut self, scope: Scope, f: impl FnOnce(&mut Self) -> R) -> R {
        self.push_scope(scope);
        let result = f(self);
        self.pop_scope();
        result
    }

    //
    // Depth contexts
    //

    /// Increment the named counter and return its new value
    pub fn push_depth_context(&mut self, key: &str) -> usize {
        let counter = self.contexts.entry(key.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    pub fn pop_depth_context(&mut self, key: &str) {
        if let Some(counter) = self.contexts.get_mut(key) {
            *counter = counter.saturating_sub(1);
        }
    }

    pub fn depth_context(&self, key: &str) -> usize {
        self.contexts.get(key).copied().unwrap_or(0)
    }

    pub fn has_depth_context(&self, key: &str) -> bool {
        self.depth_context(key) > 0
    }

    /// Run `f` with the named counter incremented, decrementing it on every exit path
    pub(crate) fn with_depth_context<R>(
        &mut self,
        key: &str,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.push_depth_context(key);
        let result = f(self);
        self.pop_depth_context(key);
        result
    }

    //
    // Evaluation
    //

    /// Evaluate a parsed form. `context` is an opaque value handed unchanged to
    /// every function called during the evaluation.
    pub fn eval(&mut self, expr: &Value, context: &Value) -> Result<Value, Error> {
        self.eval_form(expr, context).map_err(Flow::into_error)
    }

    /// Read and evaluate every form in `source`, returning the last value
    #[cfg(feature = "reader")]
    pub fn eval_str(&mut self, source: &str) -> Result<Value, Error> {
        let data = crate::reader::parse_data(source, &crate::reader::ReaderConfig::default())?;
        let mut result = Value::Nil;
        // Each form is interned just before it runs so namespace changes apply to what follows
        for datum in &data {
            let form = datum.to_value(self)?;
            result = self.eval(&form, &Value::Nil)?;
        }
        Ok(result)
    }

    /// Evaluation with both error channels exposed, used by builtins
    pub fn eval_form(&mut self, expr: &Value, context: &Value) -> EvalResult {
        if self.eval_depth >= self.config.max_eval_depth {
            return Err(Error::EvalError(format!(
                "Evaluation depth limit exceeded (max: {})",
                self.config.max_eval_depth
            ))
            .into());
        }
        self.eval_depth += 1;
        let result = match expr {
            Value::Symbol(sym) => self
                .get_binding(sym)
                .ok_or_else(|| Error::UnboundSymbol(sym.to_string()).into()),
            Value::Cons(_) => self
                .eval_application(expr, context)
                .map_err(|flow| add_context(flow, expr)),
            _ => Ok(expr.clone()),
        };
        self.eval_depth -= 1;
        result
    }

    fn eval_application(&mut self, expr: &Value, context: &Value) -> EvalResult {
        let (head, args) = match expr {
            Value::Cons(cell) => (cell.car(), cell.cdr()),
            _ => return Ok(expr.clone()),
        };

        let operator = self.eval_form(&head, context)?;
        let Value::Function(function) = operator else {
            return Err(Error::TypeError(format!("{operator} is not a function")).into());
        };

        let (proper, count) = args.list_info();
        if !proper {
            return Err(Error::EvalError(format!("can't evaluate a dotted list: {expr}")).into());
        }
        if count < function.num_args() {
            return Err(
                Error::arity_error_with_expr(function.num_args(), count, expr.to_string()).into(),
            );
        }

        let args = if function.eval_args() {
            self.eval_list(&args, context)?
        } else {
            args
        };
        function.call(&args, self, context)
    }

    /// Evaluate every element of `list` left to right into fresh cells
    pub fn eval_list(&mut self, list: &Value, context: &Value) -> EvalResult {
        let mut builder = crate::ast::ListBuilder::new();
        for item in list.iter() {
            builder.push(self.eval_form(&item, context)?);
        }
        Ok(builder.finish())
    }

    /// Evaluate forms in sequence; the last value wins and an empty body is `NIL`
    pub fn eval_body(&mut self, body: &Value, context: &Value) -> EvalResult {
        let mut result = Value::Nil;
        for form in body.iter() {
            result = self.eval_form(&form, context)?;
        }
        Ok(result)
    }

    /// Call `function` with already prepared arguments, checking its arity
    pub fn apply(&mut self, function: &Rc<Function>, args: &Value, context: &Value) -> EvalResult {
        let (proper, count) = args.list_info();
        if !proper {
            return Err(Error::EvalError(format!("can't apply to a dotted list: {args}")).into());
        }
        if count < function.num_args() {
            return Err(Error::arity_error(function.num_args(), count).into());
        }
        function.call(args, self, context)
    }

    //
    // Host embedding
    //

    /// Install `function` under `name` in the system namespace, binding it globally
    pub(crate) fn install_function(&mut self, name: &str, function: Function) -> SymbolRef {
        let existing = self.system.borrow().find_symbol(name);
        let sym = match existing {
            Some(sym) => sym,
            None => self
                .system
                .borrow_mut()
                .define_symbol(name, true, None, true),
        };
        self.add_global_binding(sym.clone(), Value::Function(Rc::new(function)));
        sym
    }

    /// Register a host closure as a builtin.
    ///
    /// The name is upper-cased like every symbol the reader produces. The
    /// builtin lives in the locked `GLISP` namespace and becomes visible in
    /// every namespace that uses it.
    ///
    /// # Example
    /// ```
    /// use lispcore::{Environment, Error, Value};
    /// use lispcore::evaluator::Flow;
    ///
    /// let mut env = Environment::new();
    /// env.register_builtin("shout", 1, true, |args, _env, _context| match args.car() {
    ///     Some(Value::String(s)) => Ok(Value::string(s.to_uppercase())),
    ///     _ => Err(Flow::from(Error::TypeError("shout expected a string".into()))),
    /// });
    /// assert_eq!(env.eval_str("(shout \"hi\")").unwrap(), Value::from("HI"));
    /// ```
    pub fn register_builtin<F>(
        &mut self,
        name: &str,
        num_args: usize,
        eval_args: bool,
        func: F,
    ) -> SymbolRef
    where
        F: Fn(&Value, &mut Environment, &Value) -> EvalResult + 'static,
    {
        let name = name.to_uppercase();
        let builtin = Builtin::new(name.clone(), num_args, eval_args, func);
        let sym = self.install_function(&name, Function::Builtin(builtin));
        for namespace in self.namespaces.values() {
            let uses_system = namespace.borrow().uses(SYSTEM_NAMESPACE);
            if uses_system {
                namespace.borrow_mut().add(sym.clone(), false);
            }
        }
        debug!(builtin = %name, "builtin registered");
        sym
    }
}

/// Helper function to add expression context to errors, once
fn add_context(flow: Flow, expr: &Value) -> Flow {
    const MARKER: &str = "\n  Context: ";
    match flow {
        Flow::Error(Error::EvalError(msg)) if !msg.contains(MARKER) => {
            Flow::Error(Error::EvalError(format!("{msg}{MARKER}while evaluating: {expr}")))
        }
        Flow::Error(Error::TypeError(msg)) if !msg.contains(MARKER) => {
            Flow::Error(Error::TypeError(format!("{msg}{MARKER}while evaluating: {expr}")))
        }
        // Signals and the remaining errors already carry their own context
        other => other,
    }
}
