//! Backquote expansion.
//!
//! The expander walks the template and copies it into fresh cons cells.
//! `UNQUOTE` forms are replaced by their value and `SPLICE` list elements are
//! replaced by the elements of their value. Nested backquotes raise the
//! quotation level; unquotes inside them are rebuilt, not evaluated, until the
//! level drops back to zero.

use super::Environment;
use super::signal::EvalResult;
use crate::Error;
use crate::ast::{ListBuilder, SymbolRef, Value};

/// If `form` is exactly `(tag x)`, return `x`
fn tagged(form: &Value, tag: &SymbolRef) -> Option<Value> {
    let cell = form.as_cons()?;
    match (cell.car(), cell.cdr()) {
        (Value::Symbol(sym), Value::Cons(rest)) if sym == *tag && rest.cdr().is_nil() => {
            Some(rest.car())
        }
        _ => None,
    }
}

/// Expand the template `form` of a backquote
pub(crate) fn backquote(form: &Value, env: &mut Environment, context: &Value) -> EvalResult {
    let splice = env.system_symbols().splice.clone();
    if tagged(form, &splice).is_some() {
        return Err(Error::EvalError(format!("can't splice outside of a list: {form}")).into());
    }
    expand(form, 0, env, context)
}

fn expand(form: &Value, level: usize, env: &mut Environment, context: &Value) -> EvalResult {
    if !matches!(form, Value::Cons(_)) {
        return Ok(form.clone());
    }

    let symbols = env.system_symbols().clone();

    if let Some(inner) = tagged(form, &symbols.unquote) {
        return match level {
            0 => env.eval_form(&inner, context),
            _ => {
                let rebuilt = expand(&inner, level - 1, env, context)?;
                Ok(Value::list([Value::Symbol(symbols.unquote), rebuilt]))
            }
        };
    }

    if let Some(inner) = tagged(form, &symbols.splice) {
        if level == 0 {
            return Err(Error::EvalError(format!("can't splice outside of a list: {form}")).into());
        }
        let rebuilt = expand(&inner, level - 1, env, context)?;
        return Ok(Value::list([Value::Symbol(symbols.splice), rebuilt]));
    }

    if let Some(inner) = tagged(form, &symbols.backquote) {
        let rebuilt = expand(&inner, level + 1, env, context)?;
        return Ok(Value::list([Value::Symbol(symbols.backquote), rebuilt]));
    }

    let mut builder = ListBuilder::new();
    let mut current = form.clone();
    let mut first = true;
    loop {
        // `(a . ,b)` reads as (A UNQUOTE B): the tail itself is an unquote form
        if !first && tagged(&current, &symbols.unquote).is_some() {
            let tail = expand(&current, level, env, context)?;
            return Ok(builder.finish_with_tail(tail));
        }
        first = false;

        match current {
            Value::Cons(cell) => {
                let element = cell.car();
                match tagged(&element, &symbols.splice) {
                    Some(inner) if level == 0 => {
                        let spliced = env.eval_form(&inner, context)?;
                        let (proper, _) = spliced.list_info();
                        if !proper {
                            return Err(Error::EvalError(format!(
                                "splice expected a list, got {spliced}"
                            ))
                            .into());
                        }
                        builder.append(&spliced);
                    }
                    Some(inner) => {
                        let rebuilt = expand(&inner, level - 1, env, context)?;
                        builder.push(Value::list([Value::Symbol(symbols.splice.clone()), rebuilt]));
                    }
                    None => builder.push(expand(&element, level, env, context)?),
                }
                current = cell.cdr();
            }
            Value::Nil => return Ok(builder.finish()),
            tail => return Ok(builder.finish_with_tail(tail)),
        }
    }
}

#[cfg(all(test, feature = "reader"))]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use crate::Environment;
    use crate::ast::val;

    #[test]
    fn test_expansion_allocates_fresh_cells() {
        let mut env = Environment::new();
        env.eval_str("(var tail (list 3 4))").unwrap();
        let built = env.eval_str("`(1 2 ,@tail)").unwrap();
        assert_eq!(built, val([1, 2, 3, 4]));

        // Mutating the result must not touch the spliced list
        env.eval_str("(var built `(1 2 ,@tail))").unwrap();
        env.eval_str("(= (elt built 2) 99)").unwrap();
        assert_eq!(env.eval_str("tail").unwrap(), val([3, 4]));

        // A template without any unquote is still copied
        env.eval_str("(var f (lambda () `(a b)))").unwrap();
        env.eval_str("(var first (f))").unwrap();
        env.eval_str("(= (elt first 0) 1)").unwrap();
        assert_eq!(env.eval_str("(car (f))").unwrap().to_string(), "A");
    }

    #[test]
    fn test_nested_levels() {
        let mut env = Environment::new();
        env.eval_str("(var x 5)").unwrap();
        let nested = env.eval_str("``(a ,(+ 1 1))").unwrap();
        assert_eq!(nested.to_string(), "(BACKQUOTE (A (UNQUOTE (+ 1 1))))");

        let double = env.eval_str("`(a `(b ,,x))").unwrap();
        assert_eq!(double.to_string(), "(A (BACKQUOTE (B (UNQUOTE 5))))");

        let dotted = env.eval_str("`(1 . ,(list 2 3))").unwrap();
        assert_eq!(dotted, val([1, 2, 3]));
    }
}
