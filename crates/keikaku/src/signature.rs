//! Parameter binding for protocol/sequence calls.
//!
//! A deliberately small calling convention for a *function* value:
//! positional parameters, some of which carry a trailing default, plus one
//! optional rest parameter — no keyword arguments, no `*args`/`**kwargs`.

use std::rc::Rc;

use crate::ast::Params;
use crate::exception::{ErrorKind, RaisedError};
use crate::value::Value;

/// Binds a call's already-evaluated, already-spread-expanded argument
/// vector to `params`, evaluating defaults (via `eval_default`) for any
/// trailing parameters the caller didn't supply.
pub fn bind_arguments(
    params: &Params,
    args: Vec<Value>,
    mut eval_default: impl FnMut(&crate::ast::Expr) -> Result<Value, RaisedError>,
) -> Result<Vec<(Rc<str>, Value)>, RaisedError> {
    let required = params.names.len() - params.defaults.len();
    if args.len() < required || (params.rest.is_none() && args.len() > params.names.len()) {
        return Err(RaisedError::new(
            ErrorKind::TypeMismatch,
            format!("expected {} to {} argument(s), got {}", required, arg_upper_bound(params), args.len()),
        ));
    }

    let mut bound = Vec::with_capacity(params.names.len() + usize::from(params.rest.is_some()));
    let mut args = args.into_iter();
    for (i, name) in params.names.iter().enumerate() {
        let value = if let Some(v) = args.next() {
            v
        } else {
            let default_index = i - required;
            eval_default(&params.defaults[default_index])?
        };
        bound.push((Rc::clone(name), value));
    }
    if let Some(rest_name) = &params.rest {
        let rest: Vec<Value> = args.collect();
        bound.push((Rc::clone(rest_name), Value::list(rest)));
    }
    Ok(bound)
}

fn arg_upper_bound(params: &Params) -> String {
    if params.rest.is_some() {
        "any number of".to_string()
    } else {
        params.names.len().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    fn params(names: &[&str], n_defaults: usize, rest: Option<&str>) -> Params {
        Params {
            names: names.iter().map(|s| Rc::from(*s)).collect(),
            defaults: (0..n_defaults).map(|_| Expr::IntLit(0)).collect(),
            rest: rest.map(Rc::from),
        }
    }

    #[test]
    fn fills_trailing_default() {
        let p = params(&["a", "b"], 1, None);
        let bound = bind_arguments(&p, vec![Value::Int(1)], |_| Ok(Value::Int(99))).unwrap();
        assert_eq!(bound[1].1, Value::Int(99));
    }

    #[test]
    fn collects_rest_parameter() {
        let p = params(&["a"], 0, Some("rest"));
        let bound = bind_arguments(&p, vec![Value::Int(1), Value::Int(2), Value::Int(3)], |_| unreachable!()).unwrap();
        match &bound[1].1 {
            Value::List(l) => assert_eq!(l.borrow().len(), 2),
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn too_few_arguments_is_type_mismatch() {
        let p = params(&["a", "b"], 0, None);
        let err = bind_arguments(&p, vec![Value::Int(1)], |_| unreachable!()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }
}
