//! The fixed builtin library: host operations exposed to Keikaku programs
//! as ordinary callable values in the global scope.
//!
//! Each builtin is a free function `fn builtin_x(...) -> RunResult<Value>`
//! registered into the evaluator's global [`crate::namespace::Namespace`]
//! as a [`Value::Builtin`] entry rather than dispatched through a separate
//! opcode.

use std::rc::Rc;

use chrono::Utc;
use indexmap::IndexMap;
use rand::Rng;

use crate::eval::Evaluator;
use crate::exception::{ErrorKind, RaisedError, RunResult};
use crate::function::BuiltinFn;
use crate::generator::Generator;
use crate::value::{PromiseState, Value};

/// Installs every builtin into `eval`'s global scope. Called once from
/// [`Evaluator::new`](crate::eval::Evaluator::new).
pub fn install(eval: &mut Evaluator) {
    // ---- I/O ------------------------------------------------------------
    def(eval, "declare", builtin_declare);
    def(eval, "announce", builtin_declare);
    def(eval, "inquire", builtin_inquire);

    // ---- Introspection ------------------------------------------------
    def(eval, "measure", builtin_measure);
    def(eval, "classify", builtin_classify);

    // ---- Conversions ----------------------------------------------------
    def(eval, "text", builtin_text);
    def(eval, "number", builtin_number);
    def(eval, "decimal", builtin_decimal);
    def(eval, "boolean", builtin_boolean);

    // ---- Ranges -----------------------------------------------------------
    def(eval, "span", builtin_span);

    // ---- File I/O -------------------------------------------------------
    def(eval, "inscribe", builtin_inscribe);
    def(eval, "decipher", builtin_decipher);
    def(eval, "chronicle", builtin_chronicle);
    def(eval, "exists", builtin_exists);

    // ---- Numerics -------------------------------------------------------
    def(eval, "abs", builtin_abs);
    def(eval, "sqrt", builtin_sqrt);
    def(eval, "min", builtin_min);
    def(eval, "max", builtin_max);
    def(eval, "random", builtin_random);

    // ---- Strings ----------------------------------------------------------
    def(eval, "uppercase", builtin_uppercase);
    def(eval, "lowercase", builtin_lowercase);
    def(eval, "split", builtin_split);
    def(eval, "join", builtin_join);
    def(eval, "contains", builtin_contains);

    // ---- Lists ------------------------------------------------------------
    def(eval, "push", builtin_push);
    def(eval, "reverse", builtin_reverse);

    // ---- Time -------------------------------------------------------------
    def(eval, "clock", builtin_clock);
    def(eval, "timestamp", builtin_timestamp);

    // ---- Process ----------------------------------------------------------
    def(eval, "terminate", builtin_terminate);

    // ---- Higher-order -----------------------------------------------------
    def(eval, "transform", builtin_transform);
    def(eval, "select", builtin_select);
    def(eval, "fold", builtin_fold);

    // ---- JSON ---------------------------------------------------------
    def(eval, "encode_json", builtin_encode_json);
    def(eval, "decode_json", builtin_decode_json);

    // ---- Generators ---------------------------------------------------
    def(eval, "proceed", builtin_proceed);
    def(eval, "transmit", builtin_transmit);
    def(eval, "receive", builtin_receive);
    def(eval, "disrupt", builtin_disrupt);

    // ---- Async --------------------------------------------------------
    def(eval, "sleep", builtin_sleep);
    def(eval, "resolve", builtin_resolve);
    def(eval, "defer", builtin_defer);
}

fn def(eval: &mut Evaluator, name: &'static str, f: impl Fn(&mut Evaluator, Vec<Value>) -> RunResult<Value> + 'static) {
    let value = Value::Builtin(Rc::new(BuiltinFn { name, call: Box::new(f) }));
    eval.globals.borrow_mut().define(Rc::from(name), value);
}

fn arity_error(name: &str, expected: &str, got: usize) -> RaisedError {
    RaisedError::new(ErrorKind::TypeMismatch, format!("{name} expects {expected}, got {got} argument(s)"))
}

fn expect_int(name: &str, v: &Value) -> RunResult<i64> {
    match v {
        Value::Int(i) => Ok(*i),
        Value::Float(f) => Ok(*f as i64),
        other => Err(RaisedError::new(ErrorKind::TypeMismatch, format!("{name} expects a number, got {}", other.type_name()))),
    }
}

fn expect_float(name: &str, v: &Value) -> RunResult<f64> {
    match v {
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        other => Err(RaisedError::new(ErrorKind::TypeMismatch, format!("{name} expects a number, got {}", other.type_name()))),
    }
}

fn expect_str(name: &str, v: &Value) -> RunResult<Rc<str>> {
    match v {
        Value::Str(s) => Ok(Rc::clone(s)),
        other => Err(RaisedError::new(ErrorKind::TypeMismatch, format!("{name} expects a string, got {}", other.type_name()))),
    }
}

fn two_args(name: &str, mut args: Vec<Value>) -> RunResult<[Value; 2]> {
    if args.len() != 2 {
        return Err(arity_error(name, "2 arguments", args.len()));
    }
    let b = args.pop().unwrap();
    let a = args.pop().unwrap();
    Ok([a, b])
}

// ---- I/O ------------------------------------------------------------------

/// `declare`/`announce`: both are aliases for one internal print primitive
/// (`original_source/compiler/interpreter.c` keeps them as distinct names
/// for the same effect) — writes each argument's display text
/// space-separated, terminated by a newline.
fn builtin_declare(eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            eval.print.write_char(' ');
        }
        eval.print.write_str(std::borrow::Cow::Owned(arg.display_string()));
    }
    eval.print.write_char('\n');
    Ok(Value::Void)
}

fn builtin_inquire(eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    if let Some(prompt) = args.first() {
        eval.print.write_str(std::borrow::Cow::Owned(prompt.display_string()));
    }
    let mut line = String::new();
    std::io::stdin().read_line(&mut line).map_err(|e| RaisedError::new(ErrorKind::ImportFailed, e.to_string()))?;
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Value::str(line))
}

// ---- Introspection ----------------------------------------------------

/// Counts Unicode scalar values for strings, element/entry counts for
/// lists/dicts — a deliberate correction of the original's byte-oriented
/// `strlen` (see DESIGN.md).
fn builtin_measure(_eval: &mut Evaluator, mut args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("measure", "1 argument", args.len()));
    }
    let v = args.pop().unwrap();
    let n = match &v {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.borrow().len(),
        Value::Dict(items) => items.borrow().len(),
        other => return Err(RaisedError::new(ErrorKind::TypeMismatch, format!("measure does not apply to {}", other.type_name()))),
    };
    Ok(Value::Int(n as i64))
}

fn builtin_classify(_eval: &mut Evaluator, mut args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("classify", "1 argument", args.len()));
    }
    Ok(Value::str(args.pop().unwrap().type_name()))
}

// ---- Conversions --------------------------------------------------------

fn builtin_text(_eval: &mut Evaluator, mut args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("text", "1 argument", args.len()));
    }
    Ok(Value::str(args.pop().unwrap().display_string()))
}

fn builtin_number(_eval: &mut Evaluator, mut args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("number", "1 argument", args.len()));
    }
    let v = args.pop().unwrap();
    let n = match &v {
        Value::Int(i) => *i,
        Value::Float(f) => *f as i64,
        Value::Bool(b) => i64::from(*b),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| RaisedError::new(ErrorKind::TypeMismatch, format!("cannot convert {s:?} to a number")))?,
        other => return Err(RaisedError::new(ErrorKind::TypeMismatch, format!("cannot convert {} to a number", other.type_name()))),
    };
    Ok(Value::Int(n))
}

fn builtin_decimal(_eval: &mut Evaluator, mut args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("decimal", "1 argument", args.len()));
    }
    let v = args.pop().unwrap();
    let n = match &v {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        Value::Bool(b) => f64::from(i32::from(*b)),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| RaisedError::new(ErrorKind::TypeMismatch, format!("cannot convert {s:?} to a decimal")))?,
        other => return Err(RaisedError::new(ErrorKind::TypeMismatch, format!("cannot convert {} to a decimal", other.type_name()))),
    };
    Ok(Value::Float(n))
}

fn builtin_boolean(_eval: &mut Evaluator, mut args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("boolean", "1 argument", args.len()));
    }
    Ok(Value::Bool(args.pop().unwrap().truthy()))
}

// ---- Ranges ---------------------------------------------------------------

fn builtin_span(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let (start, end, step) = match args.as_slice() {
        [end] => (0, expect_int("span", end)?, 1),
        [start, end] => (expect_int("span", start)?, expect_int("span", end)?, 1),
        [start, end, step] => (expect_int("span", start)?, expect_int("span", end)?, expect_int("span", step)?),
        _ => return Err(arity_error("span", "1 to 3 arguments", args.len())),
    };
    if step == 0 {
        return Err(RaisedError::new(ErrorKind::InvalidSlice, "span step cannot be zero"));
    }
    let mut out = Vec::new();
    if step > 0 {
        let mut i = start;
        while i < end {
            out.push(Value::Int(i));
            i += step;
        }
    } else {
        let mut i = start;
        while i > end {
            out.push(Value::Int(i));
            i += step;
        }
    }
    Ok(Value::list(out))
}

// ---- File I/O ---------------------------------------------------------

fn io_error(e: std::io::Error) -> RaisedError {
    RaisedError::new(ErrorKind::ImportFailed, e.to_string())
}

fn builtin_inscribe(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let [path, content] = two_args("inscribe", args)?;
    let path = expect_str("inscribe", &path)?;
    std::fs::write(path.as_ref(), content.display_string()).map_err(io_error)?;
    Ok(Value::Void)
}

fn builtin_decipher(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("decipher", "1 argument", args.len()));
    }
    let path = expect_str("decipher", &args[0])?;
    let contents = std::fs::read_to_string(path.as_ref()).map_err(io_error)?;
    Ok(Value::str(contents))
}

fn builtin_chronicle(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    use std::io::Write as _;
    let [path, content] = two_args("chronicle", args)?;
    let path = expect_str("chronicle", &path)?;
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path.as_ref()).map_err(io_error)?;
    file.write_all(content.display_string().as_bytes()).map_err(io_error)?;
    Ok(Value::Void)
}

fn builtin_exists(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("exists", "1 argument", args.len()));
    }
    let path = expect_str("exists", &args[0])?;
    Ok(Value::Bool(std::path::Path::new(path.as_ref()).exists()))
}

// ---- Numerics -----------------------------------------------------------

fn builtin_abs(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("abs", "1 argument", args.len()));
    }
    match &args[0] {
        Value::Int(i) => Ok(Value::Int(i.wrapping_abs())),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(RaisedError::new(ErrorKind::TypeMismatch, format!("abs expects a number, got {}", other.type_name()))),
    }
}

fn builtin_sqrt(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("sqrt", "1 argument", args.len()));
    }
    Ok(Value::Float(expect_float("sqrt", &args[0])?.sqrt()))
}

/// Shared implementation for `min`/`max`: each accepts either a single list
/// argument or two-or-more scalar arguments.
fn min_max(name: &str, args: Vec<Value>, want_min: bool) -> RunResult<Value> {
    let items: Vec<Value> = match args.as_slice() {
        [Value::List(list)] => list.borrow().clone(),
        [] => return Err(arity_error(name, "at least 1 argument", 0)),
        _ => args,
    };
    let mut iter = items.into_iter();
    let mut best = iter
        .next()
        .ok_or_else(|| RaisedError::new(ErrorKind::TypeMismatch, format!("{name} of an empty sequence")))?;
    let mut best_f = expect_float(name, &best)?;
    for item in iter {
        let f = expect_float(name, &item)?;
        if (want_min && f < best_f) || (!want_min && f > best_f) {
            best_f = f;
            best = item;
        }
    }
    Ok(best)
}

fn builtin_min(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    min_max("min", args, true)
}

fn builtin_max(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    min_max("max", args, false)
}

fn builtin_random(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let mut rng = rand::thread_rng();
    match args.as_slice() {
        [] => Ok(Value::Float(rng.gen::<f64>())),
        [low, high] => {
            let low = expect_int("random", low)?;
            let high = expect_int("random", high)?;
            if low >= high {
                return Err(RaisedError::new(ErrorKind::TypeMismatch, "random(low, high) requires low < high"));
            }
            Ok(Value::Int(rng.gen_range(low..high)))
        }
        _ => Err(arity_error("random", "0 or 2 arguments", args.len())),
    }
}

// ---- Strings --------------------------------------------------------------

fn builtin_uppercase(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("uppercase", "1 argument", args.len()));
    }
    Ok(Value::str(expect_str("uppercase", &args[0])?.to_uppercase()))
}

fn builtin_lowercase(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("lowercase", "1 argument", args.len()));
    }
    Ok(Value::str(expect_str("lowercase", &args[0])?.to_lowercase()))
}

fn builtin_split(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let [s, delim] = two_args("split", args)?;
    let s = expect_str("split", &s)?;
    let delim = expect_str("split", &delim)?;
    let parts: Vec<Value> = if delim.is_empty() {
        s.chars().map(|c| Value::str(c.to_string())).collect()
    } else {
        s.split(delim.as_ref()).map(Value::str).collect()
    };
    Ok(Value::list(parts))
}

fn builtin_join(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let [items, delim] = two_args("join", args)?;
    let Value::List(items) = items else {
        return Err(RaisedError::new(ErrorKind::TypeMismatch, "join expects a list as its first argument"));
    };
    let delim = expect_str("join", &delim)?;
    let parts: Vec<String> = items.borrow().iter().map(Value::display_string).collect();
    Ok(Value::str(parts.join(delim.as_ref())))
}

fn builtin_contains(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let [container, needle] = two_args("contains", args)?;
    let found = match &container {
        Value::Str(s) => {
            let needle = expect_str("contains", &needle)?;
            s.contains(needle.as_ref())
        }
        Value::List(items) => items.borrow().iter().any(|item| item.equals(&needle)),
        other => return Err(RaisedError::new(ErrorKind::TypeMismatch, format!("contains does not apply to {}", other.type_name()))),
    };
    Ok(Value::Bool(found))
}

// ---- Lists ------------------------------------------------------------

/// `push`: appends in place and returns the same list, so call sites that
/// discard the return value still observe the mutation through any other
/// binding of the list.
fn builtin_push(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let [list, value] = two_args("push", args)?;
    let Value::List(items) = &list else {
        return Err(RaisedError::new(ErrorKind::TypeMismatch, "push expects a list as its first argument"));
    };
    items.borrow_mut().push(value);
    Ok(list)
}

fn builtin_reverse(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("reverse", "1 argument", args.len()));
    }
    let Value::List(items) = &args[0] else {
        return Err(RaisedError::new(ErrorKind::TypeMismatch, "reverse expects a list"));
    };
    let mut copy = items.borrow().clone();
    copy.reverse();
    Ok(Value::list(copy))
}

// ---- Time -------------------------------------------------------------

fn builtin_clock(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    if !args.is_empty() {
        return Err(arity_error("clock", "0 arguments", args.len()));
    }
    let now = Utc::now();
    let micros = f64::from(now.timestamp_subsec_micros()) / 1_000_000.0;
    Ok(Value::Float(now.timestamp() as f64 + micros))
}

fn builtin_timestamp(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    if !args.is_empty() {
        return Err(arity_error("timestamp", "0 arguments", args.len()));
    }
    Ok(Value::Int(Utc::now().timestamp()))
}

// ---- Process ------------------------------------------------------------

fn builtin_terminate(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let code = match args.as_slice() {
        [] => 0,
        [v] => expect_int("terminate", v)?,
        _ => return Err(arity_error("terminate", "0 or 1 argument", args.len())),
    };
    std::process::exit(code as i32);
}

// ---- Higher-order -----------------------------------------------------

fn as_list(name: &str, v: &Value) -> RunResult<crate::value::ListRef> {
    match v {
        Value::List(items) => Ok(Rc::clone(items)),
        other => Err(RaisedError::new(ErrorKind::TypeMismatch, format!("{name} expects a list, got {}", other.type_name()))),
    }
}

fn builtin_transform(eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let [list, f] = two_args("transform", args)?;
    let items = as_list("transform", &list)?.borrow().clone();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(eval.call_value(&f, vec![item], None)?);
    }
    Ok(Value::list(out))
}

fn builtin_select(eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let [list, f] = two_args("select", args)?;
    let items = as_list("select", &list)?.borrow().clone();
    let mut out = Vec::new();
    for item in items {
        if eval.call_value(&f, vec![item.clone()], None)?.truthy() {
            out.push(item);
        }
    }
    Ok(Value::list(out))
}

fn builtin_fold(eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 3 {
        return Err(arity_error("fold", "3 arguments", args.len()));
    }
    let mut args = args.into_iter();
    let list = args.next().unwrap();
    let f = args.next().unwrap();
    let mut acc = args.next().unwrap();
    let items = as_list("fold", &list)?.borrow().clone();
    for item in items {
        acc = eval.call_value(&f, vec![acc, item], None)?;
    }
    Ok(acc)
}

// ---- JSON -------------------------------------------------------------

fn builtin_encode_json(_eval: &mut Evaluator, mut args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("encode_json", "1 argument", args.len()));
    }
    let json = value_to_json(&args.pop().unwrap());
    let text = serde_json::to_string(&json).map_err(|e| RaisedError::new(ErrorKind::TypeMismatch, e.to_string()))?;
    Ok(Value::str(text))
}

fn builtin_decode_json(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("decode_json", "1 argument", args.len()));
    }
    let text = expect_str("decode_json", &args[0])?;
    let json: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| RaisedError::new(ErrorKind::TypeMismatch, e.to_string()))?;
    Ok(json_to_value(&json))
}

fn value_to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Void => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f).map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::Str(s) => serde_json::Value::String(s.to_string()),
        Value::List(items) => serde_json::Value::Array(items.borrow().iter().map(value_to_json).collect()),
        Value::Dict(items) => {
            let map: serde_json::Map<String, serde_json::Value> =
                items.borrow().iter().map(|(k, v)| (k.display_string(), value_to_json(v))).collect();
            serde_json::Value::Object(map)
        }
        other => serde_json::Value::String(other.display_string()),
    }
}

fn json_to_value(j: &serde_json::Value) -> Value {
    match j {
        serde_json::Value::Null => Value::Void,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::str(s.as_str()),
        serde_json::Value::Array(items) => Value::list(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => {
            let mut out = IndexMap::new();
            for (k, v) in map {
                out.insert(Value::str(k.as_str()), json_to_value(v));
            }
            Value::dict(out)
        }
    }
}

// ---- Generators -------------------------------------------------------

fn as_generator(name: &str, v: &Value) -> RunResult<Rc<std::cell::RefCell<Generator>>> {
    match v {
        Value::Generator(g) => Ok(Rc::clone(g)),
        other => Err(RaisedError::new(ErrorKind::TypeMismatch, format!("{name} expects a sequence, got {}", other.type_name()))),
    }
}

fn builtin_proceed(eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("proceed", "1 argument", args.len()));
    }
    let gen = as_generator("proceed", &args[0])?;
    eval.advance_generator(&gen)
}

fn builtin_transmit(eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let [gen, value] = two_args("transmit", args)?;
    let gen = as_generator("transmit", &gen)?;
    gen.borrow_mut().injected = Some(value);
    eval.advance_generator(&gen)
}

fn builtin_receive(eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    if !args.is_empty() {
        return Err(arity_error("receive", "0 arguments", args.len()));
    }
    let gen = eval
        .current_generator()
        .ok_or_else(|| RaisedError::new(ErrorKind::TypeMismatch, "receive() called outside a running sequence"))?;
    let value = gen.borrow_mut().injected.take().unwrap_or(Value::Void);
    Ok(value)
}

/// `disrupt`: marks the injection and advances once. Beyond that minimum
/// the exact delivery mechanism is left open (see DESIGN.md), so the marked
/// message is not surfaced as a raised error inside the generator body.
fn builtin_disrupt(eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let [gen, err] = two_args("disrupt", args)?;
    let gen = as_generator("disrupt", &gen)?;
    gen.borrow_mut().disrupted = Some(err.display_string());
    eval.advance_generator(&gen)
}

// ---- Async --------------------------------------------------------------

fn builtin_sleep(_eval: &mut Evaluator, args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("sleep", "1 argument", args.len()));
    }
    let ms = expect_int("sleep", &args[0])?.max(0);
    std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    Ok(Value::Void)
}

fn builtin_resolve(_eval: &mut Evaluator, mut args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("resolve", "1 argument", args.len()));
    }
    let value = args.pop().unwrap();
    Ok(Value::Promise(Rc::new(std::cell::RefCell::new(PromiseState::Ready(value)))))
}

/// `defer(ms, fn, ...args)`: sleeps, invokes `fn` with the remaining
/// arguments, and wraps the outcome as a settled promise — resolved with
/// the call's return value, or rejected with its error message if `fn`
/// raised (mirroring `original_source/compiler/interpreter.h`'s
/// `PROMISE_REJECTED` state, which nothing in the original ever
/// constructs; `defer` is the natural producer here).
fn builtin_defer(eval: &mut Evaluator, mut args: Vec<Value>) -> RunResult<Value> {
    if args.len() < 2 {
        return Err(arity_error("defer", "at least 2 arguments", args.len()));
    }
    let rest = args.split_off(2);
    let f = args.pop().unwrap();
    let ms = expect_int("defer", &args[0])?.max(0);
    std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    let state = match eval.call_value(&f, rest, None) {
        Ok(result) => PromiseState::Ready(result),
        Err(err) => PromiseState::Rejected(Rc::from(err.display_message())),
    };
    Ok(Value::Promise(Rc::new(std::cell::RefCell::new(state))))
}
