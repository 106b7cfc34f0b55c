use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::trace;

use crate::ast::{BinOp, Expr, UnaryOp};
use crate::value::Value;

/// The variable environment an expression is evaluated against. Assignment
/// expressions write through to it; everything else only reads.
pub type Variables = HashMap<String, Value>;

/// Errors that can occur during expression evaluation.
///
/// Evaluation errors carry no source position: trees may be evaluated long
/// after parsing, against different variable data each time.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Operator/operand type mismatch or invalid builtin usage
    TypeError(String),

    /// Division by zero (integer or floating-point)
    DivisionByZero,

    /// Call of a function that is not in the builtin table
    UnknownFunction(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::TypeError(msg) => write!(f, "Type error: {}", msg),
            EvalError::DivisionByZero => write!(f, "Division by zero"),
            EvalError::UnknownFunction(name) => {
                write!(f, "Unknown function: {}()", name)
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// Both operands widened to the widest numeric type present.
enum NumericPair {
    Ints(i32, i32),
    Longs(i64, i64),
    Doubles(f64, f64),
}

fn numeric_pair(left: &Value, right: &Value) -> Option<NumericPair> {
    use Value::*;
    match (left, right) {
        (Int(a), Int(b)) => Some(NumericPair::Ints(*a, *b)),
        (Int(a), Long(b)) => Some(NumericPair::Longs(*a as i64, *b)),
        (Long(a), Int(b)) => Some(NumericPair::Longs(*a, *b as i64)),
        (Long(a), Long(b)) => Some(NumericPair::Longs(*a, *b)),
        (Double(a), b) => b.as_f64().map(|b| NumericPair::Doubles(*a, b)),
        (a, Double(b)) => a.as_f64().map(|a| NumericPair::Doubles(a, *b)),
        _ => None,
    }
}

/// Coarse type classes for strict equality: every numeric width is one
/// "number" class.
fn type_class(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Boolean(_) => "boolean",
        Value::Int(_) | Value::Long(_) | Value::Double(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Loose, type-coercing equality: numbers compare numerically across
/// widths, null equals only null, collections compare element-wise, and any
/// remaining primitive mix compares by canonical string form.
pub(crate) fn loose_eq(left: &Value, right: &Value) -> bool {
    use Value::*;
    if let Some(pair) = numeric_pair(left, right) {
        return match pair {
            NumericPair::Ints(a, b) => a == b,
            NumericPair::Longs(a, b) => a == b,
            NumericPair::Doubles(a, b) => a == b,
        };
    }
    match (left, right) {
        (Null, Null) => true,
        (Null, _) | (_, Null) => false,
        (String(a), String(b)) => a == b,
        (Boolean(a), Boolean(b)) => a == b,
        (Array(a), Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| loose_eq(x, y))
        }
        (Object(a), Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && loose_eq(va, vb))
        }
        (Array(_), _) | (_, Array(_)) | (Object(_), _) | (_, Object(_)) => false,
        (a, b) => a.as_string() == b.as_string(),
    }
}

/// Strict equality: type classes must match as well as values.
pub(crate) fn strict_eq(left: &Value, right: &Value) -> bool {
    if type_class(left) != type_class(right) {
        return false;
    }
    match (left, right) {
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| strict_eq(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && strict_eq(va, vb))
        }
        _ => loose_eq(left, right),
    }
}

/// Evaluates an expression tree against a variable environment.
///
/// A variable absent from `variables` evaluates to null, never an error.
/// Assignments write through to `variables` and are not rolled back if a
/// later part of the same expression fails.
pub fn evaluate(expr: &Expr, variables: &mut Variables) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Variable(name) => Ok(variables.get(name).cloned().unwrap_or(Value::Null)),
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, variables)?;
            apply_unary(*op, value)
        }
        Expr::Binary {
            op: BinOp::And,
            left,
            right,
        } => {
            if !evaluate(left, variables)?.as_bool() {
                return Ok(Value::Boolean(false));
            }
            Ok(Value::Boolean(evaluate(right, variables)?.as_bool()))
        }
        Expr::Binary {
            op: BinOp::Or,
            left,
            right,
        } => {
            if evaluate(left, variables)?.as_bool() {
                return Ok(Value::Boolean(true));
            }
            Ok(Value::Boolean(evaluate(right, variables)?.as_bool()))
        }
        Expr::Binary { op, left, right } => {
            let left = evaluate(left, variables)?;
            let right = evaluate(right, variables)?;
            apply_binary(*op, left, right)
        }
        Expr::Assign { target, value } => {
            let name = match target.as_ref() {
                Expr::Variable(name) => name.clone(),
                other => {
                    return Err(EvalError::TypeError(format!(
                        "assignment target must be a variable reference, not {:?}",
                        other
                    )));
                }
            };
            let value = evaluate(value, variables)?;
            variables.insert(name, value.clone());
            Ok(value)
        }
        Expr::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(evaluate(item, variables)?);
            }
            Ok(Value::Array(out))
        }
        Expr::Object(pairs) => {
            // A duplicated key keeps the last entry.
            let mut map = BTreeMap::new();
            for (key, value) in pairs {
                let value = evaluate(value, variables)?;
                map.insert(key.clone(), value);
            }
            Ok(Value::Object(map))
        }
        Expr::FunctionCall { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, variables)?);
            }
            call_function(name, &values)
        }
    }
}

fn apply_unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match op {
        UnaryOp::Not => Ok(Value::Boolean(!value.as_bool())),
        UnaryOp::Negate => match value {
            // Negation overflow widens instead of wrapping.
            Value::Int(n) => Ok(match n.checked_neg() {
                Some(neg) => Value::Int(neg),
                None => Value::Long(-(n as i64)),
            }),
            Value::Long(n) => Ok(match n.checked_neg() {
                Some(neg) => Value::Long(neg),
                None => Value::Double(-(n as f64)),
            }),
            Value::Double(d) => Ok(Value::Double(-d)),
            v => Err(EvalError::TypeError(format!(
                "Cannot negate {}",
                v.type_name()
            ))),
        },
    }
}

fn apply_binary(op: BinOp, left: Value, right: Value) -> Result<Value, EvalError> {
    match op {
        BinOp::Add => match (&left, &right) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            _ => match numeric_pair(&left, &right) {
                Some(NumericPair::Ints(a, b)) => Ok(Value::Int(a.wrapping_add(b))),
                Some(NumericPair::Longs(a, b)) => Ok(Value::Long(a.wrapping_add(b))),
                Some(NumericPair::Doubles(a, b)) => Ok(Value::Double(a + b)),
                None => Err(EvalError::TypeError(format!(
                    "Cannot add {} and {}",
                    left.type_name(),
                    right.type_name()
                ))),
            },
        },
        BinOp::Subtract => match numeric_pair(&left, &right) {
            Some(NumericPair::Ints(a, b)) => Ok(Value::Int(a.wrapping_sub(b))),
            Some(NumericPair::Longs(a, b)) => Ok(Value::Long(a.wrapping_sub(b))),
            Some(NumericPair::Doubles(a, b)) => Ok(Value::Double(a - b)),
            None => Err(EvalError::TypeError(format!(
                "Cannot subtract {} from {}",
                right.type_name(),
                left.type_name()
            ))),
        },
        BinOp::Multiply => match numeric_pair(&left, &right) {
            Some(NumericPair::Ints(a, b)) => Ok(Value::Int(a.wrapping_mul(b))),
            Some(NumericPair::Longs(a, b)) => Ok(Value::Long(a.wrapping_mul(b))),
            Some(NumericPair::Doubles(a, b)) => Ok(Value::Double(a * b)),
            None => Err(EvalError::TypeError(format!(
                "Cannot multiply {} by {}",
                left.type_name(),
                right.type_name()
            ))),
        },
        BinOp::Divide => match numeric_pair(&left, &right) {
            // Division always goes through floating point.
            Some(NumericPair::Ints(_, 0)) | Some(NumericPair::Longs(_, 0)) => {
                Err(EvalError::DivisionByZero)
            }
            Some(NumericPair::Doubles(_, b)) if b == 0.0 => Err(EvalError::DivisionByZero),
            Some(NumericPair::Ints(a, b)) => Ok(Value::Double(a as f64 / b as f64)),
            Some(NumericPair::Longs(a, b)) => Ok(Value::Double(a as f64 / b as f64)),
            Some(NumericPair::Doubles(a, b)) => Ok(Value::Double(a / b)),
            None => Err(EvalError::TypeError(format!(
                "Cannot divide {} by {}",
                left.type_name(),
                right.type_name()
            ))),
        },
        BinOp::Eq => Ok(Value::Boolean(loose_eq(&left, &right))),
        BinOp::NotEq => Ok(Value::Boolean(!loose_eq(&left, &right))),
        BinOp::StrictEq => Ok(Value::Boolean(strict_eq(&left, &right))),
        BinOp::NotStrictEq => Ok(Value::Boolean(!strict_eq(&left, &right))),
        BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq => {
            let ordering = match numeric_pair(&left, &right) {
                Some(NumericPair::Ints(a, b)) => a.partial_cmp(&b),
                Some(NumericPair::Longs(a, b)) => a.partial_cmp(&b),
                Some(NumericPair::Doubles(a, b)) => a.partial_cmp(&b),
                None => {
                    return Err(EvalError::TypeError(format!(
                        "Cannot compare {} {} {} (comparison requires numeric types)",
                        left.type_name(),
                        op.symbol(),
                        right.type_name()
                    )));
                }
            };
            let result = match ordering {
                Some(ord) => match op {
                    BinOp::Lt => ord.is_lt(),
                    BinOp::LtEq => ord.is_le(),
                    BinOp::Gt => ord.is_gt(),
                    BinOp::GtEq => ord.is_ge(),
                    _ => unreachable!(),
                },
                // NaN compares false everywhere.
                None => false,
            };
            Ok(Value::Boolean(result))
        }
        BinOp::In => match &right {
            Value::Array(items) => {
                Ok(Value::Boolean(items.iter().any(|v| loose_eq(&left, v))))
            }
            Value::Object(map) => Ok(Value::Boolean(map.contains_key(&left.as_string()))),
            other => Err(EvalError::TypeError(format!(
                "Right operand of 'in' must be an array or object, got {}",
                other.type_name()
            ))),
        },
        BinOp::Dot | BinOp::Index => access(&left, &right),
        BinOp::And | BinOp::Or => {
            unreachable!("logical operators are short-circuited in evaluate")
        }
    }
}

/// Member/index access. Absent object keys and out-of-range array indices
/// yield null; indexing anything that is not an object or array is an
/// error.
fn access(object: &Value, key: &Value) -> Result<Value, EvalError> {
    match (object, key) {
        (Value::Object(map), Value::String(k)) => {
            Ok(map.get(k).cloned().unwrap_or(Value::Null))
        }
        (Value::Object(map), Value::Int(_) | Value::Long(_) | Value::Double(_) | Value::Boolean(_)) => {
            Ok(map.get(&key.as_string()).cloned().unwrap_or(Value::Null))
        }
        (Value::Array(arr), Value::Int(_) | Value::Long(_)) => {
            let n = match key.as_i64() {
                Some(n) => n,
                None => unreachable!(),
            };
            let index = if n < 0 {
                // Negative index counts from the end (-1 is the last element).
                let back = n.unsigned_abs() as usize;
                if back > arr.len() {
                    return Ok(Value::Null);
                }
                arr.len() - back
            } else {
                n as usize
            };
            Ok(arr.get(index).cloned().unwrap_or(Value::Null))
        }
        (Value::Array(_), k) => Err(EvalError::TypeError(format!(
            "Array index must be an integer, got {}",
            k.type_name()
        ))),
        (v, _) => Err(EvalError::TypeError(format!(
            "Cannot index {} (only arrays and objects can be indexed)",
            v.type_name()
        ))),
    }
}

/// Dispatch function calls to their implementations
fn call_function(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    trace!(function = name, argc = args.len(), "dispatching builtin");
    match name {
        "length" => fn_length(args),
        "type" => fn_type(args),
        "upper" => fn_upper(args),
        "lower" => fn_lower(args),
        "trim" => fn_trim(args),
        "split" => fn_split(args),
        "contains" => fn_contains(args),
        "startswith" => fn_startswith(args),
        "endswith" => fn_endswith(args),
        "matches" => fn_matches(args),
        "keys" => fn_keys(args),
        "values" => fn_values(args),
        "first" => fn_first(args),
        "last" => fn_last(args),
        "min" => fn_min(args),
        "max" => fn_max(args),
        "sum" => fn_sum(args),
        "from_json" => fn_from_json(args),
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}

fn arity<'a>(name: &str, args: &'a [Value], n: usize) -> Result<&'a [Value], EvalError> {
    if args.len() != n {
        return Err(EvalError::TypeError(format!(
            "{}() takes exactly {} argument(s), got {}",
            name,
            n,
            args.len()
        )));
    }
    Ok(args)
}

fn string_arg<'a>(name: &str, value: &'a Value) -> Result<&'a str, EvalError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(EvalError::TypeError(format!(
            "{}() requires a string, got {}",
            name,
            other.type_name()
        ))),
    }
}

fn array_arg<'a>(name: &str, value: &'a Value) -> Result<&'a [Value], EvalError> {
    match value {
        Value::Array(arr) => Ok(arr),
        other => Err(EvalError::TypeError(format!(
            "{}() requires an array, got {}",
            name,
            other.type_name()
        ))),
    }
}

/// length(x) - element count of an array or object, or chars of a string
fn fn_length(args: &[Value]) -> Result<Value, EvalError> {
    let args = arity("length", args, 1)?;
    let len = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(arr) => arr.len(),
        Value::Object(obj) => obj.len(),
        other => {
            return Err(EvalError::TypeError(format!(
                "length() requires a string, array or object, got {}",
                other.type_name()
            )));
        }
    };
    Ok(Value::from_i64(len as i64))
}

/// type(x) - type name of any value
fn fn_type(args: &[Value]) -> Result<Value, EvalError> {
    let args = arity("type", args, 1)?;
    Ok(Value::String(args[0].type_name().to_string()))
}

fn fn_upper(args: &[Value]) -> Result<Value, EvalError> {
    let args = arity("upper", args, 1)?;
    Ok(Value::String(string_arg("upper", &args[0])?.to_uppercase()))
}

fn fn_lower(args: &[Value]) -> Result<Value, EvalError> {
    let args = arity("lower", args, 1)?;
    Ok(Value::String(string_arg("lower", &args[0])?.to_lowercase()))
}

fn fn_trim(args: &[Value]) -> Result<Value, EvalError> {
    let args = arity("trim", args, 1)?;
    Ok(Value::String(string_arg("trim", &args[0])?.trim().to_string()))
}

/// split(string, separator) - array of the pieces between separators
fn fn_split(args: &[Value]) -> Result<Value, EvalError> {
    let args = arity("split", args, 2)?;
    let s = string_arg("split", &args[0])?;
    let sep = string_arg("split", &args[1])?;
    if sep.is_empty() {
        return Err(EvalError::TypeError(
            "split() separator must not be empty".to_string(),
        ));
    }
    Ok(Value::Array(
        s.split(sep).map(|p| Value::String(p.to_string())).collect(),
    ))
}

/// contains(collection, item) - substring, array element (loose equality)
/// or object key
fn fn_contains(args: &[Value]) -> Result<Value, EvalError> {
    let args = arity("contains", args, 2)?;
    match &args[0] {
        Value::String(s) => {
            let needle = string_arg("contains", &args[1])?;
            Ok(Value::Boolean(s.contains(needle)))
        }
        Value::Array(arr) => Ok(Value::Boolean(arr.iter().any(|v| loose_eq(v, &args[1])))),
        Value::Object(map) => Ok(Value::Boolean(map.contains_key(&args[1].as_string()))),
        other => Err(EvalError::TypeError(format!(
            "contains() requires a string, array or object, got {}",
            other.type_name()
        ))),
    }
}

fn fn_startswith(args: &[Value]) -> Result<Value, EvalError> {
    let args = arity("startswith", args, 2)?;
    let s = string_arg("startswith", &args[0])?;
    let prefix = string_arg("startswith", &args[1])?;
    Ok(Value::Boolean(s.starts_with(prefix)))
}

fn fn_endswith(args: &[Value]) -> Result<Value, EvalError> {
    let args = arity("endswith", args, 2)?;
    let s = string_arg("endswith", &args[0])?;
    let suffix = string_arg("endswith", &args[1])?;
    Ok(Value::Boolean(s.ends_with(suffix)))
}

/// matches(string, pattern) - true if the string matches the regex pattern
fn fn_matches(args: &[Value]) -> Result<Value, EvalError> {
    let args = arity("matches", args, 2)?;
    let s = string_arg("matches", &args[0])?;
    let pattern = string_arg("matches", &args[1])?;
    let re = regex::Regex::new(pattern)
        .map_err(|e| EvalError::TypeError(format!("invalid regex: {e}")))?;
    Ok(Value::Boolean(re.is_match(s)))
}

fn fn_keys(args: &[Value]) -> Result<Value, EvalError> {
    let args = arity("keys", args, 1)?;
    match &args[0] {
        Value::Object(map) => Ok(Value::Array(
            map.keys().map(|k| Value::String(k.clone())).collect(),
        )),
        other => Err(EvalError::TypeError(format!(
            "keys() requires an object, got {}",
            other.type_name()
        ))),
    }
}

fn fn_values(args: &[Value]) -> Result<Value, EvalError> {
    let args = arity("values", args, 1)?;
    match &args[0] {
        Value::Object(map) => Ok(Value::Array(map.values().cloned().collect())),
        other => Err(EvalError::TypeError(format!(
            "values() requires an object, got {}",
            other.type_name()
        ))),
    }
}

fn fn_first(args: &[Value]) -> Result<Value, EvalError> {
    let args = arity("first", args, 1)?;
    let arr = array_arg("first", &args[0])?;
    Ok(arr.first().cloned().unwrap_or(Value::Null))
}

fn fn_last(args: &[Value]) -> Result<Value, EvalError> {
    let args = arity("last", args, 1)?;
    let arr = array_arg("last", &args[0])?;
    Ok(arr.last().cloned().unwrap_or(Value::Null))
}

fn extremum(name: &str, args: &[Value], want_min: bool) -> Result<Value, EvalError> {
    let args = arity(name, args, 1)?;
    let arr = array_arg(name, &args[0])?;
    let mut best: Option<(&Value, f64)> = None;
    for v in arr {
        let n = v.as_f64().ok_or_else(|| {
            EvalError::TypeError(format!(
                "{}() requires numeric elements, got {}",
                name,
                v.type_name()
            ))
        })?;
        let better = match best {
            None => true,
            Some((_, b)) => {
                if want_min {
                    n < b
                } else {
                    n > b
                }
            }
        };
        if better {
            best = Some((v, n));
        }
    }
    Ok(best.map(|(v, _)| v.clone()).unwrap_or(Value::Null))
}

fn fn_min(args: &[Value]) -> Result<Value, EvalError> {
    extremum("min", args, true)
}

fn fn_max(args: &[Value]) -> Result<Value, EvalError> {
    extremum("max", args, false)
}

/// sum(array) - numeric sum with the usual widening; an empty array sums
/// to 0
fn fn_sum(args: &[Value]) -> Result<Value, EvalError> {
    let args = arity("sum", args, 1)?;
    let arr = array_arg("sum", &args[0])?;
    let mut acc = Value::Int(0);
    for v in arr {
        acc = apply_binary(BinOp::Add, acc, v.clone()).map_err(|_| {
            EvalError::TypeError(format!(
                "sum() requires numeric elements, got {}",
                v.type_name()
            ))
        })?;
    }
    Ok(acc)
}

/// from_json(string) - parse a JSON document into a value
fn fn_from_json(args: &[Value]) -> Result<Value, EvalError> {
    let args = arity("from_json", args, 1)?;
    let s = string_arg("from_json", &args[0])?;
    let json: serde_json::Value = serde_json::from_str(s)
        .map_err(|e| EvalError::TypeError(format!("from_json(): invalid JSON: {e}")))?;
    Ok(Value::from(json))
}
