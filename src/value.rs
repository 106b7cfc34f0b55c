use std::collections::BTreeMap;

/// A dynamically-typed value produced by tokenizing literals or by
/// evaluating expressions.
///
/// This type represents all JSON types, with numbers split into three
/// widths. A numeric literal always materializes as the narrowest variant
/// that represents it exactly:
///
/// - `Int` for integral literals that fit in 32 bits
/// - `Long` for larger integral literals that fit in 64 bits
/// - `Double` for everything with a fraction or exponent (or too large)
///
/// # Examples
///
/// ```
/// use sorrel::Value;
///
/// let null = Value::Null;
/// let boolean = Value::Boolean(true);
/// let int = Value::Int(42);
/// let long = Value::Long(5_000_000_000);
/// let double = Value::Double(3.14);
/// let string = Value::String("hello".to_string());
///
/// let array = Value::Array(vec![Value::Int(1), Value::Int(2)]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null
    Null,

    /// Boolean (true/false)
    Boolean(bool),

    /// 32-bit integer
    Int(i32),

    /// 64-bit integer
    Long(i64),

    /// Floating-point number
    Double(f64),

    /// UTF-8 string
    String(String),

    /// Array of values (homogeneous or heterogeneous)
    Array(Vec<Value>),

    /// Object with string keys, iterated in key order
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Narrowing constructor: `Int` if the value fits in 32 bits, else `Long`.
    pub fn from_i64(n: i64) -> Value {
        match i32::try_from(n) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Long(n),
        }
    }

    /// Returns a human-readable type name, as used in error messages and by
    /// the `type` builtin.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Check if the value is truthy (for conditions)
    pub fn is_truthy(&self) -> bool {
        use Value::*;
        match self {
            Null => false,
            Boolean(b) => *b,
            Int(n) => *n != 0,
            Long(n) => *n != 0,
            Double(n) => *n != 0.0,
            String(s) => !s.is_empty(),
            Array(arr) => !arr.is_empty(),
            Object(obj) => !obj.is_empty(),
        }
    }

    /// Convert to boolean for conditions
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            _ => self.is_truthy(),
        }
    }

    /// Numeric value widened to a double, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Long(n) => Some(*n as f64),
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }

    /// Integral value widened to 64 bits, if this is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n as i64),
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// Canonical string form, used by loose equality and object-key
    /// coercion.
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::Long(n) => n.to_string(),
            Value::Double(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Null => "null".to_string(),
            _ => format!("{:?}", self),
        }
    }

    /// Convert to a serde_json value. Non-finite doubles become null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::Number((*n).into()),
            Value::Long(n) => serde_json::Value::Number((*n).into()),
            Value::Double(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(Value::to_json).collect())
            }
            Value::Object(obj) => serde_json::Value::Object(
                obj.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::from_i64(i)
                } else {
                    Value::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => Value::Object(
                obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

#[test]
fn test_from_i64_narrows() {
    assert_eq!(Value::from_i64(2147483647), Value::Int(2147483647));
    assert_eq!(Value::from_i64(2147483648), Value::Long(2147483648));
    assert_eq!(Value::from_i64(-2147483648), Value::Int(-2147483648));
    assert_eq!(Value::from_i64(-2147483649), Value::Long(-2147483649));
}

#[test]
fn test_truthiness() {
    assert!(!Value::Null.is_truthy());
    assert!(!Value::Int(0).is_truthy());
    assert!(Value::Int(-1).is_truthy());
    assert!(Value::Double(0.5).is_truthy());
    assert!(!Value::String(String::new()).is_truthy());
    assert!(Value::String("x".into()).is_truthy());
}
