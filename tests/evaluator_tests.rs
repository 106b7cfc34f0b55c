// tests/evaluator_tests.rs

use pretty_assertions::assert_eq;
use sorrel::evaluator::{EvalError, Variables};
use sorrel::value::Value;
use sorrel::parse;
use std::collections::BTreeMap;

fn eval(input: &str) -> Result<Value, EvalError> {
    let mut vars = Variables::new();
    parse(input)
        .unwrap_or_else(|e| panic!("parse failed for {:?}: {}", input, e))
        .evaluate(&mut vars)
}

fn eval_with(input: &str, vars: &mut Variables) -> Result<Value, EvalError> {
    parse(input)
        .unwrap_or_else(|e| panic!("parse failed for {:?}: {}", input, e))
        .evaluate(vars)
}

fn vars(pairs: Vec<(&str, Value)>) -> Variables {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn object(pairs: Vec<(&str, Value)>) -> Value {
    let mut map = BTreeMap::new();
    for (k, v) in pairs {
        map.insert(k.to_string(), v);
    }
    Value::Object(map)
}

// ============================================================================
// Variables and assignment
// ============================================================================

#[test]
fn test_undefined_variable_is_null() {
    assert_eq!(eval("$missing").unwrap(), Value::Null);
}

#[test]
fn test_variable_lookup() {
    let mut v = vars(vec![("price", Value::Int(100))]);
    assert_eq!(eval_with("$price", &mut v).unwrap(), Value::Int(100));
}

#[test]
fn test_assignment_returns_value_and_mutates() {
    let mut v = Variables::new();
    assert_eq!(eval_with("$x = 5", &mut v).unwrap(), Value::Int(5));
    assert_eq!(v.get("x"), Some(&Value::Int(5)));
}

#[test]
fn test_chained_assignment() {
    let mut v = Variables::new();
    assert_eq!(eval_with("$a = $b = 2", &mut v).unwrap(), Value::Int(2));
    assert_eq!(v.get("a"), Some(&Value::Int(2)));
    assert_eq!(v.get("b"), Some(&Value::Int(2)));
}

#[test]
fn test_assignment_inside_expression() {
    let mut v = Variables::new();
    assert_eq!(eval_with("($x = 5) + $x", &mut v).unwrap(), Value::Int(10));
}

#[test]
fn test_no_rollback_on_failure() {
    // Assignments made before a failure stay applied
    let mut v = Variables::new();
    assert!(eval_with("($x = 1) + \"a\"", &mut v).is_err());
    assert_eq!(v.get("x"), Some(&Value::Int(1)));
}

// ============================================================================
// Arithmetic and numeric widening
// ============================================================================

#[test]
fn test_int_arithmetic_stays_int() {
    assert_eq!(eval("1 + 2").unwrap(), Value::Int(3));
    assert_eq!(eval("10 - 4 - 3").unwrap(), Value::Int(3));
    assert_eq!(eval("6 * 7").unwrap(), Value::Int(42));
}

#[test]
fn test_widening_to_long() {
    assert_eq!(
        eval("2147483648 + 1").unwrap(),
        Value::Long(2147483649)
    );
    assert_eq!(
        eval("1 * 4000000000").unwrap(),
        Value::Long(4000000000)
    );
}

#[test]
fn test_widening_to_double() {
    assert_eq!(eval("1 + 0.5").unwrap(), Value::Double(1.5));
    assert_eq!(eval("2147483648 * 1.0").unwrap(), Value::Double(2147483648.0));
}

#[test]
fn test_division_is_always_floating_point() {
    assert_eq!(eval("7 / 2").unwrap(), Value::Double(3.5));
    assert_eq!(eval("6 / 3").unwrap(), Value::Double(2.0));
}

#[test]
fn test_division_by_zero() {
    assert_eq!(eval("1 / 0").unwrap_err(), EvalError::DivisionByZero);
    assert_eq!(eval("1.5 / 0.0").unwrap_err(), EvalError::DivisionByZero);
}

#[test]
fn test_string_concatenation() {
    assert_eq!(
        eval("\"foo\" + \"bar\"").unwrap(),
        Value::String("foobar".to_string())
    );
}

#[test]
fn test_mixed_add_is_a_type_error() {
    assert!(matches!(
        eval("\"a\" + 1").unwrap_err(),
        EvalError::TypeError(_)
    ));
    assert!(matches!(
        eval("null + 1").unwrap_err(),
        EvalError::TypeError(_)
    ));
}

#[test]
fn test_negate_values() {
    let mut v = vars(vec![("x", Value::Int(5))]);
    assert_eq!(eval_with("-$x", &mut v).unwrap(), Value::Int(-5));
    let mut v = vars(vec![("x", Value::Double(1.5))]);
    assert_eq!(eval_with("-$x", &mut v).unwrap(), Value::Double(-1.5));
    let mut v = vars(vec![("x", Value::String("no".into()))]);
    assert!(eval_with("-$x", &mut v).is_err());
}

// ============================================================================
// Equality
// ============================================================================

#[test]
fn test_loose_equality_coerces() {
    assert_eq!(eval("1 == \"1\"").unwrap(), Value::Boolean(true));
    assert_eq!(eval("1 == 1.0").unwrap(), Value::Boolean(true));
    assert_eq!(eval("1 != 2").unwrap(), Value::Boolean(true));
    assert_eq!(eval("null == null").unwrap(), Value::Boolean(true));
    assert_eq!(eval("null == 0").unwrap(), Value::Boolean(false));
    assert_eq!(eval("true == \"true\"").unwrap(), Value::Boolean(true));
}

#[test]
fn test_strict_equality_requires_matching_types() {
    assert_eq!(eval("1 === \"1\"").unwrap(), Value::Boolean(false));
    assert_eq!(eval("1 !== \"1\"").unwrap(), Value::Boolean(true));
    // all numeric widths are one runtime type
    assert_eq!(eval("1 === 1.0").unwrap(), Value::Boolean(true));
    assert_eq!(eval("1 === 1").unwrap(), Value::Boolean(true));
}

#[test]
fn test_collection_equality() {
    assert_eq!(eval("[1, 2] == [1, 2]").unwrap(), Value::Boolean(true));
    assert_eq!(eval("[1, 2] == [1, 2.0]").unwrap(), Value::Boolean(true));
    assert_eq!(eval("[1, 2] === [1, 2]").unwrap(), Value::Boolean(true));
    assert_eq!(eval("[1] == [1, 2]").unwrap(), Value::Boolean(false));
    assert_eq!(
        eval("{\"a\": 1} == {\"a\": 1}").unwrap(),
        Value::Boolean(true)
    );
    assert_eq!(eval("[1] == 1").unwrap(), Value::Boolean(false));
}

// ============================================================================
// Relational operators and `in`
// ============================================================================

#[test]
fn test_relational() {
    assert_eq!(eval("1 < 2").unwrap(), Value::Boolean(true));
    assert_eq!(eval("2 <= 2").unwrap(), Value::Boolean(true));
    assert_eq!(eval("3 > 2.5").unwrap(), Value::Boolean(true));
    assert_eq!(eval("2 >= 3").unwrap(), Value::Boolean(false));
}

#[test]
fn test_relational_requires_numbers() {
    assert!(matches!(
        eval("\"a\" < \"b\"").unwrap_err(),
        EvalError::TypeError(_)
    ));
}

#[test]
fn test_in_list_membership() {
    assert_eq!(eval("2 in [1, 2, 3]").unwrap(), Value::Boolean(true));
    assert_eq!(eval("4 in [1, 2, 3]").unwrap(), Value::Boolean(false));
    // loose membership comparison
    assert_eq!(eval("\"2\" in [1, 2, 3]").unwrap(), Value::Boolean(true));
}

#[test]
fn test_in_map_key_presence() {
    assert_eq!(
        eval("\"a\" in {\"a\": 1}").unwrap(),
        Value::Boolean(true)
    );
    assert_eq!(
        eval("\"b\" in {\"a\": 1}").unwrap(),
        Value::Boolean(false)
    );
    // keys coerce through their canonical string form
    assert_eq!(eval("1 in {\"1\": true}").unwrap(), Value::Boolean(true));
}

#[test]
fn test_in_requires_collection() {
    assert!(matches!(
        eval("1 in \"123\"").unwrap_err(),
        EvalError::TypeError(_)
    ));
}

// ============================================================================
// Logical operators
// ============================================================================

#[test]
fn test_logical_operators() {
    assert_eq!(eval("true && false").unwrap(), Value::Boolean(false));
    assert_eq!(eval("true || false").unwrap(), Value::Boolean(true));
    assert_eq!(eval("!true").unwrap(), Value::Boolean(false));
    // truthiness of non-booleans
    assert_eq!(eval("1 && \"x\"").unwrap(), Value::Boolean(true));
    assert_eq!(eval("0 || null").unwrap(), Value::Boolean(false));
    assert_eq!(eval("![]").unwrap(), Value::Boolean(true));
}

#[test]
fn test_logical_operators_short_circuit() {
    let mut v = Variables::new();
    assert_eq!(
        eval_with("false && ($x = 1)", &mut v).unwrap(),
        Value::Boolean(false)
    );
    assert_eq!(v.get("x"), None);

    assert_eq!(
        eval_with("true || ($y = 1)", &mut v).unwrap(),
        Value::Boolean(true)
    );
    assert_eq!(v.get("y"), None);
}

// ============================================================================
// Member and index access
// ============================================================================

#[test]
fn test_member_access() {
    let mut v = vars(vec![(
        "user",
        object(vec![("name", Value::String("Alice".into()))]),
    )]);
    assert_eq!(
        eval_with("$user.name", &mut v).unwrap(),
        Value::String("Alice".into())
    );
    // absent key yields null
    assert_eq!(eval_with("$user.email", &mut v).unwrap(), Value::Null);
}

#[test]
fn test_index_access() {
    let mut v = vars(vec![(
        "items",
        Value::Array(vec![Value::Int(10), Value::Int(20), Value::Int(30)]),
    )]);
    assert_eq!(eval_with("$items[1]", &mut v).unwrap(), Value::Int(20));
    // negative index counts from the end
    assert_eq!(eval_with("$items[-1]", &mut v).unwrap(), Value::Int(30));
    // out of range yields null
    assert_eq!(eval_with("$items[9]", &mut v).unwrap(), Value::Null);
    assert_eq!(eval_with("$items[-9]", &mut v).unwrap(), Value::Null);
}

#[test]
fn test_numeric_object_keys_coerce() {
    let mut v = vars(vec![("m", object(vec![("1", Value::String("one".into()))]))]);
    assert_eq!(
        eval_with("$m[1]", &mut v).unwrap(),
        Value::String("one".into())
    );
}

#[test]
fn test_indexing_non_indexable_is_an_error() {
    assert!(matches!(
        eval("1[0]").unwrap_err(),
        EvalError::TypeError(_)
    ));
    assert!(matches!(
        eval("null.field").unwrap_err(),
        EvalError::TypeError(_)
    ));
    let mut v = vars(vec![("items", Value::Array(vec![]))]);
    assert!(matches!(
        eval_with("$items[\"k\"]", &mut v).unwrap_err(),
        EvalError::TypeError(_)
    ));
}

#[test]
fn test_literals_build_collections() {
    assert_eq!(
        eval("[1, \"a\", [true]]").unwrap(),
        Value::Array(vec![
            Value::Int(1),
            Value::String("a".into()),
            Value::Array(vec![Value::Boolean(true)]),
        ])
    );
    assert_eq!(
        eval("{\"a\": 1 + 1}").unwrap(),
        object(vec![("a", Value::Int(2))])
    );
}

// ============================================================================
// Builtin functions
// ============================================================================

#[test]
fn test_length() {
    assert_eq!(eval("length(\"abc\")").unwrap(), Value::Int(3));
    assert_eq!(eval("length([1, 2])").unwrap(), Value::Int(2));
    assert_eq!(eval("length({\"a\": 1})").unwrap(), Value::Int(1));
    assert!(eval("length(1)").is_err());
    assert!(eval("length()").is_err());
}

#[test]
fn test_string_functions() {
    assert_eq!(
        eval("upper(\"abc\")").unwrap(),
        Value::String("ABC".into())
    );
    assert_eq!(
        eval("lower(\"ABC\")").unwrap(),
        Value::String("abc".into())
    );
    assert_eq!(
        eval("trim(\"  x  \")").unwrap(),
        Value::String("x".into())
    );
    assert_eq!(
        eval("split(\"a,b\", \",\")").unwrap(),
        Value::Array(vec![
            Value::String("a".into()),
            Value::String("b".into())
        ])
    );
    assert_eq!(
        eval("startswith(\"hello\", \"he\")").unwrap(),
        Value::Boolean(true)
    );
    assert_eq!(
        eval("endswith(\"hello\", \"lo\")").unwrap(),
        Value::Boolean(true)
    );
}

#[test]
fn test_contains() {
    assert_eq!(
        eval("contains(\"hello\", \"ell\")").unwrap(),
        Value::Boolean(true)
    );
    assert_eq!(
        eval("contains([1, 2], 2)").unwrap(),
        Value::Boolean(true)
    );
    assert_eq!(
        eval("contains({\"k\": 1}, \"k\")").unwrap(),
        Value::Boolean(true)
    );
}

#[test]
fn test_matches() {
    assert_eq!(
        eval("matches(\"abc123\", \"^[a-z]+[0-9]+$\")").unwrap(),
        Value::Boolean(true)
    );
    assert_eq!(
        eval("matches(\"abc\", \"^[0-9]+$\")").unwrap(),
        Value::Boolean(false)
    );
    assert!(eval("matches(\"a\", \"(\")").is_err());
}

#[test]
fn test_object_functions() {
    assert_eq!(
        eval("keys({\"b\": 2, \"a\": 1})").unwrap(),
        Value::Array(vec![
            Value::String("a".into()),
            Value::String("b".into())
        ])
    );
    assert_eq!(
        eval("values({\"b\": 2, \"a\": 1})").unwrap(),
        Value::Array(vec![Value::Int(1), Value::Int(2)])
    );
}

#[test]
fn test_array_functions() {
    assert_eq!(eval("first([7, 8])").unwrap(), Value::Int(7));
    assert_eq!(eval("last([7, 8])").unwrap(), Value::Int(8));
    assert_eq!(eval("first([])").unwrap(), Value::Null);
    assert_eq!(eval("min([3, 1, 2])").unwrap(), Value::Int(1));
    assert_eq!(eval("max([3, 1, 2.5])").unwrap(), Value::Int(3));
    assert_eq!(eval("sum([1, 2, 3])").unwrap(), Value::Int(6));
    assert_eq!(eval("sum([1, 2.5])").unwrap(), Value::Double(3.5));
    assert_eq!(eval("sum([])").unwrap(), Value::Int(0));
    assert!(eval("sum([\"a\"])").is_err());
}

#[test]
fn test_type_and_from_json() {
    assert_eq!(eval("type(1)").unwrap(), Value::String("int".into()));
    assert_eq!(eval("type(1.5)").unwrap(), Value::String("double".into()));
    assert_eq!(eval("type(null)").unwrap(), Value::String("null".into()));
    assert_eq!(
        eval("from_json(\"[1, 2]\")").unwrap(),
        Value::Array(vec![Value::Int(1), Value::Int(2)])
    );
    assert!(eval("from_json(\"nope\")").is_err());
}

#[test]
fn test_unknown_function() {
    assert_eq!(
        eval("frobnicate(1)").unwrap_err(),
        EvalError::UnknownFunction("frobnicate".to_string())
    );
}

// ============================================================================
// Larger expressions
// ============================================================================

#[test]
fn test_realistic_expression() {
    let mut v = vars(vec![
        (
            "order",
            object(vec![
                ("total", Value::Int(120)),
                ("status", Value::String("open".into())),
                (
                    "items",
                    Value::Array(vec![
                        object(vec![("price", Value::Int(100))]),
                        object(vec![("price", Value::Int(20))]),
                    ]),
                ),
            ]),
        ),
        ("threshold", Value::Int(100)),
    ]);

    assert_eq!(
        eval_with(
            "$order.total > $threshold && $order.status == \"open\"",
            &mut v
        )
        .unwrap(),
        Value::Boolean(true)
    );
    assert_eq!(
        eval_with("$order.items[0].price / 4", &mut v).unwrap(),
        Value::Double(25.0)
    );
    assert_eq!(
        eval_with("length($order.items) in [1, 2, 3]", &mut v).unwrap(),
        Value::Boolean(true)
    );
}

#[test]
fn test_trees_are_reusable_across_environments() {
    let expr = parse("$x + 1").unwrap();
    let mut a = vars(vec![("x", Value::Int(1))]);
    let mut b = vars(vec![("x", Value::Int(10))]);
    assert_eq!(expr.evaluate(&mut a).unwrap(), Value::Int(2));
    assert_eq!(expr.evaluate(&mut b).unwrap(), Value::Int(11));
    assert_eq!(expr.evaluate(&mut a).unwrap(), Value::Int(2));
}
