use jp_policy::{
    Config, EvalError, Optional, Record, Registry, Scope, Sequence, Value,
    container::KeyedMap,
    evaluator::Evaluator,
    parser::parse,
};
use serde_json::json;

fn eval_expr(expr_str: &str, doc: Value) -> Result<Value, EvalError> {
    let ast = parse(expr_str).unwrap();
    let registry = Registry::builder(&Config::default()).build();
    Evaluator::new(&registry, &doc).eval(&ast, &doc, &Scope::new())
}

fn doc(value: serde_json::Value) -> Value {
    Value::from(value)
}

fn json_object(pairs: Vec<(&str, Value)>) -> Value {
    Value::Object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

// ============================================================================
// Field access and the NotFound asymmetry
// ============================================================================

#[test]
fn test_simple_field_access() {
    let doc = json_object(vec![
        ("name", Value::from("John")),
        ("age", Value::from(30)),
    ]);
    assert_eq!(eval_expr("name", doc).unwrap(), Value::from("John"));
}

#[test]
fn test_nested_access() {
    let doc = doc(json!({"user": {"name": "Alice", "email": "alice@example.com"}}));
    assert_eq!(eval_expr("user.name", doc).unwrap(), Value::from("Alice"));
}

#[test]
fn test_missing_key_in_chain_is_not_found() {
    let result = eval_expr("a.b", doc(json!({"a": {}})));
    assert_eq!(result, Err(EvalError::NotFound { key: "b".into() }));

    let result = eval_expr("foo.bar", doc(json!({})));
    assert_eq!(result, Err(EvalError::NotFound { key: "foo".into() }));
}

#[test]
fn test_missing_key_is_absorbed_by_or() {
    let result = eval_expr("a.b || 'default'", doc(json!({"a": {}}))).unwrap();
    assert_eq!(result, Value::from("default"));
}

#[test]
fn test_field_of_non_object_is_null() {
    let doc = doc(json!({"a": 5, "s": "text", "l": [1], "n": null}));
    for expr in ["a.b", "s.b", "l.b", "n.b"] {
        assert_eq!(eval_expr(expr, doc.clone()).unwrap(), Value::Null, "{}", expr);
    }
}

#[test]
fn test_not_found_absorbed_outside_navigation() {
    let doc = doc(json!({"a": {}}));
    assert_eq!(eval_expr("!(a.b)", doc.clone()).unwrap(), Value::Boolean(true));
    // `!` binds tighter than `.`, so this reads a field of a boolean
    assert_eq!(eval_expr("!a.b", doc.clone()).unwrap(), Value::Null);
    assert_eq!(eval_expr("a.b == `null`", doc.clone()).unwrap(), Value::Boolean(true));
    assert_eq!(eval_expr("a.b && 'x'", doc.clone()).unwrap(), Value::Null);
    assert_eq!(eval_expr("a.b | @", doc.clone()).unwrap(), Value::Null);
    assert_eq!(eval_expr("not_null(a.b, 'x')", doc.clone()).unwrap(), Value::from("x"));
    assert_eq!(
        eval_expr("[a.b, `1`]", doc.clone()).unwrap(),
        Value::Array(vec![Value::Null, Value::from(1)])
    );
    assert_eq!(
        eval_expr("{v: a.b}", doc).unwrap(),
        json_object(vec![("v", Value::Null)])
    );
}

#[test]
fn test_not_found_in_projection_lhs_propagates() {
    let result = eval_expr("missing[*].a", doc(json!({})));
    assert_eq!(result, Err(EvalError::NotFound { key: "missing".into() }));
}

#[test]
fn test_root_and_identity() {
    let doc = doc(json!({"target": "b", "items": [{"n": "a"}, {"n": "b"}]}));
    assert_eq!(eval_expr("@", doc.clone()).unwrap(), doc);
    assert_eq!(
        eval_expr("items[?n == $.target].n", doc).unwrap(),
        Value::Array(vec![Value::from("b")])
    );
}

// ============================================================================
// Indexing and slicing
// ============================================================================

#[test]
fn test_array_access() {
    let doc = doc(json!({"items": ["first", "second", "third"]}));
    assert_eq!(eval_expr("items[1]", doc.clone()).unwrap(), Value::from("second"));
    assert_eq!(eval_expr("items[-1]", doc.clone()).unwrap(), Value::from("third"));
    assert_eq!(eval_expr("items[3]", doc.clone()).unwrap(), Value::Null);
    assert_eq!(eval_expr("items[-4]", doc).unwrap(), Value::Null);
}

#[test]
fn test_index_of_non_array_is_null() {
    assert_eq!(eval_expr("a[0]", doc(json!({"a": "xyz"}))).unwrap(), Value::Null);
}

#[test]
fn test_slices() {
    let doc = doc(json!({"n": [0, 1, 2, 3, 4, 5]}));
    let cases = [
        ("n[1:3]", json!([1, 2])),
        ("n[:2]", json!([0, 1])),
        ("n[::2]", json!([0, 2, 4])),
        ("n[::-1]", json!([5, 4, 3, 2, 1, 0])),
        ("n[-2:]", json!([4, 5])),
        ("n[10:]", json!([])),
        ("n[4:1:-2]", json!([4, 2])),
    ];
    for (expr, expected) in cases {
        assert_eq!(eval_expr(expr, doc.clone()).unwrap(), Value::from(expected), "{}", expr);
    }
}

fn expected_slice(len: i64, start: Option<i64>, stop: Option<i64>, step: i64) -> Vec<i64> {
    let (low, high) = if step > 0 { (0, len) } else { (-1, len - 1) };
    let bound = |b: i64| if b < 0 { (b + len).max(low) } else { b.min(high) };
    let stride = step.unsigned_abs() as usize;
    if step > 0 {
        (start.map_or(low, bound)..stop.map_or(high, bound))
            .step_by(stride)
            .collect()
    } else {
        (stop.map_or(low, bound) + 1..=start.map_or(high, bound))
            .rev()
            .step_by(stride)
            .collect()
    }
}

#[test]
fn test_slices_agree_with_range_stepping() {
    let bounds: Vec<Option<i64>> = std::iter::once(None).chain((-8..8).map(Some)).collect();
    let part = |b: Option<i64>| b.map(|n| n.to_string()).unwrap_or_default();
    for len in 0..6 {
        let doc = doc(json!({ "n": (0..len).collect::<Vec<i64>>() }));
        for &start in &bounds {
            for &stop in &bounds {
                for step in [-3, -2, -1, 1, 2, 3] {
                    let expr = format!("n[{}:{}:{}]", part(start), part(stop), step);
                    assert_eq!(
                        eval_expr(&expr, doc.clone()).unwrap(),
                        Value::from(json!(expected_slice(len, start, stop, step))),
                        "len {} {}",
                        len,
                        expr
                    );
                }
            }
        }
    }
}

#[test]
fn test_string_slices_use_code_points() {
    let doc = doc(json!({"s": "héllo"}));
    assert_eq!(eval_expr("s[1:3]", doc.clone()).unwrap(), Value::from("él"));
    assert_eq!(eval_expr("s[::-1]", doc).unwrap(), Value::from("olléh"));
}

#[test]
fn test_slice_of_non_sequence_is_null() {
    assert_eq!(eval_expr("a[0:1]", doc(json!({"a": 3}))).unwrap(), Value::Null);
}

// ============================================================================
// Projections
// ============================================================================

#[test]
fn test_list_projection_drops_nulls() {
    let doc = doc(json!({"people": [{"name": "a"}, {"age": 3}, {"name": "c"}]}));
    assert_eq!(eval_expr("people[*].name", doc).unwrap(), Value::from(json!(["a", "c"])));
}

#[test]
fn test_projection_of_non_array_is_null() {
    assert_eq!(eval_expr("a[*].b", doc(json!({"a": {"b": 1}}))).unwrap(), Value::Null);
}

#[test]
fn test_filter_projection() {
    let doc = doc(json!({"items": [
        {"name": "a", "size": 1},
        {"name": "b", "size": 2},
        {"name": "c", "size": 3},
        {"name": "d"}
    ]}));
    assert_eq!(
        eval_expr("items[?size > `1`].name", doc.clone()).unwrap(),
        Value::from(json!(["b", "c"]))
    );
    assert_eq!(
        eval_expr("items[?size].name", doc).unwrap(),
        Value::from(json!(["a", "b", "c"]))
    );
}

#[test]
fn test_value_projection_in_key_order() {
    let doc = doc(json!({"m": {"b": {"v": 2}, "a": {"v": 1}, "c": {}}}));
    assert_eq!(eval_expr("m.*.v", doc).unwrap(), Value::from(json!([1, 2])));
}

#[test]
fn test_flatten() {
    let doc = doc(json!({"a": [[1, 2], [3], 4, [[5]]]}));
    assert_eq!(eval_expr("a[]", doc).unwrap(), Value::from(json!([1, 2, 3, 4, [5]])));
}

#[test]
fn test_flatten_is_idempotent_on_flat_input() {
    let doc = doc(json!({"a": [1, 2, 3]}));
    assert_eq!(eval_expr("a[]", doc.clone()).unwrap(), Value::from(json!([1, 2, 3])));
    assert_eq!(eval_expr("a[][]", doc).unwrap(), Value::from(json!([1, 2, 3])));
}

#[test]
fn test_pipe_stops_projection() {
    let doc = doc(json!({"items": [{"n": "a"}, {"n": "b"}]}));
    assert_eq!(eval_expr("items[*].n | [0]", doc).unwrap(), Value::from("a"));
}

// ============================================================================
// Logic and comparison
// ============================================================================

#[test]
fn test_or_and_return_deciding_operand() {
    let doc = doc(json!({"a": "", "b": [1], "c": 0}));
    assert_eq!(eval_expr("a || b", doc.clone()).unwrap(), Value::from(json!([1])));
    assert_eq!(eval_expr("a && b", doc.clone()).unwrap(), Value::from(""));
    assert_eq!(eval_expr("b && c", doc).unwrap(), Value::from(0));
}

#[test]
fn test_every_number_is_truthy() {
    let doc = doc(json!({"zero": 0}));
    assert_eq!(eval_expr("zero || 'x'", doc.clone()).unwrap(), Value::from(0));
    assert_eq!(eval_expr("!zero", doc).unwrap(), Value::Boolean(false));
}

#[test]
fn test_empty_values_are_falsy() {
    let doc = doc(json!({"s": "", "l": [], "o": {}, "f": false}));
    for expr in ["!s", "!l", "!o", "!f", "!n"] {
        let value = eval_expr(expr, doc.clone());
        // `n` is missing, and reads as null under `!`
        assert_eq!(value.unwrap(), Value::Boolean(true), "{}", expr);
    }
}

#[test]
fn test_comparisons() {
    let doc = doc(json!({"a": 1, "b": 2, "s": "abc", "t": "abd", "o": {"x": [1]}}));
    let cases = [
        ("a < b", Value::Boolean(true)),
        ("a >= b", Value::Boolean(false)),
        ("s < t", Value::Boolean(true)),
        ("a == `1`", Value::Boolean(true)),
        ("o == `{\"x\": [1]}`", Value::Boolean(true)),
        ("a != s", Value::Boolean(true)),
        ("a < s", Value::Null),
        ("o > a", Value::Null),
    ];
    for (expr, expected) in cases {
        assert_eq!(eval_expr(expr, doc.clone()).unwrap(), expected, "{}", expr);
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

#[test]
fn test_arithmetic_operators() {
    let doc = doc(json!({"a": 7, "b": 2}));
    let cases = [
        ("a + b", 9.0),
        ("a - b", 5.0),
        ("a * b", 14.0),
        ("a / b", 3.5),
        ("a % b", 1.0),
        ("a // b", 3.0),
        ("a + b * `2`", 11.0),
        ("-a + b", -5.0),
    ];
    for (expr, expected) in cases {
        assert_eq!(eval_expr(expr, doc.clone()).unwrap(), Value::Number(expected), "{}", expr);
    }
}

#[test]
fn test_arithmetic_on_quantities_and_durations() {
    let doc = doc(json!({"mem": "12Ki", "more": "13Ki", "t": "90s", "u": "30s"}));
    assert_eq!(eval_expr("mem + more", doc.clone()).unwrap(), Value::from("25Ki"));
    assert_eq!(eval_expr("t - u", doc.clone()).unwrap(), Value::from("1m0s"));
    assert_eq!(eval_expr("mem * `2`", doc.clone()).unwrap(), Value::from("24Ki"));
    assert_eq!(eval_expr("t / u", doc.clone()).unwrap(), Value::from(3));
    assert_eq!(eval_expr("-mem", doc).unwrap(), Value::from("-12Ki"));
}

#[test]
fn test_arithmetic_errors() {
    let doc = doc(json!({"n": 1, "q": "1Ki", "flag": true}));
    assert!(matches!(
        eval_expr("n + q", doc.clone()),
        Err(EvalError::TypeMismatch { .. })
    ));
    assert!(matches!(
        eval_expr("n + flag", doc.clone()),
        Err(EvalError::InvalidOperands { .. })
    ));
    assert!(matches!(
        eval_expr("n / `0`", doc.clone()),
        Err(EvalError::ZeroDivision { .. })
    ));
    assert!(matches!(
        eval_expr("-flag", doc.clone()),
        Err(EvalError::TypeMismatch { .. })
    ));
    assert!(matches!(
        eval_expr("+flag", doc),
        Err(EvalError::TypeMismatch { .. })
    ));
}

#[test]
fn test_missing_operand_reads_as_null() {
    assert!(matches!(
        eval_expr("a.b + `1`", doc(json!({"a": {}}))),
        Err(EvalError::InvalidOperands { .. })
    ));
}

// ============================================================================
// Multi-select
// ============================================================================

#[test]
fn test_multi_select() {
    let doc = doc(json!({"a": 1, "b": {"c": 2}}));
    assert_eq!(eval_expr("[a, b.c]", doc.clone()).unwrap(), Value::from(json!([1, 2])));
    assert_eq!(
        eval_expr("{x: a, y: b.c}", doc).unwrap(),
        Value::from(json!({"x": 1, "y": 2}))
    );
}

#[test]
fn test_multi_select_on_null_is_null() {
    let doc = doc(json!({"a": null}));
    assert_eq!(eval_expr("a.[b, c]", doc.clone()).unwrap(), Value::Null);
    assert_eq!(eval_expr("a.{b: b}", doc).unwrap(), Value::Null);
}

// ============================================================================
// Let bindings
// ============================================================================

#[test]
fn test_let_binds_variables() {
    let doc = doc(json!({"limit": 2, "items": [{"v": 1}, {"v": 3}, {"v": 5}]}));
    assert_eq!(
        eval_expr("let $max = limit in items[?v > $max].v", doc).unwrap(),
        Value::from(json!([3, 5]))
    );
}

#[test]
fn test_let_bindings_see_the_incoming_scope() {
    let result = eval_expr(
        "let $x = `1` in let $x = `2`, $y = $x in [$x, $y]",
        doc(json!({})),
    )
    .unwrap();
    assert_eq!(result, Value::from(json!([2, 1])));
}

#[test]
fn test_let_scope_ends_with_body() {
    let result = eval_expr("[let $x = `1` in $x, $x]", doc(json!({})));
    assert_eq!(result, Err(EvalError::UndefinedVariable { name: "x".into() }));
}

#[test]
fn test_undefined_variable() {
    assert_eq!(
        eval_expr("$nope", Value::Null),
        Err(EvalError::UndefinedVariable { name: "nope".into() })
    );
}

#[test]
fn test_let_binding_absorbs_not_found() {
    let result = eval_expr("let $x = a.b in $x || 'none'", doc(json!({"a": {}}))).unwrap();
    assert_eq!(result, Value::from("none"));
}

// ============================================================================
// Functions and expression references
// ============================================================================

#[test]
fn test_function_calls() {
    let doc = doc(json!({"items": [{"n": "b", "v": 2}, {"n": "a", "v": 1}]}));
    assert_eq!(eval_expr("length(items)", doc.clone()).unwrap(), Value::from(2));
    assert_eq!(
        eval_expr("sort_by(items, &v)[*].n", doc.clone()).unwrap(),
        Value::from(json!(["a", "b"]))
    );
    assert_eq!(
        eval_expr("map(&n, items)", doc).unwrap(),
        Value::from(json!(["b", "a"]))
    );
}

#[test]
fn test_expref_reads_missing_keys_as_null() {
    let doc = doc(json!({"items": [{"a": 1}, {}]}));
    assert_eq!(eval_expr("map(&a, items)", doc).unwrap(), Value::from(json!([1, null])));
}

#[test]
fn test_expref_captures_scope() {
    let doc = doc(json!({"items": [1, 2]}));
    assert_eq!(
        eval_expr("let $k = `10` in map(&[@, $k], items)", doc).unwrap(),
        Value::from(json!([[1, 10], [2, 10]]))
    );
}

#[test]
fn test_function_errors() {
    assert_eq!(
        eval_expr("nope()", Value::Null),
        Err(EvalError::UnknownFunction { name: "nope".into() })
    );
    assert!(matches!(
        eval_expr("length()", Value::Null),
        Err(EvalError::InvalidArity { actual: 0, .. })
    ));
    match eval_expr("length(`1`)", Value::Null) {
        Err(EvalError::InvalidArgument {
            function, position, ..
        }) => {
            assert_eq!(function, "length");
            assert_eq!(position, 1);
        }
        other => panic!("Expected invalid argument, got {:?}", other),
    }
}

// ============================================================================
// Container views
// ============================================================================

fn pod() -> Value {
    let container = Record::new("Container")
        .field("Name", "web")
        .field("Resources", Record::new("Resources").field("Memory", "64Mi"));
    let sidecar = Record::new("Container")
        .field("Name", "proxy")
        .field("Resources", Record::new("Resources").field("Memory", "32Mi"));
    let containers: Vec<Value> = vec![container.into(), sidecar.into()];
    Record::new("Pod")
        .field("Name", "demo")
        .field("Containers", Value::view(Sequence::new(containers)))
        .field("Owner", Optional::none())
        .field("Spec", Optional::some(Record::new("Spec").field("Replicas", 3)))
        .field(
            "Ports",
            Value::view([(80i64, "http"), (443, "https")].into_iter().collect::<KeyedMap<i64, &str>>()),
        )
        .into()
}

#[test]
fn test_record_fields_fold_first_letter() {
    assert_eq!(eval_expr("name", pod()).unwrap(), Value::from("demo"));
    assert_eq!(eval_expr("Name", pod()).unwrap(), Value::from("demo"));
}

#[test]
fn test_record_missing_field_is_not_found() {
    assert_eq!(
        eval_expr("uid.x", pod()),
        Err(EvalError::NotFound { key: "uid".into() })
    );
}

#[test]
fn test_sequence_views_project_like_arrays() {
    assert_eq!(
        eval_expr("containers[*].name", pod()).unwrap(),
        Value::from(json!(["web", "proxy"]))
    );
    assert_eq!(eval_expr("containers[-1].name", pod()).unwrap(), Value::from("proxy"));
    assert_eq!(eval_expr("length(containers)", pod()).unwrap(), Value::from(2));
    assert_eq!(
        eval_expr("sum(containers[].resources.memory)", pod()).unwrap(),
        Value::from("96Mi")
    );
}

#[test]
fn test_optional_views_dereference() {
    assert_eq!(eval_expr("owner", pod()).unwrap(), Value::Null);
    assert_eq!(eval_expr("owner.name", pod()).unwrap(), Value::Null);
    assert_eq!(eval_expr("spec.replicas", pod()).unwrap(), Value::from(3));
}

#[test]
fn test_keyed_map_view() {
    assert_eq!(eval_expr("ports.\"443\"", pod()).unwrap(), Value::from("https"));
    assert_eq!(
        eval_expr("keys(ports)", pod()).unwrap(),
        Value::from(json!(["443", "80"]))
    );
}

#[test]
fn test_views_behave_like_plain_documents() {
    let plain = pod().materialize();
    // materialized records keep their declared field names
    for expr in ["Containers[*].Resources.Memory", "Spec", "{n: Name, c: length(Containers)}"] {
        assert_eq!(eval_expr(expr, pod()).unwrap(), eval_expr(expr, plain.clone()).unwrap(), "{}", expr);
    }
}
