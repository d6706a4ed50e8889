// End-to-end behavior of compile/search and the Interpreter.

use std::{sync::Arc, thread};

use jp_policy::{CompiledQuery, Config, Error, EvalError, Interpreter, Registry, Scope, Value};
use serde_json::json;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_search_end_to_end() {
    let doc = Value::from(json!({"items": [{"v": "2Ki"}, {"v": "3Ki"}]}));
    assert_eq!(jp_policy::search("sum(items[].v)", &doc).unwrap(), Value::from("5Ki"));
}

#[test]
fn test_search_reports_compile_errors() {
    match jp_policy::search("foo[", &Value::Null) {
        Err(Error::Compile(e)) => assert_eq!(e.position, 4),
        other => panic!("Expected compile error, got {:?}", other),
    }
    assert!(matches!(
        jp_policy::search("'abc", &Value::Null),
        Err(Error::Compile(_))
    ));
}

#[test]
fn test_search_reports_eval_errors() {
    let doc = Value::from(json!({"a": {}}));
    assert_eq!(
        jp_policy::search("a.b", &doc),
        Err(Error::Eval(EvalError::NotFound { key: "b".into() }))
    );
    assert_eq!(
        jp_policy::search("foo.bar", &Value::from(json!({}))),
        Err(Error::Eval(EvalError::NotFound { key: "foo".into() }))
    );
}

#[test]
fn test_error_messages() {
    let err = jp_policy::search("a.b", &Value::from(json!({"a": {}}))).unwrap_err();
    assert_eq!(err.to_string(), "Unknown key \"b\" in path");

    let err = jp_policy::search("`1` / `0`", &Value::Null).unwrap_err();
    assert_eq!(err.to_string(), "divide: zero divisor passed");
}

#[test]
fn test_compiled_query_is_reusable() {
    let query = jp_policy::compile("people[?age >= `18`].name").unwrap();
    let first = Value::from(json!({"people": [{"name": "a", "age": 17}, {"name": "b", "age": 18}]}));
    let second = Value::from(json!({"people": [{"name": "c", "age": 40}]}));
    assert_eq!(query.search(&first).unwrap(), Value::from(json!(["b"])));
    assert_eq!(query.search(&second).unwrap(), Value::from(json!(["c"])));
    assert_eq!(query.search(&first).unwrap(), Value::from(json!(["b"])));
}

#[test]
fn test_search_with_prebound_variables() {
    let query = jp_policy::compile("items[?size > $min].name").unwrap();
    let doc = Value::from(json!({"items": [{"name": "a", "size": 1}, {"name": "b", "size": 5}]}));
    let scope: Scope = [("min".to_string(), Value::from(2))].into_iter().collect();
    assert_eq!(query.search_with(&doc, &scope).unwrap(), Value::from(json!(["b"])));
    assert_eq!(
        query.search(&doc),
        Err(EvalError::UndefinedVariable { name: "min".into() })
    );
}

#[test]
fn test_let_shadows_prebound_variables() {
    let query = jp_policy::compile("let $x = `2` in $x").unwrap();
    let scope: Scope = [("x".to_string(), Value::from(1))].into_iter().collect();
    assert_eq!(query.search_with(&Value::Null, &scope).unwrap(), Value::from(2));
}

#[test]
fn test_interpreter_uses_config() {
    let config = Config {
        string_functions: false,
        ..Config::default()
    };
    let interpreter = Interpreter::new(config);
    assert!(!interpreter.registry().contains("to_upper"));
    assert!(matches!(
        interpreter.search("to_upper('a')", &Value::Null),
        Err(Error::Eval(EvalError::UnknownFunction { .. }))
    ));
    assert_eq!(
        interpreter.search("length('abc')", &Value::Null).unwrap(),
        Value::from(3)
    );
}

#[test]
fn test_max_depth_from_config() {
    let interpreter = Interpreter::new(Config {
        max_depth: Some(3),
        ..Config::default()
    });
    assert!(interpreter.compile("a.b.c").is_ok());
    let err = interpreter.compile("a.b.c.d").unwrap_err();
    assert!(err.message.contains("depth"), "{}", err);

    // the default interpreter has no bound
    let deep = vec!["a"; 200].join(".");
    assert!(jp_policy::compile(&deep).is_ok());
}

#[test]
fn test_config_from_json() {
    let config = Config::from_json(r#"{"arithmeticFunctions": false, "disabled": ["keys"]}"#).unwrap();
    let interpreter = Interpreter::new(config);
    assert!(!interpreter.registry().contains("add"));
    assert!(!interpreter.registry().contains("keys"));
    assert!(interpreter.registry().contains("values"));
    assert!(Config::from_json(r#"{"maxDepth": "deep"}"#).is_err());
}

#[test]
fn test_compiled_query_exposes_tree() {
    let query = jp_policy::compile("a.b").unwrap();
    assert_eq!(query.ast(), &jp_policy::parser::parse("a.b").unwrap());
}

#[test]
fn test_public_types_are_thread_safe() {
    assert_send_sync::<CompiledQuery>();
    assert_send_sync::<Registry>();
    assert_send_sync::<Value>();
    assert_send_sync::<jp_policy::Ast>();
    assert_send_sync::<Interpreter>();
}

#[test]
fn test_concurrent_searches_share_one_query() {
    let query = Arc::new(jp_policy::compile("sum(items[].mem)").unwrap());
    let handles: Vec<_> = (1..=8)
        .map(|n| {
            let query = Arc::clone(&query);
            thread::spawn(move || {
                let items: Vec<_> = (0..n).map(|_| json!({"mem": "1Ki"})).collect();
                let doc = Value::from(json!({ "items": items }));
                (n, query.search(&doc).unwrap())
            })
        })
        .collect();

    for handle in handles {
        let (n, result) = handle.join().unwrap();
        assert_eq!(result, Value::from(format!("{}Ki", n)));
    }
}

#[test]
fn test_search_is_deterministic() {
    let doc = Value::from(json!({"m": {"z": 1, "a": 2, "k": 3}}));
    let first = jp_policy::search("{keys: keys(m), values: m.*}", &doc).unwrap();
    for _ in 0..5 {
        assert_eq!(jp_policy::search("{keys: keys(m), values: m.*}", &doc).unwrap(), first);
    }
    assert_eq!(first, Value::from(json!({"keys": ["a", "k", "z"], "values": [2, 3, 1]})));
}

#[test]
fn test_policy_style_query() {
    let doc = Value::from(json!({
        "spec": {
            "containers": [
                {"name": "web", "resources": {"limits": {"memory": "512Mi", "cpu": "500m"}}},
                {"name": "sidecar", "resources": {"limits": {"memory": "256Mi", "cpu": "250m"}}},
                {"name": "debug", "resources": {}}
            ]
        }
    }));
    let query = jp_policy::compile(
        "let $budget = '1Gi' in {
            memory: sum(spec.containers[].resources.limits.memory),
            cpu: sum(spec.containers[].resources.limits.cpu),
            unbounded: spec.containers[?resources.limits == `null`].name,
            headroom: $budget - sum(spec.containers[].resources.limits.memory)
        }",
    )
    .unwrap();
    assert_eq!(
        query.search(&doc).unwrap(),
        Value::from(json!({
            "memory": "768Mi",
            "cpu": "750m",
            "unbounded": ["debug"],
            "headroom": "256Mi"
        }))
    );
}
