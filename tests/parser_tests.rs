// tests/parser_tests.rs

use jp_policy::ast::{ArithmeticOp, Ast, Comparator, UnaryOp};
use jp_policy::lexer::Lexer;
use jp_policy::parser::{Parser, parse};
use jp_policy::value::Value;

fn field(name: &str) -> Box<Ast> {
    Box::new(Ast::Field(name.to_string()))
}

// ============================================================================
// Navigation
// ============================================================================

#[test]
fn test_field_and_subexpression() {
    assert_eq!(parse("foo").unwrap(), Ast::Field("foo".into()));
    assert_eq!(
        parse("foo.bar").unwrap(),
        Ast::Subexpression {
            lhs: field("foo"),
            rhs: field("bar"),
        }
    );
}

#[test]
fn test_subexpression_is_left_associative() {
    let ast = parse("a.b.c").unwrap();
    match ast {
        Ast::Subexpression { lhs, rhs } => {
            assert!(matches!(*lhs, Ast::Subexpression { .. }));
            assert_eq!(*rhs, Ast::Field("c".into()));
        }
        other => panic!("Expected subexpression, got {:?}", other),
    }
}

#[test]
fn test_quoted_field() {
    assert_eq!(
        parse(r#"metadata."app.kubernetes.io/name""#).unwrap(),
        Ast::Subexpression {
            lhs: field("metadata"),
            rhs: field("app.kubernetes.io/name"),
        }
    );
}

#[test]
fn test_index_expression() {
    assert_eq!(
        parse("foo[-1]").unwrap(),
        Ast::IndexExpression {
            lhs: field("foo"),
            rhs: Box::new(Ast::Index(-1)),
        }
    );
}

#[test]
fn test_slice_is_projected() {
    assert_eq!(
        parse("foo[1:3]").unwrap(),
        Ast::Projection {
            lhs: Box::new(Ast::IndexExpression {
                lhs: field("foo"),
                rhs: Box::new(Ast::Slice {
                    start: Some(1),
                    stop: Some(3),
                    step: None,
                }),
            }),
            rhs: Box::new(Ast::Identity),
        }
    );
}

#[test]
fn test_slice_parts_are_optional() {
    let ast = parse("[::-1]").unwrap();
    match ast {
        Ast::Projection { lhs, .. } => match *lhs {
            Ast::IndexExpression { rhs, .. } => assert_eq!(
                *rhs,
                Ast::Slice {
                    start: None,
                    stop: None,
                    step: Some(-1),
                }
            ),
            other => panic!("Expected index expression, got {:?}", other),
        },
        other => panic!("Expected projection, got {:?}", other),
    }
}

#[test]
fn test_zero_slice_step_is_rejected() {
    let err = parse("foo[::0]").unwrap_err();
    assert!(err.message.contains("step"), "{}", err);
}

#[test]
fn test_two_numbers_in_one_slice_part_are_rejected() {
    let err = parse("foo[:1 2]").unwrap_err();
    assert!(err.message.starts_with("Unexpected"), "{}", err);
    assert_eq!(err.position, 7);
    assert!(parse("foo[1 2:]").is_err());
    assert!(parse("foo[::1 -1]").is_err());
}

// ============================================================================
// Projections
// ============================================================================

#[test]
fn test_list_projection() {
    assert_eq!(
        parse("foo[*].bar").unwrap(),
        Ast::Projection {
            lhs: field("foo"),
            rhs: field("bar"),
        }
    );
}

#[test]
fn test_value_projection() {
    assert_eq!(
        parse("foo.*").unwrap(),
        Ast::Subexpression {
            lhs: field("foo"),
            rhs: Box::new(Ast::ValueProjection {
                lhs: Box::new(Ast::Identity),
                rhs: Box::new(Ast::Identity),
            }),
        }
    );
}

#[test]
fn test_flatten_projection() {
    assert_eq!(
        parse("foo[].bar").unwrap(),
        Ast::Projection {
            lhs: Box::new(Ast::Flatten(field("foo"))),
            rhs: field("bar"),
        }
    );
}

#[test]
fn test_filter_projection() {
    let ast = parse("items[?size > `1`].name").unwrap();
    match ast {
        Ast::FilterProjection {
            lhs,
            rhs,
            predicate,
        } => {
            assert_eq!(*lhs, Ast::Field("items".into()));
            assert_eq!(*rhs, Ast::Field("name".into()));
            assert!(matches!(
                *predicate,
                Ast::Comparator {
                    op: Comparator::GreaterThan,
                    ..
                }
            ));
        }
        other => panic!("Expected filter projection, got {:?}", other),
    }
}

#[test]
fn test_projection_stops_at_pipe() {
    let ast = parse("foo[*].bar | [0]").unwrap();
    match ast {
        Ast::Pipe { lhs, rhs } => {
            assert!(matches!(*lhs, Ast::Projection { .. }));
            assert!(matches!(*rhs, Ast::IndexExpression { .. }));
        }
        other => panic!("Expected pipe, got {:?}", other),
    }
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_or_binds_looser_than_and() {
    let ast = parse("a || b && c").unwrap();
    match ast {
        Ast::Or { lhs, rhs } => {
            assert_eq!(*lhs, Ast::Field("a".into()));
            assert!(matches!(*rhs, Ast::And { .. }));
        }
        other => panic!("Expected or, got {:?}", other),
    }
}

#[test]
fn test_arithmetic_precedence() {
    // Should be: Add(1, Multiply(2, 3))
    let ast = parse("`1` + `2` * `3`").unwrap();
    match ast {
        Ast::Arithmetic {
            op: ArithmeticOp::Add,
            lhs,
            rhs,
        } => {
            assert_eq!(*lhs, Ast::Literal(Value::from(1)));
            assert!(matches!(
                *rhs,
                Ast::Arithmetic {
                    op: ArithmeticOp::Multiply,
                    ..
                }
            ));
        }
        other => panic!("Expected addition, got {:?}", other),
    }
}

#[test]
fn test_parentheses() {
    let ast = parse("(a + b) * c").unwrap();
    match ast {
        Ast::Arithmetic {
            op: ArithmeticOp::Multiply,
            lhs,
            ..
        } => assert!(matches!(
            *lhs,
            Ast::Arithmetic {
                op: ArithmeticOp::Add,
                ..
            }
        )),
        other => panic!("Expected multiplication, got {:?}", other),
    }
}

#[test]
fn test_arithmetic_binds_tighter_than_comparison() {
    let ast = parse("a + b > c // d").unwrap();
    match ast {
        Ast::Comparator {
            op: Comparator::GreaterThan,
            lhs,
            rhs,
        } => {
            assert!(matches!(*lhs, Ast::Arithmetic { op: ArithmeticOp::Add, .. }));
            assert!(matches!(
                *rhs,
                Ast::Arithmetic {
                    op: ArithmeticOp::IntegerDivide,
                    ..
                }
            ));
        }
        other => panic!("Expected comparison, got {:?}", other),
    }
}

#[test]
fn test_unary_minus() {
    assert_eq!(
        parse("-a.b").unwrap(),
        Ast::Unary {
            op: UnaryOp::Minus,
            operand: Box::new(Ast::Subexpression {
                lhs: field("a"),
                rhs: field("b"),
            }),
        }
    );
    // binds tighter than multiplication
    assert!(matches!(
        parse("-a * b").unwrap(),
        Ast::Arithmetic {
            op: ArithmeticOp::Multiply,
            ..
        }
    ));
}

#[test]
fn test_bare_numbers_are_literals() {
    assert_eq!(parse("42").unwrap(), Ast::Literal(Value::from(42)));
    assert_eq!(parse("-1.5").unwrap(), Ast::Literal(Value::Number(-1.5)));
}

#[test]
fn test_not() {
    assert_eq!(
        parse("!foo").unwrap(),
        Ast::Not(field("foo"))
    );
}

// ============================================================================
// Construction and Functions
// ============================================================================

#[test]
fn test_multi_select_list() {
    assert_eq!(
        parse("[a, b]").unwrap(),
        Ast::MultiSelectList(vec![Ast::Field("a".into()), Ast::Field("b".into())])
    );
}

#[test]
fn test_multi_select_hash() {
    assert_eq!(
        parse("{x: a, \"y z\": b}").unwrap(),
        Ast::MultiSelectHash(vec![
            Ast::KeyValuePair {
                key: "x".into(),
                value: field("a"),
            },
            Ast::KeyValuePair {
                key: "y z".into(),
                value: field("b"),
            },
        ])
    );
}

#[test]
fn test_function_call_with_expref() {
    assert_eq!(
        parse("sort_by(items, &size)").unwrap(),
        Ast::FunctionCall {
            name: "sort_by".into(),
            args: vec![
                Ast::Field("items".into()),
                Ast::ExpressionRef(field("size")),
            ],
        }
    );
    assert_eq!(
        parse("time_now()").unwrap(),
        Ast::FunctionCall {
            name: "time_now".into(),
            args: vec![],
        }
    );
}

#[test]
fn test_let_expression() {
    assert_eq!(
        parse("let $x = a, $y = b in $x").unwrap(),
        Ast::LetExpression {
            bindings: Box::new(Ast::LetBindings(vec![
                Ast::KeyValuePair {
                    key: "x".into(),
                    value: field("a"),
                },
                Ast::KeyValuePair {
                    key: "y".into(),
                    value: field("b"),
                },
            ])),
            body: Box::new(Ast::VariableRef("x".into())),
        }
    );
}

#[test]
fn test_let_is_a_field_without_variable() {
    assert_eq!(parse("let").unwrap(), Ast::Field("let".into()));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_syntax_errors() {
    let cases = ["", "foo.", "{}", "f(a b)", "[a, b", "a ==", "foo[", "let $x = a $x", "\"f\"(a)"];
    for input in cases {
        assert!(parse(input).is_err(), "Expected error for: {:?}", input);
    }
}

#[test]
fn test_error_position() {
    let err = parse("foo bar").unwrap_err();
    assert_eq!(err.position, 4);
    assert!(err.to_string().ends_with("at position 4"));
}

#[test]
fn test_max_depth() {
    let parser = |text: &str, depth: usize| {
        Parser::new(Lexer::new(text))
            .unwrap()
            .with_max_depth(Some(depth))
            .parse()
    };
    assert!(parser("a.b", 2).is_ok());
    assert!(parser("a.b.c", 2).is_err());
    assert_eq!(parse("a.b.c").unwrap().depth(), 3);
}
