use std::collections::HashMap;

use crate::{
    arithmetic::{self, Operand},
    ast::{Ast, Comparator, UnaryOp},
    container::ViewKind,
    error::{EvalError, EvalResult},
    functions::{CallContext, Registry},
    scope::Scope,
    value::{ExprRef, Map, Value},
};

/// Tree-walking evaluator.
///
/// An evaluator lives for one search: it borrows the function registry and
/// the root document (what `$` refers to) and holds no other state, so the
/// same compiled tree can be evaluated by any number of evaluators at once.
///
/// Missing object keys raise [`EvalError::NotFound`]. Navigation chains
/// (`a.b`, `a[0]`, the left side of projections) pass it on to the caller;
/// every other node reads it as null:
///
/// ```text
/// {"a": {}}   a.b              -> NotFound("b")
/// {"a": {}}   a.b || 'x'       -> "x"
/// {"a": {}}   length(a.b)      -> invalid argument (null)
/// ```
pub struct Evaluator<'a> {
    registry: &'a Registry,
    root: &'a Value,
}

impl<'a> Evaluator<'a> {
    pub fn new(registry: &'a Registry, root: &'a Value) -> Self {
        Evaluator { registry, root }
    }

    /// The document the search started from.
    pub fn root(&self) -> &'a Value {
        self.root
    }

    /// Evaluates `node` with `value` as the current value (`@`).
    ///
    /// # Examples
    ///
    /// ```
    /// use jp_policy::{Config, Value, evaluator::Evaluator, functions::Registry, parser, scope::Scope};
    ///
    /// let registry = Registry::builder(&Config::default()).build();
    /// let doc = Value::from(serde_json::json!({"a": {"b": [1, 2, 3]}}));
    /// let ast = parser::parse("length(a.b)").unwrap();
    ///
    /// let result = Evaluator::new(&registry, &doc).eval(&ast, &doc, &Scope::new()).unwrap();
    /// assert_eq!(result, Value::from(3));
    /// ```
    pub fn eval(&self, node: &Ast, value: &Value, scope: &Scope) -> EvalResult<Value> {
        match node {
            Ast::Identity => Ok(value.clone()),
            Ast::Root => Ok(self.root.clone()),
            Ast::Literal(literal) => Ok(literal.clone()),

            Ast::VariableRef(name) => scope
                .lookup(name)
                .cloned()
                .ok_or_else(|| EvalError::UndefinedVariable { name: name.clone() }),

            Ast::Field(name) => field(value, name),
            Ast::Index(index) => Ok(index_value(value, *index)),
            Ast::Slice { start, stop, step } => Ok(slice_value(value, *start, *stop, step.unwrap_or(1))),

            Ast::Subexpression { lhs, rhs } | Ast::IndexExpression { lhs, rhs } => {
                let left = self.eval(lhs, value, scope)?;
                if left.is_null() {
                    return Ok(Value::Null);
                }
                self.eval(rhs, &left, scope)
            }

            Ast::Projection { lhs, rhs } => {
                let left = self.eval(lhs, value, scope)?;
                let Some(items) = left.as_sequence() else {
                    // a sliced string stays a string
                    if matches!(left, Value::String(_)) && is_slice(lhs) {
                        return self.eval_or_null(rhs, &left, scope);
                    }
                    return Ok(Value::Null);
                };
                self.project(items.iter(), rhs, scope)
            }

            Ast::FilterProjection { lhs, rhs, predicate } => {
                let left = self.eval(lhs, value, scope)?;
                let Some(items) = left.as_sequence() else {
                    return Ok(Value::Null);
                };
                let mut kept = Vec::new();
                for item in items.iter() {
                    if self.eval_or_null(predicate, item, scope)?.is_truthy() {
                        kept.push(item);
                    }
                }
                self.project(kept.into_iter(), rhs, scope)
            }

            Ast::ValueProjection { lhs, rhs } => {
                let left = self.eval(lhs, value, scope)?;
                let Some(entries) = left.as_mapping() else {
                    return Ok(Value::Null);
                };
                self.project(entries.values(), rhs, scope)
            }

            Ast::Flatten(child) => {
                let inner = self.eval(child, value, scope)?;
                let Some(items) = inner.as_sequence() else {
                    return Ok(Value::Null);
                };
                let mut flat = Vec::with_capacity(items.len());
                for item in items.iter() {
                    match item.as_sequence() {
                        Some(nested) => flat.extend(nested.iter().cloned()),
                        None => flat.push(item.clone()),
                    }
                }
                Ok(Value::Array(flat))
            }

            Ast::Pipe { lhs, rhs } => {
                let left = self.eval_or_null(lhs, value, scope)?;
                self.eval_or_null(rhs, &left, scope)
            }

            Ast::Or { lhs, rhs } => {
                let left = self.eval_or_null(lhs, value, scope)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval_or_null(rhs, value, scope)
                }
            }

            Ast::And { lhs, rhs } => {
                let left = self.eval_or_null(lhs, value, scope)?;
                if left.is_truthy() {
                    self.eval_or_null(rhs, value, scope)
                } else {
                    Ok(left)
                }
            }

            Ast::Not(child) => {
                let inner = self.eval_or_null(child, value, scope)?;
                Ok(Value::Boolean(!inner.is_truthy()))
            }

            Ast::Comparator { op, lhs, rhs } => {
                let left = self.eval_or_null(lhs, value, scope)?;
                let right = self.eval_or_null(rhs, value, scope)?;
                Ok(compare(*op, &left, &right))
            }

            Ast::Arithmetic { op, lhs, rhs } => {
                let left = self.eval_or_null(lhs, value, scope)?;
                let right = self.eval_or_null(rhs, value, scope)?;
                arithmetic::apply(*op, &left, &right)
            }

            Ast::Unary { op, operand } => {
                let inner = self.eval_or_null(operand, value, scope)?;
                match op {
                    UnaryOp::Minus => arithmetic::negate(&inner),
                    UnaryOp::Plus => match Operand::classify(&inner, "plus") {
                        Ok(_) => Ok(inner.resolve().into_owned()),
                        Err(_) => Err(EvalError::type_mismatch("plus", inner.type_name())),
                    },
                }
            }

            Ast::FunctionCall { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval_or_null(arg, value, scope))
                    .collect::<EvalResult<Vec<_>>>()?;
                self.registry.call(name, &args, &CallContext::new(self))
            }

            Ast::ExpressionRef(child) => Ok(Value::Expref(ExprRef::new(
                child.as_ref().clone(),
                scope.clone(),
            ))),

            Ast::MultiSelectList(items) => {
                if value.is_null() {
                    return Ok(Value::Null);
                }
                items
                    .iter()
                    .map(|item| self.eval_or_null(item, value, scope))
                    .collect::<EvalResult<Vec<_>>>()
                    .map(Value::Array)
            }

            Ast::MultiSelectHash(entries) => {
                if value.is_null() {
                    return Ok(Value::Null);
                }
                let mut object = Map::new();
                for entry in entries {
                    let (key, node) = key_value(entry)?;
                    object.insert(key.to_string(), self.eval_or_null(node, value, scope)?);
                }
                Ok(Value::Object(object))
            }

            Ast::LetExpression { bindings, body } => {
                let Ast::LetBindings(entries) = bindings.as_ref() else {
                    return Err(EvalError::UnknownNode {
                        kind: bindings.kind(),
                    });
                };
                let mut frame = HashMap::with_capacity(entries.len());
                for entry in entries {
                    let (name, node) = key_value(entry)?;
                    frame.insert(name.to_string(), self.eval_or_null(node, value, scope)?);
                }
                self.eval(body, value, &scope.with(frame))
            }

            Ast::KeyValuePair { .. } | Ast::LetBindings(_) => Err(EvalError::UnknownNode {
                kind: node.kind(),
            }),
        }
    }

    /// Like [`Evaluator::eval`], reading a missing key as null.
    pub(crate) fn eval_or_null(&self, node: &Ast, value: &Value, scope: &Scope) -> EvalResult<Value> {
        match self.eval(node, value, scope) {
            Err(EvalError::NotFound { .. }) => Ok(Value::Null),
            other => other,
        }
    }

    fn project<'v>(
        &self,
        items: impl Iterator<Item = &'v Value>,
        rhs: &Ast,
        scope: &Scope,
    ) -> EvalResult<Value> {
        let mut collected = Vec::new();
        for item in items {
            let projected = self.eval_or_null(rhs, item, scope)?;
            if !projected.is_null() {
                collected.push(projected);
            }
        }
        Ok(Value::Array(collected))
    }
}

fn is_slice(node: &Ast) -> bool {
    matches!(node, Ast::IndexExpression { rhs, .. } if matches!(rhs.as_ref(), Ast::Slice { .. }))
}

fn key_value(node: &Ast) -> EvalResult<(&str, &Ast)> {
    match node {
        Ast::KeyValuePair { key, value } => Ok((key, value)),
        other => Err(EvalError::UnknownNode { kind: other.kind() }),
    }
}

fn field(value: &Value, name: &str) -> EvalResult<Value> {
    let not_found = || EvalError::NotFound {
        key: name.to_string(),
    };
    match value.resolve().as_ref() {
        Value::Object(object) => object.get(name).cloned().ok_or_else(not_found),
        Value::View(view) if matches!(view.kind(), ViewKind::Record | ViewKind::Map) => {
            view.get(name).ok_or_else(not_found)
        }
        _ => Ok(Value::Null),
    }
}

fn index_value(value: &Value, index: i64) -> Value {
    let resolved = value.resolve();
    let len = match resolved.as_ref() {
        Value::Array(items) => items.len(),
        Value::View(view) if view.kind() == ViewKind::Sequence => view.len(),
        _ => return Value::Null,
    };
    let position = if index < 0 {
        len as i64 + index
    } else {
        index
    };
    if position < 0 || position >= len as i64 {
        return Value::Null;
    }
    let position = position as usize;
    match resolved.as_ref() {
        Value::Array(items) => items[position].clone(),
        Value::View(view) => view.index(position).unwrap_or_default(),
        _ => Value::Null,
    }
}

fn slice_value(value: &Value, start: Option<i64>, stop: Option<i64>, step: i64) -> Value {
    match value.resolve().as_ref() {
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            Value::String(slice(&chars, start, stop, step).into_iter().collect())
        }
        other => match other.as_sequence() {
            Some(items) => Value::Array(slice(&items, start, stop, step)),
            None => Value::Null,
        },
    }
}

/// Python-style slicing. A zero step is rejected by the parser and yields
/// nothing here.
pub(crate) fn slice<T: Clone>(items: &[T], start: Option<i64>, stop: Option<i64>, step: i64) -> Vec<T> {
    if step == 0 {
        return Vec::new();
    }
    let len = items.len() as i64;
    let clamp = |bound: i64| -> i64 {
        if bound < 0 {
            let shifted = bound + len;
            if shifted >= 0 {
                shifted
            } else if step < 0 {
                -1
            } else {
                0
            }
        } else if bound >= len {
            if step < 0 { len - 1 } else { len }
        } else {
            bound
        }
    };
    let start = match start {
        Some(s) => clamp(s),
        None if step < 0 => len - 1,
        None => 0,
    };
    let stop = match stop {
        Some(s) => clamp(s),
        None if step < 0 => -1,
        None => len,
    };

    let mut result = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        result.push(items[i as usize].clone());
        i += step;
    }
    result
}

fn compare(op: Comparator, lhs: &Value, rhs: &Value) -> Value {
    let ordering = match (lhs.resolve().as_ref(), rhs.resolve().as_ref()) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    };
    let result = match (op, ordering) {
        (Comparator::Equal, _) => lhs == rhs,
        (Comparator::NotEqual, _) => lhs != rhs,
        (_, None) => return Value::Null,
        (Comparator::LessThan, Some(o)) => o.is_lt(),
        (Comparator::LessEqual, Some(o)) => o.is_le(),
        (Comparator::GreaterThan, Some(o)) => o.is_gt(),
        (Comparator::GreaterEqual, Some(o)) => o.is_ge(),
    };
    Value::Boolean(result)
}
