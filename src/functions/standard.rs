//! The standard function library of the query language, always registered.

use std::cmp::Ordering;

use super::{
    ArgSpec, CallContext, DataType as T, FunctionDescriptor, RegistryBuilder, array_arg, expref_arg,
    number_arg,
    sig::{any_of, one},
    string_arg,
};
use crate::{
    error::{EvalError, EvalResult},
    value::{Map, Value},
};

pub(super) fn register(builder: &mut RegistryBuilder) {
    let functions = [
        FunctionDescriptor::new("abs", vec![one(T::Number)], &[T::Number], abs),
        FunctionDescriptor::new("avg", vec![one(T::ArrayNumber)], &[T::Number], avg),
        FunctionDescriptor::new("ceil", vec![one(T::Number)], &[T::Number], ceil),
        FunctionDescriptor::new(
            "contains",
            vec![any_of(&[T::Array, T::String]), one(T::Any)],
            &[T::Boolean],
            contains,
        ),
        FunctionDescriptor::new(
            "ends_with",
            vec![one(T::String), one(T::String)],
            &[T::Boolean],
            ends_with,
        ),
        FunctionDescriptor::new("floor", vec![one(T::Number)], &[T::Number], floor),
        FunctionDescriptor::new(
            "join",
            vec![one(T::String), one(T::ArrayString)],
            &[T::String],
            join,
        ),
        FunctionDescriptor::new("keys", vec![one(T::Object)], &[T::Array], keys),
        FunctionDescriptor::new(
            "length",
            vec![any_of(&[T::String, T::Array, T::Object])],
            &[T::Number],
            length,
        ),
        FunctionDescriptor::new("map", vec![one(T::Expref), one(T::Array)], &[T::Array], map),
        FunctionDescriptor::new(
            "max",
            vec![any_of(&[T::ArrayNumber, T::ArrayString])],
            &[T::Number, T::String],
            max,
        ),
        FunctionDescriptor::new(
            "max_by",
            vec![one(T::Array), one(T::Expref)],
            &[T::Any],
            max_by,
        ),
        FunctionDescriptor::new("merge", vec![ArgSpec::variadic(&[T::Object])], &[T::Object], merge),
        FunctionDescriptor::new(
            "min",
            vec![any_of(&[T::ArrayNumber, T::ArrayString])],
            &[T::Number, T::String],
            min,
        ),
        FunctionDescriptor::new(
            "min_by",
            vec![one(T::Array), one(T::Expref)],
            &[T::Any],
            min_by,
        ),
        FunctionDescriptor::new("not_null", vec![ArgSpec::variadic(&[T::Any])], &[T::Any], not_null),
        FunctionDescriptor::new(
            "reverse",
            vec![any_of(&[T::Array, T::String])],
            &[T::Array, T::String],
            reverse,
        ),
        FunctionDescriptor::new(
            "sort",
            vec![any_of(&[T::ArrayNumber, T::ArrayString])],
            &[T::Array],
            sort,
        ),
        FunctionDescriptor::new(
            "sort_by",
            vec![one(T::Array), one(T::Expref)],
            &[T::Array],
            sort_by,
        ),
        FunctionDescriptor::new(
            "starts_with",
            vec![one(T::String), one(T::String)],
            &[T::Boolean],
            starts_with,
        ),
        FunctionDescriptor::new("sum", vec![one(T::ArrayNumber)], &[T::Number], sum),
        FunctionDescriptor::new("to_array", vec![one(T::Any)], &[T::Array], to_array),
        FunctionDescriptor::new("to_number", vec![one(T::Any)], &[T::Number], to_number),
        FunctionDescriptor::new("to_string", vec![one(T::Any)], &[T::String], to_string),
        FunctionDescriptor::new("type", vec![one(T::Any)], &[T::String], type_of),
        FunctionDescriptor::new("values", vec![one(T::Object)], &[T::Array], values),
        FunctionDescriptor::new(
            "items",
            vec![any_of(&[T::Object, T::Array]), one(T::String), one(T::String)],
            &[T::Array],
            items,
        )
        .with_note("converts a map or array to an array of key/value objects"),
        FunctionDescriptor::new(
            "object_from_lists",
            vec![one(T::Array), one(T::Array)],
            &[T::Object],
            object_from_lists,
        )
        .with_note("keys and values are paired by position"),
        FunctionDescriptor::new(
            "lookup",
            vec![any_of(&[T::Object, T::Array]), any_of(&[T::String, T::Number])],
            &[T::Any],
            lookup,
        ),
        FunctionDescriptor::new("to_boolean", vec![one(T::String)], &[T::Boolean], to_boolean),
    ];
    for function in functions {
        builder.register(function);
    }
}

fn abs(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    Ok(Value::Number(number_arg("abs", args, 0)?.abs()))
}

fn avg(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let items = array_arg("avg", args, 0)?;
    if items.is_empty() {
        return Ok(Value::Null);
    }
    let total: f64 = items.iter().filter_map(Value::as_f64).sum();
    Ok(Value::Number(total / items.len() as f64))
}

fn ceil(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    Ok(Value::Number(number_arg("ceil", args, 0)?.ceil()))
}

fn floor(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    Ok(Value::Number(number_arg("floor", args, 0)?.floor()))
}

fn contains(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let found = match (&args[0], &args[1]) {
        (Value::String(subject), Value::String(search)) => subject.contains(search.as_str()),
        (Value::String(_), _) => false,
        (Value::Array(items), search) => items.contains(search),
        _ => false,
    };
    Ok(Value::Boolean(found))
}

fn ends_with(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let subject = string_arg("ends_with", args, 0)?;
    let suffix = string_arg("ends_with", args, 1)?;
    Ok(Value::Boolean(subject.ends_with(suffix)))
}

fn starts_with(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let subject = string_arg("starts_with", args, 0)?;
    let prefix = string_arg("starts_with", args, 1)?;
    Ok(Value::Boolean(subject.starts_with(prefix)))
}

fn join(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let glue = string_arg("join", args, 0)?;
    let parts: Vec<&str> = array_arg("join", args, 1)?
        .iter()
        .filter_map(Value::as_str)
        .collect();
    Ok(Value::String(parts.join(glue)))
}

fn object_arg<'v>(function: &str, args: &'v [Value], index: usize) -> EvalResult<&'v Map> {
    args.get(index).and_then(Value::as_object).ok_or_else(|| {
        EvalError::function(function, format!("argument {} must be an object", index + 1))
    })
}

fn keys(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let object = object_arg("keys", args, 0)?;
    Ok(Value::Array(object.keys().cloned().map(Value::String).collect()))
}

fn values(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let object = object_arg("values", args, 0)?;
    Ok(Value::Array(object.values().cloned().collect()))
}

fn length(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let len = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(object) => object.len(),
        other => {
            return Err(EvalError::function(
                "length",
                format!("cannot take the length of {}", other.type_name()),
            ));
        }
    };
    Ok(Value::from(len))
}

fn map(args: &[Value], ctx: &CallContext<'_>) -> EvalResult<Value> {
    let expref = expref_arg("map", args, 0)?;
    let items = array_arg("map", args, 1)?;
    items
        .iter()
        .map(|item| ctx.apply(expref, item))
        .collect::<EvalResult<Vec<_>>>()
        .map(Value::Array)
}

/// Order two sort keys of the same kind.
fn compare_keys(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Sort keys must be all numbers or all strings.
fn check_keys(function: &str, keys: &[Value]) -> EvalResult<()> {
    let all_numbers = keys.iter().all(|k| matches!(k, Value::Number(_)));
    let all_strings = keys.iter().all(|k| matches!(k, Value::String(_)));
    if all_numbers || all_strings {
        return Ok(());
    }
    let offending = keys
        .iter()
        .find(|k| !matches!(k, Value::Number(_) | Value::String(_)))
        .map(Value::type_name)
        .unwrap_or("mixed number and string");
    Err(EvalError::InvalidArgument {
        function: function.to_string(),
        position: 2,
        expected: "expref->number|expref->string".to_string(),
        actual: offending.to_string(),
    })
}

fn keyed<'v>(
    function: &str,
    args: &'v [Value],
    ctx: &CallContext<'_>,
) -> EvalResult<Vec<(Value, &'v Value)>> {
    let items = array_arg(function, args, 0)?;
    let expref = expref_arg(function, args, 1)?;
    let pairs = items
        .iter()
        .map(|item| Ok((ctx.apply(expref, item)?.materialize(), item)))
        .collect::<EvalResult<Vec<_>>>()?;
    let keys: Vec<Value> = pairs.iter().map(|(k, _)| k.clone()).collect();
    check_keys(function, &keys)?;
    Ok(pairs)
}

fn extreme(items: &[Value], wanted: Ordering) -> Value {
    items
        .iter()
        .fold(None::<&Value>, |best, item| match best {
            Some(current) if compare_keys(item, current) != wanted => Some(current),
            _ => Some(item),
        })
        .cloned()
        .unwrap_or(Value::Null)
}

fn max(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    Ok(extreme(array_arg("max", args, 0)?, Ordering::Greater))
}

fn min(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    Ok(extreme(array_arg("min", args, 0)?, Ordering::Less))
}

fn extreme_by(function: &str, args: &[Value], ctx: &CallContext<'_>, wanted: Ordering) -> EvalResult<Value> {
    let pairs = keyed(function, args, ctx)?;
    let best = pairs.iter().fold(None::<&(Value, &Value)>, |best, pair| match best {
        Some(current) if compare_keys(&pair.0, &current.0) != wanted => Some(current),
        _ => Some(pair),
    });
    Ok(best.map(|(_, item)| Value::clone(item)).unwrap_or(Value::Null))
}

fn max_by(args: &[Value], ctx: &CallContext<'_>) -> EvalResult<Value> {
    extreme_by("max_by", args, ctx, Ordering::Greater)
}

fn min_by(args: &[Value], ctx: &CallContext<'_>) -> EvalResult<Value> {
    extreme_by("min_by", args, ctx, Ordering::Less)
}

fn merge(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let mut merged = Map::new();
    for arg in args {
        if let Value::Object(object) = arg {
            merged.extend(object.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }
    Ok(Value::Object(merged))
}

fn not_null(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    Ok(args
        .iter()
        .find(|arg| !arg.is_null())
        .cloned()
        .unwrap_or(Value::Null))
}

fn reverse(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    match &args[0] {
        Value::String(s) => Ok(Value::String(s.chars().rev().collect())),
        Value::Array(items) => Ok(Value::Array(items.iter().rev().cloned().collect())),
        other => Err(EvalError::function(
            "reverse",
            format!("cannot reverse {}", other.type_name()),
        )),
    }
}

fn sort(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let mut items = array_arg("sort", args, 0)?.to_vec();
    items.sort_by(compare_keys);
    Ok(Value::Array(items))
}

fn sort_by(args: &[Value], ctx: &CallContext<'_>) -> EvalResult<Value> {
    let mut pairs = keyed("sort_by", args, ctx)?;
    pairs.sort_by(|a, b| compare_keys(&a.0, &b.0));
    Ok(Value::Array(
        pairs.into_iter().map(|(_, item)| item.clone()).collect(),
    ))
}

fn sum(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let total: f64 = array_arg("sum", args, 0)?
        .iter()
        .filter_map(Value::as_f64)
        .sum();
    Ok(Value::Number(total))
}

fn to_array(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    match &args[0] {
        Value::Array(_) => Ok(args[0].clone()),
        other => Ok(Value::Array(vec![other.clone()])),
    }
}

fn to_number(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    Ok(match &args[0] {
        Value::Number(n) => Value::Number(*n),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Number)
            .unwrap_or(Value::Null),
        _ => Value::Null,
    })
}

fn to_string(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    Ok(match &args[0] {
        Value::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_json()),
    })
}

fn type_of(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    Ok(Value::from(args[0].type_name()))
}

fn items(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let key_name = string_arg("items", args, 1)?;
    let value_name = string_arg("items", args, 2)?;
    let entry = |key: Value, value: Value| {
        let mut object = Map::new();
        object.insert(key_name.to_string(), key);
        object.insert(value_name.to_string(), value);
        Value::Object(object)
    };
    let entries = match &args[0] {
        Value::Object(object) => object
            .iter()
            .map(|(k, v)| entry(Value::from(k.as_str()), v.clone()))
            .collect(),
        Value::Array(array) => array
            .iter()
            .enumerate()
            .map(|(i, v)| entry(Value::from(i), v.clone()))
            .collect(),
        _ => Vec::new(),
    };
    Ok(Value::Array(entries))
}

fn object_from_lists(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let keys = array_arg("object_from_lists", args, 0)?;
    let values = array_arg("object_from_lists", args, 1)?;
    let mut object = Map::new();
    for (i, key) in keys.iter().enumerate() {
        let Value::String(key) = key else {
            return Err(EvalError::InvalidArgument {
                function: "object_from_lists".to_string(),
                position: 1,
                expected: "array[string]".to_string(),
                actual: format!("array containing {}", key.type_name()),
            });
        };
        object.insert(key.clone(), values.get(i).cloned().unwrap_or(Value::Null));
    }
    Ok(Value::Object(object))
}

fn lookup(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    match (&args[0], &args[1]) {
        (Value::Object(object), Value::String(key)) => {
            Ok(object.get(key).cloned().unwrap_or(Value::Null))
        }
        (Value::Array(items), Value::Number(index)) if index.fract() == 0.0 => Ok(usize::try_from(*index as i64)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Null)),
        (collection, key) => Err(EvalError::function(
            "lookup",
            format!(
                "cannot look up a {} key in an {}",
                key.type_name(),
                collection.type_name()
            ),
        )),
    }
}

fn to_boolean(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let text = string_arg("to_boolean", args, 0)?;
    match text.to_ascii_lowercase().as_str() {
        "true" => Ok(Value::Boolean(true)),
        "false" => Ok(Value::Boolean(false)),
        _ => Err(EvalError::function(
            "to_boolean",
            format!("cannot convert \"{}\" to a boolean", text),
        )),
    }
}
