//! String and regex helpers.

use regex::{NoExpand, Regex};

use super::{
    CallContext, DataType as T, FunctionDescriptor, RegistryBuilder, number_arg,
    sig::{any_of, one},
    string_arg,
};
use crate::{
    error::{EvalError, EvalResult},
    value::{Value, format_number},
};

pub(super) fn register(builder: &mut RegistryBuilder) {
    let functions = [
        FunctionDescriptor::new(
            "compare",
            vec![one(T::String), one(T::String)],
            &[T::Number],
            compare,
        )
        .with_note("-1, 0 or 1 by lexical order"),
        FunctionDescriptor::new(
            "equal_fold",
            vec![one(T::String), one(T::String)],
            &[T::Boolean],
            equal_fold,
        )
        .with_note("case-insensitive equality"),
        FunctionDescriptor::new(
            "replace",
            vec![one(T::String), one(T::String), one(T::String), one(T::Number)],
            &[T::String],
            replace,
        )
        .with_note("replaces at most n occurrences, all when n is negative"),
        FunctionDescriptor::new(
            "replace_all",
            vec![one(T::String), one(T::String), one(T::String)],
            &[T::String],
            replace_all,
        ),
        FunctionDescriptor::new("to_upper", vec![one(T::String)], &[T::String], to_upper),
        FunctionDescriptor::new("to_lower", vec![one(T::String)], &[T::String], to_lower),
        FunctionDescriptor::new(
            "trim",
            vec![one(T::String), one(T::String)],
            &[T::String],
            trim,
        )
        .with_note("strips every character of the cutset from both ends"),
        FunctionDescriptor::new(
            "split",
            vec![one(T::String), one(T::String)],
            &[T::ArrayString],
            split,
        ),
        FunctionDescriptor::new(
            "equals",
            vec![one(T::Any), one(T::Any)],
            &[T::Boolean],
            equals,
        ),
        FunctionDescriptor::new(
            "truncate",
            vec![one(T::String), one(T::Number)],
            &[T::String],
            truncate,
        )
        .with_note("keeps at most the given number of characters"),
        FunctionDescriptor::new(
            "regex_replace_all",
            vec![
                one(T::String),
                any_of(&[T::String, T::Number]),
                any_of(&[T::String, T::Number]),
            ],
            &[T::String],
            regex_replace_all,
        )
        .with_note("$1 and ${name} in the replacement expand to capture groups"),
        FunctionDescriptor::new(
            "regex_replace_all_literal",
            vec![
                one(T::String),
                any_of(&[T::String, T::Number]),
                any_of(&[T::String, T::Number]),
            ],
            &[T::String],
            regex_replace_all_literal,
        ),
        FunctionDescriptor::new(
            "regex_match",
            vec![one(T::String), any_of(&[T::String, T::Number])],
            &[T::Boolean],
            regex_match,
        )
        .with_note("unanchored; use ^ and $ to match the whole input"),
    ];
    for function in functions {
        builder.register(function);
    }
}

fn compare(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let a = string_arg("compare", args, 0)?;
    let b = string_arg("compare", args, 1)?;
    Ok(Value::from(a.cmp(b) as i64))
}

fn equal_fold(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let a = string_arg("equal_fold", args, 0)?;
    let b = string_arg("equal_fold", args, 1)?;
    Ok(Value::Boolean(a.to_lowercase() == b.to_lowercase()))
}

fn replace(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let subject = string_arg("replace", args, 0)?;
    let old = string_arg("replace", args, 1)?;
    let new = string_arg("replace", args, 2)?;
    let count = number_arg("replace", args, 3)?;
    let replaced = if count < 0.0 {
        subject.replace(old, new)
    } else {
        subject.replacen(old, new, count as usize)
    };
    Ok(Value::String(replaced))
}

fn replace_all(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let subject = string_arg("replace_all", args, 0)?;
    let old = string_arg("replace_all", args, 1)?;
    let new = string_arg("replace_all", args, 2)?;
    Ok(Value::String(subject.replace(old, new)))
}

fn to_upper(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    Ok(Value::String(string_arg("to_upper", args, 0)?.to_uppercase()))
}

fn to_lower(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    Ok(Value::String(string_arg("to_lower", args, 0)?.to_lowercase()))
}

fn trim(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let subject = string_arg("trim", args, 0)?;
    let cutset = string_arg("trim", args, 1)?;
    Ok(Value::from(subject.trim_matches(|c| cutset.contains(c))))
}

fn split(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let subject = string_arg("split", args, 0)?;
    let separator = string_arg("split", args, 1)?;
    let parts: Vec<Value> = if separator.is_empty() {
        subject.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        subject.split(separator).map(Value::from).collect()
    };
    Ok(Value::Array(parts))
}

fn equals(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    Ok(Value::Boolean(args[0] == args[1]))
}

fn truncate(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let subject = string_arg("truncate", args, 0)?;
    let length = number_arg("truncate", args, 1)?.max(0.0) as usize;
    Ok(Value::String(subject.chars().take(length).collect()))
}

/// Strings as-is, numbers in their plain decimal form.
fn text_arg(function: &str, args: &[Value], index: usize) -> EvalResult<String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(format_number(*n)),
        _ => Err(EvalError::function(
            function,
            format!("argument {} must be a string or a number", index + 1),
        )),
    }
}

fn compile(function: &str, pattern: &str) -> EvalResult<Regex> {
    Regex::new(pattern).map_err(|e| EvalError::function(function, e.to_string()))
}

fn regex_replace_all(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let regex = compile("regex_replace_all", string_arg("regex_replace_all", args, 0)?)?;
    let source = text_arg("regex_replace_all", args, 1)?;
    let replacement = text_arg("regex_replace_all", args, 2)?;
    Ok(Value::String(
        regex.replace_all(&source, replacement.as_str()).into_owned(),
    ))
}

fn regex_replace_all_literal(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let function = "regex_replace_all_literal";
    let regex = compile(function, string_arg(function, args, 0)?)?;
    let source = text_arg(function, args, 1)?;
    let replacement = text_arg(function, args, 2)?;
    Ok(Value::String(
        regex
            .replace_all(&source, NoExpand(&replacement))
            .into_owned(),
    ))
}

fn regex_match(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let regex = compile("regex_match", string_arg("regex_match", args, 0)?)?;
    let source = text_arg("regex_match", args, 1)?;
    Ok(Value::Boolean(regex.is_match(&source)))
}
