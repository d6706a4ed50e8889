use base64::{Engine, engine::general_purpose::STANDARD};

use super::{CallContext, DataType as T, FunctionDescriptor, RegistryBuilder, sig::one, string_arg};
use crate::{
    error::{EvalError, EvalResult},
    value::Value,
};

pub(super) fn register(builder: &mut RegistryBuilder) {
    builder.register(FunctionDescriptor::new(
        "base64_encode",
        vec![one(T::String)],
        &[T::String],
        base64_encode,
    ));
    builder.register(FunctionDescriptor::new(
        "base64_decode",
        vec![one(T::String)],
        &[T::String],
        base64_decode,
    ));
    builder.register(
        FunctionDescriptor::new("parse_json", vec![one(T::String)], &[T::Any], parse_json)
            .with_note("decodes a JSON document held in a string"),
    );
}

fn base64_encode(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let text = string_arg("base64_encode", args, 0)?;
    Ok(Value::String(STANDARD.encode(text)))
}

fn base64_decode(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let text = string_arg("base64_decode", args, 0)?;
    let bytes = STANDARD
        .decode(text)
        .map_err(|e| EvalError::function("base64_decode", e.to_string()))?;
    String::from_utf8(bytes)
        .map(Value::String)
        .map_err(|_| EvalError::function("base64_decode", "decoded data is not valid UTF-8"))
}

fn parse_json(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let text = string_arg("parse_json", args, 0)?;
    serde_json::from_str::<serde_json::Value>(text)
        .map(Value::from)
        .map_err(|e| EvalError::function("parse_json", e.to_string()))
}
