//! Unit-aware arithmetic functions, thin wrappers over [`crate::arithmetic`].

use super::{CallContext, DataType as T, FunctionDescriptor, RegistryBuilder, array_arg, sig::one};
use crate::{arithmetic, error::EvalResult, value::Value};

/// Numbers, quantity strings or duration strings.
const OPERAND: [T; 2] = [T::Number, T::String];

pub(super) fn register(builder: &mut RegistryBuilder) {
    let binary = [
        ("add", arithmetic::add as fn(&Value, &Value) -> EvalResult<Value>),
        ("subtract", arithmetic::subtract),
        ("multiply", arithmetic::multiply),
        ("divide", arithmetic::divide),
        ("modulo", arithmetic::modulo),
    ];
    for (name, op) in binary {
        builder.register(FunctionDescriptor::new(
            name,
            vec![one(T::Any), one(T::Any)],
            &OPERAND,
            move |args: &[Value], _: &CallContext<'_>| op(&args[0], &args[1]),
        ));
    }

    builder.register(
        FunctionDescriptor::new("sum", vec![one(T::Array)], &OPERAND, sum)
            .with_note("numbers, quantities or durations of one kind"),
    );
    builder.register(
        FunctionDescriptor::new("round", vec![one(T::Any), one(T::Any)], &[T::Number], round)
            .with_note("halves round away from zero"),
    );
}

fn sum(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    arithmetic::sum(array_arg("sum", args, 0)?)
}

fn round(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    arithmetic::round(&args[0], &args[1])
}
