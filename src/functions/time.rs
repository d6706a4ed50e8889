//! Timestamp helpers.
//!
//! Timestamps are exchanged as RFC 3339 strings. Functions that take a
//! `layout` read the timestamp with that strftime pattern instead; an empty
//! layout means RFC 3339. Durations use the `1h30m0s` notation.

use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat,
    TimeZone, Timelike, Utc,
};

use super::{
    CallContext, DataType as T, FunctionDescriptor, RegistryBuilder,
    sig::{any_of, one},
    string_arg,
};
use crate::{
    duration::{Duration, DurationError},
    error::{EvalError, EvalResult},
    value::Value,
};

pub(super) fn register(builder: &mut RegistryBuilder) {
    let functions = [
        FunctionDescriptor::new(
            "time_since",
            vec![one(T::String), one(T::String), one(T::String)],
            &[T::String],
            time_since,
        )
        .with_note("duration from the second to the third timestamp, now when the third is empty"),
        FunctionDescriptor::new("time_now", vec![], &[T::String], time_now)
            .with_note("current local time"),
        FunctionDescriptor::new("time_now_utc", vec![], &[T::String], time_now_utc),
        FunctionDescriptor::new(
            "time_add",
            vec![one(T::String), one(T::String)],
            &[T::String],
            time_add,
        ),
        FunctionDescriptor::new(
            "time_parse",
            vec![one(T::String), any_of(&[T::String, T::Number])],
            &[T::String],
            time_parse,
        )
        .with_note("an integer timestamp is read as seconds since the epoch"),
        FunctionDescriptor::new("time_to_cron", vec![one(T::String)], &[T::String], time_to_cron)
            .with_note("minute hour day-of-month month day-of-week, in UTC"),
        FunctionDescriptor::new("time_utc", vec![one(T::String)], &[T::String], time_utc),
        FunctionDescriptor::new(
            "time_diff",
            vec![one(T::String), one(T::String)],
            &[T::String],
            time_diff,
        ),
        FunctionDescriptor::new(
            "time_before",
            vec![one(T::String), one(T::String)],
            &[T::Boolean],
            time_before,
        ),
        FunctionDescriptor::new(
            "time_after",
            vec![one(T::String), one(T::String)],
            &[T::Boolean],
            time_after,
        ),
        FunctionDescriptor::new(
            "time_between",
            vec![one(T::String), one(T::String), one(T::String)],
            &[T::Boolean],
            time_between,
        )
        .with_note("exclusive of both bounds"),
    ];
    for function in functions {
        builder.register(function);
    }
}

fn format(time: &DateTime<FixedOffset>) -> Value {
    Value::String(time.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn format_utc(time: &DateTime<Utc>) -> Value {
    Value::String(time.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Read `text` with a strftime `layout`. Layouts without an offset are taken
/// as UTC, date-only layouts as midnight.
fn parse_time(function: &str, layout: &str, text: &str) -> EvalResult<DateTime<FixedOffset>> {
    let failed = || EvalError::function(function, format!("cannot parse timestamp \"{}\"", text));
    if layout.is_empty() {
        return DateTime::parse_from_rfc3339(text).map_err(|_| failed());
    }
    if let Ok(time) = DateTime::parse_from_str(text, layout) {
        return Ok(time);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
        return Ok(Utc.from_utc_datetime(&naive).fixed_offset());
    }
    let date = NaiveDate::parse_from_str(text, layout).map_err(|_| failed())?;
    Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::default())).fixed_offset())
}

fn rfc3339_arg(function: &str, args: &[Value], index: usize) -> EvalResult<DateTime<FixedOffset>> {
    parse_time(function, "", string_arg(function, args, index)?)
}

fn duration_between(
    function: &str,
    from: DateTime<FixedOffset>,
    to: DateTime<FixedOffset>,
) -> EvalResult<Value> {
    let delta = to.signed_duration_since(from);
    if delta.num_nanoseconds().is_none() {
        return Err(EvalError::function(function, "duration out of range"));
    }
    Ok(Value::String(Duration::from(delta).to_string()))
}

fn time_since(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let function = "time_since";
    let layout = string_arg(function, args, 0)?;
    let start = parse_time(function, layout, string_arg(function, args, 1)?)?;
    let end = match string_arg(function, args, 2)? {
        "" => Utc::now().fixed_offset(),
        text => parse_time(function, layout, text)?,
    };
    duration_between(function, start, end)
}

fn time_now(_: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    Ok(format(&Local::now().fixed_offset()))
}

fn time_now_utc(_: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    Ok(format_utc(&Utc::now()))
}

fn time_add(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let function = "time_add";
    let start = rfc3339_arg(function, args, 0)?;
    let duration: Duration = string_arg(function, args, 1)?
        .parse()
        .map_err(|e: DurationError| EvalError::function(function, e.to_string()))?;
    start
        .checked_add_signed(duration.into())
        .map(|time| format(&time))
        .ok_or_else(|| EvalError::function(function, "timestamp out of range"))
}

fn time_parse(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let function = "time_parse";
    let layout = string_arg(function, args, 0)?;
    let time = match &args[1] {
        Value::Number(seconds) if seconds.fract() == 0.0 => {
            DateTime::from_timestamp(*seconds as i64, 0)
                .ok_or_else(|| EvalError::function(function, "timestamp out of range"))?
        }
        Value::String(text) => match text.parse::<i64>() {
            Ok(seconds) => DateTime::from_timestamp(seconds, 0)
                .ok_or_else(|| EvalError::function(function, "timestamp out of range"))?,
            Err(_) => parse_time(function, layout, text)?.with_timezone(&Utc),
        },
        other => {
            return Err(EvalError::function(
                function,
                format!("cannot parse timestamp from {}", other.type_name()),
            ));
        }
    };
    Ok(format_utc(&time))
}

fn time_to_cron(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let time = rfc3339_arg("time_to_cron", args, 0)?.with_timezone(&Utc);
    Ok(Value::String(format!(
        "{} {} {} {} {}",
        time.minute(),
        time.hour(),
        time.day(),
        time.month(),
        time.weekday().num_days_from_sunday()
    )))
}

fn time_utc(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let time = rfc3339_arg("time_utc", args, 0)?;
    Ok(format_utc(&time.with_timezone(&Utc)))
}

fn time_diff(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let start = rfc3339_arg("time_diff", args, 0)?;
    let end = rfc3339_arg("time_diff", args, 1)?;
    duration_between("time_diff", start, end)
}

fn time_before(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let a = rfc3339_arg("time_before", args, 0)?;
    let b = rfc3339_arg("time_before", args, 1)?;
    Ok(Value::Boolean(a < b))
}

fn time_after(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let a = rfc3339_arg("time_after", args, 0)?;
    let b = rfc3339_arg("time_after", args, 1)?;
    Ok(Value::Boolean(a > b))
}

fn time_between(args: &[Value], _: &CallContext<'_>) -> EvalResult<Value> {
    let time = rfc3339_arg("time_between", args, 0)?;
    let start = rfc3339_arg("time_between", args, 1)?;
    let end = rfc3339_arg("time_between", args, 2)?;
    Ok(Value::Boolean(start < time && time < end))
}
