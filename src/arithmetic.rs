//! Unit-aware arithmetic over numbers, quantities and durations.
//!
//! Each operand is classified on its own: a JSON number is a scalar, a
//! string that reads as a quantity (`"12Ki"`) is a quantity, a string that
//! reads as a duration (`"12s"`) is a duration. The operator then decides
//! from the pair of kinds what the result is:
//!
//! | Operator        | Legal pairs                                   |
//! |-----------------|-----------------------------------------------|
//! | add, subtract   | Q±Q→Q, D±D→D, S±S→S                           |
//! | multiply        | Q×S→Q, D×S→D (either order), S×S→S            |
//! | divide          | Q÷Q→S, Q÷S→Q, D÷D→S, D÷S→D, S÷S→S             |
//! | modulo          | Q%Q→Q, D%D→D, S%S→S, integral operands only   |

use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};

use crate::{
    ast::ArithmeticOp,
    duration::Duration,
    error::{EvalError, EvalResult},
    quantity::Quantity,
    value::Value,
};

/// A classified arithmetic operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Scalar(f64),
    Quantity(Quantity),
    Duration(Duration),
}

impl Operand {
    /// Classify a value for `operation`. Values that are neither numbers nor
    /// quantity or duration strings are `InvalidOperands`.
    pub fn classify(value: &Value, operation: &str) -> EvalResult<Operand> {
        match value.resolve().as_ref() {
            Value::Number(n) => Ok(Operand::Scalar(*n)),
            Value::String(s) => {
                if let Ok(q) = s.parse::<Quantity>() {
                    Ok(Operand::Quantity(q))
                } else if let Ok(d) = s.parse::<Duration>() {
                    Ok(Operand::Duration(d))
                } else {
                    Err(invalid_operands(operation))
                }
            }
            _ => Err(invalid_operands(operation)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Operand::Scalar(_) => "number",
            Operand::Quantity(_) => "quantity",
            Operand::Duration(_) => "duration",
        }
    }

    fn is_integral(&self) -> bool {
        match self {
            Operand::Scalar(n) => n.fract() == 0.0,
            Operand::Quantity(q) => q.is_integral(),
            Operand::Duration(_) => true,
        }
    }

    fn is_zero(&self) -> bool {
        match self {
            Operand::Scalar(n) => *n == 0.0,
            Operand::Quantity(q) => q.is_zero(),
            Operand::Duration(d) => d.is_zero(),
        }
    }
}

impl From<Operand> for Value {
    fn from(operand: Operand) -> Self {
        match operand {
            Operand::Scalar(n) => Value::Number(n),
            Operand::Quantity(q) => Value::String(q.to_string()),
            Operand::Duration(d) => Value::String(d.to_string()),
        }
    }
}

fn invalid_operands(operation: &str) -> EvalError {
    EvalError::InvalidOperands {
        operation: operation.to_string(),
    }
}

fn mismatch(operation: &str, lhs: &Operand, rhs: &Operand) -> EvalError {
    EvalError::type_mismatch(operation, format!("{} and {}", lhs.kind(), rhs.kind()))
}

fn zero_division(operation: &str) -> EvalError {
    EvalError::ZeroDivision {
        operation: operation.to_string(),
    }
}

fn out_of_range(operation: &str) -> EvalError {
    EvalError::function(operation, "result out of range")
}

fn to_decimal(operation: &str, n: f64) -> EvalResult<Decimal> {
    Decimal::from_f64(n).ok_or_else(|| out_of_range(operation))
}

fn from_decimal(operation: &str, d: Decimal) -> EvalResult<f64> {
    d.to_f64().ok_or_else(|| out_of_range(operation))
}

/// Apply an arithmetic node operator. Integer division only accepts numbers.
pub fn apply(op: ArithmeticOp, lhs: &Value, rhs: &Value) -> EvalResult<Value> {
    match op {
        ArithmeticOp::Add => add(lhs, rhs),
        ArithmeticOp::Subtract => subtract(lhs, rhs),
        ArithmeticOp::Multiply => multiply(lhs, rhs),
        ArithmeticOp::Divide => divide(lhs, rhs),
        ArithmeticOp::Modulo => modulo(lhs, rhs),
        ArithmeticOp::IntegerDivide => integer_divide(lhs, rhs),
    }
}

pub fn add(lhs: &Value, rhs: &Value) -> EvalResult<Value> {
    let (a, b) = classify_pair("add", lhs, rhs)?;
    add_operands("add", a, b).map(Value::from)
}

pub fn subtract(lhs: &Value, rhs: &Value) -> EvalResult<Value> {
    let op = "subtract";
    let (a, b) = classify_pair(op, lhs, rhs)?;
    let result = match (a, b) {
        (Operand::Scalar(x), Operand::Scalar(y)) => Operand::Scalar(x - y),
        (Operand::Quantity(x), Operand::Quantity(y)) => Operand::Quantity(
            x.with_value(
                x.value()
                    .checked_sub(y.value())
                    .ok_or_else(|| out_of_range(op))?,
            ),
        ),
        (Operand::Duration(x), Operand::Duration(y)) => {
            Operand::Duration(x.checked_sub(y).ok_or_else(|| out_of_range(op))?)
        }
        (a, b) => return Err(mismatch(op, &a, &b)),
    };
    Ok(result.into())
}

pub fn multiply(lhs: &Value, rhs: &Value) -> EvalResult<Value> {
    let op = "multiply";
    let (a, b) = classify_pair(op, lhs, rhs)?;
    let result = match (a, b) {
        (Operand::Scalar(x), Operand::Scalar(y)) => Operand::Scalar(x * y),
        (Operand::Quantity(q), Operand::Scalar(s)) | (Operand::Scalar(s), Operand::Quantity(q)) => {
            let product = q
                .value()
                .checked_mul(to_decimal(op, s)?)
                .ok_or_else(|| out_of_range(op))?;
            Operand::Quantity(q.with_value(product))
        }
        (Operand::Duration(d), Operand::Scalar(s)) | (Operand::Scalar(s), Operand::Duration(d)) => {
            Operand::Duration(d.mul_f64(s).ok_or_else(|| out_of_range(op))?)
        }
        (a, b) => return Err(mismatch(op, &a, &b)),
    };
    Ok(result.into())
}

pub fn divide(lhs: &Value, rhs: &Value) -> EvalResult<Value> {
    let op = "divide";
    let (a, b) = classify_pair(op, lhs, rhs)?;
    let compatible = matches!(
        (a, b),
        (Operand::Scalar(_), Operand::Scalar(_))
            | (Operand::Quantity(_), Operand::Quantity(_) | Operand::Scalar(_))
            | (Operand::Duration(_), Operand::Duration(_) | Operand::Scalar(_))
    );
    if !compatible {
        return Err(mismatch(op, &a, &b));
    }
    if b.is_zero() {
        return Err(zero_division(op));
    }

    let result = match (a, b) {
        (Operand::Scalar(x), Operand::Scalar(y)) => Operand::Scalar(x / y),
        (Operand::Quantity(x), Operand::Quantity(y)) => {
            let ratio = x
                .value()
                .checked_div(y.value())
                .ok_or_else(|| out_of_range(op))?;
            Operand::Scalar(from_decimal(op, ratio)?)
        }
        (Operand::Quantity(q), Operand::Scalar(s)) => {
            let quotient = q
                .value()
                .checked_div(to_decimal(op, s)?)
                .ok_or_else(|| out_of_range(op))?;
            Operand::Quantity(q.with_value(quotient))
        }
        (Operand::Duration(x), Operand::Duration(y)) => {
            Operand::Scalar(x.as_nanos() as f64 / y.as_nanos() as f64)
        }
        (Operand::Duration(d), Operand::Scalar(s)) => {
            Operand::Duration(d.div_f64(s).ok_or_else(|| out_of_range(op))?)
        }
        (a, b) => return Err(mismatch(op, &a, &b)),
    };
    Ok(result.into())
}

pub fn modulo(lhs: &Value, rhs: &Value) -> EvalResult<Value> {
    let op = "modulo";
    let (a, b) = classify_pair(op, lhs, rhs)?;
    if !a.is_integral() || !b.is_integral() {
        return Err(EvalError::NonIntegerModulo);
    }
    let compatible = matches!(
        (a, b),
        (Operand::Scalar(_), Operand::Scalar(_))
            | (Operand::Quantity(_), Operand::Quantity(_))
            | (Operand::Duration(_), Operand::Duration(_))
    );
    if !compatible {
        return Err(mismatch(op, &a, &b));
    }
    if b.is_zero() {
        return Err(zero_division(op));
    }

    let result = match (a, b) {
        (Operand::Scalar(x), Operand::Scalar(y)) => Operand::Scalar(x % y),
        (Operand::Quantity(x), Operand::Quantity(y)) => Operand::Quantity(
            x.with_value(
                x.value()
                    .checked_rem(y.value())
                    .ok_or_else(|| out_of_range(op))?,
            ),
        ),
        (Operand::Duration(x), Operand::Duration(y)) => {
            let rem = x
                .as_nanos()
                .checked_rem(y.as_nanos())
                .ok_or_else(|| out_of_range(op))?;
            Operand::Duration(Duration::from_nanos(rem))
        }
        (a, b) => return Err(mismatch(op, &a, &b)),
    };
    Ok(result.into())
}

/// `//` on two numbers: floor of the quotient.
pub fn integer_divide(lhs: &Value, rhs: &Value) -> EvalResult<Value> {
    let op = "integer divide";
    match (lhs.resolve().as_ref(), rhs.resolve().as_ref()) {
        (Value::Number(_), Value::Number(y)) if *y == 0.0 => Err(zero_division(op)),
        (Value::Number(x), Value::Number(y)) => Ok(Value::Number((x / y).floor())),
        (l, r) => Err(EvalError::type_mismatch(
            op,
            format!("{} and {}", l.type_name(), r.type_name()),
        )),
    }
}

/// Sum every element with `add`. The element kinds must agree.
pub fn sum(values: &[Value]) -> EvalResult<Value> {
    let op = "sum";
    let mut operands = values.iter().map(|v| Operand::classify(v, op));
    let first = operands
        .next()
        .ok_or_else(|| EvalError::function(op, "at least one element in the array is required"))??;
    operands
        .try_fold(first, |acc, next| add_operands(op, acc, next?))
        .map(Value::from)
}

/// Round a number to `digits` decimal places, halves away from zero.
pub fn round(value: &Value, digits: &Value) -> EvalResult<Value> {
    let op = "round";
    let digits = match digits.resolve().as_ref() {
        Value::Number(n) => *n,
        other => {
            return Err(EvalError::type_mismatch(
                op,
                format!("digits must be a number, got {}", other.type_name()),
            ));
        }
    };
    if digits.fract() != 0.0 || digits < 0.0 {
        return Err(EvalError::NonIntegerRound);
    }
    let value = match value.resolve().as_ref() {
        Value::Number(n) => *n,
        other => {
            return Err(EvalError::type_mismatch(
                op,
                format!("value must be a number, got {}", other.type_name()),
            ));
        }
    };

    let factor = 10f64.powi(digits.min(i32::MAX as f64) as i32);
    let scaled = value * factor;
    if !scaled.is_finite() || !factor.is_finite() {
        return Ok(Value::Number(value));
    }
    Ok(Value::Number(scaled.round() / factor))
}

/// Unary minus. Quantity and duration strings keep their kind.
pub fn negate(value: &Value) -> EvalResult<Value> {
    let op = "negate";
    let operand = Operand::classify(value, op)
        .map_err(|_| EvalError::type_mismatch(op, value.type_name()))?;
    let negated = match operand {
        Operand::Scalar(n) => Operand::Scalar(-n),
        Operand::Quantity(q) => Operand::Quantity(q.with_value(-q.value())),
        Operand::Duration(d) => Operand::Duration(d.checked_neg().ok_or_else(|| out_of_range(op))?),
    };
    Ok(negated.into())
}

fn classify_pair(operation: &str, lhs: &Value, rhs: &Value) -> EvalResult<(Operand, Operand)> {
    Ok((
        Operand::classify(lhs, operation)?,
        Operand::classify(rhs, operation)?,
    ))
}

fn add_operands(op: &str, a: Operand, b: Operand) -> EvalResult<Operand> {
    match (a, b) {
        (Operand::Scalar(x), Operand::Scalar(y)) => Ok(Operand::Scalar(x + y)),
        (Operand::Quantity(x), Operand::Quantity(y)) => Ok(Operand::Quantity(
            x.with_value(
                x.value()
                    .checked_add(y.value())
                    .ok_or_else(|| out_of_range(op))?,
            ),
        )),
        (Operand::Duration(x), Operand::Duration(y)) => Ok(Operand::Duration(
            x.checked_add(y).ok_or_else(|| out_of_range(op))?,
        )),
        (a, b) => Err(mismatch(op, &a, &b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_prefers_quantity_over_duration() {
        assert!(matches!(
            Operand::classify(&Value::from("1m"), "add"),
            Ok(Operand::Quantity(_))
        ));
        assert!(matches!(
            Operand::classify(&Value::from("1ms"), "add"),
            Ok(Operand::Duration(_))
        ));
        assert!(matches!(
            Operand::classify(&Value::from(true), "add"),
            Err(EvalError::InvalidOperands { .. })
        ));
    }

    #[test]
    fn negate_keeps_kind() {
        assert_eq!(negate(&Value::from("2Ki")).unwrap(), Value::from("-2Ki"));
        assert_eq!(negate(&Value::from("90s")).unwrap(), Value::from("-1m30s"));
        assert_eq!(negate(&Value::from(3)).unwrap(), Value::from(-3));
        assert!(negate(&Value::Null).is_err());
    }

    #[test]
    fn integer_divide_floors() {
        assert_eq!(integer_divide(&Value::from(7), &Value::from(2)).unwrap(), Value::from(3));
        assert_eq!(integer_divide(&Value::from(-7), &Value::from(2)).unwrap(), Value::from(-4));
        assert!(matches!(
            integer_divide(&Value::from(1), &Value::from(0)),
            Err(EvalError::ZeroDivision { .. })
        ));
    }
}
