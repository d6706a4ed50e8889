//! Function registry and built-in functions.
//!
//! A [`Registry`] maps names to [`FunctionDescriptor`]s. It is assembled once
//! through a [`RegistryBuilder`], driven by [`Config`], and is read-only from
//! then on, so one registry can serve any number of concurrent evaluations.
//!
//! ```
//! use jp_policy::{Config, Interpreter, Value};
//! use jp_policy::functions::{ArgSpec, DataType, FunctionDescriptor, Registry};
//!
//! let double = FunctionDescriptor::new(
//!     "double",
//!     vec![ArgSpec::new(&[DataType::Number])],
//!     &[DataType::Number],
//!     |args, _| Ok(Value::Number(args[0].as_f64().unwrap_or_default() * 2.0)),
//! );
//! let registry = Registry::builder(&Config::default()).with_function(double).build();
//! let interpreter = Interpreter::with_registry(registry.into());
//!
//! let result = interpreter.search("double(`21`)", &Value::Null).unwrap();
//! assert_eq!(result, Value::from(42));
//! ```

mod encoding;
mod math;
mod standard;
mod string;
mod time;

use std::{borrow::Cow, collections::BTreeMap, fmt, sync::Arc};

use tracing::{debug, trace};

use crate::{
    config::Config,
    error::{EvalError, EvalResult},
    evaluator::Evaluator,
    value::{ExprRef, Value},
};

/// Kind tags used in function signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Any,
    Number,
    String,
    Boolean,
    Array,
    Object,
    Null,
    Expref,
    ArrayNumber,
    ArrayString,
}

impl DataType {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            DataType::Any => true,
            DataType::Number => matches!(value, Value::Number(_)),
            DataType::String => matches!(value, Value::String(_)),
            DataType::Boolean => matches!(value, Value::Boolean(_)),
            DataType::Array => matches!(value, Value::Array(_)),
            DataType::Object => matches!(value, Value::Object(_)),
            DataType::Null => matches!(value, Value::Null),
            DataType::Expref => matches!(value, Value::Expref(_)),
            DataType::ArrayNumber => match value {
                Value::Array(items) => items.iter().all(|v| matches!(v, Value::Number(_))),
                _ => false,
            },
            DataType::ArrayString => match value {
                Value::Array(items) => items.iter().all(|v| matches!(v, Value::String(_))),
                _ => false,
            },
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Any => "any",
            DataType::Number => "number",
            DataType::String => "string",
            DataType::Boolean => "boolean",
            DataType::Array => "array",
            DataType::Object => "object",
            DataType::Null => "null",
            DataType::Expref => "expref",
            DataType::ArrayNumber => "array[number]",
            DataType::ArrayString => "array[string]",
        };
        f.write_str(name)
    }
}

fn join_types(types: &[DataType]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("|")
}

/// Accepted kinds for one parameter. A variadic spec must come last and
/// matches every remaining argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    pub types: Vec<DataType>,
    pub variadic: bool,
}

impl ArgSpec {
    pub fn new(types: &[DataType]) -> Self {
        ArgSpec {
            types: types.to_vec(),
            variadic: false,
        }
    }

    pub fn variadic(types: &[DataType]) -> Self {
        ArgSpec {
            types: types.to_vec(),
            variadic: true,
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        self.types.iter().any(|t| t.accepts(value))
    }
}

impl fmt::Display for ArgSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_types(&self.types))?;
        if self.variadic {
            f.write_str("...")?;
        }
        Ok(())
    }
}

/// Function body. Arguments arrive type-checked and with views materialized.
pub type Handler = Arc<dyn Fn(&[Value], &CallContext<'_>) -> EvalResult<Value> + Send + Sync>;

/// A named, type-checked function.
#[derive(Clone)]
pub struct FunctionDescriptor {
    pub name: String,
    pub args: Vec<ArgSpec>,
    pub returns: Vec<DataType>,
    pub note: Option<String>,
    handler: Handler,
}

impl FunctionDescriptor {
    pub fn new<F>(name: &str, args: Vec<ArgSpec>, returns: &[DataType], handler: F) -> Self
    where
        F: Fn(&[Value], &CallContext<'_>) -> EvalResult<Value> + Send + Sync + 'static,
    {
        FunctionDescriptor {
            name: name.to_string(),
            args,
            returns: returns.to_vec(),
            note: None,
            handler: Arc::new(handler),
        }
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }

    fn is_variadic(&self) -> bool {
        self.args.last().is_some_and(|spec| spec.variadic)
    }

    fn check_arity(&self, actual: usize) -> EvalResult<()> {
        let required = self.args.len();
        let (ok, expected) = if self.is_variadic() {
            (actual >= required, format!("at least {}", required))
        } else {
            (actual == required, required.to_string())
        };
        if ok {
            Ok(())
        } else {
            Err(EvalError::InvalidArity {
                function: self.name.clone(),
                expected,
                actual,
            })
        }
    }

    fn check_types(&self, args: &[Value]) -> EvalResult<()> {
        for (i, arg) in args.iter().enumerate() {
            let Some(spec) = self.args.get(i).or(self.args.last()) else {
                break;
            };
            if !spec.accepts(arg) {
                return Err(EvalError::InvalidArgument {
                    function: self.name.clone(),
                    position: i + 1,
                    expected: join_types(&spec.types),
                    actual: arg.type_name().to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDescriptor")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("returns", &self.returns)
            .field("note", &self.note)
            .finish_non_exhaustive()
    }
}

/// Renders the signature, e.g. `replace(string, string, string, number) string`.
impl fmt::Display for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self
            .args
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}({}) {}", self.name, args, join_types(&self.returns))?;
        if let Some(note) = &self.note {
            write!(f, " ({})", note)?;
        }
        Ok(())
    }
}

/// What a handler can reach besides its arguments.
pub struct CallContext<'a> {
    evaluator: &'a Evaluator<'a>,
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(evaluator: &'a Evaluator<'a>) -> Self {
        CallContext { evaluator }
    }

    /// Evaluate an expression reference against `value`, in the scope the
    /// reference was created in. A missing key reads as null.
    pub fn apply(&self, expref: &ExprRef, value: &Value) -> EvalResult<Value> {
        self.evaluator.eval_or_null(&expref.ast, value, &expref.scope)
    }

    /// The document the current search started from.
    pub fn root(&self) -> &Value {
        self.evaluator.root()
    }
}

/// Frozen table of functions.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    functions: BTreeMap<String, FunctionDescriptor>,
}

impl Registry {
    /// Start a registry with the built-ins `config` enables.
    pub fn builder(config: &Config) -> RegistryBuilder {
        let mut builder = RegistryBuilder::new();
        standard::register(&mut builder);
        if config.string_functions {
            string::register(&mut builder);
        }
        if config.time_functions {
            time::register(&mut builder);
        }
        if config.arithmetic_functions {
            math::register(&mut builder);
        }
        if config.encoding_functions {
            encoding::register(&mut builder);
        }
        builder.disabled = config.disabled.clone();
        builder
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// All functions, ordered by name.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.functions.values()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Check `args` against the signature of `name` and run its handler.
    pub fn call(&self, name: &str, args: &[Value], ctx: &CallContext<'_>) -> EvalResult<Value> {
        let descriptor = self
            .functions
            .get(name)
            .ok_or_else(|| EvalError::UnknownFunction {
                name: name.to_string(),
            })?;
        descriptor.check_arity(args.len())?;

        let args: Cow<'_, [Value]> = if args.iter().any(|a| matches!(a, Value::View(_))) {
            Cow::Owned(args.iter().map(Value::materialize).collect())
        } else {
            Cow::Borrowed(args)
        };
        descriptor.check_types(&args)?;

        trace!(function = name, args = args.len(), "calling function");
        (descriptor.handler)(&args, ctx)
    }
}

/// Mutable registry under construction.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    functions: BTreeMap<String, FunctionDescriptor>,
    disabled: Vec<String>,
}

impl RegistryBuilder {
    /// An empty builder, without any built-ins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function, replacing any earlier one of the same name.
    pub fn register(&mut self, descriptor: FunctionDescriptor) {
        if self.functions.contains_key(&descriptor.name) {
            debug!(function = %descriptor.name, "replacing registered function");
        }
        self.functions.insert(descriptor.name.clone(), descriptor);
    }

    pub fn with_function(mut self, descriptor: FunctionDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// Leave `name` out of the built registry.
    pub fn disable(mut self, name: &str) -> Self {
        self.disabled.push(name.to_string());
        self
    }

    pub fn build(mut self) -> Registry {
        for name in &self.disabled {
            self.functions.remove(name);
        }
        debug!(functions = self.functions.len(), "function registry built");
        Registry {
            functions: self.functions,
        }
    }
}

/// Shorthand constructors for the built-in tables.
mod sig {
    use super::{ArgSpec, DataType};

    pub(super) fn one(t: DataType) -> ArgSpec {
        ArgSpec::new(&[t])
    }

    pub(super) fn any_of(types: &[DataType]) -> ArgSpec {
        ArgSpec::new(types)
    }
}

/// Argument accessors for handlers. Types are already checked, so a wrong
/// kind here means the signature and the handler disagree.
fn string_arg<'v>(function: &str, args: &'v [Value], index: usize) -> EvalResult<&'v str> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| EvalError::function(function, format!("argument {} must be a string", index + 1)))
}

fn number_arg(function: &str, args: &[Value], index: usize) -> EvalResult<f64> {
    args.get(index)
        .and_then(Value::as_f64)
        .ok_or_else(|| EvalError::function(function, format!("argument {} must be a number", index + 1)))
}

fn array_arg<'v>(function: &str, args: &'v [Value], index: usize) -> EvalResult<&'v [Value]> {
    args.get(index)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| EvalError::function(function, format!("argument {} must be an array", index + 1)))
}

fn expref_arg<'v>(function: &str, args: &'v [Value], index: usize) -> EvalResult<&'v ExprRef> {
    match args.get(index) {
        Some(Value::Expref(expref)) => Ok(expref),
        _ => Err(EvalError::function(
            function,
            format!("argument {} must be an expression reference", index + 1),
        )),
    }
}
