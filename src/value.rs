use std::{borrow::Cow, collections::BTreeMap, fmt, sync::Arc};

use crate::{
    ast::Ast,
    container::{ContainerView, ViewKind},
    scope::Scope,
};

/// Object representation. Keys are kept ordered so that `keys()`, `values()`,
/// value projections and JSON output are deterministic.
pub type Map = BTreeMap<String, Value>;

/// A document value as seen by the interpreter.
///
/// Plain JSON values are held directly. Typed data that is not worth
/// converting up front can be wrapped in a [`ContainerView`] and is then
/// read through the adapter on demand.
///
/// # Examples
///
/// ```
/// use jp_policy::Value;
///
/// let doc = Value::from(serde_json::json!({"limits": {"memory": "2Gi"}}));
/// assert_eq!(doc.type_name(), "object");
/// assert!(Value::Number(0.0).is_truthy());
/// assert!(!Value::String(String::new()).is_truthy());
/// ```
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// JSON null
    #[default]
    Null,

    /// JSON boolean
    Boolean(bool),

    /// JSON number; every number is a double
    Number(f64),

    /// UTF-8 string
    String(String),

    /// Ordered sequence
    Array(Vec<Value>),

    /// String-keyed object
    Object(Map),

    /// Structured data read through the container adapter
    View(Arc<dyn ContainerView>),

    /// Deferred expression produced by `&expr`
    Expref(ExprRef),
}

/// An expression reference together with the bindings visible where it was
/// created.
#[derive(Debug, Clone)]
pub struct ExprRef {
    pub(crate) ast: Arc<Ast>,
    pub(crate) scope: Scope,
}

impl ExprRef {
    pub(crate) fn new(ast: Ast, scope: Scope) -> Self {
        ExprRef {
            ast: Arc::new(ast),
            scope,
        }
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }
}

impl Value {
    /// Wrap a container view.
    pub fn view(view: impl ContainerView + 'static) -> Self {
        Value::View(Arc::new(view))
    }

    /// Truthiness as used by `||`, `&&`, `!` and filters.
    ///
    /// False, null, the empty string and empty containers are false. Numbers
    /// are always true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(_) => true,
            Value::String(s) => !s.is_empty(),
            Value::Array(arr) => !arr.is_empty(),
            Value::Object(obj) => !obj.is_empty(),
            Value::View(view) => match view.kind() {
                ViewKind::Optional => view.target().is_some_and(|v| v.is_truthy()),
                ViewKind::Sequence => view.len() > 0,
                ViewKind::Record | ViewKind::Map => !view.keys().is_empty(),
            },
            Value::Expref(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.resolve().as_ref(), Value::Null)
    }

    /// Type name as reported by `type()` and in argument errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::View(view) => match view.kind() {
                ViewKind::Optional => match view.target() {
                    Some(inner) => inner.type_name(),
                    None => "null",
                },
                ViewKind::Sequence => "array",
                ViewKind::Record | ViewKind::Map => "object",
            },
            Value::Expref(_) => "expref",
        }
    }

    /// Peel optional/pointer views. An empty optional reads as null.
    pub fn resolve(&self) -> Cow<'_, Value> {
        match self {
            Value::View(view) if view.kind() == ViewKind::Optional => match view.target() {
                Some(inner) => Cow::Owned(inner.resolve().into_owned()),
                None => Cow::Owned(Value::Null),
            },
            other => Cow::Borrowed(other),
        }
    }

    /// Convert every view in this value into plain arrays and objects.
    pub fn materialize(&self) -> Value {
        match self {
            Value::Array(arr) => Value::Array(arr.iter().map(Value::materialize).collect()),
            Value::Object(obj) => Value::Object(
                obj.iter()
                    .map(|(k, v)| (k.clone(), v.materialize()))
                    .collect(),
            ),
            Value::View(view) => match view.kind() {
                ViewKind::Optional => view
                    .target()
                    .map(|v| v.materialize())
                    .unwrap_or(Value::Null),
                ViewKind::Sequence => {
                    Value::Array(view.elements().map(|v| v.materialize()).collect())
                }
                ViewKind::Record | ViewKind::Map => Value::Object(
                    view.keys()
                        .into_iter()
                        .filter_map(|k| view.get(&k).map(|v| (k, v.materialize())))
                        .collect(),
                ),
            },
            other => other.clone(),
        }
    }

    /// Elements of an array or sequence view, one level deep.
    pub fn as_sequence(&self) -> Option<Cow<'_, [Value]>> {
        match self {
            Value::Array(arr) => Some(Cow::Borrowed(arr.as_slice())),
            Value::View(view) => match view.kind() {
                ViewKind::Sequence => Some(Cow::Owned(view.elements().collect())),
                ViewKind::Optional => view
                    .target()
                    .and_then(|inner| inner.as_sequence().map(|s| Cow::Owned(s.into_owned()))),
                ViewKind::Record | ViewKind::Map => None,
            },
            _ => None,
        }
    }

    /// Entries of an object, record view or map view, one level deep.
    pub fn as_mapping(&self) -> Option<Cow<'_, Map>> {
        match self {
            Value::Object(obj) => Some(Cow::Borrowed(obj)),
            Value::View(view) => match view.kind() {
                ViewKind::Record | ViewKind::Map => Some(Cow::Owned(
                    view.keys()
                        .into_iter()
                        .filter_map(|k| view.get(&k).map(|v| (k, v)))
                        .collect(),
                )),
                ViewKind::Optional => view
                    .target()
                    .and_then(|inner| inner.as_mapping().map(|m| Cow::Owned(m.into_owned()))),
                ViewKind::Sequence => None,
            },
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Serialize to compact JSON. Expression references become null.
    pub fn to_json(&self) -> String {
        serde_json::Value::from(self).to_string()
    }

    /// Serialize to indented JSON.
    pub fn to_json_pretty(&self) -> String {
        // serializing a serde_json::Value cannot fail
        serde_json::to_string_pretty(&serde_json::Value::from(self)).unwrap_or_default()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Expref(a), Value::Expref(b)) => Arc::ptr_eq(&a.ast, &b.ast),
            (a @ Value::View(_), b) | (b, a @ Value::View(_)) => a.materialize() == b.materialize(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(arr: Vec<Value>) -> Self {
        Value::Array(arr)
    }
}

impl From<Map> for Value {
    fn from(obj: Map) -> Self {
        Value::Object(obj)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null | Value::Expref(_) => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(arr) => serde_json::Value::Array(arr.iter().map(Into::into).collect()),
            Value::Object(obj) => serde_json::Value::Object(
                obj.iter().map(|(k, v)| (k.clone(), v.into())).collect(),
            ),
            Value::View(_) => serde_json::Value::from(&v.materialize()),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        serde_json::Value::from(&v)
    }
}

/// Integral doubles are written as JSON integers.
fn number_to_json(n: f64) -> serde_json::Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if n.fract() == 0.0 && n.abs() <= MAX_EXACT {
        serde_json::Value::Number((n as i64).into())
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Render a number the way string functions see it (`12`, `1.5`).
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i128)
    } else {
        n.to_string()
    }
}
