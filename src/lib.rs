//! # jp-policy
//!
//! A JSON query interpreter for policy evaluation. Expressions follow the
//! JMESPath dialect (field access, projections, filters, slices, pipes,
//! let-bindings, function calls) and add arithmetic that understands resource
//! quantities (`"12Ki"`, `"500m"`) and durations (`"1h30m"`).
//!
//! ```
//! use jp_policy::Value;
//!
//! let doc = Value::from(serde_json::json!({
//!     "items": [{"v": "2Ki"}, {"v": "3Ki"}]
//! }));
//! let total = jp_policy::search("sum(items[].v)", &doc).unwrap();
//! assert_eq!(total, Value::from("5Ki"));
//! ```
//!
//! Compile once and search many times:
//!
//! ```
//! use jp_policy::Value;
//!
//! let query = jp_policy::compile("spec.replicas * `2`").unwrap();
//! for replicas in [1, 3] {
//!     let doc = Value::from(serde_json::json!({"spec": {"replicas": replicas}}));
//!     assert_eq!(query.search(&doc).unwrap(), Value::from(replicas * 2));
//! }
//! ```
pub mod arithmetic;
pub mod ast;
pub mod config;
pub mod container;
pub mod duration;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod quantity;
pub mod scope;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

use std::sync::{Arc, LazyLock};

use tracing::debug;

pub use ast::{Ast, Token};
pub use config::Config;
pub use container::{ContainerView, KeyedMap, Optional, Record, Sequence};
pub use duration::Duration;
pub use error::{Error, EvalError, EvalResult};
pub use evaluator::Evaluator;
pub use functions::{FunctionDescriptor, Registry};
pub use lexer::{LexError, Lexer};
pub use parser::{ParseError, Parser};
pub use quantity::Quantity;
pub use scope::Scope;
pub use value::{Map, Value};

/// Compiles expressions against one function registry.
#[derive(Debug, Clone)]
pub struct Interpreter {
    registry: Arc<Registry>,
    max_depth: Option<usize>,
}

impl Interpreter {
    pub fn new(config: Config) -> Self {
        Interpreter {
            registry: Arc::new(Registry::builder(&config).build()),
            max_depth: config.max_depth,
        }
    }

    /// Use a registry built elsewhere, e.g. one with extra functions.
    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Interpreter {
            registry,
            max_depth: None,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Parse `text` into a reusable query.
    pub fn compile(&self, text: &str) -> Result<CompiledQuery, ParseError> {
        let ast = Parser::new(Lexer::new(text))?
            .with_max_depth(self.max_depth)
            .parse()?;
        debug!(expression = text, depth = ast.depth(), "compiled expression");
        Ok(CompiledQuery {
            ast: Arc::new(ast),
            registry: Arc::clone(&self.registry),
        })
    }

    /// Compile and evaluate in one step.
    pub fn search(&self, text: &str, document: &Value) -> Result<Value, Error> {
        Ok(self.compile(text)?.search(document)?)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new(Config::default())
    }
}

/// A parsed expression bound to the registry it was compiled with.
///
/// Cloning is cheap and a query can be searched from several threads at once.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    ast: Arc<Ast>,
    registry: Arc<Registry>,
}

impl CompiledQuery {
    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// Evaluate against `document` with no variables bound.
    pub fn search(&self, document: &Value) -> Result<Value, EvalError> {
        self.search_with(document, &Scope::new())
    }

    /// Evaluate with variables already in scope, as if bound by `let`.
    ///
    /// ```
    /// use jp_policy::{Scope, Value};
    ///
    /// let scope: Scope = [("limit".to_string(), Value::from(2))].into_iter().collect();
    /// let query = jp_policy::compile("length(@) > $limit").unwrap();
    /// let doc = Value::from(serde_json::json!([1, 2, 3]));
    /// assert_eq!(query.search_with(&doc, &scope).unwrap(), Value::Boolean(true));
    /// ```
    pub fn search_with(&self, document: &Value, scope: &Scope) -> Result<Value, EvalError> {
        Evaluator::new(&self.registry, document).eval(&self.ast, document, scope)
    }
}

static DEFAULT_INTERPRETER: LazyLock<Interpreter> = LazyLock::new(Interpreter::default);

/// Compile with every built-in function available.
pub fn compile(text: &str) -> Result<CompiledQuery, ParseError> {
    DEFAULT_INTERPRETER.compile(text)
}

/// Compile and evaluate with every built-in function available.
pub fn search(text: &str, document: &Value) -> Result<Value, Error> {
    DEFAULT_INTERPRETER.search(text, document)
}
