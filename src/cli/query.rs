//! Evaluate an expression against JSON input

use super::CliError;
use crate::{Config, Interpreter, Value};

/// Options for the query command
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// The expression to evaluate
    pub expression: String,
    /// JSON input string
    pub input: Option<String>,
    /// Interpreter configuration
    pub config: Config,
}

/// Run a query and return its result as JSON.
pub fn execute_query(options: &QueryOptions) -> Result<serde_json::Value, CliError> {
    let json_str = options.input.as_ref().ok_or(CliError::NoInput)?;
    let document: serde_json::Value = serde_json::from_str(json_str)?;
    let document = Value::from(document);

    let interpreter = Interpreter::new(options.config.clone());
    let query = interpreter.compile(&options.expression)?;
    let result = query.search(&document)?;
    Ok(serde_json::Value::from(result))
}
