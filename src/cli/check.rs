//! Syntax-check an expression without evaluating it

use super::CliError;
use crate::{Ast, Config, Lexer, Parser};

/// Parse `expression` under the depth bound of `config`.
pub fn execute_check(expression: &str, config: &Config) -> Result<Ast, CliError> {
    let ast = Parser::new(Lexer::new(expression))?
        .with_max_depth(config.max_depth)
        .parse()?;
    Ok(ast)
}
