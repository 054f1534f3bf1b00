//! jq-style filter expressions applied to pulled record batches.
//!
//! The supported language is a jq subset: paths, iteration, pipes, comma,
//! alternative, boolean and arithmetic operators, array/object construction,
//! string interpolation, `if` conditionals and the common builtins. Variables,
//! `reduce`/`foreach`, user definitions and assignment are not supported.
//! Whitespace is removed before parsing, so expressions must not rely on it.

mod builtins;
mod eval;
mod lexer;
mod parser;

use pullbridge_core::AppResult;
use serde_json::Value;

use self::parser::Ast;

/// Removes newlines and spaces from a filter expression.
#[must_use]
pub fn normalize_filter(expression: &str) -> String {
    expression.replace(['\n', ' '], "")
}

/// Parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpression {
    source: String,
    ast: Ast,
}

impl FilterExpression {
    /// Normalizes and parses a filter expression.
    pub fn parse(expression: &str) -> AppResult<Self> {
        let source = normalize_filter(expression);
        let tokens = lexer::tokenize(source.as_str())?;
        let ast = parser::parse(tokens)?;

        Ok(Self { source, ast })
    }

    /// Returns the normalized expression text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.source.as_str()
    }

    /// Runs the filter against one input value and collects every output.
    pub fn apply(&self, input: &Value) -> AppResult<Vec<Value>> {
        eval::evaluate(&self.ast, input)
    }
}

#[cfg(test)]
mod tests;
