//! Execute expressions against a variable environment supplied as JSON

use crate::{Value, Variables, parse};
use super::CliError;

/// Options for the eval command
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// The expression to evaluate
    pub expression: String,
    /// Variables as a JSON object string
    pub vars: Option<String>,
}

/// Result of an eval operation: the expression's value plus the variable
/// environment after assignments.
#[derive(Debug)]
pub struct EvalOutcome {
    pub result: serde_json::Value,
    pub variables: serde_json::Value,
}

fn parse_variables(vars: Option<&str>) -> Result<Variables, CliError> {
    let Some(text) = vars else {
        return Ok(Variables::new());
    };
    let json: serde_json::Value = serde_json::from_str(text)?;
    match json {
        serde_json::Value::Object(map) => Ok(map
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect()),
        _ => Err(CliError::VarsNotAnObject),
    }
}

/// Parse and evaluate an expression.
pub fn execute_eval(options: &EvalOptions) -> Result<EvalOutcome, CliError> {
    let expr = parse(&options.expression)?;
    let mut variables = parse_variables(options.vars.as_deref())?;

    let result = expr.evaluate(&mut variables)?;

    let variables = serde_json::Value::Object(
        variables
            .into_iter()
            .map(|(k, v)| (k, v.to_json()))
            .collect(),
    );
    Ok(EvalOutcome {
        result: result.to_json(),
        variables,
    })
}

/// Parse only; report syntax validity.
pub fn execute_check(expression: &str) -> Result<(), CliError> {
    parse(expression)?;
    Ok(())
}

/// Parse and render the canonical form.
pub fn execute_fmt(expression: &str) -> Result<String, CliError> {
    Ok(parse(expression)?.to_code())
}
