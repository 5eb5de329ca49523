use crate::types::{Symbol, Value};
use std::collections::HashMap;

/// Rewrite a macro body, replacing each parameter symbol by the caller's
/// unevaluated argument expression. Purely syntactic: no renaming happens
/// when a substituted expression collides with a symbol the body introduces,
/// so macros are unhygienic by design.
pub fn expand(body: &Value, params: &[Symbol], args: &[Value]) -> Value {
    let substitutions: HashMap<&Symbol, &Value> = params.iter().zip(args.iter()).collect();
    substitute(body, &substitutions)
}

fn substitute(expr: &Value, substitutions: &HashMap<&Symbol, &Value>) -> Value {
    match expr {
        Value::Symbol(sym) => match substitutions.get(sym) {
            Some(replacement) => (*replacement).clone(),
            None => expr.clone(),
        },
        Value::List(list) => {
            Value::wrap_list(list.iter().map(|e| substitute(e, substitutions)).collect())
        }
        _ => expr.clone(),
    }
}
