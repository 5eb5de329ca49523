use crate::strings;
use crate::types::Value;
use itertools::Itertools;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    /// Round-trippable where possible: strings quoted and escaped.
    ReadableRepresentation,
    /// Raw text: strings print their payload unchanged.
    Directly,
}

pub fn pr_str(object: &Value, mode: PrintMode) -> String {
    match object {
        Value::Nil => "nil".into(),
        Value::Integer(value) => value.to_string(),
        Value::Bool(b) => String::from(if *b { "true" } else { "false" }),
        Value::String(s) => match mode {
            PrintMode::ReadableRepresentation => strings::string_repr(s),
            PrintMode::Directly => s.clone(),
        },
        Value::Symbol(name) => name.to_string(),
        Value::List(elements) => {
            format!("({})", elements.iter().map(|e| pr_str(e, mode)).join(" "))
        }
        // Callables print as opaque identity tags; they never round-trip.
        Value::Lambda(lambda) => format!("#<lambda at {:p}>", Rc::as_ptr(lambda)),
        Value::Macro(mac) => format!("#<macro at {:p}>", Rc::as_ptr(mac)),
        Value::Builtin(builtin) => format!("#<builtin {}>", builtin.func.name),
        Value::Delayed(_) => "...".into(),
        Value::Reference(r) => match r.get() {
            Ok(target) => pr_str(&target, mode),
            Err(_) => format!("#<reference {}>", r.symbol()),
        },
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", pr_str(self, PrintMode::ReadableRepresentation))
    }
}
