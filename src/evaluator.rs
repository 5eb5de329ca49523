use crate::environment::{Environment, UnknownSymbol};
use crate::types::{
    Arity, BadArgCount, BuiltinParams, CurriedBuiltin, Delayed, Int, Lambda, List, Macro,
    ParamMode, Reference, Symbol, TypeMismatch, Value,
};
use crate::{expander, reader, special_forms};
use std::fmt;
use std::rc::Rc;

pub type Result<T = Value> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    UnknownSymbol(UnknownSymbol),
    Type(TypeMismatch),
    BadArgCount(BadArgCount),
    Def(special_forms::DefError),
    Set(special_forms::SetError),
    Fn(special_forms::FnError),
    Macro(special_forms::MacroError),
    Redefinition(Symbol),
    DivideByZero,
    BadIndex(Int, usize),
    DanglingReference(Symbol),
    EmptyForm,
    Read(reader::ParseError),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownSymbol(UnknownSymbol(s)) => write!(f, "symbol '{}' not found", s),
            Error::Type(e) => write!(f, "type mismatch: {:?}", e),
            Error::BadArgCount(e) => write!(f, "{}", e),
            Error::Def(e) => write!(f, "define: {:?}", e),
            Error::Set(e) => write!(f, "set!: {:?}", e),
            Error::Fn(e) => write!(f, "lambda: {:?}", e),
            Error::Macro(e) => write!(f, "defmacro: {:?}", e),
            Error::Redefinition(s) => write!(f, "attempting to redefine symbol '{}'", s),
            Error::DivideByZero => write!(f, "cannot divide by zero!"),
            Error::BadIndex(i, len) => {
                write!(f, "list index {} out of range [1, {}]", i, len)
            }
            Error::DanglingReference(s) => write!(f, "reference to '{}' undefined", s),
            Error::EmptyForm => write!(f, "cannot evaluate an empty list"),
            Error::Read(e) => write!(f, "read error: {}", e),
            Error::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl From<TypeMismatch> for Error {
    fn from(t: TypeMismatch) -> Self {
        Self::Type(t)
    }
}

impl From<BadArgCount> for Error {
    fn from(e: BadArgCount) -> Self {
        Self::BadArgCount(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

pub fn eval(expr: &Value, env: &Rc<Environment>) -> Result {
    log::trace!("eval {}", expr);
    match expr {
        Value::Symbol(sym) => {
            let value = env.fetch(sym).map_err(Error::UnknownSymbol)?;
            match value {
                // Reading a reference-bound name yields the target value,
                // not the handle.
                Value::Reference(r) => r.get(),
                other => Ok(other),
            }
        }
        Value::List(list) => eval_list(list, env),
        Value::Reference(r) => r.get(),
        // Everything else is self-evaluating.
        _ => Ok(expr.clone()),
    }
}

fn eval_list(list: &List, env: &Rc<Environment>) -> Result {
    let head = list.head().ok_or(Error::EmptyForm)?;
    let args: Vec<Value> = list.iter().skip(1).cloned().collect();
    if let Value::Symbol(sym) = head {
        // The special-form check precedes symbol lookup; these names cannot
        // be shadowed into ordinary bindings.
        if let Some(form) = special_forms::SpecialForm::from_symbol(sym) {
            return special_forms::apply(form, &args, env);
        }
    }
    let callable = eval(head, env)?;
    apply(&callable, &args, env)
}

/// Apply a callable to *unevaluated* argument expressions; each callable
/// kind decides how its arguments are evaluated.
pub fn apply(callable: &Value, args: &[Value], env: &Rc<Environment>) -> Result {
    match callable {
        Value::Lambda(f) => call_lambda(f, args, env),
        Value::Macro(m) => call_macro(m, args, env),
        Value::Builtin(b) => call_builtin(b, args, env),
        // A reference in call position is dereferenced and dispatch retried,
        // so reference parameters holding callables can be invoked directly.
        Value::Reference(r) => {
            let target = r.get()?;
            apply(&target, args, env)
        }
        _ => Err(Error::Type(TypeMismatch::NotCallable)),
    }
}

fn bind_argument(mode: ParamMode, arg: &Value, caller_env: &Rc<Environment>) -> Result {
    match mode {
        ParamMode::ByValue => eval(arg, caller_env),
        ParamMode::ByReference => Reference::resolve(arg, caller_env).map(Value::Reference),
        ParamMode::Delayed => Ok(Value::Delayed(Rc::new(Delayed::new(
            arg.clone(),
            caller_env.clone(),
        )))),
    }
}

pub(crate) fn call_lambda(
    func: &Rc<Lambda>,
    args: &[Value],
    caller_env: &Rc<Environment>,
) -> Result {
    log::trace!("call {:?} with {} args", func, args.len());
    Arity::for_parameter_count(func.params.len())
        .validate_for(args.len(), "lambda")
        .map_err(Error::BadArgCount)?;
    let local = Environment::spawn_from(&func.parent);
    for (param, arg) in func.params.iter().zip(args) {
        let value = bind_argument(param.mode, arg, caller_env)?;
        local.set(param.name.clone(), value);
    }
    if args.len() < func.params.len() {
        // Partial application: the new lambda takes the unsupplied suffix
        // and sees the already-bound prefix through its creation environment.
        return Ok(Value::Lambda(Rc::new(Lambda {
            params: func.params[args.len()..].to_vec(),
            body: func.body.clone(),
            parent: local,
        })));
    }
    eval(&func.body, &local)
}

fn call_macro(mac: &Rc<Macro>, args: &[Value], caller_env: &Rc<Environment>) -> Result {
    Arity::exactly(mac.params.len())
        .validate_for(args.len(), "macro")
        .map_err(Error::BadArgCount)?;
    let expanded = expander::expand(&mac.body, &mac.params, args);
    log::trace!("macro expansion produced {}", expanded);
    // The expansion runs in the caller's environment, not a macro-private one.
    eval(&expanded, caller_env)
}

fn call_builtin(
    builtin: &Rc<CurriedBuiltin>,
    args: &[Value],
    caller_env: &Rc<Environment>,
) -> Result {
    let func = builtin.func;
    log::trace!("call builtin {} with {} args", func.name, args.len());
    let modes = match func.params {
        BuiltinParams::Variadic => {
            Arity::at_least(0)
                .validate_for(args.len(), func.name)
                .map_err(Error::BadArgCount)?;
            let values: Vec<Value> = args
                .iter()
                .map(|arg| eval(arg, caller_env))
                .collect::<std::result::Result<_, _>>()?;
            return (func.fn_ptr)(&values, caller_env);
        }
        BuiltinParams::Fixed(modes) => modes,
    };
    let remaining = &modes[builtin.bound.len()..];
    Arity::for_parameter_count(remaining.len())
        .validate_for(args.len(), func.name)
        .map_err(Error::BadArgCount)?;
    let mut bound = builtin.bound.clone();
    for (mode, arg) in remaining.iter().zip(args) {
        bound.push(bind_argument(*mode, arg, caller_env)?);
    }
    if bound.len() < modes.len() {
        return Ok(Value::Builtin(Rc::new(CurriedBuiltin { func, bound })));
    }
    (func.fn_ptr)(&bound, caller_env)
}
