use crate::environment::Environment;
use crate::evaluator::{eval, Error, Result};
use crate::types::{Arity, BadParameter, Lambda, Macro, Param, Symbol, Value};
use std::rc::Rc;

/// The closed set of head symbols the evaluator consumes without evaluating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    Quote,
    If,
    Define,
    SetBang,
    Begin,
    Local,
    Lambda,
    Defmacro,
}

impl SpecialForm {
    pub fn from_symbol(sym: &Symbol) -> Option<Self> {
        let form = match sym.as_ref() {
            "quote" => Self::Quote,
            "if" => Self::If,
            "define" => Self::Define,
            "set!" => Self::SetBang,
            "begin" => Self::Begin,
            "local" => Self::Local,
            "lambda" => Self::Lambda,
            "defmacro" => Self::Defmacro,
            _ => return None,
        };
        Some(form)
    }
}

pub fn apply(form: SpecialForm, args: &[Value], env: &Rc<Environment>) -> Result {
    match form {
        SpecialForm::Quote => apply_quote(args),
        SpecialForm::If => apply_if(args, env),
        SpecialForm::Define => apply_define(args, env),
        SpecialForm::SetBang => apply_set(args, env),
        SpecialForm::Begin => apply_begin(args, env),
        SpecialForm::Local => apply_begin(args, &Environment::spawn_from(env)),
        SpecialForm::Lambda => apply_lambda(args, env),
        SpecialForm::Defmacro => apply_defmacro(args, env),
    }
}

pub fn apply_quote(args: &[Value]) -> Result {
    Arity::exactly(1).validate_for(args.len(), "quote")?;
    Ok(args[0].clone())
}

pub fn apply_if(args: &[Value], env: &Rc<Environment>) -> Result {
    Arity::exactly(3).validate_for(args.len(), "if")?;
    let condition = eval(&args[0], env)?;
    // The untaken branch is never evaluated.
    match condition.as_bool()? {
        true => eval(&args[1], env),
        false => eval(&args[2], env),
    }
}

#[derive(Debug)]
pub enum DefError {
    TargetNotSymbolOrList,
    NameNotASymbol,
    EmptyHeader,
}

pub fn apply_define(args: &[Value], env: &Rc<Environment>) -> Result {
    Arity::exactly(2).validate_for(args.len(), "define")?;
    match &args[0] {
        Value::Symbol(sym) => {
            if env.contains_local(sym) {
                return Err(Error::Redefinition(sym.clone()));
            }
            let value = eval(&args[1], env)?;
            log::debug!("define {} as {}", sym, value);
            env.set(sym.clone(), value);
            Ok(Value::Nil)
        }
        // (define (name p1 p2) body) is sugar for binding a lambda.
        Value::List(header) => {
            let name = match header.head() {
                Some(Value::Symbol(s)) => s,
                Some(_) => return Err(Error::Def(DefError::NameNotASymbol)),
                None => return Err(Error::Def(DefError::EmptyHeader)),
            };
            if env.contains_local(name) {
                return Err(Error::Redefinition(name.clone()));
            }
            let params = parse_params(header.iter().skip(1))?;
            let lambda = Lambda {
                params,
                body: args[1].clone(),
                parent: env.clone(),
            };
            log::debug!("define function {}", name);
            env.set(name.clone(), Value::Lambda(Rc::new(lambda)));
            Ok(Value::Nil)
        }
        _ => Err(Error::Def(DefError::TargetNotSymbolOrList)),
    }
}

#[derive(Debug)]
pub enum SetError {
    TargetNotASymbol,
    Undefined(Symbol),
}

pub fn apply_set(args: &[Value], env: &Rc<Environment>) -> Result {
    Arity::exactly(2).validate_for(args.len(), "set!")?;
    let sym = match &args[0] {
        Value::Symbol(s) => s,
        _ => return Err(Error::Set(SetError::TargetNotASymbol)),
    };
    let current = env
        .fetch(sym)
        .map_err(|_| Error::Set(SetError::Undefined(sym.clone())))?;
    let value = eval(&args[1], env)?;
    // A reference-bound name writes through the reference to its target.
    if let Value::Reference(r) = current {
        r.set(value)?;
        return Ok(Value::Nil);
    }
    if env.contains_local(sym) {
        env.set(sym.clone(), value);
    } else {
        env.set_outermost(sym, value);
    }
    Ok(Value::Nil)
}

pub fn apply_begin(args: &[Value], env: &Rc<Environment>) -> Result {
    let mut result = Value::Nil;
    for expr in args {
        result = eval(expr, env)?;
    }
    Ok(result)
}

#[derive(Debug)]
pub enum FnError {
    ParametersNotAList,
    BadParameter(BadParameter),
}

pub fn apply_lambda(args: &[Value], env: &Rc<Environment>) -> Result {
    Arity::exactly(2).validate_for(args.len(), "lambda")?;
    let params = match &args[0] {
        Value::List(list) => parse_params(list.iter())?,
        _ => return Err(Error::Fn(FnError::ParametersNotAList)),
    };
    Ok(Value::Lambda(Rc::new(Lambda {
        params,
        body: args[1].clone(),
        parent: env.clone(),
    })))
}

fn parse_params<'a>(objs: impl Iterator<Item = &'a Value>) -> Result<Vec<Param>> {
    objs.map(|obj| Param::parse(obj).map_err(|e| Error::Fn(FnError::BadParameter(e))))
        .collect()
}

#[derive(Debug)]
pub enum MacroError {
    HeaderNotAList,
    NameNotASymbol,
    ParameterNotASymbol,
    EmptyHeader,
}

pub fn apply_defmacro(args: &[Value], env: &Rc<Environment>) -> Result {
    Arity::exactly(2).validate_for(args.len(), "defmacro")?;
    let header = match &args[0] {
        Value::List(l) => l,
        _ => return Err(Error::Macro(MacroError::HeaderNotAList)),
    };
    let name = match header.head() {
        Some(Value::Symbol(s)) => s,
        Some(_) => return Err(Error::Macro(MacroError::NameNotASymbol)),
        None => return Err(Error::Macro(MacroError::EmptyHeader)),
    };
    if env.contains_local(name) {
        return Err(Error::Redefinition(name.clone()));
    }
    let params: Result<Vec<Symbol>> = header
        .iter()
        .skip(1)
        .map(|obj| match obj {
            Value::Symbol(s) => Ok(s.clone()),
            _ => Err(Error::Macro(MacroError::ParameterNotASymbol)),
        })
        .collect();
    let mac = Macro {
        params: params?,
        body: args[1].clone(),
    };
    log::debug!("defmacro {}", name);
    env.set(name.clone(), Value::Macro(Rc::new(mac)));
    Ok(Value::Nil)
}
