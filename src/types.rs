extern crate derive_more;
use crate::environment::Environment;
use crate::evaluator::{self, Error};
use derive_more::{Deref, DerefMut};
use itertools::Itertools;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::fmt::Formatter;
use std::iter::FromIterator;
use std::ops::{RangeFrom, RangeInclusive};
use std::rc::Rc;

pub type Int = i64;

#[derive(Deref, Debug, PartialEq, Eq, Hash, Clone)]
pub struct Symbol(pub String);

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol(name.into())
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Symbol(name)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Deref, DerefMut, Debug, Clone, Default)]
pub struct List(pub VecDeque<Value>);

impl List {
    pub fn head(&self) -> Option<&Value> {
        self.front()
    }

    /// The list minus its first element; `None` when empty.
    pub fn tail(&self) -> Option<List> {
        match self.is_empty() {
            true => None,
            false => Some(List(self.iter().skip(1).cloned().collect())),
        }
    }
}

impl FromIterator<Value> for List {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        List(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone)]
pub enum Arity {
    Between(RangeInclusive<usize>),
    AtLeast(RangeFrom<usize>),
}

#[derive(Debug)]
pub struct BadArgCount {
    name: &'static str,
    expected: Arity,
    got: usize,
}

impl fmt::Display for BadArgCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "when calling {} expected {} arguments, but received {}",
            self.name, self.expected, self.got
        )
    }
}

impl Arity {
    pub(crate) const fn exactly(n: usize) -> Self {
        Self::Between(n..=n)
    }

    pub(crate) const fn at_least(n: usize) -> Self {
        Self::AtLeast(n..)
    }

    /// Arity of a callable with `n` parameters under the partial-application
    /// protocol: anything from one argument up to `n` is accepted, and a
    /// zero-argument call is rejected unless there are zero parameters.
    pub(crate) fn for_parameter_count(n: usize) -> Self {
        match n {
            0 => Self::exactly(0),
            n => Self::Between(1..=n),
        }
    }

    pub(crate) fn contains(&self, n: usize) -> bool {
        match self {
            Self::Between(range) => range.contains(&n),
            Self::AtLeast(range) => range.contains(&n),
        }
    }

    pub(crate) fn validate_for(&self, n: usize, name: &'static str) -> Result<(), BadArgCount> {
        match self.contains(n) {
            true => Ok(()),
            false => Err(BadArgCount {
                name,
                expected: self.clone(),
                got: n,
            }),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Between(r) => {
                if r.start() == r.end() {
                    write!(f, "exactly {}", r.start())
                } else {
                    write!(f, "from {} to {}", r.start(), r.end())
                }
            }
            Arity::AtLeast(r) => write!(f, "at least {}", r.start),
        }
    }
}

/// How a lambda or builtin parameter receives its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    /// Evaluated in the caller's environment before binding.
    ByValue,
    /// Bound to a `Reference` into the caller's environment (`&` sigil).
    ByReference,
    /// Bound unevaluated as a `Delayed` computation (`$` sigil).
    Delayed,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Symbol,
    pub mode: ParamMode,
}

#[derive(Debug)]
pub enum BadParameter {
    NotASymbol,
    UnnamedReference,
    UnnamedDelayed,
    ConflictingSigils,
}

impl Param {
    /// Parse one parameter name, stripping a leading `&` or `$` sigil.
    pub fn parse(obj: &Value) -> Result<Param, BadParameter> {
        let sym = match obj {
            Value::Symbol(s) => s,
            _ => return Err(BadParameter::NotASymbol),
        };
        let name: &str = sym.as_ref();
        if let Some(rest) = name.strip_prefix('&') {
            if rest.is_empty() {
                return Err(BadParameter::UnnamedReference);
            }
            if rest.starts_with('$') {
                return Err(BadParameter::ConflictingSigils);
            }
            return Ok(Param {
                name: rest.into(),
                mode: ParamMode::ByReference,
            });
        }
        if let Some(rest) = name.strip_prefix('$') {
            if rest.is_empty() {
                return Err(BadParameter::UnnamedDelayed);
            }
            if rest.starts_with('&') {
                return Err(BadParameter::ConflictingSigils);
            }
            return Ok(Param {
                name: rest.into(),
                mode: ParamMode::Delayed,
            });
        }
        Ok(Param {
            name: sym.clone(),
            mode: ParamMode::ByValue,
        })
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sigil = match self.mode {
            ParamMode::ByValue => "",
            ParamMode::ByReference => "&",
            ParamMode::Delayed => "$",
        };
        write!(f, "{}{}", sigil, self.name)
    }
}

pub struct Lambda {
    pub params: Vec<Param>,
    pub body: Value,
    pub parent: Rc<Environment>,
}

impl fmt::Debug for Lambda {
    // Not derived because we want to skip the parent: the parent may well contain this Lambda!
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lambda{{params: ({}), body: {:?}}}",
            self.params.iter().join(" "),
            self.body
        )
    }
}

#[derive(Debug)]
pub struct Macro {
    pub params: Vec<Symbol>,
    pub body: Value,
}

/// A live handle onto the binding of `sym` in `env`, independent of which
/// frame in the chain currently holds it.
pub struct Reference {
    sym: Symbol,
    env: Rc<Environment>,
}

impl Reference {
    /// Resolve an argument expression into a reference against the caller's
    /// environment. The expression must be a symbol; a symbol whose current
    /// value is already a reference resolves to that same reference, so
    /// reference parameters forward through nested calls.
    pub fn resolve(expr: &Value, env: &Rc<Environment>) -> evaluator::Result<Rc<Reference>> {
        match expr {
            Value::Reference(r) => Ok(r.clone()),
            Value::Symbol(sym) => {
                let current = env.fetch(sym).map_err(Error::UnknownSymbol)?;
                match current {
                    Value::Reference(r) => Ok(r),
                    _ => Ok(Rc::new(Reference {
                        sym: sym.clone(),
                        env: env.clone(),
                    })),
                }
            }
            _ => Err(Error::Type(TypeMismatch::NotASymbol)),
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.sym
    }

    pub fn get(&self) -> evaluator::Result {
        self.env
            .get(&self.sym)
            .ok_or_else(|| Error::DanglingReference(self.sym.clone()))
    }

    pub fn set(&self, value: Value) -> evaluator::Result<()> {
        if !self.env.contains(&self.sym) {
            return Err(Error::DanglingReference(self.sym.clone()));
        }
        if self.env.contains_local(&self.sym) {
            self.env.set(self.sym.clone(), value);
        } else {
            self.env.set_outermost(&self.sym, value);
        }
        Ok(())
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Reference{{sym: {}}}", self.sym)
    }
}

/// A memoized lazy value: the expression runs at most once, on first force.
pub struct Delayed {
    expr: Value,
    env: Rc<Environment>,
    cache: RefCell<Option<Value>>,
}

impl Delayed {
    pub fn new(expr: Value, env: Rc<Environment>) -> Self {
        Self {
            expr,
            env,
            cache: RefCell::new(None),
        }
    }

    pub fn force(&self) -> evaluator::Result {
        if let Some(value) = self.cache.borrow().as_ref() {
            return Ok(value.clone());
        }
        let value = evaluator::eval(&self.expr, &self.env)?;
        *self.cache.borrow_mut() = Some(value.clone());
        Ok(value)
    }
}

impl fmt::Debug for Delayed {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Delayed{{expr: {:?}}}", self.expr)
    }
}

/// Parameter shape of a builtin: a fixed mode-per-parameter list (eligible
/// for partial application) or fully variadic (never curried).
#[derive(Debug, Clone, Copy)]
pub enum BuiltinParams {
    Fixed(&'static [ParamMode]),
    Variadic,
}

pub struct BuiltinFn {
    pub name: &'static str,
    pub params: BuiltinParams,
    pub fn_ptr: fn(&[Value], &Rc<Environment>) -> evaluator::Result,
}

impl fmt::Debug for BuiltinFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "builtin #<{}>", self.name)
    }
}

/// A builtin plus the leading argument values it has already been applied
/// to. Partial application of any builtin produces another one of these.
#[derive(Debug, Clone)]
pub struct CurriedBuiltin {
    pub func: &'static BuiltinFn,
    pub bound: Vec<Value>,
}

impl CurriedBuiltin {
    pub fn new(func: &'static BuiltinFn) -> Self {
        Self {
            func,
            bound: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Integer(Int),
    Bool(bool),
    String(String),
    Symbol(Symbol),
    List(Rc<List>),
    Lambda(Rc<Lambda>),
    Macro(Rc<Macro>),
    Builtin(Rc<CurriedBuiltin>),
    Reference(Rc<Reference>),
    Delayed(Rc<Delayed>),
}

#[derive(Debug)]
pub enum TypeMismatch {
    NotAnInt,
    NotABool,
    NotAList,
    NotAString,
    NotASymbol,
    NotADelayed,
    NotCallable,
    EmptyList,
}

impl Value {
    pub(crate) fn as_int(&self) -> Result<Int, TypeMismatch> {
        match self {
            Value::Integer(x) => Ok(*x),
            _ => Err(TypeMismatch::NotAnInt),
        }
    }

    pub(crate) fn as_bool(&self) -> Result<bool, TypeMismatch> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(TypeMismatch::NotABool),
        }
    }

    pub(crate) fn as_list(&self) -> Result<&List, TypeMismatch> {
        match self {
            Value::List(x) => Ok(x),
            _ => Err(TypeMismatch::NotAList),
        }
    }

    pub(crate) fn as_string(&self) -> Result<&str, TypeMismatch> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(TypeMismatch::NotAString),
        }
    }

    pub(crate) fn as_delayed(&self) -> Result<&Rc<Delayed>, TypeMismatch> {
        match self {
            Value::Delayed(d) => Ok(d),
            _ => Err(TypeMismatch::NotADelayed),
        }
    }

    pub(crate) fn is_nil(&self) -> bool {
        match self {
            Value::Nil => true,
            _ => false,
        }
    }

    pub(crate) fn is_list(&self) -> bool {
        match self {
            Value::List(_) => true,
            _ => false,
        }
    }
}

impl Value {
    pub(crate) fn new_list() -> Self {
        Self::List(Rc::new(List::default()))
    }

    pub(crate) fn wrap_list(list: List) -> Self {
        Self::List(Rc::new(list))
    }

    pub(crate) fn new_symbol(name: &str) -> Self {
        Self::Symbol(name.into())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Nil, Nil) => true,
            (Integer(x), Integer(y)) => x == y,
            (Bool(x), Bool(y)) => x == y,
            (String(x), String(y)) => x == y,
            (Symbol(x), Symbol(y)) => x == y,
            (List(x), List(y)) => equal_lists(x, y),
            // Callables and handles are equal only to themselves.
            (Lambda(x), Lambda(y)) => Rc::ptr_eq(x, y),
            (Macro(x), Macro(y)) => Rc::ptr_eq(x, y),
            (Builtin(x), Builtin(y)) => Rc::ptr_eq(x, y),
            (Reference(x), Reference(y)) => Rc::ptr_eq(x, y),
            (Delayed(x), Delayed(y)) => Rc::ptr_eq(x, y),
            (_, _) => false,
        }
    }
}

impl Eq for Value {}

fn equal_lists(xs: &List, ys: &List) -> bool {
    xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(x, y)| x == y)
}
