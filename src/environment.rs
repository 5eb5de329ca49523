use crate::types::{BuiltinFn, CurriedBuiltin, Symbol, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
pub struct UnknownSymbol(pub Symbol);

/// One frame of the lexical scope chain. Children hold a strong handle to
/// their parent, never the other way round, so the graph stays acyclic and
/// reference counting is enough to manage lifetimes.
#[derive(Debug, Default)]
pub struct Environment {
    outer: Option<Rc<Environment>>,
    values: RefCell<HashMap<Symbol, Value>>,
}

impl Environment {
    pub fn empty() -> Rc<Environment> {
        Rc::new(Environment::default())
    }

    pub fn spawn_from(outer: &Rc<Environment>) -> Rc<Environment> {
        Rc::new(Environment {
            outer: Some(outer.clone()),
            values: RefCell::new(HashMap::new()),
        })
    }

    /// Outward-walking lookup.
    pub fn get(&self, sym: &Symbol) -> Option<Value> {
        match self.values.borrow().get(sym) {
            Some(value) => Some(value.clone()),
            None => self.outer.as_ref().and_then(|outer| outer.get(sym)),
        }
    }

    pub fn fetch(&self, sym: &Symbol) -> Result<Value, UnknownSymbol> {
        self.get(sym).ok_or_else(|| UnknownSymbol(sym.clone()))
    }

    /// Bind or overwrite in this frame only.
    pub fn set(&self, sym: Symbol, value: Value) {
        self.values.borrow_mut().insert(sym, value);
    }

    pub fn contains(&self, sym: &Symbol) -> bool {
        self.contains_local(sym) || self.outer.as_ref().map_or(false, |outer| outer.contains(sym))
    }

    pub fn contains_local(&self, sym: &Symbol) -> bool {
        self.values.borrow().contains_key(sym)
    }

    /// Write to the outermost frame that already binds `sym`, else bind here.
    pub fn set_outermost(&self, sym: &Symbol, value: Value) {
        match &self.outer {
            Some(outer) if outer.contains(sym) => outer.set_outermost(sym, value),
            _ => self.set(sym.clone(), value),
        }
    }

    pub fn bind_builtin(&self, func: &'static BuiltinFn) {
        self.set(
            func.name.into(),
            Value::Builtin(Rc::new(CurriedBuiltin::new(func))),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str) -> Symbol {
        name.into()
    }

    #[test]
    fn lookup_walks_outward() {
        let root = Environment::empty();
        root.set(sym("x"), Value::Integer(1));
        let child = Environment::spawn_from(&root);
        assert_eq!(child.get(&sym("x")), Some(Value::Integer(1)));
        assert!(child.fetch(&sym("y")).is_err());
    }

    #[test]
    fn local_bindings_shadow_outer_ones() {
        let root = Environment::empty();
        root.set(sym("x"), Value::Integer(1));
        let child = Environment::spawn_from(&root);
        child.set(sym("x"), Value::Integer(2));
        assert_eq!(child.get(&sym("x")), Some(Value::Integer(2)));
        assert_eq!(root.get(&sym("x")), Some(Value::Integer(1)));
        assert!(child.contains_local(&sym("x")));
        assert!(!child.contains_local(&sym("missing")));
    }

    #[test]
    fn set_outermost_targets_the_binding_frame() {
        let root = Environment::empty();
        root.set(sym("x"), Value::Integer(1));
        let middle = Environment::spawn_from(&root);
        let inner = Environment::spawn_from(&middle);
        inner.set_outermost(&sym("x"), Value::Integer(9));
        assert_eq!(root.get(&sym("x")), Some(Value::Integer(9)));
        assert!(!inner.contains_local(&sym("x")));
        assert!(!middle.contains_local(&sym("x")));
    }

    #[test]
    fn set_outermost_falls_back_to_local() {
        let root = Environment::empty();
        let child = Environment::spawn_from(&root);
        child.set_outermost(&sym("fresh"), Value::Integer(5));
        assert!(child.contains_local(&sym("fresh")));
        assert!(!root.contains(&sym("fresh")));
    }
}
