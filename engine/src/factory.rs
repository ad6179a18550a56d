//! Type registry: creating domains, values, variables and constraints from
//! public type names.
//!
//! Built-in names are `int`, `float`, `bool`, `string` and `symbol`; anything
//! else fails with [Error::UnknownType]. Constraint names resolve through
//! [crate::constraints::Rule].

use crate::domain::{Domain, SymTag, Val};
use crate::engine::{ConstraintEngine, VarKey};
use crate::Error;

/// The built-in variable types.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuiltinType {
    Int,
    Float,
    Bool,
    String,
    Symbol,
}

impl BuiltinType {
    pub fn from_name(name: &str) -> Result<BuiltinType, Error> {
        match name {
            "int" => Ok(BuiltinType::Int),
            "float" => Ok(BuiltinType::Float),
            "bool" => Ok(BuiltinType::Bool),
            "string" => Ok(BuiltinType::String),
            "symbol" => Ok(BuiltinType::Symbol),
            other => Err(Error::UnknownType(other.to_string())),
        }
    }

    /// The type's declared envelope. Symbolic types start open so that members
    /// can be interned incrementally before closing.
    pub fn base_domain(self) -> Domain {
        match self {
            BuiltinType::Int => Domain::int_full(),
            BuiltinType::Float => Domain::float_full(),
            BuiltinType::Bool => Domain::boolean(),
            BuiltinType::String => Domain::sym_enum([], true, SymTag::String),
            BuiltinType::Symbol => Domain::sym_enum([], true, SymTag::Symbol),
        }
    }
}

/// Options for [create_variable].
#[derive(Debug, Clone, Default)]
pub struct VariableSpec {
    pub can_be_specified: bool,
    pub internal: bool,
    pub name: String,
    pub parent: Option<u32>,
    pub index: usize,
}

impl VariableSpec {
    pub fn named(name: &str) -> Self {
        VariableSpec {
            can_be_specified: true,
            internal: false,
            name: name.to_string(),
            parent: None,
            index: 0,
        }
    }
}

/// `createDomain(typeName)`: the full domain of a built-in type.
pub fn create_domain(type_name: &str) -> Result<Domain, Error> {
    Ok(BuiltinType::from_name(type_name)?.base_domain())
}

/// `createValue(typeName, text)`: parses a primitive value of the named type.
/// Symbolic values are interned in the engine's table.
pub fn create_value(engine: &mut ConstraintEngine, type_name: &str, text: &str) -> Result<Val, Error> {
    match BuiltinType::from_name(type_name)? {
        BuiltinType::Int => text
            .parse::<i64>()
            .map(Val::Int)
            .map_err(|_| Error::TypeMismatch("unparsable int literal")),
        BuiltinType::Float => text
            .parse::<f64>()
            .map(Val::Float)
            .map_err(|_| Error::TypeMismatch("unparsable float literal")),
        BuiltinType::Bool => match text {
            "true" | "1" => Ok(Val::Bool(true)),
            "false" | "0" => Ok(Val::Bool(false)),
            _ => Err(Error::TypeMismatch("unparsable bool literal")),
        },
        BuiltinType::String => Ok(Val::Str(engine.intern(text))),
        BuiltinType::Symbol => Ok(Val::Sym(engine.intern(text))),
    }
}

/// `createVariable(typeName, baseDomain, spec)`. The base domain must belong
/// to the named type's family.
pub fn create_variable(
    engine: &mut ConstraintEngine,
    type_name: &str,
    base: Domain,
    spec: VariableSpec,
) -> Result<VarKey, Error> {
    let tp = BuiltinType::from_name(type_name)?;
    if !tp.base_domain().can_be_compared(&base) {
        return Err(Error::TypeMismatch("base domain incompatible with the declared type"));
    }
    engine.new_variable_full(
        &spec.name,
        base,
        spec.can_be_specified,
        spec.internal,
        spec.parent,
        spec.index,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainEvent;

    #[test]
    fn unknown_type_names_fail() {
        assert!(matches!(create_domain("quaternion"), Err(Error::UnknownType(_))));
        let mut ce = ConstraintEngine::new();
        assert!(create_value(&mut ce, "quaternion", "1").is_err());
    }

    #[test]
    fn builtin_domains() {
        assert!(create_domain("int").unwrap().is_numeric());
        assert!(create_domain("bool").unwrap().is_numeric());
        assert!(create_domain("symbol").unwrap().is_symbolic());
        assert!(create_domain("string").unwrap().is_open());
    }

    #[test]
    fn value_parsing_and_interning() {
        let mut ce = ConstraintEngine::new();
        assert_eq!(create_value(&mut ce, "int", "-3").unwrap(), Val::Int(-3));
        assert_eq!(create_value(&mut ce, "bool", "true").unwrap(), Val::Bool(true));
        assert!(create_value(&mut ce, "int", "abc").is_err());

        let a = create_value(&mut ce, "symbol", "rover").unwrap();
        let b = create_value(&mut ce, "symbol", "rover").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn open_symbol_variable_fills_then_closes() {
        let mut ce = ConstraintEngine::new();
        let v = create_variable(
            &mut ce,
            "symbol",
            create_domain("symbol").unwrap(),
            VariableSpec::named("mode"),
        )
        .unwrap();
        let on = create_value(&mut ce, "symbol", "on").unwrap();
        let off = create_value(&mut ce, "symbol", "off").unwrap();
        ce.insert_value(v, on).unwrap();
        ce.insert_value(v, off).unwrap();
        ce.close_domain(v).unwrap();
        assert_eq!(ce.current_domain(v).size(), Some(2));
        assert!(ce.current_domain(v).is_member(on));
    }

    #[test]
    fn closing_an_empty_variable_empties_it() {
        let mut ce = ConstraintEngine::new();
        ce.set_auto_propagation(false);
        let v = create_variable(
            &mut ce,
            "symbol",
            create_domain("symbol").unwrap(),
            VariableSpec::named("mode"),
        )
        .unwrap();
        let mut seen = Vec::new();
        {
            struct Probe(std::rc::Rc<std::cell::RefCell<Vec<DomainEvent>>>);
            impl crate::engine::DomainListener for Probe {
                fn notify_change(&mut self, _var: VarKey, change: DomainEvent) {
                    self.0.borrow_mut().push(change);
                }
            }
            let events = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
            let _handle = ce.add_domain_listener(v, Box::new(Probe(events.clone())));
            ce.close_domain(v).unwrap();
            seen.extend(events.borrow().iter().copied());
        }
        assert_eq!(seen, vec![DomainEvent::Closed, DomainEvent::Emptied]);
        assert!(ce.current_domain(v).is_empty());
    }

    #[test]
    fn typed_base_domain_must_match() {
        let mut ce = ConstraintEngine::new();
        let err = create_variable(
            &mut ce,
            "symbol",
            Domain::int_interval(0, 1),
            VariableSpec::named("bad"),
        );
        assert!(matches!(err, Err(Error::TypeMismatch(_))));
    }
}
