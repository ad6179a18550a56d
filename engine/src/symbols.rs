//! Interning of symbol and string labels.
//!
//! Labels are interned once per engine (there is no process-global table) and
//! referenced everywhere else by their [SymId], which is cheap to copy, compare
//! and order deterministically.

use hashbrown::HashMap;

use crate::create_key_type;

create_key_type!(pub SymId);

/// Associates each interned label to a [SymId] and back.
#[derive(Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<String>,
    ids: HashMap<String, SymId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// Interns `text`, returning the existing id when already present.
    pub fn intern(&mut self, text: &str) -> SymId {
        if let Some(&id) = self.ids.get(text) {
            return id;
        }
        let id = SymId::from(self.symbols.len());
        self.symbols.push(text.to_string());
        self.ids.insert(text.to_string(), id);
        id
    }

    /// Looks up an already-interned label.
    pub fn id_of(&self, text: &str) -> Option<SymId> {
        self.ids.get(text).copied()
    }

    pub fn name(&self, id: SymId) -> &str {
        &self.symbols[usize::from(id)]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl std::fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, sym) in self.symbols.iter().enumerate() {
            writeln!(f, "{:?}\t<- {:?}", SymId::from(i), sym)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut table = SymbolTable::new();
        let a = table.intern("rover");
        let b = table.intern("lander");
        let a2 = table.intern("rover");
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(table.name(a), "rover");
        assert_eq!(table.id_of("lander"), Some(b));
        assert_eq!(table.id_of("absent"), None);
    }

    #[test]
    fn ids_order_by_first_interning() {
        let mut table = SymbolTable::new();
        let first = table.intern("z");
        let second = table.intern("a");
        assert!(first < second);
    }
}
