//! Per-scope symbol tables.

use std::collections::HashMap;

use crate::components::ComponentKind;
use crate::error::{Position, SemanticError, SemanticErrorKind};

/// What an identifier names inside one scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    /// A component declared in this scope; index into the analyzer's component list
    Component { kind: ComponentKind, index: usize },
    /// A subcircuit instance with one union-find node per port
    Instance {
        definition: String,
        ports: HashMap<String, usize>,
    },
    /// A port of the enclosing subcircuit, aliasing an outer union-find node
    Port { node: usize },
}

/// Identifiers declared in one scope (the top level or one instance body).
///
/// Component-type names are not stored here; they are fixed keywords of the
/// language and resolve the same in every scope.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: HashMap<String, (Symbol, Option<Position>)>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an identifier; a second definition is [`SemanticErrorKind::DuplicateId`].
    pub fn define(
        &mut self,
        name: &str,
        symbol: Symbol,
        position: Option<Position>,
    ) -> Result<(), SemanticError> {
        if let Some((_, first)) = self.entries.get(name) {
            let detail = match first {
                Some(at) => format!("identifier '{}' already declared at {}", name, at),
                None => format!("identifier '{}' already declared", name),
            };
            return Err(match position {
                Some(at) => SemanticError::at(SemanticErrorKind::DuplicateId, at, detail),
                None => SemanticError::new(SemanticErrorKind::DuplicateId, detail),
            });
        }
        self.entries.insert(name.to_string(), (symbol, position));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.entries.get(name).map(|(symbol, _)| symbol)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// First `<base>_<k>` (k >= 1) not yet declared.
    pub fn fresh_name(&self, base: &str) -> String {
        (1..)
            .map(|k| format!("{}_{}", base, k))
            .find(|name| !self.contains(name))
            .unwrap_or_else(|| base.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_is_rejected() {
        let mut table = SymbolTable::new();
        let symbol = Symbol::Component {
            kind: ComponentKind::Resistor,
            index: 0,
        };
        table
            .define("R1", symbol.clone(), Some(Position::new(1, 1)))
            .unwrap();
        let err = table
            .define("R1", symbol, Some(Position::new(2, 1)))
            .unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::DuplicateId);
        assert_eq!(err.position, Some(Position::new(2, 1)));
        assert!(err.detail.contains("line 1"));
    }

    #[test]
    fn test_fresh_name_skips_taken() {
        let mut table = SymbolTable::new();
        table.define("Div_1", Symbol::Port { node: 0 }, None).unwrap();
        assert_eq!(table.fresh_name("Div"), "Div_2");
        assert_eq!(table.fresh_name("Amp"), "Amp_1");
    }
}
