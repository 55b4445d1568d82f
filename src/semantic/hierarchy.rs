//! Subcircuit definitions and the "instantiates" graph between them.

use std::collections::{HashMap, HashSet};

use crate::components::ComponentKind;
use crate::dsl::{Program, Statement, SubcircuitDef};
use crate::error::{Position, SemanticError, SemanticErrorKind};

/// Every top-level subcircuit definition, by name.
#[derive(Debug, Default)]
pub struct Definitions<'a> {
    by_name: HashMap<&'a str, &'a SubcircuitDef>,
    /// Names in source order, for deterministic traversal
    order: Vec<&'a str>,
}

impl<'a> Definitions<'a> {
    /// Register the top-level definitions of a program.
    ///
    /// Duplicate names, names that shadow a component type, duplicate ports,
    /// and nested `Subcircuit`/`Simulate` statements are rejected here so an
    /// uninstantiated definition is still checked.
    pub fn collect(program: &'a Program) -> Result<Self, SemanticError> {
        let mut defs = Self::default();
        for statement in &program.statements {
            let Statement::SubcircuitDef(def) = statement else {
                continue;
            };
            if ComponentKind::from_type_name(&def.name).is_some() {
                return Err(SemanticError::at(
                    SemanticErrorKind::DuplicateId,
                    def.position,
                    format!("subcircuit name '{}' is a component type", def.name),
                ));
            }
            if defs.by_name.contains_key(def.name.as_str()) {
                return Err(SemanticError::at(
                    SemanticErrorKind::DuplicateId,
                    def.position,
                    format!("subcircuit '{}' is defined twice", def.name),
                ));
            }

            let mut ports = HashSet::new();
            for port in &def.ports {
                if !ports.insert(port.as_str()) {
                    return Err(SemanticError::at(
                        SemanticErrorKind::DuplicateId,
                        def.position,
                        format!("port '{}' of subcircuit '{}' is declared twice", port, def.name),
                    ));
                }
            }

            for inner in &def.body {
                let what = match inner {
                    Statement::SubcircuitDef(_) => "a nested Subcircuit definition",
                    Statement::Simulate(_) => "a Simulate block",
                    _ => continue,
                };
                return Err(SemanticError::at(
                    SemanticErrorKind::MisplacedStatement,
                    inner.position(),
                    format!("subcircuit '{}' cannot contain {}", def.name, what),
                ));
            }

            defs.by_name.insert(def.name.as_str(), def);
            defs.order.push(def.name.as_str());
        }
        Ok(defs)
    }

    pub fn get(&self, name: &str) -> Option<&'a SubcircuitDef> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Definitions instantiated directly by `def`'s body, in source order.
    fn children(&self, def: &'a SubcircuitDef) -> Result<Vec<(&'a str, Position)>, SemanticError> {
        let mut children = Vec::new();
        for statement in &def.body {
            if let Statement::SubcircuitInstance(inst) = statement {
                if !self.contains(&inst.definition) {
                    return Err(SemanticError::at(
                        SemanticErrorKind::UndefinedReference,
                        inst.position,
                        format!(
                            "subcircuit '{}' instantiates unknown subcircuit '{}'",
                            def.name, inst.definition
                        ),
                    ));
                }
                children.push((inst.definition.as_str(), inst.position));
            }
        }
        Ok(children)
    }

    /// Reject any cycle in the "instantiates" graph.
    ///
    /// Iterative depth-first search, so deep hierarchies cannot exhaust the
    /// call stack.
    pub fn check_acyclic(&self) -> Result<(), SemanticError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            InProgress,
            Done,
        }

        struct Frame<'d> {
            name: &'d str,
            children: Vec<(&'d str, Position)>,
            next: usize,
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();
        for &root in &self.order {
            if marks.contains_key(root) {
                continue;
            }
            let Some(root_def) = self.get(root) else {
                continue;
            };
            marks.insert(root, Mark::InProgress);
            let mut stack = vec![Frame {
                name: root,
                children: self.children(root_def)?,
                next: 0,
            }];

            while let Some(frame) = stack.last_mut() {
                let Some(&(child, position)) = frame.children.get(frame.next) else {
                    marks.insert(frame.name, Mark::Done);
                    stack.pop();
                    continue;
                };
                frame.next += 1;

                match marks.get(child) {
                    Some(Mark::Done) => {}
                    Some(Mark::InProgress) => {
                        let start = stack.iter().position(|f| f.name == child).unwrap_or(0);
                        let mut cycle: Vec<&str> = stack[start..].iter().map(|f| f.name).collect();
                        cycle.push(child);
                        return Err(SemanticError::at(
                            SemanticErrorKind::RecursiveSubcircuit,
                            position,
                            format!("subcircuit instantiates itself: {}", cycle.join(" -> ")),
                        ));
                    }
                    None => {
                        let Some(child_def) = self.get(child) else {
                            continue;
                        };
                        marks.insert(child, Mark::InProgress);
                        stack.push(Frame {
                            name: child,
                            children: self.children(child_def)?,
                            next: 0,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::parse_source;

    fn defs_error(src: &str) -> SemanticError {
        let program = parse_source(src).unwrap();
        Definitions::collect(&program)
            .and_then(|defs| defs.check_acyclic())
            .unwrap_err()
    }

    #[test]
    fn test_self_recursion() {
        let err = defs_error("Subcircuit A(p) { A inner(p=p); }");
        assert_eq!(err.kind, SemanticErrorKind::RecursiveSubcircuit);
        assert!(err.detail.contains("A -> A"));
    }

    #[test]
    fn test_mutual_recursion() {
        let err = defs_error(
            "Subcircuit A(p) { B b1(q=p); }
             Subcircuit B(q) { C c1(r=q); }
             Subcircuit C(r) { A a1(p=r); }",
        );
        assert_eq!(err.kind, SemanticErrorKind::RecursiveSubcircuit);
        assert!(err.detail.contains("A -> B -> C -> A"));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let program = parse_source(
            "Subcircuit Leaf(p) { Resistor R(1k); Connect(R.positive, p); Connect(R.negative, ground); }
             Subcircuit Left(p) { Leaf l(p=p); }
             Subcircuit Right(p) { Leaf l(p=p); }
             Subcircuit Top(p) { Left a(p=p); Right b(p=p); }",
        )
        .unwrap();
        let defs = Definitions::collect(&program).unwrap();
        assert_eq!(defs.len(), 4);
        assert!(defs.check_acyclic().is_ok());
    }

    #[test]
    fn test_definition_errors() {
        let err = defs_error("Subcircuit A(p) {} Subcircuit A(q) {}");
        assert_eq!(err.kind, SemanticErrorKind::DuplicateId);

        let err = defs_error("Subcircuit A(p, p) {}");
        assert_eq!(err.kind, SemanticErrorKind::DuplicateId);

        let err = defs_error("Subcircuit A(p) { Simulate { dc; } }");
        assert_eq!(err.kind, SemanticErrorKind::MisplacedStatement);

        let err = defs_error("Subcircuit A(p) { Missing m(x=p); }");
        assert_eq!(err.kind, SemanticErrorKind::UndefinedReference);
    }
}
