//! Semantic analysis: symbol resolution, subcircuit flattening and net
//! unification.
//!
//! The analyzer turns a [`Program`] into a flattened [`Circuit`] in five
//! steps:
//!
//! 1. **Declarations**: subcircuit definitions and top-level ids are
//!    registered; duplicates are rejected.
//! 2. **Cycle check**: the "instantiates" graph between definitions must be
//!    acyclic, checked once before anything is expanded.
//! 3. **Expansion**: scopes are taken from an explicit work list. Each
//!    instance pushes a new scope for its definition's body, with ids and net
//!    names prefixed by the instance path (`D1.R1`, `D1.mid`).
//! 4. **Unification**: every terminal, port and named net is a node of one
//!    union-find forest; `ground` is node 0. `Connect` and port bindings
//!    are unions. The final partition gives the net ids, ground's being 0.
//! 5. **Connectivity**: every terminal must appear in some connection, and
//!    every net must reach ground.
//!
//! All state lives in one [`Analyzer`] per call; nothing is shared between
//! compile units.

mod hierarchy;
mod symbols;
mod union_find;

pub use hierarchy::Definitions;
pub use symbols::{Symbol, SymbolTable};
pub use union_find::UnionFind;

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::circuit::{validate_circuit, Circuit, FlatComponent, NetId};
use crate::components::{resolve_params, ComponentKind, ResolvedParams};
use crate::dsl::{Directive, Endpoint, Program, Statement, SubcircuitInstance};
use crate::error::{Position, SemanticError, SemanticErrorKind};

/// Resolve and flatten a parsed program.
pub fn analyze(program: &Program) -> Result<Circuit, SemanticError> {
    Analyzer::new(program)?.run()
}

/// A scope waiting on the work list: the top level, or one instance body.
#[derive(Debug)]
struct PendingScope<'a> {
    /// Instance ids from the top level down to this scope
    path: Vec<String>,
    body: &'a [Statement],
    /// Port name to the instance's port node
    ports: Vec<(String, usize)>,
}

impl<'a> PendingScope<'a> {
    fn is_top_level(&self) -> bool {
        self.path.is_empty()
    }

    /// Prefix a local name with this scope's instance path.
    fn qualify(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path.join("."), name)
        }
    }
}

/// Symbols of one scope plus the ids given to its instances, in order.
struct ScopeSymbols {
    table: SymbolTable,
    instance_ids: Vec<String>,
}

/// A component whose terminals are still union-find nodes.
#[derive(Debug)]
struct PendingComponent {
    kind: ComponentKind,
    id: String,
    params: ResolvedParams,
    nodes: [usize; 2],
    bound: [bool; 2],
    origin: Vec<String>,
    position: Position,
}

/// Analysis context for one compile unit.
pub struct Analyzer<'a> {
    program: &'a Program,
    definitions: Definitions<'a>,
    uf: UnionFind,
    ground: usize,
    /// Qualified net name to node, in creation order
    named_nets: Vec<(String, usize)>,
    named_index: HashMap<String, usize>,
    components: Vec<PendingComponent>,
    directives: Vec<Directive>,
    instances: usize,
}

impl<'a> Analyzer<'a> {
    /// Create the context and register subcircuit definitions.
    pub fn new(program: &'a Program) -> Result<Self, SemanticError> {
        let definitions = Definitions::collect(program)?;
        let mut uf = UnionFind::new();
        let ground = uf.add();
        Ok(Self {
            program,
            definitions,
            uf,
            ground,
            named_nets: Vec::new(),
            named_index: HashMap::new(),
            components: Vec::new(),
            directives: Vec::new(),
            instances: 0,
        })
    }

    /// Run the remaining steps and build the circuit.
    pub fn run(mut self) -> Result<Circuit, SemanticError> {
        let _span = tracing::info_span!("analyze", definitions = self.definitions.len()).entered();

        let program = self.program;
        let root = PendingScope {
            path: Vec::new(),
            body: &program.statements,
            ports: Vec::new(),
        };
        let root_symbols = self.declare_scope(&root)?;

        self.definitions.check_acyclic()?;

        let mut work = self.expand_scope(&root, root_symbols)?;
        work.reverse();
        while let Some(scope) = work.pop() {
            let symbols = self.declare_scope(&scope)?;
            let children = self.expand_scope(&scope, symbols)?;
            work.extend(children.into_iter().rev());
            self.instances += 1;
        }

        self.finish()
    }

    /// Register every id declared in a scope.
    fn declare_scope(&mut self, scope: &PendingScope<'a>) -> Result<ScopeSymbols, SemanticError> {
        let mut table = SymbolTable::new();
        for (port, node) in &scope.ports {
            table.define(port, Symbol::Port { node: *node }, None)?;
        }

        for statement in scope.body {
            match statement {
                Statement::Component(decl) => {
                    self.check_not_definition(scope, &decl.id, decl.position)?;
                    let params = resolve_params(decl.kind, &decl.id, &decl.params, decl.position)?;
                    let index = self.components.len();
                    table.define(
                        &decl.id,
                        Symbol::Component {
                            kind: decl.kind,
                            index,
                        },
                        Some(decl.position),
                    )?;
                    let nodes = [self.uf.add(), self.uf.add()];
                    self.components.push(PendingComponent {
                        kind: decl.kind,
                        id: scope.qualify(&decl.id),
                        params,
                        nodes,
                        bound: [false; 2],
                        origin: scope.path.clone(),
                        position: decl.position,
                    });
                }
                Statement::SubcircuitInstance(inst) => {
                    if let Some(id) = &inst.id {
                        self.check_not_definition(scope, id, inst.position)?;
                        let symbol = self.instance_symbol(inst)?;
                        table.define(id, symbol, Some(inst.position))?;
                    }
                }
                Statement::Simulate(block) => {
                    if !scope.is_top_level() {
                        return Err(SemanticError::at(
                            SemanticErrorKind::MisplacedStatement,
                            block.position,
                            "Simulate blocks are only allowed at top level",
                        ));
                    }
                    self.directives.extend(block.directives.iter().cloned());
                }
                Statement::SubcircuitDef(def) => {
                    if !scope.is_top_level() {
                        return Err(SemanticError::at(
                            SemanticErrorKind::MisplacedStatement,
                            def.position,
                            "Subcircuit definitions are only allowed at top level",
                        ));
                    }
                }
                Statement::Connect(_) => {}
            }
        }

        // Auto ids once every explicit id is known
        let mut instance_ids = Vec::new();
        for statement in scope.body {
            let Statement::SubcircuitInstance(inst) = statement else {
                continue;
            };
            let id = match &inst.id {
                Some(id) => id.clone(),
                None => {
                    let id = table.fresh_name(&inst.definition);
                    let symbol = self.instance_symbol(inst)?;
                    table.define(&id, symbol, Some(inst.position))?;
                    id
                }
            };
            instance_ids.push(id);
        }

        Ok(ScopeSymbols {
            table,
            instance_ids,
        })
    }

    /// At top level, component and instance ids share a namespace with
    /// subcircuit names.
    fn check_not_definition(
        &self,
        scope: &PendingScope<'a>,
        id: &str,
        position: Position,
    ) -> Result<(), SemanticError> {
        if scope.is_top_level() && self.definitions.contains(id) {
            return Err(SemanticError::at(
                SemanticErrorKind::DuplicateId,
                position,
                format!("'{}' is already declared as a subcircuit", id),
            ));
        }
        Ok(())
    }

    /// Allocate one node per port of the instantiated definition.
    fn instance_symbol(&mut self, inst: &SubcircuitInstance) -> Result<Symbol, SemanticError> {
        let def = self.definitions.get(&inst.definition).ok_or_else(|| {
            SemanticError::at(
                SemanticErrorKind::UndefinedReference,
                inst.position,
                format!("unknown component type or subcircuit '{}'", inst.definition),
            )
        })?;
        let ports = def
            .ports
            .iter()
            .map(|port| (port.clone(), self.uf.add()))
            .collect();
        Ok(Symbol::Instance {
            definition: def.name.clone(),
            ports,
        })
    }

    /// Apply a scope's connections and bindings, returning the instance
    /// bodies to expand next, in source order.
    fn expand_scope(
        &mut self,
        scope: &PendingScope<'a>,
        symbols: ScopeSymbols,
    ) -> Result<Vec<PendingScope<'a>>, SemanticError> {
        let ScopeSymbols {
            table,
            instance_ids,
        } = symbols;
        let mut children = Vec::new();
        let mut instance_ids = instance_ids.into_iter();

        for statement in scope.body {
            match statement {
                Statement::Connect(connect) => {
                    let mut nodes = Vec::with_capacity(connect.endpoints.len());
                    for endpoint in &connect.endpoints {
                        nodes.push(self.resolve_endpoint(scope, &table, endpoint, connect.position)?);
                    }
                    if let Some((&first, rest)) = nodes.split_first() {
                        for &node in rest {
                            self.uf.union(first, node);
                        }
                    }
                }
                Statement::SubcircuitInstance(inst) => {
                    let Some(id) = instance_ids.next() else {
                        continue;
                    };
                    children.push(self.bind_instance(scope, &table, inst, id)?);
                }
                _ => {}
            }
        }

        Ok(children)
    }

    /// Check an instance's bindings against its definition's ports and wire
    /// each port node to the bound net.
    fn bind_instance(
        &mut self,
        scope: &PendingScope<'a>,
        table: &SymbolTable,
        inst: &SubcircuitInstance,
        id: String,
    ) -> Result<PendingScope<'a>, SemanticError> {
        let def = self.definitions.get(&inst.definition).ok_or_else(|| {
            SemanticError::at(
                SemanticErrorKind::UndefinedReference,
                inst.position,
                format!("unknown subcircuit '{}'", inst.definition),
            )
        })?;
        let port_nodes: HashMap<String, usize> = match table.lookup(&id) {
            Some(Symbol::Instance { ports, .. }) => ports.clone(),
            _ => HashMap::new(),
        };

        let mut seen = HashSet::new();
        for binding in &inst.bindings {
            let Some(&port_node) = port_nodes.get(&binding.port) else {
                return Err(SemanticError::at(
                    SemanticErrorKind::PortMismatch,
                    binding.position,
                    format!("subcircuit '{}' has no port '{}'", def.name, binding.port),
                ));
            };
            if !seen.insert(binding.port.as_str()) {
                return Err(SemanticError::at(
                    SemanticErrorKind::PortMismatch,
                    binding.position,
                    format!("port '{}' of instance '{}' is bound twice", binding.port, id),
                ));
            }
            let net = self.resolve_endpoint(scope, table, &binding.net, binding.position)?;
            self.uf.union(port_node, net);
        }
        if let Some(missing) = def.ports.iter().find(|p| !seen.contains(p.as_str())) {
            return Err(SemanticError::at(
                SemanticErrorKind::PortMismatch,
                inst.position,
                format!(
                    "instance '{}' of '{}' leaves port '{}' unbound",
                    id, def.name, missing
                ),
            ));
        }

        let mut path = scope.path.clone();
        path.push(id);
        let ports = def
            .ports
            .iter()
            .filter_map(|p| port_nodes.get(p).map(|&node| (p.clone(), node)))
            .collect();
        Ok(PendingScope {
            path,
            body: &def.body,
            ports,
        })
    }

    /// Map an endpoint to its union-find node, marking terminals as bound.
    fn resolve_endpoint(
        &mut self,
        scope: &PendingScope<'a>,
        table: &SymbolTable,
        endpoint: &Endpoint,
        position: Position,
    ) -> Result<usize, SemanticError> {
        match endpoint {
            Endpoint::Ground => Ok(self.ground),
            Endpoint::Net(name) => match table.lookup(name) {
                Some(Symbol::Port { node }) => Ok(*node),
                Some(Symbol::Component { .. } | Symbol::Instance { .. }) => Err(SemanticError::at(
                    SemanticErrorKind::DuplicateId,
                    position,
                    format!("net name '{}' is already used as a component or instance id", name),
                )),
                None => Ok(self.named_net(scope.qualify(name))),
            },
            Endpoint::Terminal {
                reference,
                terminal,
            } => match table.lookup(reference) {
                Some(Symbol::Component { kind, index }) => {
                    let t = kind.terminal_index(terminal).ok_or_else(|| {
                        SemanticError::at(
                            SemanticErrorKind::UnknownTerminal,
                            position,
                            format!(
                                "{} '{}' has no terminal '{}' (expected one of: {})",
                                kind,
                                reference,
                                terminal,
                                kind.terminals().join(", ")
                            ),
                        )
                    })?;
                    let comp = &mut self.components[*index];
                    comp.bound[t] = true;
                    Ok(comp.nodes[t])
                }
                Some(Symbol::Instance { definition, ports }) => {
                    ports.get(terminal).copied().ok_or_else(|| {
                        SemanticError::at(
                            SemanticErrorKind::UnknownTerminal,
                            position,
                            format!(
                                "instance '{}' of '{}' has no port '{}'",
                                reference, definition, terminal
                            ),
                        )
                    })
                }
                Some(Symbol::Port { .. }) => Err(SemanticError::at(
                    SemanticErrorKind::UnknownTerminal,
                    position,
                    format!("port '{}' has no terminal '{}'", reference, terminal),
                )),
                None => Err(SemanticError::at(
                    SemanticErrorKind::UndefinedReference,
                    position,
                    format!("unknown component '{}'", reference),
                )),
            },
        }
    }

    fn named_net(&mut self, qualified: String) -> usize {
        if let Some(&node) = self.named_index.get(&qualified) {
            return node;
        }
        let node = self.uf.add();
        self.named_index.insert(qualified.clone(), node);
        self.named_nets.push((qualified, node));
        node
    }

    /// Number the nets, check connectivity and build the circuit.
    fn finish(mut self) -> Result<Circuit, SemanticError> {
        for comp in &self.components {
            if let Some(t) = comp.bound.iter().position(|b| !b) {
                return Err(SemanticError::at(
                    SemanticErrorKind::UnboundTerminal,
                    comp.position,
                    format!(
                        "terminal '{}.{}' is not connected to anything",
                        comp.id,
                        comp.kind.terminals()[t]
                    ),
                ));
            }
        }

        // Ground's partition first, then first sight in node creation order
        let mut net_of_root: HashMap<usize, NetId> = HashMap::new();
        let ground_root = self.uf.find(self.ground);
        net_of_root.insert(ground_root, NetId::GROUND);
        for node in 0..self.uf.len() {
            let root = self.uf.find(node);
            let next = NetId(net_of_root.len());
            net_of_root.entry(root).or_insert(next);
        }

        let mut net_names = BTreeMap::new();
        for (name, node) in &self.named_nets {
            let root = self.uf.find(*node);
            net_names.insert(name.clone(), net_of_root[&root]);
        }

        let mut components = Vec::with_capacity(self.components.len());
        for comp in std::mem::take(&mut self.components) {
            let [a, b] = comp.nodes;
            let terminals = [
                net_of_root[&self.uf.find(a)],
                net_of_root[&self.uf.find(b)],
            ];
            components.push(FlatComponent {
                kind: comp.kind,
                id: comp.id,
                value: comp.params.value,
                amplitude: comp.params.amplitude,
                terminals,
                origin: comp.origin,
            });
        }

        let circuit = Circuit {
            components,
            num_nets: net_of_root.len(),
            net_names,
            directives: self.directives,
        };
        validate_circuit(&circuit)?;

        debug!(
            components = circuit.components.len(),
            nets = circuit.num_nets,
            instances = self.instances,
            "flattened circuit"
        );
        Ok(circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::parse_source;
    use approx::assert_relative_eq;

    fn analyze_str(src: &str) -> Result<Circuit, SemanticError> {
        analyze(&parse_source(src).unwrap())
    }

    const DIVIDER: &str = "
        VoltageSource V1(5 V);
        Resistor R1(1 kohm);
        Resistor R2(2 kohm);
        Connect(V1.positive, R1.positive, in);
        Connect(R1.negative, R2.positive, mid);
        Connect(R2.negative, V1.negative, ground);
        Simulate { dc; }
    ";

    #[test]
    fn test_flat_divider() {
        let circuit = analyze_str(DIVIDER).unwrap();
        assert_eq!(circuit.components.len(), 3);
        assert_eq!(circuit.num_nets, 3);
        assert_eq!(circuit.directives, vec![Directive::Dc]);

        let (_, r1) = circuit.find_component("R1").unwrap();
        let (_, r2) = circuit.find_component("R2").unwrap();
        assert_eq!(r1.terminals[1], r2.terminals[0]);
        assert_eq!(r2.terminals[1], NetId::GROUND);
        assert_eq!(circuit.find_net("mid"), Some(r1.terminals[1]));
        assert_relative_eq!(r2.value.value(), 2000.0);
    }

    #[test]
    fn test_multi_endpoint_connect_is_one_net() {
        let circuit = analyze_str(
            "Resistor R1(1k); Resistor R2(1k); Resistor R3(1k);
             Connect(R1.positive, R2.positive, R3.positive);
             Connect(R1.negative, R2.negative, R3.negative, ground);",
        )
        .unwrap();
        assert_eq!(circuit.num_nets, 2);
        let nets: HashSet<NetId> = circuit.components.iter().map(|c| c.terminals[0]).collect();
        assert_eq!(nets.len(), 1);
    }

    #[test]
    fn test_subcircuit_expansion_prefixes_ids() {
        let circuit = analyze_str(
            "Subcircuit Divider(top, out) {
                 Resistor Ra(1k);
                 Resistor Rb(1k);
                 Connect(top, Ra.positive);
                 Connect(Ra.negative, Rb.positive, out, tap);
                 Connect(Rb.negative, ground);
             }
             VoltageSource V1(1 V);
             Connect(V1.negative, ground);
             Divider D1(top=V1.positive, out=first);
             Divider D2 top=first out=second;",
        )
        .unwrap();
        let ids: Vec<&str> = circuit.components.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["V1", "D1.Ra", "D1.Rb", "D2.Ra", "D2.Rb"]);

        let (_, d1_rb) = circuit.find_component("D1.Rb").unwrap();
        let (_, d2_ra) = circuit.find_component("D2.Ra").unwrap();
        assert_eq!(d1_rb.terminals[0], d2_ra.terminals[0]);
        assert_eq!(circuit.find_net("first"), Some(d1_rb.terminals[0]));
        assert_eq!(circuit.find_net("D1.tap"), circuit.find_net("first"));
        assert!(circuit.find_net("D2.tap").is_some());
        assert_eq!(d2_ra.origin, vec!["D2".to_string()]);
    }

    #[test]
    fn test_nested_instances_and_auto_ids() {
        let circuit = analyze_str(
            "Subcircuit Load(p) { Resistor R(1k); Connect(R.positive, p); Connect(R.negative, ground); }
             Subcircuit Pair(p) { Load(p=p); Load(p=p); }
             CurrentSource I1(1 mA);
             Connect(I1.negative, ground);
             Pair X(p=I1.positive);",
        )
        .unwrap();
        let ids: Vec<&str> = circuit.components.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["I1", "X.Load_1.R", "X.Load_2.R"]);
    }

    #[test]
    fn test_instance_port_as_endpoint() {
        let circuit = analyze_str(
            "Subcircuit Load(p) { Resistor R(1k); Connect(R.positive, p); Connect(R.negative, ground); }
             Resistor R1(1k);
             Connect(R1.positive, L.p);
             Load L(p=ground);
             Connect(R1.negative, ground);",
        );
        // R1 is shorted by the binding but still connected
        assert!(circuit.is_ok());
    }

    #[test]
    fn test_duplicate_ids() {
        let err = analyze_str("Resistor R1(1k); Resistor R1(2k);").unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::DuplicateId);
        assert_eq!(err.position, Some(Position::new(1, 18)));

        let err = analyze_str(
            "Resistor R1(1k); Connect(R1.positive, R1); Connect(R1.negative, ground);",
        )
        .unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::DuplicateId);
    }

    #[test]
    fn test_unbound_terminal() {
        let err = analyze_str("Resistor R1(1k); Connect(R1.positive, ground);").unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::UnboundTerminal);
        assert!(err.detail.contains("R1.negative"));
    }

    #[test]
    fn test_floating_island() {
        let err = analyze_str(
            "Resistor R1(1k); Resistor R2(1k); Resistor R3(1k);
             Connect(R1.positive, R1.negative, ground);
             Connect(R2.positive, R3.positive);
             Connect(R2.negative, R3.negative);",
        )
        .unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::FloatingNet);
    }

    #[test]
    fn test_port_mismatch() {
        let def = "Subcircuit D(a, b) { Resistor R(1k); Connect(R.positive, a); Connect(R.negative, b); }";

        let err = analyze_str(&format!("{} D X(a=ground);", def)).unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::PortMismatch);
        assert!(err.detail.contains("'b'"));

        let err = analyze_str(&format!("{} D X(a=ground, b=n, c=n);", def)).unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::PortMismatch);

        let err = analyze_str(&format!("{} D X(a=ground, a=n, b=n);", def)).unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::PortMismatch);
    }

    #[test]
    fn test_reference_errors() {
        let err = analyze_str("Resistor R1(1k); Connect(R1.anode, R9.positive);").unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::UnknownTerminal);

        let err = analyze_str("Resistor R1(1k); Connect(R1.positive, R9.positive);").unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::UndefinedReference);

        let err = analyze_str("Amplifier A1(in=ground);").unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::UndefinedReference);
    }

    #[test]
    fn test_recursive_subcircuit_detected_before_expansion() {
        let err = analyze_str(
            "Subcircuit A(p) { A again(p=p); }
             A top(p=ground);",
        )
        .unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::RecursiveSubcircuit);
    }

    #[test]
    fn test_analysis_does_not_mutate_program() {
        let program = parse_source(DIVIDER).unwrap();
        let before = program.clone();
        let first = analyze(&program).unwrap();
        let second = analyze(&program).unwrap();
        assert_eq!(program, before);
        assert_eq!(first, second);
    }
}
