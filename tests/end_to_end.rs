//! End-to-end tests: source text through compile and simulate.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use circuit_dsl::circuit::{same_topology, NetId};
use circuit_dsl::dsl::{parse_source, Probe, ProbeKind, ProbeTarget};
use circuit_dsl::error::Position;
use circuit_dsl::{compile, simulate, CompileError, Directive, SemanticErrorKind, SimulationError};

const DIVIDER: &str = "
    # Two-resistor divider
    VoltageSource V1(5 V);
    Resistor R1(resistance=1 kohm);
    Resistor R2(2k);
    Connect(V1.positive, R1.positive);
    Connect(R1.negative, R2.positive, out);
    Connect(V1.negative, R2.negative, ground);
    Simulate {
        dc;
        plot(V(out), I(V1), I(R1));
    }
";

const RC_LOWPASS: &str = "
    VoltageSource Vin(voltage=0 V, amplitude=1 V);
    Resistor R1(1 kohm);
    Capacitor C1(100 nF);
    Connect(Vin.positive, R1.positive, in);
    Connect(R1.negative, C1.positive, out);
    Connect(Vin.negative, C1.negative, ground);
    Simulate {
        ac(dec, 10, 1 Hz, 1 MHz);
        plot(V(out), V(in));
    }
";

fn semantic_kind(src: &str) -> SemanticErrorKind {
    match compile(src) {
        Err(CompileError::Semantic(err)) => err.kind,
        other => panic!("expected a semantic error, got {:?}", other),
    }
}

#[test]
fn test_divider_dc() {
    let circuit = compile(DIVIDER).unwrap();
    let results = simulate(&circuit, &circuit.directives).unwrap();
    let dc = results.dc().unwrap();

    assert_relative_eq!(dc.probe("V(out)").unwrap(), 5.0 * 2000.0 / 3000.0, epsilon = 1e-9);
    // Current enters V1 at its positive terminal: 5/3 mA flows the other way
    assert_relative_eq!(dc.probe("I(V1)").unwrap(), -5.0 / 3000.0, epsilon = 1e-12);
    assert_relative_eq!(dc.probe("I(R1)").unwrap(), 5.0 / 3000.0, epsilon = 1e-12);
    assert_relative_eq!(dc.voltage("out").unwrap(), 10.0 / 3.0, epsilon = 1e-9);
}

#[test]
fn test_rc_lowpass_ac() {
    let circuit = compile(RC_LOWPASS).unwrap();
    let results = simulate(&circuit, &circuit.directives).unwrap();
    let ac = results.ac().unwrap();
    assert_eq!(ac.frequencies.len(), 61);

    let out = ac.magnitude("V(out)").unwrap();
    let input = ac.magnitude("V(in)").unwrap();
    let ratio: Vec<f64> = out.iter().zip(&input).map(|(o, i)| o / i).collect();

    assert_abs_diff_eq!(ratio[0], 1.0, epsilon = 1e-4);
    assert!(*ratio.last().unwrap() < 0.01);
    assert!(ratio.windows(2).all(|w| w[1] <= w[0]));

    // Single pole at fc = 1 / (2π RC) ≈ 1591.5 Hz
    let fc = 1.0 / (2.0 * std::f64::consts::PI * 1e3 * 100e-9);
    for (f, r) in ac.frequencies.iter().zip(&ratio) {
        let expected = 1.0 / (1.0 + (f / fc).powi(2)).sqrt();
        assert_relative_eq!(*r, expected, max_relative = 1e-9);
    }
}

#[test]
fn test_single_frequency_ac() {
    let circuit = compile(
        "VoltageSource V1(0 V, 2 V);
         Resistor R1(1 kohm);
         Inductor L1(1 H);
         Connect(V1.positive, R1.positive);
         Connect(R1.negative, L1.positive, out);
         Connect(V1.negative, L1.negative, ground);
         Simulate { ac(159.15494309189535); plot(V(out)); }",
    )
    .unwrap();
    let results = simulate(&circuit, &circuit.directives).unwrap();
    let ac = results.ac().unwrap();
    assert_eq!(ac.frequencies.len(), 1);
    // ωL = R, so the inductor takes half the power: |V| = 2/√2, +45°
    assert_relative_eq!(ac.magnitude("V(out)").unwrap()[0], 2.0_f64.sqrt(), epsilon = 1e-6);
    assert_relative_eq!(ac.phase_degrees("V(out)").unwrap()[0], 45.0, epsilon = 1e-4);
}

#[test]
fn test_rc_transient_charges() {
    let circuit = compile(
        "VoltageSource V1(1 V);
         Resistor R1(1 kohm);
         Capacitor C1(1 uF);
         Connect(V1.positive, R1.positive);
         Connect(R1.negative, C1.positive, cap);
         Connect(V1.negative, C1.negative, ground);
         Simulate { transient(0, 5 ms, 1 us); plot(V(cap), I(C1)); }",
    )
    .unwrap();
    let results = simulate(&circuit, &circuit.directives).unwrap();
    let tran = results.transient().unwrap();
    assert_eq!(tran.times.len(), 5001);
    assert_relative_eq!(tran.times[1000], 1e-3, epsilon = 1e-12);

    let v = &tran.get("V(cap)").unwrap().values;
    let i = &tran.get("I(C1)").unwrap().values;
    // Uncharged start; one time constant later about 63%
    assert!(v[0] < 1e-2);
    assert_abs_diff_eq!(v[1000], 1.0 - (-1.0_f64).exp(), epsilon = 1e-3);
    assert_abs_diff_eq!(v[5000], 1.0 - (-5.0_f64).exp(), epsilon = 1e-3);
    // The resistor current equals the capacitor current at every step
    for k in [0, 10, 1000, 5000] {
        assert_relative_eq!(i[k], (1.0 - v[k]) / 1e3, max_relative = 1e-6);
    }
}

#[test]
fn test_subcircuit_instantiated_twice() {
    let circuit = compile(
        "Subcircuit Divider(top, mid) {
             Resistor Ra(1 kohm);
             Resistor Rb(1 kohm);
             Connect(Ra.positive, top);
             Connect(Ra.negative, Rb.positive, mid);
             Connect(Rb.negative, ground);
         }
         VoltageSource V1(8 V);
         Divider D1(top=a, mid=b);
         Divider D2 top=b mid=c;
         Connect(V1.positive, a);
         Connect(V1.negative, ground);
         Simulate { dc; plot(V(b), V(c), V(D2.Ra)); }",
    )
    .unwrap();

    let ids: Vec<&str> = circuit.components.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["V1", "D1.Ra", "D1.Rb", "D2.Ra", "D2.Rb"]);
    assert_ne!(
        circuit.find_component("D1.Ra").unwrap().1.terminals,
        circuit.find_component("D2.Ra").unwrap().1.terminals
    );

    let results = simulate(&circuit, &circuit.directives).unwrap();
    let dc = results.dc().unwrap();
    // D2 loads D1's lower leg: 1k || 2k = 2/3k below b
    let vb = 8.0 * (2.0 / 3.0) / (1.0 + 2.0 / 3.0);
    assert_relative_eq!(dc.probe("V(b)").unwrap(), vb, epsilon = 1e-9);
    assert_relative_eq!(dc.probe("V(c)").unwrap(), vb / 2.0, epsilon = 1e-9);
    assert_relative_eq!(dc.probe("V(D2.Ra)").unwrap(), vb / 2.0, epsilon = 1e-9);
}

#[test]
fn test_deep_hierarchy_paths() {
    let mut src = String::from(
        "Subcircuit L0(p, n) { Resistor R(1 kohm); Connect(R.positive, p); Connect(R.negative, n); }\n",
    );
    for level in 1..40 {
        src.push_str(&format!(
            "Subcircuit L{level}(p, n) {{ L{prev} a(p=p, n=m); L{prev} b(p=m, n=n); }}\n",
            level = level,
            prev = level - 1
        ));
    }
    // Forty definitions are cycle-checked; only L3 (eight resistors) is expanded
    src.push_str(
        "CurrentSource I1(1 mA);
         L3 top(p=x, n=ground);
         Connect(I1.positive, x);
         Connect(I1.negative, ground);
         Simulate { dc; plot(V(x), V(top.a.m)); }",
    );
    let circuit = compile(&src).unwrap();
    assert_eq!(circuit.components.len(), 1 + 8);
    assert!(circuit.find_component("top.a.b.a.R").is_some());

    let results = simulate(&circuit, &circuit.directives).unwrap();
    let dc = results.dc().unwrap();
    // 1 mA through eight 1k resistors in series
    assert_relative_eq!(dc.probe("V(x)").unwrap(), 8.0, epsilon = 1e-9);
    assert_relative_eq!(dc.probe("V(top.a.m)").unwrap(), 6.0, epsilon = 1e-9);
}

#[test]
fn test_unbound_terminal() {
    let kind = semantic_kind(
        "VoltageSource V1(5 V);
         Resistor R1(1 kohm);
         Connect(V1.positive, R1.positive);
         Connect(V1.negative, ground);",
    );
    assert_eq!(kind, SemanticErrorKind::UnboundTerminal);
}

#[test]
fn test_floating_net() {
    let kind = semantic_kind(
        "VoltageSource V1(5 V);
         Resistor R1(1 kohm);
         Connect(V1.positive, R1.positive);
         Connect(V1.negative, R1.negative, ground);
         Resistor R2(1 kohm);
         Resistor R3(1 kohm);
         Connect(R2.positive, R3.positive, island);
         Connect(R2.negative, R3.negative);",
    );
    assert_eq!(kind, SemanticErrorKind::FloatingNet);
}

#[test]
fn test_floating_network_in_isolation_is_singular() {
    use circuit_dsl::circuit::{Circuit, FlatComponent};
    use circuit_dsl::components::ComponentKind;
    use circuit_dsl::dsl::{Quantity, Unit};

    // Built directly, bypassing validation: nets 1 and 2 never reach ground
    let resistor = |id: &str, a: usize, b: usize| FlatComponent {
        kind: ComponentKind::Resistor,
        id: id.to_string(),
        value: Quantity::new(1e3, Unit::Ohm),
        amplitude: None,
        terminals: [NetId(a), NetId(b)],
        origin: Vec::new(),
    };
    let circuit = Circuit {
        components: vec![resistor("R1", 1, 2), resistor("R2", 2, 1)],
        num_nets: 3,
        ..Default::default()
    };
    let err = simulate(&circuit, &[Directive::Dc]).unwrap_err();
    assert_eq!(err, SimulationError::singular(0, None));
}

#[test]
fn test_recursive_subcircuit() {
    let kind = semantic_kind(
        "Subcircuit A(p) { A inner(p=p); }
         Resistor R1(1 kohm);
         Connect(R1.positive, R1.negative, ground);",
    );
    assert_eq!(kind, SemanticErrorKind::RecursiveSubcircuit);
}

#[test]
fn test_port_mismatch() {
    let def = "Subcircuit S(a, b) { Resistor R(1 kohm); Connect(R.positive, a); Connect(R.negative, b); }";
    assert_eq!(
        semantic_kind(&format!("{def} S x(a=ground);")),
        SemanticErrorKind::PortMismatch
    );
    assert_eq!(
        semantic_kind(&format!("{def} S x(a=ground, b=ground, c=ground);")),
        SemanticErrorKind::PortMismatch
    );
}

#[test]
fn test_duplicate_id() {
    let kind = semantic_kind(
        "Resistor R1(1 kohm);
         Resistor R1(2 kohm);
         Connect(R1.positive, R1.negative, ground);",
    );
    assert_eq!(kind, SemanticErrorKind::DuplicateId);
}

#[test]
fn test_syntax_error_position() {
    let err = compile("Resistor R1(1 kohm)\nConnect(R1.positive, ground);").unwrap_err();
    assert!(matches!(err, CompileError::Syntax(_)));
    assert_eq!(err.position(), Some(Position::new(2, 1)));
}

#[test]
fn test_lex_error() {
    let err = compile("Resistor R1(1 kohm) @").unwrap_err();
    assert!(matches!(err, CompileError::Lex(_)));
}

#[test]
fn test_parse_is_deterministic() {
    assert_eq!(parse_source(RC_LOWPASS).unwrap(), parse_source(RC_LOWPASS).unwrap());
    assert_eq!(compile(DIVIDER).unwrap(), compile(DIVIDER).unwrap());
}

#[test]
fn test_round_trip_through_printer() {
    for src in [DIVIDER, RC_LOWPASS] {
        let circuit = compile(src).unwrap();
        let printed = circuit.to_source();
        let again = compile(&printed).unwrap();
        assert!(same_topology(&circuit, &again), "{}", printed);

        let before = simulate(&circuit, &circuit.directives).unwrap();
        let after = simulate(&again, &again.directives).unwrap();
        assert_eq!(before.len(), after.len());
        if let (Some(a), Some(b)) = (before.dc(), after.dc()) {
            for ((_, va), (_, vb)) in a.probes.iter().zip(&b.probes) {
                assert_relative_eq!(*va, *vb, epsilon = 1e-12);
            }
        }
    }
}

#[test]
fn test_unknown_probe() {
    let circuit = compile(DIVIDER).unwrap();
    let err = simulate(
        &circuit,
        &[Directive::Dc, Directive::Plot(vec![Probe::voltage("R9")])],
    )
    .unwrap_err();
    assert!(matches!(err, SimulationError::UnknownProbe { .. }));
}

#[test]
fn test_oversized_sweeps_are_invalid_directives() {
    let circuit = compile(RC_LOWPASS).unwrap();
    for source in [
        "Simulate { transient(0, 1 s, 1e-20 s); }",
        "Simulate { ac(dec, 1e18, 1 Hz, 1e10 Hz); }",
    ] {
        let directives = match parse_source(source).unwrap().statements.remove(0) {
            circuit_dsl::dsl::Statement::Simulate(block) => block.directives,
            other => panic!("expected a Simulate block, got {:?}", other),
        };
        let err = simulate(&circuit, &directives).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidDirective { directive: 0, .. }));
    }
}

#[test]
fn test_ground_probe_and_defaults() {
    let circuit = compile(DIVIDER).unwrap();
    let results = simulate(&circuit, &[Directive::Dc]).unwrap();
    let dc = results.dc().unwrap();
    // Without plot, every non-ground net is probed
    assert_eq!(dc.probes.len(), circuit.num_free_nets());

    let ground = Probe {
        kind: ProbeKind::Voltage,
        target: ProbeTarget::Ground,
    };
    let directives = [
        Directive::Dc,
        Directive::Plot(vec![Probe::voltage("out")]),
        Directive::Plot(vec![ground]),
    ];
    let with_ground = simulate(&circuit, &directives).unwrap();
    assert_eq!(with_ground.dc().unwrap().probes.len(), 2);
    assert_eq!(with_ground.dc().unwrap().probe("V(ground)"), Some(0.0));
}
