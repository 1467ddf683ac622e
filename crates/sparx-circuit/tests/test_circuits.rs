//! End-to-end tests: netlists built against the model library and evaluated.

use std::f64::consts::PI;
use std::sync::Arc;

use num_complex::Complex64;
use sparx_backend::BackendError;
use sparx_circuit::{
    BackendKind, Circuit, CircuitBuilder, CircuitCache, CircuitError, CircuitInfo, ReturnType,
};
use sparx_ir::{
    FnModel, Model, ModelSource, ModelTable, Netlist, RecursiveNetlist, SDense, SDict, SType,
    Settings, reciprocal, singlemode,
};
use sparx_models::Library;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const MZI: &str = r#"{
    "instances": {
        "lft": "coupler",
        "top": {"component": "straight", "settings": {"length": 25.0}},
        "btm": {"component": "straight", "settings": {"length": 15.0}},
        "rgt": "coupler"
    },
    "connections": {
        "lft,out0": "btm,in0",
        "btm,out0": "rgt,in0",
        "lft,out1": "top,in0",
        "top,out0": "rgt,in1"
    },
    "ports": {
        "in0": "lft,in0",
        "in1": "lft,in1",
        "out0": "rgt,out0",
        "out1": "rgt,out1"
    }
}"#;

fn mzi() -> Netlist {
    Netlist::from_json_str(MZI).unwrap()
}

fn build(netlist: impl Into<RecursiveNetlist>, backend: BackendKind) -> (Circuit, CircuitInfo) {
    CircuitBuilder::new(netlist)
        .with_models(Library::new())
        .with_backend(backend)
        .without_cache()
        .build()
        .unwrap()
}

fn build_err(netlist: impl Into<RecursiveNetlist>) -> CircuitError {
    CircuitBuilder::new(netlist)
        .with_models(Library::new())
        .without_cache()
        .build()
        .unwrap_err()
}

/// Transmission of a dispersion-free straight waveguide at `wl`.
fn straight_t(length: f64, wl: f64) -> Complex64 {
    Complex64::from_polar(1.0, 2.0 * PI * 2.34 * length / wl)
}

fn assert_dense_close(a: &SDense, b: &SDense, tol: f64) {
    assert_eq!(a.ports(), b.ports());
    assert_eq!(a.data().dim(), b.data().dim());
    for (x, y) in a.data().iter().zip(b.data().iter()) {
        let scale = x.norm().max(y.norm()).max(1.0);
        assert!((x - y).norm() <= tol * scale, "{x} vs {y}");
    }
}

fn single_straight(length: f64) -> Netlist {
    Netlist::from_json_str(&format!(
        r#"{{
            "instances": {{"wg": {{"component": "straight", "settings": {{"length": {length}}}}}}},
            "ports": {{"in0": "wg,in0", "out0": "wg,out0"}}
        }}"#
    ))
    .unwrap()
}

// ---------------------------------------------------------------------------
// Mach-Zehnder interferometer
// ---------------------------------------------------------------------------

#[test]
fn mzi_matches_two_path_interference() {
    let (circuit, info) = build(mzi(), BackendKind::Dense);
    assert_eq!(info.ports, vec!["in0", "in1", "out0", "out1"]);

    let s = circuit.evaluate_dense(&Settings::new()).unwrap();
    let expected = (0.5 * (straight_t(15.0, 1.55) - straight_t(25.0, 1.55))).norm_sqr();
    let got = s.get("in0", "out0", 0).unwrap().norm_sqr();
    assert!((got - expected).abs() < 1e-9, "{got} vs {expected}");

    // Lossless: all power leaves through the two outputs.
    let total = got + s.get("in0", "out1", 0).unwrap().norm_sqr();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn mzi_backends_agree_over_wavelength_sweep() {
    let settings = Settings::new().with("wl", sparx_ir::Param::linspace(1.5, 1.6, 5));
    let (dense, _) = build(mzi(), BackendKind::Dense);
    let dense = dense.evaluate_dense(&settings).unwrap();
    assert_eq!(dense.batch_len(), 5);

    for backend in [BackendKind::Klu, BackendKind::Forward] {
        let (circuit, info) = build(mzi(), backend);
        assert_eq!(info.backend, backend);
        let other = circuit.evaluate_dense(&settings).unwrap();
        assert_dense_close(&dense, &other, 1e-6);
    }
}

#[test]
fn result_independent_of_connection_order() {
    let reference = mzi();
    let mut permuted = mzi();
    permuted.connections.reverse();
    for conn in &mut permuted.connections {
        std::mem::swap(&mut conn.a, &mut conn.b);
    }

    let settings = Settings::new().with("top.length", 31.0).with("wl", 1.53);
    for backend in [BackendKind::Dense, BackendKind::Klu] {
        let (a, _) = build(reference.clone(), backend);
        let (b, _) = build(permuted.clone(), backend);
        assert_dense_close(
            &a.evaluate_dense(&settings).unwrap(),
            &b.evaluate_dense(&settings).unwrap(),
            1e-9,
        );
    }
}

#[test]
fn return_types() {
    let (dict, info) = build(mzi(), BackendKind::Dense);
    assert_eq!(info.return_type, ReturnType::Dict);
    assert!(matches!(dict.evaluate(&Settings::new()).unwrap(), SType::Dict(_)));

    let (coo, _) = CircuitBuilder::new(mzi())
        .with_models(Library::new())
        .with_return_type(ReturnType::Coo)
        .without_cache()
        .build()
        .unwrap();
    let SType::Coo(c) = coo.evaluate(&Settings::new()).unwrap() else {
        panic!("expected coo");
    };
    assert_eq!(c.ports().len(), 4);
}

// ---------------------------------------------------------------------------
// Resonant circuits
// ---------------------------------------------------------------------------

#[test]
fn fabry_perot_cavity_matches_closed_form() {
    let net = Netlist::from_json_str(
        r#"{
            "instances": {
                "m1": "mirror",
                "cavity": {"component": "straight", "settings": {"length": 3.0}},
                "m2": "mirror"
            },
            "connections": {"m1,out0": "cavity,in0", "cavity,out0": "m2,in0"},
            "ports": {"in0": "m1,in0", "out0": "m2,out0"}
        }"#,
    )
    .unwrap();
    let wls = [1.5, 1.52, 1.55, 1.58];
    let settings = Settings::new().with("wl", wls.to_vec()).with("wl0", wls.to_vec());

    let (dense, _) = build(net.clone(), BackendKind::Dense);
    let (klu, _) = build(net, BackendKind::Klu);
    let sd = dense.evaluate_dense(&settings).unwrap();
    let sk = klu.evaluate_dense(&settings).unwrap();
    assert_dense_close(&sd, &sk, 1e-9);

    // Two mirrors of power reflection R around a lossless cavity:
    // S21 = (i t)^2 e^{i phi} / (1 - R e^{2 i phi}).
    let r_power = 0.5;
    for (b, &wl) in wls.iter().enumerate() {
        let tw = straight_t(3.0, wl);
        let expected = -(1.0 - r_power) * tw / (1.0 - r_power * tw * tw);
        let got = sd.get("in0", "out0", b).unwrap();
        assert!((got - expected).norm() < 1e-9, "wl {wl}: {got} vs {expected}");
    }
}

#[test]
fn lossless_loop_is_reported_as_singular() {
    let net = Netlist::from_json_str(
        r#"{
            "instances": {"cp": {"component": "coupler", "settings": {"coupling": 0.0}}},
            "connections": {"cp,out0": "cp,in0"},
            "ports": {"in1": "cp,in1", "out1": "cp,out1"}
        }"#,
    )
    .unwrap();
    for backend in [BackendKind::Dense, BackendKind::Klu] {
        let (circuit, _) = build(net.clone(), backend);
        let err = circuit.evaluate_dense(&Settings::new()).unwrap_err();
        assert!(
            matches!(err, CircuitError::Backend(BackendError::Singular { sample: 0, .. })),
            "{backend}: {err}"
        );
    }
}

// ---------------------------------------------------------------------------
// Multimode
// ---------------------------------------------------------------------------

#[test]
fn multimode_mzi_replicates_single_mode_result() {
    let (single, _) = build(mzi(), BackendKind::Dense);
    let (multi, info) = CircuitBuilder::new(mzi())
        .with_models(Library::new())
        .with_modes(["TE", "TM"])
        .without_cache()
        .build()
        .unwrap();
    assert_eq!(info.modes.as_deref(), Some(&["TE".to_string(), "TM".to_string()][..]));
    assert_eq!(info.ports.len(), 8);
    assert!(info.ports.contains(&"out1@TM".to_string()));

    let s1 = single.evaluate_dense(&Settings::new()).unwrap();
    let sm = multi.evaluate_dense(&Settings::new()).unwrap();
    for mode in ["TE", "TM"] {
        let a = s1.get("in0", "out0", 0).unwrap();
        let b = sm.get(&format!("in0@{mode}"), &format!("out0@{mode}"), 0).unwrap();
        assert!((a - b).norm() < 1e-12);
    }
    assert_eq!(sm.get("in0@TE", "out0@TM", 0).unwrap(), Complex64::new(0.0, 0.0));
    assert_eq!(sm.get("in0@TM", "out1@TE", 0).unwrap(), Complex64::new(0.0, 0.0));

    let projected = singlemode(&SType::from(sm).into_sdict(), "TE").unwrap();
    assert!(projected.approx_eq(&SType::from(s1).into_sdict(), 1e-12));
}

#[test]
fn mode_resolved_model_keeps_cross_mode_terms() {
    let converter = FnModel::new(
        "converter",
        &["in0@TE", "in0@TM", "out0@TE", "out0@TM"],
        Settings::new(),
        |_| {
            let s = SDict::new()
                .with("in0@TE", "out0@TM", Complex64::new(1.0, 0.0))
                .with("in0@TM", "out0@TE", Complex64::new(1.0, 0.0));
            Ok(reciprocal(&s).into())
        },
    );
    let net = Netlist::from_json_str(
        r#"{
            "instances": {"conv": "converter", "wg": {"component": "straight", "settings": {"length": 25.0}}},
            "connections": {"wg,out0": "conv,in0"},
            "ports": {"in0": "wg,in0", "out0": "conv,out0"}
        }"#,
    )
    .unwrap();
    let (circuit, _) = CircuitBuilder::new(net)
        .with_models(ModelTable::new("custom").with("converter", converter.into_ref()))
        .with_models(Library::new())
        .with_modes(["TE", "TM"])
        .without_cache()
        .build()
        .unwrap();

    let s = circuit.evaluate_dense(&Settings::new()).unwrap();
    let t = straight_t(25.0, 1.55);
    assert!((s.get("in0@TE", "out0@TM", 0).unwrap() - t).norm() < 1e-12);
    assert_eq!(s.get("in0@TE", "out0@TE", 0).unwrap(), Complex64::new(0.0, 0.0));
}

// ---------------------------------------------------------------------------
// Build-time validation
// ---------------------------------------------------------------------------

#[test]
fn unconnected_port_is_named() {
    let mut net = mzi();
    net.ports.remove("out1");
    let err = build_err(net);
    assert!(matches!(
        &err,
        CircuitError::UnconnectedPort { instance, port } if instance == "rgt" && port == "out1"
    ));
    assert!(err.to_string().contains("rgt,out1"));
}

#[test]
fn unknown_component_is_named() {
    let net = Netlist::from_json_str(
        r#"{"instances": {"x": "splitter9000"}, "ports": {"in0": "x,in0"}}"#,
    )
    .unwrap();
    let err = build_err(net);
    assert!(matches!(
        &err,
        CircuitError::UnknownComponent { instance, component }
            if instance == "x" && component == "splitter9000"
    ));
}

#[test]
fn dangling_references_are_rejected() {
    let mut net = mzi();
    net.ports.insert("extra".into(), "ghost,in0".parse().unwrap());
    assert!(matches!(
        build_err(net),
        CircuitError::UnknownInstance { instance, .. } if instance == "ghost"
    ));

    let mut net = mzi();
    net.ports.insert("extra".into(), "top,in7".parse().unwrap());
    assert!(matches!(
        build_err(net),
        CircuitError::UnknownPort { instance, port } if instance == "top" && port == "in7"
    ));
}

#[test]
fn port_used_twice_is_rejected() {
    let mut net = mzi();
    net.ports.insert("tap".into(), "top,in0".parse().unwrap());
    assert!(matches!(
        build_err(net),
        CircuitError::DuplicatePort { instance, port } if instance == "top" && port == "in0"
    ));
}

#[test]
fn empty_and_cyclic_netlists_are_rejected() {
    assert!(matches!(build_err(Netlist::new()), CircuitError::EmptyNetlist));

    let cyclic = RecursiveNetlist::from_json_str(
        r#"{
            "top_level": {"instances": {"a": "loop"}, "ports": {}},
            "loop": {"instances": {"b": "top_level"}, "ports": {}}
        }"#,
    )
    .unwrap();
    assert!(matches!(
        build_err(cyclic),
        CircuitError::Ir(sparx_ir::IrError::CyclicNetlist(_))
    ));
}

#[test]
fn first_model_source_wins() {
    let constant = FnModel::new("constant", &["in0", "out0"], Settings::new(), |_| {
        Ok(SDict::new()
            .with("in0", "out0", Complex64::new(0.5, 0.0))
            .with("out0", "in0", Complex64::new(0.5, 0.0))
            .into())
    });
    let (circuit, info) = CircuitBuilder::new(single_straight(10.0))
        .with_models(ModelTable::new("override").with("straight", constant.into_ref()))
        .with_models(Library::new())
        .without_cache()
        .build()
        .unwrap();
    assert_eq!(info.instances["wg"].source, "override");
    let s = circuit.evaluate_dense(&Settings::new()).unwrap();
    assert_eq!(s.get("in0", "out0", 0).unwrap(), Complex64::new(0.5, 0.0));
}

#[test]
fn unused_instances_can_be_removed() {
    let mut net = mzi();
    net.add_instance("spare_a", sparx_ir::Instance::new("straight")).unwrap();
    net.add_instance("spare_b", sparx_ir::Instance::new("straight")).unwrap();
    let net = net
        .connect("spare_a,out0", "spare_b,in0")
        .unwrap()
        .connect("spare_b,out0", "spare_a,in0")
        .unwrap();

    let (_, info) = CircuitBuilder::new(net)
        .with_models(Library::new())
        .with_unused_instances_removed()
        .without_cache()
        .build()
        .unwrap();
    assert_eq!(info.instances.len(), 4);
    assert!(!info.instances.contains_key("spare_a"));
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[test]
fn settings_precedence() {
    let (circuit, _) = build(single_straight(25.0), BackendKind::Dense);
    let t = |settings: Settings| {
        circuit
            .evaluate_dense(&settings)
            .unwrap()
            .get("in0", "out0", 0)
            .unwrap()
    };

    let defaults = circuit.default_settings();
    assert_eq!(defaults.get("wg.length").and_then(|p| p.as_scalar()), Some(25.0));
    assert_eq!(defaults.get("wg.wl").and_then(|p| p.as_scalar()), Some(1.55));

    // Netlist setting over model default.
    assert!((t(Settings::new()) - straight_t(25.0, 1.55)).norm() < 1e-12);
    // Global call setting over netlist setting.
    assert!((t(Settings::new().with("length", 5.0)) - straight_t(5.0, 1.55)).norm() < 1e-12);
    // Path-addressed call setting over global call setting.
    let both = Settings::new().with("length", 5.0).with("wg.length", 7.0);
    assert!((t(both) - straight_t(7.0, 1.55)).norm() < 1e-12);
}

#[test]
fn unknown_settings_are_rejected() {
    let (circuit, _) = build(single_straight(25.0), BackendKind::Dense);

    let err = circuit
        .evaluate_dense(&Settings::new().with("nope.length", 1.0))
        .unwrap_err();
    assert!(matches!(err, CircuitError::UnknownSettingsPath(p) if p == "nope"));

    let err = circuit
        .evaluate_dense(&Settings::new().with("wg.width", 0.5))
        .unwrap_err();
    assert!(matches!(
        err,
        CircuitError::UnknownParameter { instance, param } if instance == "wg" && param == "width"
    ));

    // Undotted keys nobody declares are ignored.
    assert!(circuit.evaluate_dense(&Settings::new().with("width", 0.5)).is_ok());
}

#[test]
fn batch_mismatch_names_instance_and_parameter() {
    let (circuit, _) = build(mzi(), BackendKind::Dense);
    let settings = Settings::new()
        .with("btm.length", vec![10.0, 11.0, 12.0])
        .with("top.length", vec![20.0, 21.0]);
    let err = circuit.evaluate_dense(&settings).unwrap_err();
    assert!(
        matches!(
            &err,
            CircuitError::BatchMismatch { instance, param, expected: 3, got: 2 }
                if instance == "top" && param == "length"
        ),
        "{err}"
    );
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

const CASCADE: &str = r#"{
    "top_level": {
        "instances": {
            "a": {"component": "mzi", "settings": {"top.length": 30.0}},
            "b": "mzi"
        },
        "connections": {"a,out0": "b,in0", "a,out1": "b,in1"},
        "ports": {"in0": "a,in0", "in1": "a,in1", "out0": "b,out0", "out1": "b,out1"}
    },
    "mzi": MZI_BODY
}"#;

fn cascade() -> RecursiveNetlist {
    RecursiveNetlist::from_json_str(&CASCADE.replace("MZI_BODY", MZI)).unwrap()
}

#[test]
fn nested_matches_flattened() {
    let recnet = cascade();
    let flat = recnet.flatten(sparx_ir::DEFAULT_FLATTEN_SEPARATOR).unwrap();
    assert!(flat.instances.contains_key("a~top"));

    let (nested, info) = build(recnet, BackendKind::Dense);
    let (flattened, _) = build(flat, BackendKind::Dense);
    assert_eq!(info.instances["a"].source, "netlist");
    assert_eq!(info.instances["a.top"].component, "straight");
    assert_eq!(
        nested.default_settings().get("a.top.length").and_then(|p| p.as_scalar()),
        Some(30.0)
    );

    let s_nested = nested.evaluate_dense(&Settings::new()).unwrap();
    let s_flat = flattened.evaluate_dense(&Settings::new()).unwrap();
    assert_dense_close(&s_nested, &s_flat, 1e-9);

    // A path-addressed override reaches the same leaf in both forms.
    let s_nested = nested
        .evaluate_dense(&Settings::new().with("b.btm.length", 12.0).with("wl", 1.56))
        .unwrap();
    let s_flat = flattened
        .evaluate_dense(&Settings::new().with("b~btm.length", 12.0).with("wl", 1.56))
        .unwrap();
    assert_dense_close(&s_nested, &s_flat, 1e-9);
}

#[test]
fn circuit_can_be_used_as_a_model() {
    let (inner, _) = build(mzi(), BackendKind::Dense);
    let recnet = cascade();
    let top = recnet.top().unwrap().1.clone();

    let (composed, info) = CircuitBuilder::new(top)
        .with_models(ModelTable::new("circuits").with("mzi", Arc::new(inner)))
        .without_cache()
        .build()
        .unwrap();
    assert_eq!(info.instances["a"].source, "circuits");

    let (nested, _) = build(recnet, BackendKind::Dense);
    assert_dense_close(
        &composed.evaluate_dense(&Settings::new()).unwrap(),
        &nested.evaluate_dense(&Settings::new()).unwrap(),
        1e-9,
    );

    // A global sweep reaches the leaves inside the circuit model.
    let sweep = Settings::new().with("wl", vec![1.53, 1.56]);
    let swept = composed.evaluate_dense(&sweep).unwrap();
    assert_eq!(swept.batch_len(), 2);
    assert_dense_close(&swept, &nested.evaluate_dense(&sweep).unwrap(), 1e-9);
    assert!(
        (swept.get("in0", "out0", 0).unwrap() - swept.get("in0", "out0", 1).unwrap()).norm()
            > 1e-6
    );
}

#[test]
fn shared_model_source_serves_several_builders() {
    let source: Arc<dyn ModelSource> = Arc::new(Library::new());
    for length in [5.0, 50.0] {
        let (circuit, info) = CircuitBuilder::new(single_straight(length))
            .with_model_source(Arc::clone(&source))
            .without_cache()
            .build()
            .unwrap();
        assert_eq!(info.instances["wg"].source, "sparx");
        let s = circuit.evaluate_dense(&Settings::new()).unwrap();
        assert!((s.get("in0", "out0", 0).unwrap() - straight_t(length, 1.55)).norm() < 1e-12);
    }
}

#[test]
fn circuit_model_declares_global_keys() {
    let (inner, _) = build(mzi(), BackendKind::Dense);
    let declared = Model::settings(&inner);
    assert!(declared.contains("top.length"));
    assert_eq!(declared.get("wl").and_then(|p| p.as_scalar()), Some(1.55));
    assert_eq!(inner.global_settings().get("length").and_then(|p| p.as_scalar()), Some(10.0));
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[test]
fn concurrent_builds_share_one_compilation() {
    let cache = Arc::new(CircuitCache::new());
    let library = Library::new();

    let results: Vec<(Circuit, CircuitInfo)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let library = library.clone();
                scope.spawn(move || {
                    CircuitBuilder::new(mzi())
                        .with_models(library)
                        .with_cache(cache)
                        .build()
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(cache.len(), 1);
    assert_eq!(results.iter().filter(|(_, info)| !info.cache_hit).count(), 1);
    let first = results[0].0.compiled();
    assert!(results.iter().all(|(c, _)| Arc::ptr_eq(c.compiled(), first)));
}

#[test]
fn cache_key_excludes_parameter_values() {
    let cache = Arc::new(CircuitCache::new());
    let library = Library::new();
    let builder = |net: Netlist| {
        CircuitBuilder::new(net)
            .with_models(library.clone())
            .with_cache(Arc::clone(&cache))
            .build()
            .unwrap()
    };

    let (short, first) = builder(single_straight(5.0));
    let (long, second) = builder(single_straight(50.0));
    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert!(Arc::ptr_eq(short.compiled(), long.compiled()));

    let ts = short.evaluate_dense(&Settings::new()).unwrap();
    let tl = long.evaluate_dense(&Settings::new()).unwrap();
    assert!((ts.get("in0", "out0", 0).unwrap() - straight_t(5.0, 1.55)).norm() < 1e-12);
    assert!((tl.get("in0", "out0", 0).unwrap() - straight_t(50.0, 1.55)).norm() < 1e-12);

    // A different backend is a different structure.
    let (_, third) = CircuitBuilder::new(single_straight(5.0))
        .with_models(library.clone())
        .with_backend(BackendKind::Klu)
        .with_cache(Arc::clone(&cache))
        .build()
        .unwrap();
    assert!(!third.cache_hit);
    assert_eq!(cache.len(), 2);
}

// ---------------------------------------------------------------------------
// Sensitivities
// ---------------------------------------------------------------------------

#[test]
fn sensitivity_matches_analytic_derivative() {
    let (circuit, _) = build(single_straight(10.0), BackendKind::Dense);
    let wls = [1.5, 1.55];
    let settings = Settings::new().with("wl", wls.to_vec()).with("wl0", wls.to_vec());

    let ds = circuit.sensitivity(&settings, "wg.length", 1e-4).unwrap();
    assert_eq!(ds.batch_len(), 2);
    for (b, &wl) in wls.iter().enumerate() {
        let k = 2.0 * PI * 2.34 / wl;
        let expected = Complex64::new(0.0, k) * straight_t(10.0, wl);
        let got = ds.get("in0", "out0", b).unwrap();
        assert!((got - expected).norm() < 1e-4, "wl {wl}: {got} vs {expected}");
    }
}

#[test]
fn sensitivity_to_global_key_uses_leaf_default() {
    let (circuit, _) = build(single_straight(10.0), BackendKind::Dense);
    let ds = circuit.sensitivity(&Settings::new(), "wl", 1e-6).unwrap();
    assert_eq!(ds.batch_len(), 1);

    // At wl == wl0 the group index sets the dispersion: dphi/dwl = -2 pi ng L / wl^2.
    let dphi = -2.0 * PI * 3.4 * 10.0 / (1.55 * 1.55);
    let expected = Complex64::new(0.0, dphi) * straight_t(10.0, 1.55);
    let got = ds.get("in0", "out0", 0).unwrap();
    assert!((got - expected).norm() < 1e-3, "{got} vs {expected}");
}

#[test]
fn sensitivity_rejects_bad_requests() {
    let (circuit, _) = build(single_straight(10.0), BackendKind::Dense);
    assert!(matches!(
        circuit.sensitivity(&Settings::new(), "wg.length", 0.0),
        Err(CircuitError::Sensitivity(_))
    ));
    assert!(matches!(
        circuit.sensitivity(&Settings::new(), "width", 1e-3),
        Err(CircuitError::Sensitivity(_))
    ));
    assert!(matches!(
        circuit.sensitivity(&Settings::new().with("wg.length", vec![1.0, 2.0]), "wg.length", 1e-3),
        Err(CircuitError::Sensitivity(_))
    ));
}
