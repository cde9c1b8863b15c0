#![cfg(feature = "serde")]

use trisolve::{jit, jit_grad, BytecodeTape, JitCache, NormObjective, ProblemConfig, SolverConfig};

#[test]
fn roundtrip_compiled_program_json() {
    let cache = JitCache::new();
    let compiled = jit(NormObjective::<f64>::default(), &cache);
    let x = [0.1, -0.2, 0.05];
    let program = compiled.program(&x).unwrap();

    let json = serde_json::to_string(&*program).unwrap();
    let restored: BytecodeTape<f64> = serde_json::from_str(&json).unwrap();

    let y = [0.2, 0.1, -0.15];
    let original = program.gradient(&y).unwrap();
    let reloaded = restored.gradient(&y).unwrap();
    assert_eq!(original, reloaded);
    assert_eq!(restored.guards(), program.guards());
}

#[test]
fn roundtrip_adjoint_program_keeps_guards() {
    let cache = JitCache::new();
    let objective = NormObjective::new(
        ProblemConfig {
            diag_offset: 0.0,
            ..ProblemConfig::default().with_size(6)
        },
        SolverConfig::default(),
    );
    let program = jit_grad(objective, &cache).program(&[1.0, 0.5]).unwrap();

    let json = serde_json::to_string(&*program).unwrap();
    let restored: BytecodeTape<f64> = serde_json::from_str(&json).unwrap();
    assert!(matches!(
        restored.eval(&[1.0, 0.0]),
        Err(trisolve::Error::SingularSystem { row: 0, .. })
    ));
}

#[test]
fn roundtrip_configs() {
    let objective = NormObjective::new(
        ProblemConfig::<f64>::default().with_size(32),
        SolverConfig { pivot_epsilon: 1e-9 },
    );
    let json = serde_json::to_string(&objective).unwrap();
    let back: NormObjective<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, objective);
}

#[test]
fn program_with_missing_entries_fails_to_load() {
    let json = r#"{
        "opcodes": ["Input"],
        "arg_indices": [[4294967295, 4294967295]],
        "values": [1.0],
        "num_inputs": 3,
        "output_indices": [0],
        "guards": []
    }"#;
    let err = serde_json::from_str::<BytecodeTape<f64>>(json).unwrap_err();
    assert!(err.to_string().contains("3 inputs declared"), "{err}");
}

#[test]
fn program_reading_a_later_entry_fails_to_load() {
    let json = r#"{
        "opcodes": ["Input", "Input", "Add"],
        "arg_indices": [[4294967295, 4294967295], [4294967295, 4294967295], [0, 9]],
        "values": [1.0, 2.0, 3.0],
        "num_inputs": 2,
        "output_indices": [2],
        "guards": []
    }"#;
    let err = serde_json::from_str::<BytecodeTape<f64>>(json).unwrap_err();
    assert!(err.to_string().contains("compilation failed"), "{err}");
}

#[test]
fn program_with_dangling_guard_fails_to_load() {
    let json = r#"{
        "opcodes": ["Input"],
        "arg_indices": [[4294967295, 4294967295]],
        "values": [1.0],
        "num_inputs": 1,
        "output_indices": [0],
        "guards": [{"index": 7, "row": 0, "epsilon": 1e-12}]
    }"#;
    assert!(serde_json::from_str::<BytecodeTape<f64>>(json).is_err());
}
