use pretty_assertions::assert_eq;
use reach::frontends::simple::{SimpleFrontend, run};
use reach::types::{
    BranchKinds, CounterMap, InstrumentedArtifact, SourceUnit, StructuralModel,
};
use reach::{CounterStore, FrontendRegistry, SourceFrontend, instrument};

fn instrumented(source: &str) -> (StructuralModel, InstrumentedArtifact, CounterMap) {
    let unit = SourceUnit::new("main.sim", source);
    let model = SimpleFrontend::new()
        .build(&unit, &BranchKinds::all())
        .expect("model");
    let (artifact, map) = instrument(&unit, &model).expect("instrument");
    (model, artifact, map)
}

#[test]
fn instrumented_program_behaves_identically() {
    let source = "\
fn fib(n) {
  if (n < 2) {
    return n;
  }
  return fib(n - 1) + fib(n - 2);
}
fn main() {
  let i = 0;
  while (i < 8) {
    switch (i % 3) {
      case 0: {
        print(fib(i));
      }
      default: {
        print(i * 10);
      }
    }
    i = i + 1;
  }
}
";
    let original = run(source, &()).expect("original run");
    let (_, artifact, map) = instrumented(source);
    let store = CounterStore::for_map(&map);
    let traced = run(&artifact.text, &store).expect("instrumented run");

    assert_eq!(original.output, traced.output);
    assert_eq!(original.result, traced.result);
    assert!(!store.snapshot().is_empty());
}

#[test]
fn instrumentation_is_deterministic() {
    let source = "\
fn main() {
  let x = 3;
  if (x > 1 && x < 10) {
    print(x);
  }
}
";
    let (model_a, artifact_a, map_a) = instrumented(source);
    let (model_b, artifact_b, map_b) = instrumented(source);
    assert_eq!(model_a, model_b);
    assert_eq!(artifact_a.text, artifact_b.text);
    assert_eq!(map_a, map_b);
    assert_eq!(
        serde_json::to_string(&map_a).unwrap(),
        serde_json::to_string(&map_b).unwrap()
    );

    let back: CounterMap =
        serde_json::from_str(&serde_json::to_string(&map_a).unwrap()).unwrap();
    assert_eq!(back, map_a);
}

#[test]
fn loop_exit_counts_the_false_branch() {
    let source = "\
fn main() {
  let i = 0;
  while (i < 3) {
    i = i + 1;
  }
  print(i);
}
";
    let (model, artifact, map) = instrumented(source);
    let store = CounterStore::for_map(&map);
    run(&artifact.text, &store).expect("run");
    let snap = store.snapshot();

    let mut branches = model.branches();
    let truth = branches.next().expect("true branch");
    let falsity = branches.next().expect("false branch");
    assert_eq!(snap.count(map.index_of(truth).unwrap()), 3);
    assert_eq!(snap.count(map.index_of(falsity).unwrap()), 1);
}

#[test]
fn switch_without_default_counts_the_no_match_outcome() {
    let source = "\
fn main() {
  switch (5) {
    case 1: {
      print(1);
    }
  }
  print(0);
}
";
    let (model, artifact, map) = instrumented(source);
    let store = CounterStore::for_map(&map);
    let exec = run(&artifact.text, &store).expect("run");
    assert_eq!(exec.output, vec!["0"]);

    let snap = store.snapshot();
    let mut branches = model.branches();
    let case0 = branches.next().expect("case branch");
    let default = branches.next().expect("default branch");
    assert_eq!(snap.count(map.index_of(case0).unwrap()), 0);
    assert_eq!(snap.count(map.index_of(default).unwrap()), 1);
}

#[test]
fn short_circuit_skips_the_right_operand_counters() {
    let source = "\
fn main() {
  let a = 0;
  if (a > 0 && a < 5) {
    print(a);
  }
}
";
    let (model, artifact, map) = instrumented(source);
    let store = CounterStore::for_map(&map);
    run(&artifact.text, &store).expect("run");
    let snap = store.snapshot();

    // site 0 is the whole condition, site 1 the right operand of &&
    let branches: Vec<_> = model.branches().collect();
    assert_eq!(branches.len(), 4);
    let hits: Vec<u64> = branches
        .iter()
        .map(|&b| snap.count(map.index_of(b).unwrap()))
        .collect();
    // condition false once; the right operand never evaluated
    assert_eq!(hits, vec![0, 1, 0, 0]);
}

#[test]
fn registry_routes_files_by_extension() {
    let tmp = tempfile::tempdir().expect("tmpdir");
    let path = tmp.path().join("unit.sim");
    std::fs::write(&path, "fn main() {\n  print(1);\n}\n").unwrap();

    let mut registry = FrontendRegistry::new();
    registry.register(SimpleFrontend::new());

    let unit = SourceUnit::from_file(&path).expect("load");
    let model = registry.build(&unit, &BranchKinds::all()).expect("build");
    assert_eq!(model.lines().count(), 1);

    let other = SourceUnit::new("unit.xyz", "whatever");
    let err = registry.build(&other, &BranchKinds::all()).unwrap_err();
    assert!(err.is_unit_scoped());
}

#[test]
fn probes_leave_comment_only_lines_alone() {
    let source = "\
// configuration constants
fn main() {
  // the answer
  print(42);
}
";
    let (model, artifact, _) = instrumented(source);
    assert_eq!(model.lines().count(), 1);
    assert!(artifact.text.contains("// configuration constants"));
    assert!(artifact.text.contains("// the answer"));
}
