//! End-to-end generation: IDL JSON in, C++ buffers and registrations out.

mod common;

use std::fs;
use std::rc::Rc;

use ani_bindgen::codegen::CONSTRUCTOR_PATH;
use ani_bindgen::ir::{FuncId, PackageId};
use ani_bindgen::*;
use ani_bindgen_runtime::prelude::*;
use common::*;
use pretty_assertions::assert_eq;

fn calc() -> PackageGroup {
    load(&group_json(&[package(
        "calc",
        &format!(
            r#""functions": [{}, {}]"#,
            func(
                "Add",
                &[param("a", &scalar("i32")), param("b", &scalar("i32"))],
                Some(&scalar("i32"))
            ),
            func("Log", &[param("msg", &scalar("string"))], None)
        ),
    )]))
}

// ============================================================================
// Memoization
// ============================================================================

#[test]
fn test_analyses_are_computed_once() {
    let group = calc();
    let mut am = AnalysisManager::new(&group, GeneratorConfig::default());

    let first = am.package_info(PackageId(0)).unwrap();
    let ty = group.function(FuncId(0)).params[0].ty;
    let ty_info = am.type_info(ty, PackageId(0)).unwrap();
    let runs = am.computations();

    let second = am.package_info(PackageId(0)).unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    assert!(Rc::ptr_eq(&ty_info, &am.type_info(ty, PackageId(0)).unwrap()));
    assert!(Rc::ptr_eq(&am.func_info(FuncId(1)), &am.func_info(FuncId(1))));
    // Only the function analysis was new.
    assert_eq!(am.computations(), runs + 1);
}

// ============================================================================
// Naming
// ============================================================================

#[test]
fn test_managed_names_and_diagnostics() {
    let group = load(&group_json(&[package(
        "ui",
        r#""functions": [
            {"name": "GetCount", "returns": {"kind": "i32"}},
            {"name": "OnClick", "params": [{"name": "cb", "type": {"kind": "callback"}}],
             "attrs": [{"name": "on_off"}]},
            {"name": "Fetch", "returns": {"kind": "i32"},
             "attrs": [{"name": "static", "args": ["Loader"]}, {"name": "get"}]}
        ]"#,
    )]));
    let mut am = AnalysisManager::new(&group, GeneratorConfig::default());

    let count = am.func_info(FuncId(0));
    assert_eq!(count.sts_func_name.as_deref(), Some("getCount"));
    assert_eq!(count.sts_native_name, "GetCount_inner");

    let click = am.func_info(FuncId(1));
    let on_off = click.on_off.clone().unwrap();
    assert_eq!((on_off.member.as_str(), on_off.event.as_str()), ("on", "click"));

    // A static getter whose name cannot be derived falls back to a plain name.
    let fetch = am.func_info(FuncId(2));
    assert_eq!(fetch.static_scope.as_deref(), Some("Loader"));
    assert_eq!(fetch.get_name, None);
    assert_eq!(fetch.sts_func_name.as_deref(), Some("fetch"));

    let generation = AniCodeGenerator::new(am).run().unwrap();
    assert_eq!(
        messages(&generation),
        vec!["@get method name must start with \"Get/get\" or have @get argument"]
    );
    assert!(generation.has_errors());

    let names: Vec<&str> = generation.registrations[0].infos[0]
        .members
        .iter()
        .map(|m| m.sts_name.as_str())
        .collect();
    assert_eq!(names, vec!["GetCount_inner", "OnClick_inner", "Fetch_inner"]);
}

// ============================================================================
// Output set
// ============================================================================

#[test]
fn test_output_files() {
    let group = calc();
    let generation = run(&group);
    let paths: Vec<&str> = generation.output.paths().collect();
    assert!(paths.contains(&"src/calc.ani.cpp"));
    assert!(paths.contains(&"include/calc.ani.hpp"));
    assert_eq!(paths.last(), Some(&CONSTRUCTOR_PATH));
    assert_eq!(
        generation.stats.to_string(),
        "1 packages, 2 functions, 0 methods, 0 conversion files, 0 diagnostics"
    );
    assert!(!generation.has_errors());
}

#[test]
fn test_flush_writes_every_buffer() {
    let group = calc();
    let generation = run(&group);
    let expected = rendered(&generation, CONSTRUCTOR_PATH);
    let count = generation.output.len();

    let dir = tempfile::tempdir().unwrap();
    let written = generation.output.flush(dir.path()).unwrap();
    assert_eq!(written.len(), count);
    assert_eq!(
        fs::read_to_string(dir.path().join(CONSTRUCTOR_PATH)).unwrap(),
        expected
    );
    assert!(dir.path().join("include/calc.ani.hpp").is_file());
}

#[test]
fn test_module_prefix_reaches_registration() {
    let group = calc();
    let config = GeneratorConfig {
        module_prefix: Some("@ohos".to_string()),
        ..GeneratorConfig::default()
    };
    let generation = generate(&group, config).unwrap();
    let info = &generation.registrations[0].infos[0];
    assert_eq!(info.scope, ScopeKind::Module);
    assert_eq!(info.impl_desc, "L@ohos/calc;");
    let source = rendered(&generation, "src/calc.ani.cpp");
    assert!(source.contains("L@ohos/calc;"));
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_registration_replays_into_env() {
    let group = load(&group_json(&[
        package(
            "geo",
            r#""interfaces": [
                {"name": "Named", "methods": [{"name": "GetName", "returns": {"kind": "string"},
                    "attrs": [{"name": "get"}]}]},
                {"name": "Shape", "extends": [{"kind": "named", "name": "Named"}],
                 "methods": [{"name": "Area", "returns": {"kind": "f64"}}]}
            ],
            "functions": [{"name": "Unit", "returns": {"kind": "f64"}}]"#,
        ),
        package("empty", ""),
    ]));
    let generation = run(&group);

    let mut env = MockEnv::new();
    for registration in &generation.registrations {
        registration.register(&mut env).unwrap();
    }
    let bound: Vec<(ScopeKind, &str, usize)> = env
        .bindings()
        .iter()
        .map(|b| (b.scope, b.desc.as_str(), b.names.len()))
        .collect();
    assert_eq!(
        bound,
        vec![
            (ScopeKind::Module, "Lgeo;", 1),
            (ScopeKind::Class, "Lgeo/Named_inner;", 2),
            (ScopeKind::Class, "Lgeo/Shape_inner;", 3),
        ]
    );

    // Every registered entry point is defined in the package source.
    let source = rendered(&generation, "src/geo.ani.cpp");
    for info in &generation.registrations[0].infos {
        for member in &info.members {
            assert!(
                source.contains(&format!(" {}(", member.symbol)),
                "{} is registered but not defined",
                member.symbol
            );
        }
    }

    // Packages without members still get a register function, in order.
    let ctor = rendered(&generation, CONSTRUCTOR_PATH);
    let geo = ctor.find("geo::ANIRegister(env)").unwrap();
    let empty = ctor.find("empty::ANIRegister(env)").unwrap();
    assert!(geo < empty);
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn test_map_without_record_is_a_diagnostic() {
    let group = load(&group_json(&[package(
        "kv",
        &format!(
            r#""functions": [{}]"#,
            func(
                "Put",
                &[param(
                    "m",
                    r#"{"kind": "map", "key": {"kind": "string"}, "value": {"kind": "i32"}}"#
                )],
                None
            )
        ),
    )]));
    let generation = run(&group);
    assert_eq!(
        messages(&generation),
        vec!["Map is not supported yet, if you want to use TS Record type, please use `@record Map<String, i32>`"]
    );
    assert!(generation.has_errors());
    // Generation still completes with a placeholder conversion.
    assert!(rendered(&generation, "src/kv.ani.cpp").contains("ani_func_2kv3Put"));

    let json = serde_json::to_value(&generation.diagnostics[0]).unwrap();
    assert_eq!(json["severity"], "error");
}

#[test]
fn test_unresolvable_scope_aborts() {
    let group = load(&group_json(&[package(
        "bad",
        r#""attrs": [{"name": "namespace", "args": [""]}], "functions": [{"name": "F"}]"#,
    )]));
    let result = generate(&group, GeneratorConfig::default());
    assert!(matches!(result, Err(GenError::ScopeLookup(_))));
}

#[test]
fn test_invalid_config_rejected() {
    let group = calc();
    let config = GeneratorConfig {
        indent: String::new(),
        ..GeneratorConfig::default()
    };
    assert!(matches!(generate(&group, config), Err(GenError::Config(_))));
}

#[test]
fn test_unknown_type_name_is_fatal() {
    let result = load_group(&group_json(&[package(
        "app",
        &format!(r#""functions": [{}]"#, func("F", &[param("p", &named("Nope"))], None)),
    )]));
    assert!(matches!(result, Err(GenError::UnresolvedType { .. })));
}
