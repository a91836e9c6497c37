//! Shared helpers for integration tests
// Each test target uses a different subset of these builders.
#![allow(dead_code)]

use ani_bindgen::ir::{FuncId, PackageId};
use ani_bindgen::*;
use ani_bindgen_runtime::prelude::*;

// ========== IDL JSON builders ==========

/// `{"packages": [...]}` from package bodies built with `package`
pub fn group_json(packages: &[String]) -> String {
    format!(r#"{{"packages": [{}]}}"#, packages.join(", "))
}

/// A package object; `body` holds the remaining members, e.g. `"functions": [...]`
pub fn package(name: &str, body: &str) -> String {
    if body.is_empty() {
        format!(r#"{{"name": "{}"}}"#, name)
    } else {
        format!(r#"{{"name": "{}", {}}}"#, name, body)
    }
}

pub fn param(name: &str, ty: &str) -> String {
    format!(r#"{{"name": "{}", "type": {}}}"#, name, ty)
}

pub fn func(name: &str, params: &[String], returns: Option<&str>) -> String {
    match returns {
        Some(ret) => format!(
            r#"{{"name": "{}", "params": [{}], "returns": {}}}"#,
            name,
            params.join(", "),
            ret
        ),
        None => format!(r#"{{"name": "{}", "params": [{}]}}"#, name, params.join(", ")),
    }
}

pub fn scalar(kind: &str) -> String {
    format!(r#"{{"kind": "{}"}}"#, kind)
}

pub fn named(name: &str) -> String {
    format!(r#"{{"kind": "named", "name": "{}"}}"#, name)
}

pub fn load(json: &str) -> PackageGroup {
    load_group(json).unwrap_or_else(|e| panic!("cannot load test group: {}", e))
}

// ========== Pipeline ==========

pub fn run(group: &PackageGroup) -> Generation {
    generate(group, GeneratorConfig::default())
        .unwrap_or_else(|e| panic!("generation failed: {}", e))
}

pub fn rendered(generation: &Generation, path: &str) -> String {
    generation
        .output
        .render(path)
        .unwrap_or_else(|| panic!("{} was not generated", path))
}

pub fn messages(generation: &Generation) -> Vec<String> {
    generation
        .diagnostics
        .iter()
        .map(|d| d.message.clone())
        .collect()
}

/// Marshalling shape of parameter `index` of the first function in `pkg`,
/// plus the layouts of every declaration in the group
pub fn param_shape(group: &PackageGroup, pkg: usize, index: usize) -> (Shape, Layouts) {
    let mut am = AnalysisManager::new(group, GeneratorConfig::default());
    let package = group.package(PackageId(pkg));
    let func: FuncId = package.functions[0];
    let ty = group.function(func).params[index].ty;
    let info = am
        .type_info(ty, PackageId(pkg))
        .unwrap_or_else(|e| panic!("type analysis failed: {}", e));
    let layouts = marshal_layouts(&mut am).unwrap_or_else(|e| panic!("layouts failed: {}", e));
    (info.marshal_shape(), layouts)
}

/// Managed -> native -> managed through the marshaller
pub fn round_trip(
    env: &mut MockEnv,
    layouts: &Layouts,
    shape: &Shape,
    value: &AniValue,
) -> (NativeValue, AniValue) {
    let marshaller = Marshaller::new(layouts);
    let native = marshaller
        .from_ani(env, shape, value)
        .unwrap_or_else(|e| panic!("from_ani failed: {}", e));
    let back = marshaller
        .into_ani(env, shape, &native)
        .unwrap_or_else(|e| panic!("into_ani failed: {}", e));
    (native, back)
}

pub fn boxed(value: AniValue) -> AniValue {
    let class = value
        .base_type()
        .boxed_desc()
        .unwrap_or_else(|| "Lstd/core/Object;".to_string());
    AniValue::object(class, ani_bindgen_runtime::value::ObjectBody::Boxed(value))
}
