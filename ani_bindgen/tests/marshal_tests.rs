//! Conversion semantics: analyses lowered to marshalling shapes and run
//! against the recording environment.

mod common;

use std::cell::RefCell;

use ani_bindgen_runtime::prelude::*;
use ani_bindgen_runtime::value::{ManagedFunction, ObjectBody};
use common::*;
use pretty_assertions::assert_eq;

/// One package `app` with function `f(p: ty)` and extra members in `decls`
fn single_param(ty: &str, decls: &str) -> ani_bindgen::PackageGroup {
    let f = func("f", &[param("p", ty)], None);
    let body = if decls.is_empty() {
        format!(r#""functions": [{}]"#, f)
    } else {
        format!(r#"{}, "functions": [{}]"#, decls, f)
    };
    load(&group_json(&[package("app", &body)]))
}

// ============================================================================
// Scalars and containers
// ============================================================================

#[test]
fn test_scalar_round_trip() {
    let group = single_param(&scalar("i32"), "");
    let (shape, layouts) = param_shape(&group, 0, 0);
    assert_eq!(shape, Shape::Scalar(ScalarKind::I32));

    let mut env = MockEnv::new();
    let (native, back) = round_trip(&mut env, &layouts, &shape, &AniValue::Int(-5));
    assert_eq!(native, NativeValue::I32(-5));
    assert_eq!(back, AniValue::Int(-5));
    assert!(env.calls().is_empty());
}

#[test]
fn test_every_scalar_survives_native_round_trip() {
    let kinds = [
        "bool", "f32", "f64", "i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64",
    ];
    let params: Vec<String> = kinds
        .iter()
        .map(|k| param(&format!("p_{}", k), &scalar(k)))
        .collect();
    let group = load(&group_json(&[package(
        "app",
        &format!(r#""functions": [{}]"#, func("f", &params, None)),
    )]));
    let samples: Vec<Vec<NativeValue>> = vec![
        vec![NativeValue::Bool(false), NativeValue::Bool(true)],
        vec![NativeValue::F32(0.0), NativeValue::F32(-1.0), NativeValue::F32(f32::MAX), NativeValue::F32(f32::MIN)],
        vec![NativeValue::F64(0.0), NativeValue::F64(-1.0), NativeValue::F64(f64::MAX), NativeValue::F64(f64::MIN)],
        vec![NativeValue::I8(0), NativeValue::I8(-1), NativeValue::I8(i8::MAX), NativeValue::I8(i8::MIN)],
        vec![NativeValue::I16(0), NativeValue::I16(-1), NativeValue::I16(i16::MAX), NativeValue::I16(i16::MIN)],
        vec![NativeValue::I32(0), NativeValue::I32(-1), NativeValue::I32(i32::MAX), NativeValue::I32(i32::MIN)],
        vec![NativeValue::I64(0), NativeValue::I64(-1), NativeValue::I64(i64::MAX), NativeValue::I64(i64::MIN)],
        vec![NativeValue::U8(0), NativeValue::U8(u8::MAX)],
        vec![NativeValue::U16(0), NativeValue::U16(u16::MAX)],
        vec![NativeValue::U32(0), NativeValue::U32(u32::MAX)],
        vec![NativeValue::U64(0), NativeValue::U64(u64::MAX)],
    ];

    let mut env = MockEnv::new();
    for (index, values) in samples.iter().enumerate() {
        let (shape, layouts) = param_shape(&group, 0, index);
        let marshaller = Marshaller::new(&layouts);
        for value in values {
            let managed = marshaller.into_ani(&mut env, &shape, value).unwrap();
            let back = marshaller.from_ani(&mut env, &shape, &managed).unwrap();
            assert_eq!(&back, value, "{} did not survive", kinds[index]);
        }
    }
}

#[test]
fn test_unsigned_scalar_reinterprets_bits() {
    let group = single_param(&scalar("u8"), "");
    let (shape, layouts) = param_shape(&group, 0, 0);
    let mut env = MockEnv::new();
    let (native, back) = round_trip(&mut env, &layouts, &shape, &AniValue::Byte(-1));
    assert_eq!(native, NativeValue::U8(255));
    assert_eq!(back, AniValue::Byte(-1));
}

#[test]
fn test_array_items_are_boxed() {
    let group = single_param(r#"{"kind": "array", "item": {"kind": "f64"}}"#, "");
    let (shape, layouts) = param_shape(&group, 0, 0);
    let managed = AniValue::array(vec![
        boxed(AniValue::Double(1.0)),
        boxed(AniValue::Double(2.5)),
    ]);

    let mut env = MockEnv::new();
    let (native, back) = round_trip(&mut env, &layouts, &shape, &managed);
    assert_eq!(
        native,
        NativeValue::Array(vec![NativeValue::F64(1.0), NativeValue::F64(2.5)])
    );
    assert_eq!(back, managed);
    assert_eq!(env.count("Object_CallMethod_Double"), 2);
    assert_eq!(env.count("Array_Set_Ref"), 2);
}

#[test]
fn test_typed_array_view() {
    let group = single_param(
        r#"{"kind": "array", "item": {"kind": "u8"}, "attrs": [{"name": "typedarray"}]}"#,
        "",
    );
    let (shape, layouts) = param_shape(&group, 0, 0);
    let buffer = AniValue::object(
        "Lescompat/ArrayBuffer;",
        ObjectBody::ArrayBuffer(vec![0, 1, 2, 3]),
    );
    let view = AniValue::with_fields(
        "Lescompat/Uint8Array;",
        vec![
            ("buffer".to_string(), buffer),
            ("byteOffset".to_string(), AniValue::Double(1.0)),
            ("byteLength".to_string(), AniValue::Double(2.0)),
        ],
    );
    let mut env = MockEnv::new();
    let native = Marshaller::new(&layouts)
        .from_ani(&mut env, &shape, &view)
        .unwrap();
    assert_eq!(
        native,
        NativeValue::Array(vec![NativeValue::U8(1), NativeValue::U8(2)])
    );
}

#[test]
fn test_enum_by_index() {
    let group = single_param(
        &named("Color"),
        r#""enums": [{"name": "Color", "type": {"kind": "i32"},
            "items": [{"name": "RED"}, {"name": "GREEN"}, {"name": "BLUE"}]}]"#,
    );
    let (shape, layouts) = param_shape(&group, 0, 0);
    assert_eq!(
        shape,
        Shape::Enum {
            desc: "Lapp/Color;".to_string()
        }
    );
    let mut env = MockEnv::new();
    env.declare_enum("Lapp/Color;", 3);
    let item = AniValue::object("Lapp/Color;", ObjectBody::EnumItem(2));
    let (native, back) = round_trip(&mut env, &layouts, &shape, &item);
    assert_eq!(native, NativeValue::Enum(2));
    assert_eq!(back, item);
}

// ============================================================================
// Optional
// ============================================================================

#[test]
fn test_optional_short_circuits_on_undefined() {
    let group = single_param(r#"{"kind": "optional", "item": {"kind": "f64"}}"#, "");
    let (shape, layouts) = param_shape(&group, 0, 0);

    let mut env = MockEnv::new();
    let (native, back) = round_trip(&mut env, &layouts, &shape, &AniValue::Undefined);
    assert_eq!(native, NativeValue::Optional(None));
    assert_eq!(back, AniValue::Undefined);
    assert_eq!(env.count("Reference_IsUndefined"), 1);
    assert_eq!(env.count("Object_CallMethod_Double"), 0);

    env.clear_log();
    let present = boxed(AniValue::Double(2.5));
    let (native, back) = round_trip(&mut env, &layouts, &shape, &present);
    assert_eq!(
        native,
        NativeValue::Optional(Some(Box::new(NativeValue::F64(2.5))))
    );
    assert_eq!(back, present);
    assert_eq!(env.count("Object_CallMethod_Double"), 1);
}

// ============================================================================
// Structs
// ============================================================================

#[test]
fn test_struct_fields_flatten_through_extends() {
    let group = single_param(
        &named("Point"),
        r#""structs": [
            {"name": "Base", "fields": [{"name": "x", "type": {"kind": "f64"}}]},
            {"name": "Point", "fields": [
                {"name": "base", "type": {"kind": "named", "name": "Base"}, "attrs": [{"name": "extends"}]},
                {"name": "y", "type": {"kind": "f64"}}
            ]}
        ]"#,
    );
    let (shape, layouts) = param_shape(&group, 0, 0);
    assert_eq!(shape, Shape::Struct("app.Point".to_string()));
    let layout = &layouts.structs["app.Point"];
    let names: Vec<&str> = layout.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["x", "y"]);

    let managed = AniValue::with_fields(
        "Lapp/Point_inner;",
        vec![
            ("x".to_string(), AniValue::Double(1.5)),
            ("y".to_string(), AniValue::Double(-2.0)),
        ],
    );
    let mut env = MockEnv::new();
    let (native, back) = round_trip(&mut env, &layouts, &shape, &managed);
    assert_eq!(native.field("base.x"), Some(&NativeValue::F64(1.5)));
    assert_eq!(native.field("y"), Some(&NativeValue::F64(-2.0)));
    assert_eq!(back, managed);
    assert_eq!(env.count("Object_GetPropertyByName_Double"), 2);
}

// ============================================================================
// Unions
// ============================================================================

const PICK: &str = r#""structs": [
    {"name": "Base", "fields": [{"name": "id", "type": {"kind": "i32"}}]},
    {"name": "Derived", "fields": [{"name": "id", "type": {"kind": "i32"}}]}
],
"unions": [{"name": "Pick", "fields": [
    {"name": "base", "type": {"kind": "named", "name": "Base"}},
    {"name": "derived", "type": {"kind": "named", "name": "Derived"}},
    {"name": "none", "attrs": [{"name": "null"}]}
]}]"#;

#[test]
fn test_union_takes_first_matching_variant() {
    let group = single_param(&named("Pick"), PICK);
    let (shape, layouts) = param_shape(&group, 0, 0);
    assert_eq!(shape, Shape::Union("app.Pick".to_string()));

    let mut env = MockEnv::new();
    env.declare_subclass("Lapp/Derived_inner;", "Lapp/Derived;");
    env.declare_subclass("Lapp/Derived;", "Lapp/Base;");
    let managed = AniValue::with_fields(
        "Lapp/Derived_inner;",
        vec![("id".to_string(), AniValue::Int(7))],
    );

    let native = Marshaller::new(&layouts)
        .from_ani(&mut env, &shape, &managed)
        .unwrap();
    // A Derived is also a Base, and `base` is declared first.
    assert_eq!(
        native,
        NativeValue::Union {
            tags: vec!["base".to_string()],
            value: Some(Box::new(NativeValue::Struct(vec![(
                "id".to_string(),
                NativeValue::I32(7)
            )]))),
        }
    );
    assert_eq!(env.count("Object_InstanceOf"), 1);
    assert_eq!(env.count("Reference_IsNull"), 0);
}

#[test]
fn test_union_scalar_and_string_variants() {
    let group = single_param(
        &named("Either"),
        r#""unions": [{"name": "Either", "fields": [
            {"name": "a", "type": {"kind": "i32"}},
            {"name": "b", "type": {"kind": "string"}}
        ]}]"#,
    );
    let (shape, layouts) = param_shape(&group, 0, 0);
    let mut env = MockEnv::new();

    let (native, back) = round_trip(&mut env, &layouts, &shape, &boxed(AniValue::Int(4)));
    assert_eq!(
        native,
        NativeValue::Union {
            tags: vec!["a".to_string()],
            value: Some(Box::new(NativeValue::I32(4))),
        }
    );
    assert_eq!(back, boxed(AniValue::Int(4)));

    env.clear_log();
    let (native, _) = round_trip(&mut env, &layouts, &shape, &AniValue::string("hi"));
    assert_eq!(
        native,
        NativeValue::Union {
            tags: vec!["b".to_string()],
            value: Some(Box::new(NativeValue::String("hi".to_string()))),
        }
    );
    assert_eq!(env.count("Object_InstanceOf"), 2);
}

#[test]
fn test_union_null_variant() {
    let group = single_param(&named("Pick"), PICK);
    let (shape, layouts) = param_shape(&group, 0, 0);

    let mut env = MockEnv::new();
    let (native, back) = round_trip(&mut env, &layouts, &shape, &AniValue::Null);
    assert_eq!(
        native,
        NativeValue::Union {
            tags: vec!["none".to_string()],
            value: None,
        }
    );
    assert_eq!(back, AniValue::Null);
    assert_eq!(env.count("Object_InstanceOf"), 2);
    assert_eq!(env.count("GetNull"), 1);
}

#[test]
fn test_union_into_builds_selected_variant() {
    let group = single_param(&named("Pick"), PICK);
    let (shape, layouts) = param_shape(&group, 0, 0);
    let native = NativeValue::Union {
        tags: vec!["derived".to_string()],
        value: Some(Box::new(NativeValue::Struct(vec![(
            "id".to_string(),
            NativeValue::I32(3),
        )]))),
    };
    let mut env = MockEnv::new();
    let managed = Marshaller::new(&layouts)
        .into_ani(&mut env, &shape, &native)
        .unwrap();
    assert_eq!(managed.class_name(), "Lapp/Derived_inner;");
}

// ============================================================================
// Records and callbacks
// ============================================================================

#[test]
fn test_record_round_trip() {
    let group = single_param(
        r#"{"kind": "map", "key": {"kind": "string"}, "value": {"kind": "i32"},
            "attrs": [{"name": "record"}]}"#,
        "",
    );
    let (shape, layouts) = param_shape(&group, 0, 0);
    let record = AniValue::object(
        "Lescompat/Record;",
        ObjectBody::Record(RefCell::new(vec![
            (AniValue::string("a"), boxed(AniValue::Int(1))),
            (AniValue::string("b"), boxed(AniValue::Int(2))),
        ])),
    );

    let mut env = MockEnv::new();
    let (native, back) = round_trip(&mut env, &layouts, &shape, &record);
    assert_eq!(
        native,
        NativeValue::Map(vec![
            (NativeValue::String("a".to_string()), NativeValue::I32(1)),
            (NativeValue::String("b".to_string()), NativeValue::I32(2)),
        ])
    );
    assert_eq!(back, record);
}

#[test]
fn test_callback_holds_global_reference() {
    let group = single_param(
        r#"{"kind": "callback", "params": [{"kind": "i32"}], "returns": {"kind": "i32"}}"#,
        "",
    );
    let (shape, layouts) = param_shape(&group, 0, 0);
    let inc = AniValue::object(
        "Lstd/core/Function1;",
        ObjectBody::Function(ManagedFunction::new("inc", |args: &[AniValue]| {
            match args.first().and_then(AniValue::as_object).map(|o| &o.body) {
                Some(ObjectBody::Boxed(AniValue::Int(n))) => boxed(AniValue::Int(n + 1)),
                _ => AniValue::Undefined,
            }
        })),
    );

    let mut env = MockEnv::new();
    let marshaller = Marshaller::new(&layouts);
    let native = marshaller.from_ani(&mut env, &shape, &inc).unwrap();
    assert_eq!(env.live_globals(), 1);

    let NativeValue::Callback(adapter) = &native else {
        panic!("expected a callback, got {:?}", native);
    };
    assert_eq!(adapter.arity(), 1);
    let result = marshaller
        .call(&mut env, adapter, &[NativeValue::I32(41)])
        .unwrap();
    assert_eq!(result, Some(NativeValue::I32(42)));
    assert!(marshaller.call(&mut env, adapter, &[]).is_err());

    drop(native);
    assert_eq!(env.live_globals(), 0);
    assert_eq!(env.count("GlobalReference_Delete"), 1);
}

#[test]
fn test_rejected_type_does_not_marshal() {
    let group = single_param(
        r#"{"kind": "map", "key": {"kind": "string"}, "value": {"kind": "i32"}}"#,
        "",
    );
    let (shape, layouts) = param_shape(&group, 0, 0);
    assert_eq!(shape, Shape::Placeholder);
    let mut env = MockEnv::new();
    assert!(Marshaller::new(&layouts)
        .from_ani(&mut env, &shape, &AniValue::Null)
        .is_err());
}
