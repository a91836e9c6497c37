use ani_bindgen_runtime::abi::AniBaseType;
use ani_bindgen_runtime::shape::Shape;
use ani_bindgen_runtime::{AniType, ScalarKind};
use pretty_assertions::assert_eq;

use super::*;
use crate::codegen::CSourceWriter;
use crate::config::GeneratorConfig;
use crate::ir::{load_group, FuncId, PackageGroup};

// ========== Helpers ==========

/// Group with one function `app.f` taking a single parameter of `ty`
fn with_param(ty: &str) -> PackageGroup {
    load_group(&format!(
        r#"{{"packages": [{{"name": "app",
            "enums": [{{"name": "Color", "type": {{"kind": "i32"}}, "items": [{{"name": "RED"}}]}}],
            "functions": [{{"name": "f", "params": [{{"name": "p", "type": {}}}]}}]}}]}}"#,
        ty
    ))
    .unwrap()
}

fn param_info(am: &mut AnalysisManager<'_>) -> Rc<TypeAniInfo> {
    let ty = am.group().function(FuncId(0)).params[0].ty;
    am.type_info(ty, PackageId(0)).unwrap()
}

fn emit(f: impl FnOnce(&mut CSourceWriter)) -> CSourceWriter {
    let mut w = CSourceWriter::new("t.cpp", false, "    ");
    f(&mut w);
    w
}

// ========== Mappings ==========

#[test]
fn test_scalar_mapping() {
    let group = with_param(r#"{"kind": "i32"}"#);
    let mut am = AnalysisManager::new(&group, GeneratorConfig::default());
    let info = param_info(&mut am);
    assert_eq!(info.ani_type, AniType::Base(AniBaseType::Int));
    assert_eq!(info.type_desc, "I");
    assert_eq!(info.type_desc_boxed(), "Lstd/core/Int;");
    assert_eq!(info.sts_type, "int");
    assert_eq!(info.cpp_owner, "int32_t");
    assert_eq!(info.marshal_shape(), Shape::Scalar(ScalarKind::I32));

    let w = emit(|w| info.from_ani(w, "env", "ani_arg", "cpp_arg"));
    assert_eq!(w.body(), "int32_t cpp_arg = (int32_t)ani_arg;\n");
    let w = emit(|w| info.into_ani(w, "env", "cpp_res", "ani_res"));
    assert_eq!(w.body(), "ani_int ani_res = (int32_t)cpp_res;\n");
}

#[test]
fn test_boxed_scalar_unboxes_through_getter() {
    let group = with_param(r#"{"kind": "f64"}"#);
    let mut am = AnalysisManager::new(&group, GeneratorConfig::default());
    let info = param_info(&mut am);
    let w = emit(|w| info.from_ani_boxed(w, "env", "obj", "r"));
    assert_eq!(
        w.body(),
        concat!(
            "ani_class r_cls;\n",
            "env->FindClass(\"Lstd/core/Double;\", &r_cls);\n",
            "ani_method r_getter;\n",
            "env->Class_FindMethod(r_cls, \"unboxed\", \":D\", &r_getter);\n",
            "ani_double r_ani;\n",
            "env->Object_CallMethod_Double((ani_object)obj, r_getter, &r_ani);\n",
            "double r = (double)r_ani;\n",
        )
    );
}

#[test]
fn test_optional_string() {
    let group = with_param(r#"{"kind": "optional", "item": {"kind": "string"}}"#);
    let mut am = AnalysisManager::new(&group, GeneratorConfig::default());
    let info = param_info(&mut am);
    assert_eq!(info.ani_type, AniType::REF);
    assert_eq!(info.sts_type, "(string | undefined)");
    assert_eq!(info.type_desc, "Lstd/core/String;");
    assert_eq!(info.marshal_shape(), Shape::Optional(Box::new(Shape::String)));

    let w = emit(|w| info.from_ani(w, "env", "v", "r"));
    let body = w.body();
    assert!(body.contains("env->Reference_IsUndefined(v, &r_flag);"));
    assert!(body.contains("static_cast<ani_string>(v)"));
    assert!(body.contains("r_ptr = new ::taihe::string(std::move(r_spec));"));
    assert!(body.ends_with("::taihe::optional<::taihe::string> r(r_ptr);\n"));
}

#[test]
fn test_enum_mapping() {
    let group = with_param(r#"{"kind": "named", "name": "Color"}"#);
    let mut am = AnalysisManager::new(&group, GeneratorConfig::default());
    let info = param_info(&mut am);
    assert_eq!(info.ani_type, AniType::EnumItem);
    assert_eq!(info.type_desc, "Lapp/Color;");
    assert_eq!(info.sts_type, "Color");

    let w = emit(|w| info.into_ani(w, "env", "v", "r"));
    assert!(w.body().contains("env->FindEnum(\"Lapp/Color;\", &r_cls);"));
    assert!(w
        .body()
        .contains("env->Enum_GetEnumItemByIndex(r_cls, (ani_size)v.get_key(), &r);"));
    assert!(am.diagnostics().is_empty());
}

#[test]
fn test_opaque_sts_type() {
    let group = with_param(
        r#"{"kind": "opaque", "attrs": [{"name": "sts_type", "args": ["Uint8Array"]}]}"#,
    );
    let mut am = AnalysisManager::new(&group, GeneratorConfig::default());
    let info = param_info(&mut am);
    assert_eq!(info.ani_type, AniType::Object);
    assert_eq!(info.sts_type, "Uint8Array");
    assert!(am.diagnostics().is_empty());

    let group =
        with_param(r#"{"kind": "opaque", "attrs": [{"name": "sts_type", "args": [1]}]}"#);
    let mut am = AnalysisManager::new(&group, GeneratorConfig::default());
    let info = param_info(&mut am);
    assert_eq!(info.sts_type, "Object");
    assert_eq!(
        am.diagnostics().items()[0].message,
        "@sts_type expects 1th argument to be str"
    );
}

#[test]
fn test_const_enum_as_type_is_reported() {
    let group = load_group(
        r#"{"packages": [{"name": "app",
            "enums": [{"name": "Mode", "type": {"kind": "string"}, "attrs": [{"name": "const"}]}],
            "functions": [{"name": "f", "params": [{"name": "m", "type": {"kind": "named", "name": "Mode"}}]}]}]}"#,
    )
    .unwrap();
    let mut am = AnalysisManager::new(&group, GeneratorConfig::default());
    param_info(&mut am);
    assert_eq!(
        am.diagnostics().items()[0].message,
        "@const enum Mode cannot be used as type"
    );
}

#[test]
fn test_map_without_record() {
    let group = with_param(
        r#"{"kind": "map", "key": {"kind": "string"}, "value": {"kind": "i32"}}"#,
    );
    let mut am = AnalysisManager::new(&group, GeneratorConfig::default());
    let info = param_info(&mut am);
    assert!(matches!(info.strategy, Strategy::Map));
    assert_eq!(info.marshal_shape(), Shape::Placeholder);
    assert_eq!(
        am.diagnostics().items()[0].message,
        "Map is not supported yet, if you want to use TS Record type, please use `@record Map<String, i32>`"
    );
    let w = emit(|w| info.into_ani(w, "env", "v", "r"));
    assert_eq!(w.body(), "ani_object r = {};\n");
}

#[test]
fn test_record_mapping() {
    let group = with_param(
        r#"{"kind": "map", "key": {"kind": "string"}, "value": {"kind": "i32"},
            "attrs": [{"name": "record"}]}"#,
    );
    let mut am = AnalysisManager::new(&group, GeneratorConfig::default());
    let info = param_info(&mut am);
    assert_eq!(info.sts_type, "Record<string, int>");
    assert_eq!(info.type_desc, "Lescompat/Record;");

    let w = emit(|w| info.into_ani(w, "env", "v", "r"));
    let body = w.body();
    assert!(body.contains("for (const auto& [r_cpp_key, r_cpp_val] : v) {"));
    assert!(body.contains("\"$_set\", nullptr, r_ani_key, r_ani_val);"));
    let w = emit(|w| info.from_ani(w, "env", "v", "r"));
    assert!(w.body().contains("\"$_iterator\""));
    assert!(w.body().contains("r.emplace(std::move(r_cpp_key), std::move(r_cpp_val));"));
}

// ========== Array attributes ==========

#[test]
fn test_array_attr_precedence() {
    let group = with_param(
        r#"{"kind": "array", "item": {"kind": "i32"},
            "attrs": [{"name": "fixedarray"}, {"name": "typedarray"}]}"#,
    );
    let mut am = AnalysisManager::new(&group, GeneratorConfig::default());
    let info = param_info(&mut am);
    assert_eq!(info.sts_type, "Int32Array");
    assert_eq!(info.type_desc, "Lescompat/Int32Array;");
    assert_eq!(
        info.marshal_shape(),
        Shape::TypedArray {
            class: "Int32Array".to_string(),
            item: ScalarKind::I32
        }
    );
    assert_eq!(am.diagnostics().len(), 1);
    assert!(am.diagnostics().items()[0]
        .message
        .contains("more than one of @bigint, @typedarray, @arraybuffer, @fixedarray"));
}

#[test]
fn test_bigint_rejects_floats() {
    let group = with_param(
        r#"{"kind": "array", "item": {"kind": "f64"}, "attrs": [{"name": "bigint"}]}"#,
    );
    let mut am = AnalysisManager::new(&group, GeneratorConfig::default());
    let info = param_info(&mut am);
    assert_eq!(info.sts_type, "BigInt");
    assert_eq!(info.marshal_shape(), Shape::Placeholder);
    assert_eq!(
        am.diagnostics().items()[0].message,
        "@bigint does not support type f64"
    );
}

#[test]
fn test_bigint_calls_module_helper() {
    let group = with_param(
        r#"{"kind": "array", "item": {"kind": "u64"}, "attrs": [{"name": "bigint"}]}"#,
    );
    let mut am = AnalysisManager::new(&group, GeneratorConfig::default());
    let info = param_info(&mut am);
    let w = emit(|w| info.from_ani(w, "env", "v", "r"));
    assert!(w.body().contains("env->FindModule(\"Lapp;\", &r_mod);"));
    assert!(w.body().contains("\"__fromBigIntToArrayBuffer\""));
    let w = emit(|w| info.into_ani(w, "env", "v", "r"));
    assert!(w.body().contains("\"__fromArrayBufferToBigInt\""));
}

#[test]
fn test_fixedarray_of_primitives_uses_regions() {
    let group = with_param(
        r#"{"kind": "array", "item": {"kind": "i32"}, "attrs": [{"name": "fixedarray"}]}"#,
    );
    let mut am = AnalysisManager::new(&group, GeneratorConfig::default());
    let info = param_info(&mut am);
    assert_eq!(info.ani_type, AniType::FixedArray(AniBaseType::Int));
    assert_eq!(info.sts_type, "FixedArray<int>");

    let w = emit(|w| info.into_ani(w, "env", "v", "r"));
    assert_eq!(
        w.body(),
        concat!(
            "size_t r_size = v.size();\n",
            "ani_fixedarray_int r;\n",
            "env->FixedArray_New_Int(r_size, &r);\n",
            "env->FixedArray_SetRegion_Int(r, 0, r_size, reinterpret_cast<ani_int const*>(v.data()));\n",
        )
    );
}

#[test]
fn test_array_of_strings_boxes_items() {
    let group = with_param(r#"{"kind": "array", "item": {"kind": "string"}}"#);
    let mut am = AnalysisManager::new(&group, GeneratorConfig::default());
    let info = param_info(&mut am);
    assert_eq!(info.ani_type, AniType::Array);
    assert_eq!(info.sts_type, "Array<string>");

    let w = emit(|w| info.into_ani(w, "env", "v", "r"));
    let body = w.body();
    assert!(body.contains("env->Array_New_Ref(r_cls, r_size, r_undef, &r);"));
    assert!(body.contains("env->String_NewUTF8(v[r_i].c_str(), v[r_i].size(), &r_item);"));
    assert!(body.contains("env->Array_Set_Ref(r, r_i, r_item);"));
}

// ========== Declarations and callbacks ==========

#[test]
fn test_struct_from_other_package() {
    let group = load_group(
        r#"{"packages": [
            {"name": "geo", "structs": [{"name": "Point", "fields": [{"name": "x", "type": {"kind": "f64"}}]}]},
            {"name": "app", "functions": [{"name": "f", "params": [
                {"name": "p", "type": {"kind": "named", "name": "geo.Point"}}]}]}
        ]}"#,
    )
    .unwrap();
    let mut am = AnalysisManager::new(&group, GeneratorConfig::default());
    let app = group.package_by_name("app").unwrap();
    let ty = group.function(group.package(app).functions[0]).params[0].ty;
    let info = am.type_info(ty, app).unwrap();
    assert_eq!(info.sts_type, "__geo.Point");
    assert_eq!(info.type_desc, "Lgeo/Point;");
    assert_eq!(info.cpp_param, "::geo::Point const&");
    assert_eq!(info.marshal_shape(), Shape::Struct("geo.Point".to_string()));

    let w = emit(|w| info.from_ani(w, "env", "v", "r"));
    assert_eq!(w.body(), "::geo::Point r = ani_from_3geo5Point(env, v);\n");
    assert_eq!(w.includes(), ["geo.Point.ani.1.h".to_string()]);

    // Inside its own package the short name is used.
    let geo = group.package_by_name("geo").unwrap();
    assert_eq!(am.type_info(ty, geo).unwrap().sts_type, "Point");
}

#[test]
fn test_callback_adapter() {
    let group = with_param(
        r#"{"kind": "callback", "params": [{"kind": "i32"}], "returns": {"kind": "string"}}"#,
    );
    let mut am = AnalysisManager::new(&group, GeneratorConfig::default());
    let info = param_info(&mut am);
    assert_eq!(info.ani_type, AniType::FnObject);
    assert_eq!(info.type_desc, "Lstd/core/Function1;");
    assert_eq!(info.sts_type, "((arg_0: int) => string)");

    let w = emit(|w| info.from_ani(w, "env", "v", "r"));
    let body = w.body();
    assert!(body.starts_with("struct r_cpp_impl_t {\n    ani_ref ref;\n"));
    assert!(body.contains("::taihe::string operator()(int32_t cpp_arg_0) {"));
    assert!(body.contains("ani_ref ani_argv[] = {ani_arg_0};"));
    assert!(body.contains(
        "env->FunctionalObject_Call(static_cast<ani_fn_object>(this->ref), 1, ani_argv, &ani_result);"
    ));
    assert!(body.contains("return cpp_result;"));
    assert!(body.ends_with(
        "::taihe::callback<::taihe::string(int32_t)> r = ::taihe::make_holder<r_cpp_impl_t, ::taihe::callback<::taihe::string(int32_t)>>(v);\n"
    ));
}

#[test]
fn test_nullary_callback_passes_null_argv() {
    let group = with_param(r#"{"kind": "callback"}"#);
    let mut am = AnalysisManager::new(&group, GeneratorConfig::default());
    let info = param_info(&mut am);
    assert_eq!(info.sts_type, "(() => void)");
    let w = emit(|w| info.from_ani(w, "env", "v", "r"));
    assert!(w.body().contains("this->ref), 0, nullptr, &ani_result);"));
    assert!(!w.body().contains("return"));
}
