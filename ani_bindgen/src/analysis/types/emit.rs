//! Conversion code emission for mapped types.
//!
//! Every procedure writes statements that declare the result variable it
//! is given; helper variables are named after the result so nested
//! conversions never collide.

use ani_bindgen_runtime::env::{BIGINT_TO_BUFFER, BUFFER_TO_BIGINT};

use super::{Strategy, TypeAniInfo};
use crate::codegen::CSourceWriter;

impl TypeAniInfo {
    /// Element owner spelling of an array-like strategy
    fn item_owner(&self) -> &str {
        match &self.strategy {
            Strategy::Array(item)
            | Strategy::FixedArray(item)
            | Strategy::TypedArray { item, .. }
            | Strategy::ArrayBuffer { item, .. }
            | Strategy::BigInt { item, .. }
            | Strategy::Optional(item) => &item.cpp_owner,
            _ => &self.cpp_owner,
        }
    }

    // ========== Managed -> native ==========

    pub fn from_ani(&self, w: &mut CSourceWriter, env: &str, v: &str, r: &str) {
        let owner = &self.cpp_owner;
        match &self.strategy {
            Strategy::Scalar(_) | Strategy::Opaque => {
                w.write_line(&format!("{} {} = ({}){};", owner, r, owner, v));
            }
            Strategy::String => {
                w.write_line(&format!("ani_size {}_len;", r));
                w.write_line(&format!("{}->String_GetUTF8Size({}, &{}_len);", env, v, r));
                w.write_line(&format!("TString {}_tstr;", r));
                w.write_line(&format!(
                    "char* {r}_buf = tstr_initialize(&{r}_tstr, {r}_len + 1);",
                    r = r
                ));
                w.write_line(&format!(
                    "{env}->String_GetUTF8({v}, {r}_buf, {r}_len + 1, &{r}_len);",
                    env = env,
                    v = v,
                    r = r
                ));
                w.write_line(&format!("{r}_buf[{r}_len] = '\\0';", r = r));
                w.write_line(&format!("{r}_tstr.length = {r}_len;", r = r));
                w.write_line(&format!("{} {} = {}({}_tstr);", owner, r, owner, r));
            }
            Strategy::Enum { cpp_full } => {
                w.write_line(&format!("ani_size {}_ani;", r));
                w.write_line(&format!("{}->EnumItem_GetIndex({}, &{}_ani);", env, v, r));
                w.write_line(&format!(
                    "{full} {r}(({full}::key_t){r}_ani);",
                    full = cpp_full,
                    r = r
                ));
            }
            Strategy::Decl {
                from_func,
                impl_header,
                ..
            } => {
                w.include(impl_header);
                w.write_line(&format!("{} {} = {}({}, {});", owner, r, from_func, env, v));
            }
            Strategy::FixedArray(item) => {
                let item_owner = &item.cpp_owner;
                w.write_line(&format!("size_t {}_size;", r));
                w.write_line(&format!("{}->FixedArray_GetLength({}, &{}_size);", env, v, r));
                w.write_line(&format!(
                    "{io}* {r}_buffer = reinterpret_cast<{io}*>(malloc({r}_size * sizeof({io})));",
                    io = item_owner,
                    r = r
                ));
                item.from_ani_fixedarray(
                    w,
                    env,
                    &format!("{}_size", r),
                    v,
                    &format!("{}_buffer", r),
                );
                w.write_line(&format!("{} {}({}_buffer, {}_size);", owner, r, r, r));
            }
            Strategy::Array(item) => {
                let item_owner = &item.cpp_owner;
                w.write_line(&format!("size_t {}_size;", r));
                w.write_line(&format!("{}->Array_GetLength({}, &{}_size);", env, v, r));
                w.write_line(&format!(
                    "{io}* {r}_buffer = reinterpret_cast<{io}*>(malloc({r}_size * sizeof({io})));",
                    io = item_owner,
                    r = r
                ));
                w.indented(
                    &format!("for (size_t {r}_i = 0; {r}_i < {r}_size; {r}_i++) {{", r = r),
                    "}",
                    |w| {
                        w.write_line(&format!("ani_ref {}_ani_item;", r));
                        w.write_line(&format!(
                            "{}->Array_Get_Ref({}, {}_i, &{}_ani_item);",
                            env, v, r, r
                        ));
                        item.from_ani_boxed(
                            w,
                            env,
                            &format!("{}_ani_item", r),
                            &format!("{}_cpp_item", r),
                        );
                        w.write_line(&format!(
                            "new (&{r}_buffer[{r}_i]) {io}(std::move({r}_cpp_item));",
                            r = r,
                            io = item_owner
                        ));
                    },
                );
                w.write_line(&format!("{} {}({}_buffer, {}_size);", owner, r, r, r));
            }
            Strategy::ArrayBuffer { .. } => {
                self.read_buffer_info(w, env, v, r);
                w.write_line(&format!(
                    "{param} {r}(reinterpret_cast<{io}*>({r}_data), {r}_length / (sizeof({io}) / sizeof(char)));",
                    param = self.cpp_param,
                    r = r,
                    io = self.item_owner()
                ));
            }
            Strategy::TypedArray { .. } => {
                w.write_line(&format!("ani_double {}_bylen;", r));
                w.write_line(&format!("ani_double {}_byoff;", r));
                w.write_line(&format!("ani_arraybuffer {}_arrbuf;", r));
                w.write_line(&format!(
                    "{}->Object_GetPropertyByName_Double({}, \"byteLength\", &{}_bylen);",
                    env, v, r
                ));
                w.write_line(&format!(
                    "{}->Object_GetPropertyByName_Double({}, \"byteOffset\", &{}_byoff);",
                    env, v, r
                ));
                w.write_line(&format!(
                    "{}->Object_GetPropertyByName_Ref({}, \"buffer\", reinterpret_cast<ani_ref*>(&{}_arrbuf));",
                    env, v, r
                ));
                self.read_buffer_info(w, env, &format!("{}_arrbuf", r), r);
                w.write_line(&format!(
                    "{param} {r}(reinterpret_cast<{io}*>({r}_data + (size_t){r}_byoff), (size_t){r}_bylen / (sizeof({io}) / sizeof(char)));",
                    param = self.cpp_param,
                    r = r,
                    io = self.item_owner()
                ));
            }
            Strategy::BigInt { module_desc, .. } => {
                let io = self.item_owner();
                self.find_module_function(w, env, module_desc, BIGINT_TO_BUFFER, r);
                w.write_line(&format!("ani_arraybuffer {}_arrbuf;", r));
                w.write_line(&format!(
                    "{env}->Function_Call_Ref({r}_fn, reinterpret_cast<ani_ref*>(&{r}_arrbuf), {v}, sizeof({io}) / sizeof(char));",
                    env = env,
                    r = r,
                    v = v,
                    io = io
                ));
                self.read_buffer_info(w, env, &format!("{}_arrbuf", r), r);
                w.write_line(&format!(
                    "{param} {r}(reinterpret_cast<{io}*>({r}_data), {r}_length / (sizeof({io}) / sizeof(char)));",
                    param = self.cpp_param,
                    r = r,
                    io = io
                ));
            }
            Strategy::Optional(item) => {
                let item_owner = &item.cpp_owner;
                w.write_line(&format!("ani_boolean {}_flag;", r));
                w.write_line(&format!("{}* {}_ptr = nullptr;", item_owner, r));
                w.write_line(&format!("{}->Reference_IsUndefined({}, &{}_flag);", env, v, r));
                w.indented(&format!("if (!{}_flag) {{", r), "};", |w| {
                    item.from_ani_boxed(w, env, v, &format!("{}_spec", r));
                    w.write_line(&format!(
                        "{r}_ptr = new {io}(std::move({r}_spec));",
                        r = r,
                        io = item_owner
                    ));
                });
                w.write_line(&format!("{} {}({}_ptr);", owner, r, r));
            }
            Strategy::Record { key, value } => {
                w.write_line(&format!("{} {};", owner, r));
                w.write_line(&format!("ani_ref {}_iter;", r));
                w.write_line(&format!(
                    "{}->Object_CallMethodByName_Ref({}, \"$_iterator\", nullptr, &{}_iter);",
                    env, v, r
                ));
                w.indented("while (true) {", "}", |w| {
                    w.write_line(&format!("ani_ref {}_next;", r));
                    w.write_line(&format!("ani_boolean {}_done;", r));
                    w.write_line(&format!(
                        "{env}->Object_CallMethodByName_Ref(static_cast<ani_object>({r}_iter), \"next\", nullptr, &{r}_next);",
                        env = env,
                        r = r
                    ));
                    w.write_line(&format!(
                        "{env}->Object_GetFieldByName_Boolean(static_cast<ani_object>({r}_next), \"done\", &{r}_done);",
                        env = env,
                        r = r
                    ));
                    w.indented(&format!("if ({}_done) {{", r), "};", |w| w.write_line("break;"));
                    w.write_line(&format!("ani_ref {}_item;", r));
                    w.write_line(&format!(
                        "{env}->Object_GetFieldByName_Ref(static_cast<ani_object>({r}_next), \"value\", &{r}_item);",
                        env = env,
                        r = r
                    ));
                    for (index, part) in ["key", "val"].into_iter().enumerate() {
                        w.write_line(&format!("ani_ref {}_ani_{};", r, part));
                        w.write_line(&format!(
                            "{env}->TupleValue_GetItem_Ref(static_cast<ani_tuple_value>({r}_item), {index}, &{r}_ani_{part});",
                            env = env,
                            r = r,
                            index = index,
                            part = part
                        ));
                    }
                    key.from_ani_boxed(w, env, &format!("{}_ani_key", r), &format!("{}_cpp_key", r));
                    value.from_ani_boxed(w, env, &format!("{}_ani_val", r), &format!("{}_cpp_val", r));
                    w.write_line(&format!(
                        "{r}.emplace(std::move({r}_cpp_key), std::move({r}_cpp_val));",
                        r = r
                    ));
                });
            }
            Strategy::Map => {
                w.write_line(&format!("{} {};", owner, r));
            }
            Strategy::Callback { params, ret } => {
                let impl_t = format!("{}_cpp_impl_t", r);
                w.indented(&format!("struct {} {{", impl_t), "};", |w| {
                    w.write_line("ani_ref ref;");
                    w.indented(&format!("{}({} obj) {{", impl_t, self.ani_type), "}", |w| {
                        w.write_line("::taihe::get_env()->GlobalReference_Create(obj, &this->ref);");
                    });
                    w.indented(&format!("~{}() {{", impl_t), "}", |w| {
                        w.write_line("::taihe::get_env()->GlobalReference_Delete(this->ref);");
                    });
                    let args: Vec<String> = params
                        .iter()
                        .enumerate()
                        .map(|(i, p)| format!("{} cpp_arg_{}", p.cpp_param, i))
                        .collect();
                    let ret_owner = ret.as_ref().map_or("void", |t| t.cpp_owner.as_str());
                    w.indented(
                        &format!("{} operator()({}) {{", ret_owner, args.join(", ")),
                        "}",
                        |w| {
                            w.write_line("ani_env* env = ::taihe::get_env();");
                            for (i, param) in params.iter().enumerate() {
                                param.into_ani_boxed(
                                    w,
                                    "env",
                                    &format!("cpp_arg_{}", i),
                                    &format!("ani_arg_{}", i),
                                );
                            }
                            let argv = if params.is_empty() {
                                "nullptr"
                            } else {
                                let names: Vec<String> =
                                    (0..params.len()).map(|i| format!("ani_arg_{}", i)).collect();
                                w.write_line(&format!("ani_ref ani_argv[] = {{{}}};", names.join(", ")));
                                "ani_argv"
                            };
                            w.write_line("ani_ref ani_result;");
                            w.write_line(&format!(
                                "env->FunctionalObject_Call(static_cast<ani_fn_object>(this->ref), {}, {}, &ani_result);",
                                params.len(),
                                argv
                            ));
                            if let Some(ret) = ret {
                                ret.from_ani_boxed(w, "env", "ani_result", "cpp_result");
                                w.write_line("return cpp_result;");
                            }
                        },
                    );
                });
                w.write_line(&format!(
                    "{owner} {r} = ::taihe::make_holder<{impl_t}, {owner}>({v});",
                    owner = owner,
                    r = r,
                    impl_t = impl_t,
                    v = v
                ));
            }
        }
    }

    // ========== Native -> managed ==========

    pub fn into_ani(&self, w: &mut CSourceWriter, env: &str, v: &str, r: &str) {
        let ani_type = self.ani_type;
        match &self.strategy {
            Strategy::Scalar(_) => {
                w.write_line(&format!("{} {} = ({}){};", ani_type, r, self.cpp_owner, v));
            }
            Strategy::Opaque => {
                w.write_line(&format!("{} {} = ({}){};", ani_type, r, ani_type, v));
            }
            Strategy::String => {
                w.write_line(&format!("ani_string {};", r));
                w.write_line(&format!(
                    "{env}->String_NewUTF8({v}.c_str(), {v}.size(), &{r});",
                    env = env,
                    v = v,
                    r = r
                ));
            }
            Strategy::Enum { .. } => {
                w.write_line(&format!("ani_enum {}_cls;", r));
                w.write_line(&format!(
                    "{}->FindEnum(\"{}\", &{}_cls);",
                    env, self.type_desc, r
                ));
                w.write_line(&format!("ani_enum_item {};", r));
                w.write_line(&format!(
                    "{env}->Enum_GetEnumItemByIndex({r}_cls, (ani_size){v}.get_key(), &{r});",
                    env = env,
                    r = r,
                    v = v
                ));
            }
            Strategy::Decl {
                into_func,
                impl_header,
                ..
            } => {
                w.include(impl_header);
                w.write_line(&format!("{} {} = {}({}, {});", ani_type, r, into_func, env, v));
            }
            Strategy::FixedArray(item) => {
                w.write_line(&format!("size_t {}_size = {}.size();", r, v));
                item.into_ani_fixedarray(
                    w,
                    env,
                    &format!("{}_size", r),
                    &format!("{}.data()", v),
                    r,
                );
            }
            Strategy::Array(item) => {
                w.write_line(&format!("size_t {}_size = {}.size();", r, v));
                w.write_line(&format!("ani_array_ref {};", r));
                w.write_line(&format!("ani_class {}_cls;", r));
                w.write_line(&format!(
                    "{}->FindClass(\"Lstd/core/Object;\", &{}_cls);",
                    env, r
                ));
                w.write_line(&format!("ani_ref {}_undef;", r));
                w.write_line(&format!("{}->GetUndefined(&{}_undef);", env, r));
                w.write_line(&format!(
                    "{env}->Array_New_Ref({r}_cls, {r}_size, {r}_undef, &{r});",
                    env = env,
                    r = r
                ));
                w.indented(
                    &format!("for (size_t {r}_i = 0; {r}_i < {r}_size; {r}_i++) {{", r = r),
                    "}",
                    |w| {
                        item.into_ani_boxed(w, env, &format!("{}[{}_i]", v, r), &format!("{}_item", r));
                        w.write_line(&format!(
                            "{env}->Array_Set_Ref({r}, {r}_i, {r}_item);",
                            env = env,
                            r = r
                        ));
                    },
                );
            }
            Strategy::ArrayBuffer { .. } => {
                self.create_buffer(w, env, v, r, r);
            }
            Strategy::TypedArray { .. } => {
                let arrbuf = format!("{}_arrbuf", r);
                self.create_buffer(w, env, v, r, &arrbuf);
                for part in ["bylen", "byoff"] {
                    w.write_line(&format!("ani_ref {}_{};", r, part));
                    w.write_line(&format!("{}->GetUndefined(&{}_{});", env, r, part));
                }
                w.write_line(&format!("ani_class {}_cls;", r));
                w.write_line(&format!("{}->FindClass(\"{}\", &{}_cls);", env, self.type_desc, r));
                w.write_line(&format!("ani_method {}_ctor;", r));
                w.write_line(&format!(
                    "{}->Class_FindMethod({}_cls, \"<ctor>\", \"Lescompat/ArrayBuffer;Lstd/core/Double;Lstd/core/Double;:V\", &{}_ctor);",
                    env, r, r
                ));
                w.write_line(&format!("ani_object {};", r));
                w.write_line(&format!(
                    "{env}->Object_New({r}_cls, {r}_ctor, &{r}, {r}_arrbuf, {r}_bylen, {r}_byoff);",
                    env = env,
                    r = r
                ));
            }
            Strategy::BigInt { module_desc, .. } => {
                let arrbuf = format!("{}_arrbuf", r);
                self.create_buffer(w, env, v, r, &arrbuf);
                self.find_module_function(w, env, module_desc, BUFFER_TO_BIGINT, r);
                w.write_line(&format!("ani_object {};", r));
                w.write_line(&format!(
                    "{env}->Function_Call_Ref({r}_fn, reinterpret_cast<ani_ref*>(&{r}), {r}_arrbuf);",
                    env = env,
                    r = r
                ));
            }
            Strategy::Optional(item) => {
                w.write_line(&format!("ani_ref {};", r));
                w.indented(&format!("if (!{}) {{", v), "}", |w| {
                    w.write_line(&format!("{}->GetUndefined(&{});", env, r));
                });
                w.indented("else {", "}", |w| {
                    item.into_ani_boxed(w, env, &format!("(*{})", v), &format!("{}_spec", r));
                    w.write_line(&format!("{} = {}_spec;", r, r));
                });
            }
            Strategy::Record { key, value } => {
                w.write_line(&format!("ani_class {}_cls;", r));
                w.write_line(&format!(
                    "{}->FindClass(\"Lescompat/Record;\", &{}_cls);",
                    env, r
                ));
                w.write_line(&format!("ani_method {}_ctor;", r));
                w.write_line(&format!(
                    "{}->Class_FindMethod({}_cls, \"<ctor>\", nullptr, &{}_ctor);",
                    env, r, r
                ));
                w.write_line(&format!("ani_object {};", r));
                w.write_line(&format!(
                    "{env}->Object_New({r}_cls, {r}_ctor, &{r});",
                    env = env,
                    r = r
                ));
                w.indented(
                    &format!("for (const auto& [{r}_cpp_key, {r}_cpp_val] : {v}) {{", r = r, v = v),
                    "}",
                    |w| {
                        key.into_ani_boxed(w, env, &format!("{}_cpp_key", r), &format!("{}_ani_key", r));
                        value.into_ani_boxed(w, env, &format!("{}_cpp_val", r), &format!("{}_ani_val", r));
                        w.write_line(&format!(
                            "{env}->Object_CallMethodByName_Void({r}, \"$_set\", nullptr, {r}_ani_key, {r}_ani_val);",
                            env = env,
                            r = r
                        ));
                    },
                );
            }
            Strategy::Map | Strategy::Callback { .. } => {
                w.write_line(&format!("{} {} = {{}};", ani_type, r));
            }
        }
    }

    // ========== Boxed and array-element forms ==========

    pub fn from_ani_boxed(&self, w: &mut CSourceWriter, env: &str, v: &str, r: &str) {
        if self.ani_type.is_ref() {
            self.from_ani(w, env, &format!("static_cast<{}>({})", self.ani_type, v), r);
            return;
        }
        let boxed = self.type_desc_boxed();
        w.write_line(&format!("ani_class {}_cls;", r));
        w.write_line(&format!("{}->FindClass(\"{}\", &{}_cls);", env, boxed, r));
        w.write_line(&format!("ani_method {}_getter;", r));
        w.write_line(&format!(
            "{}->Class_FindMethod({}_cls, \"unboxed\", \":{}\", &{}_getter);",
            env, r, self.type_desc, r
        ));
        w.write_line(&format!("{} {}_ani;", self.ani_type, r));
        w.write_line(&format!(
            "{env}->Object_CallMethod_{suffix}((ani_object){v}, {r}_getter, &{r}_ani);",
            env = env,
            suffix = self.ani_type.suffix(),
            v = v,
            r = r
        ));
        self.from_ani(w, env, &format!("{}_ani", r), r);
    }

    pub fn into_ani_boxed(&self, w: &mut CSourceWriter, env: &str, v: &str, r: &str) {
        if self.ani_type.is_ref() {
            self.into_ani(w, env, v, r);
            return;
        }
        let boxed = self.type_desc_boxed();
        w.write_line(&format!("ani_class {}_cls;", r));
        w.write_line(&format!("{}->FindClass(\"{}\", &{}_cls);", env, boxed, r));
        w.write_line(&format!("ani_method {}_ctor;", r));
        w.write_line(&format!(
            "{}->Class_FindMethod({}_cls, \"<ctor>\", \"{}:V\", &{}_ctor);",
            env, r, self.type_desc, r
        ));
        self.into_ani(w, env, v, &format!("{}_ani", r));
        w.write_line(&format!("ani_object {};", r));
        w.write_line(&format!(
            "{env}->Object_New({r}_cls, {r}_ctor, &{r}, {r}_ani);",
            env = env,
            r = r
        ));
    }

    /// Fill `buffer` with `size` elements read from a fixed array
    pub fn from_ani_fixedarray(
        &self,
        w: &mut CSourceWriter,
        env: &str,
        size: &str,
        ani_array: &str,
        buffer: &str,
    ) {
        if !self.ani_type.is_ref() {
            w.write_line(&format!(
                "{}->FixedArray_GetRegion_{}({}, 0, {}, reinterpret_cast<{}*>({}));",
                env,
                self.ani_type.suffix(),
                ani_array,
                size,
                self.ani_type,
                buffer
            ));
            return;
        }
        w.indented(
            &format!("for (size_t {b}_i = 0; {b}_i < {s}; {b}_i++) {{", b = buffer, s = size),
            "}",
            |w| {
                w.write_line(&format!("{} {}_ani_item;", self.ani_type, buffer));
                w.write_line(&format!(
                    "{env}->FixedArray_Get_Ref({a}, {b}_i, reinterpret_cast<ani_ref*>(&{b}_ani_item));",
                    env = env,
                    a = ani_array,
                    b = buffer
                ));
                self.from_ani(
                    w,
                    env,
                    &format!("{}_ani_item", buffer),
                    &format!("{}_cpp_item", buffer),
                );
                w.write_line(&format!(
                    "new (&{b}[{b}_i]) {o}(std::move({b}_cpp_item));",
                    b = buffer,
                    o = self.cpp_owner
                ));
            },
        );
    }

    /// Build a fixed array `r` from `size` native elements at `buffer`
    pub fn into_ani_fixedarray(
        &self,
        w: &mut CSourceWriter,
        env: &str,
        size: &str,
        buffer: &str,
        r: &str,
    ) {
        let array_type = self.ani_type.fixedarray();
        if !self.ani_type.is_ref() {
            w.write_line(&format!("{} {};", array_type, r));
            w.write_line(&format!(
                "{}->FixedArray_New_{}({}, &{});",
                env,
                self.ani_type.suffix(),
                size,
                r
            ));
            w.write_line(&format!(
                "{}->FixedArray_SetRegion_{}({}, 0, {}, reinterpret_cast<{} const*>({}));",
                env,
                self.ani_type.suffix(),
                r,
                size,
                self.ani_type,
                buffer
            ));
            return;
        }
        w.write_line(&format!("ani_class {}_cls;", r));
        w.write_line(&format!("{}->FindClass(\"{}\", &{}_cls);", env, self.type_desc, r));
        w.write_line(&format!("ani_ref {}_undef;", r));
        w.write_line(&format!("{}->GetUndefined(&{}_undef);", env, r));
        w.write_line(&format!("{} {};", array_type, r));
        w.write_line(&format!(
            "{env}->FixedArray_New_Ref({r}_cls, {s}, {r}_undef, &{r});",
            env = env,
            r = r,
            s = size
        ));
        w.indented(
            &format!("for (size_t {r}_i = 0; {r}_i < {s}; {r}_i++) {{", r = r, s = size),
            "}",
            |w| {
                self.into_ani(w, env, &format!("{}[{}_i]", buffer, r), &format!("{}_item", r));
                w.write_line(&format!(
                    "{env}->FixedArray_Set_Ref({r}, {r}_i, {r}_item);",
                    env = env,
                    r = r
                ));
            },
        );
    }

    // ========== Shared pieces ==========

    fn read_buffer_info(&self, w: &mut CSourceWriter, env: &str, arrbuf: &str, r: &str) {
        w.write_line(&format!("char* {}_data = nullptr;", r));
        w.write_line(&format!("size_t {}_length = 0;", r));
        w.write_line(&format!(
            "{env}->ArrayBuffer_GetInfo({a}, reinterpret_cast<void**>(&{r}_data), &{r}_length);",
            env = env,
            a = arrbuf,
            r = r
        ));
    }

    /// Copy the native elements of `v` into a fresh array buffer `arrbuf`
    fn create_buffer(&self, w: &mut CSourceWriter, env: &str, v: &str, r: &str, arrbuf: &str) {
        let bytes = format!(
            "{v}.size() * (sizeof({io}) / sizeof(char))",
            v = v,
            io = self.item_owner()
        );
        w.write_line(&format!("char* {}_data = nullptr;", r));
        w.write_line(&format!("ani_arraybuffer {};", arrbuf));
        w.write_line(&format!(
            "{env}->CreateArrayBuffer({bytes}, reinterpret_cast<void**>(&{r}_data), &{a});",
            env = env,
            bytes = bytes,
            r = r,
            a = arrbuf
        ));
        w.write_line(&format!("memcpy({}_data, {}.data(), {});", r, v, bytes));
    }

    fn find_module_function(
        &self,
        w: &mut CSourceWriter,
        env: &str,
        module_desc: &str,
        function: &str,
        r: &str,
    ) {
        w.write_line(&format!("ani_module {}_mod;", r));
        w.write_line(&format!("{}->FindModule(\"{}\", &{}_mod);", env, module_desc, r));
        w.write_line(&format!("ani_function {}_fn;", r));
        w.write_line(&format!(
            "{}->Module_FindFunction({}_mod, \"{}\", nullptr, &{}_fn);",
            env, r, function, r
        ));
    }
}
