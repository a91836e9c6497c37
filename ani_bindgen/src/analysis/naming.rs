//! Managed-side names of functions and methods.
//!
//! A global function becomes exactly one of: a constructor, a static
//! property accessor, an event subscription (`@on_off`) or a plain
//! function. `@gen_async` / `@gen_promise` derive extra names from the plain
//! or event name. Every entry point is registered natively as `<name>_inner`.

use super::attrs::{optional_str_arg, str_args};
use super::AnalysisManager;
use crate::error::Diagnostics;
use crate::ir::{Attr, Attrs, FuncId, MethodId, Param, TypeRefId};
use crate::span::SourceLoc;

/// Event subscription naming
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnOff {
    /// Managed member, `on` / `off` or the `@overload` name
    pub member: String,
    pub event: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuncAniInfo {
    pub sts_native_name: String,
    pub sts_func_name: Option<String>,
    pub ctor_scope: Option<String>,
    pub static_scope: Option<String>,
    pub get_name: Option<String>,
    pub set_name: Option<String>,
    pub on_off: Option<OnOff>,
    pub async_name: Option<String>,
    pub promise_name: Option<String>,
    /// Indices of the parameters managed callers pass
    pub sts_params: Vec<usize>,
    this_params: Vec<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodAniInfo {
    pub sts_native_name: String,
    pub sts_method_name: Option<String>,
    /// Member looked up on the managed object (`<get>size` for getters)
    pub ani_method_name: String,
    pub get_name: Option<String>,
    pub set_name: Option<String>,
    pub on_off: Option<OnOff>,
    pub async_name: Option<String>,
    pub promise_name: Option<String>,
    pub sts_params: Vec<usize>,
}

struct Signature<'a> {
    name: &'a str,
    params: usize,
    ret: Option<TypeRefId>,
    loc: Option<&'a SourceLoc>,
    keep_name: bool,
}

impl FuncAniInfo {
    pub fn analyze(am: &mut AnalysisManager<'_>, id: FuncId) -> Self {
        let group = am.group();
        let func = group.function(id);
        let keep_name = am.keep_name(func.package);
        let diags = am.diagnostics_mut();
        let sig = Signature {
            name: &func.name,
            params: func.params.len(),
            ret: func.ret,
            loc: func.loc.as_ref(),
            keep_name,
        };
        let attrs = &func.attrs;

        let mut info = FuncAniInfo {
            sts_native_name: format!("{}_inner", func.name),
            ..Default::default()
        };
        info.this_params = func.params.iter().map(is_sts_this).collect();
        info.sts_params = sts_params(&func.params);

        if let Some(ctor) = attrs.get_last("ctor") {
            info.ctor_scope = str_args(diags, ctor, "s").and_then(|a| a.into_iter().next());
            return info;
        }

        let static_attr = attrs.get_last("static");
        if let Some(attr) = static_attr {
            info.static_scope = str_args(diags, attr, "s").and_then(|a| a.into_iter().next());
        }

        let get = attrs.get_last("get");
        let set = attrs.get_last("set");
        if static_attr.is_some() {
            if let Some(get) = get {
                info.get_name = resolve_getter(diags, &sig, get);
            } else if let Some(set) = set {
                info.set_name = resolve_setter(diags, &sig, set);
            }
            if info.get_name.is_some() || info.set_name.is_some() {
                return info;
            }
        } else {
            for attr in [get, set].into_iter().flatten() {
                diags.error(
                    format!(
                        "@{} of global functions must be used together with @static",
                        attr.name
                    ),
                    attr.loc.as_ref().or(sig.loc),
                );
            }
        }

        let (name, on_off) = resolve_plain(diags, &sig, attrs);
        info.sts_func_name = Some(name);
        info.on_off = on_off;
        info.resolve_derived(diags, attrs);
        info
    }

    fn resolve_derived(&mut self, diags: &mut Diagnostics, attrs: &Attrs) {
        let Some(base) = self.sts_func_name.as_deref() else {
            return;
        };
        if let Some(attr) = attrs.get_last("gen_async") {
            self.async_name = resolve_suffixed(diags, attr, base);
        }
        if let Some(attr) = attrs.get_last("gen_promise") {
            self.promise_name = resolve_suffixed(diags, attr, base);
        }
    }

    /// Managed call of the native entry point, with `this` put back in the
    /// positions of `@sts_this` parameters
    pub fn call_native_with(&self, sts_args: &[String]) -> String {
        let mut rest = sts_args.iter().map(String::as_str);
        let args: Vec<&str> = self
            .this_params
            .iter()
            .filter_map(|&this| if this { Some("this") } else { rest.next() })
            .collect();
        format!("{}({})", self.sts_native_name, args.join(", "))
    }
}

impl MethodAniInfo {
    pub fn analyze(am: &mut AnalysisManager<'_>, id: MethodId) -> Self {
        let group = am.group();
        let method = group.method(id);
        let keep_name = am.keep_name(group.iface(method.iface).package);
        let diags = am.diagnostics_mut();
        let sig = Signature {
            name: &method.name,
            params: method.params.len(),
            ret: method.ret,
            loc: method.loc.as_ref(),
            keep_name,
        };
        let attrs = &method.attrs;

        let mut info = MethodAniInfo {
            sts_native_name: format!("{}_inner", method.name),
            sts_params: sts_params(&method.params),
            ..Default::default()
        };

        if let Some(get) = attrs.get_last("get") {
            info.get_name = resolve_getter(diags, &sig, get);
        } else if let Some(set) = attrs.get_last("set") {
            info.set_name = resolve_setter(diags, &sig, set);
        }
        if let Some(name) = &info.get_name {
            info.ani_method_name = format!("<get>{}", name);
            return info;
        }
        if let Some(name) = &info.set_name {
            info.ani_method_name = format!("<set>{}", name);
            return info;
        }

        let (name, on_off) = resolve_plain(diags, &sig, attrs);
        info.ani_method_name = name.clone();
        if let Some(attr) = attrs.get_last("gen_async") {
            info.async_name = resolve_suffixed(diags, attr, &name);
        }
        if let Some(attr) = attrs.get_last("gen_promise") {
            info.promise_name = resolve_suffixed(diags, attr, &name);
        }
        info.sts_method_name = Some(name);
        info.on_off = on_off;
        info
    }

    pub fn call_native_with(&self, sts_args: &[String]) -> String {
        format!("this.{}({})", self.sts_native_name, sts_args.join(", "))
    }
}

fn is_sts_this(param: &Param) -> bool {
    param.attrs.has("sts_this")
}

fn sts_params(params: &[Param]) -> Vec<usize> {
    params
        .iter()
        .enumerate()
        .filter(|(_, p)| !is_sts_this(p))
        .map(|(i, _)| i)
        .collect()
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn strip_prefix_ci<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let head = name.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        name.get(prefix.len()..)
    } else {
        None
    }
}

fn strip_suffix_ci<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    let split = name.len().checked_sub(suffix.len())?;
    let tail = name.get(split..)?;
    if tail.eq_ignore_ascii_case(suffix) {
        name.get(..split)
    } else {
        None
    }
}

fn resolve_getter(diags: &mut Diagnostics, sig: &Signature<'_>, attr: &Attr) -> Option<String> {
    let loc = attr.loc.as_ref().or(sig.loc);
    if sig.params != 0 || sig.ret.is_none() {
        diags.error("@get method should take no parameters and return non-void", loc);
    }
    match optional_str_arg(diags, attr) {
        Ok(Some(name)) => Some(name),
        Ok(None) => match strip_prefix_ci(sig.name, "get") {
            Some(rest) => Some(lower_first(rest)),
            None => {
                diags.error(
                    "@get method name must start with \"Get/get\" or have @get argument",
                    loc,
                );
                None
            }
        },
        Err(()) => None,
    }
}

fn resolve_setter(diags: &mut Diagnostics, sig: &Signature<'_>, attr: &Attr) -> Option<String> {
    let loc = attr.loc.as_ref().or(sig.loc);
    if sig.params != 1 || sig.ret.is_some() {
        diags.error("@set method should have one parameter and return void", loc);
    }
    match optional_str_arg(diags, attr) {
        Ok(Some(name)) => Some(name),
        Ok(None) => match strip_prefix_ci(sig.name, "set") {
            Some(rest) => Some(lower_first(rest)),
            None => {
                diags.error(
                    "@set method name must start with \"Set/set\" or have @set argument",
                    loc,
                );
                None
            }
        },
        Err(()) => None,
    }
}

/// Event or ordinary naming; returns the managed member name
fn resolve_plain(
    diags: &mut Diagnostics,
    sig: &Signature<'_>,
    attrs: &Attrs,
) -> (String, Option<OnOff>) {
    let overload = match attrs.get_last("overload") {
        Some(attr) => optional_str_arg(diags, attr).ok().flatten(),
        None => None,
    };
    if let Some(attr) = attrs.get_last("on_off") {
        if let Some(on_off) = resolve_on_off(diags, sig, attr, overload.as_deref()) {
            return (on_off.member.clone(), Some(on_off));
        }
    }
    let name = match overload {
        Some(name) => name,
        None if sig.keep_name => sig.name.to_string(),
        None => lower_first(sig.name),
    };
    (name, None)
}

fn resolve_on_off(
    diags: &mut Diagnostics,
    sig: &Signature<'_>,
    attr: &Attr,
    overload: Option<&str>,
) -> Option<OnOff> {
    let loc = attr.loc.as_ref().or(sig.loc);
    let explicit = optional_str_arg(diags, attr).ok()?;
    let (member, rest) = match overload {
        // An explicit event name frees the function name from the prefix.
        Some(member) if explicit.is_some() => (member.to_string(), ""),
        Some(prefix) => match strip_prefix_ci(sig.name, prefix) {
            Some(rest) => (prefix.to_string(), rest),
            None => {
                diags.error(
                    format!("@on_off method name must start with {}", prefix),
                    loc,
                );
                return None;
            }
        },
        None => {
            let matched = ["on", "off"]
                .into_iter()
                .find_map(|p| strip_prefix_ci(sig.name, p).map(|rest| (p.to_string(), rest)));
            match matched {
                Some(found) => found,
                None => {
                    diags.error(
                        "@on_off method name must start with \"On/on/Off/off\" or use together with @overload",
                        loc,
                    );
                    return None;
                }
            }
        }
    };
    Some(OnOff {
        member,
        event: explicit.unwrap_or_else(|| lower_first(rest)),
    })
}

/// `@gen_async` / `@gen_promise`: the argument, else the base name minus `Sync`
fn resolve_suffixed(diags: &mut Diagnostics, attr: &Attr, base: &str) -> Option<String> {
    match optional_str_arg(diags, attr) {
        Ok(Some(name)) => Some(name),
        Ok(None) => match strip_suffix_ci(base, "sync") {
            Some(stripped) => Some(stripped.to_string()),
            None => {
                diags.error(
                    format!(
                        "@{} method name must end with \"Sync\" or have @{} argument",
                        attr.name, attr.name
                    ),
                    attr.loc.as_ref(),
                );
                None
            }
        },
        Err(()) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::ir::{load_group, PackageGroup};

    fn group_with(functions: &str) -> PackageGroup {
        load_group(&format!(
            r#"{{"packages": [{{"name": "app", "functions": [{}]}}]}}"#,
            functions
        ))
        .unwrap()
    }

    fn analyze(group: &PackageGroup) -> (FuncAniInfo, Vec<String>) {
        let mut am = AnalysisManager::new(group, GeneratorConfig::default());
        let info = (*am.func_info(FuncId(0))).clone();
        let messages = am.diagnostics().items().iter().map(|d| d.message.clone()).collect();
        (info, messages)
    }

    #[test]
    fn test_plain_name() {
        let group = group_with(r#"{"name": "GetCount", "returns": {"kind": "i32"}}"#);
        let (info, diags) = analyze(&group);
        assert_eq!(info.sts_func_name.as_deref(), Some("getCount"));
        assert_eq!(info.sts_native_name, "GetCount_inner");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_on_off() {
        let group = group_with(
            r#"{"name": "OnClick", "params": [{"name": "cb", "type": {"kind": "callback"}}],
                "attrs": [{"name": "on_off"}]}"#,
        );
        let (info, diags) = analyze(&group);
        let on_off = info.on_off.unwrap();
        assert_eq!(on_off.member, "on");
        assert_eq!(on_off.event, "click");
        assert_eq!(info.sts_func_name.as_deref(), Some("on"));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_on_off_with_overload() {
        let group = group_with(
            r#"{"name": "WatchSize", "attrs": [
                {"name": "on_off", "args": ["resize"]},
                {"name": "overload", "args": ["watch"]}]}"#,
        );
        let (info, _) = analyze(&group);
        assert_eq!(
            info.on_off,
            Some(OnOff {
                member: "watch".to_string(),
                event: "resize".to_string()
            })
        );

        // The event name is given, so the function name is free.
        let group = group_with(
            r#"{"name": "Listen", "attrs": [
                {"name": "on_off", "args": ["resize"]},
                {"name": "overload", "args": ["watch"]}]}"#,
        );
        let (info, diags) = analyze(&group);
        assert!(diags.is_empty());
        assert_eq!(info.sts_func_name.as_deref(), Some("watch"));
        assert_eq!(
            info.on_off,
            Some(OnOff {
                member: "watch".to_string(),
                event: "resize".to_string()
            })
        );

        let group = group_with(
            r#"{"name": "Listen", "attrs": [{"name": "on_off"}, {"name": "overload", "args": ["watch"]}]}"#,
        );
        let (info, diags) = analyze(&group);
        assert_eq!(diags, vec!["@on_off method name must start with watch"]);
        assert_eq!(info.sts_func_name.as_deref(), Some("watch"));
        assert!(info.on_off.is_none());
    }

    #[test]
    fn test_static_getter() {
        let group = group_with(
            r#"{"name": "GetVersion", "returns": {"kind": "string"},
                "attrs": [{"name": "static", "args": ["Build"]}, {"name": "get"}]}"#,
        );
        let (info, diags) = analyze(&group);
        assert_eq!(info.static_scope.as_deref(), Some("Build"));
        assert_eq!(info.get_name.as_deref(), Some("version"));
        assert!(info.sts_func_name.is_none());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_static_getter_bad_name_falls_back() {
        let group = group_with(
            r#"{"name": "Version", "returns": {"kind": "string"},
                "attrs": [{"name": "static", "args": ["Build"]}, {"name": "get"}]}"#,
        );
        let (info, diags) = analyze(&group);
        assert_eq!(
            diags,
            vec!["@get method name must start with \"Get/get\" or have @get argument"]
        );
        assert!(info.get_name.is_none());
        assert_eq!(info.sts_func_name.as_deref(), Some("version"));
        assert_eq!(info.static_scope.as_deref(), Some("Build"));
    }

    #[test]
    fn test_getter_without_static() {
        let group = group_with(
            r#"{"name": "GetSize", "returns": {"kind": "i32"}, "attrs": [{"name": "get"}]}"#,
        );
        let (info, diags) = analyze(&group);
        assert_eq!(
            diags,
            vec!["@get of global functions must be used together with @static"]
        );
        assert_eq!(info.sts_func_name.as_deref(), Some("getSize"));
    }

    #[test]
    fn test_setter_shape() {
        let group = group_with(
            r#"{"name": "SetLevel", "returns": {"kind": "i32"},
                "attrs": [{"name": "static", "args": ["Log"]}, {"name": "set"}]}"#,
        );
        let (info, diags) = analyze(&group);
        assert_eq!(diags, vec!["@set method should have one parameter and return void"]);
        assert_eq!(info.set_name.as_deref(), Some("level"));
    }

    #[test]
    fn test_ctor_wins() {
        let group = group_with(
            r#"{"name": "Create", "attrs": [
                {"name": "ctor", "args": ["Shape"]},
                {"name": "static", "args": ["Shape"]},
                {"name": "get"}]}"#,
        );
        let (info, diags) = analyze(&group);
        assert_eq!(info.ctor_scope.as_deref(), Some("Shape"));
        assert!(info.sts_func_name.is_none());
        assert!(info.get_name.is_none());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_async_names() {
        let group = group_with(
            r#"{"name": "FetchSync", "attrs": [{"name": "gen_async"}, {"name": "gen_promise", "args": ["fetchP"]}]}"#,
        );
        let (info, diags) = analyze(&group);
        assert_eq!(info.async_name.as_deref(), Some("fetch"));
        assert_eq!(info.promise_name.as_deref(), Some("fetchP"));
        assert!(diags.is_empty());

        let group = group_with(r#"{"name": "Fetch", "attrs": [{"name": "gen_async"}]}"#);
        let (info, diags) = analyze(&group);
        assert!(info.async_name.is_none());
        assert_eq!(
            diags,
            vec!["@gen_async method name must end with \"Sync\" or have @gen_async argument"]
        );
    }

    #[test]
    fn test_keep_name_and_overload() {
        let group = load_group(
            r#"{"packages": [{"name": "app", "attrs": [{"name": "sts_keep_name"}],
                "functions": [{"name": "DoThing"},
                              {"name": "DoOther", "attrs": [{"name": "overload", "args": ["other"]}]}]}]}"#,
        )
        .unwrap();
        let mut am = AnalysisManager::new(&group, GeneratorConfig::default());
        assert_eq!(am.func_info(FuncId(0)).sts_func_name.as_deref(), Some("DoThing"));
        assert_eq!(am.func_info(FuncId(1)).sts_func_name.as_deref(), Some("other"));
    }

    #[test]
    fn test_call_native_with_this() {
        let group = group_with(
            r#"{"name": "Area", "params": [
                {"name": "self", "type": {"kind": "opaque"}, "attrs": [{"name": "sts_this"}]},
                {"name": "scale", "type": {"kind": "f64"}}]}"#,
        );
        let (info, _) = analyze(&group);
        assert_eq!(info.sts_params, vec![1]);
        assert_eq!(
            info.call_native_with(&["factor".to_string()]),
            "Area_inner(this, factor)"
        );
    }

    #[test]
    fn test_method_accessors() {
        let group = load_group(
            r#"{"packages": [{"name": "app", "interfaces": [{"name": "Box", "methods": [
                {"name": "GetWidth", "returns": {"kind": "f64"}, "attrs": [{"name": "get"}]},
                {"name": "SetWidth", "params": [{"name": "w", "type": {"kind": "f64"}}],
                 "attrs": [{"name": "set"}]},
                {"name": "Resize", "params": [{"name": "w", "type": {"kind": "f64"}}]}
            ]}]}]}"#,
        )
        .unwrap();
        let mut am = AnalysisManager::new(&group, GeneratorConfig::default());
        assert_eq!(am.method_info(MethodId(0)).ani_method_name, "<get>width");
        assert_eq!(am.method_info(MethodId(1)).ani_method_name, "<set>width");
        let resize = am.method_info(MethodId(2));
        assert_eq!(resize.ani_method_name, "resize");
        assert_eq!(
            resize.call_native_with(&["w".to_string()]),
            "this.Resize_inner(w)"
        );
        assert!(am.diagnostics().is_empty());
    }
}
