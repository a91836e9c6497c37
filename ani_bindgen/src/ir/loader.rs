//! JSON input lowering.
//!
//! The front-end hands over its resolved tree as JSON. Loading happens in
//! two passes: the first assigns an id to every named declaration so that
//! type expressions can refer forward, the second lowers bodies and types
//! into the arenas.

use std::collections::HashMap;
use std::path::Path;

use ani_bindgen_runtime::ScalarKind;
use serde::Deserialize;

use super::*;
use crate::error::{GenError, GenResult};

// ========== Input document ==========

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGroup {
    packages: Vec<RawPackage>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPackage {
    name: String,
    #[serde(default)]
    attrs: Attrs,
    #[serde(default)]
    loc: Option<SourceLoc>,
    #[serde(default)]
    functions: Vec<RawFunc>,
    #[serde(default)]
    interfaces: Vec<RawIface>,
    #[serde(default)]
    structs: Vec<RawStruct>,
    #[serde(default)]
    unions: Vec<RawUnion>,
    #[serde(default)]
    enums: Vec<RawEnum>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFunc {
    name: String,
    #[serde(default)]
    params: Vec<RawParam>,
    #[serde(default)]
    returns: Option<RawType>,
    #[serde(default)]
    attrs: Attrs,
    #[serde(default)]
    loc: Option<SourceLoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawParam {
    name: String,
    #[serde(rename = "type")]
    ty: RawType,
    #[serde(default)]
    attrs: Attrs,
    #[serde(default)]
    loc: Option<SourceLoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawIface {
    name: String,
    #[serde(default)]
    extends: Vec<RawType>,
    #[serde(default)]
    methods: Vec<RawFunc>,
    #[serde(default)]
    attrs: Attrs,
    #[serde(default)]
    loc: Option<SourceLoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStruct {
    name: String,
    #[serde(default)]
    fields: Vec<RawParam>,
    #[serde(default)]
    attrs: Attrs,
    #[serde(default)]
    loc: Option<SourceLoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawUnionField {
    name: String,
    #[serde(rename = "type", default)]
    ty: Option<RawType>,
    #[serde(default)]
    attrs: Attrs,
    #[serde(default)]
    loc: Option<SourceLoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawUnion {
    name: String,
    #[serde(default)]
    fields: Vec<RawUnionField>,
    #[serde(default)]
    attrs: Attrs,
    #[serde(default)]
    loc: Option<SourceLoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEnumItem {
    name: String,
    #[serde(default)]
    loc: Option<SourceLoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEnum {
    name: String,
    #[serde(rename = "type")]
    ty: RawType,
    #[serde(default)]
    items: Vec<RawEnumItem>,
    #[serde(default)]
    attrs: Attrs,
    #[serde(default)]
    loc: Option<SourceLoc>,
}

#[derive(Debug, Deserialize)]
struct RawType {
    #[serde(flatten)]
    kind: RawTypeKind,
    #[serde(default)]
    attrs: Attrs,
    #[serde(default)]
    loc: Option<SourceLoc>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum RawTypeKind {
    Bool,
    F32,
    F64,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    String,
    Opaque,
    Named {
        name: String,
    },
    Array {
        item: Box<RawType>,
    },
    Optional {
        item: Box<RawType>,
    },
    Map {
        key: Box<RawType>,
        value: Box<RawType>,
    },
    Callback {
        #[serde(default)]
        params: Vec<RawType>,
        #[serde(default)]
        returns: Option<Box<RawType>>,
    },
}

impl RawTypeKind {
    fn scalar(&self) -> Option<ScalarKind> {
        Some(match self {
            RawTypeKind::Bool => ScalarKind::Bool,
            RawTypeKind::F32 => ScalarKind::F32,
            RawTypeKind::F64 => ScalarKind::F64,
            RawTypeKind::I8 => ScalarKind::I8,
            RawTypeKind::I16 => ScalarKind::I16,
            RawTypeKind::I32 => ScalarKind::I32,
            RawTypeKind::I64 => ScalarKind::I64,
            RawTypeKind::U8 => ScalarKind::U8,
            RawTypeKind::U16 => ScalarKind::U16,
            RawTypeKind::U32 => ScalarKind::U32,
            RawTypeKind::U64 => ScalarKind::U64,
            _ => return None,
        })
    }
}

// ========== Lowering ==========

#[derive(Debug, Clone, Copy)]
enum NamedDecl {
    Struct(StructId),
    Union(UnionId),
    Enum(EnumId),
    Iface(IfaceId),
}

/// Parse a JSON document into a package group
pub fn load_group(json: &str) -> GenResult<PackageGroup> {
    let raw: RawGroup = serde_json::from_str(json)?;
    Loader::default().lower(raw)
}

pub fn load_group_from_path<P: AsRef<Path>>(path: P) -> GenResult<PackageGroup> {
    let text = std::fs::read_to_string(path.as_ref()).map_err(|e| GenError::io(&path, e))?;
    load_group(&text)
}

#[derive(Debug, Default)]
struct Loader {
    group: PackageGroup,
    package_ids: HashMap<String, PackageId>,
    names: HashMap<(PackageId, String), NamedDecl>,
}

impl Loader {
    fn lower(mut self, raw: RawGroup) -> GenResult<PackageGroup> {
        self.declare(&raw)?;
        for (index, package) in raw.packages.into_iter().enumerate() {
            self.lower_package(PackageId(index), package)?;
        }
        self.check_iface_parents()?;
        tracing::debug!(
            packages = self.group.packages.len(),
            types = self.group.types.len(),
            "loaded package group"
        );
        Ok(self.group)
    }

    /// First pass: package ids and declaration ids, in document order
    fn declare(&mut self, raw: &RawGroup) -> GenResult<()> {
        let (mut structs, mut unions, mut enums, mut ifaces) = (0, 0, 0, 0);
        for (index, package) in raw.packages.iter().enumerate() {
            let id = PackageId(index);
            if package.name.is_empty() || package.name.split('.').any(str::is_empty) {
                return Err(GenError::input(format!(
                    "invalid package name `{}`",
                    package.name
                )));
            }
            if self.package_ids.insert(package.name.clone(), id).is_some() {
                return Err(GenError::input(format!(
                    "duplicate package `{}`",
                    package.name
                )));
            }
            let mut named = Vec::new();
            for s in &package.structs {
                named.push((s.name.clone(), NamedDecl::Struct(StructId(structs))));
                structs += 1;
            }
            for u in &package.unions {
                named.push((u.name.clone(), NamedDecl::Union(UnionId(unions))));
                unions += 1;
            }
            for e in &package.enums {
                named.push((e.name.clone(), NamedDecl::Enum(EnumId(enums))));
                enums += 1;
            }
            for i in &package.interfaces {
                named.push((i.name.clone(), NamedDecl::Iface(IfaceId(ifaces))));
                ifaces += 1;
            }
            for (name, decl) in named {
                if self.names.insert((id, name.clone()), decl).is_some() {
                    return Err(GenError::input(format!(
                        "duplicate declaration `{}` in package `{}`",
                        name, package.name
                    )));
                }
            }
        }
        Ok(())
    }

    fn lower_package(&mut self, id: PackageId, raw: RawPackage) -> GenResult<()> {
        let mut package = Package {
            name: raw.name,
            functions: Vec::new(),
            ifaces: Vec::new(),
            structs: Vec::new(),
            unions: Vec::new(),
            enums: Vec::new(),
            attrs: raw.attrs,
            loc: raw.loc,
        };

        for s in raw.structs {
            let mut fields = Vec::with_capacity(s.fields.len());
            for f in s.fields {
                fields.push(StructField {
                    name: f.name,
                    ty: self.lower_type(id, &package.name, f.ty)?,
                    attrs: f.attrs,
                    loc: f.loc,
                });
            }
            package.structs.push(StructId(self.group.structs.len()));
            self.group.structs.push(StructDecl {
                name: s.name,
                fields,
                attrs: s.attrs,
                loc: s.loc,
                package: id,
            });
        }

        for u in raw.unions {
            let mut fields = Vec::with_capacity(u.fields.len());
            for f in u.fields {
                let ty = match f.ty {
                    Some(ty) => Some(self.lower_type(id, &package.name, ty)?),
                    None => None,
                };
                fields.push(UnionField {
                    name: f.name,
                    ty,
                    attrs: f.attrs,
                    loc: f.loc,
                });
            }
            package.unions.push(UnionId(self.group.unions.len()));
            self.group.unions.push(UnionDecl {
                name: u.name,
                fields,
                attrs: u.attrs,
                loc: u.loc,
                package: id,
            });
        }

        for e in raw.enums {
            let ty = self.lower_type(id, &package.name, e.ty)?;
            package.enums.push(EnumId(self.group.enums.len()));
            self.group.enums.push(EnumDecl {
                name: e.name,
                ty,
                items: e
                    .items
                    .into_iter()
                    .map(|item| EnumItem {
                        name: item.name,
                        loc: item.loc,
                    })
                    .collect(),
                attrs: e.attrs,
                loc: e.loc,
                package: id,
            });
        }

        for i in raw.interfaces {
            let iface_id = IfaceId(self.group.ifaces.len());
            let mut parents = Vec::with_capacity(i.extends.len());
            for parent in i.extends {
                let loc = parent.loc.clone();
                parents.push(IfaceParent {
                    ty: self.lower_type(id, &package.name, parent)?,
                    loc,
                });
            }
            let mut methods = Vec::with_capacity(i.methods.len());
            for m in i.methods {
                let (params, ret) = self.lower_signature(id, &package.name, m.params, m.returns)?;
                methods.push(MethodId(self.group.methods.len()));
                self.group.methods.push(MethodDecl {
                    name: m.name,
                    params,
                    ret,
                    attrs: m.attrs,
                    loc: m.loc,
                    iface: iface_id,
                });
            }
            package.ifaces.push(iface_id);
            self.group.ifaces.push(IfaceDecl {
                name: i.name,
                parents,
                methods,
                attrs: i.attrs,
                loc: i.loc,
                package: id,
            });
        }

        for f in raw.functions {
            let (params, ret) = self.lower_signature(id, &package.name, f.params, f.returns)?;
            package.functions.push(FuncId(self.group.functions.len()));
            self.group.functions.push(FuncDecl {
                name: f.name,
                params,
                ret,
                attrs: f.attrs,
                loc: f.loc,
                package: id,
            });
        }

        self.group.packages.push(package);
        Ok(())
    }

    fn lower_signature(
        &mut self,
        pkg: PackageId,
        pkg_name: &str,
        raw_params: Vec<RawParam>,
        returns: Option<RawType>,
    ) -> GenResult<(Vec<Param>, Option<TypeRefId>)> {
        let mut params = Vec::with_capacity(raw_params.len());
        for p in raw_params {
            params.push(Param {
                name: p.name,
                ty: self.lower_type(pkg, pkg_name, p.ty)?,
                attrs: p.attrs,
                loc: p.loc,
            });
        }
        let ret = match returns {
            Some(ty) => Some(self.lower_type(pkg, pkg_name, ty)?),
            None => None,
        };
        Ok((params, ret))
    }

    fn lower_type(&mut self, pkg: PackageId, pkg_name: &str, raw: RawType) -> GenResult<TypeRefId> {
        let (ty, text) = match raw.kind {
            RawTypeKind::String => (Type::String, "String".to_string()),
            RawTypeKind::Opaque => (Type::Opaque, "Opaque".to_string()),
            RawTypeKind::Named { name } => (self.resolve(pkg, pkg_name, &name)?, name),
            RawTypeKind::Array { item } => {
                let item = self.lower_type(pkg, pkg_name, *item)?;
                let text = format!("Array<{}>", self.text_of(item));
                (Type::Array(item), text)
            }
            RawTypeKind::Optional { item } => {
                let item = self.lower_type(pkg, pkg_name, *item)?;
                let text = format!("Optional<{}>", self.text_of(item));
                (Type::Optional(item), text)
            }
            RawTypeKind::Map { key, value } => {
                let key = self.lower_type(pkg, pkg_name, *key)?;
                let value = self.lower_type(pkg, pkg_name, *value)?;
                let text = format!("Map<{}, {}>", self.text_of(key), self.text_of(value));
                (Type::Map(key, value), text)
            }
            RawTypeKind::Callback { params, returns } => {
                let mut lowered = Vec::with_capacity(params.len());
                for p in params {
                    lowered.push(self.lower_type(pkg, pkg_name, p)?);
                }
                let ret = match returns {
                    Some(r) => Some(self.lower_type(pkg, pkg_name, *r)?),
                    None => None,
                };
                let args: Vec<&str> = lowered.iter().map(|p| self.text_of(*p)).collect();
                let ret_text = ret.map_or("void", |r| self.text_of(r));
                let text = format!("({}) => {}", args.join(", "), ret_text);
                (
                    Type::Callback {
                        params: lowered,
                        ret,
                    },
                    text,
                )
            }
            scalar => {
                let kind = scalar
                    .scalar()
                    .ok_or_else(|| GenError::internal("unhandled type kind"))?;
                (Type::Scalar(kind), kind.name().to_string())
            }
        };
        let id = TypeRefId(self.group.types.len());
        self.group.types.push(TypeRef {
            ty,
            text,
            attrs: raw.attrs,
            loc: raw.loc,
        });
        Ok(id)
    }

    fn text_of(&self, id: TypeRefId) -> &str {
        &self.group.types[id.0].text
    }

    /// `Name` resolves in the current package, `pkg.Name` in `pkg`
    fn resolve(&self, pkg: PackageId, pkg_name: &str, name: &str) -> GenResult<Type> {
        let unresolved = || GenError::UnresolvedType {
            name: name.to_string(),
            package: pkg_name.to_string(),
        };
        let (owner, decl) = match name.rsplit_once('.') {
            Some((owner, decl)) => (*self.package_ids.get(owner).ok_or_else(unresolved)?, decl),
            None => (pkg, name),
        };
        let found = self
            .names
            .get(&(owner, decl.to_string()))
            .ok_or_else(unresolved)?;
        Ok(match *found {
            NamedDecl::Struct(id) => Type::Struct(id),
            NamedDecl::Union(id) => Type::Union(id),
            NamedDecl::Enum(id) => Type::Enum(id),
            NamedDecl::Iface(id) => Type::Iface(id),
        })
    }

    fn check_iface_parents(&self) -> GenResult<()> {
        for iface in &self.group.ifaces {
            for parent in &iface.parents {
                let ty = &self.group.types[parent.ty.0];
                if !matches!(ty.ty, Type::Iface(_)) {
                    return Err(GenError::input(format!(
                        "interface `{}` extends non-interface type `{}`",
                        iface.name, ty.text
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEO: &str = r#"{
        "packages": [
            {
                "name": "geo",
                "structs": [
                    {"name": "Point", "fields": [
                        {"name": "x", "type": {"kind": "f64"}},
                        {"name": "tags", "type": {"kind": "array", "item": {"kind": "string"}}}
                    ]}
                ],
                "functions": [
                    {"name": "Origin", "returns": {"kind": "named", "name": "Point"},
                     "attrs": [{"name": "overload", "args": ["origin"]}]},
                    {"name": "Lookup", "params": [
                        {"name": "table", "type": {"kind": "map", "key": {"kind": "string"},
                         "value": {"kind": "named", "name": "other.Color"},
                         "attrs": [{"name": "record"}]}}
                    ]}
                ]
            },
            {
                "name": "other",
                "enums": [{"name": "Color", "type": {"kind": "i32"}, "items": [{"name": "RED"}]}]
            }
        ]
    }"#;

    #[test]
    fn test_load_and_resolve() {
        let group = load_group(GEO).unwrap();
        assert_eq!(group.packages.len(), 2);
        let geo = group.package(PackageId(0));
        assert_eq!(geo.segments(), vec!["geo"]);

        let origin = group.function(geo.functions[0]);
        let ret = group.type_ref(origin.ret.unwrap());
        assert_eq!(ret.ty, Type::Struct(StructId(0)));
        assert_eq!(origin.attrs.get_last("overload").unwrap().str_arg(0), Some("origin"));

        let lookup = group.function(geo.functions[1]);
        let table = group.type_ref(lookup.params[0].ty);
        assert_eq!(table.text, "Map<String, other.Color>");
        assert!(table.attrs.has("record"));
        match table.ty {
            Type::Map(_, value) => assert_eq!(group.type_ref(value).ty, Type::Enum(EnumId(0))),
            ref other => panic!("expected map, got {:?}", other),
        }

        let point = group.struct_decl(StructId(0));
        assert_eq!(group.type_ref(point.fields[1].ty).text, "Array<String>");
    }

    #[test]
    fn test_unresolved_name() {
        let json = r#"{"packages": [{"name": "a", "functions": [
            {"name": "f", "returns": {"kind": "named", "name": "Missing"}}
        ]}]}"#;
        match load_group(json) {
            Err(GenError::UnresolvedType { name, package }) => {
                assert_eq!(name, "Missing");
                assert_eq!(package, "a");
            }
            other => panic!("expected unresolved type, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicates_rejected() {
        let packages = r#"{"packages": [{"name": "a"}, {"name": "a"}]}"#;
        assert!(matches!(load_group(packages), Err(GenError::Input(_))));

        let decls = r#"{"packages": [{"name": "a",
            "structs": [{"name": "X"}], "unions": [{"name": "X"}]}]}"#;
        assert!(matches!(load_group(decls), Err(GenError::Input(_))));
    }

    #[test]
    fn test_iface_must_extend_iface() {
        let json = r#"{"packages": [{"name": "a",
            "structs": [{"name": "S"}],
            "interfaces": [{"name": "I", "extends": [{"kind": "named", "name": "S"}]}]}]}"#;
        assert!(matches!(load_group(json), Err(GenError::Input(_))));
    }

    #[test]
    fn test_callback_text() {
        let json = r#"{"packages": [{"name": "a", "functions": [
            {"name": "f", "params": [{"name": "cb", "type": {"kind": "callback",
                "params": [{"kind": "i32"}, {"kind": "string"}]}}]}
        ]}]}"#;
        let group = load_group(json).unwrap();
        let f = group.function(FuncId(0));
        assert_eq!(group.type_ref(f.params[0].ty).text, "(i32, String) => void");
    }
}
