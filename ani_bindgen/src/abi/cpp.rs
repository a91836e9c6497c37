//! C++ spellings of IDL declarations and types.
//!
//! These are the names the native projection headers declare; generated
//! glue only refers to them.

use crate::ir::{EnumId, FuncId, IfaceId, PackageGroup, PackageId, StructId, Type, TypeRefId, UnionId};

#[derive(Debug, Clone, Copy)]
pub struct CppNames<'g> {
    group: &'g PackageGroup,
}

impl<'g> CppNames<'g> {
    pub fn new(group: &'g PackageGroup) -> Self {
        Self { group }
    }

    /// `geo::shapes`
    pub fn namespace(&self, pkg: PackageId) -> String {
        self.group.package(pkg).segments().join("::")
    }

    fn qualify(&self, pkg: PackageId, name: &str) -> String {
        format!("::{}::{}", self.namespace(pkg), name)
    }

    // ========== Declarations ==========

    /// User implementation of a global function
    pub fn function(&self, id: FuncId) -> String {
        let func = self.group.function(id);
        self.qualify(func.package, &func.name)
    }

    pub fn struct_full(&self, id: StructId) -> String {
        let decl = self.group.struct_decl(id);
        self.qualify(decl.package, &decl.name)
    }

    pub fn union_full(&self, id: UnionId) -> String {
        let decl = self.group.union_decl(id);
        self.qualify(decl.package, &decl.name)
    }

    pub fn enum_full(&self, id: EnumId) -> String {
        let decl = self.group.enum_decl(id);
        self.qualify(decl.package, &decl.name)
    }

    pub fn iface_full(&self, id: IfaceId) -> String {
        let decl = self.group.iface(id);
        self.qualify(decl.package, &decl.name)
    }

    /// Non-owning interface handle
    pub fn iface_weak(&self, id: IfaceId) -> String {
        let decl = self.group.iface(id);
        format!("::{}::weak::{}", self.namespace(decl.package), decl.name)
    }

    /// C vtable struct of an interface
    pub fn iface_vtable(&self, id: IfaceId) -> String {
        let decl = self.group.iface(id);
        let mut parts = self.group.package(decl.package).segments();
        parts.push(decl.name.clone());
        format!("{}_vtable", parts.join("_"))
    }

    // ========== Headers ==========

    /// Projection header declaring a struct, union or interface type
    pub fn decl_header(&self, pkg: PackageId, name: &str) -> String {
        format!("{}.{}.proj.0.hpp", self.group.package(pkg).name, name)
    }

    /// Projection header defining it
    pub fn impl_header(&self, pkg: PackageId, name: &str) -> String {
        format!("{}.{}.proj.1.hpp", self.group.package(pkg).name, name)
    }

    /// Header declaring the user implementations of a package
    pub fn user_header(&self, pkg: PackageId) -> String {
        format!("{}.impl.hpp", self.group.package(pkg).name)
    }

    // ========== Types ==========

    /// Owning spelling of a type
    pub fn owner(&self, ty: TypeRefId) -> String {
        match &self.group.type_ref(ty).ty {
            Type::Scalar(kind) => kind.cpp_type().to_string(),
            Type::String => "::taihe::string".to_string(),
            Type::Opaque => "uintptr_t".to_string(),
            Type::Enum(id) => self.enum_full(*id),
            Type::Struct(id) => self.struct_full(*id),
            Type::Union(id) => self.union_full(*id),
            Type::Iface(id) => self.iface_full(*id),
            Type::Array(item) => format!("::taihe::array<{}>", self.owner(*item)),
            Type::Optional(item) => format!("::taihe::optional<{}>", self.owner(*item)),
            Type::Map(key, value) => {
                format!("::taihe::map<{}, {}>", self.owner(*key), self.owner(*value))
            }
            Type::Callback { params, ret } => {
                format!("::taihe::callback<{}>", self.signature(params, *ret))
            }
        }
    }

    /// Spelling used for parameters
    pub fn param(&self, ty: TypeRefId) -> String {
        match &self.group.type_ref(ty).ty {
            Type::String => "::taihe::string_view".to_string(),
            Type::Struct(_) | Type::Union(_) => format!("{} const&", self.owner(ty)),
            Type::Iface(id) => self.iface_weak(*id),
            Type::Array(item) => format!("::taihe::array_view<{}>", self.owner(*item)),
            Type::Optional(item) => format!("::taihe::optional_view<{}>", self.owner(*item)),
            Type::Map(key, value) => {
                format!("::taihe::map_view<{}, {}>", self.owner(*key), self.owner(*value))
            }
            Type::Callback { params, ret } => {
                format!("::taihe::callback_view<{}>", self.signature(params, *ret))
            }
            Type::Scalar(_) | Type::Opaque | Type::Enum(_) => self.owner(ty),
        }
    }

    /// Return type spelling; `void` when absent
    pub fn ret(&self, ty: Option<TypeRefId>) -> String {
        ty.map_or_else(|| "void".to_string(), |t| self.owner(t))
    }

    fn signature(&self, params: &[TypeRefId], ret: Option<TypeRefId>) -> String {
        let args: Vec<String> = params.iter().map(|p| self.param(*p)).collect();
        format!("{}({})", self.ret(ret), args.join(", "))
    }
}
