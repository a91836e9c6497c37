//! ANI analyses over the declaration tree.
//!
//! `AnalysisManager` is the single entry point: every analysis is requested
//! through it, computed on first use and memoized. Analyses may request
//! other analyses while they run; the manager is passed down explicitly.

pub mod attrs;
pub mod cache;
pub mod decls;
pub mod naming;
pub mod types;

use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

pub use attrs::check_attr_args;
pub use cache::AnalysisCache;
pub use decls::{
    EnumAniInfo, IfaceAniInfo, Namespace, NsId, PackageAniInfo, PackageGroupAniInfo,
    StructAniInfo, StructFinalField, UnionAniInfo, UnionFieldKind, UnionFinalField,
};
pub use naming::{FuncAniInfo, MethodAniInfo, OnOff};
pub use types::{DeclRef, Strategy, TypeAniInfo};

use crate::abi::CppNames;
use crate::config::GeneratorConfig;
use crate::error::{Diagnostics, GenError, GenResult};
use crate::ir::{
    EnumId, FuncId, IfaceId, MethodId, PackageGroup, PackageId, StructId, TypeRefId, UnionId,
};

#[derive(Debug)]
pub struct AnalysisManager<'g> {
    group: &'g PackageGroup,
    config: GeneratorConfig,
    diagnostics: Diagnostics,
    group_info: Option<Rc<PackageGroupAniInfo>>,
    packages: AnalysisCache<PackageId, PackageAniInfo>,
    funcs: AnalysisCache<FuncId, FuncAniInfo>,
    methods: AnalysisCache<MethodId, MethodAniInfo>,
    enums: AnalysisCache<EnumId, EnumAniInfo>,
    structs: AnalysisCache<StructId, StructAniInfo>,
    unions: AnalysisCache<UnionId, UnionAniInfo>,
    ifaces: AnalysisCache<IfaceId, IfaceAniInfo>,
    types: AnalysisCache<(TypeRefId, PackageId), TypeAniInfo>,
}

impl<'g> AnalysisManager<'g> {
    pub fn new(group: &'g PackageGroup, config: GeneratorConfig) -> Self {
        Self {
            group,
            config,
            diagnostics: Diagnostics::new(),
            group_info: None,
            packages: AnalysisCache::new("package"),
            funcs: AnalysisCache::new("function"),
            methods: AnalysisCache::new("method"),
            enums: AnalysisCache::new("enum"),
            structs: AnalysisCache::new("struct"),
            unions: AnalysisCache::new("union"),
            ifaces: AnalysisCache::new("interface"),
            types: AnalysisCache::new("type"),
        }
    }

    pub fn group(&self) -> &'g PackageGroup {
        self.group
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn cpp(&self) -> CppNames<'g> {
        CppNames::new(self.group)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    /// Whether declarations of `pkg` keep their names on the managed side
    pub fn keep_name(&self, pkg: PackageId) -> bool {
        self.config.keep_name || self.group.package(pkg).attrs.has("sts_keep_name")
    }

    /// Total constructor runs across every cache
    pub fn computations(&self) -> usize {
        self.packages.computations()
            + self.funcs.computations()
            + self.methods.computations()
            + self.enums.computations()
            + self.structs.computations()
            + self.unions.computations()
            + self.ifaces.computations()
            + self.types.computations()
    }

    fn cached<K, V>(
        &mut self,
        select: fn(&mut Self) -> &mut AnalysisCache<K, V>,
        key: K,
        compute: impl FnOnce(&mut Self) -> GenResult<V>,
    ) -> GenResult<Rc<V>>
    where
        K: Eq + Hash + Clone + Debug,
    {
        if let Some(hit) = select(self).get(&key) {
            return Ok(hit);
        }
        let cache = select(self);
        if !cache.begin(key.clone()) {
            return Err(GenError::input(format!(
                "{} {:?} depends on itself",
                cache.name(),
                key
            )));
        }
        match compute(self) {
            Ok(value) => Ok(select(self).finish(key, value)),
            Err(err) => {
                select(self).abandon(&key);
                Err(err)
            }
        }
    }

    // ========== Analyses ==========

    pub fn package_group_info(&mut self) -> Rc<PackageGroupAniInfo> {
        if let Some(info) = &self.group_info {
            return Rc::clone(info);
        }
        let info = Rc::new(PackageGroupAniInfo::analyze(self));
        self.group_info = Some(Rc::clone(&info));
        info
    }

    pub fn package_info(&mut self, id: PackageId) -> GenResult<Rc<PackageAniInfo>> {
        self.cached(|am| &mut am.packages, id, |am| PackageAniInfo::analyze(am, id))
    }

    pub fn func_info(&mut self, id: FuncId) -> Rc<FuncAniInfo> {
        if let Some(hit) = self.funcs.get(&id) {
            return hit;
        }
        self.funcs.begin(id);
        let info = FuncAniInfo::analyze(self, id);
        self.funcs.finish(id, info)
    }

    pub fn method_info(&mut self, id: MethodId) -> Rc<MethodAniInfo> {
        if let Some(hit) = self.methods.get(&id) {
            return hit;
        }
        self.methods.begin(id);
        let info = MethodAniInfo::analyze(self, id);
        self.methods.finish(id, info)
    }

    pub fn enum_info(&mut self, id: EnumId) -> GenResult<Rc<EnumAniInfo>> {
        self.cached(|am| &mut am.enums, id, |am| EnumAniInfo::analyze(am, id))
    }

    pub fn struct_info(&mut self, id: StructId) -> GenResult<Rc<StructAniInfo>> {
        self.cached(|am| &mut am.structs, id, |am| StructAniInfo::analyze(am, id))
    }

    pub fn union_info(&mut self, id: UnionId) -> GenResult<Rc<UnionAniInfo>> {
        self.cached(|am| &mut am.unions, id, |am| UnionAniInfo::analyze(am, id))
    }

    pub fn iface_info(&mut self, id: IfaceId) -> GenResult<Rc<IfaceAniInfo>> {
        self.cached(|am| &mut am.ifaces, id, |am| IfaceAniInfo::analyze(am, id))
    }

    /// Type mapping of `ty` as used from package `pkg`
    pub fn type_info(&mut self, ty: TypeRefId, pkg: PackageId) -> GenResult<Rc<TypeAniInfo>> {
        self.cached(|am| &mut am.types, (ty, pkg), |am| TypeAniInfo::analyze(am, ty, pkg))
    }
}
