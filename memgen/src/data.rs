//! The shared generation context.

use std::any::Any;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use arcstr::ArcStr;
use serde::Serialize;

use crate::cache::{GeneratedCheck, ModuleCache, ParamKey};
use crate::config::GeneratorConfig;
use crate::contact::ContactSizer;
use crate::error::{with_err_context, ErrorContext, Result};
use crate::module::{Instance, Module, ModuleKey};
use crate::rules::RuleDeck;
use crate::{debug, trace};

/// A generator of layout modules.
///
/// Each distinct value of [`Generator::Params`] produces one module per
/// [`MemgenCtx`]; later requests with equal parameters share it.
pub trait Generator: Any {
    /// The parameter type.
    type Params: Serialize;

    /// The desired name of the generated module.
    ///
    /// The cache appends a suffix if another module already uses the name.
    fn name(params: &Self::Params) -> ArcStr;

    /// Builds the module.
    fn generate(params: &Self::Params, ctx: &MemgenCtx) -> Result<Module>;
}

/// Services shared by every generator of a run.
///
/// Cloning is cheap; clones share the same module cache.
#[derive(Clone)]
pub struct MemgenCtx {
    config: Arc<GeneratorConfig>,
    rules: Arc<dyn RuleDeck>,
    sizer: Arc<ContactSizer>,
    cache: Arc<RwLock<ModuleCache>>,
}

impl std::fmt::Debug for MemgenCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemgenCtx")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MemgenCtx {
    /// Validates `config` against `rules` and creates a context with an empty cache.
    pub fn new(config: impl Into<Arc<GeneratorConfig>>, rules: Arc<dyn RuleDeck>) -> Result<Self> {
        let config = config.into();
        config.validate(rules.as_ref())?;
        Ok(Self {
            config,
            sizer: Arc::new(ContactSizer::new(rules.clone())),
            rules,
            cache: Arc::new(RwLock::new(ModuleCache::new())),
        })
    }

    #[inline]
    pub fn config(&self) -> &Arc<GeneratorConfig> {
        &self.config
    }

    #[inline]
    pub fn rules(&self) -> &Arc<dyn RuleDeck> {
        &self.rules
    }

    #[inline]
    pub fn sizer(&self) -> &Arc<ContactSizer> {
        &self.sizer
    }

    #[inline]
    pub fn cache(&self) -> RwLockReadGuard<ModuleCache> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    fn cache_mut(&self) -> RwLockWriteGuard<ModuleCache> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the module generated by `G` for `params`, generating it on first use.
    pub fn instantiate<G: Generator>(&self, params: &G::Params) -> Result<Arc<Module>> {
        let key = ParamKey::new::<G, _>(params)?;
        let check = self.cache_mut().get(key, G::name(params))?;
        match check {
            GeneratedCheck::Exists(module) => {
                trace!("module cache hit: {}", module.name());
                Ok(module)
            }
            GeneratedCheck::MustGenerate(id) => {
                let result = self.generate::<G>(params, id);
                if result.is_err() {
                    self.cache_mut().abandon(id);
                }
                result
            }
        }
    }

    /// Places the module generated by `G` for `params` as a new instance.
    pub fn instance<G: Generator>(
        &self,
        name: impl Into<ArcStr>,
        params: &G::Params,
        connections: impl IntoIterator<Item = impl Into<ArcStr>>,
    ) -> Result<Instance> {
        let module = self.instantiate::<G>(params)?;
        Ok(Instance::new(name, module, connections)?)
    }

    fn generate<G: Generator>(&self, params: &G::Params, id: ModuleKey) -> Result<Arc<Module>> {
        let name = self.cache().name(id)?.clone();
        debug!("module cache miss: generating {}", name);
        let ctx = || ErrorContext::BuildModule { name: name.clone() };
        let mut module = with_err_context(G::generate(params, self), ctx)?;
        module.set_id(id);
        module.set_name(name.clone());
        let module = with_err_context(module.into_frozen(), ctx)?;
        Ok(self.cache_mut().set(module)?)
    }
}
