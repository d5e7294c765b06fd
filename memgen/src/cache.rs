//! Memoization of generated modules.
//!
//! Generating a module with parameters identical to an earlier request
//! returns the earlier module. Modules are keyed by the type of their
//! generator and a canonical serialization of their parameters.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arcstr::ArcStr;
use serde::Serialize;
use slotmap::SlotMap;
use thiserror::Error;

use crate::module::{Module, ModuleKey};

/// An enumeration of module cache errors.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum CacheError {
    #[error("failed to serialize generator parameters: {0}")]
    Serialization(String),

    #[error("module {0} requested itself while it was being generated")]
    Cycle(ArcStr),

    #[error("no module with the given key")]
    NotFound,

    #[error("module key is already bound to module {0}")]
    AlreadySet(ArcStr),
}

/// Serializes generator parameters into a canonical byte buffer.
pub fn serialize_params<T: Serialize>(params: &T) -> Result<Vec<u8>, CacheError> {
    let mut s = flexbuffers::FlexbufferSerializer::new();
    params
        .serialize(&mut s)
        .map_err(|e| CacheError::Serialization(e.to_string()))?;
    Ok(s.take_buffer())
}

/// The identity of a generated module.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ParamKey {
    t: TypeId,
    params: Vec<u8>,
}

impl ParamKey {
    pub fn new<G: 'static, P: Serialize>(params: &P) -> Result<Self, CacheError> {
        Ok(Self {
            t: TypeId::of::<G>(),
            params: serialize_params(params)?,
        })
    }
}

/// The outcome of a cache lookup.
#[derive(Debug, Clone)]
pub enum GeneratedCheck<T, K> {
    /// The value was generated earlier.
    Exists(T),
    /// The value must be generated and stored under the given key.
    MustGenerate(K),
}

#[derive(Debug)]
struct Slot {
    name: ArcStr,
    module: Option<Arc<Module>>,
}

/// A store of frozen modules.
///
/// Every module receives a [`ModuleKey`] when its generation starts
/// and a name that no other module in the cache uses.
#[derive(Debug, Default)]
pub struct ModuleCache {
    keys: HashMap<ParamKey, ModuleKey>,
    slots: SlotMap<ModuleKey, Slot>,
    names: HashSet<ArcStr>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the module generated for `key`, or reserves a new [`ModuleKey`] for it.
    ///
    /// A module whose generation has started but not finished is reported as a cycle.
    pub fn get(
        &mut self,
        key: ParamKey,
        base_name: impl Into<ArcStr>,
    ) -> Result<GeneratedCheck<Arc<Module>, ModuleKey>, CacheError> {
        if let Some(id) = self.keys.get(&key) {
            let slot = self.slots.get(*id).ok_or(CacheError::NotFound)?;
            return match slot.module {
                Some(ref module) => Ok(GeneratedCheck::Exists(module.clone())),
                None => Err(CacheError::Cycle(slot.name.clone())),
            };
        }
        let name = self.alloc_name(base_name);
        self.names.insert(name.clone());
        let id = self.slots.insert(Slot { name, module: None });
        self.keys.insert(key, id);
        Ok(GeneratedCheck::MustGenerate(id))
    }

    /// Releases a key whose generation failed, so that a later request may retry.
    pub fn abandon(&mut self, id: ModuleKey) {
        if let Some(slot) = self.slots.remove(id) {
            self.names.remove(&slot.name);
        }
        self.keys.retain(|_, v| *v != id);
    }

    /// The name reserved for the module with the given key.
    pub fn name(&self, id: ModuleKey) -> Result<&ArcStr, CacheError> {
        Ok(&self.slots.get(id).ok_or(CacheError::NotFound)?.name)
    }

    /// Stores a frozen module under its key and returns the shared handle.
    pub fn set(&mut self, module: Arc<Module>) -> Result<Arc<Module>, CacheError> {
        let slot = self
            .slots
            .get_mut(module.id())
            .ok_or(CacheError::NotFound)?;
        if let Some(ref existing) = slot.module {
            return Err(CacheError::AlreadySet(existing.name().clone()));
        }
        slot.module = Some(module.clone());
        Ok(module)
    }

    pub fn get_by_id(&self, id: ModuleKey) -> Result<&Arc<Module>, CacheError> {
        self.slots
            .get(id)
            .and_then(|slot| slot.module.as_ref())
            .ok_or(CacheError::NotFound)
    }

    /// Returns a name derived from `base_name` that no module in the cache uses.
    pub fn alloc_name(&self, base_name: impl Into<ArcStr>) -> ArcStr {
        let base_name = base_name.into();
        if !self.names.contains(&base_name) {
            return base_name;
        }
        (1..)
            .map(|i| arcstr::format!("{}_{}", base_name, i))
            .find(|name| !self.names.contains(name))
            .unwrap_or(base_name)
    }

    /// The number of finished modules.
    pub fn len(&self) -> usize {
        self.modules().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every finished module, in key order.
    pub fn modules(&self) -> impl Iterator<Item = &Arc<Module>> {
        self.slots.values().filter_map(|slot| slot.module.as_ref())
    }
}
