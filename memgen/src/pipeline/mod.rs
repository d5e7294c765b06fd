//! Layout pipelines.
//!
//! A module variant is assembled by running an ordered list of [`Stage`]s
//! over a shared [`StageCtx`]. Variants differ only in which stages they
//! select; stages never call each other directly and communicate through
//! the context.

use std::sync::Arc;

use arcstr::ArcStr;

use crate::config::GeneratorConfig;
use crate::contact::ContactSizer;
use crate::data::MemgenCtx;
use crate::error::{with_err_context, ErrorContext, Result};
use crate::layers::Layer;
use crate::module::{Element, Module};
use crate::power::PowerGrid;
use crate::routing::{BusParams, BusParamsBuilder, BusRoute, PinRef};
use crate::rules::RuleDeck;
use crate::{debug, info};

pub mod stages;

pub use stages::{BuildPowerGrid, NormalizeOrigin, ReserveSupplies, RouteBuses};

/// A bus to be routed by the [`RouteBuses`] stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusRequest {
    pub params: BusParams,
    pub src: Vec<PinRef>,
    pub dst: Vec<PinRef>,
}

/// The state threaded through the stages of a [`Pipeline`].
pub struct StageCtx<'a> {
    ctx: &'a MemgenCtx,
    module: Module,
    pub(crate) buses: Vec<BusRequest>,
    pub(crate) routes: Vec<BusRoute>,
    /// Shapes that power straps on the same layer must stay clear of.
    pub(crate) blockages: Vec<Element>,
    pub(crate) grid: Option<PowerGrid>,
}

impl<'a> StageCtx<'a> {
    pub fn new(ctx: &'a MemgenCtx, module: Module) -> Self {
        Self {
            ctx,
            module,
            buses: Vec::new(),
            routes: Vec::new(),
            blockages: Vec::new(),
            grid: None,
        }
    }

    #[inline]
    pub fn ctx(&self) -> &MemgenCtx {
        self.ctx
    }

    #[inline]
    pub fn config(&self) -> &Arc<GeneratorConfig> {
        self.ctx.config()
    }

    #[inline]
    pub fn rules(&self) -> &Arc<dyn RuleDeck> {
        self.ctx.rules()
    }

    #[inline]
    pub fn sizer(&self) -> &Arc<ContactSizer> {
        self.ctx.sizer()
    }

    #[inline]
    pub fn module(&self) -> &Module {
        &self.module
    }

    #[inline]
    pub fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }

    #[inline]
    pub fn into_module(self) -> Module {
        self.module
    }

    /// A [`BusParamsBuilder`] preloaded with the configured margin, fill policy
    /// and via spacing.
    pub fn bus_params(&self) -> BusParamsBuilder {
        let config = self.config();
        let mut builder = BusParams::builder();
        builder.margin(config.bus.margin).fill(config.bus.fill);
        if let Some(spacing) = config.contacts.spacing {
            builder.via_spacing(spacing);
        }
        builder
    }

    /// Queues a bus for routing.
    pub fn add_bus(&mut self, params: BusParams, src: Vec<PinRef>, dst: Vec<PinRef>) {
        self.buses.push(BusRequest { params, src, dst });
    }

    /// Marks a region that power straps on `layer` must avoid.
    pub fn add_blockage(&mut self, layer: impl Into<Layer>, rect: memgeom::Rect) {
        self.blockages.push(Element::new(layer, rect));
    }

    #[inline]
    pub fn blockages(&self) -> &[Element] {
        &self.blockages
    }

    /// Routes produced so far, in request order.
    #[inline]
    pub fn routes(&self) -> &[BusRoute] {
        &self.routes
    }

    #[inline]
    pub fn grid(&self) -> Option<&PowerGrid> {
        self.grid.as_ref()
    }
}

/// A named step of a [`Pipeline`].
pub trait Stage: Send + Sync {
    fn name(&self) -> ArcStr;

    fn run(&self, cx: &mut StageCtx) -> Result<()>;
}

/// A [`Stage`] backed by a closure.
///
/// Closures may fail with any [`anyhow::Error`].
pub struct FnStage<F> {
    name: ArcStr,
    f: F,
}

impl<F> FnStage<F>
where
    F: Fn(&mut StageCtx) -> anyhow::Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<ArcStr>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Stage for FnStage<F>
where
    F: Fn(&mut StageCtx) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> ArcStr {
        self.name.clone()
    }

    fn run(&self, cx: &mut StageCtx) -> Result<()> {
        (self.f)(cx)?;
        Ok(())
    }
}

/// An ordered list of stages.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.stage_names()).finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn push(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    /// Inserts a stage before the first stage named `before`, or at the end.
    pub fn insert_before(&mut self, before: &str, stage: Box<dyn Stage>) {
        let idx = self
            .stages
            .iter()
            .position(|s| s.name() == before)
            .unwrap_or(self.stages.len());
        self.stages.insert(idx, stage);
    }

    pub fn stage_names(&self) -> Vec<ArcStr> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs every stage in order, stopping at the first failure.
    pub fn run(&self, cx: &mut StageCtx) -> Result<()> {
        for stage in self.stages.iter() {
            let name = stage.name();
            let module = cx.module().name().clone();
            debug!("starting stage `{}` of {}", name, module);
            with_err_context(stage.run(cx), || ErrorContext::Stage {
                module: module.clone(),
                stage: name.clone(),
            })?;
            info!("finished stage `{}` of {}", name, module);
        }
        Ok(())
    }
}
