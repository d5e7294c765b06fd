//! Built-in pipeline stages.

use std::str::FromStr;

use arcstr::ArcStr;
use memgeom::{div_ceil, snap_up_to_grid, Span};

use super::{Stage, StageCtx};
use crate::error::{ErrorSource, Result};
use crate::module::Element;
use crate::power::{GridLevel, PowerGridBuilder, SupplyNet, Target};
use crate::routing::{bend_via, route_bus};
use crate::rules::SpaceContext;
use crate::{debug, info, warn};

/// Routes every queued bus in request order.
///
/// Rails and bend-via pads of a routed bus become forbidden bands for later
/// buses on the same rail layer, padded by the layer's minimum space plus the
/// overhang of the later bus's own pads. Rails, pads and jogs are recorded as
/// blockages for the grid.
#[derive(Debug, Default, Clone, Copy)]
pub struct RouteBuses;

impl Stage for RouteBuses {
    fn name(&self) -> ArcStr {
        arcstr::literal!("route_buses")
    }

    fn run(&self, cx: &mut StageCtx) -> Result<()> {
        let requests = std::mem::take(&mut cx.buses);
        let sizer = cx.sizer().clone();
        let rules = sizer.rules().clone();
        let mut occupied: Vec<Element> = Vec::new();
        for mut req in requests {
            let h_layer = req.params.h_layer.clone();
            let via = bend_via(&sizer, &req.params)?;
            let overhang = via
                .footprint(&h_layer)
                .map(|pad| div_ceil(pad.height() - req.params.width, 2).max(0))
                .unwrap_or(0);
            for e in occupied.iter().filter(|e| e.layer == h_layer) {
                let ctx = SpaceContext::new(e.rect.height().max(req.params.width), e.rect.width());
                let space = rules.min_space(&h_layer, ctx)?;
                req.params
                    .forbidden
                    .push(e.rect.vspan().expand_all(space + overhang));
            }

            let route = route_bus(&mut cx.module, &sizer, &req.params, &req.src, &req.dst)?;
            debug!("routed {}-line bus on {}", route.rails.len(), h_layer);
            for rail in route.rails.iter() {
                occupied.push(Element::new(h_layer.clone(), *rail));
            }
            for placed in route.vias.iter() {
                if let Some(pad) = placed.footprint(&h_layer) {
                    occupied.push(Element::new(h_layer.clone(), pad));
                }
            }
            for jog in route.jogs.iter() {
                cx.blockages
                    .push(Element::new(req.params.v_layer.clone(), *jog));
            }
            cx.routes.push(route);
        }
        cx.blockages.extend(occupied);
        Ok(())
    }
}

/// Keeps grid straps clear of dedicated supply rails.
///
/// Every pin bound to one of the configured reserved nets, on the module
/// itself or on any child instance, becomes a blockage.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReserveSupplies;

impl Stage for ReserveSupplies {
    fn name(&self) -> ArcStr {
        arcstr::literal!("reserve_supplies")
    }

    fn run(&self, cx: &mut StageCtx) -> Result<()> {
        let nets = cx.config().reserved_nets();
        let mut reserved = Vec::new();
        for net in nets.iter() {
            if let Ok(shapes) = cx.module.get_pin(net) {
                reserved.extend(shapes.iter().cloned());
            }
        }
        for inst in cx.module.insts() {
            for (pin, net) in inst.bindings() {
                if nets.contains(net) {
                    reserved.extend(inst.pin(pin)?);
                }
            }
        }
        info!(
            "reserved {} supply shapes for nets {:?} in {}",
            reserved.len(),
            nets,
            cx.module.name()
        );
        cx.blockages.extend(reserved);
        Ok(())
    }
}

/// Builds the configured power grid over the module's bounding box.
///
/// Straps skip every blockage on their own layer, padded by the strap space.
/// Instance pins bound to `vdd` or `gnd` aliases on layers below the lowest
/// level become tap targets.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuildPowerGrid;

impl Stage for BuildPowerGrid {
    fn name(&self) -> ArcStr {
        arcstr::literal!("build_power_grid")
    }

    fn run(&self, cx: &mut StageCtx) -> Result<()> {
        let config = cx.config().clone();
        if config.power.levels.is_empty() {
            warn!("no power grid levels configured for {}", cx.module.name());
            return Ok(());
        }
        let Some(bbox) = cx.module.bbox().into_rect() else {
            warn!("skipping power grid of empty module {}", cx.module.name());
            return Ok(());
        };

        let rules = cx.rules().clone();
        let mut builder = PowerGridBuilder::new(config.metals.clone());
        let mut lowest = usize::MAX;
        for level in config.power.levels.iter() {
            let space = config.strap_space(level, rules.as_ref())?;
            let across = level.dir.other();
            let extent = bbox.span(across);
            let extent = Span::new(
                snap_up_to_grid(extent.start(), config.grid).min(extent.stop()),
                extent.stop(),
            );
            let forbidden = cx
                .blockages
                .iter()
                .filter(|e| e.layer == level.layer)
                .map(|e| e.rect.span(across).expand_all(space))
                .collect();
            builder.add_level(
                GridLevel::builder()
                    .layer(level.layer.clone())
                    .dir(level.dir)
                    .width(level.width)
                    .space(space)
                    .extent(extent)
                    .span(bbox.span(level.dir))
                    .forbidden(forbidden)
                    .build()
                    .map_err(|e| ErrorSource::Internal(e.to_string()))?,
            );
            if let Some(idx) = config.metals.index_of(&level.layer) {
                lowest = lowest.min(idx);
            }
        }

        let mut targets = Vec::new();
        for inst in cx.module.insts() {
            for (pin, net) in inst.bindings() {
                let Ok(net) = SupplyNet::from_str(net) else {
                    continue;
                };
                for elem in inst.pin(pin)? {
                    match config.metals.index_of(&elem.layer) {
                        Some(idx) if idx < lowest => {
                            targets.push(Target::new(elem.layer, net, elem.rect));
                        }
                        _ => {}
                    }
                }
            }
        }
        builder.add_targets(targets);

        let sizer = cx.sizer().clone();
        let grid = builder.build(&mut cx.module, &sizer)?;
        info!(
            "power grid of {}: {} crossings, {} taps, {} unconnected targets",
            cx.module.name(),
            grid.crossings.len(),
            grid.taps.len(),
            grid.unconnected.len()
        );
        cx.grid = Some(grid);
        Ok(())
    }
}

/// Moves the module's lower-left corner to the origin.
#[derive(Debug, Default, Clone, Copy)]
pub struct NormalizeOrigin;

impl Stage for NormalizeOrigin {
    fn name(&self) -> ArcStr {
        arcstr::literal!("normalize_origin")
    }

    fn run(&self, cx: &mut StageCtx) -> Result<()> {
        cx.module.normalize_origin()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use memgeom::{Dir, Point, Rect};

    use super::*;
    use crate::config::{GeneratorConfig, PowerLevelConfig};
    use crate::data::MemgenCtx;
    use crate::layers::LayerStack;
    use crate::module::{Instance, Module};
    use crate::routing::{BendOrder, PinRef};
    use crate::tests::{test_config, test_ctx, test_deck};

    fn tile() -> Arc<Module> {
        let mut m = Module::new("tile", ["d", "vdd", "vwr"]).unwrap();
        m.add_pin_shape("d", "m2", Rect::from_spans(Span::new(0, 140), Span::new(0, 400)))
            .unwrap();
        m.add_pin_shape("vdd", "m1", Rect::from_spans(Span::new(-500, 1500), Span::new(900, 1100)))
            .unwrap();
        m.add_pin_shape("vwr", "m3", Rect::from_spans(Span::new(-500, 1500), Span::new(3000, 3300)))
            .unwrap();
        m.into_frozen().unwrap()
    }

    fn top() -> Module {
        let mut top = Module::new("top", Vec::<&str>::new()).unwrap();
        let mut a = Instance::new("a", tile(), ["x", "vdd", "vdd_write"]).unwrap();
        a.set_loc(Point::new(0, 0));
        let mut b = Instance::new("b", tile(), ["x", "vdd", "vdd_write"]).unwrap();
        b.set_loc(Point::new(1000, 8000));
        top.add_instance(a).unwrap();
        top.add_instance(b).unwrap();
        top
    }

    fn grid_ctx() -> MemgenCtx {
        let mut config: GeneratorConfig = test_config();
        config.power.levels = vec![PowerLevelConfig::builder()
            .layer("m3")
            .dir(Dir::Horiz)
            .width(300)
            .space(300)
            .build()
            .unwrap()];
        MemgenCtx::new(config, test_deck()).unwrap()
    }

    #[test]
    fn reserved_supplies_become_blockages() {
        let mut config = test_config();
        config.power.reserved_nets = Some(vec![arcstr::literal!("vdd_write")]);
        let ctx = MemgenCtx::new(config, test_deck()).unwrap();
        let mut cx = StageCtx::new(&ctx, top());
        ReserveSupplies.run(&mut cx).unwrap();
        let spans: Vec<_> = cx.blockages().iter().map(|e| e.rect.vspan()).collect();
        assert_eq!(spans, vec![Span::new(3000, 3300), Span::new(11_000, 11_300)]);
    }

    #[test]
    fn grid_avoids_blockages() {
        let ctx = grid_ctx();
        let mut cx = StageCtx::new(&ctx, top());
        cx.add_blockage("m3", Rect::from_spans(Span::new(0, 100), Span::new(3000, 3300)));
        BuildPowerGrid.run(&mut cx).unwrap();
        let grid = cx.grid().unwrap();
        for strap in grid.levels[0].iter() {
            assert!(!strap.rect.vspan().overlaps(&Span::new(2700, 3600)));
        }
        // The tiles' m1 vdd pins are below the grid and are tapped or reported.
        assert_eq!(grid.taps.len() + grid.unconnected.len(), 2);
    }

    #[test]
    fn buses_block_later_buses_and_grid() {
        let ctx = test_ctx();
        let mut cx = StageCtx::new(&ctx, top());
        let params = cx
            .bus_params()
            .h_layer("m3")
            .v_layer("m2")
            .stack(LayerStack::new("m2", "via2", "m3"))
            .width(300)
            .pitch(700)
            .start(5000)
            .legal(Span::new(0, 8000))
            .order(BendOrder::Ascending)
            .build()
            .unwrap();
        let line = |inst: &str| vec![PinRef::new(inst, "d")];
        cx.add_bus(params.clone(), line("a"), line("b"));
        cx.add_bus(params, line("a"), line("b"));
        RouteBuses.run(&mut cx).unwrap();
        let routes = cx.routes();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].bends, vec![5000]);
        // The first rail sits at [5000, 5300] under pads of [4985, 5315]. The
        // second bus keeps 300 of m3 space from those pads with its own pads.
        assert_eq!(routes[1].bends, vec![5630]);

        let pads = |i: usize| -> Vec<Rect> {
            routes[i]
                .vias
                .iter()
                .filter_map(|v| v.footprint(&"m3".into()))
                .collect()
        };
        let lower = routes[0].rails.iter().copied().chain(pads(0)).collect::<Vec<_>>();
        let upper = routes[1].rails.iter().copied().chain(pads(1)).collect::<Vec<_>>();
        for a in lower.iter() {
            for b in upper.iter() {
                assert!(b.bottom() - a.top() >= 300, "{a:?} and {b:?} are too close");
            }
        }
        assert!(cx
            .blockages()
            .iter()
            .any(|e| e.layer == "m3".into() && e.rect.vspan() == Span::new(5000, 5300)));
    }

    #[test]
    fn buses_on_other_layers_do_not_interact() {
        let ctx = test_ctx();
        let mut cx = StageCtx::new(&ctx, top());
        let params = cx
            .bus_params()
            .h_layer("m3")
            .v_layer("m2")
            .stack(LayerStack::new("m2", "via2", "m3"))
            .width(300)
            .pitch(700)
            .start(5000)
            .legal(Span::new(0, 8000))
            .order(BendOrder::Ascending)
            .build()
            .unwrap();
        let line = |inst: &str| vec![PinRef::new(inst, "d")];
        cx.add_bus(params.clone(), line("a"), line("b"));
        let mut other = params;
        other.h_layer = "m1".into();
        other.stack = LayerStack::new("m1", "via1", "m2");
        other.width = 200;
        cx.add_bus(other, line("a"), line("b"));
        RouteBuses.run(&mut cx).unwrap();
        assert_eq!(cx.routes()[1].bends, vec![5000]);
    }
}
