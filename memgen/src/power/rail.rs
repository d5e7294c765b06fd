//! Via drops from power rails to the shapes beneath them.

use arcstr::ArcStr;
use derive_builder::Builder;
use memgeom::{Dir, Point, Rect, Span};

use super::{PowerGridError, ViaStack};
use crate::clearance::{find_clearances, ClearanceQuery};
use crate::contact::{ContactSearch, ContactSizer, PlacedContact};
use crate::error::Result;
use crate::layers::{Layer, MetalStack};
use crate::module::Module;
use crate::routing::ForbiddenRanges;
use crate::rules::SpaceContext;
use crate::{debug, trace};

/// Via start positions along a rail.
///
/// Walks `rail` from its start at a fixed `pitch`. Whenever the next blockage
/// begins within one pitch of the current position, the walk jumps to the end
/// of that blockage plus `space` and the blockage is dropped. Every returned
/// position leaves room for a via of length `via_length` before the end of the rail.
pub fn rail_via_positions(
    rail: Span,
    via_length: i64,
    pitch: i64,
    blockages: &[Span],
    space: i64,
) -> Result<Vec<i64>> {
    if pitch <= 0 {
        return Err(PowerGridError::InvalidPitch(pitch).into());
    }
    let blockages = ForbiddenRanges::new(blockages.iter().copied());
    let mut blockages = blockages.spans().iter().copied().peekable();
    let mut positions = Vec::new();
    let mut pos = rail.start();
    while pos + via_length <= rail.stop() {
        while blockages.next_if(|b| b.stop() <= pos).is_some() {}
        if let Some(b) = blockages.next_if(|b| b.start() < pos + pitch) {
            pos = pos.max(b.stop() + space);
            continue;
        }
        positions.push(pos);
        pos += pitch;
    }
    Ok(positions)
}

/// Parameters for dropping vias from a rail through the gaps of an intermediate layer.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct RailViaParams {
    /// The rail to connect down from.
    pub rail: Rect,
    /// The direction in which the rail runs.
    pub dir: Dir,
    #[builder(setter(into))]
    pub rail_layer: Layer,
    /// The layer whose existing shapes the vias must avoid.
    #[builder(setter(into))]
    pub via_layer: Layer,
    /// The lowest layer of the drop.
    #[builder(setter(into))]
    pub bottom_layer: Layer,
    #[builder(setter(into))]
    pub net: ArcStr,
}

impl RailViaParams {
    #[inline]
    pub fn builder() -> RailViaParamsBuilder {
        RailViaParamsBuilder::default()
    }
}

/// Drops via stacks from a rail into every usable gap on the intermediate layer.
///
/// A gap is usable if it is longer than twice the minimum space of the
/// intermediate layer. Each stack is centered in its gap, and a tier of the
/// stack is drawn only if its sampled contact fits in the usable length.
pub fn drop_rail_vias(
    module: &mut Module,
    sizer: &ContactSizer,
    metals: &MetalStack,
    params: &RailViaParams,
) -> Result<Vec<ViaStack>> {
    let chain = metals
        .stacks_between(&params.bottom_layer, &params.rail_layer)
        .ok_or_else(|| PowerGridError::NoViaPath {
            from: params.bottom_layer.clone(),
            to: params.rail_layer.clone(),
        })?;
    let space = sizer
        .rules()
        .min_space(&params.via_layer, SpaceContext::min())?;
    let across = params.dir.other();
    let query = ClearanceQuery {
        layer: params.via_layer.clone(),
        dir: params.dir,
        band: params.rail.span(across),
        exclusions: Vec::new(),
        domain: Some(params.rail.span(params.dir)),
    };
    let gaps = find_clearances(module, &query);

    let mut stacks = Vec::new();
    for gap in gaps {
        let usable = gap.length() - 2 * space;
        if usable <= 0 {
            trace!("gap {} on {} is too short for a via", gap, params.via_layer);
            continue;
        }
        let center = Point::from_dir_coords(params.dir, gap.center(), params.rail.center().coord(across));
        let mut tiers = Vec::with_capacity(chain.len());
        for stack in chain.iter() {
            let contact = sizer.sample_contact(usable, &ContactSearch::new(stack.clone()))?;
            if contact.height() >= usable {
                debug!(
                    "skipping {} tier in gap {}: footprint {} exceeds usable length {}",
                    stack,
                    gap,
                    contact.height(),
                    usable
                );
                continue;
            }
            let placed = PlacedContact::new(contact, center);
            tiers.push(match params.dir {
                Dir::Vert => placed,
                Dir::Horiz => placed.rotated(),
            });
        }
        if tiers.is_empty() {
            continue;
        }
        let stack = ViaStack::from_contacts(tiers);
        stack.draw(module, &params.net);
        stacks.push(stack);
    }
    Ok(stacks)
}
