//! Parallel bus routing between two sets of instance pins.
//!
//! Each bus line leaves its source pin on the vertical layer, bends onto a
//! horizontal rail on the horizontal layer, and bends back onto the vertical
//! layer to reach its destination pin. Bend coordinates of successive lines are
//! strictly monotonic and skip the caller's forbidden bands.

use std::sync::Arc;

use arcstr::ArcStr;
use derive_builder::Builder;
use itertools::Itertools;
use memgeom::{Dir, Point, Rect, Sign, Span};
use thiserror::Error;

use super::{BendOrder, ForbiddenRanges};
use crate::contact::{Contact, ContactSearch, ContactSizer, PlacedContact};
use crate::error::{ErrorSource, Result};
use crate::layers::{Layer, LayerStack};
use crate::module::{Element, Module};
use crate::rules::SpaceContext;
use crate::{debug, trace};

/// A pin of a named child instance.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct PinRef {
    pub instance: ArcStr,
    pub pin: ArcStr,
}

impl PinRef {
    pub fn new(instance: impl Into<ArcStr>, pin: impl Into<ArcStr>) -> Self {
        Self {
            instance: instance.into(),
            pin: pin.into(),
        }
    }
}

impl std::fmt::Display for PinRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.instance, self.pin)
    }
}

/// An enumeration of bus routing errors.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum BusError {
    #[error("bus has {src} source pins but {dst} destination pins")]
    PinCountMismatch { src: usize, dst: usize },

    #[error("pin {pin} has no shape on layer {layer}")]
    MissingPinShape { pin: PinRef, layer: Layer },

    #[error("bus line {line} joins net {src} to net {dst}")]
    NetMismatch { line: usize, src: ArcStr, dst: ArcStr },

    #[error("bus pitch {pitch} is less than width plus spacing ({required})")]
    PitchTooSmall { pitch: i64, required: i64 },

    #[error("bus width {0} is not positive")]
    InvalidWidth(i64),

    #[error("bus margin {0} is negative")]
    NegativeMargin(i64),

    #[error("bus stack {stack} does not connect layers {h_layer} and {v_layer}")]
    StackMismatch {
        stack: LayerStack,
        h_layer: Layer,
        v_layer: Layer,
    },
}

/// Parameters of a bus route.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct BusParams {
    /// The layer carrying horizontal rails.
    #[builder(setter(into))]
    pub h_layer: Layer,
    /// The layer carrying vertical jogs to and from the pins.
    #[builder(setter(into))]
    pub v_layer: Layer,
    /// The via stack joining the two layers.
    pub stack: LayerStack,
    /// Width of every rail and jog.
    pub width: i64,
    /// Center-to-center distance of adjacent rails.
    pub pitch: i64,
    /// Bottom edge of the rail of line 0, before forbidden-band avoidance.
    pub start: i64,
    /// Legal range of rail positions. Every rail must lie within it.
    pub legal: Span,
    /// Direction in which successive rails are placed.
    ///
    /// If unset, rails grow toward whichever side of `start` has more room in `legal`.
    #[builder(default, setter(strip_option))]
    pub order: Option<BendOrder>,
    /// Bands along the vertical axis that rails may not overlap.
    #[builder(default)]
    pub forbidden: Vec<Span>,
    /// Distance kept between a rail and a forbidden band it was moved past.
    #[builder(default)]
    pub margin: i64,
    /// Extends jogs that are too short to meet the minimum-area rule.
    #[builder(default = "true")]
    pub fill: bool,
    /// Overrides the cut spacing of the bend vias.
    #[builder(default, setter(strip_option))]
    pub via_spacing: Option<i64>,
}

impl BusParams {
    #[inline]
    pub fn builder() -> BusParamsBuilder {
        BusParamsBuilder::default()
    }

    /// Checks the values that every allocation relies on.
    pub fn check(&self) -> std::result::Result<(), BusError> {
        if self.width <= 0 {
            return Err(BusError::InvalidWidth(self.width));
        }
        if self.margin < 0 {
            return Err(BusError::NegativeMargin(self.margin));
        }
        if self.pitch < self.width {
            return Err(BusError::PitchTooSmall {
                pitch: self.pitch,
                required: self.width,
            });
        }
        Ok(())
    }

    fn order(&self) -> BendOrder {
        self.order.unwrap_or_else(|| {
            BendOrder::from_clearance(self.start - self.legal.start(), self.legal.stop() - self.start)
        })
    }
}

/// The geometry emitted for a bus.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BusRoute {
    /// One horizontal rail per line, in line order.
    pub rails: Vec<Rect>,
    /// Two vertical jogs per line, source side first.
    pub jogs: Vec<Rect>,
    /// Two bend vias per line, source side first.
    pub vias: Vec<PlacedContact>,
    /// The bottom edge of each rail, in line order.
    pub bends: Vec<i64>,
}

struct Endpoint {
    rect: Rect,
    net: ArcStr,
}

fn resolve(module: &Module, pin: &PinRef, layer: &Layer) -> Result<Endpoint> {
    let inst = module.instance(&pin.instance)?;
    let rect = inst
        .pin_on(&pin.pin, layer)?
        .into_iter()
        .next()
        .ok_or_else(|| BusError::MissingPinShape {
            pin: pin.clone(),
            layer: layer.clone(),
        })?;
    Ok(Endpoint {
        rect,
        net: inst.net(&pin.pin)?.clone(),
    })
}

/// Allocates the rail positions of `lines` bus lines.
///
/// Rails are placed `pitch` apart in the direction of `order`. A rail that would
/// overlap a forbidden band is moved `margin` past it, and later rails continue
/// from the moved position.
pub fn allocate_bends(params: &BusParams, lines: usize) -> Result<Vec<i64>> {
    params.check()?;
    let order = params.order();
    let sign = order.sign();
    let forbidden = ForbiddenRanges::new(params.forbidden.iter().copied());
    let mut bends = Vec::with_capacity(lines);
    let mut next = params.start;
    for i in 0..lines {
        let pos = forbidden.next_admissible(next, params.width, params.margin, sign)?;
        if pos != next {
            debug!("bus line {} moved from {} to {} to avoid forbidden band", i, next, pos);
        }
        let rail = Span::with_start_and_length(pos, params.width);
        if !params.legal.contains(rail) {
            return Err(ErrorSource::Infeasible {
                constraint: arcstr::format!("bus line {i} rail within legal range {}", params.legal),
                measured: pos,
                required: match sign {
                    Sign::Pos => params.legal.stop() - params.width,
                    Sign::Neg => params.legal.start(),
                },
            }
            .into());
        }
        bends.push(pos);
        next = pos + sign.as_int() * params.pitch;
    }
    Ok(bends)
}

/// The contact drawn at every bend of a bus with the given params.
///
/// Its cut count is sized to the rail width.
pub fn bend_via(sizer: &ContactSizer, params: &BusParams) -> Result<Arc<Contact>> {
    let mut search = ContactSearch::builder();
    search.stack(params.stack.clone()).dir(Dir::Horiz);
    if let Some(spacing) = params.via_spacing {
        search.spacing(spacing);
    }
    let search = search
        .build()
        .map_err(|e| ErrorSource::Internal(e.to_string()))?;
    Ok(sizer.sample_contact(params.width, &search)?)
}

/// Routes a bus from `src[i]` to `dst[i]` for every line `i`, drawing the
/// result into `module`.
///
/// Pins are looked up on the vertical layer through the transforms of their
/// instances, so mirrored instances resolve to their physical positions.
pub fn route_bus(
    module: &mut Module,
    sizer: &ContactSizer,
    params: &BusParams,
    src: &[PinRef],
    dst: &[PinRef],
) -> Result<BusRoute> {
    if src.len() != dst.len() {
        return Err(BusError::PinCountMismatch {
            src: src.len(),
            dst: dst.len(),
        }
        .into());
    }
    if !(params.stack.connects(&params.h_layer) && params.stack.connects(&params.v_layer)) {
        return Err(BusError::StackMismatch {
            stack: params.stack.clone(),
            h_layer: params.h_layer.clone(),
            v_layer: params.v_layer.clone(),
        }
        .into());
    }

    let rules = sizer.rules();
    let space = rules.min_space(&params.h_layer, SpaceContext::min())?;
    let required = params.width + space;
    if params.pitch < required {
        return Err(BusError::PitchTooSmall {
            pitch: params.pitch,
            required,
        }
        .into());
    }

    let mut endpoints = Vec::with_capacity(src.len());
    for (line, (s, d)) in src.iter().zip_eq(dst.iter()).enumerate() {
        let s = resolve(module, s, &params.v_layer)?;
        let d = resolve(module, d, &params.v_layer)?;
        if s.net != d.net {
            return Err(BusError::NetMismatch {
                line,
                src: s.net,
                dst: d.net,
            }
            .into());
        }
        endpoints.push((s, d));
    }

    let bends = allocate_bends(params, endpoints.len())?;
    let via = bend_via(sizer, params)?;
    let fill = if params.fill {
        Some(rules.min_area_fill(&params.v_layer, params.width, Dir::Vert)?)
    } else {
        None
    };

    let mut route = BusRoute {
        bends: bends.clone(),
        ..Default::default()
    };
    for ((s, d), y) in endpoints.into_iter().zip_eq(bends) {
        let rail_span = Span::with_start_and_length(y, params.width);
        let xs = s.rect.center().x;
        let xd = d.rect.center().x;
        let rail = Rect::from_spans(
            Span::new(xs.min(xd), xs.max(xd)).expand_all(params.width / 2),
            rail_span,
        );
        trace!("bus net {} rail at {}", s.net, rail_span);

        for (x, pin) in [(xs, s.rect), (xd, d.rect)] {
            let mut j = Rect::from_spans(
                Span::from_center_span(x, params.width),
                Span::new(pin.center().y, rail_span.center()).union(rail_span),
            );
            if let Some(fill) = fill {
                if j.height() < fill.h() {
                    j = j.with_span(Span::from_center_span(j.center().y, fill.h()), Dir::Vert);
                }
            }
            let placed = PlacedContact::new(via.clone(), Point::new(x, rail_span.center()));
            module.add(Element::with_net_name(s.net.clone(), params.v_layer.clone(), j));
            module.add_contact(&placed, Some(&s.net));
            route.jogs.push(j);
            route.vias.push(placed);
        }
        module.add(Element::with_net_name(s.net.clone(), params.h_layer.clone(), rail));
        route.rails.push(rail);
    }
    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(start: i64, order: BendOrder, forbidden: Vec<Span>) -> BusParams {
        BusParams::builder()
            .h_layer("m3")
            .v_layer("m2")
            .stack(LayerStack::new("m2", "via2", "m3"))
            .width(300)
            .pitch(700)
            .start(start)
            .legal(Span::new(0, 10_000))
            .order(order)
            .forbidden(forbidden)
            .margin(300)
            .build()
            .unwrap()
    }

    #[test]
    fn bends_are_monotonic() {
        let p = params(1000, BendOrder::Ascending, vec![]);
        assert_eq!(allocate_bends(&p, 3).unwrap(), vec![1000, 1700, 2400]);
        let p = params(5000, BendOrder::Descending, vec![]);
        assert_eq!(allocate_bends(&p, 3).unwrap(), vec![5000, 4300, 3600]);
    }

    #[test]
    fn bends_skip_forbidden_bands() {
        let p = params(1000, BendOrder::Ascending, vec![Span::new(1600, 2000)]);
        // Line 1 would sit at [1700, 2000); it moves to 2000 + 300.
        assert_eq!(allocate_bends(&p, 3).unwrap(), vec![1000, 2300, 3000]);
    }

    #[test]
    fn covered_range_is_infeasible() {
        let p = params(1000, BendOrder::Ascending, vec![Span::new(0, 10_000)]);
        let err = allocate_bends(&p, 1).unwrap_err();
        assert!(matches!(err.source(), ErrorSource::Infeasible { .. }));
    }

    #[test]
    fn negative_margin_is_rejected() {
        let mut p = params(1000, BendOrder::Ascending, vec![Span::new(900, 1500)]);
        p.margin = -1;
        let err = allocate_bends(&p, 2).unwrap_err();
        assert!(matches!(
            err.source(),
            ErrorSource::Bus(BusError::NegativeMargin(-1))
        ));
    }

    #[test]
    fn non_positive_width_is_rejected() {
        let mut p = params(1000, BendOrder::Ascending, vec![]);
        p.width = 0;
        let err = allocate_bends(&p, 1).unwrap_err();
        assert!(matches!(
            err.source(),
            ErrorSource::Bus(BusError::InvalidWidth(0))
        ));
    }

    #[test]
    fn order_defaults_to_roomier_side() {
        let mut p = params(8000, BendOrder::Ascending, vec![]);
        p.order = None;
        assert_eq!(allocate_bends(&p, 2).unwrap(), vec![8000, 7300]);
    }
}
