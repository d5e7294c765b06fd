//! Power grids.
//!
//! # Structure
//!
//! A power grid is a list of [`GridLevel`]s, each a set of parallel straps on
//! one metal layer. Adjacent levels usually run in alternating directions.
//!
//! Straps of a level are placed by sweeping across the level's extent. The
//! `i`-th strap placed belongs to [`SupplyNet::Gnd`] if `i` is even and to
//! [`SupplyNet::Vdd`] otherwise, so the two roles always alternate. A strap
//! that would overlap a forbidden range is skipped and the sweep resumes one
//! strap space past the end of the range; the skipped slot consumes no index.
//!
//! # Connections
//!
//! Same-role straps of adjacent levels are joined by a via stack wherever they
//! cross. Lower-level power shapes registered as [`Target`]s are joined to the
//! lowest level above them; nearby targets share a single via stack.

use std::fmt::Display;
use std::str::FromStr;

use arcstr::ArcStr;
use derive_builder::Builder;
use itertools::Itertools;
use memgeom::{Dir, Point, Rect, Span};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contact::ContactSizer;
use crate::error::{ErrorSource, Result};
use crate::layers::{Layer, MetalStack};
use crate::module::{Element, Module};
use crate::routing::ForbiddenRanges;
use crate::rules::SpaceContext;
use crate::{debug, info, trace};

pub mod rail;
pub mod stack;

pub use rail::{drop_rail_vias, rail_via_positions, RailViaParams, RailViaParamsBuilder};
pub use stack::ViaStack;

/// A supply net.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub enum SupplyNet {
    Vdd,
    Gnd,
}

/// Error from parsing a supply net from a string.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("error parsing net name `{0}`; expected VDD or GND")]
pub struct SupplyNetParseError(String);

impl FromStr for SupplyNet {
    type Err = SupplyNetParseError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lowercase = s.to_lowercase();
        match lowercase.trim() {
            "vdd" | "vpwr" | "pwr" | "vcc" => Ok(Self::Vdd),
            "gnd" | "vss" | "vgnd" => Ok(Self::Gnd),
            _ => Err(SupplyNetParseError(s.to_string())),
        }
    }
}

impl SupplyNet {
    /// The role of the `idx`-th strap of a sweep.
    #[inline]
    pub fn from_index(idx: usize) -> Self {
        if idx % 2 == 0 {
            Self::Gnd
        } else {
            Self::Vdd
        }
    }

    /// The net name drawn on straps of this role.
    pub fn name(&self) -> ArcStr {
        match self {
            Self::Vdd => arcstr::literal!("vdd"),
            Self::Gnd => arcstr::literal!("vss"),
        }
    }
}

impl Display for SupplyNet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum PowerGridError {
    #[error("no via path from {from} to {to} in the metal stack")]
    NoViaPath { from: Layer, to: Layer },

    #[error("layer {0} is not in the metal stack")]
    NotMetalLayer(Layer),

    #[error("grid level on {layer} has non-positive strap width {width}")]
    InvalidWidth { layer: Layer, width: i64 },

    #[error("rail via pitch {0} is not positive")]
    InvalidPitch(i64),

    #[error("grid level on {layer} has negative strap space {space}")]
    NegativeSpace { layer: Layer, space: i64 },

    #[error("strap space {space} on {layer} is below the minimum of {required}")]
    SpaceTooSmall {
        layer: Layer,
        space: i64,
        required: i64,
    },

    #[error("power grid needs at least one level")]
    NoLevels,
}

/// A single power strap.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Strap {
    pub layer: Layer,
    pub rect: Rect,
    pub net: SupplyNet,
    /// The placement index of the strap within its sweep.
    pub index: usize,
}

/// Straps on one metal layer.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct GridLevel {
    #[builder(setter(into))]
    pub layer: Layer,
    /// The direction in which the straps run.
    pub dir: Dir,
    pub width: i64,
    /// Edge-to-edge space between adjacent straps.
    pub space: i64,
    /// The swept range, perpendicular to `dir`.
    pub extent: Span,
    /// The length of every strap, along `dir`.
    pub span: Span,
    /// Ranges across the sweep that straps may not overlap.
    #[builder(default)]
    pub forbidden: Vec<Span>,
}

impl GridLevel {
    #[inline]
    pub fn builder() -> GridLevelBuilder {
        GridLevelBuilder::default()
    }

    #[inline]
    pub fn pitch(&self) -> i64 {
        self.width + self.space
    }

    /// Sweeps the level's extent and returns its straps in placement order.
    pub fn straps(&self) -> Result<Vec<Strap>> {
        if self.width <= 0 {
            return Err(PowerGridError::InvalidWidth {
                layer: self.layer.clone(),
                width: self.width,
            }
            .into());
        }
        if self.space < 0 {
            return Err(PowerGridError::NegativeSpace {
                layer: self.layer.clone(),
                space: self.space,
            }
            .into());
        }
        let forbidden = ForbiddenRanges::new(self.forbidden.iter().copied());
        let mut straps = Vec::new();
        let mut offset = self.extent.start();
        while offset + self.width <= self.extent.stop() {
            let slot = Span::with_start_and_length(offset, self.width);
            if let Some(band) = forbidden.first_overlap(slot) {
                let next = band.stop() + self.space;
                debug!(
                    "skipping strap on {} at {}: forbidden range {}; resuming at {}",
                    self.layer, slot, band, next
                );
                offset = next;
                continue;
            }
            let index = straps.len();
            straps.push(Strap {
                layer: self.layer.clone(),
                rect: Rect::from_dir_spans(self.dir, self.span, slot),
                net: SupplyNet::from_index(index),
                index,
            });
            offset += self.pitch();
        }

        if straps.is_empty() && self.extent.length() >= self.width {
            return Err(ErrorSource::Infeasible {
                constraint: arcstr::format!(
                    "power straps on {} within extent {}",
                    self.layer,
                    self.extent
                ),
                measured: 0,
                required: 1,
            }
            .into());
        }
        Ok(straps)
    }
}

/// A lower-level power shape to connect to the grid.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Target {
    pub layer: Layer,
    pub rect: Rect,
    pub net: SupplyNet,
}

impl Target {
    pub fn new(layer: impl Into<Layer>, net: SupplyNet, rect: Rect) -> Self {
        Self {
            layer: layer.into(),
            rect,
            net,
        }
    }
}

/// The result of building a power grid.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PowerGrid {
    /// Straps of each level, in level order.
    pub levels: Vec<Vec<Strap>>,
    /// Via stacks joining crossing straps of adjacent levels.
    pub crossings: Vec<ViaStack>,
    /// Via stacks joining targets to the grid.
    pub taps: Vec<ViaStack>,
    /// Targets that no strap reached.
    pub unconnected: Vec<Target>,
}

/// Builds a multi-level power grid.
#[derive(Debug, Clone)]
pub struct PowerGridBuilder {
    metals: MetalStack,
    levels: Vec<GridLevel>,
    targets: Vec<Target>,
}

impl PowerGridBuilder {
    pub fn new(metals: MetalStack) -> Self {
        Self {
            metals,
            levels: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// Adds a level above all previously added levels.
    pub fn add_level(&mut self, level: GridLevel) -> &mut Self {
        self.levels.push(level);
        self
    }

    pub fn add_target(&mut self, target: Target) -> &mut Self {
        self.targets.push(target);
        self
    }

    pub fn add_targets(&mut self, targets: impl IntoIterator<Item = Target>) -> &mut Self {
        self.targets.extend(targets);
        self
    }

    /// Adds a forbidden range to every level running in `dir`.
    pub fn forbid(&mut self, dir: Dir, span: Span) -> &mut Self {
        for level in self.levels.iter_mut().filter(|l| l.dir == dir) {
            level.forbidden.push(span);
        }
        self
    }

    #[inline]
    pub fn levels(&self) -> &[GridLevel] {
        &self.levels
    }

    fn check(&self, sizer: &ContactSizer) -> Result<()> {
        if self.levels.is_empty() {
            return Err(PowerGridError::NoLevels.into());
        }
        for level in self.levels.iter() {
            if self.metals.index_of(&level.layer).is_none() {
                return Err(PowerGridError::NotMetalLayer(level.layer.clone()).into());
            }
            let required = sizer
                .rules()
                .min_space(&level.layer, SpaceContext::new(level.width, level.span.length()))?;
            if level.space < required {
                return Err(PowerGridError::SpaceTooSmall {
                    layer: level.layer.clone(),
                    space: level.space,
                    required,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Places every strap and via stack and draws them into `module`.
    pub fn build(&self, module: &mut Module, sizer: &ContactSizer) -> Result<PowerGrid> {
        self.check(sizer)?;
        let grid = sizer.rules().grid();
        let mut out = PowerGrid::default();

        for level in self.levels.iter() {
            let straps = level.straps()?;
            info!("placed {} straps on {}", straps.len(), level.layer);
            for strap in straps.iter() {
                module.add(Element::with_net_name(
                    strap.net.name(),
                    strap.layer.clone(),
                    strap.rect,
                ));
            }
            out.levels.push(straps);
        }

        for (i, pair) in self.levels.windows(2).enumerate() {
            let (bot, top) = (&pair[0], &pair[1]);
            for t in out.levels[i + 1].iter() {
                for b in out.levels[i].iter() {
                    if t.net != b.net {
                        continue;
                    }
                    let Some(overlap) = intersection(&t.rect, &b.rect) else {
                        continue;
                    };
                    let center = overlap.center().snap_to_grid(grid);
                    let stack = ViaStack::new(
                        sizer,
                        &self.metals,
                        &bot.layer,
                        &top.layer,
                        center,
                        overlap.length(Dir::Vert),
                        Dir::Vert,
                    )?;
                    stack.draw(module, &t.net.name());
                    out.crossings.push(stack);
                }
            }
        }

        for target in self.targets.iter() {
            if !self.connects_target(target) {
                trace!("no grid level above target on {}", target.layer);
                out.unconnected.push(target.clone());
            }
        }
        for (idx, level) in self.levels.iter().enumerate() {
            let targets: Vec<&Target> = self
                .targets
                .iter()
                .filter(|t| self.lowest_level_above(t) == Some(idx))
                .collect();
            if targets.is_empty() {
                continue;
            }
            let mut hit = vec![false; targets.len()];
            for strap in out.levels[idx].iter() {
                let taps = self.tap_strap(sizer, strap, level, &targets, &mut hit)?;
                for stack in taps {
                    stack.draw(module, &strap.net.name());
                    out.taps.push(stack);
                }
            }
            for (target, hit) in targets.into_iter().zip(hit) {
                if !hit {
                    trace!(
                        "no {} strap on {} reaches target {:?} on {}",
                        target.net,
                        level.layer,
                        target.rect,
                        target.layer
                    );
                    out.unconnected.push(target.clone());
                }
            }
        }
        Ok(out)
    }

    /// The lowest grid level whose layer lies above the target's layer.
    fn lowest_level_above(&self, target: &Target) -> Option<usize> {
        let t = self.metals.index_of(&target.layer)?;
        self.levels
            .iter()
            .enumerate()
            .filter_map(|(i, l)| Some((i, self.metals.index_of(&l.layer)?)))
            .filter(|&(_, m)| m > t)
            .min_by_key(|&(_, m)| m)
            .map(|(i, _)| i)
    }

    fn connects_target(&self, target: &Target) -> bool {
        self.lowest_level_above(target).is_some()
    }

    /// Drops via stacks from `strap` to every same-role target it overlaps.
    ///
    /// Targets are visited along the strap. A stack is skipped if its center is
    /// closer to the previous stack than their half footprints plus the minimum
    /// space of the target layer; the earlier stack serves both targets.
    fn tap_strap(
        &self,
        sizer: &ContactSizer,
        strap: &Strap,
        level: &GridLevel,
        targets: &[&Target],
        hit: &mut [bool],
    ) -> Result<Vec<ViaStack>> {
        let grid = sizer.rules().grid();
        let candidates = targets
            .iter()
            .enumerate()
            .filter(|(_, t)| t.net == strap.net)
            .filter_map(|(i, t)| intersection(&t.rect, &strap.rect).map(|r| (i, r)))
            .sorted_by_key(|(_, r)| (r.center().coord(level.dir), r.center().coord(!level.dir)));

        let mut stacks: Vec<ViaStack> = Vec::new();
        let mut prev: Option<(Point, i64, i64)> = None;
        for (i, overlap) in candidates {
            let target = targets[i];
            let center = overlap.center().snap_to_grid(grid);
            let stack = ViaStack::new(
                sizer,
                &self.metals,
                &target.layer,
                &level.layer,
                center,
                overlap.length(!level.dir),
                !level.dir,
            )?;
            let half = stack.footprint_length(level.dir) / 2;
            let space = sizer
                .rules()
                .min_space(&target.layer, SpaceContext::min())?;
            if let Some((p, prev_half, prev_space)) = prev {
                let dist = (center.coord(level.dir) - p.coord(level.dir)).abs();
                if dist < prev_half + half + space.max(prev_space) {
                    trace!(
                        "target at {:?} on {} shares the via stack at {:?}",
                        center,
                        target.layer,
                        p
                    );
                    hit[i] = true;
                    continue;
                }
            }
            hit[i] = true;
            prev = Some((center, half, space));
            stacks.push(stack);
        }
        Ok(stacks)
    }
}

/// The overlap of two rectangles, if it has positive area.
fn intersection(a: &Rect, b: &Rect) -> Option<Rect> {
    let h = a.hspan().intersection(&b.hspan())?;
    let v = a.vspan().intersection(&b.vspan())?;
    (h.length() > 0 && v.length() > 0).then(|| Rect::from_spans(h, v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{test_deck, test_metals};

    fn level(forbidden: Vec<Span>) -> GridLevel {
        GridLevel::builder()
            .layer("m3")
            .dir(Dir::Horiz)
            .width(500)
            .space(500)
            .extent(Span::new(0, 10_000))
            .span(Span::new(0, 5_000))
            .forbidden(forbidden)
            .build()
            .unwrap()
    }

    #[test]
    fn supply_net_parses_aliases() {
        assert_eq!("VPWR".parse::<SupplyNet>().unwrap(), SupplyNet::Vdd);
        assert_eq!(" vgnd ".parse::<SupplyNet>().unwrap(), SupplyNet::Gnd);
        assert_eq!("vss".parse::<SupplyNet>().unwrap(), SupplyNet::Gnd);
        assert!("vbias".parse::<SupplyNet>().is_err());
    }

    #[test]
    fn straps_alternate_roles() {
        let straps = level(vec![]).straps().unwrap();
        assert_eq!(straps.len(), 10);
        for (i, s) in straps.iter().enumerate() {
            assert_eq!(s.net, SupplyNet::from_index(i));
            assert_eq!(s.rect.bottom(), i as i64 * 1000);
        }
        assert_eq!(straps[0].net, SupplyNet::Gnd);
    }

    #[test]
    fn negative_strap_space_is_rejected() {
        let mut l = level(vec![Span::new(2100, 2600)]);
        l.space = -100;
        let err = l.straps().unwrap_err();
        assert!(matches!(
            err.source(),
            ErrorSource::PowerGrid(PowerGridError::NegativeSpace { space: -100, .. })
        ));

        l.space = -500;
        assert!(l.straps().is_err());
    }

    #[test]
    fn straps_skip_forbidden_ranges() {
        let straps = level(vec![Span::new(2100, 2600), Span::new(6000, 6200)])
            .straps()
            .unwrap();
        let bottoms: Vec<i64> = straps.iter().map(|s| s.rect.bottom()).collect();
        assert_eq!(bottoms, vec![0, 1000, 3100, 4100, 5100, 6700, 7700, 8700]);
    }

    #[test]
    fn fully_forbidden_extent_is_infeasible() {
        let err = level(vec![Span::new(-10, 10_010)]).straps().unwrap_err();
        assert!(matches!(err.source(), ErrorSource::Infeasible { .. }));
    }

    #[test]
    fn crossing_straps_get_via_stacks() {
        let sizer = ContactSizer::new(test_deck());
        let mut builder = PowerGridBuilder::new(test_metals());
        builder
            .add_level(
                GridLevel::builder()
                    .layer("m3")
                    .dir(Dir::Horiz)
                    .width(500)
                    .space(500)
                    .extent(Span::new(0, 2000))
                    .span(Span::new(0, 2000))
                    .build()
                    .unwrap(),
            )
            .add_level(
                GridLevel::builder()
                    .layer("m4")
                    .dir(Dir::Vert)
                    .width(500)
                    .space(500)
                    .extent(Span::new(0, 2000))
                    .span(Span::new(0, 2000))
                    .build()
                    .unwrap(),
            );
        let mut module = Module::new("grid", Vec::<&str>::new()).unwrap();
        let grid = builder.build(&mut module, &sizer).unwrap();
        assert_eq!(grid.levels.len(), 2);
        assert_eq!(grid.levels[0].len(), 2);
        // gnd/gnd at (250, 250) and vdd/vdd at (1250, 1250).
        assert_eq!(grid.crossings.len(), 2);
        let centers: Vec<Point> = grid
            .crossings
            .iter()
            .filter_map(|s| s.center())
            .collect();
        assert_eq!(centers, vec![Point::new(250, 250), Point::new(1250, 1250)]);
    }

    #[test]
    fn nearby_targets_share_a_via_stack() {
        let sizer = ContactSizer::new(test_deck());
        let mut builder = PowerGridBuilder::new(test_metals());
        builder
            .add_level(
                GridLevel::builder()
                    .layer("m3")
                    .dir(Dir::Horiz)
                    .width(500)
                    .space(500)
                    .extent(Span::new(0, 1000))
                    .span(Span::new(0, 10_000))
                    .build()
                    .unwrap(),
            )
            .add_targets([
                Target::new("m1", SupplyNet::Gnd, Rect::from_spans((1000, 1200).into(), (0, 500).into())),
                Target::new("m1", SupplyNet::Gnd, Rect::from_spans((1300, 1500).into(), (0, 500).into())),
                Target::new("m1", SupplyNet::Gnd, Rect::from_spans((5000, 5200).into(), (0, 500).into())),
                Target::new("m1", SupplyNet::Vdd, Rect::from_spans((7000, 7200).into(), (0, 500).into())),
            ]);
        let mut module = Module::new("grid", Vec::<&str>::new()).unwrap();
        let grid = builder.build(&mut module, &sizer).unwrap();
        assert_eq!(grid.levels[0].len(), 1);
        assert_eq!(grid.taps.len(), 2);
        // The vdd target has no vdd strap over it.
        assert_eq!(grid.unconnected.len(), 1);
        assert_eq!(grid.unconnected[0].net, SupplyNet::Vdd);
    }
}
