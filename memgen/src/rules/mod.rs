//! Design-rule queries.
//!
//! Layout code never hard-codes process numbers. Every spacing, width,
//! area or enclosure constraint comes from a [`RuleDeck`], which is treated
//! as a read-only service shared by all generators.

use memgeom::{div_ceil, snap_up_to_grid, Dims, Dir};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layers::{Layer, LayerStack};

pub mod table;

pub use table::RuleTable;

/// The geometric context of a spacing query.
///
/// Wide or long shapes require more space on most layers.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceContext {
    /// The width of the wider of the two shapes.
    pub width: i64,
    /// The length over which the two shapes run in parallel.
    pub run_length: i64,
}

impl SpaceContext {
    /// The context for minimum-width shapes with no parallel run.
    pub const fn min() -> Self {
        Self {
            width: 0,
            run_length: 0,
        }
    }

    pub const fn new(width: i64, run_length: i64) -> Self {
        Self { width, run_length }
    }

    /// A context for a shape of the given width running in parallel
    /// with its neighbor over its entire width.
    pub const fn wide(width: i64) -> Self {
        Self {
            width,
            run_length: width,
        }
    }
}

/// Rules for an array of via cuts between two layers.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViaRules {
    /// Width and height of a single cut.
    pub size: i64,
    /// Minimum edge-to-edge space between cuts.
    pub space: i64,
    /// Minimum enclosure of the cut array by the bottom layer.
    pub bot_enclosure: i64,
    /// Enclosure by the bottom layer on the pair of sides facing the relaxed direction.
    pub bot_enclosure_one: i64,
    /// Minimum enclosure of the cut array by the top layer.
    pub top_enclosure: i64,
    /// Enclosure by the top layer on the pair of sides facing the relaxed direction.
    pub top_enclosure_one: i64,
    /// Extra bottom-layer enclosure required when the contact lands in an implant.
    #[serde(default)]
    pub implant_enclosure: i64,
}

impl ViaRules {
    /// The center-to-center pitch of adjacent cuts.
    #[inline]
    pub fn pitch(&self) -> i64 {
        self.size + self.space
    }

    /// The extent of a line of `n` cuts.
    #[inline]
    pub fn array_length(&self, n: usize) -> i64 {
        if n == 0 {
            return 0;
        }
        let n = n as i64;
        self.size * n + self.space * (n - 1)
    }
}

/// An enumeration of rule query errors.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum RuleError {
    /// The deck has no rule of the given kind for the given layer.
    #[error("no {rule} rule for layer {layer}")]
    MissingLayerRule { rule: &'static str, layer: Layer },

    /// The deck has no named rule.
    #[error("no rule named `{0}`")]
    UnknownRule(String),

    /// The deck has no enclosure rule for the given layer pair.
    #[error("no enclosure rule for {inner} inside {outer}")]
    MissingEnclosure { outer: Layer, inner: Layer },

    /// The deck has no via rules for the given stack.
    #[error("no via rules for stack {0}")]
    UnknownVia(LayerStack),

    /// The via rules for the given stack are unusable.
    #[error("invalid via rules for stack {stack}: {reason}")]
    InvalidVia {
        stack: LayerStack,
        reason: &'static str,
    },
}

/// A read-only source of design rules.
pub trait RuleDeck: Send + Sync {
    /// The manufacturing grid.
    fn grid(&self) -> i64;

    /// Looks up a named scalar rule.
    fn get_rule(&self, name: &str) -> Result<i64, RuleError>;

    /// The minimum width of a shape on `layer`.
    fn min_width(&self, layer: &Layer) -> Result<i64, RuleError>;

    /// The minimum space between two shapes on `layer` in the given context.
    fn min_space(&self, layer: &Layer, ctx: SpaceContext) -> Result<i64, RuleError>;

    /// The minimum area of a shape on `layer`.
    fn min_area(&self, layer: &Layer) -> Result<i64, RuleError>;

    /// The minimum enclosure of `inner` by `outer`.
    fn enclosure(&self, outer: &Layer, inner: &Layer) -> Result<i64, RuleError>;

    /// The via rules for the given stack.
    fn via(&self, stack: &LayerStack) -> Result<ViaRules, RuleError>;

    /// The minimum space next to a shape of width `width` on `layer`.
    fn wide_space(&self, layer: &Layer, width: i64) -> Result<i64, RuleError> {
        self.min_space(layer, SpaceContext::wide(width))
    }

    /// Dimensions of a fill rectangle of the given width along `dir` that satisfies
    /// the minimum area and width rules of `layer`.
    ///
    /// The returned length is rounded up to the manufacturing grid.
    fn min_area_fill(&self, layer: &Layer, width: i64, dir: Dir) -> Result<Dims, RuleError> {
        let width = width.max(self.min_width(layer)?);
        let area = self.min_area(layer)?;
        let length = snap_up_to_grid(div_ceil(area, width), self.grid()).max(width);
        Ok(Dims::from_dir(dir, length, width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_rules;

    #[test]
    fn via_array_length() {
        let rules = ViaRules {
            size: 170,
            space: 190,
            ..Default::default()
        };
        assert_eq!(rules.array_length(0), 0);
        assert_eq!(rules.array_length(1), 170);
        assert_eq!(rules.array_length(3), 3 * 170 + 2 * 190);
        assert_eq!(rules.pitch(), 360);
    }

    #[test]
    fn min_area_fill_meets_area() {
        let rules = test_rules();
        let m2 = Layer::new("m2");
        let dims = rules.min_area_fill(&m2, 140, Dir::Vert).unwrap();
        assert_eq!(dims.w(), 140);
        assert!(dims.w() * dims.h() >= rules.min_area(&m2).unwrap());
        assert_eq!(dims.h() % rules.grid(), 0);
    }
}
