use std::sync::Arc;

use memgen::layers::{Layer, LayerStack, MetalStack};
use memgen::rules::{RuleDeck, RuleError, RuleTable, SpaceContext, ViaRules};

pub mod constants;
pub mod layers;
pub mod via;

use constants::*;
use layers::*;

/// The SKY130 design rules used by the memory generators.
#[derive(Debug, Clone)]
pub struct Sky130Pdk {
    table: RuleTable,
}

impl Default for Sky130Pdk {
    fn default() -> Self {
        Self::new()
    }
}

impl Sky130Pdk {
    pub fn new() -> Self {
        let mut table = RuleTable::new(GRID)
            .with_rule("wide_metal_width", WIDE_METAL_WIDTH)
            .with_rule("diff_nwell_space", DIFF_NWELL_SPACE)
            .with_rule("diff_poly_extension", DIFF_POLY_EXTENSION)
            .with_rule("poly_diff_extension", POLY_DIFF_EXTENSION)
            .with_rule("gate_licon_space", GATE_LICON_SPACE)
            .with_layer(NWELL, NWELL_WIDTH, NWELL_SPACE, NWELL_AREA)
            .with_layer(DIFF, DIFF_WIDTH, DIFF_SPACE, DIFF_AREA)
            .with_layer(TAP, DIFF_WIDTH, DIFF_SPACE, DIFF_AREA)
            .with_layer(POLY, POLY_WIDTH, POLY_SPACE, POLY_AREA)
            .with_layer(LI1, LI1_WIDTH, LI1_SPACE, LI1_AREA)
            .with_layer(MET1, MET1_WIDTH, MET1_SPACE, MET1_AREA)
            .with_wide_space(MET1, WIDE_METAL_WIDTH, WIDE_METAL_WIDTH, MET1_WIDE_SPACE)
            .with_layer(MET2, MET2_WIDTH, MET2_SPACE, MET2_AREA)
            .with_wide_space(MET2, WIDE_METAL_WIDTH, WIDE_METAL_WIDTH, MET2_WIDE_SPACE)
            .with_layer(MET3, MET3_WIDTH, MET3_SPACE, MET3_AREA)
            .with_wide_space(MET3, WIDE_METAL_WIDTH, WIDE_METAL_WIDTH, MET3_WIDE_SPACE)
            .with_layer(MET4, MET4_WIDTH, MET4_SPACE, MET4_AREA)
            .with_wide_space(MET4, WIDE_METAL_WIDTH, WIDE_METAL_WIDTH, MET4_WIDE_SPACE)
            .with_layer(MET5, MET5_WIDTH, MET5_SPACE, MET5_AREA)
            .with_enclosure(NWELL, DIFF, DIFF_NWELL_ENCLOSURE)
            .with_enclosure(NWELL, TAP, DIFF_NWELL_ENCLOSURE)
            .with_enclosure(PSDM, DIFF, DIFF_PSDM_ENCLOSURE)
            .with_enclosure(NSDM, DIFF, DIFF_NSDM_ENCLOSURE)
            .with_enclosure(NPC, LICON1, NPC_LICON_POLY_ENCLOSURE);
        for (stack, rules) in via::vias() {
            table = table.with_via(stack, rules);
        }
        Self { table }
    }

    /// A shared handle to the rule deck.
    pub fn deck() -> Arc<dyn RuleDeck> {
        Arc::new(Self::new())
    }

    /// The routing layers, bottom-up.
    pub fn metals(&self) -> MetalStack {
        layers::metals()
    }

    pub fn process(&self) -> &'static str {
        "sky130"
    }
}

impl RuleDeck for Sky130Pdk {
    /// The grid resolution in SKY 130 is 5 nanometers.
    fn grid(&self) -> i64 {
        self.table.grid()
    }

    fn get_rule(&self, name: &str) -> Result<i64, RuleError> {
        self.table.get_rule(name)
    }

    fn min_width(&self, layer: &Layer) -> Result<i64, RuleError> {
        self.table.min_width(layer)
    }

    fn min_space(&self, layer: &Layer, ctx: SpaceContext) -> Result<i64, RuleError> {
        self.table.min_space(layer, ctx)
    }

    fn min_area(&self, layer: &Layer) -> Result<i64, RuleError> {
        self.table.min_area(layer)
    }

    fn enclosure(&self, outer: &Layer, inner: &Layer) -> Result<i64, RuleError> {
        self.table.enclosure(outer, inner)
    }

    fn via(&self, stack: &LayerStack) -> Result<ViaRules, RuleError> {
        self.table.via(stack)
    }
}
