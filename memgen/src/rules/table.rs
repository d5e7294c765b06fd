//! A rule deck backed by plain tables.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{RuleDeck, RuleError, SpaceContext, ViaRules};
use crate::error::{with_err_context, ErrorContext};
use crate::layers::{Layer, LayerStack};

const fn default_grid() -> i64 {
    5
}

/// A minimum-space entry that applies to shapes at least `width` wide
/// running in parallel for at least `run_length`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceRule {
    #[serde(default)]
    pub width: i64,
    #[serde(default)]
    pub run_length: i64,
    pub space: i64,
}

/// Per-layer width, area and spacing rules.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRules {
    pub width: Option<i64>,
    pub area: Option<i64>,
    #[serde(default)]
    pub space: Vec<SpaceRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclosureRule {
    pub outer: Layer,
    pub inner: Layer,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViaEntry {
    pub bot: Layer,
    pub cut: Layer,
    pub top: Layer,
    #[serde(flatten)]
    pub rules: ViaRules,
}

/// A [`RuleDeck`] stored as tables, deserializable from TOML.
///
/// ```toml
/// grid = 5
///
/// [rules]
/// wide_metal_width = 3000
///
/// [layers.m1]
/// width = 140
/// area = 83000
/// space = [{ space = 140 }, { width = 3000, run_length = 3000, space = 280 }]
///
/// [[enclosures]]
/// outer = "nwell"
/// inner = "diff"
/// value = 180
///
/// [[vias]]
/// bot = "m1"
/// cut = "via1"
/// top = "m2"
/// size = 150
/// space = 170
/// bot_enclosure = 55
/// bot_enclosure_one = 85
/// top_enclosure = 55
/// top_enclosure_one = 85
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    #[serde(default = "default_grid")]
    pub grid: i64,
    #[serde(default)]
    pub rules: HashMap<String, i64>,
    #[serde(default)]
    pub layers: HashMap<Layer, LayerRules>,
    #[serde(default)]
    pub enclosures: Vec<EnclosureRule>,
    #[serde(default)]
    pub vias: Vec<ViaEntry>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new(default_grid())
    }
}

impl RuleTable {
    pub fn new(grid: i64) -> Self {
        Self {
            grid,
            rules: HashMap::new(),
            layers: HashMap::new(),
            enclosures: Vec::new(),
            vias: Vec::new(),
        }
    }

    pub fn from_toml_str(s: &str) -> crate::error::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let path = path.as_ref();
        let s = with_err_context(std::fs::read_to_string(path), || {
            ErrorContext::ReadFile(path.to_path_buf())
        })?;
        with_err_context(Self::from_toml_str(&s), || {
            ErrorContext::ReadFile(path.to_path_buf())
        })
    }

    pub fn with_rule(mut self, name: impl Into<String>, value: i64) -> Self {
        self.rules.insert(name.into(), value);
        self
    }

    /// Adds basic rules for `layer`.
    pub fn with_layer(mut self, layer: impl Into<Layer>, width: i64, space: i64, area: i64) -> Self {
        let entry = self.layers.entry(layer.into()).or_default();
        entry.width = Some(width);
        entry.area = Some(area);
        entry.space.push(SpaceRule {
            width: 0,
            run_length: 0,
            space,
        });
        self
    }

    /// Adds a width and run-length dependent spacing rule for `layer`.
    pub fn with_wide_space(
        mut self,
        layer: impl Into<Layer>,
        width: i64,
        run_length: i64,
        space: i64,
    ) -> Self {
        self.layers
            .entry(layer.into())
            .or_default()
            .space
            .push(SpaceRule {
                width,
                run_length,
                space,
            });
        self
    }

    pub fn with_enclosure(
        mut self,
        outer: impl Into<Layer>,
        inner: impl Into<Layer>,
        value: i64,
    ) -> Self {
        self.enclosures.push(EnclosureRule {
            outer: outer.into(),
            inner: inner.into(),
            value,
        });
        self
    }

    pub fn with_via(mut self, stack: LayerStack, rules: ViaRules) -> Self {
        self.vias.push(ViaEntry {
            bot: stack.bot,
            cut: stack.cut,
            top: stack.top,
            rules,
        });
        self
    }

    fn layer(&self, layer: &Layer, rule: &'static str) -> Result<&LayerRules, RuleError> {
        self.layers
            .get(layer)
            .ok_or_else(|| RuleError::MissingLayerRule {
                rule,
                layer: layer.clone(),
            })
    }
}

impl RuleDeck for RuleTable {
    fn grid(&self) -> i64 {
        self.grid
    }

    fn get_rule(&self, name: &str) -> Result<i64, RuleError> {
        self.rules
            .get(name)
            .copied()
            .ok_or_else(|| RuleError::UnknownRule(name.to_string()))
    }

    fn min_width(&self, layer: &Layer) -> Result<i64, RuleError> {
        self.layer(layer, "width")?
            .width
            .ok_or_else(|| RuleError::MissingLayerRule {
                rule: "width",
                layer: layer.clone(),
            })
    }

    fn min_space(&self, layer: &Layer, ctx: SpaceContext) -> Result<i64, RuleError> {
        self.layer(layer, "space")?
            .space
            .iter()
            .filter(|rule| rule.width <= ctx.width && rule.run_length <= ctx.run_length)
            .map(|rule| rule.space)
            .max()
            .ok_or_else(|| RuleError::MissingLayerRule {
                rule: "space",
                layer: layer.clone(),
            })
    }

    fn min_area(&self, layer: &Layer) -> Result<i64, RuleError> {
        self.layer(layer, "area")?
            .area
            .ok_or_else(|| RuleError::MissingLayerRule {
                rule: "area",
                layer: layer.clone(),
            })
    }

    fn enclosure(&self, outer: &Layer, inner: &Layer) -> Result<i64, RuleError> {
        self.enclosures
            .iter()
            .find(|rule| &rule.outer == outer && &rule.inner == inner)
            .map(|rule| rule.value)
            .ok_or_else(|| RuleError::MissingEnclosure {
                outer: outer.clone(),
                inner: inner.clone(),
            })
    }

    fn via(&self, stack: &LayerStack) -> Result<ViaRules, RuleError> {
        let entry = self
            .vias
            .iter()
            .find(|v| v.bot == stack.bot && v.cut == stack.cut && v.top == stack.top)
            .ok_or_else(|| RuleError::UnknownVia(stack.clone()))?;
        if entry.rules.size <= 0 {
            return Err(RuleError::InvalidVia {
                stack: stack.clone(),
                reason: "cut size must be positive",
            });
        }
        if entry.rules.space < 0 {
            return Err(RuleError::InvalidVia {
                stack: stack.clone(),
                reason: "cut space must be non-negative",
            });
        }
        Ok(entry.rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECK: &str = r#"
grid = 5

[rules]
wide_metal_width = 3000

[layers.m1]
width = 140
area = 83000
space = [{ space = 140 }, { width = 3000, run_length = 3000, space = 280 }]

[[enclosures]]
outer = "nwell"
inner = "diff"
value = 180

[[vias]]
bot = "m1"
cut = "via1"
top = "m2"
size = 150
space = 170
bot_enclosure = 55
bot_enclosure_one = 85
top_enclosure = 55
top_enclosure_one = 85
"#;

    #[test]
    fn parses_toml_deck() {
        let deck = RuleTable::from_toml_str(DECK).unwrap();
        let m1 = Layer::new("m1");
        assert_eq!(deck.grid(), 5);
        assert_eq!(deck.get_rule("wide_metal_width").unwrap(), 3000);
        assert_eq!(deck.min_width(&m1).unwrap(), 140);
        assert_eq!(deck.min_area(&m1).unwrap(), 83000);
        assert_eq!(
            deck.enclosure(&Layer::new("nwell"), &Layer::new("diff"))
                .unwrap(),
            180
        );
        let via = deck.via(&LayerStack::new("m1", "via1", "m2")).unwrap();
        assert_eq!(via.size, 150);
        assert_eq!(via.implant_enclosure, 0);
    }

    #[test]
    fn spacing_depends_on_width_and_run_length() {
        let deck = RuleTable::from_toml_str(DECK).unwrap();
        let m1 = Layer::new("m1");
        assert_eq!(deck.min_space(&m1, SpaceContext::min()).unwrap(), 140);
        assert_eq!(deck.min_space(&m1, SpaceContext::new(3000, 100)).unwrap(), 140);
        assert_eq!(deck.min_space(&m1, SpaceContext::new(3000, 3000)).unwrap(), 280);
        assert_eq!(deck.wide_space(&m1, 4000).unwrap(), 280);
    }

    #[test]
    fn missing_rules_are_reported() {
        let deck = RuleTable::from_toml_str(DECK).unwrap();
        assert_eq!(
            deck.min_width(&Layer::new("m9")),
            Err(RuleError::MissingLayerRule {
                rule: "width",
                layer: Layer::new("m9"),
            })
        );
        assert!(matches!(
            deck.via(&LayerStack::new("m2", "via2", "m3")),
            Err(RuleError::UnknownVia(_))
        ));
        assert!(matches!(
            deck.get_rule("nonexistent"),
            Err(RuleError::UnknownRule(_))
        ));
    }
}
