//! Generator configuration.
//!
//! A [`GeneratorConfig`] is loaded once, validated against the rule deck,
//! and handed to every generator behind an [`Arc`](std::sync::Arc). Nothing
//! in the crate reads configuration from anywhere else.

use std::path::Path;

use arcstr::ArcStr;
use derive_builder::Builder;
use memgeom::Dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{with_err_context, ErrorContext};
use crate::layers::{Layer, MetalStack};
use crate::registry::BankVariant;
use crate::rules::{RuleDeck, RuleError, SpaceContext};

/// An enumeration of configuration errors.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("grid {grid} is not a positive multiple of the rule deck grid {deck}")]
    InvalidGrid { grid: i64, deck: i64 },

    #[error("power level layer {0} is not in the metal stack")]
    UnknownLayer(Layer),

    #[error("power level on {layer} has strap width {width}, below the minimum of {required}")]
    StrapTooNarrow {
        layer: Layer,
        width: i64,
        required: i64,
    },

    #[error("power levels must be listed bottom-up; {upper} is not above {lower}")]
    LevelOrder { lower: Layer, upper: Layer },

    #[error("bus bend margin must not be negative (got {0})")]
    NegativeMargin(i64),

    #[error("contact spacing override must be positive (got {0})")]
    InvalidContactSpacing(i64),

    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// One level of the power grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct PowerLevelConfig {
    #[builder(setter(into))]
    pub layer: Layer,
    /// The direction in which straps run.
    pub dir: Dir,
    pub width: i64,
    /// Edge-to-edge strap space. Defaults to the rule deck's spacing for the strap width.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub space: Option<i64>,
}

impl PowerLevelConfig {
    #[inline]
    pub fn builder() -> PowerLevelConfigBuilder {
        PowerLevelConfigBuilder::default()
    }
}

/// Settings for the power grid.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct PowerGridConfig {
    /// Grid levels, bottom-up.
    #[builder(default)]
    #[serde(default)]
    pub levels: Vec<PowerLevelConfig>,
    /// Supply nets that carry their own rails and must stay clear of grid straps.
    ///
    /// Defaults to the reserved supplies of the bank variant.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub reserved_nets: Option<Vec<ArcStr>>,
}

/// Settings for bus routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct BusConfig {
    /// Clearance kept between a bus rail and a band it was moved past.
    #[builder(default)]
    #[serde(default)]
    pub margin: i64,
    /// Extends short jogs to meet the minimum-area rule.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub fill: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            margin: 0,
            fill: true,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Settings for contact sizing.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct ContactConfig {
    /// Overrides the cut-to-cut spacing of bus bend vias.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub spacing: Option<i64>,
}

/// Immutable settings shared by every generator of a run.
///
/// ```toml
/// variant = "reram"
/// grid = 5
///
/// [metals]
/// metals = ["met1", "met2", "met3"]
/// cuts = ["via", "via2"]
///
/// [[power.levels]]
/// layer = "met2"
/// dir = "Vert"
/// width = 400
///
/// [[power.levels]]
/// layer = "met3"
/// dir = "Horiz"
/// width = 800
/// space = 800
///
/// [bus]
/// margin = 200
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct GeneratorConfig {
    #[builder(default)]
    #[serde(default)]
    pub variant: BankVariant,
    /// Placement grid for grid straps. Must be a multiple of the rule deck grid.
    pub grid: i64,
    pub metals: MetalStack,
    #[builder(default)]
    #[serde(default)]
    pub power: PowerGridConfig,
    #[builder(default)]
    #[serde(default)]
    pub bus: BusConfig,
    #[builder(default)]
    #[serde(default)]
    pub contacts: ContactConfig,
}

impl GeneratorConfig {
    #[inline]
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder::default()
    }

    pub fn from_toml_str(s: &str) -> crate::error::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(s)?)
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

    /// The supply nets kept clear of grid straps.
    pub fn reserved_nets(&self) -> Vec<ArcStr> {
        self.power
            .reserved_nets
            .clone()
            .unwrap_or_else(|| self.variant.reserved_nets())
    }

    /// The strap space of `level`, falling back to the rule deck.
    pub fn strap_space(
        &self,
        level: &PowerLevelConfig,
        rules: &dyn RuleDeck,
    ) -> Result<i64, ConfigError> {
        match level.space {
            Some(space) => Ok(space),
            None => Ok(rules.min_space(&level.layer, SpaceContext::wide(level.width))?),
        }
    }

    /// Checks the configuration against a rule deck.
    pub fn validate(&self, rules: &dyn RuleDeck) -> Result<(), ConfigError> {
        let deck = rules.grid();
        if self.grid <= 0 || deck <= 0 || self.grid % deck != 0 {
            return Err(ConfigError::InvalidGrid {
                grid: self.grid,
                deck,
            });
        }
        if self.bus.margin < 0 {
            return Err(ConfigError::NegativeMargin(self.bus.margin));
        }
        if let Some(spacing) = self.contacts.spacing {
            if spacing <= 0 {
                return Err(ConfigError::InvalidContactSpacing(spacing));
            }
        }

        let mut prev: Option<(usize, &Layer)> = None;
        for level in self.power.levels.iter() {
            let idx = self
                .metals
                .index_of(&level.layer)
                .ok_or_else(|| ConfigError::UnknownLayer(level.layer.clone()))?;
            if let Some((prev_idx, lower)) = prev {
                if idx <= prev_idx {
                    return Err(ConfigError::LevelOrder {
                        lower: lower.clone(),
                        upper: level.layer.clone(),
                    });
                }
            }
            prev = Some((idx, &level.layer));

            let required = rules.min_width(&level.layer)?;
            if level.width < required {
                return Err(ConfigError::StrapTooNarrow {
                    layer: level.layer.clone(),
                    width: level.width,
                    required,
                });
            }
        }
        Ok(())
    }
}
