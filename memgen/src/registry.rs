//! Supported bank variants and the pipelines that build them.

use std::fmt::Display;
use std::str::FromStr;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::{BuildPowerGrid, NormalizeOrigin, Pipeline, ReserveSupplies, RouteBuses};

/// A memory bank flavor.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BankVariant {
    /// A bank with a single shared supply.
    #[default]
    Baseline,
    /// A resistive-memory bank with dedicated write and wordline supplies.
    ReRam,
}

/// Error from parsing a bank variant from a string.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("unknown bank variant `{0}`; expected `baseline` or `reram`")]
pub struct BankVariantParseError(String);

impl FromStr for BankVariant {
    type Err = BankVariantParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "baseline" | "sram" => Ok(Self::Baseline),
            "reram" | "rram" => Ok(Self::ReRam),
            _ => Err(BankVariantParseError(s.to_string())),
        }
    }
}

impl Display for BankVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Baseline => write!(f, "baseline"),
            Self::ReRam => write!(f, "reram"),
        }
    }
}

impl BankVariant {
    /// Every supported variant.
    pub const ALL: [BankVariant; 2] = [Self::Baseline, Self::ReRam];

    /// The supply nets that run on dedicated rails in this variant.
    pub fn reserved_nets(&self) -> Vec<ArcStr> {
        match self {
            Self::Baseline => Vec::new(),
            Self::ReRam => vec![
                arcstr::literal!("vdd_write"),
                arcstr::literal!("vdd_wordline"),
            ],
        }
    }

    /// The stages that assemble a bank of this variant.
    pub fn pipeline(&self) -> Pipeline {
        match self {
            Self::Baseline => Pipeline::new()
                .with_stage(RouteBuses)
                .with_stage(BuildPowerGrid)
                .with_stage(NormalizeOrigin),
            Self::ReRam => Pipeline::new()
                .with_stage(RouteBuses)
                .with_stage(ReserveSupplies)
                .with_stage(BuildPowerGrid)
                .with_stage(NormalizeOrigin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("ReRAM".parse::<BankVariant>().unwrap(), BankVariant::ReRam);
        assert_eq!(" sram ".parse::<BankVariant>().unwrap(), BankVariant::Baseline);
        assert!("dram".parse::<BankVariant>().is_err());
        for v in BankVariant::ALL {
            assert_eq!(v.to_string().parse::<BankVariant>().unwrap(), v);
        }
    }

    #[test]
    fn reram_reserves_supplies_before_the_grid() {
        let names = BankVariant::ReRam.pipeline().stage_names();
        let reserve = names.iter().position(|n| n == "reserve_supplies").unwrap();
        let grid = names.iter().position(|n| n == "build_power_grid").unwrap();
        assert!(reserve < grid);
        assert!(!BankVariant::Baseline
            .pipeline()
            .stage_names()
            .iter()
            .any(|n| n == "reserve_supplies"));
    }
}
