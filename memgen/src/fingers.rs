//! Finger counts of the transistors in a primitive gate.
//!
//! A gate's pull-down and pull-up share the height of its cell. Wide devices
//! are split into parallel fingers until each finger fits its share of that
//! height. Both devices get the same finger count so their poly lines up.
//!
//! When the devices do not fit, the search first scales both devices down and
//! then adjusts the pull-up to pull-down ratio, in the order given by the gate
//! type.

use arcstr::ArcStr;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{with_err_context, ErrorContext, ErrorSource, Result};
use crate::{debug, trace};

/// Scale factors applied to both devices, largest first.
pub const SHRINK_FACTORS: [f64; 5] = [1.0, 0.9, 0.8, 0.7, 0.6];

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PrimitiveGateType {
    #[default]
    Inv,
    Nand,
    Nor,
}

impl PrimitiveGateType {
    /// Multipliers tried on the pmos to nmos ratio, in order.
    ///
    /// The stacked pmos of a nand reaches its minimum width late, so a nand may
    /// raise the ratio. A nor lowers it instead.
    pub fn beta_factors(&self) -> &'static [f64] {
        match self {
            Self::Inv => &[1.0],
            Self::Nand => &[1.0, 1.2, 1.4],
            Self::Nor => &[1.0, 1.0 / 1.25, 1.0 / 1.5, 1.0 / 1.75],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FingerError {
    #[error("gate size {0} is not positive")]
    InvalidSize(f64),

    #[error("minimum transistor width {0} is not positive")]
    InvalidMinWidth(i64),

    #[error("grid {0} is not positive")]
    InvalidGrid(i64),
}

/// Parameters of a finger count search.
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct FingerParams {
    /// The cell being sized. Named in every error.
    #[builder(setter(into))]
    pub name: ArcStr,
    #[builder(default)]
    pub kind: PrimitiveGateType,
    /// Drive strength in multiples of the minimum transistor width.
    pub size: f64,
    /// Ratio of pmos width to nmos width.
    #[builder(default = "1.0")]
    pub beta: f64,
    #[builder(default = "1.0")]
    pub nmos_scale: f64,
    #[builder(default = "1.0")]
    pub pmos_scale: f64,
    /// Height of the cell.
    pub height: i64,
    /// Height taken by the rails and the spaces below, between and above the devices.
    #[builder(default)]
    pub overhead: i64,
    pub min_width: i64,
    pub grid: i64,
}

impl FingerParams {
    #[inline]
    pub fn builder() -> FingerParamsBuilder {
        FingerParamsBuilder::default()
    }

    fn check(&self) -> std::result::Result<(), FingerError> {
        if self.size.is_nan() || self.size <= 0.0 {
            return Err(FingerError::InvalidSize(self.size));
        }
        if self.min_width <= 0 {
            return Err(FingerError::InvalidMinWidth(self.min_width));
        }
        if self.grid <= 0 {
            return Err(FingerError::InvalidGrid(self.grid));
        }
        Ok(())
    }

    fn snap(&self, x: f64) -> i64 {
        (x / self.grid as f64).round() as i64 * self.grid
    }
}

/// The chosen fingering of a gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerPlan {
    /// Number of fingers of each device.
    pub fingers: usize,
    /// Width of each nmos finger.
    pub nmos_width: i64,
    /// Width of each pmos finger.
    pub pmos_width: i64,
    /// The pmos to nmos ratio that fit.
    pub beta: f64,
    /// The scale factor that fit.
    pub shrink: f64,
}

/// Chooses finger counts for the devices of `params.name`.
///
/// Tries every beta factor of the gate type, and for each one every entry of
/// [`SHRINK_FACTORS`], returning the first combination that fits. Fails with
/// [`ErrorSource::Infeasible`] if none does, or if a fit leaves fingers
/// narrower than the minimum width.
pub fn plan_fingers(params: &FingerParams) -> Result<FingerPlan> {
    with_err_context(search(params), || ErrorContext::BuildModule {
        name: params.name.clone(),
    })
}

fn search(params: &FingerParams) -> Result<FingerPlan> {
    params.check()?;
    let available = params.height - params.overhead;
    for &factor in params.kind.beta_factors() {
        let beta = params.beta * factor;
        for &shrink in SHRINK_FACTORS.iter() {
            if let Some(plan) = try_fit(params, available, beta, shrink)? {
                debug!(
                    "{}: {} fingers of nmos {} and pmos {} (beta {:.3}, shrink {})",
                    params.name, plan.fingers, plan.nmos_width, plan.pmos_width, beta, shrink
                );
                return Ok(plan);
            }
        }
    }

    let required = params.snap(params.nmos_scale * params.min_width as f64)
        + params.snap(params.pmos_scale * params.beta * params.min_width as f64);
    Err(ErrorSource::Infeasible {
        constraint: arcstr::format!(
            "transistors of {} (size {}, beta {}) fit cell height {}",
            params.name,
            params.size,
            params.beta,
            params.height
        ),
        measured: available,
        required,
    }
    .into())
}

fn try_fit(
    params: &FingerParams,
    available: i64,
    beta: f64,
    shrink: f64,
) -> Result<Option<FingerPlan>> {
    let min_width = params.min_width as f64;
    let nmos_scale = params.nmos_scale * shrink;
    let pmos_scale = params.pmos_scale * shrink;

    let min_n = params.snap(nmos_scale * min_width);
    let min_p = params.snap(pmos_scale * beta * min_width);
    if min_n < params.min_width || min_p < params.min_width {
        trace!(
            "{}: shrink {} leaves devices below the minimum width",
            params.name,
            shrink
        );
        return Ok(None);
    }
    if available < min_n + min_p {
        debug!(
            "{}: cell height {} leaves {} for devices of at least {} and {}",
            params.name, params.height, available, min_n, min_p
        );
        return Ok(None);
    }

    let nmos = params.snap(nmos_scale * params.size * min_width);
    let pmos = params.snap(pmos_scale * beta * params.size * min_width);
    let total = (nmos + pmos) as f64;
    let mults = |width: i64| -> usize {
        let share = width as f64 / total * available as f64;
        ((width as f64 / share).ceil() as usize).max(1)
    };
    let fingers = mults(nmos).max(mults(pmos));

    let nmos_width = params.snap(nmos as f64 / fingers as f64);
    let pmos_width = params.snap(pmos as f64 / fingers as f64);
    for (device, width) in [("nmos", nmos_width), ("pmos", pmos_width)] {
        if width < params.min_width {
            return Err(ErrorSource::Infeasible {
                constraint: arcstr::format!(
                    "{device} fingers of {} at least the minimum width",
                    params.name
                ),
                measured: width,
                required: params.min_width,
            }
            .into());
        }
    }

    Ok(Some(FingerPlan {
        fingers,
        nmos_width,
        pmos_width,
        beta,
        shrink,
    }))
}
